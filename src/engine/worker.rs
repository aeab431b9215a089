//! Background extraction: load, index and run on one worker thread,
//! streaming progress back over a channel.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::engine::index::ModelIndex;
use crate::engine::run::{run_rules, ExtractOptions, ExtractionRun};
use crate::parser::parse_ifc_file;
use crate::rules::RuleSet;

/// Message sent from the worker to whoever is watching.
#[derive(Debug)]
pub enum ExtractionEvent {
    /// The model file is being read.
    Loading { path: PathBuf },
    /// The model is indexed and rules are about to run.
    Indexed { classes: usize, rules: usize },
    /// One rule finished (completed, total).
    Progress {
        code: String,
        failed: bool,
        done: usize,
        total: usize,
    },
    /// The run finished.
    Done(Box<ExtractionRun>),
    /// Loading failed; nothing ran.
    Error(String),
}

/// Handle to a running extraction.
pub struct ExtractionWorker {
    events: Receiver<ExtractionEvent>,
    handle: Option<JoinHandle<()>>,
}

impl ExtractionWorker {
    /// Start loading `model_path` and running `rules` on a new thread.
    #[must_use]
    pub fn spawn(model_path: PathBuf, rules: RuleSet, options: ExtractOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = std::thread::spawn(move || {
            if let Err(message) = extract(&model_path, &rules, &options, &tx) {
                tracing::error!(error = %message, "Extraction failed");
                let _ = tx.send(ExtractionEvent::Error(message));
            }
        });
        Self {
            events: rx,
            handle: Some(handle),
        }
    }

    /// Next event without blocking, if any.
    #[must_use]
    pub fn try_next(&self) -> Option<ExtractionEvent> {
        self.events.try_recv().ok()
    }

    /// Block until the run ends, forwarding every event to `on_event`.
    /// Returns the finished run or the loading error.
    pub fn wait<F: FnMut(&ExtractionEvent)>(mut self, mut on_event: F) -> Result<ExtractionRun, String> {
        let mut outcome = Err("extraction worker stopped without a result".to_string());
        for event in self.events.iter() {
            on_event(&event);
            match event {
                ExtractionEvent::Done(run) => outcome = Ok(*run),
                ExtractionEvent::Error(message) => outcome = Err(message),
                _ => {}
            }
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err("extraction worker panicked".to_string());
            }
        }
        outcome
    }
}

fn extract(
    model_path: &std::path::Path,
    rules: &RuleSet,
    options: &ExtractOptions,
    tx: &Sender<ExtractionEvent>,
) -> Result<(), String> {
    let _ = tx.send(ExtractionEvent::Loading {
        path: model_path.to_path_buf(),
    });
    let model = parse_ifc_file(model_path).map_err(|e| e.to_string())?;

    let mut index = ModelIndex::new();
    index.build(Arc::new(model));
    let classes = index.classes().map_err(|e| e.to_string())?.len();
    let total = rules.len();
    let _ = tx.send(ExtractionEvent::Indexed {
        classes,
        rules: total,
    });

    let completed = AtomicUsize::new(0);
    let progress = tx.clone();
    let run = run_rules(&index, rules, options, move |report| {
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = progress.send(ExtractionEvent::Progress {
            code: report.code.clone(),
            failed: report.outcome.is_failed(),
            done,
            total,
        });
    })
    .map_err(|e| e.to_string())?;

    let _ = tx.send(ExtractionEvent::Done(Box::new(run)));
    Ok(())
}
