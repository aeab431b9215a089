use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ifc_wbs::engine::{
    run_rule, ExtractOptions, ExtractionEvent, ExtractionRun, ExtractionWorker, ModelIndex,
};
use ifc_wbs::export::write_outputs;
use ifc_wbs::model::value::format_real;
use ifc_wbs::parser::parse_ifc_file;
use ifc_wbs::rules::{Predicate, PropertyRef, RuleSet, SelectionRule};
use ifc_wbs::ui::App;
use ifc_wbs::wbs::WbsSheet;

#[derive(Parser, Debug)]
#[command(name = "ifc-wbs")]
#[command(about = "IFC WBS - rule-based quantity take-off from IFC models into a WBS sheet")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the classes of a model, or one class's predefined types
    Classes {
        /// Path to IFC file
        model: PathBuf,

        /// Show predefined types of this class
        #[arg(long, value_name = "CLASS")]
        class: Option<String>,
    },

    /// List WBS leaves with a user description
    Leaves {
        /// WBS sheet (CSV)
        wbs: PathBuf,

        /// Untouched template; only leaves whose description differs are listed
        #[arg(long, value_name = "FILE")]
        baseline: Option<PathBuf>,
    },

    /// Validate a rule-set document
    Check {
        /// Rule-set JSON
        rules: PathBuf,

        /// Write the normalized document here
        #[arg(long, value_name = "FILE")]
        normalize: Option<PathBuf>,
    },

    /// Try an ad-hoc rule against a model and print its totals
    Probe {
        /// Path to IFC file
        model: PathBuf,

        #[arg(long)]
        class: String,

        /// Empty matches any predefined type
        #[arg(long, default_value = "")]
        predefined: String,

        #[arg(long)]
        object_type: Option<String>,

        /// Quantity to sum, as Pset.Prop
        #[arg(long, value_name = "PSET.PROP")]
        quantity: PropertyRef,

        /// Property to group by, as Pset.Prop
        #[arg(long, value_name = "PSET.PROP")]
        group: Option<PropertyRef>,

        /// Extra condition, as Pset.Prop=value (repeatable)
        #[arg(long = "where", value_name = "PSET.PROP=VALUE")]
        conditions: Vec<Predicate>,
    },

    /// Run a rule set and write the filled WBS sheet and the dashboard CSV
    Extract {
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,

        #[arg(long, value_name = "FILE")]
        model: PathBuf,

        #[arg(long, value_name = "FILE")]
        wbs: PathBuf,

        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Also write the JSON run report
        #[arg(long)]
        json: bool,

        /// Run rules one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Run a rule set and browse the results in the terminal
    Browse {
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,

        #[arg(long, value_name = "FILE")]
        model: PathBuf,

        #[arg(long)]
        sequential: bool,
    },
}

fn init_tracing(verbose: bool, interactive: bool) {
    let default = if verbose {
        "ifc_wbs=debug"
    } else if interactive {
        "ifc_wbs=warn"
    } else {
        "ifc_wbs=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(args.verbose, matches!(args.command, Command::Browse { .. }));

    match args.command {
        Command::Classes { model, class } => list_classes(&model, class.as_deref()),
        Command::Leaves { wbs, baseline } => list_leaves(&wbs, baseline.as_deref()),
        Command::Check { rules, normalize } => check_rules(&rules, normalize.as_deref()),
        Command::Probe {
            model,
            class,
            predefined,
            object_type,
            quantity,
            group,
            conditions,
        } => {
            let mut rule = SelectionRule {
                quantity,
                grouping: group,
                ..SelectionRule::default()
            };
            rule.filter.ifc_class = class;
            rule.filter.predefined_type = predefined;
            rule.filter.object_type = object_type;
            rule.filter.extra_predicates = conditions;
            probe(&model, &rule)
        }
        Command::Extract {
            rules,
            model,
            wbs,
            out_dir,
            json,
            sequential,
        } => {
            let sheet = WbsSheet::load(&wbs)?;
            let run = extract(&rules, &model, sequential)?;
            let written = write_outputs(&sheet, &run, &out_dir, json)?;
            println!("Filled sheet: {}", written.filled_sheet.display());
            println!("Dashboard:    {}", written.dashboard.display());
            if let Some(report) = written.report {
                println!("Report:       {}", report.display());
            }
            if run.failed() > 0 {
                eprintln!("{} of {} rules failed", run.failed(), run.rules.len());
            }
            Ok(())
        }
        Command::Browse {
            rules,
            model,
            sequential,
        } => {
            let run = extract(&rules, &model, sequential)?;
            let terminal = ratatui::init();
            let result = App::new(run).run(terminal);
            ratatui::restore();
            result
        }
    }
}

fn load_index(model: &Path) -> Result<ModelIndex> {
    let parsed = parse_ifc_file(model)?;
    let mut index = ModelIndex::new();
    index.build(Arc::new(parsed));
    Ok(index)
}

fn list_classes(model: &Path, class: Option<&str>) -> Result<()> {
    let index = load_index(model)?;

    if let Some(class) = class {
        let types = index.predefined_types(class)?;
        println!("{class}: {} predefined types", types.len());
        for predefined in types {
            println!("  {predefined}");
        }
        return Ok(());
    }

    for class in index.classes()? {
        println!("{class} ({})", index.bucket(&class)?.len());
    }
    let categories = index.material_categories()?;
    if !categories.is_empty() {
        println!();
        println!("Material categories:");
        for (category, example) in categories {
            println!("  {category} (e.g. {example})");
        }
    }
    Ok(())
}

fn list_leaves(wbs: &Path, baseline: Option<&Path>) -> Result<()> {
    let sheet = WbsSheet::load(wbs)?;
    let baseline = baseline.map(WbsSheet::load).transpose()?;
    for leaf in sheet.relevant_leaves(baseline.as_ref()) {
        println!("{}\t{}\t{}", leaf.code, leaf.description, leaf.user_description);
    }
    Ok(())
}

fn check_rules(path: &Path, normalize: Option<&Path>) -> Result<()> {
    let rules = RuleSet::load(path)?;
    println!("{}: {} rules OK", path.display(), rules.len());
    if let Some(out) = normalize {
        rules.save(out)?;
        println!("Normalized: {}", out.display());
    }
    Ok(())
}

fn probe(model: &Path, rule: &SelectionRule) -> Result<()> {
    let index = load_index(model)?;
    let result = run_rule(&index, rule)?;

    println!(
        "{} candidates, {} selected, {} with quantity",
        result.candidates,
        result.selected,
        result.matches.len()
    );
    println!("Total: {}", format_real(result.total));
    for group in &result.groups {
        println!("  {}: {} ({})", group.value, format_real(group.sum), group.count);
    }
    for diagnostic in &result.diagnostics {
        println!("  skipped {diagnostic}");
    }
    Ok(())
}

fn extract(rules: &Path, model: &Path, sequential: bool) -> Result<ExtractionRun> {
    let rules = RuleSet::load(rules)?;
    let options = ExtractOptions {
        parallel: !sequential,
        model_label: model
            .file_stem()
            .map_or_else(|| model.display().to_string(), |s| s.to_string_lossy().into_owned()),
    };

    let worker = ExtractionWorker::spawn(model.to_path_buf(), rules, options);
    worker
        .wait(|event| match event {
            ExtractionEvent::Loading { path } => {
                tracing::info!(path = %path.display(), "Loading model");
            }
            ExtractionEvent::Indexed { classes, rules } => {
                tracing::info!(classes, rules, "Model indexed");
            }
            ExtractionEvent::Progress {
                code,
                failed,
                done,
                total,
            } => {
                tracing::debug!(code = %code, failed, done, total, "Rule finished");
            }
            ExtractionEvent::Done(_) | ExtractionEvent::Error(_) => {}
        })
        .map_err(|message| eyre!(message))
}
