pub mod csv;
pub mod json;
pub mod workbook;

use std::path::{Path, PathBuf};

pub use crate::error::ExportError;
pub use csv::{dashboard_rows, export_dashboard_csv, DashboardRow};
pub use json::export_json;
pub use workbook::{export_filled_sheet, fill_sheet, FilledRow, RowKind};

use crate::engine::ExtractionRun;
use crate::wbs::WbsSheet;

pub const FILLED_SHEET_NAME: &str = "wbs_filled.csv";
pub const DASHBOARD_NAME: &str = "wbs_dashboard.csv";
pub const REPORT_NAME: &str = "extraction_report.json";

/// `dir/name`, or `dir/stem(n).ext` with the first free `n` when taken.
#[must_use]
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, extension) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match extension {
            Some(ext) => dir.join(format!("{stem}({n}).{ext}")),
            None => dir.join(format!("{stem}({n})")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Paths of the files one run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub filled_sheet: PathBuf,
    pub dashboard: PathBuf,
    pub report: Option<PathBuf>,
}

/// Write the filled sheet, the dashboard CSV and optionally the JSON
/// report into `out_dir`, never overwriting existing files.
pub fn write_outputs(
    sheet: &WbsSheet,
    run: &ExtractionRun,
    out_dir: &Path,
    with_report: bool,
) -> Result<WrittenFiles, ExportError> {
    std::fs::create_dir_all(out_dir).map_err(|source| ExportError::FileCreate {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let filled_sheet = unique_path(out_dir, FILLED_SHEET_NAME);
    export_filled_sheet(sheet, run, &filled_sheet)?;

    let dashboard = unique_path(out_dir, DASHBOARD_NAME);
    export_dashboard_csv(sheet, run, &dashboard)?;

    let report = if with_report {
        let path = unique_path(out_dir, REPORT_NAME);
        export_json(run, &path)?;
        Some(path)
    } else {
        None
    };

    Ok(WrittenFiles {
        filled_sheet,
        dashboard,
        report,
    })
}
