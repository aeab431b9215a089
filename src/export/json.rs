use crate::engine::ExtractionRun;
use crate::error::ExportError;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write the run report: every rule's outcome plus the code extension plan.
pub fn export_json<P: AsRef<Path>>(run: &ExtractionRun, path: P) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let json = serde_json::to_string_pretty(run)?;

    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    file.write_all(json.as_bytes())
        .map_err(|e| ExportError::WriteError {
            message: e.to_string(),
        })?;

    tracing::info!(path = %path_ref.display(), "Wrote run report");
    Ok(())
}
