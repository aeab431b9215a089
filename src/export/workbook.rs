use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::engine::{CodeExtension, ExtractionRun};
use crate::error::ExportError;
use crate::model::value::format_real;
use crate::wbs::WbsSheet;

const QUANTITY_HEADER: &str = "QDTE.";
const UNIT_HEADER: &str = "UNID.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    /// A WBS node copied from the sheet.
    Node,
    /// A level-10 description row.
    Description,
    /// An inserted group row.
    Group,
}

/// One row of the filled sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledRow {
    pub kind: RowKind,
    pub code: String,
    pub description: String,
    pub quantity: String,
    pub unit: String,
}

/// Rows of the filled sheet: the input rows with every ruled leaf's
/// description row recoded and followed by its group rows.
#[must_use]
pub fn fill_sheet(sheet: &WbsSheet, run: &ExtractionRun) -> Vec<FilledRow> {
    let mut sheet = sheet.clone();
    for (leaf, _) in run.plan.iter() {
        if sheet.ensure_description_row(leaf).is_none() {
            tracing::warn!(code = %leaf, "Ruled code not found in WBS sheet");
        }
    }

    let mut extensions: HashMap<usize, (&str, &CodeExtension)> = HashMap::new();
    for (leaf, extension) in run.plan.iter() {
        if let Some(row) = sheet.leaf_row(leaf).and_then(|r| sheet.description_row(r)) {
            extensions.insert(row, (leaf.as_str(), extension));
        }
    }

    let mut rows = Vec::with_capacity(sheet.len());
    for row in 0..sheet.len() {
        if !sheet.is_description_row(row) {
            rows.push(FilledRow {
                kind: RowKind::Node,
                code: sheet.code(row).to_string(),
                description: sheet.description(row).to_string(),
                quantity: sheet.quantity(row).to_string(),
                unit: sheet.unit(row).to_string(),
            });
            continue;
        }

        let extension = extensions.get(&row);
        rows.push(FilledRow {
            kind: RowKind::Description,
            code: extension.map_or_else(
                || sheet.code(row).to_string(),
                |(_, e)| e.description_code.clone(),
            ),
            description: sheet.description(row).to_string(),
            quantity: String::new(),
            unit: String::new(),
        });

        let Some((leaf, extension)) = extension else {
            continue;
        };
        let unit = sheet.leaf_unit(leaf);
        let result = run.rule(leaf).and_then(|r| r.outcome.result());
        for (value, code) in &extension.groups {
            let sum = result
                .and_then(|r| r.groups.iter().find(|g| &g.value == value))
                .map_or(0.0, |g| g.sum);
            rows.push(FilledRow {
                kind: RowKind::Group,
                code: code.clone(),
                description: value.clone(),
                quantity: format_real(sum),
                unit: unit.to_string(),
            });
        }
    }
    rows
}

/// Write the filled sheet as CSV with columns code, description, quantity
/// and unit, using the input sheet's header names and delimiter.
pub fn export_filled_sheet<P: AsRef<Path>>(
    sheet: &WbsSheet,
    run: &ExtractionRun,
    path: P,
) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(sheet.delimiter())
        .from_writer(file);

    let headers = sheet.headers();
    let columns = sheet.columns();
    let header = |column: Option<usize>, fallback: &'static str| {
        column
            .and_then(|c| headers.get(c))
            .map_or(fallback, String::as_str)
    };
    writer.write_record([
        header(Some(columns.code), "WBS"),
        header(Some(columns.description), "DESCRIPTION"),
        header(columns.quantity, QUANTITY_HEADER),
        header(columns.unit, UNIT_HEADER),
    ])?;

    let rows = fill_sheet(sheet, run);
    for row in &rows {
        writer.write_record([&row.code, &row.description, &row.quantity, &row.unit])?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    tracing::info!(path = %path_ref.display(), rows = rows.len(), "Wrote filled WBS sheet");
    Ok(())
}
