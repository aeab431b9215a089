use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::engine::{ExtractionRun, NOT_AVAILABLE};
use crate::error::ExportError;
use crate::model::value::format_real;
use crate::wbs::{compare_codes, WbsSheet};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const DASHBOARD_COLUMNS: [&str; 15] = [
    "ifc_filename",
    "wbs_code",
    "description",
    "ifc_class",
    "predefined_type",
    "object_type",
    "material",
    "ifc_guid",
    "building_storey",
    "classification_code",
    "ifc_project",
    "ifc_site",
    "ifc_building",
    "ifc_value",
    "unit",
];

/// One row of the dashboard CSV. Field order is the column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardRow {
    pub ifc_filename: String,
    pub wbs_code: String,
    pub description: String,
    pub ifc_class: String,
    pub predefined_type: String,
    pub object_type: String,
    pub material: String,
    pub ifc_guid: String,
    pub building_storey: String,
    pub classification_code: String,
    pub ifc_project: String,
    pub ifc_site: String,
    pub ifc_building: String,
    pub ifc_value: String,
    pub unit: String,
}

/// Every WBS node, every ruled leaf's description code and one row per
/// matched element, sorted by WBS code.
#[must_use]
pub fn dashboard_rows(sheet: &WbsSheet, run: &ExtractionRun) -> Vec<DashboardRow> {
    let mut rows: Vec<DashboardRow> = sheet
        .nodes()
        .map(|(code, description)| DashboardRow {
            wbs_code: code.to_string(),
            description: description.to_string(),
            ..DashboardRow::default()
        })
        .collect();

    let or_na = |value: Option<&String>| value.map_or_else(|| NOT_AVAILABLE.to_string(), Clone::clone);

    for report in &run.rules {
        let (Some(result), Some(extension)) = (report.outcome.result(), run.plan.get(&report.code))
        else {
            continue;
        };

        rows.push(DashboardRow {
            ifc_filename: run.model_label.clone(),
            wbs_code: extension.description_code.clone(),
            description: sheet.user_description(&report.code).to_string(),
            ..DashboardRow::default()
        });

        let unit = sheet.leaf_unit(&report.code);
        for record in &result.matches {
            let group = record.group.as_deref();
            let code = group
                .and_then(|g| extension.group_code(g))
                .unwrap_or(extension.description_code.as_str());
            rows.push(DashboardRow {
                ifc_filename: run.model_label.clone(),
                wbs_code: code.to_string(),
                description: group.unwrap_or(NOT_AVAILABLE).to_string(),
                ifc_class: record.class_name.clone(),
                predefined_type: or_na(record.predefined_type.as_ref()),
                object_type: or_na(record.object_type.as_ref()),
                material: record.enrichment.material.clone(),
                ifc_guid: record.global_id.clone(),
                building_storey: record.enrichment.building_storey.clone(),
                classification_code: record.enrichment.classification_code.clone(),
                ifc_project: run.project.project.clone(),
                ifc_site: run.project.site.clone(),
                ifc_building: run.project.building.clone(),
                ifc_value: format_real(record.value),
                unit: unit.to_string(),
            });
        }
    }

    rows.sort_by(|a, b| compare_codes(&a.wbs_code, &b.wbs_code));
    rows
}

/// Write the dashboard CSV, UTF-8 with a byte-order mark.
pub fn export_dashboard_csv<P: AsRef<Path>>(
    sheet: &WbsSheet,
    run: &ExtractionRun,
    path: P,
) -> Result<(), ExportError> {
    let path_ref = path.as_ref();
    let mut file = File::create(path_ref).map_err(|source| ExportError::FileCreate {
        path: path_ref.to_path_buf(),
        source,
    })?;
    file.write_all(UTF8_BOM).map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    // header written by hand so an empty dashboard still has one
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(DASHBOARD_COLUMNS)?;
    let rows = dashboard_rows(sheet, run);
    for row in &rows {
        writer.serialize(row)?;
    }

    writer.flush().map_err(|e| ExportError::WriteError {
        message: e.to_string(),
    })?;

    tracing::info!(path = %path_ref.display(), rows = rows.len(), "Wrote dashboard CSV");
    Ok(())
}
