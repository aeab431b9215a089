//! Error types for ifc-wbs.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::EntityId;

/// Errors that can occur when loading IFC files.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Errors raised by the model index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// A query was made before any model was indexed.
    #[error("no model loaded")]
    NotLoaded,
}

/// Errors decoding one entity's related data (materials, property sets,
/// classifications). These never abort a rule; the element is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A reference points to an entity that does not exist.
    #[error("referenced entity #{id} does not exist")]
    Missing { id: EntityId },

    /// A reference points to an entity of the wrong kind.
    #[error("#{id} is {found}, expected {expected}")]
    UnexpectedKind {
        id: EntityId,
        expected: &'static str,
        found: String,
    },

    /// A material or classification structure refers back to itself.
    #[error("reference cycle through #{id}")]
    Cycle { id: EntityId },
}

/// Errors loading, validating or saving a rule-set document.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Failed to read the rule-set file.
    #[error("failed to read rules '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write the rule-set file.
    #[error("failed to write rules '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is not valid JSON for a rule set.
    #[error("invalid rule-set JSON: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// The document version is not supported.
    #[error("unsupported rule-set version {found} (expected 1)")]
    UnsupportedVersion { found: String },

    /// The document has no rules.
    #[error("rule set has no rules")]
    Empty,

    /// A single rule failed validation.
    #[error("[{code}] {reason}")]
    Invalid { code: String, reason: String },
}

/// Errors loading a WBS sheet.
#[derive(Debug, Error)]
pub enum WbsError {
    /// Failed to open the sheet.
    #[error("failed to read WBS sheet '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The sheet is not readable as CSV.
    #[error("WBS sheet is not valid CSV: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// A required column could not be found.
    #[error("WBS column '{column}' not found (available: {available})")]
    MissingColumn {
        column: &'static str,
        available: String,
    },
}

/// Errors that fail a single rule's pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The rule cannot be executed as written.
    #[error("invalid rule: {reason}")]
    InvalidRule { reason: String },
}

/// Errors that can occur when exporting data.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}
