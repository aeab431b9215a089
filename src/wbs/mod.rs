//! WBS sheet reading and code ordering.

pub mod code;
pub mod sheet;

pub use crate::error::WbsError;
pub use code::compare_codes;
pub use sheet::{parse_level, RelevantLeaf, WbsColumns, WbsSheet, DESCRIPTION_LEVEL};
