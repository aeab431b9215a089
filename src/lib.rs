//! # IFC WBS
//!
//! Rule-based quantity take-off from IFC models into a Work Breakdown
//! Structure sheet.
//!
//! ## Features
//!
//! - Parse IFC files (IFC2x3 and IFC4 schemas)
//! - Select elements per WBS leaf by class, predefined type, object type,
//!   material and property conditions
//! - Sum a quantity per leaf and split it by a grouping property
//! - Extend WBS codes with generated description and group codes
//! - Write the filled sheet, a dashboard CSV and a JSON run report
//! - Browse a finished run in the terminal
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ifc_wbs::engine::{run_rules, ExtractOptions, ModelIndex};
//! use ifc_wbs::parser::parse_ifc_file;
//! use ifc_wbs::rules::RuleSet;
//!
//! let rules = RuleSet::load("rules.json").expect("Failed to load rules");
//! let mut index = ModelIndex::new();
//! index.build(Arc::new(parse_ifc_file("model.ifc").expect("Failed to parse")));
//!
//! let run = run_rules(&index, &rules, &ExtractOptions::default(), |_| {})
//!     .expect("Model not loaded");
//! for report in &run.rules {
//!     println!("{}: {:?}", report.code, report.outcome.result().map(|r| r.total));
//! }
//! ```

pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod rules;
pub mod ui;
pub mod wbs;
