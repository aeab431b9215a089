//! Rule-based quantity extraction.
//!
//! A [`ModelIndex`] is built once per loaded model. Each rule then runs
//! through [`filter`], [`quantity`], [`grouping`] and [`enrich`], and the
//! [`planner`] assigns the synthetic WBS codes the exporters write.

pub mod diagnostics;
pub mod enrich;
pub mod filter;
pub mod grouping;
pub mod index;
pub mod material;
pub mod planner;
pub mod quantity;
pub mod run;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use diagnostics::{Diagnostic, Stage};
pub use enrich::{Enrichment, ProjectInfo};
pub use grouping::GroupSum;
pub use index::{ModelIndex, NOT_AVAILABLE};
pub use planner::{CodeExtension, ExtensionPlan};
pub use run::{
    run_rule, run_rules, AggregationResult, ExtractOptions, ExtractionRun, MatchRecord,
    RuleOutcome, RuleReport,
};
pub use worker::{ExtractionEvent, ExtractionWorker};
