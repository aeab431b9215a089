//! Declarative selection rules and their persisted document.

pub mod rule;
pub mod ruleset;

pub use rule::{
    ElementFilter, MaterialFilter, MaterialRecord, Predicate, PredicateValue, PropertyRef,
    SelectionRule, USER_DEFINED,
};
pub use ruleset::{RuleSet, RULESET_VERSION};
