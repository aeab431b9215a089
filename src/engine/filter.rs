//! Element selection: narrows a class bucket by a rule's filter.

use crate::engine::diagnostics::{Diagnostic, Stage};
use crate::engine::index::ModelIndex;
use crate::engine::material::flatten_materials;
use crate::error::ExtractError;
use crate::model::{Entity, ModelGraph};
use crate::rules::{MaterialFilter, Predicate, SelectionRule};

/// Result of testing one element against a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementOutcome {
    Match,
    NoMatch,
    /// The element's data could not be decoded; it is left out.
    Skipped(Diagnostic),
}

/// Elements selected by a rule, in bucket order.
#[derive(Debug, Default)]
pub struct Selection<'a> {
    pub elements: Vec<&'a Entity>,
    pub candidates: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// Select the elements of `rule.filter.ifc_class` that satisfy the rule.
///
/// An unknown class selects nothing. Elements whose materials or property
/// sets cannot be decoded are skipped and reported in
/// [`Selection::diagnostics`].
pub fn filter_elements<'a>(
    index: &'a ModelIndex,
    rule: &SelectionRule,
) -> Result<Selection<'a>, ExtractError> {
    let graph = index.graph()?;
    let class_name = rule.filter.ifc_class.trim();
    if class_name.is_empty() {
        return Err(ExtractError::InvalidRule {
            reason: "rule has no ifc_class".to_string(),
        });
    }

    let bucket = index.bucket(class_name)?;
    let material = rule.material.as_ref().filter(|m| !m.is_blank());
    let predicates: Vec<&Predicate> = rule
        .filter
        .extra_predicates
        .iter()
        .filter(|p| p.is_active())
        .collect();

    let mut selection = Selection {
        candidates: bucket.len(),
        ..Selection::default()
    };
    for element in bucket {
        match evaluate(graph, element, rule, material, &predicates) {
            ElementOutcome::Match => selection.elements.push(element),
            ElementOutcome::NoMatch => {}
            ElementOutcome::Skipped(diagnostic) => selection.diagnostics.push(diagnostic),
        }
    }

    tracing::debug!(
        class = class_name,
        candidates = selection.candidates,
        matched = selection.elements.len(),
        skipped = selection.diagnostics.len(),
        "Filtered elements"
    );
    Ok(selection)
}

/// Apply the narrowing steps to one element, cheapest first.
fn evaluate(
    graph: &dyn ModelGraph,
    element: &Entity,
    rule: &SelectionRule,
    material: Option<&MaterialFilter>,
    predicates: &[&Predicate],
) -> ElementOutcome {
    let predefined = rule.filter.predefined_type.trim();
    if !predefined.is_empty() && element.predefined_type.as_deref() != Some(predefined) {
        return ElementOutcome::NoMatch;
    }

    if rule.is_user_defined() {
        if let Some(wanted) = rule.object_type() {
            let wanted = wanted.to_uppercase();
            if element.object_type.as_deref().map(str::to_uppercase) != Some(wanted) {
                return ElementOutcome::NoMatch;
            }
        }
    }

    if let Some(material) = material {
        match flatten_materials(graph, element.id) {
            Ok(records) if material.matches(&records) => {}
            Ok(_) => return ElementOutcome::NoMatch,
            Err(err) => {
                return ElementOutcome::Skipped(Diagnostic::new(
                    Stage::Filter,
                    element,
                    format!("materials unreadable: {err}"),
                ))
            }
        }
    }

    if !predicates.is_empty() {
        let psets = match graph.property_sets(element.id) {
            Ok(psets) => psets,
            Err(err) => {
                return ElementOutcome::Skipped(Diagnostic::new(
                    Stage::Filter,
                    element,
                    format!("property sets unreadable: {err}"),
                ))
            }
        };
        let holds = predicates.iter().all(|predicate| {
            match (
                psets.get(predicate.pset.trim(), predicate.prop.trim()),
                &predicate.value,
            ) {
                (Some(actual), Some(expected)) => expected.matches(actual),
                _ => false,
            }
        });
        if !holds {
            return ElementOutcome::NoMatch;
        }
    }

    ElementOutcome::Match
}
