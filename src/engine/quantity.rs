//! Quantity summation over a selection.

use crate::engine::diagnostics::{Diagnostic, Stage};
use crate::model::{Entity, ModelGraph, PropertySets};
use crate::rules::PropertyRef;

/// One element that contributed to a total.
#[derive(Debug, Clone)]
pub struct QuantityEntry<'a> {
    pub element: &'a Entity,
    pub value: f64,
    /// The element's resolved property sets, reused by grouping.
    pub psets: PropertySets,
}

impl QuantityEntry<'_> {
    #[must_use]
    pub fn global_id(&self) -> &str {
        &self.element.global_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuantitySum<'a> {
    pub total: f64,
    pub entries: Vec<QuantityEntry<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Sum `quantity` across `elements`.
///
/// Elements without the property are skipped silently; values that do not
/// convert to a number are skipped with a diagnostic.
pub fn sum_quantity<'a>(
    graph: &dyn ModelGraph,
    elements: &[&'a Entity],
    quantity: &PropertyRef,
) -> QuantitySum<'a> {
    let mut sum = QuantitySum::default();
    let (pset, prop) = (quantity.pset.trim(), quantity.prop.trim());

    for &element in elements {
        let psets = match graph.property_sets(element.id) {
            Ok(psets) => psets,
            Err(err) => {
                sum.diagnostics.push(Diagnostic::new(
                    Stage::Quantity,
                    element,
                    format!("property sets unreadable: {err}"),
                ));
                continue;
            }
        };

        let Some(raw) = psets.get(pset, prop) else {
            tracing::trace!(guid = %element.global_id, pset, prop, "No quantity value");
            continue;
        };

        let Some(value) = raw.as_f64() else {
            sum.diagnostics.push(Diagnostic::new(
                Stage::Quantity,
                element,
                format!("{pset}.{prop} value '{raw}' is not numeric"),
            ));
            continue;
        };

        sum.total += value;
        sum.entries.push(QuantityEntry {
            element,
            value,
            psets,
        });
    }

    tracing::debug!(
        pset,
        prop,
        elements = elements.len(),
        contributing = sum.entries.len(),
        total = sum.total,
        "Summed quantity"
    );
    sum
}
