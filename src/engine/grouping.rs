//! Partitioning of contributing entries by a secondary property.

use std::collections::HashMap;

use serde::Serialize;

use crate::engine::quantity::QuantityEntry;
use crate::rules::PropertyRef;

/// Partial sum of one group value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSum {
    pub value: String,
    pub sum: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    /// Distinct values in first-seen order with their running sums.
    pub groups: Vec<GroupSum>,
    /// Group value of each entry, aligned with the input entries.
    pub assignments: Vec<Option<String>>,
}

impl Grouping {
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.value.as_str()).collect()
    }

    #[must_use]
    pub fn sum_of(&self, value: &str) -> Option<f64> {
        self.groups.iter().find(|g| g.value == value).map(|g| g.sum)
    }
}

/// Group `entries` by the display value of `target`. Entries whose value is
/// absent or blank stay in the total but join no group.
#[must_use]
pub fn group_entries(entries: &[QuantityEntry<'_>], target: Option<&PropertyRef>) -> Grouping {
    let Some(target) = target.filter(|t| t.is_complete()) else {
        return Grouping {
            groups: Vec::new(),
            assignments: vec![None; entries.len()],
        };
    };
    let (pset, prop) = (target.pset.trim(), target.prop.trim());

    let mut grouping = Grouping::default();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        let value = entry
            .psets
            .get(pset, prop)
            .map(|v| v.to_string().trim().to_string())
            .filter(|v| !v.is_empty());

        if let Some(value) = &value {
            let position = *positions.entry(value.clone()).or_insert_with(|| {
                grouping.groups.push(GroupSum {
                    value: value.clone(),
                    sum: 0.0,
                    count: 0,
                });
                grouping.groups.len() - 1
            });
            let group = &mut grouping.groups[position];
            group.sum += entry.value;
            group.count += 1;
        }
        grouping.assignments.push(value);
    }

    tracing::debug!(pset, prop, groups = grouping.groups.len(), "Grouped entries");
    grouping
}
