//! Synthetic WBS codes below ruled leaves.
//!
//! A leaf `1.2.3` gets `1.2.3.01` for its description row and
//! `1.2.3.01.01`, `1.2.3.01.02`, ... for its group values, numbered in
//! first-seen order.

use std::collections::BTreeMap;

use serde::Serialize;

/// Codes assigned under one leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeExtension {
    pub description_code: String,
    /// Group value and its code, in numbering order.
    pub groups: Vec<(String, String)>,
}

impl CodeExtension {
    #[must_use]
    pub fn group_code(&self, value: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, code)| code.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtensionPlan {
    leaves: BTreeMap<String, CodeExtension>,
}

#[must_use]
pub fn description_code(leaf: &str) -> String {
    format!("{}.01", leaf.trim())
}

#[must_use]
pub fn group_code(leaf: &str, position: usize) -> String {
    format!("{}.{position:02}", description_code(leaf))
}

impl ExtensionPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign codes for `leaf`, replacing any earlier plan for it.
    pub fn plan<S: AsRef<str>>(&mut self, leaf: &str, group_values: &[S]) -> &CodeExtension {
        let leaf = leaf.trim().to_string();
        let extension = CodeExtension {
            description_code: description_code(&leaf),
            groups: group_values
                .iter()
                .enumerate()
                .map(|(i, value)| (value.as_ref().to_string(), group_code(&leaf, i + 1)))
                .collect(),
        };
        self.leaves.insert(leaf.clone(), extension);
        &self.leaves[&leaf]
    }

    #[must_use]
    pub fn get(&self, leaf: &str) -> Option<&CodeExtension> {
        self.leaves.get(leaf.trim())
    }

    #[must_use]
    pub fn contains(&self, leaf: &str) -> bool {
        self.leaves.contains_key(leaf.trim())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CodeExtension)> {
        self.leaves.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_groups_from_one() {
        let mut plan = ExtensionPlan::new();
        let extension = plan.plan("3.1.2", &["true", "false"]);
        assert_eq!(extension.description_code, "3.1.2.01");
        assert_eq!(extension.group_code("true"), Some("3.1.2.01.01"));
        assert_eq!(extension.group_code("false"), Some("3.1.2.01.02"));
        assert_eq!(extension.group_code("maybe"), None);
    }

    #[test]
    fn leaf_without_groups_keeps_description_code() {
        let mut plan = ExtensionPlan::new();
        let empty: [&str; 0] = [];
        plan.plan(" 4.2 ", &empty);
        let extension = plan.get("4.2").unwrap();
        assert_eq!(extension.description_code, "4.2.01");
        assert!(extension.groups.is_empty());
    }

    #[test]
    fn replanning_replaces() {
        let mut plan = ExtensionPlan::new();
        plan.plan("1", &["A", "B"]);
        plan.plan("1", &["C"]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.get("1").unwrap().groups, vec![("C".into(), "1.01.01".into())]);
        assert_eq!(group_code("1", 12), "1.01.12");
    }
}
