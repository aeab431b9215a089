//! Versioned rule-set document: one selection rule per WBS leaf code.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SelectionRule;
use crate::error::RuleError;

pub const RULESET_VERSION: u32 = 1;

/// The persisted rule set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleSet {
    pub version: u32,
    pub model_path: Option<String>,
    pub wbs_path: Option<String>,
    pub rules: BTreeMap<String, SelectionRule>,
}

/// Document shape as accepted on load, before validation.
#[derive(Debug, Deserialize)]
struct RawRuleSet {
    #[serde(default)]
    version: Value,
    #[serde(default, alias = "ifc_path")]
    model_path: Option<String>,
    #[serde(default)]
    wbs_path: Option<String>,
    #[serde(default)]
    rules: BTreeMap<String, SelectionRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            version: RULESET_VERSION,
            model_path: None,
            wbs_path: None,
            rules: BTreeMap::new(),
        }
    }
}

impl RuleSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the rule for `code`. Invalid rules are rejected and
    /// the set is left unchanged.
    pub fn insert(&mut self, code: &str, rule: SelectionRule) -> Result<(), RuleError> {
        let code = code.trim();
        rule.validate().map_err(|reason| RuleError::Invalid {
            code: code.to_string(),
            reason,
        })?;
        self.rules.insert(code.to_string(), rule.normalized());
        Ok(())
    }

    pub fn remove(&mut self, code: &str) -> Option<SelectionRule> {
        self.rules.remove(code.trim())
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&SelectionRule> {
        self.rules.get(code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse and validate a rule-set document.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, a version other than `1`, a missing or
    /// empty `rules` map, or the first rule that does not validate.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let raw: RawRuleSet = serde_json::from_str(json)?;

        let version_ok = match &raw.version {
            Value::Number(n) => n.as_u64() == Some(u64::from(RULESET_VERSION)),
            Value::String(s) => s.trim() == RULESET_VERSION.to_string(),
            _ => false,
        };
        if !version_ok {
            return Err(RuleError::UnsupportedVersion {
                found: raw.version.to_string(),
            });
        }
        if raw.rules.is_empty() {
            return Err(RuleError::Empty);
        }

        let mut rules = BTreeMap::new();
        for (code, rule) in raw.rules {
            let code = code.trim().to_string();
            rule.validate().map_err(|reason| RuleError::Invalid {
                code: code.clone(),
                reason,
            })?;
            rules.insert(code, rule.normalized());
        }

        Ok(Self {
            version: RULESET_VERSION,
            model_path: raw.model_path.filter(|p| !p.trim().is_empty()),
            wbs_path: raw.wbs_path.filter(|p| !p.trim().is_empty()),
            rules,
        })
    }

    /// Serialize the normalized document. Every rule is validated first.
    pub fn to_json(&self) -> Result<String, RuleError> {
        if self.rules.is_empty() {
            return Err(RuleError::Empty);
        }
        let mut normalized = self.clone();
        for (code, rule) in &mut normalized.rules {
            *rule = rule.normalized();
            rule.validate().map_err(|reason| RuleError::Invalid {
                code: code.clone(),
                reason,
            })?;
        }
        Ok(serde_json::to_string_pretty(&normalized)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RuleError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), rules = rules.len(), "Loaded rule set");
        Ok(rules)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), RuleError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| RuleError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), rules = self.len(), "Saved rule set");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{MaterialFilter, PredicateValue, PropertyRef};
    use pretty_assertions::assert_eq;

    const LEGACY: &str = r#"{
        "version": "1",
        "ifc_path": "model.ifc",
        "wbs_path": null,
        "rules": {
            " 1.2.3 ": {
                "filter": {
                    "ifc_class": "IfcWall",
                    "predefined": "STANDARD",
                    "object_type": "",
                    "props": [
                        {"pset": "Pset_WallCommon", "prop": "IsExternal", "value": false},
                        {"pset": "", "prop": "", "value": 1}
                    ]
                },
                "material": {"category": " Concrete ", "name": ""},
                "quantity": {"pset": "Qto_WallBaseQuantities", "prop": "NetVolume"},
                "agrupamento": {"pset": "Pset_WallCommon", "prop": "LoadBearing"}
            }
        }
    }"#;

    #[test]
    fn accepts_legacy_keys_and_normalizes() {
        let set = RuleSet::from_json(LEGACY).unwrap();
        assert_eq!(set.model_path.as_deref(), Some("model.ifc"));
        let rule = set.get("1.2.3").unwrap();
        assert_eq!(rule.filter.predefined_type, "STANDARD");
        assert_eq!(rule.filter.object_type, None);
        assert_eq!(rule.filter.extra_predicates.len(), 1);
        assert_eq!(
            rule.filter.extra_predicates[0].value,
            Some(PredicateValue::Bool(false))
        );
        assert_eq!(
            rule.material,
            Some(MaterialFilter::Detailed {
                category: Some("Concrete".into()),
                name: None
            })
        );
        assert_eq!(
            rule.grouping,
            Some(PropertyRef::new("Pset_WallCommon", "LoadBearing"))
        );
    }

    #[test]
    fn round_trip_reproduces_rules() {
        let set = RuleSet::from_json(LEGACY).unwrap();
        let json = set.to_json().unwrap();
        let reloaded = RuleSet::from_json(&json).unwrap();
        assert_eq!(reloaded, set);
    }

    #[test]
    fn rejects_wrong_version() {
        let err = RuleSet::from_json(r#"{"version": 2, "rules": {}}"#).unwrap_err();
        assert!(matches!(err, RuleError::UnsupportedVersion { .. }));
        let err = RuleSet::from_json(r#"{"rules": {}}"#).unwrap_err();
        assert!(matches!(err, RuleError::UnsupportedVersion { .. }));
    }

    #[test]
    fn rejects_empty_rules() {
        let err = RuleSet::from_json(r#"{"version": 1, "rules": {}}"#).unwrap_err();
        assert!(matches!(err, RuleError::Empty));
    }

    #[test]
    fn rejects_rule_without_grouping() {
        let json = r#"{"version": 1, "rules": {"1.1": {
            "filter": {"ifc_class": "IfcSlab", "predefined_type": "FLOOR"},
            "quantity": {"pset": "Qto_SlabBaseQuantities", "prop": "NetArea"}
        }}}"#;
        match RuleSet::from_json(json).unwrap_err() {
            RuleError::Invalid { code, reason } => {
                assert_eq!(code, "1.1");
                assert!(reason.contains("grouping"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn insert_rejects_invalid_rule() {
        let mut set = RuleSet::new();
        let rule = SelectionRule::new(
            "IfcBeam",
            "USERDEFINED",
            PropertyRef::new("Qto_BeamBaseQuantities", "Length"),
            PropertyRef::new("Pset_BeamCommon", "Reference"),
        );
        assert!(set.insert("2.1", rule.clone()).is_err());
        assert!(set.is_empty());
        set.insert("2.1", rule.with_object_type("Lintel")).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let set = RuleSet::from_json(LEGACY).unwrap();
        set.save(&path).unwrap();
        assert_eq!(RuleSet::load(&path).unwrap(), set);
    }
}
