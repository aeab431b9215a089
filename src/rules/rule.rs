//! Selection rules: which elements a WBS leaf takes its quantity from.

use crate::model::PropertyValue;
use serde::{Deserialize, Serialize};

/// Predefined type that requires an object type to narrow the selection.
pub const USER_DEFINED: &str = "USERDEFINED";

/// A `(pset, prop)` pair naming one property of an element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRef {
    #[serde(default)]
    pub pset: String,
    #[serde(default)]
    pub prop: String,
}

impl PropertyRef {
    pub fn new(pset: impl Into<String>, prop: impl Into<String>) -> Self {
        Self {
            pset: pset.into(),
            prop: prop.into(),
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.pset.trim().is_empty() && !self.prop.trim().is_empty()
    }

    fn trimmed(&self) -> Self {
        Self::new(self.pset.trim(), self.prop.trim())
    }
}

impl std::str::FromStr for PropertyRef {
    type Err = String;

    /// Parse `Pset.Prop`. The property name may itself contain dots.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((pset, prop)) if !pset.trim().is_empty() && !prop.trim().is_empty() => {
                Ok(Self::new(pset.trim(), prop.trim()))
            }
            _ => Err(format!("expected 'Pset.Prop', got '{s}'")),
        }
    }
}

/// Expected value of an extra predicate. The variant decides how it is
/// compared against the element's property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl PredicateValue {
    /// Type a value entered as free text: `true`/`false`, then integer, then
    /// float, otherwise text.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("true") {
            return PredicateValue::Bool(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return PredicateValue::Bool(false);
        }
        if let Ok(i) = token.parse::<i64>() {
            return PredicateValue::Integer(i);
        }
        if let Ok(f) = token.parse::<f64>() {
            return PredicateValue::Float(f);
        }
        PredicateValue::Text(token.to_string())
    }

    /// Booleans compare by plain equality with a boolean property, numbers
    /// as floats (a boolean property counts as 1 or 0, an unconvertible one
    /// never matches), anything else as trimmed case-insensitive text.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, actual: &PropertyValue) -> bool {
        let number = || match actual {
            PropertyValue::Bool(b) => Some(f64::from(u8::from(*b))),
            other => other.as_f64(),
        };
        match self {
            PredicateValue::Bool(expected) => {
                matches!(actual, PropertyValue::Bool(b) if b == expected)
            }
            PredicateValue::Integer(expected) => number().is_some_and(|a| a == *expected as f64),
            PredicateValue::Float(expected) => number().is_some_and(|a| a == *expected),
            PredicateValue::Text(expected) => {
                actual.to_string().trim().to_lowercase() == expected.trim().to_lowercase()
            }
        }
    }
}

/// One extra `{pset, prop, value}` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    #[serde(default)]
    pub pset: String,
    #[serde(default)]
    pub prop: String,
    /// A predicate without a value is carried but never evaluated.
    #[serde(default)]
    pub value: Option<PredicateValue>,
}

impl Predicate {
    pub fn new(pset: impl Into<String>, prop: impl Into<String>, value: PredicateValue) -> Self {
        Self {
            pset: pset.into(),
            prop: prop.into(),
            value: Some(value),
        }
    }

    /// Whether this predicate takes part in filtering.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.pset.trim().is_empty() && !self.prop.trim().is_empty() && self.value.is_some()
    }
}

impl std::str::FromStr for Predicate {
    type Err = String;

    /// Parse `Pset.Prop=value`; the value is typed with
    /// [`PredicateValue::from_token`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected 'Pset.Prop=value', got '{s}'"))?;
        let target: PropertyRef = target.parse()?;
        Ok(Self::new(target.pset, target.prop, PredicateValue::from_token(value)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementFilter {
    #[serde(default)]
    pub ifc_class: String,
    #[serde(default, alias = "predefined")]
    pub predefined_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(
        default,
        alias = "props",
        alias = "extra_filters",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub extra_predicates: Vec<Predicate>,
}

/// Material condition: a bare string is matched against both category and
/// name, the detailed form against whichever parts are given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialFilter {
    Any(String),
    Detailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
}

/// A flattened leaf material record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaterialRecord {
    pub name: String,
    pub category: String,
}

impl MaterialFilter {
    /// Wanted (category, name), trimmed and lower-cased; empty means unset.
    fn wanted(&self) -> (String, String) {
        let clean = |s: Option<&String>| s.map(|v| v.trim().to_lowercase()).unwrap_or_default();
        match self {
            MaterialFilter::Any(value) => {
                let value = value.trim().to_lowercase();
                (value.clone(), value)
            }
            MaterialFilter::Detailed { category, name } => {
                (clean(category.as_ref()), clean(name.as_ref()))
            }
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        let (category, name) = self.wanted();
        category.is_empty() && name.is_empty()
    }

    /// True when any record matches the wanted category OR the wanted name.
    #[must_use]
    pub fn matches(&self, records: &[MaterialRecord]) -> bool {
        let (category, name) = self.wanted();
        records.iter().any(|record| {
            (!category.is_empty() && record.category.trim().to_lowercase() == category)
                || (!name.is_empty() && record.name.trim().to_lowercase() == name)
        })
    }

    fn normalized(&self) -> Option<Self> {
        let keep = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let filter = match self {
            MaterialFilter::Any(value) => MaterialFilter::Any(value.trim().to_string()),
            MaterialFilter::Detailed { category, name } => MaterialFilter::Detailed {
                category: keep(category),
                name: keep(name),
            },
        };
        (!filter.is_blank()).then_some(filter)
    }
}

/// The rule authored for one WBS leaf code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRule {
    #[serde(default)]
    pub filter: ElementFilter,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<MaterialFilter>,
    #[serde(default)]
    pub quantity: PropertyRef,
    #[serde(default, alias = "agrupamento")]
    pub grouping: Option<PropertyRef>,
}

impl SelectionRule {
    pub fn new(
        ifc_class: impl Into<String>,
        predefined_type: impl Into<String>,
        quantity: PropertyRef,
        grouping: PropertyRef,
    ) -> Self {
        Self {
            filter: ElementFilter {
                ifc_class: ifc_class.into(),
                predefined_type: predefined_type.into(),
                ..ElementFilter::default()
            },
            material: None,
            quantity,
            grouping: Some(grouping),
        }
    }

    #[must_use]
    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.filter.object_type = Some(object_type.into());
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.filter.extra_predicates.push(predicate);
        self
    }

    #[must_use]
    pub fn with_material(mut self, material: MaterialFilter) -> Self {
        self.material = Some(material);
        self
    }

    #[must_use]
    pub fn is_user_defined(&self) -> bool {
        self.filter.predefined_type.trim() == USER_DEFINED
    }

    /// The object type, when it is non-blank.
    #[must_use]
    pub fn object_type(&self) -> Option<&str> {
        self.filter
            .object_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Check the invariants a persisted rule must hold. Returns the reason
    /// for rejection.
    pub fn validate(&self) -> Result<(), String> {
        if self.filter.ifc_class.trim().is_empty() || self.filter.predefined_type.trim().is_empty()
        {
            return Err("'ifc_class' and 'predefined_type' are required".to_string());
        }
        match (self.is_user_defined(), self.object_type()) {
            (true, None) => {
                return Err("'object_type' is required when predefined_type is USERDEFINED".into())
            }
            (false, Some(_)) => {
                return Err("'object_type' is only allowed when predefined_type is USERDEFINED".into())
            }
            _ => {}
        }
        if !self.quantity.is_complete() {
            return Err("quantity.pset and quantity.prop are required".to_string());
        }
        if !self.grouping.as_ref().is_some_and(PropertyRef::is_complete) {
            return Err("grouping.pset and grouping.prop are required".to_string());
        }
        Ok(())
    }

    /// Canonical form for persistence: trimmed strings, blank predicates and
    /// blank material dropped, object type only kept for USERDEFINED.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let object_type = if self.is_user_defined() {
            self.object_type().map(str::to_string)
        } else {
            None
        };
        Self {
            filter: ElementFilter {
                ifc_class: self.filter.ifc_class.trim().to_string(),
                predefined_type: self.filter.predefined_type.trim().to_string(),
                object_type,
                extra_predicates: self
                    .filter
                    .extra_predicates
                    .iter()
                    .filter(|p| !p.pset.trim().is_empty() && !p.prop.trim().is_empty())
                    .map(|p| Predicate {
                        pset: p.pset.trim().to_string(),
                        prop: p.prop.trim().to_string(),
                        value: p.value.clone(),
                    })
                    .collect(),
            },
            material: self.material.as_ref().and_then(MaterialFilter::normalized),
            quantity: self.quantity.trimmed(),
            grouping: self.grouping.as_ref().map(PropertyRef::trimmed),
        }
    }
}
