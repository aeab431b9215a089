use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// A decoded property or quantity value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    /// Numeric view of the value. Text is parsed after trimming; booleans and
    /// lists have no numeric value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Real(f) => Some(*f),
            PropertyValue::Text(s) => s.trim().parse::<f64>().ok(),
            PropertyValue::Bool(_) | PropertyValue::List(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Integer(i) => write!(f, "{i}"),
            PropertyValue::Real(v) => f.write_str(&format_real(*v)),
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Whole reals keep one decimal so `5.0` never prints like the integer `5`.
#[must_use]
pub fn format_real(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

/// Property sets of one element: pset name → property name → value.
/// Quantity sets (`Qto_*`) live in the same map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropertySets(BTreeMap<String, BTreeMap<String, PropertyValue>>);

impl PropertySets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, pset: &str, prop: &str) -> Option<&PropertyValue> {
        self.0.get(pset).and_then(|props| props.get(prop))
    }

    /// Insert without replacing an existing value, so occurrence properties
    /// shadow the ones inherited from the type.
    pub fn insert_if_absent(&mut self, pset: &str, prop: &str, value: PropertyValue) {
        self.0
            .entry(pset.to_string())
            .or_default()
            .entry(prop.to_string())
            .or_insert(value);
    }

    pub fn insert(&mut self, pset: &str, prop: &str, value: PropertyValue) {
        self.0
            .entry(pset.to_string())
            .or_default()
            .insert(prop.to_string(), value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, PropertyValue>)> {
        self.0.iter()
    }
}
