use serde::Serialize;

/// STEP instance number (`#123`).
pub type EntityId = u64;

/// A rooted IFC object (anything carrying a GlobalId).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    /// Display class name, e.g. `IfcWall`.
    pub class_name: String,
    pub global_id: String,
    pub name: Option<String>,
    pub long_name: Option<String>,
    pub object_type: Option<String>,
    pub predefined_type: Option<String>,
}

impl Entity {
    /// True when this entity is of `class_name`, ignoring case.
    #[must_use]
    pub fn is_a(&self, class_name: &str) -> bool {
        self.class_name.eq_ignore_ascii_case(class_name)
    }
}
