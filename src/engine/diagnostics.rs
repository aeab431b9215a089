use serde::Serialize;

use crate::model::Entity;

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filter,
    Quantity,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Filter => "filter",
            Stage::Quantity => "quantity",
        };
        f.write_str(name)
    }
}

/// An element skipped by one stage, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    pub global_id: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, element: &Entity, message: impl Into<String>) -> Self {
        let diagnostic = Self {
            stage,
            global_id: element.global_id.clone(),
            message: message.into(),
        };
        tracing::debug!(
            stage = %diagnostic.stage,
            guid = %diagnostic.global_id,
            "{}",
            diagnostic.message
        );
        diagnostic
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.global_id, self.message)
    }
}
