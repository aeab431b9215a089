//! The read-only model graph the extraction engine queries.

pub mod entity;
pub mod graph;
pub mod value;

pub use entity::{Entity, EntityId};
pub use graph::{ClassificationAssociation, ClassificationNode, MaterialNode, ModelGraph};
pub use value::{PropertySets, PropertyValue};
