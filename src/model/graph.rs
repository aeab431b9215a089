//! Read-only query interface over a loaded building model.
//!
//! The engine never touches the parser's internal representation; it only
//! asks the questions below. `parser::StepModel` is the implementation for
//! STEP files.

use crate::error::ResolveError;
use crate::model::{Entity, EntityId, PropertySets};

/// One node of a material structure, as referenced by a material
/// association. Composite nodes point at their children by id so the
/// flattening walk can detect dangling references and cycles.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialNode {
    /// A leaf material record.
    Material { name: String, category: String },
    Layer { material: Option<EntityId> },
    LayerSet { layers: Vec<EntityId> },
    LayerSetUsage { layer_set: EntityId },
    Constituent { material: Option<EntityId> },
    ConstituentSet { constituents: Vec<EntityId> },
    Profile { material: Option<EntityId> },
    ProfileSet { profiles: Vec<EntityId> },
    ProfileSetUsage { profile_set: EntityId },
    List { materials: Vec<EntityId> },
}

/// A classification reference or the classification system itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassificationNode {
    Reference {
        /// `Identification` (IFC4) or `ItemReference` (IFC2x3).
        identification: Option<String>,
        name: Option<String>,
        /// `ReferencedSource`: a parent reference or the classification.
        source: Option<EntityId>,
    },
    Classification { name: Option<String> },
}

/// An `IfcRelAssociatesClassification` relationship.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationAssociation {
    pub related: Vec<EntityId>,
    pub classification: EntityId,
}

/// Read-only building model.
///
/// Implementations must be `Send + Sync`: rules are evaluated in parallel
/// against one shared model.
pub trait ModelGraph: Send + Sync {
    /// Physical and spatial products, in file order.
    fn products(&self) -> Vec<&Entity>;

    /// Look up a rooted entity by instance number.
    fn entity(&self, id: EntityId) -> Option<&Entity>;

    /// All rooted entities of a class (case-insensitive), in file order.
    fn list(&self, class_name: &str) -> Vec<&Entity>;

    /// Property and quantity sets of an element, type-inherited sets
    /// included. Occurrence values take precedence over type values.
    fn property_sets(&self, id: EntityId) -> Result<PropertySets, ResolveError>;

    /// The spatial structure element directly containing `id`.
    fn spatial_container(&self, id: EntityId) -> Option<EntityId>;

    /// The whole `id` is a part of (`IfcRelAggregates`).
    fn decomposes(&self, id: EntityId) -> Option<EntityId>;

    /// Ids of the material selects associated with `id`.
    fn material_associations(&self, id: EntityId) -> Vec<EntityId>;

    /// Decode one material select.
    fn material_node(&self, id: EntityId) -> Result<MaterialNode, ResolveError>;

    /// Every classification association in the model.
    fn classification_associations(&self) -> Vec<ClassificationAssociation>;

    /// Decode one classification select.
    fn classification_node(&self, id: EntityId) -> Result<ClassificationNode, ResolveError>;
}
