//! Contextual metadata attached to matched elements.
//!
//! Every attribute is best effort: anything that cannot be determined is
//! reported as [`NOT_AVAILABLE`].

use std::collections::HashSet;

use serde::Serialize;

use crate::engine::index::{ModelIndex, NOT_AVAILABLE};
use crate::engine::material::{flatten_materials, material_label};
use crate::error::IndexError;
use crate::model::{Entity, EntityId, ModelGraph};

/// Per-element context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub material: String,
    pub classification_code: String,
    pub building_storey: String,
}

/// Names of the first project, site and building in the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    pub project: String,
    pub site: String,
    pub building: String,
}

impl Default for ProjectInfo {
    fn default() -> Self {
        Self {
            project: NOT_AVAILABLE.to_string(),
            site: NOT_AVAILABLE.to_string(),
            building: NOT_AVAILABLE.to_string(),
        }
    }
}

pub fn enrich(index: &ModelIndex, element: &Entity) -> Result<Enrichment, IndexError> {
    let graph = index.graph()?;

    let material = match flatten_materials(graph, element.id) {
        Ok(records) => material_label(&records),
        Err(err) => {
            tracing::debug!(guid = %element.global_id, error = %err, "Materials unreadable");
            None
        }
    };

    Ok(Enrichment {
        material: material.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        classification_code: index
            .classification_code(element.id)?
            .unwrap_or(NOT_AVAILABLE)
            .to_string(),
        building_storey: building_storey(graph, element.id)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    })
}

/// Name (or long name) of the storey above `element` in the spatial tree.
///
/// Starts at the element's container; a part without one uses the container
/// of the aggregate it belongs to. From there the decomposition chain is
/// walked upwards until a storey is found.
#[must_use]
pub fn building_storey(graph: &dyn ModelGraph, element: EntityId) -> Option<String> {
    let mut visited = HashSet::new();
    let mut current = container_of(graph, element);

    while let Some(id) = current {
        if !visited.insert(id) {
            break;
        }
        let entity = graph.entity(id)?;
        if entity.is_a("IfcBuildingStorey") {
            return entity
                .name
                .clone()
                .or_else(|| entity.long_name.clone())
                .or_else(|| Some(NOT_AVAILABLE.to_string()));
        }
        current = graph.decomposes(id);
    }
    None
}

fn container_of(graph: &dyn ModelGraph, element: EntityId) -> Option<EntityId> {
    let mut visited = HashSet::new();
    let mut current = element;
    loop {
        if let Some(container) = graph.spatial_container(current) {
            return Some(container);
        }
        if !visited.insert(current) {
            return None;
        }
        current = graph.decomposes(current)?;
    }
}

#[must_use]
pub fn project_info(graph: &dyn ModelGraph) -> ProjectInfo {
    let first_name = |class_name: &str| {
        graph
            .list(class_name)
            .first()
            .and_then(|e| e.name.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };
    ProjectInfo {
        project: first_name("IfcProject"),
        site: first_name("IfcSite"),
        building: first_name("IfcBuilding"),
    }
}
