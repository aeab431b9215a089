//! Lookup structures over one loaded model.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::engine::material::flatten_materials;
use crate::error::IndexError;
use crate::model::{ClassificationNode, Entity, EntityId, ModelGraph};

/// Sentinel for attributes that could not be determined.
pub const NOT_AVAILABLE: &str = "n/a";

/// Class and predefined-type index over the products of one model, plus a
/// lazily built classification map.
///
/// The index owns the graph; [`ModelIndex::build`] replaces it and drops
/// every cache.
#[derive(Default)]
pub struct ModelIndex {
    graph: Option<Arc<dyn ModelGraph>>,
    /// Upper-cased class name to member ids, in product order.
    by_class: HashMap<String, Vec<EntityId>>,
    /// Upper-cased class name to display name.
    display_names: HashMap<String, String>,
    predefined_by_class: HashMap<String, BTreeSet<String>>,
    classifications: OnceCell<HashMap<EntityId, String>>,
}

impl std::fmt::Debug for ModelIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelIndex")
            .field("loaded", &self.graph.is_some())
            .field("classes", &self.by_class.len())
            .finish_non_exhaustive()
    }
}

impl ModelIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `graph`, replacing whatever was indexed before.
    pub fn build(&mut self, graph: Arc<dyn ModelGraph>) {
        self.by_class.clear();
        self.display_names.clear();
        self.predefined_by_class.clear();
        self.classifications = OnceCell::new();

        for entity in graph.products() {
            let key = entity.class_name.to_ascii_uppercase();
            self.by_class.entry(key.clone()).or_default().push(entity.id);
            self.display_names
                .entry(key.clone())
                .or_insert_with(|| entity.class_name.clone());
            if let Some(predefined) = entity.predefined_type.as_deref() {
                self.predefined_by_class
                    .entry(key)
                    .or_default()
                    .insert(predefined.to_string());
            }
        }

        tracing::debug!(
            classes = self.by_class.len(),
            products = self.by_class.values().map(Vec::len).sum::<usize>(),
            "Built model index"
        );
        self.graph = Some(graph);
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.graph.is_some()
    }

    /// The indexed graph.
    pub fn graph(&self) -> Result<&dyn ModelGraph, IndexError> {
        self.graph.as_deref().ok_or(IndexError::NotLoaded)
    }

    /// Class names present, alphabetically sorted.
    pub fn classes(&self) -> Result<Vec<String>, IndexError> {
        self.graph()?;
        let mut classes: Vec<String> = self.display_names.values().cloned().collect();
        classes.sort();
        Ok(classes)
    }

    /// Sorted distinct predefined types observed for `class_name`.
    pub fn predefined_types(&self, class_name: &str) -> Result<Vec<String>, IndexError> {
        self.graph()?;
        Ok(self
            .predefined_by_class
            .get(&class_name.to_ascii_uppercase())
            .map(|types| types.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Members of `class_name` in product order. Unknown classes give an
    /// empty bucket.
    pub fn bucket(&self, class_name: &str) -> Result<Vec<&Entity>, IndexError> {
        let graph = self.graph()?;
        Ok(self
            .by_class
            .get(&class_name.trim().to_ascii_uppercase())
            .map(|ids| ids.iter().filter_map(|id| graph.entity(*id)).collect())
            .unwrap_or_default())
    }

    /// Material categories seen on indexed elements, each with the first
    /// material name found for it.
    pub fn material_categories(&self) -> Result<BTreeMap<String, String>, IndexError> {
        let graph = self.graph()?;
        let mut categories = BTreeMap::new();
        for entity in graph.products() {
            let Ok(records) = flatten_materials(graph, entity.id) else {
                continue;
            };
            for record in records {
                let category = record.category.trim();
                if category.is_empty() || category == NOT_AVAILABLE {
                    continue;
                }
                categories
                    .entry(category.to_string())
                    .or_insert_with(|| record.name.trim().to_string());
            }
        }
        Ok(categories)
    }

    /// Classification code of an object, or `None` when it has none.
    pub fn classification_code(&self, id: EntityId) -> Result<Option<&str>, IndexError> {
        let graph = self.graph()?;
        let codes = self
            .classifications
            .get_or_init(|| build_classification_map(graph));
        Ok(codes.get(&id).map(String::as_str))
    }
}

fn build_classification_map(graph: &dyn ModelGraph) -> HashMap<EntityId, String> {
    let mut codes = HashMap::new();
    for association in graph.classification_associations() {
        let code = classification_code_of(graph, association.classification)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        for object in association.related {
            codes.insert(object, code.clone());
        }
    }
    tracing::debug!(objects = codes.len(), "Built classification map");
    codes
}

/// Identification, then name; a reference with neither falls back to what
/// it references.
fn classification_code_of(graph: &dyn ModelGraph, id: EntityId) -> Option<String> {
    let mut visited = BTreeSet::new();
    let mut current = id;
    while visited.insert(current) {
        match graph.classification_node(current) {
            Ok(ClassificationNode::Reference {
                identification,
                name,
                source,
            }) => {
                if let Some(code) = identification.or(name) {
                    return Some(code);
                }
                current = source?;
            }
            Ok(ClassificationNode::Classification { name }) => return name,
            Err(err) => {
                tracing::debug!(id = current, error = %err, "Unreadable classification");
                return None;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::index;
    use crate::parser::StepModel;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "\
#10=IFCWALL('0000000000000000000010',$,'W1',$,$,$,$,$,.STANDARD.);
#11=IFCWALL('0000000000000000000011',$,'W2',$,$,$,$,$,.PARTITIONING.);
#12=IFCWALL('0000000000000000000012',$,'W3',$,$,$,$,$,$);
#13=IFCSLAB('0000000000000000000013',$,'S1',$,$,$,$,$,.FLOOR.);
#14=IFCBEAM('0000000000000000000014',$,'B1',$,$,$,$,$,.BEAM.);
#50=IFCMATERIAL('C30/37',$,'Concrete');
#51=IFCMATERIAL('C25/30',$,'Concrete');
#52=IFCRELASSOCIATESMATERIAL('0000000000000000000052',$,$,$,(#10),#50);
#53=IFCRELASSOCIATESMATERIAL('0000000000000000000053',$,$,$,(#13),#51);
#60=IFCCLASSIFICATION($,$,$,'Uniclass',$,$,$);
#61=IFCCLASSIFICATIONREFERENCE($,'EF_25_10',$,#60,$,$);
#62=IFCRELASSOCIATESCLASSIFICATION('0000000000000000000062',$,$,$,(#10,#11),#61);
#63=IFCCLASSIFICATIONREFERENCE($,$,$,#60,$,$);
#64=IFCRELASSOCIATESCLASSIFICATION('0000000000000000000064',$,$,$,(#13),#63);";

    #[test]
    fn queries_fail_before_build() {
        let index = ModelIndex::new();
        assert!(!index.is_loaded());
        assert_eq!(index.classes(), Err(IndexError::NotLoaded));
        assert_eq!(index.predefined_types("IfcWall"), Err(IndexError::NotLoaded));
        assert!(index.bucket("IfcWall").is_err());
        assert_eq!(index.classification_code(1), Err(IndexError::NotLoaded));
    }

    #[test]
    fn lists_classes_and_predefined_types() {
        let index = index(MODEL);
        assert!(index.is_loaded());
        assert_eq!(
            index.classes().unwrap(),
            vec!["IfcBeam", "IfcSlab", "IfcWall"]
        );
        // the wall without a predefined type is not counted as a blank type
        assert_eq!(
            index.predefined_types("IfcWall").unwrap(),
            vec!["PARTITIONING", "STANDARD"]
        );
        assert_eq!(index.predefined_types("IFCWALL").unwrap().len(), 2);
        assert!(index.predefined_types("IfcDoor").unwrap().is_empty());
    }

    #[test]
    fn bucket_keeps_product_order() {
        let index = index(MODEL);
        let names: Vec<_> = index
            .bucket("IfcWall")
            .unwrap()
            .iter()
            .map(|e| e.name.clone().unwrap_or_default())
            .collect();
        assert_eq!(names, vec!["W1", "W2", "W3"]);
        assert!(index.bucket("IfcColumn").unwrap().is_empty());
    }

    #[test]
    fn material_categories_keep_first_name() {
        let index = index(MODEL);
        let categories = index.material_categories().unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories.get("Concrete").map(String::as_str), Some("C30/37"));
    }

    #[test]
    fn shared_reference_gives_same_code() {
        let index = index(MODEL);
        assert_eq!(index.classification_code(10).unwrap(), Some("EF_25_10"));
        assert_eq!(index.classification_code(11).unwrap(), Some("EF_25_10"));
        // a reference without identification or name uses its classification
        assert_eq!(index.classification_code(13).unwrap(), Some("Uniclass"));
        assert_eq!(index.classification_code(14).unwrap(), None);
    }

    #[test]
    fn rebuild_replaces_previous_model() {
        let mut index = index(MODEL);
        assert_eq!(index.classification_code(10).unwrap(), Some("EF_25_10"));
        let content = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n\
#10=IFCCOLUMN('0000000000000000000010',$,'C1',$,$,$,$,$,.COLUMN.);\nENDSEC;\nEND-ISO-10303-21;\n";
        index.build(Arc::new(StepModel::parse_str(content, "b.ifc").unwrap()));
        assert_eq!(index.classes().unwrap(), vec!["IfcColumn"]);
        assert_eq!(index.classification_code(10).unwrap(), None);
    }
}
