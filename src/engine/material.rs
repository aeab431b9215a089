//! Flattening of composite material structures to leaf records.

use std::collections::HashSet;

use crate::error::ResolveError;
use crate::model::{EntityId, MaterialNode, ModelGraph};
use crate::rules::MaterialRecord;

/// Leaf materials associated with `element`, depth-first in association
/// order. A structure that refers back into its own path is a
/// [`ResolveError::Cycle`].
pub fn flatten_materials(
    graph: &dyn ModelGraph,
    element: EntityId,
) -> Result<Vec<MaterialRecord>, ResolveError> {
    let mut records = Vec::new();
    let mut path = HashSet::new();
    for select in graph.material_associations(element) {
        collect(graph, select, &mut path, &mut records)?;
    }
    Ok(records)
}

fn collect(
    graph: &dyn ModelGraph,
    id: EntityId,
    path: &mut HashSet<EntityId>,
    out: &mut Vec<MaterialRecord>,
) -> Result<(), ResolveError> {
    if !path.insert(id) {
        return Err(ResolveError::Cycle { id });
    }

    let children = match graph.material_node(id)? {
        MaterialNode::Material { name, category } => {
            out.push(MaterialRecord { name, category });
            Vec::new()
        }
        MaterialNode::Layer { material }
        | MaterialNode::Constituent { material }
        | MaterialNode::Profile { material } => material.into_iter().collect(),
        MaterialNode::LayerSet { layers } => layers,
        MaterialNode::ConstituentSet { constituents } => constituents,
        MaterialNode::ProfileSet { profiles } => profiles,
        MaterialNode::List { materials } => materials,
        MaterialNode::LayerSetUsage { layer_set } => vec![layer_set],
        MaterialNode::ProfileSetUsage { profile_set } => vec![profile_set],
    };

    for child in children {
        collect(graph, child, path, out)?;
    }
    path.remove(&id);
    Ok(())
}

/// Comma-joined leaf material names, or `None` when there are none.
#[must_use]
pub fn material_label(records: &[MaterialRecord]) -> Option<String> {
    let names: Vec<&str> = records
        .iter()
        .map(|r| r.name.trim())
        .filter(|n| !n.is_empty())
        .collect();
    (!names.is_empty()).then(|| names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StepModel;
    use pretty_assertions::assert_eq;

    fn model(data: &str) -> StepModel {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n\
#10=IFCWALL('0000000000000000000010',$,'W1',$,$,$,$,$,.STANDARD.);\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
        );
        StepModel::parse_str(&content, "test.ifc").unwrap()
    }

    fn names(records: &[MaterialRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn flattens_layer_set_usage() {
        let m = model(
            "#50=IFCMATERIAL('Brick',$,'Masonry');
#51=IFCMATERIAL('Insulation',$,'Insulation');
#52=IFCMATERIALLAYER(#50,0.1,$,$,$,$,$);
#53=IFCMATERIALLAYER(#51,0.05,$,$,$,$,$);
#54=IFCMATERIALLAYERSET((#52,#53),'Ext',$);
#55=IFCMATERIALLAYERSETUSAGE(#54,.AXIS2.,.POSITIVE.,0.,$);
#56=IFCRELASSOCIATESMATERIAL('0000000000000000000056',$,$,$,(#10),#55);",
        );
        let records = flatten_materials(&m, 10).unwrap();
        assert_eq!(names(&records), vec!["Brick", "Insulation"]);
        assert_eq!(records[0].category, "Masonry");
        assert_eq!(material_label(&records).as_deref(), Some("Brick, Insulation"));
    }

    #[test]
    fn flattens_constituents_and_lists() {
        let m = model(
            "#50=IFCMATERIAL('Steel',$,'Metal');
#51=IFCMATERIAL('Concrete',$,'Concrete');
#52=IFCMATERIALCONSTITUENT('Rebar',$,#50,0.02,$);
#53=IFCMATERIALCONSTITUENT('Matrix',$,#51,0.98,$);
#54=IFCMATERIALCONSTITUENTSET('RC',$,(#52,#53));
#55=IFCMATERIALLIST((#51,#50));
#56=IFCRELASSOCIATESMATERIAL('0000000000000000000056',$,$,$,(#10),#54);
#57=IFCRELASSOCIATESMATERIAL('0000000000000000000057',$,$,$,(#10),#55);",
        );
        let records = flatten_materials(&m, 10).unwrap();
        assert_eq!(names(&records), vec!["Steel", "Concrete", "Concrete", "Steel"]);
    }

    #[test]
    fn shared_material_is_not_a_cycle() {
        let m = model(
            "#50=IFCMATERIAL('Brick',$,'Masonry');
#52=IFCMATERIALLAYER(#50,0.1,$,$,$,$,$);
#53=IFCMATERIALLAYER(#50,0.1,$,$,$,$,$);
#54=IFCMATERIALLAYERSET((#52,#53),'Ext',$);
#56=IFCRELASSOCIATESMATERIAL('0000000000000000000056',$,$,$,(#10),#54);",
        );
        assert_eq!(flatten_materials(&m, 10).unwrap().len(), 2);
    }

    #[test]
    fn dangling_and_wrong_kind_are_errors() {
        let m = model("#56=IFCRELASSOCIATESMATERIAL('0000000000000000000056',$,$,$,(#10),#99);");
        assert_eq!(
            flatten_materials(&m, 10),
            Err(ResolveError::Missing { id: 99 })
        );
        let m = model(
            "#52=IFCMATERIALLAYER(#10,0.1,$,$,$,$,$);
#56=IFCRELASSOCIATESMATERIAL('0000000000000000000056',$,$,$,(#10),#52);",
        );
        assert!(matches!(
            flatten_materials(&m, 10),
            Err(ResolveError::UnexpectedKind { id: 10, .. })
        ));
    }

    #[test]
    fn self_referencing_list_is_a_cycle() {
        let m = model(
            "#55=IFCMATERIALLIST((#55));
#56=IFCRELASSOCIATESMATERIAL('0000000000000000000056',$,$,$,(#10),#55);",
        );
        assert_eq!(flatten_materials(&m, 10), Err(ResolveError::Cycle { id: 55 }));
    }

    #[test]
    fn no_association_is_empty() {
        let m = model("");
        assert!(flatten_materials(&m, 10).unwrap().is_empty());
        assert_eq!(material_label(&[]), None);
    }
}
