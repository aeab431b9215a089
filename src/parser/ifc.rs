use crate::error::{ParseError, ResolveError};
use crate::model::{
    ClassificationAssociation, ClassificationNode, Entity, EntityId, MaterialNode, ModelGraph,
    PropertySets, PropertyValue,
};
use crate::parser::step::{StepEntity, StepFile, StepValue};
use std::collections::HashMap;
use std::path::Path;

/// Display names for the classes rule authors usually pick. Anything else
/// falls back to a capitalised form of the STEP name.
const CLASS_NAMES: &[(&str, &str)] = &[
    ("IFCPROJECT", "IfcProject"),
    ("IFCSITE", "IfcSite"),
    ("IFCBUILDING", "IfcBuilding"),
    ("IFCBUILDINGSTOREY", "IfcBuildingStorey"),
    ("IFCSPACE", "IfcSpace"),
    ("IFCWALL", "IfcWall"),
    ("IFCWALLSTANDARDCASE", "IfcWallStandardCase"),
    ("IFCWALLELEMENTEDCASE", "IfcWallElementedCase"),
    ("IFCCURTAINWALL", "IfcCurtainWall"),
    ("IFCSLAB", "IfcSlab"),
    ("IFCSLABSTANDARDCASE", "IfcSlabStandardCase"),
    ("IFCROOF", "IfcRoof"),
    ("IFCBEAM", "IfcBeam"),
    ("IFCBEAMSTANDARDCASE", "IfcBeamStandardCase"),
    ("IFCCOLUMN", "IfcColumn"),
    ("IFCCOLUMNSTANDARDCASE", "IfcColumnStandardCase"),
    ("IFCMEMBER", "IfcMember"),
    ("IFCPLATE", "IfcPlate"),
    ("IFCFOOTING", "IfcFooting"),
    ("IFCPILE", "IfcPile"),
    ("IFCDOOR", "IfcDoor"),
    ("IFCDOORSTANDARDCASE", "IfcDoorStandardCase"),
    ("IFCWINDOW", "IfcWindow"),
    ("IFCWINDOWSTANDARDCASE", "IfcWindowStandardCase"),
    ("IFCSTAIR", "IfcStair"),
    ("IFCSTAIRFLIGHT", "IfcStairFlight"),
    ("IFCRAMP", "IfcRamp"),
    ("IFCRAMPFLIGHT", "IfcRampFlight"),
    ("IFCRAILING", "IfcRailing"),
    ("IFCCOVERING", "IfcCovering"),
    ("IFCCHIMNEY", "IfcChimney"),
    ("IFCSHADINGDEVICE", "IfcShadingDevice"),
    ("IFCBUILDINGELEMENTPROXY", "IfcBuildingElementProxy"),
    ("IFCELEMENTASSEMBLY", "IfcElementAssembly"),
    ("IFCFURNISHINGELEMENT", "IfcFurnishingElement"),
    ("IFCFURNITURE", "IfcFurniture"),
    ("IFCFLOWTERMINAL", "IfcFlowTerminal"),
    ("IFCFLOWSEGMENT", "IfcFlowSegment"),
    ("IFCFLOWFITTING", "IfcFlowFitting"),
    ("IFCSANITARYTERMINAL", "IfcSanitaryTerminal"),
    ("IFCLIGHTFIXTURE", "IfcLightFixture"),
    ("IFCDUCTSEGMENT", "IfcDuctSegment"),
    ("IFCPIPESEGMENT", "IfcPipeSegment"),
    ("IFCCABLESEGMENT", "IfcCableSegment"),
    ("IFCREINFORCINGBAR", "IfcReinforcingBar"),
    ("IFCREINFORCINGMESH", "IfcReinforcingMesh"),
    ("IFCTENDON", "IfcTendon"),
    ("IFCOPENINGELEMENT", "IfcOpeningElement"),
    ("IFCVIRTUALELEMENT", "IfcVirtualElement"),
];

/// Attribute position of `PredefinedType` where it is not the usual 8.
/// `None` marks classes whose attribute 8 is something else.
const PREDEFINED_TYPE_INDEX: &[(&str, Option<usize>)] = &[
    ("IFCSITE", None),
    ("IFCBUILDING", None),
    ("IFCBUILDINGSTOREY", None),
    ("IFCSPACE", Some(9)),
    ("IFCDOOR", Some(10)),
    ("IFCDOORSTANDARDCASE", Some(10)),
    ("IFCWINDOW", Some(10)),
    ("IFCWINDOWSTANDARDCASE", Some(10)),
    ("IFCSTAIRFLIGHT", Some(12)),
    ("IFCELEMENTASSEMBLY", Some(9)),
    ("IFCTENDON", Some(9)),
    ("IFCREINFORCINGBAR", Some(12)),
    ("IFCREINFORCINGMESH", Some(17)),
];

/// IFC2X3 classes without a `PredefinedType`, whose slots hold other
/// enumerations (composition, shape, bar role, space side).
/// Checked before [`PREDEFINED_TYPE_INDEX`] for IFC2X3 files.
const IFC2X3_PREDEFINED_TYPE_INDEX: &[(&str, Option<usize>)] = &[
    ("IFCBUILDINGELEMENTPROXY", None),
    ("IFCSPACE", None),
    ("IFCROOF", None),
    ("IFCSTAIR", None),
    ("IFCRAMP", None),
    ("IFCDOOR", None),
    ("IFCWINDOW", None),
    ("IFCSTAIRFLIGHT", None),
    ("IFCREINFORCINGBAR", None),
    ("IFCREINFORCINGMESH", None),
    ("IFCELECTRICDISTRIBUTIONPOINT", None),
];

/// Spatial structure classes carrying `LongName` at attribute 7.
const LONG_NAME_CLASSES: &[&str] = &["IFCSITE", "IFCBUILDING", "IFCBUILDINGSTOREY", "IFCSPACE"];

/// Rooted entities that are never products even when their attributes
/// happen to look like placement/representation slots.
const NON_PRODUCTS: &[&str] = &[
    "IFCPROJECT",
    "IFCPROJECTLIBRARY",
    "IFCPROPERTYSET",
    "IFCELEMENTQUANTITY",
    "IFCTYPEOBJECT",
    "IFCTYPEPRODUCT",
];

/// A building model loaded from a STEP file.
#[derive(Debug)]
pub struct StepModel {
    step: StepFile,
    file_path: String,
    entities: HashMap<EntityId, Entity>,
    rooted: Vec<EntityId>,
    products: Vec<EntityId>,
    by_class: HashMap<String, Vec<EntityId>>,
    container: HashMap<EntityId, EntityId>,
    parent: HashMap<EntityId, EntityId>,
    definitions: HashMap<EntityId, Vec<EntityId>>,
    type_of: HashMap<EntityId, EntityId>,
    materials: HashMap<EntityId, Vec<EntityId>>,
    classifications: Vec<ClassificationAssociation>,
}

/// Loads an IFC file into a queryable model.
///
/// Supports both IFC2x3 and IFC4 schemas. Resolves:
/// - Rooted entities with class, name, object type and predefined type
/// - Spatial containment and aggregation
/// - Property and quantity set assignments (occurrence and type)
/// - Material and classification associations
///
/// # Errors
///
/// Returns [`ParseError::FileRead`] if the file cannot be read.
/// Returns [`ParseError::InvalidStep`] if the content is not a STEP file.
///
/// # Example
///
/// ```no_run
/// use ifc_wbs::parser::parse_ifc_file;
/// use ifc_wbs::model::ModelGraph;
///
/// let model = parse_ifc_file("model.ifc")?;
/// println!("{} products", model.products().len());
/// # Ok::<(), ifc_wbs::error::ParseError>(())
/// ```
pub fn parse_ifc_file<P: AsRef<Path>>(path: P) -> Result<StepModel, ParseError> {
    let content = std::fs::read_to_string(&path).map_err(|source| ParseError::FileRead {
        path: path.as_ref().to_path_buf(),
        source,
    })?;

    let model = StepModel::parse_str(&content, &path.as_ref().to_string_lossy())?;
    tracing::info!(
        path = %path.as_ref().display(),
        schema = %model.schema(),
        products = model.products.len(),
        "Loaded IFC model"
    );
    Ok(model)
}

impl StepModel {
    /// Build a model from STEP text. `file_path` is only used for reporting.
    pub fn parse_str(content: &str, file_path: &str) -> Result<Self, ParseError> {
        let step = StepFile::parse(content)?;
        Ok(Self::from_step(step, file_path))
    }

    #[must_use]
    pub fn from_step(step: StepFile, file_path: &str) -> Self {
        let mut model = StepModel {
            step,
            file_path: file_path.to_string(),
            entities: HashMap::new(),
            rooted: Vec::new(),
            products: Vec::new(),
            by_class: HashMap::new(),
            container: HashMap::new(),
            parent: HashMap::new(),
            definitions: HashMap::new(),
            type_of: HashMap::new(),
            materials: HashMap::new(),
            classifications: Vec::new(),
        };
        model.index_entities();
        model.index_relationships();
        model
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.step.schema
    }

    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    fn index_entities(&mut self) {
        let mut entities = HashMap::new();
        let mut rooted = Vec::new();
        let mut products = Vec::new();
        let mut by_class: HashMap<String, Vec<EntityId>> = HashMap::new();
        let legacy = is_ifc2x3(&self.step.schema);

        for raw in self.step.iter() {
            if !is_rooted(raw) {
                continue;
            }
            if is_product(raw) {
                products.push(raw.id);
            }
            rooted.push(raw.id);
            by_class
                .entry(raw.entity_type.clone())
                .or_default()
                .push(raw.id);
            entities.insert(raw.id, decode_entity(raw, legacy));
        }

        self.entities = entities;
        self.rooted = rooted;
        self.products = products;
        self.by_class = by_class;
    }

    fn index_relationships(&mut self) {
        for rel in self.step.get_entities_by_type("IFCRELCONTAINEDINSPATIALSTRUCTURE") {
            // 4 = RelatedElements, 5 = RelatingStructure
            if let Some(structure) = rel.reference(5) {
                for element in rel.references(4) {
                    self.container.entry(element).or_insert(structure);
                }
            }
        }

        for rel in self.step.get_entities_by_type("IFCRELAGGREGATES") {
            // 4 = RelatingObject, 5 = RelatedObjects
            if let Some(whole) = rel.reference(4) {
                for part in rel.references(5) {
                    self.parent.entry(part).or_insert(whole);
                }
            }
        }

        for rel in self.step.get_entities_by_type("IFCRELDEFINESBYPROPERTIES") {
            // 4 = RelatedObjects, 5 = RelatingPropertyDefinition
            let definitions = rel.references(5);
            for object in rel.references(4) {
                self.definitions
                    .entry(object)
                    .or_default()
                    .extend(definitions.iter().copied());
            }
        }

        for rel in self.step.get_entities_by_type("IFCRELDEFINESBYTYPE") {
            // 4 = RelatedObjects, 5 = RelatingType
            if let Some(type_id) = rel.reference(5) {
                for object in rel.references(4) {
                    self.type_of.entry(object).or_insert(type_id);
                }
            }
        }

        for rel in self.step.get_entities_by_type("IFCRELASSOCIATESMATERIAL") {
            // 4 = RelatedObjects, 5 = RelatingMaterial
            if let Some(material) = rel.reference(5) {
                for object in rel.references(4) {
                    self.materials.entry(object).or_default().push(material);
                }
            }
        }

        for rel in self.step.get_entities_by_type("IFCRELASSOCIATESCLASSIFICATION") {
            // 4 = RelatedObjects, 5 = RelatingClassification
            if let Some(classification) = rel.reference(5) {
                self.classifications.push(ClassificationAssociation {
                    related: rel.references(4),
                    classification,
                });
            }
        }
    }

    fn raw(&self, id: EntityId) -> Result<&StepEntity, ResolveError> {
        self.step
            .get_entity(id)
            .ok_or(ResolveError::Missing { id })
    }

    /// Decode one property definition into `psets`. Definitions other than
    /// property sets and element quantities are ignored.
    fn read_definition(
        &self,
        id: EntityId,
        psets: &mut PropertySets,
        inherited: bool,
    ) -> Result<(), ResolveError> {
        let definition = self.raw(id)?;
        let (name, members) = match definition.entity_type.as_str() {
            // 2 = Name, 4 = HasProperties
            "IFCPROPERTYSET" => (definition.string(2), definition.references(4)),
            // 2 = Name, 5 = Quantities
            "IFCELEMENTQUANTITY" => (definition.string(2), definition.references(5)),
            _ => return Ok(()),
        };
        let Some(pset_name) = name else {
            return Ok(());
        };

        for member_id in members {
            let member = self.raw(member_id)?;
            let Some((prop_name, value)) = read_property(member) else {
                continue;
            };
            if inherited {
                psets.insert_if_absent(pset_name, prop_name, value);
            } else {
                psets.insert(pset_name, prop_name, value);
            }
        }
        Ok(())
    }
}

impl ModelGraph for StepModel {
    fn products(&self) -> Vec<&Entity> {
        self.products
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    fn list(&self, class_name: &str) -> Vec<&Entity> {
        self.by_class
            .get(&class_name.to_ascii_uppercase())
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    fn property_sets(&self, id: EntityId) -> Result<PropertySets, ResolveError> {
        let mut psets = PropertySets::new();

        for definition in self.definitions.get(&id).into_iter().flatten() {
            self.read_definition(*definition, &mut psets, false)?;
        }

        if let Some(&type_id) = self.type_of.get(&id) {
            let type_object = self.raw(type_id)?;
            // 5 = HasPropertySets
            for definition in type_object.references(5) {
                self.read_definition(definition, &mut psets, true)?;
            }
            for definition in self.definitions.get(&type_id).into_iter().flatten() {
                self.read_definition(*definition, &mut psets, true)?;
            }
        }

        Ok(psets)
    }

    fn spatial_container(&self, id: EntityId) -> Option<EntityId> {
        self.container.get(&id).copied()
    }

    fn decomposes(&self, id: EntityId) -> Option<EntityId> {
        self.parent.get(&id).copied()
    }

    fn material_associations(&self, id: EntityId) -> Vec<EntityId> {
        self.materials.get(&id).cloned().unwrap_or_default()
    }

    fn material_node(&self, id: EntityId) -> Result<MaterialNode, ResolveError> {
        let raw = self.raw(id)?;
        let node = match raw.entity_type.as_str() {
            // 0 = Name, 2 = Category (IFC4)
            "IFCMATERIAL" => MaterialNode::Material {
                name: raw.string(0).unwrap_or_default().to_string(),
                category: raw.string(2).unwrap_or_default().to_string(),
            },
            "IFCMATERIALLAYER" | "IFCMATERIALLAYERWITHOFFSETS" => MaterialNode::Layer {
                material: raw.reference(0),
            },
            "IFCMATERIALLAYERSET" => MaterialNode::LayerSet {
                layers: raw.references(0),
            },
            "IFCMATERIALLAYERSETUSAGE" => MaterialNode::LayerSetUsage {
                layer_set: raw.reference(0).ok_or_else(|| unexpected(raw, "layer set"))?,
            },
            "IFCMATERIALCONSTITUENT" => MaterialNode::Constituent {
                material: raw.reference(2),
            },
            "IFCMATERIALCONSTITUENTSET" => MaterialNode::ConstituentSet {
                constituents: raw.references(2),
            },
            "IFCMATERIALPROFILE" | "IFCMATERIALPROFILEWITHOFFSETS" => MaterialNode::Profile {
                material: raw.reference(2),
            },
            "IFCMATERIALPROFILESET" => MaterialNode::ProfileSet {
                profiles: raw.references(2),
            },
            "IFCMATERIALPROFILESETUSAGE" | "IFCMATERIALPROFILESETUSAGETAPERING" => {
                MaterialNode::ProfileSetUsage {
                    profile_set: raw
                        .reference(0)
                        .ok_or_else(|| unexpected(raw, "profile set"))?,
                }
            }
            "IFCMATERIALLIST" => MaterialNode::List {
                materials: raw.references(0),
            },
            _ => return Err(unexpected(raw, "material")),
        };
        Ok(node)
    }

    fn classification_associations(&self) -> Vec<ClassificationAssociation> {
        self.classifications.clone()
    }

    fn classification_node(&self, id: EntityId) -> Result<ClassificationNode, ResolveError> {
        let raw = self.raw(id)?;
        match raw.entity_type.as_str() {
            // 1 = Identification / ItemReference, 2 = Name, 3 = ReferencedSource
            "IFCCLASSIFICATIONREFERENCE" => Ok(ClassificationNode::Reference {
                identification: raw.string(1).map(str::to_string),
                name: raw.string(2).map(str::to_string),
                source: raw.reference(3),
            }),
            // 3 = Name
            "IFCCLASSIFICATION" => Ok(ClassificationNode::Classification {
                name: raw.string(3).map(str::to_string),
            }),
            _ => Err(unexpected(raw, "classification")),
        }
    }
}

fn unexpected(raw: &StepEntity, expected: &'static str) -> ResolveError {
    ResolveError::UnexpectedKind {
        id: raw.id,
        expected,
        found: display_class_name(&raw.entity_type),
    }
}

fn is_global_id(s: &str) -> bool {
    s.len() == 22
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// `IfcRoot` subtypes start with GlobalId followed by an OwnerHistory slot.
fn is_rooted(raw: &StepEntity) -> bool {
    raw.values.len() >= 4
        && raw.values.first().and_then(StepValue::as_str).is_some_and(is_global_id)
        && matches!(raw.values[1], StepValue::Reference(_) | StepValue::Null)
        && !raw.entity_type.starts_with("IFCREL")
}

/// `IfcProduct` subtypes carry ObjectPlacement and Representation at 5 and 6.
fn is_product(raw: &StepEntity) -> bool {
    let ty = raw.entity_type.as_str();
    raw.values.len() >= 7
        && !ty.ends_with("TYPE")
        && !ty.ends_with("STYLE")
        && !NON_PRODUCTS.contains(&ty)
        && matches!(raw.values[5], StepValue::Reference(_) | StepValue::Null)
        && matches!(raw.values[6], StepValue::Reference(_) | StepValue::Null)
}

fn is_ifc2x3(schema: &str) -> bool {
    schema.to_ascii_uppercase().starts_with("IFC2X3")
}

/// Position of `PredefinedType` for a STEP type, `None` if the class has none.
fn predefined_type_slot(ty: &str, ifc2x3: bool) -> Option<usize> {
    let legacy = ifc2x3
        .then(|| IFC2X3_PREDEFINED_TYPE_INDEX.iter().find(|(name, _)| *name == ty))
        .flatten();
    legacy
        .or_else(|| PREDEFINED_TYPE_INDEX.iter().find(|(name, _)| *name == ty))
        .map_or(Some(8), |(_, index)| *index)
}

fn decode_entity(raw: &StepEntity, ifc2x3: bool) -> Entity {
    let ty = raw.entity_type.as_str();
    let predefined_index = predefined_type_slot(ty, ifc2x3);
    let long_name = if LONG_NAME_CLASSES.contains(&ty) {
        raw.string(7).map(str::to_string)
    } else {
        None
    };

    Entity {
        id: raw.id,
        class_name: display_class_name(ty),
        global_id: raw.string(0).unwrap_or_default().to_string(),
        name: raw.string(2).map(str::to_string),
        long_name,
        object_type: raw.string(4).map(str::to_string),
        predefined_type: predefined_index
            .and_then(|index| raw.enum_value(index))
            .map(str::to_string),
    }
}

/// `IFCWALL` → `IfcWall` for known classes, `IFCFOO` → `IfcFoo` otherwise.
#[must_use]
pub fn display_class_name(step_type: &str) -> String {
    if let Some((_, name)) = CLASS_NAMES.iter().find(|(raw, _)| *raw == step_type) {
        return (*name).to_string();
    }
    match step_type.strip_prefix("IFC") {
        Some(rest) if !rest.is_empty() => {
            let mut name = String::from("Ifc");
            let mut chars = rest.chars();
            if let Some(first) = chars.next() {
                name.push(first.to_ascii_uppercase());
            }
            name.extend(chars.map(|c| c.to_ascii_lowercase()));
            name
        }
        _ => step_type.to_string(),
    }
}

/// Name and value of a property or physical quantity.
fn read_property(member: &StepEntity) -> Option<(&str, PropertyValue)> {
    // Properties and quantities both start with Name
    let name = member.string(0)?;
    let value = match member.entity_type.as_str() {
        // 2 = NominalValue
        "IFCPROPERTYSINGLEVALUE" => to_property_value(member.values.get(2)?)?,
        // 2 = EnumerationValues / ListValues
        "IFCPROPERTYENUMERATEDVALUE" | "IFCPROPERTYLISTVALUE" => {
            to_property_value(member.values.get(2)?)?
        }
        // 3 = LengthValue / AreaValue / VolumeValue / CountValue / WeightValue / TimeValue
        "IFCQUANTITYLENGTH" | "IFCQUANTITYAREA" | "IFCQUANTITYVOLUME" | "IFCQUANTITYCOUNT"
        | "IFCQUANTITYWEIGHT" | "IFCQUANTITYTIME" => to_property_value(member.values.get(3)?)?,
        _ => return None,
    };
    Some((name, value))
}

fn to_property_value(value: &StepValue) -> Option<PropertyValue> {
    match value {
        StepValue::String(s) | StepValue::Enum(s) => Some(PropertyValue::Text(s.clone())),
        StepValue::Real(f) => Some(PropertyValue::Real(*f)),
        StepValue::Integer(i) => Some(PropertyValue::Integer(*i)),
        StepValue::Boolean(b) => Some(PropertyValue::Bool(*b)),
        StepValue::List(items) => Some(PropertyValue::List(
            items.iter().filter_map(to_property_value).collect(),
        )),
        StepValue::Reference(_) | StepValue::Null | StepValue::Derived => None,
    }
}
