#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Three standard walls (2.5 and 1.5 load bearing, 2.0 not) and one floor
/// slab with no `IsExternal` value, all on storey "Ground".
pub const MODEL: &str = "\
ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [ReferenceView]'),'2;1');
FILE_NAME('tower.ifc','2024-01-01T00:00:00',(''),(''),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('0000000000000000000001',$,'Demo',$,$,$,$,$,$);
#2=IFCSITE('0000000000000000000002',$,'Lot 7',$,$,$,$,$,.ELEMENT.,$,$,$,$,$);
#3=IFCBUILDING('0000000000000000000003',$,'Block A',$,$,$,$,$,.ELEMENT.,$,$,$);
#4=IFCBUILDINGSTOREY('0000000000000000000004',$,'Ground',$,$,$,$,$,.ELEMENT.,0.);
#5=IFCRELAGGREGATES('0000000000000000000005',$,$,$,#1,(#2));
#6=IFCRELAGGREGATES('0000000000000000000006',$,$,$,#2,(#3));
#7=IFCRELAGGREGATES('0000000000000000000007',$,$,$,#3,(#4));
#10=IFCWALL('0000000000000000000010',$,'W1',$,$,$,$,$,.STANDARD.);
#11=IFCWALL('0000000000000000000011',$,'W2',$,$,$,$,$,.STANDARD.);
#12=IFCWALL('0000000000000000000012',$,'W3',$,$,$,$,$,.STANDARD.);
#14=IFCSLAB('0000000000000000000014',$,'S1',$,$,$,$,$,.FLOOR.);
#13=IFCRELCONTAINEDINSPATIALSTRUCTURE('0000000000000000000013',$,$,$,(#10,#11,#12,#14),#4);
#20=IFCQUANTITYVOLUME('NetVolume',$,$,2.5,$);
#21=IFCQUANTITYVOLUME('NetVolume',$,$,2.0,$);
#22=IFCQUANTITYVOLUME('NetVolume',$,$,1.5,$);
#23=IFCELEMENTQUANTITY('0000000000000000000023',$,'Qto_WallBaseQuantities',$,$,(#20));
#24=IFCELEMENTQUANTITY('0000000000000000000024',$,'Qto_WallBaseQuantities',$,$,(#21));
#25=IFCELEMENTQUANTITY('0000000000000000000025',$,'Qto_WallBaseQuantities',$,$,(#22));
#26=IFCRELDEFINESBYPROPERTIES('0000000000000000000026',$,$,$,(#10),#23);
#27=IFCRELDEFINESBYPROPERTIES('0000000000000000000027',$,$,$,(#11),#24);
#28=IFCRELDEFINESBYPROPERTIES('0000000000000000000028',$,$,$,(#12),#25);
#30=IFCPROPERTYSINGLEVALUE('LoadBearing',$,IFCBOOLEAN(.T.),$);
#31=IFCPROPERTYSINGLEVALUE('LoadBearing',$,IFCBOOLEAN(.F.),$);
#32=IFCPROPERTYSET('0000000000000000000032',$,'Pset_WallCommon',$,(#30));
#33=IFCPROPERTYSET('0000000000000000000033',$,'Pset_WallCommon',$,(#31));
#34=IFCRELDEFINESBYPROPERTIES('0000000000000000000034',$,$,$,(#10,#12),#32);
#35=IFCRELDEFINESBYPROPERTIES('0000000000000000000035',$,$,$,(#11),#33);
#40=IFCQUANTITYAREA('NetArea',$,$,20.,$);
#41=IFCELEMENTQUANTITY('0000000000000000000041',$,'Qto_SlabBaseQuantities',$,$,(#40));
#42=IFCRELDEFINESBYPROPERTIES('0000000000000000000042',$,$,$,(#14),#41);
#50=IFCMATERIAL('C30/37',$,'Concrete');
#51=IFCRELASSOCIATESMATERIAL('0000000000000000000051',$,$,$,(#10,#11,#12,#14),#50);
#60=IFCCLASSIFICATIONREFERENCE($,'Ss_25_10',$,$,$,$);
#61=IFCRELASSOCIATESCLASSIFICATION('0000000000000000000061',$,$,$,(#10),#60);
ENDSEC;
END-ISO-10303-21;
";

/// Leaf 1.1 has a level-10 row, leaf 1.2 does not.
pub const WBS: &str = "\
NÍVEL;WBS;DESCRIÇÃO;UNID.;QDTE.
1;1;Estrutura;;
2;1.1;Paredes;m3;99
10;;Paredes de betão;m3;5
2;1.2;Lajes;m2;
1;2;Acabamentos;;
";

pub const RULES: &str = r#"{
  "version": 1,
  "rules": {
    "1.1": {
      "filter": { "ifc_class": "IfcWall", "predefined_type": "STANDARD" },
      "quantity": { "pset": "Qto_WallBaseQuantities", "prop": "NetVolume" },
      "grouping": { "pset": "Pset_WallCommon", "prop": "LoadBearing" }
    },
    "1.2": {
      "filter": { "ifc_class": "IfcSlab", "predefined_type": "FLOOR" },
      "material": "concrete",
      "quantity": { "pset": "Qto_SlabBaseQuantities", "prop": "NetArea" },
      "grouping": { "pset": "Pset_SlabCommon", "prop": "IsExternal" }
    }
  }
}"#;

/// A temp directory holding `tower.ifc`, `wbs.csv` and `rules.json`.
pub struct Workspace {
    pub dir: TempDir,
    pub model: PathBuf,
    pub wbs: PathBuf,
    pub rules: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("tower.ifc");
        let wbs = dir.path().join("wbs.csv");
        let rules = dir.path().join("rules.json");
        fs::write(&model, MODEL).unwrap();
        fs::write(&wbs, WBS).unwrap();
        fs::write(&rules, RULES).unwrap();
        Self {
            dir,
            model,
            wbs,
            rules,
        }
    }

    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }
}

/// Read a CSV output as rows of cells, dropping a leading byte-order mark.
pub fn read_rows(path: &std::path::Path, delimiter: u8) -> Vec<Vec<String>> {
    let content = fs::read_to_string(path).unwrap();
    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_reader(content.as_bytes());
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}
