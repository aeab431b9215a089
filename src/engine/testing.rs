//! Shared fixtures for engine tests.

use std::sync::Arc;

use crate::engine::index::ModelIndex;
use crate::parser::StepModel;

/// Index the entity instances in `data`, wrapped in a minimal IFC4 file.
pub(crate) fn index(data: &str) -> ModelIndex {
    let content = format!(
        "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('IFC4'));\nENDSEC;\nDATA;\n{data}\nENDSEC;\nEND-ISO-10303-21;\n"
    );
    let model = StepModel::parse_str(&content, "test.ifc").unwrap();
    let mut index = ModelIndex::new();
    index.build(Arc::new(model));
    index
}

/// Three standard walls on one storey: 2.5 and 1.5 load bearing, 2.0 not.
pub(crate) const LOAD_BEARING_WALLS: &str = "\
#1=IFCPROJECT('0000000000000000000001',$,'Demo',$,$,$,$,$,$);
#2=IFCBUILDINGSTOREY('0000000000000000000002',$,'Ground',$,$,$,$,$,.ELEMENT.,0.);
#3=IFCRELAGGREGATES('0000000000000000000003',$,$,$,#1,(#2));
#10=IFCWALL('0000000000000000000010',$,'W1',$,$,$,$,$,.STANDARD.);
#11=IFCWALL('0000000000000000000011',$,'W2',$,$,$,$,$,.STANDARD.);
#12=IFCWALL('0000000000000000000012',$,'W3',$,$,$,$,$,.STANDARD.);
#13=IFCRELCONTAINEDINSPATIALSTRUCTURE('0000000000000000000013',$,$,$,(#10,#11,#12),#2);
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
#35=IFCRELDEFINESBYPROPERTIES('0000000000000000000035',$,$,$,(#11),#33);";
