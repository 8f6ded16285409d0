//! Import declarations of one unit, in resolver-friendly form.

use rejig_core::{Name, PackageName, QualifiedName};
use rejig_hir::{CompilationUnit, ImportKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleTypeImport {
    pub path: QualifiedName,
    /// The simple name the import introduces (the path's last segment).
    pub imported: Name,
}

impl SingleTypeImport {
    pub fn from_dotted(dotted: &str) -> Self {
        let path = QualifiedName::from_dotted(dotted);
        let imported = path
            .simple_name()
            .cloned()
            .unwrap_or_else(|| Name::from(dotted));
        Self { path, imported }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnDemandImport {
    pub package: PackageName,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    pub single: Vec<SingleTypeImport>,
    pub on_demand: Vec<OnDemandImport>,
}

impl ImportMap {
    pub fn from_unit(unit: &CompilationUnit) -> Self {
        let mut map = ImportMap::default();
        for import in &unit.imports {
            match &import.kind {
                ImportKind::Single { ty } => {
                    let imported = match ty.simple_name() {
                        Some(name) => name.clone(),
                        None => continue,
                    };
                    map.single.push(SingleTypeImport {
                        path: ty.clone(),
                        imported,
                    });
                }
                ImportKind::OnDemand { package } => {
                    map.on_demand.push(OnDemandImport {
                        package: package.clone(),
                    });
                }
            }
        }
        map
    }
}
