//! Simple-name resolution in the type namespace.
//!
//! Follows the JLS precedence rules (6.5 / 7.5) the way an IDE front end
//! applies them to one compilation unit:
//! 1) single-type imports
//! 2) same-package types
//! 3) type-import-on-demand (`.*`) imports, including the implicit
//!    `java.lang.*` (ambiguity is reported, never silently broken)
//!
//! Resolution is resilient by design: unknown imports do not prevent
//! resolution of the rest of the unit.

mod import_map;

use rejig_core::{Name, PackageName, QualifiedName, TypeIndex, TypeName};
use tracing::trace;

pub use import_map::{ImportMap, OnDemandImport, SingleTypeImport};

/// Outcome of a simple-name lookup in the type namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeLookup {
    Found(TypeName),
    Ambiguous(Vec<TypeName>),
    NotFound,
}

impl TypeLookup {
    #[must_use]
    pub fn into_option(self) -> Option<TypeName> {
        match self {
            TypeLookup::Found(ty) => Some(ty),
            TypeLookup::Ambiguous(_) | TypeLookup::NotFound => None,
        }
    }
}

/// A name resolver over an external type oracle.
pub struct Resolver<'a> {
    index: &'a dyn TypeIndex,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub fn new(index: &'a dyn TypeIndex) -> Self {
        Self { index }
    }

    /// Resolve a qualified name as a type, trying nested-type spellings.
    ///
    /// Java source refers to nested classes as `Outer.Inner` while indexes
    /// tend to store binary names (`Outer$Inner`); when the dotted form
    /// fails, progressively treat rightmost segments as nested types.
    #[must_use]
    pub fn resolve_qualified(&self, name: &QualifiedName) -> Option<TypeName> {
        self.index
            .resolve_type(name)
            .or_else(|| self.resolve_nested(name))
    }

    fn resolve_nested(&self, name: &QualifiedName) -> Option<TypeName> {
        let segments = name.segments();
        if segments.len() < 2 {
            return None;
        }
        // Prefer longer package prefixes first (`java.util.Map.Entry` tries
        // `java.util.Map$Entry` before `java.util$Map$Entry`).
        for split_at in (0..segments.len() - 1).rev() {
            if segments.len() - split_at < 2 {
                continue;
            }
            let mut candidate = String::new();
            for (idx, seg) in segments[..split_at].iter().enumerate() {
                if idx > 0 {
                    candidate.push('.');
                }
                candidate.push_str(seg.as_str());
            }
            if split_at > 0 {
                candidate.push('.');
            }
            for (idx, seg) in segments[split_at..].iter().enumerate() {
                if idx > 0 {
                    candidate.push('$');
                }
                candidate.push_str(seg.as_str());
            }
            if let Some(ty) = self
                .index
                .resolve_type(&QualifiedName::from_dotted(&candidate))
            {
                return Some(ty);
            }
        }
        None
    }

    /// Resolve a simple type name via imports and the current package,
    /// reporting ambiguity instead of picking an arbitrary match.
    #[must_use]
    pub fn resolve_simple_detailed(
        &self,
        imports: &ImportMap,
        package: Option<&PackageName>,
        name: &Name,
    ) -> TypeLookup {
        match self.resolve_single_imports_detailed(imports, name) {
            TypeLookup::NotFound => {}
            found_or_ambiguous => return found_or_ambiguous,
        }

        if let Some(pkg) = package {
            if let Some(ty) = self.index.resolve_type_in_package(pkg, name) {
                trace!(name = %name, package = %pkg, "resolved in same package");
                return TypeLookup::Found(ty);
            }
        }

        self.resolve_on_demand_detailed(imports, name)
    }

    /// Compatibility wrapper over [`Resolver::resolve_simple_detailed`].
    #[must_use]
    pub fn resolve_simple(
        &self,
        imports: &ImportMap,
        package: Option<&PackageName>,
        name: &Name,
    ) -> Option<TypeName> {
        self.resolve_simple_detailed(imports, package, name)
            .into_option()
    }

    /// All visible declarations sharing `name`, for the qualification
    /// fallback. Deterministic order comes from the index contract.
    #[must_use]
    pub fn visible_types_with_simple_name(&self, name: &Name) -> Vec<TypeName> {
        self.index.types_with_simple_name(name)
    }

    pub fn package_exists(&self, package: &PackageName) -> bool {
        self.index.package_exists(package)
    }

    fn resolve_single_imports_detailed(&self, imports: &ImportMap, name: &Name) -> TypeLookup {
        let mut candidates = Vec::<TypeName>::new();
        for import in &imports.single {
            if &import.imported != name {
                continue;
            }
            if let Some(ty) = self.resolve_qualified(&import.path) {
                if !candidates.contains(&ty) {
                    candidates.push(ty);
                }
            }
        }
        match candidates.len() {
            0 => TypeLookup::NotFound,
            1 => TypeLookup::Found(candidates.remove(0)),
            _ => TypeLookup::Ambiguous(candidates),
        }
    }

    fn resolve_on_demand_detailed(&self, imports: &ImportMap, name: &Name) -> TypeLookup {
        // JLS 7.5.2: `java.lang.*` is implicitly imported by every unit and
        // participates in the same on-demand set as explicit `import p.*;`
        // declarations, so conflicting matches are ambiguous.
        let mut candidates = Vec::<TypeName>::new();
        let mut push = |ty: TypeName| {
            if !candidates.contains(&ty) {
                candidates.push(ty);
            }
        };

        for import in &imports.on_demand {
            if let Some(ty) = self.index.resolve_type_in_package(&import.package, name) {
                push(ty);
            }
        }
        if let Some(ty) = self
            .index
            .resolve_type_in_package(&PackageName::from_dotted("java.lang"), name)
        {
            push(ty);
        }

        match candidates.len() {
            0 => TypeLookup::NotFound,
            1 => TypeLookup::Found(candidates.remove(0)),
            _ => TypeLookup::Ambiguous(candidates),
        }
    }
}
