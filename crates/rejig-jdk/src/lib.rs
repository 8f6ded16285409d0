//! Built-in standard-library symbol index.
//!
//! `JdkIndex::new()` provides a small, dependency-free index with the slice
//! of `java.lang`/`java.util`/`java.io` the analyses and their tests lean
//! on, without requiring a system JDK. Project types are layered on top of
//! the same store via [`JdkIndex::add_project_type`].

use std::collections::{BTreeMap, BTreeSet};

use rejig_core::{Name, PackageName, QualifiedName, TypeIndex, TypeName};
use rejig_types::{ClassId, TypeEnv, TypeStore, WellKnownTypes};

#[derive(Debug)]
pub struct JdkIndex {
    store: TypeStore,
    // BTree maps keep every name query deterministic.
    types: BTreeMap<String, TypeName>,
    package_to_types: BTreeMap<String, BTreeMap<String, TypeName>>,
    by_simple_name: BTreeMap<String, BTreeSet<TypeName>>,
    packages: BTreeSet<String>,
}

impl JdkIndex {
    /// Construct the built-in index (no disk I/O, no system JDK required).
    pub fn new() -> Self {
        let mut this = Self {
            store: TypeStore::new(),
            types: BTreeMap::new(),
            package_to_types: BTreeMap::new(),
            by_simple_name: BTreeMap::new(),
            packages: BTreeSet::new(),
        };

        // TypeStore::new pre-registers Object; mirror it into the name maps.
        this.index_name("java.lang", "Object");

        // java.lang
        let object = this.store.object();
        let number = this.add_jdk_class("java.lang", "Number", object, &[], &[]);
        this.add_jdk_class("java.lang", "Integer", number, &[], &[]);
        this.add_jdk_class("java.lang", "Long", number, &[], &[]);
        this.add_jdk_class("java.lang", "Double", number, &[], &[]);
        let char_sequence = this.add_jdk_interface("java.lang", "CharSequence", &[], &[]);
        let comparable = this.add_jdk_interface("java.lang", "Comparable", &[], &["T"]);
        this.add_jdk_class("java.lang", "String", object, &[char_sequence, comparable], &[]);
        this.add_jdk_class("java.lang", "StringBuilder", object, &[char_sequence], &[]);
        this.add_jdk_class("java.lang", "Boolean", object, &[], &[]);
        this.add_jdk_class("java.lang", "Character", object, &[], &[]);
        let throwable = this.add_jdk_class("java.lang", "Throwable", object, &[], &[]);
        let exception = this.add_jdk_class("java.lang", "Exception", throwable, &[], &[]);
        let runtime_exc = this.add_jdk_class("java.lang", "RuntimeException", exception, &[], &[]);
        this.add_jdk_class("java.lang", "IllegalArgumentException", runtime_exc, &[], &[]);
        let iterable = this.add_jdk_interface("java.lang", "Iterable", &[], &["T"]);

        // java.util
        let collection = this.add_jdk_interface("java.util", "Collection", &[iterable], &["E"]);
        let list = this.add_jdk_interface("java.util", "List", &[collection], &["E"]);
        let set = this.add_jdk_interface("java.util", "Set", &[collection], &["E"]);
        let abstract_collection =
            this.add_jdk_class("java.util", "AbstractCollection", object, &[collection], &["E"]);
        let abstract_list =
            this.add_jdk_class("java.util", "AbstractList", abstract_collection, &[list], &["E"]);
        this.add_jdk_class("java.util", "ArrayList", abstract_list, &[list], &["E"]);
        this.add_jdk_class("java.util", "LinkedList", abstract_list, &[list], &["E"]);
        this.add_jdk_class("java.util", "HashSet", abstract_collection, &[set], &["E"]);
        let map = this.add_jdk_interface("java.util", "Map", &[], &["K", "V"]);
        this.add_jdk_class("java.util", "HashMap", object, &[map], &["K", "V"]);

        // java.io
        let closeable = this.add_jdk_interface("java.io", "Closeable", &[], &[]);
        this.add_jdk_class("java.io", "Reader", object, &[closeable], &[]);
        this.add_jdk_class("java.io", "IOException", exception, &[], &[]);

        this
    }

    /// Register a project (non-JDK) class; returns its store handle.
    pub fn add_project_type(
        &mut self,
        package: &str,
        simple_name: &str,
        superclass: Option<ClassId>,
    ) -> ClassId {
        let id = self.store.add_simple_class(&qualify(package, simple_name), superclass);
        self.index_name(package, simple_name);
        id
    }

    /// Register a project interface.
    pub fn add_project_interface(
        &mut self,
        package: &str,
        simple_name: &str,
        extends: Vec<ClassId>,
    ) -> ClassId {
        let id = self
            .store
            .add_interface(&qualify(package, simple_name), extends);
        self.index_name(package, simple_name);
        id
    }

    pub fn store(&self) -> &TypeStore {
        &self.store
    }

    fn add_jdk_class(
        &mut self,
        package: &str,
        simple_name: &str,
        superclass: ClassId,
        interfaces: &[ClassId],
        type_params: &[&str],
    ) -> ClassId {
        let id = self.store.add_class(rejig_types::ClassDef {
            name: TypeName::new(qualify(package, simple_name)),
            kind: rejig_types::ClassKind::Class,
            superclass: Some(superclass),
            interfaces: interfaces.to_vec(),
            type_params: type_params.iter().map(|p| Name::from(*p)).collect(),
        });
        self.index_name(package, simple_name);
        id
    }

    fn add_jdk_interface(
        &mut self,
        package: &str,
        simple_name: &str,
        extends: &[ClassId],
        type_params: &[&str],
    ) -> ClassId {
        let id = self.store.add_class(rejig_types::ClassDef {
            name: TypeName::new(qualify(package, simple_name)),
            kind: rejig_types::ClassKind::Interface,
            superclass: None,
            interfaces: extends.to_vec(),
            type_params: type_params.iter().map(|p| Name::from(*p)).collect(),
        });
        self.index_name(package, simple_name);
        id
    }

    fn index_name(&mut self, package: &str, simple_name: &str) {
        let fq = TypeName::new(qualify(package, simple_name));
        self.types.insert(fq.as_str().to_string(), fq.clone());
        self.packages.insert(package.to_string());
        self.package_to_types
            .entry(package.to_string())
            .or_default()
            .insert(simple_name.to_string(), fq.clone());
        self.by_simple_name
            .entry(simple_name.to_string())
            .or_default()
            .insert(fq);
    }
}

impl Default for JdkIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn qualify(package: &str, simple_name: &str) -> String {
    if package.is_empty() {
        simple_name.to_string()
    } else {
        format!("{package}.{simple_name}")
    }
}

impl TypeIndex for JdkIndex {
    fn resolve_type(&self, name: &QualifiedName) -> Option<TypeName> {
        self.types.get(&name.to_dotted()).cloned()
    }

    fn resolve_type_in_package(&self, package: &PackageName, name: &Name) -> Option<TypeName> {
        self.package_to_types
            .get(&package.to_dotted())
            .and_then(|m| m.get(name.as_str()))
            .cloned()
    }

    fn package_exists(&self, package: &PackageName) -> bool {
        self.packages.contains(&package.to_dotted())
    }

    fn types_with_simple_name(&self, name: &Name) -> Vec<TypeName> {
        self.by_simple_name
            .get(name.as_str())
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl TypeEnv for JdkIndex {
    fn class(&self, id: ClassId) -> Option<&rejig_types::ClassDef> {
        self.store.class(id)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.store.lookup_class(name)
    }

    fn well_known(&self) -> &WellKnownTypes {
        self.store.well_known()
    }
}
