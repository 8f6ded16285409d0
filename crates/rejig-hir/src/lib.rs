//! Resolved AST for the program region under refactoring.
//!
//! This is the input shape of the analyses: a compilation unit whose
//! declarations and expressions already carry resolved [`Type`]s and binding
//! keys. Hosts lower their own syntax trees into this form; tests build it
//! directly through the `new`/`add_*` constructors.

mod body;

use rejig_core::{FileId, Name, PackageName, QualifiedName, Span};
use rejig_types::Type;

pub use body::{Body, ExprData, ExprId, ExprKind, LocalData, LocalId, StmtData, StmtId, StmtKind};

/// Opaque key re-associating a declaration with the host's binding model
/// (field, local, method). Stable for the duration of one analysis session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey(pub String);

impl BindingKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub file: FileId,
    /// Full source text; stub construction slices the package/imports prefix
    /// out of it verbatim.
    pub source: String,
    pub package: Option<PackageName>,
    /// Span of the package declaration, when present. Rides on the unit
    /// because nothing else about the declaration matters here.
    pub package_span: Option<Span>,
    pub imports: Vec<ImportDecl>,
    pub types: Vec<TypeDecl>,
}

impl CompilationUnit {
    pub fn new(file: FileId, source: impl Into<String>, package: Option<PackageName>) -> Self {
        Self {
            file,
            source: source.into(),
            package,
            package_span: None,
            imports: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn with_package_span(mut self, span: Span) -> Self {
        self.package_span = Some(span);
        self
    }

    /// End offset of the package/import prologue in `source`.
    pub fn intro_end(&self) -> usize {
        self.imports
            .iter()
            .map(|i| i.span.end)
            .chain(self.package_span.iter().map(|s| s.end))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub kind: ImportKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ImportKind {
    Single { ty: QualifiedName },
    OnDemand { package: PackageName },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
    Annotation,
}

impl TypeDeclKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Annotation => "@interface",
        }
    }
}

/// A class/interface type parameter as written (`T`, `T extends Number`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParamDecl {
    pub name: Name,
    pub bound_text: Option<String>,
}

impl TypeParamDecl {
    pub fn new(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            bound_text: None,
        }
    }

    pub fn source_text(&self) -> String {
        match &self.bound_text {
            Some(bound) => format!("{} extends {}", self.name, bound),
            None => self.name.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: Name,
    pub kind: TypeDeclKind,
    /// Modifier keywords as written, in order (`public`, `abstract`, ...).
    pub modifiers: Vec<String>,
    pub type_params: Vec<TypeParamDecl>,
    /// Superclass reference as source text.
    pub extends_text: Option<String>,
    /// Implemented (or, for interfaces, extended) interfaces as source text.
    pub implements_text: Vec<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub nested: Vec<TypeDecl>,
    pub span: Span,
}

impl TypeDecl {
    pub fn new(name: impl Into<Name>, kind: TypeDeclKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Vec::new(),
            type_params: Vec::new(),
            extends_text: None,
            implements_text: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
            span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: Name,
    pub key: BindingKey,
    pub ty: Type,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: Name,
    pub ty: Type,
}

impl ParamDecl {
    pub fn new(name: impl Into<Name>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: Name,
    pub key: BindingKey,
    pub modifiers: Vec<String>,
    pub is_static: bool,
    pub type_params: Vec<TypeParamDecl>,
    pub return_type: Type,
    pub params: Vec<ParamDecl>,
    pub body: Option<Body>,
    /// Local classes declared directly in this method's body; they matter
    /// to stub construction when the focal position is inside the method.
    pub local_types: Vec<TypeDecl>,
    pub span: Span,
}

impl MethodDecl {
    pub fn new(name: impl Into<Name>, key: BindingKey, return_type: Type, span: Span) -> Self {
        Self {
            name: name.into(),
            key,
            modifiers: Vec::new(),
            is_static: false,
            type_params: Vec::new(),
            return_type,
            params: Vec::new(),
            body: None,
            local_types: Vec::new(),
            span,
        }
    }
}

/// Resolved signature of a call target; may live outside the analyzed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub key: BindingKey,
    pub param_types: Vec<Type>,
    pub return_type: Type,
}

/// Resolved target of a field reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub key: BindingKey,
    pub ty: Type,
}
