//! Java type source-text parsing.
//!
//! Signature checks receive replacement types as raw strings. This crate
//! turns such a string into a purely syntactic [`TypeSyntax`] tree without
//! consulting any index; name resolution happens later, per slot, in
//! `rejig-signature`.
//!
//! The parser is whitespace-insensitive but input-exact: trailing tokens are
//! an error, so `"int x"` or `"List<String"` never silently parse. That
//! mirrors the stub-based syntax pass of the original engine, where the
//! parsed node had to span exactly the proposed type text.

mod parser;

use std::fmt;

pub use parser::{parse_type_text, TypeParseError};

/// One segment of a (possibly qualified) class-or-interface reference,
/// with its own type arguments (`Outer<String>.Inner`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSegment {
    pub name: String,
    pub args: Vec<TypeSyntax>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardSyntax {
    Unbounded,
    Extends(Box<TypeSyntax>),
    Super(Box<TypeSyntax>),
}

/// A parsed Java type, structurally faithful to the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSyntax {
    Primitive(rejig_types::PrimitiveKind),
    Void,
    Named { segments: Vec<NamedSegment> },
    Array { elem: Box<TypeSyntax> },
    /// Only valid inside type arguments; `parse_type_text` rejects it at
    /// top level.
    Wildcard(WildcardSyntax),
}

impl TypeSyntax {
    /// The dotted name this reference spells, ignoring type arguments.
    /// `None` for primitives, `void`, arrays and wildcards.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            TypeSyntax::Named { segments } => Some(
                segments
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join("."),
            ),
            _ => None,
        }
    }

    /// Rebuild this reference with a different dotted name, keeping the
    /// rightmost segment's type arguments. Used by the qualification retry
    /// to rewrite `Widget<T>` into `p.a.Widget<T>`.
    pub fn with_dotted_name(&self, dotted: &str) -> TypeSyntax {
        match self {
            TypeSyntax::Named { segments } => {
                let trailing_args = segments.last().map(|s| s.args.clone()).unwrap_or_default();
                let mut new_segments: Vec<NamedSegment> = dotted
                    .split('.')
                    .map(|part| NamedSegment {
                        name: part.to_string(),
                        args: Vec::new(),
                    })
                    .collect();
                if let Some(last) = new_segments.last_mut() {
                    last.args = trailing_args;
                }
                TypeSyntax::Named {
                    segments: new_segments,
                }
            }
            TypeSyntax::Array { elem } => TypeSyntax::Array {
                elem: Box::new(elem.with_dotted_name(dotted)),
            },
            other => other.clone(),
        }
    }

    /// The innermost element of an array type (`self` otherwise).
    pub fn element(&self) -> &TypeSyntax {
        match self {
            TypeSyntax::Array { elem } => elem.element(),
            other => other,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeSyntax::Array { .. })
    }
}

impl fmt::Display for TypeSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSyntax::Primitive(p) => f.write_str(p.keyword()),
            TypeSyntax::Void => f.write_str("void"),
            TypeSyntax::Array { elem } => write!(f, "{elem}[]"),
            TypeSyntax::Wildcard(WildcardSyntax::Unbounded) => f.write_str("?"),
            TypeSyntax::Wildcard(WildcardSyntax::Extends(b)) => write!(f, "? extends {b}"),
            TypeSyntax::Wildcard(WildcardSyntax::Super(b)) => write!(f, "? super {b}"),
            TypeSyntax::Named { segments } => {
                for (i, seg) in segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(&seg.name)?;
                    if !seg.args.is_empty() {
                        f.write_str("<")?;
                        for (j, arg) in seg.args.iter().enumerate() {
                            if j > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{arg}")?;
                        }
                        f.write_str(">")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Split a trailing `...` off a parameter type string.
///
/// Returns the element text and whether the ellipsis was present. The
/// checker decides whether varargs are legal at the project's source level.
pub fn strip_ellipsis(text: &str) -> (&str, bool) {
    match text.trim_end().strip_suffix("...") {
        Some(stripped) => (stripped.trim_end(), true),
        None => (text, false),
    }
}
