//! Per-slot validation of proposed signature types.
//!
//! Each proposed parameter/return type goes through a syntax pass and, when
//! well-formed, a two-round semantic pass against the method's stub
//! context. Rounds and outcomes follow a small per-slot state machine:
//!
//! ```text
//! Unresolved -> SyntaxChecked -> { Resolved
//!                               | NeedsQualification -> { Resolved | NotFound | Ambiguous } }
//! ```
//!
//! Slots are independent: a failure in one never aborts the others, so a UI
//! can surface every problem at once.

use rejig_core::{Canceled, CancellationToken, Name, QualifiedName, SourceLevel, TypeIndex};
use rejig_hir::{CompilationUnit, MethodDecl, TypeDecl, TypeParamDecl};
use rejig_resolve::{ImportMap, Resolver, TypeLookup};
use rejig_syntax::{parse_type_text, strip_ellipsis, NamedSegment, TypeSyntax, WildcardSyntax};
use rejig_types::{display_type, Type, TypeEnv, WildcardBound};
use tracing::{debug, trace};

use crate::{ScratchUnit, StubTypeContext};

/// Name of the synthetic method spliced into stub units.
pub const STUB_METHOD_NAME: &str = "__rejig__";

/// Everything the semantic pass needs to know about the focal method's
/// surroundings.
#[derive(Debug, Clone)]
pub struct MethodContext {
    pub package: Option<rejig_core::PackageName>,
    pub imports: ImportMap,
    /// Type parameter names in scope at the focal point (enclosing type's,
    /// unless the method is static, plus the method's own).
    pub type_params: Vec<Name>,
    pub is_static: bool,
    /// The method's own type parameters, re-declared on the stub method.
    pub method_type_params: Vec<TypeParamDecl>,
}

impl MethodContext {
    pub fn for_method(unit: &CompilationUnit, enclosing: &TypeDecl, method: &MethodDecl) -> Self {
        let mut type_params = Vec::new();
        if !method.is_static {
            type_params.extend(enclosing.type_params.iter().map(|tp| tp.name.clone()));
        }
        type_params.extend(method.type_params.iter().map(|tp| tp.name.clone()));
        Self {
            package: unit.package.clone(),
            imports: ImportMap::from_unit(unit),
            type_params,
            is_static: method.is_static,
            method_type_params: method.type_params.clone(),
        }
    }
}

/// Whether a slot is a parameter type or the return type; the syntax rules
/// differ (`void` and varargs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Parameter,
    Return,
}

/// One proposed type, as literal source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSlot {
    pub text: String,
    pub kind: SlotKind,
}

impl TypeSlot {
    pub fn parameter(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SlotKind::Parameter,
        }
    }

    pub fn return_type(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: SlotKind::Return,
        }
    }
}

/// Structured per-slot failure. Never thrown across the crate boundary;
/// always carried in the slot's result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("invalid type syntax: {message}")]
    SyntaxInvalid { message: String },
    #[error("type `{type_text}` cannot be resolved")]
    NotFound { type_text: String },
    #[error("type `{type_text}` is ambiguous: {candidates} candidates")]
    Ambiguous { type_text: String, candidates: usize },
    #[error("{feature} requires a higher source level")]
    UnsupportedOnSourceLevel { feature: &'static str },
}

/// A successfully validated slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotOk {
    pub resolved: Type,
    /// The type re-rendered with fully-qualified names.
    pub qualified_text: String,
}

pub type SlotResult = Result<SlotOk, SlotError>;

/// The per-slot state machine. States only ever move forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Unresolved,
    SyntaxChecked(TypeSyntax),
    NeedsQualification(TypeSyntax),
    Resolved { ty: Type, qualified_text: String },
    Failed(SlotError),
}

impl SlotState {
    pub fn error(&self) -> Option<&SlotError> {
        match self {
            SlotState::Failed(err) => Some(err),
            _ => None,
        }
    }

    fn into_result(self) -> SlotResult {
        match self {
            SlotState::Resolved { ty, qualified_text } => Ok(SlotOk {
                resolved: ty,
                qualified_text,
            }),
            SlotState::Failed(err) => Err(err),
            // Syntax-only runs end here; the slot never reached semantics.
            SlotState::Unresolved | SlotState::SyntaxChecked(_) | SlotState::NeedsQualification(_) => {
                Err(SlotError::NotFound {
                    type_text: String::new(),
                })
            }
        }
    }
}

/// A simple name (or qualified prefix) the first round could not bind.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Unbound {
    name: String,
}

pub struct TypeContextChecker<'a> {
    resolver: Resolver<'a>,
    env: &'a dyn TypeEnv,
    source_level: SourceLevel,
}

impl<'a> TypeContextChecker<'a> {
    pub fn new(index: &'a dyn TypeIndex, env: &'a dyn TypeEnv, source_level: SourceLevel) -> Self {
        Self {
            resolver: Resolver::new(index),
            env,
            source_level,
        }
    }

    /// Syntax pass only: no name resolution, no stub synthesis.
    pub fn check_method_types_syntax(&self, slots: &[TypeSlot]) -> Vec<SlotState> {
        slots.iter().map(|slot| self.check_slot_syntax(slot)).collect()
    }

    /// Full validation: syntax pass, then the two-round semantic pass.
    ///
    /// The result has one entry per input slot, in order. Callers follow
    /// the original layout: parameter slots first, the return slot last.
    pub fn check_and_resolve_method_types(
        &self,
        context: &MethodContext,
        stub: &StubTypeContext,
        slots: &[TypeSlot],
        cancel: &CancellationToken,
    ) -> Result<Vec<SlotResult>, Canceled> {
        let mut states = self.check_method_types_syntax(slots);

        // First round: resolve every well-formed slot in the synthesized
        // stub unit. The scratch unit is released on every exit path.
        let scratch = self.materialize_stub(context, stub, slots, &states);
        for state in &mut states {
            cancel.check()?;
            let SlotState::SyntaxChecked(syntax) = &*state else {
                continue;
            };
            let next = match self.resolve_syntax(context, syntax) {
                Ok(ty) => SlotState::Resolved {
                    qualified_text: display_type(self.env, &ty),
                    ty,
                },
                Err(unbound) => {
                    trace!(name = %unbound.name, "first-pass resolution failed");
                    SlotState::NeedsQualification(syntax.clone())
                }
            };
            *state = next;
        }
        scratch.discard();

        // Second round, only for slots the first could not bind: qualify
        // every name and retry in a fresh scratch unit.
        if states
            .iter()
            .any(|s| matches!(s, SlotState::NeedsQualification(_)))
        {
            for state in &mut states {
                cancel.check()?;
                let SlotState::NeedsQualification(syntax) = &*state else {
                    continue;
                };
                let next = match self.qualify_names(context, syntax) {
                    Ok(qualified) => SlotState::NeedsQualification(qualified),
                    Err(err) => SlotState::Failed(err),
                };
                *state = next;
            }

            let scratch = self.materialize_stub(context, stub, slots, &states);
            for state in &mut states {
                cancel.check()?;
                let SlotState::NeedsQualification(syntax) = &*state else {
                    continue;
                };
                let next = match self.resolve_syntax(context, syntax) {
                    Ok(ty) => SlotState::Resolved {
                        qualified_text: syntax.to_string(),
                        ty,
                    },
                    Err(unbound) => SlotState::Failed(SlotError::NotFound {
                        type_text: unbound.name,
                    }),
                };
                *state = next;
            }
            scratch.discard();
        }

        let results: Vec<SlotResult> = states.into_iter().map(SlotState::into_result).collect();
        debug!(
            slots = results.len(),
            errors = results.iter().filter(|r| r.is_err()).count(),
            "checked method types"
        );
        Ok(results)
    }

    fn check_slot_syntax(&self, slot: &TypeSlot) -> SlotState {
        let text = slot.text.trim();
        let (element, is_varargs) = strip_ellipsis(text);
        if is_varargs {
            match slot.kind {
                SlotKind::Parameter if !self.source_level.supports_varargs() => {
                    return SlotState::Failed(SlotError::UnsupportedOnSourceLevel {
                        feature: "a variable arity parameter",
                    });
                }
                SlotKind::Return => {
                    return SlotState::Failed(SlotError::SyntaxInvalid {
                        message: "a return type cannot be variable arity".to_string(),
                    });
                }
                SlotKind::Parameter => {}
            }
        }

        let element = element.trim();
        if element.is_empty() {
            return SlotState::Failed(SlotError::SyntaxInvalid {
                message: "type is empty".to_string(),
            });
        }

        match parse_type_text(element) {
            Ok(syntax) => {
                if slot.kind == SlotKind::Parameter && matches!(syntax, TypeSyntax::Void) {
                    return SlotState::Failed(SlotError::SyntaxInvalid {
                        message: "`void` is not a valid parameter type".to_string(),
                    });
                }
                SlotState::SyntaxChecked(syntax)
            }
            Err(err) => SlotState::Failed(SlotError::SyntaxInvalid {
                message: err.message,
            }),
        }
    }

    /// Splice the candidate signature between the stub context halves.
    ///
    /// Slots that already failed contribute an `Object` placeholder so the
    /// synthesized unit stays well-formed for the remaining slots.
    fn materialize_stub(
        &self,
        context: &MethodContext,
        stub: &StubTypeContext,
        slots: &[TypeSlot],
        states: &[SlotState],
    ) -> ScratchUnit {
        let text_of = |idx: usize| -> String {
            match &states[idx] {
                SlotState::SyntaxChecked(syntax) | SlotState::NeedsQualification(syntax) => {
                    syntax.to_string()
                }
                SlotState::Resolved { qualified_text, .. } => qualified_text.clone(),
                SlotState::Unresolved | SlotState::Failed(_) => "java.lang.Object".to_string(),
            }
        };

        let mut text = String::from(stub.before());
        if context.is_static {
            text.push_str("static ");
        }
        if !context.method_type_params.is_empty() {
            text.push('<');
            for (i, tp) in context.method_type_params.iter().enumerate() {
                if i > 0 {
                    text.push(',');
                }
                text.push_str(&tp.source_text());
            }
            text.push_str("> ");
        }

        let return_slot = slots.iter().position(|s| s.kind == SlotKind::Return);
        match return_slot {
            Some(idx) => text.push_str(&text_of(idx)),
            None => text.push_str("void"),
        }
        text.push(' ');
        text.push_str(STUB_METHOD_NAME);
        text.push('(');
        let mut first = true;
        for (idx, slot) in slots.iter().enumerate() {
            if slot.kind != SlotKind::Parameter {
                continue;
            }
            if !first {
                text.push(',');
            }
            first = false;
            text.push_str(&text_of(idx));
            text.push_str(&format!(" p{idx}"));
        }
        text.push_str(");");
        text.push_str(stub.after());

        trace!(len = text.len(), "synthesized stub unit");
        ScratchUnit::new(text)
    }

    fn resolve_syntax(&self, context: &MethodContext, syntax: &TypeSyntax) -> Result<Type, Unbound> {
        match syntax {
            TypeSyntax::Primitive(p) => Ok(Type::Primitive(*p)),
            TypeSyntax::Void => Ok(Type::Void),
            TypeSyntax::Array { elem } => Ok(Type::array(self.resolve_syntax(context, elem)?)),
            TypeSyntax::Wildcard(WildcardSyntax::Unbounded) => {
                Ok(Type::Wildcard(WildcardBound::Unbounded))
            }
            TypeSyntax::Wildcard(WildcardSyntax::Extends(bound)) => Ok(Type::Wildcard(
                WildcardBound::Extends(Box::new(self.resolve_syntax(context, bound)?)),
            )),
            TypeSyntax::Wildcard(WildcardSyntax::Super(bound)) => Ok(Type::Wildcard(
                WildcardBound::Super(Box::new(self.resolve_syntax(context, bound)?)),
            )),
            TypeSyntax::Named { segments } => self.resolve_named(context, segments),
        }
    }

    fn resolve_named(
        &self,
        context: &MethodContext,
        segments: &[NamedSegment],
    ) -> Result<Type, Unbound> {
        let dotted = segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".");

        if segments.len() == 1 {
            let name = Name::from(segments[0].name.as_str());
            if context.type_params.contains(&name) {
                if !segments[0].args.is_empty() {
                    // A type variable can never be parameterized; treat the
                    // reference as unresolved rather than guessing.
                    return Err(Unbound { name: dotted });
                }
                return Ok(Type::TypeVar(name));
            }
        }

        let type_name = if segments.len() == 1 {
            match self.resolver.resolve_simple_detailed(
                &context.imports,
                context.package.as_ref(),
                &Name::from(dotted.as_str()),
            ) {
                TypeLookup::Found(tn) => tn,
                TypeLookup::Ambiguous(_) | TypeLookup::NotFound => {
                    return Err(Unbound { name: dotted });
                }
            }
        } else {
            self.resolver
                .resolve_qualified(&QualifiedName::from_dotted(&dotted))
                .ok_or_else(|| Unbound {
                    name: dotted.clone(),
                })?
        };

        let args: Vec<&TypeSyntax> = segments.iter().flat_map(|s| s.args.iter()).collect();
        match self.env.lookup_class(type_name.as_str()) {
            Some(id) => {
                let arity = self
                    .env
                    .class(id)
                    .map(|def| def.type_params.len())
                    .unwrap_or(0);
                if args.is_empty() {
                    // Raw (or non-generic) reference.
                    Ok(Type::class(id, Vec::new()))
                } else if args.len() == arity {
                    let resolved_args = args
                        .into_iter()
                        .map(|arg| self.resolve_syntax(context, arg))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Type::class(id, resolved_args))
                } else {
                    // Generic binding that is neither raw nor
                    // parameterized: treated as unresolved so the second
                    // round retries instead of accepting a wrong binding.
                    Err(Unbound { name: dotted })
                }
            }
            None if args.is_empty() => Ok(Type::Named(type_name)),
            None => Err(Unbound { name: dotted }),
        }
    }

    /// Rewrite every name in `syntax` to its fully-qualified form, deciding
    /// zero/one/many for names the scope could not bind.
    fn qualify_names(
        &self,
        context: &MethodContext,
        syntax: &TypeSyntax,
    ) -> Result<TypeSyntax, SlotError> {
        match syntax {
            TypeSyntax::Primitive(_) | TypeSyntax::Void => Ok(syntax.clone()),
            TypeSyntax::Array { elem } => Ok(TypeSyntax::Array {
                elem: Box::new(self.qualify_names(context, elem)?),
            }),
            TypeSyntax::Wildcard(WildcardSyntax::Unbounded) => Ok(syntax.clone()),
            TypeSyntax::Wildcard(WildcardSyntax::Extends(bound)) => {
                Ok(TypeSyntax::Wildcard(WildcardSyntax::Extends(Box::new(
                    self.qualify_names(context, bound)?,
                ))))
            }
            TypeSyntax::Wildcard(WildcardSyntax::Super(bound)) => {
                Ok(TypeSyntax::Wildcard(WildcardSyntax::Super(Box::new(
                    self.qualify_names(context, bound)?,
                ))))
            }
            TypeSyntax::Named { segments } => {
                let dotted = segments
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(".");

                // In-scope type variables stay as written.
                if segments.len() == 1
                    && context.type_params.contains(&Name::from(dotted.as_str()))
                {
                    return Ok(syntax.clone());
                }

                let qualified_args = segments
                    .iter()
                    .flat_map(|s| s.args.iter())
                    .map(|arg| self.qualify_names(context, arg))
                    .collect::<Result<Vec<_>, _>>()?;

                let resolved = if segments.len() == 1 {
                    self.resolver
                        .resolve_simple_detailed(
                            &context.imports,
                            context.package.as_ref(),
                            &Name::from(dotted.as_str()),
                        )
                        .into_option()
                } else {
                    self.resolver
                        .resolve_qualified(&QualifiedName::from_dotted(&dotted))
                };

                let new_name = match resolved {
                    Some(tn) => tn.as_str().replace('$', "."),
                    None if segments.len() == 1 => {
                        let candidates = self
                            .resolver
                            .visible_types_with_simple_name(&Name::from(dotted.as_str()));
                        match candidates.len() {
                            0 => {
                                return Err(SlotError::NotFound { type_text: dotted });
                            }
                            1 => candidates[0].as_str().replace('$', "."),
                            n => {
                                return Err(SlotError::Ambiguous {
                                    type_text: dotted,
                                    candidates: n,
                                });
                            }
                        }
                    }
                    None => {
                        return Err(SlotError::NotFound { type_text: dotted });
                    }
                };

                let mut new_segments: Vec<NamedSegment> = new_name
                    .split('.')
                    .map(|part| NamedSegment {
                        name: part.to_string(),
                        args: Vec::new(),
                    })
                    .collect();
                if let Some(last) = new_segments.last_mut() {
                    last.args = qualified_args;
                }
                Ok(TypeSyntax::Named {
                    segments: new_segments,
                })
            }
        }
    }
}
