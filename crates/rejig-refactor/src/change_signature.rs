//! Validation of Change Method Signature plans.
//!
//! A plan describes the new shape of one method: reordered/re-typed
//! existing parameters, added parameters with call-site defaults, and an
//! optional new return type. Validation answers two questions without
//! producing any edits:
//! 1. does every proposed type check out in the method's context
//!    (syntax, resolution, ambiguity), and
//! 2. is the re-typing consistent with every constraint collected from the
//!    unit's bodies.

use std::collections::HashMap;

use rejig_constraints::{solve, ConstraintCollector, Solution, SolverOptions, TypeConstraint};
use rejig_core::{Canceled, CancellationToken, SourceLevel, TypeIndex};
use rejig_hir::{BindingKey, CompilationUnit, MethodDecl, TypeDecl};
use rejig_signature::{
    MethodContext, SlotError, StubTypeContext, TypeContextChecker, TypeSlot,
};
use rejig_types::{display_type, Type, TypeEnv};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ParameterOperation {
    /// Use an existing parameter from the old signature, optionally
    /// changing its name/type.
    Existing {
        old_index: usize,
        new_name: Option<String>,
        new_type: Option<String>,
    },
    /// Add a new parameter.
    Add {
        name: String,
        ty: String,
        /// Expression inserted into updated call sites. Java has no default
        /// parameters; this is the *call-site default*.
        default_value: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SignatureChange {
    /// Binding key of the target method.
    pub target: String,
    pub new_name: Option<String>,
    pub parameters: Vec<ParameterOperation>,
    pub new_return_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureConflict {
    MissingTarget {
        target: String,
    },
    InvalidParameterIndex {
        index: usize,
        param_len: usize,
    },
    AddedParameterMissingDefault {
        name: String,
    },
    /// A proposed type failed the per-slot check. `slot` is the parameter
    /// position, or `None` for the return slot.
    SlotInvalid {
        slot: Option<usize>,
        error: SlotError,
    },
    /// The re-typing violates the collected constraints.
    NotTypeSafe {
        conflicting: Vec<TypeConstraint>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SignatureChangeError {
    #[error("signature change has {} conflict(s)", conflicts.len())]
    Conflicts { conflicts: Vec<SignatureConflict> },
    #[error(transparent)]
    Canceled(#[from] Canceled),
}

/// The resolved shape of an accepted plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChange {
    pub parameter_types: Vec<Type>,
    pub return_type: Type,
}

/// Validate `change` against `unit`. Returns the resolved new signature, or
/// every conflict found; slot problems are reported together, not
/// first-error-only.
pub fn validate_signature_change(
    unit: &CompilationUnit,
    index: &dyn TypeIndex,
    env: &dyn TypeEnv,
    source_level: SourceLevel,
    change: &SignatureChange,
    cancel: &CancellationToken,
) -> Result<ValidatedChange, SignatureChangeError> {
    let mut conflicts = Vec::new();

    let target_key = BindingKey::new(change.target.clone());
    let Some((enclosing, method)) = find_method(unit, &target_key) else {
        return Err(SignatureChangeError::Conflicts {
            conflicts: vec![SignatureConflict::MissingTarget {
                target: change.target.clone(),
            }],
        });
    };

    // Validate the plan against the old parameter list.
    for op in &change.parameters {
        match op {
            ParameterOperation::Existing { old_index, .. } => {
                if *old_index >= method.params.len() {
                    conflicts.push(SignatureConflict::InvalidParameterIndex {
                        index: *old_index,
                        param_len: method.params.len(),
                    });
                }
            }
            ParameterOperation::Add {
                name,
                default_value,
                ..
            } => {
                if default_value.is_none() {
                    conflicts.push(SignatureConflict::AddedParameterMissingDefault {
                        name: name.clone(),
                    });
                }
            }
        }
    }
    if !conflicts.is_empty() {
        return Err(SignatureChangeError::Conflicts { conflicts });
    }

    // Per-slot type validation through the stub context.
    let slots: Vec<TypeSlot> = change
        .parameters
        .iter()
        .map(|op| TypeSlot::parameter(slot_text(env, method, op)))
        .chain(std::iter::once(TypeSlot::return_type(
            change
                .new_return_type
                .clone()
                .unwrap_or_else(|| display_type(env, &method.return_type)),
        )))
        .collect();

    let context = MethodContext::for_method(unit, enclosing, method);
    let stub = StubTypeContext::create(unit, method.span.start);
    let checker = TypeContextChecker::new(index, env, source_level);
    let results = checker.check_and_resolve_method_types(&context, &stub, &slots, cancel)?;

    let (param_results, return_result) = results.split_at(change.parameters.len());
    for (idx, result) in param_results.iter().enumerate() {
        if let Err(error) = result {
            conflicts.push(SignatureConflict::SlotInvalid {
                slot: Some(idx),
                error: error.clone(),
            });
        }
    }
    if let Err(error) = &return_result[0] {
        conflicts.push(SignatureConflict::SlotInvalid {
            slot: None,
            error: error.clone(),
        });
    }
    if !conflicts.is_empty() {
        return Err(SignatureChangeError::Conflicts { conflicts });
    }

    // Constraint pass: pin every re-typed slot to its resolved type and ask
    // whether the collected constraints stay satisfiable.
    let mut collector = ConstraintCollector::new(env);
    collector.collect_unit(unit);
    let system = collector.finish();

    let mut pinned = HashMap::new();
    for (idx, op) in change.parameters.iter().enumerate() {
        let ParameterOperation::Existing {
            old_index,
            new_type: Some(_),
            ..
        } = op
        else {
            continue;
        };
        let resolved = param_results[idx].as_ref().expect("checked above");
        if let Some(var) = system.parameter_variable(&target_key, *old_index) {
            pinned.insert(var, resolved.resolved.clone());
        }
    }
    if change.new_return_type.is_some() {
        let resolved = return_result[0].as_ref().expect("checked above");
        if let Some(var) = system.return_variable(&target_key) {
            pinned.insert(var, resolved.resolved.clone());
        }
    }

    if !pinned.is_empty() {
        let options = SolverOptions {
            pinned,
            ..Default::default()
        };
        match solve(&system, env, &options, cancel)? {
            Solution::Satisfiable(_) => {}
            Solution::Unsatisfiable(conflict) => {
                conflicts.push(SignatureConflict::NotTypeSafe {
                    conflicting: conflict.constraints,
                });
            }
        }
    }

    if !conflicts.is_empty() {
        return Err(SignatureChangeError::Conflicts { conflicts });
    }

    debug!(target = %change.target, "signature change validated");
    Ok(ValidatedChange {
        parameter_types: param_results
            .iter()
            .map(|r| r.as_ref().expect("checked above").resolved.clone())
            .collect(),
        return_type: return_result[0]
            .as_ref()
            .expect("checked above")
            .resolved
            .clone(),
    })
}

fn slot_text(env: &dyn TypeEnv, method: &MethodDecl, op: &ParameterOperation) -> String {
    match op {
        ParameterOperation::Existing {
            old_index,
            new_type,
            ..
        } => new_type.clone().unwrap_or_else(|| {
            method
                .params
                .get(*old_index)
                .map(|p| display_type(env, &p.ty))
                .unwrap_or_default()
        }),
        ParameterOperation::Add { ty, .. } => ty.clone(),
    }
}

fn find_method<'a>(
    unit: &'a CompilationUnit,
    key: &BindingKey,
) -> Option<(&'a TypeDecl, &'a MethodDecl)> {
    fn in_type<'a>(decl: &'a TypeDecl, key: &BindingKey) -> Option<(&'a TypeDecl, &'a MethodDecl)> {
        if let Some(method) = decl.methods.iter().find(|m| &m.key == key) {
            return Some((decl, method));
        }
        decl.nested.iter().find_map(|nested| in_type(nested, key))
    }
    unit.types.iter().find_map(|decl| in_type(decl, key))
}
