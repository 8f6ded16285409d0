//! Subtype checks and supertype walks over the declared hierarchy.
//!
//! These are nominal, erasure-level queries: generics compare invariantly,
//! with unbounded wildcards acting as a match-anything argument. Full JLS
//! capture/inference belongs to a compiler front end, not here.

use std::collections::{HashSet, VecDeque};

use tracing::trace;

use crate::{ClassId, ClassType, Type, TypeEnv, WildcardBound};

/// Is `sub` a subtype of `sup`?
///
/// Reflexive. Primitives and `void` relate only to themselves; arrays are
/// covariant in their element type and below `Object`; `Named` types with no
/// metadata sit directly below `Object`.
pub fn is_subtype(env: &dyn TypeEnv, sub: &Type, sup: &Type) -> bool {
    if sub == sup {
        return true;
    }
    match (sub, sup) {
        (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
        (Type::Void, _) | (_, Type::Void) => false,

        (_, Type::Class(c)) if c.def == env.well_known().object && c.args.is_empty() => {
            // Everything reference-shaped is below Object.
            !matches!(sub, Type::Primitive(_) | Type::Void)
        }

        (Type::Array(a), Type::Array(b)) => is_subtype(env, a, b),
        (Type::Array(_), _) => false,

        (Type::Class(sub_c), Type::Class(sup_c)) => class_is_subtype(env, sub_c, sup_c),

        // A type variable is only below itself and Object (no bound metadata
        // is carried here); Named types likewise.
        (Type::TypeVar(_), _) | (Type::Named(_), _) => false,

        _ => false,
    }
}

fn class_is_subtype(env: &dyn TypeEnv, sub: &ClassType, sup: &ClassType) -> bool {
    if !def_is_subtype(env, sub.def, sup.def) {
        return false;
    }
    if sup.args.is_empty() {
        // Raw (or non-generic) supertype reference: erased check suffices.
        return true;
    }
    if sub.def == sup.def {
        return args_match(env, &sub.args, &sup.args);
    }
    // Distinct defs with arguments on the supertype: without a substitution
    // model we only accept wildcard-tolerant matches against the raw walk.
    sup.args
        .iter()
        .all(|arg| matches!(arg, Type::Wildcard(WildcardBound::Unbounded)))
}

fn args_match(env: &dyn TypeEnv, sub_args: &[Type], sup_args: &[Type]) -> bool {
    if sub_args.is_empty() {
        // Raw subtype reference conforms to any instantiation (unchecked).
        return true;
    }
    if sub_args.len() != sup_args.len() {
        return false;
    }
    sub_args.iter().zip(sup_args).all(|(s, t)| match t {
        Type::Wildcard(WildcardBound::Unbounded) => true,
        Type::Wildcard(WildcardBound::Extends(bound)) => is_subtype(env, s, bound),
        Type::Wildcard(WildcardBound::Super(bound)) => is_subtype(env, bound, s),
        _ => s == t,
    })
}

fn def_is_subtype(env: &dyn TypeEnv, sub: ClassId, sup: ClassId) -> bool {
    if sub == sup {
        return true;
    }
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([sub]);
    while let Some(cur) = queue.pop_front() {
        if !seen.insert(cur) {
            continue;
        }
        let Some(def) = env.class(cur) else {
            continue;
        };
        for next in def.superclass.iter().chain(def.interfaces.iter()) {
            if *next == sup {
                return true;
            }
            queue.push_back(*next);
        }
    }
    false
}

/// All proper supertypes of `ty`, nearest first (breadth-first over the
/// declared hierarchy, superclass before interfaces, deduplicated).
///
/// `Object` closes the walk for every reference type, so the result is the
/// candidate universe a constraint variable may be generalized over.
pub fn supertypes_of(env: &dyn TypeEnv, ty: &Type) -> Vec<Type> {
    let object = Type::class(env.well_known().object, Vec::new());
    match ty {
        Type::Primitive(_) | Type::Void => Vec::new(),
        Type::Array(_) | Type::Named(_) | Type::TypeVar(_) | Type::Wildcard(_) => {
            if *ty == object {
                Vec::new()
            } else {
                vec![object]
            }
        }
        Type::Class(c) => {
            let mut out = Vec::new();
            let mut seen = HashSet::from([c.def]);
            let mut queue = VecDeque::from([c.def]);
            while let Some(cur) = queue.pop_front() {
                let Some(def) = env.class(cur) else {
                    continue;
                };
                for next in def.superclass.iter().chain(def.interfaces.iter()) {
                    if seen.insert(*next) {
                        out.push(Type::class(*next, Vec::new()));
                        queue.push_back(*next);
                    }
                }
            }
            // Interfaces have no superclass chain to Object; add it as the
            // final generalization step.
            if c.def != env.well_known().object && !out.contains(&object) {
                out.push(object);
            }
            trace!(count = out.len(), "computed supertype set");
            out
        }
    }
}

/// Number of hierarchy steps from `from` up to `to`; `Some(0)` when equal,
/// `None` when `to` is not a supertype of `from`.
pub fn generalization_distance(env: &dyn TypeEnv, from: &Type, to: &Type) -> Option<u32> {
    if from == to {
        return Some(0);
    }
    let (Some(from_def), Some(to_def)) = (erased_def(from), erased_def(to)) else {
        // Non-class generalizations all funnel straight to Object.
        return is_subtype(env, from, to).then_some(1);
    };
    let mut depth = 0u32;
    let mut seen = HashSet::from([from_def]);
    let mut frontier = vec![from_def];
    while !frontier.is_empty() {
        depth += 1;
        let mut next_frontier = Vec::new();
        for cur in frontier {
            let Some(def) = env.class(cur) else { continue };
            let mut step = |next: ClassId| {
                if next == to_def {
                    return true;
                }
                if seen.insert(next) {
                    next_frontier.push(next);
                }
                false
            };
            for next in def.superclass.iter().chain(def.interfaces.iter()) {
                if step(*next) {
                    return Some(depth);
                }
            }
            // The implicit interface-to-Object edge.
            if def.superclass.is_none()
                && def.kind == crate::ClassKind::Interface
                && to_def == env.well_known().object
            {
                return Some(depth);
            }
        }
        frontier = next_frontier;
    }
    None
}

fn erased_def(ty: &Type) -> Option<ClassId> {
    match ty {
        Type::Class(c) => Some(c.def),
        _ => None,
    }
}
