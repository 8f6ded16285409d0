//! Fixpoint constraint solving.
//!
//! Each constrained variable gets a candidate set: the types it may be
//! assigned without violating any collected constraint. Sets start from the
//! declared bound and its supertypes and only ever shrink, so the worklist
//! terminates; the propagation computes the unique maximal arc-consistent
//! fixpoint, which makes the result independent of constraint order.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use rejig_core::{Canceled, CancellationToken};
use rejig_types::{generalization_distance, is_subtype, supertypes_of, Type, TypeEnv};
use tracing::debug;

use crate::{ConstraintSystem, TypeConstraint, VarId};

/// How a single admissible type is picked out of a candidate set.
///
/// This is policy, not contract: callers wanting a different generalization
/// preference select it here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Prefer the candidate closest to the declared type (least surprise).
    #[default]
    ClosestToDeclared,
    /// Prefer the most general admissible candidate.
    MostGeneral,
}

#[derive(Debug, Clone, Default)]
pub struct SolverOptions {
    pub tie_break: TieBreak,
    /// Variables pinned to a caller-proposed type, e.g. the slots a
    /// signature change wants to re-type. A pinned variable's candidate set
    /// is exactly the pinned type.
    pub pinned: HashMap<VarId, Type>,
}

/// Per-variable solver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignments {
    admissible: BTreeMap<VarId, Vec<Type>>,
    chosen: BTreeMap<VarId, Type>,
}

impl Assignments {
    /// The admissible set for `id`, in nearest-to-declared-first order.
    pub fn admissible(&self, id: VarId) -> Option<&[Type]> {
        self.admissible.get(&id).map(Vec::as_slice)
    }

    /// The tie-break winner for `id`.
    pub fn chosen(&self, id: VarId) -> Option<&Type> {
        self.chosen.get(&id)
    }

    pub fn variables(&self) -> impl Iterator<Item = VarId> + '_ {
        self.admissible.keys().copied()
    }

    pub fn chosen_map(&self) -> &BTreeMap<VarId, Type> {
        &self.chosen
    }
}

/// Why a constraint set is unsatisfiable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The variable whose candidate set emptied.
    pub variable: VarId,
    /// The constraints incident to that variable: the minimal conflicting
    /// subset when determinable, a superset of it otherwise.
    pub constraints: Vec<TypeConstraint>,
}

/// Solver outcome. Unsatisfiability is a result, not an error: the caller
/// decides whether to warn or to block the refactoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    Satisfiable(Assignments),
    Unsatisfiable(Conflict),
}

impl Solution {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, Solution::Satisfiable(_))
    }

    pub fn assignments(&self) -> Option<&Assignments> {
        match self {
            Solution::Satisfiable(a) => Some(a),
            Solution::Unsatisfiable(_) => None,
        }
    }
}

/// Solve the collected constraints.
///
/// Only variables involved in at least one subtype constraint participate.
pub fn solve(
    system: &ConstraintSystem,
    env: &dyn TypeEnv,
    options: &SolverOptions,
    cancel: &CancellationToken,
) -> Result<Solution, Canceled> {
    let constraints: Vec<TypeConstraint> = system
        .constraints()
        .iter()
        .filter(|c| c.is_subtype_constraint())
        .copied()
        .collect();

    let mut involved = BTreeSet::new();
    for c in &constraints {
        involved.insert(c.left);
        involved.insert(c.right);
    }

    let mut candidates: BTreeMap<VarId, Vec<Type>> = BTreeMap::new();
    for &id in &involved {
        candidates.insert(id, initial_candidates(system, env, options, id, &constraints));
    }

    let mut incident: HashMap<VarId, Vec<usize>> = HashMap::new();
    for (idx, c) in constraints.iter().enumerate() {
        incident.entry(c.left).or_default().push(idx);
        incident.entry(c.right).or_default().push(idx);
    }

    let mut queue: VecDeque<usize> = (0..constraints.len()).collect();
    let mut queued = vec![true; constraints.len()];
    let mut rounds = 0usize;

    while let Some(idx) = queue.pop_front() {
        cancel.check()?;
        queued[idx] = false;
        rounds += 1;
        let c = constraints[idx];

        let right_set = candidates.get(&c.right).cloned().unwrap_or_default();
        let left_set = candidates.get(&c.left).cloned().unwrap_or_default();

        // A candidate for the left survives iff something on the right can
        // sit above it; a candidate for the right survives iff something on
        // the left can sit below it.
        let mut changed = Vec::new();
        {
            let left = candidates.get_mut(&c.left).expect("involved var");
            let before = left.len();
            left.retain(|t| right_set.iter().any(|u| is_subtype(env, t, u)));
            if left.is_empty() {
                return Ok(unsatisfiable(c.left, &constraints, &incident));
            }
            if left.len() != before {
                changed.push(c.left);
            }
        }
        {
            let right = candidates.get_mut(&c.right).expect("involved var");
            let before = right.len();
            right.retain(|u| left_set.iter().any(|t| is_subtype(env, t, u)));
            if right.is_empty() {
                return Ok(unsatisfiable(c.right, &constraints, &incident));
            }
            if right.len() != before {
                changed.push(c.right);
            }
        }

        for var in changed {
            for &edge in incident.get(&var).into_iter().flatten() {
                if !queued[edge] {
                    queued[edge] = true;
                    queue.push_back(edge);
                }
            }
        }
    }

    let chosen = candidates
        .iter()
        .map(|(&id, set)| (id, pick(env, system, options.tie_break, id, set)))
        .collect();

    debug!(
        variables = candidates.len(),
        constraints = constraints.len(),
        rounds,
        "constraint solving reached fixpoint"
    );

    Ok(Solution::Satisfiable(Assignments {
        admissible: candidates,
        chosen,
    }))
}

fn initial_candidates(
    system: &ConstraintSystem,
    env: &dyn TypeEnv,
    options: &SolverOptions,
    id: VarId,
    constraints: &[TypeConstraint],
) -> Vec<Type> {
    if let Some(pinned) = options.pinned.get(&id) {
        return vec![pinned.clone()];
    }
    let var = system.var(id);
    if let Some(bound) = var.bound() {
        if var.is_fixed() {
            return vec![bound.clone()];
        }
        return universe_of(env, bound);
    }

    // No declared bound: range over the universes of the bounded ends of
    // incident constraints, keeping the lattice finite without a global
    // type enumeration.
    let mut out = Vec::new();
    for c in constraints {
        let other = if c.left == id {
            c.right
        } else if c.right == id {
            c.left
        } else {
            continue;
        };
        if let Some(bound) = system.var(other).bound() {
            for ty in universe_of(env, bound) {
                if !out.contains(&ty) {
                    out.push(ty);
                }
            }
        }
    }
    if out.is_empty() {
        out.push(Type::class(env.well_known().object, Vec::new()));
    }
    out
}

fn universe_of(env: &dyn TypeEnv, bound: &Type) -> Vec<Type> {
    let mut out = vec![bound.clone()];
    out.extend(supertypes_of(env, bound));
    out
}

fn unsatisfiable(
    variable: VarId,
    constraints: &[TypeConstraint],
    incident: &HashMap<VarId, Vec<usize>>,
) -> Solution {
    let conflicting = incident
        .get(&variable)
        .into_iter()
        .flatten()
        .map(|&idx| constraints[idx])
        .collect();
    Solution::Unsatisfiable(Conflict {
        variable,
        constraints: conflicting,
    })
}

fn pick(
    env: &dyn TypeEnv,
    system: &ConstraintSystem,
    tie_break: TieBreak,
    id: VarId,
    set: &[Type],
) -> Type {
    debug_assert!(!set.is_empty(), "empty sets are reported as unsatisfiable");
    let Some(bound) = system.var(id).bound() else {
        return set[0].clone();
    };
    let distance = |ty: &Type| generalization_distance(env, bound, ty).unwrap_or(u32::MAX);
    let mut best = &set[0];
    let mut best_distance = distance(best);
    for ty in &set[1..] {
        let d = distance(ty);
        let better = match tie_break {
            TieBreak::ClosestToDeclared => d < best_distance,
            TieBreak::MostGeneral => d != u32::MAX && (best_distance == u32::MAX || d > best_distance),
        };
        if better {
            best = ty;
            best_distance = d;
        }
    }
    best.clone()
}

/// The subtype constraints a concrete assignment violates. Variables absent
/// from the assignment fall back to their declared bound.
pub fn violated_constraints(
    system: &ConstraintSystem,
    env: &dyn TypeEnv,
    assignment: &HashMap<VarId, Type>,
) -> Vec<TypeConstraint> {
    let type_of = |id: VarId| {
        assignment
            .get(&id)
            .cloned()
            .or_else(|| system.var(id).bound().cloned())
    };
    system
        .constraints()
        .iter()
        .filter(|c| c.is_subtype_constraint())
        .filter(|c| match (type_of(c.left), type_of(c.right)) {
            (Some(left), Some(right)) => !is_subtype(env, &left, &right),
            _ => false,
        })
        .copied()
        .collect()
}

/// Does the assignment satisfy every collected constraint?
///
/// This is the narrower question refactoring callers usually ask: "does
/// assignment policy X satisfy the constraints", without full inference.
pub fn check_assignment(
    system: &ConstraintSystem,
    env: &dyn TypeEnv,
    assignment: &HashMap<VarId, Type>,
) -> bool {
    violated_constraints(system, env, assignment).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConstraintOp, VarKind};
    use pretty_assertions::assert_eq;
    use rejig_core::{FileId, Span};
    use rejig_jdk::JdkIndex;

    fn expr_kind(n: usize) -> VarKind {
        VarKind::Expression {
            file: FileId::new(0),
            span: Span::new(n, n + 1),
        }
    }

    fn class_ty(jdk: &JdkIndex, name: &str) -> Type {
        Type::class(
            rejig_types::TypeEnv::lookup_class(jdk, name).unwrap(),
            vec![],
        )
    }

    /// `a: Integer <= b: Number <= cap`, plus `a <= cap`, where `cap` is a
    /// fixed `Number` slot. The cap forces real narrowing (Object drops out
    /// of `a` and `b`), so order-independence is exercised, not vacuous.
    fn chain_system(jdk: &JdkIndex, order: &[(usize, usize)]) -> (ConstraintSystem, Vec<VarId>) {
        let mut system = ConstraintSystem::new();
        let a = system.new_variable(expr_kind(0), Some(class_ty(jdk, "java.lang.Integer")));
        let b = system.new_variable(expr_kind(1), Some(class_ty(jdk, "java.lang.Number")));
        let cap = system.new_fixed_variable(expr_kind(2), class_ty(jdk, "java.lang.Number"));
        let vars = vec![a, b, cap];
        for &(l, r) in order {
            system.add_constraint(vars[l], vars[r], ConstraintOp::subtype());
        }
        (system, vars)
    }

    fn solve_ok(system: &ConstraintSystem, jdk: &JdkIndex, options: &SolverOptions) -> Assignments {
        match solve(system, jdk, options, &CancellationToken::new()).unwrap() {
            Solution::Satisfiable(a) => a,
            Solution::Unsatisfiable(conflict) => panic!("unexpected conflict: {conflict:?}"),
        }
    }

    #[test]
    fn solving_is_order_independent() {
        let jdk = JdkIndex::new();
        let orders: [&[(usize, usize)]; 3] = [
            &[(0, 1), (1, 2), (0, 2)],
            &[(0, 2), (1, 2), (0, 1)],
            &[(1, 2), (0, 2), (0, 1)],
        ];
        let mut results = Vec::new();
        for order in orders {
            let (system, vars) = chain_system(&jdk, order);
            let assignments = solve_ok(&system, &jdk, &SolverOptions::default());
            let sets: Vec<Vec<Type>> = vars
                .iter()
                .map(|&v| assignments.admissible(v).unwrap().to_vec())
                .collect();
            results.push(sets);
        }
        assert_eq!(results[0], results[1]);
        assert_eq!(results[1], results[2]);

        // The cap really narrowed the free variables.
        let jdk2 = JdkIndex::new();
        assert_eq!(
            results[0][0],
            vec![
                class_ty(&jdk2, "java.lang.Integer"),
                class_ty(&jdk2, "java.lang.Number"),
            ]
        );
        assert_eq!(results[0][1], vec![class_ty(&jdk2, "java.lang.Number")]);
    }

    #[test]
    fn fixpoint_is_idempotent() {
        let jdk = JdkIndex::new();
        let (system, vars) = chain_system(&jdk, &[(0, 1), (1, 2), (0, 2)]);
        let first = solve_ok(&system, &jdk, &SolverOptions::default());

        // Re-run with every variable's bound replaced by its chosen type:
        // nothing narrows further.
        let mut rerun = ConstraintSystem::new();
        let rerun_vars: Vec<VarId> = vars
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                rerun.new_variable(expr_kind(i), Some(first.chosen(v).unwrap().clone()))
            })
            .collect();
        for c in system.constraints() {
            let l = rerun_vars[c.left.0 as usize];
            let r = rerun_vars[c.right.0 as usize];
            rerun.add_constraint(l, r, c.op);
        }
        let second = solve_ok(&rerun, &jdk, &SolverOptions::default());
        for (i, &v) in vars.iter().enumerate() {
            assert_eq!(second.chosen(rerun_vars[i]), first.chosen(v));
        }
    }

    #[test]
    fn solutions_are_sound() {
        let jdk = JdkIndex::new();
        let (system, _) = chain_system(&jdk, &[(0, 1), (1, 2), (0, 2)]);
        let assignments = solve_ok(&system, &jdk, &SolverOptions::default());

        for c in system.constraints() {
            let left = assignments.admissible(c.left).unwrap();
            let right = assignments.admissible(c.right).unwrap();
            for t in left {
                assert!(
                    right.iter().any(|u| is_subtype(&jdk, t, u)),
                    "{t:?} has no admissible supertype on the right"
                );
            }
        }
    }

    #[test]
    fn conflicting_fixed_bounds_are_unsatisfiable() {
        let jdk = JdkIndex::new();
        let mut system = ConstraintSystem::new();
        let s = system.new_variable(expr_kind(0), Some(class_ty(&jdk, "java.lang.String")));
        let i = system.new_fixed_variable(expr_kind(1), class_ty(&jdk, "java.lang.Integer"));
        system.add_constraint(s, i, ConstraintOp::subtype());

        let solution = solve(
            &system,
            &jdk,
            &SolverOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        let Solution::Unsatisfiable(conflict) = solution else {
            panic!("expected unsatisfiable");
        };
        assert_eq!(conflict.variable, s);
        assert_eq!(
            conflict.constraints,
            vec![TypeConstraint {
                left: s,
                right: i,
                op: ConstraintOp::subtype(),
            }]
        );
    }

    #[test]
    fn tie_break_is_selectable_policy() {
        let jdk = JdkIndex::new();
        let integer = class_ty(&jdk, "java.lang.Integer");
        let number = class_ty(&jdk, "java.lang.Number");

        let mut system = ConstraintSystem::new();
        let v = system.new_variable(expr_kind(0), Some(integer.clone()));
        let cap = system.new_fixed_variable(expr_kind(1), number.clone());
        system.add_constraint(v, cap, ConstraintOp::subtype());

        let closest = solve_ok(&system, &jdk, &SolverOptions::default());
        assert_eq!(closest.admissible(v).unwrap(), &[integer.clone(), number.clone()]);
        assert_eq!(closest.chosen(v), Some(&integer));

        let widest = solve_ok(
            &system,
            &jdk,
            &SolverOptions {
                tie_break: TieBreak::MostGeneral,
                ..Default::default()
            },
        );
        assert_eq!(widest.chosen(v), Some(&number));
    }

    #[test]
    fn pinning_answers_the_policy_question() {
        let jdk = JdkIndex::new();
        let char_seq = class_ty(&jdk, "java.lang.CharSequence");
        let string = class_ty(&jdk, "java.lang.String");
        let integer = class_ty(&jdk, "java.lang.Integer");

        let mut system = ConstraintSystem::new();
        // `arg: String` flows into `param`.
        let arg = system.new_fixed_variable(expr_kind(0), string);
        let param = system.new_variable(expr_kind(1), Some(char_seq.clone()));
        system.add_constraint(arg, param, ConstraintOp::subtype());

        // Re-typing the parameter to CharSequence is fine.
        let ok = solve(
            &system,
            &jdk,
            &SolverOptions {
                pinned: HashMap::from([(param, char_seq)]),
                ..Default::default()
            },
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(ok.is_satisfiable());

        // Re-typing it to Integer cannot work.
        let bad = solve(
            &system,
            &jdk,
            &SolverOptions {
                pinned: HashMap::from([(param, integer)]),
                ..Default::default()
            },
            &CancellationToken::new(),
        )
        .unwrap();
        assert!(!bad.is_satisfiable());
    }

    #[test]
    fn check_assignment_matches_solver_verdict() {
        let jdk = JdkIndex::new();
        let (system, vars) = chain_system(&jdk, &[(0, 1), (1, 2)]);
        let number = class_ty(&jdk, "java.lang.Number");
        let object = class_ty(&jdk, "java.lang.Object");

        let good = HashMap::from([(vars[0], number.clone())]);
        // Integer widened to Number still sits below Number and Object.
        assert!(check_assignment(&system, &jdk, &good));

        let bad = HashMap::from([(vars[1], class_ty(&jdk, "java.lang.Integer")), (vars[0], object)]);
        assert_eq!(violated_constraints(&system, &jdk, &bad).len(), 1);
        assert!(!check_assignment(&system, &jdk, &bad));
    }

    #[test]
    fn cancellation_stops_the_fixpoint() {
        let jdk = JdkIndex::new();
        let (system, _) = chain_system(&jdk, &[(0, 1), (1, 2)]);
        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(
            solve(&system, &jdk, &SolverOptions::default(), &token),
            Err(Canceled)
        );
    }
}
