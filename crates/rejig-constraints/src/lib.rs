//! The type-constraint engine.
//!
//! One analysis owns a [`ConstraintSystem`]: an append-only graph whose
//! nodes are constraint variables (one per *occurrence* of a type-bearing
//! program entity) and whose edges are subtype constraints between them.
//! [`ConstraintCollector`] populates the system from a resolved
//! `rejig-hir` unit; [`solve`] computes, per variable, the set of types it
//! may be assigned without violating any constraint.
//!
//! Variables are referenced by [`VarId`] handles, so "same occurrence, not
//! same type" identity holds without leaning on reference identity: two
//! occurrences of `java.lang.String` are distinct nodes, and constraint
//! equality is equality of (handle, handle, operator).

mod collect;
mod op;
mod solve;
mod system;

pub use collect::ConstraintCollector;
pub use op::{ConstraintOp, InvalidOperatorError};
pub use solve::{
    check_assignment, solve, violated_constraints, Assignments, Conflict, Solution, SolverOptions,
    TieBreak,
};
pub use system::{ConstraintSystem, ConstraintVariable, TypeConstraint, VarId, VarKind};
