//! Constraint variables and the owning system.

use std::collections::{HashMap, HashSet};

use rejig_core::{FileId, Span};
use rejig_hir::BindingKey;
use rejig_types::Type;

use crate::ConstraintOp;

/// Handle to a constraint variable inside one [`ConstraintSystem`].
///
/// Handles are only meaningful for the system that produced them; comparing
/// handles from different systems is a caller bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// What program entity a variable stands for, with the key needed to
/// re-associate solver results in later phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarKind {
    /// A type occurrence written in source (e.g. a cast's target type).
    Type { file: FileId, span: Span },
    /// The declared type of a field or local variable.
    Variable { key: BindingKey },
    /// The declared type of a method parameter.
    Parameter { method: BindingKey, index: usize },
    /// The declared return type of a method.
    Return { method: BindingKey },
    /// The type of an expression occurrence.
    Expression { file: FileId, span: Span },
}

#[derive(Debug, Clone)]
pub struct ConstraintVariable {
    kind: VarKind,
    /// The declared (pre-refactoring) type, when known at creation.
    bound: Option<Type>,
    /// A fixed variable cannot be re-typed (literals, members of code the
    /// refactoring may not touch); its candidate set is its bound alone.
    fixed: bool,
    /// Deferred attachment: the unit a result should be reported against.
    unit: Option<FileId>,
}

impl ConstraintVariable {
    pub fn kind(&self) -> &VarKind {
        &self.kind
    }

    pub fn bound(&self) -> Option<&Type> {
        self.bound.as_ref()
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn unit(&self) -> Option<FileId> {
        self.unit
    }
}

/// An edge of the constraint graph.
///
/// Equality and hashing are by (left handle, right handle, operator): the
/// same two distinct occurrences of logically-equal types stay
/// distinguishable, and structurally equal duplicate edges collapse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeConstraint {
    pub left: VarId,
    pub right: VarId,
    pub op: ConstraintOp,
}

impl TypeConstraint {
    pub fn is_subtype_constraint(&self) -> bool {
        self.op.is_subtype_operator()
    }
}

/// Append-only constraint graph owned by one analysis run.
#[derive(Debug, Default)]
pub struct ConstraintSystem {
    vars: Vec<ConstraintVariable>,
    constraints: Vec<TypeConstraint>,
    seen: HashSet<TypeConstraint>,
    by_binding: HashMap<BindingKey, VarId>,
    by_parameter: HashMap<(BindingKey, usize), VarId>,
    by_return: HashMap<BindingKey, VarId>,
}

impl ConstraintSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh variable. Every call yields a distinct occurrence.
    pub fn new_variable(&mut self, kind: VarKind, bound: Option<Type>) -> VarId {
        self.push_var(ConstraintVariable {
            kind,
            bound,
            fixed: false,
            unit: None,
        })
    }

    /// Create a fresh variable whose type may not change.
    pub fn new_fixed_variable(&mut self, kind: VarKind, bound: Type) -> VarId {
        self.push_var(ConstraintVariable {
            kind,
            bound: Some(bound),
            fixed: true,
            unit: None,
        })
    }

    /// The variable for a field/local binding, created on first use.
    pub fn variable_for_binding(&mut self, key: &BindingKey, bound: &Type) -> VarId {
        if let Some(id) = self.by_binding.get(key) {
            return *id;
        }
        let id = self.new_variable(
            VarKind::Variable { key: key.clone() },
            Some(bound.clone()),
        );
        self.by_binding.insert(key.clone(), id);
        id
    }

    /// The variable for a method parameter slot, created on first use.
    pub fn variable_for_parameter(
        &mut self,
        method: &BindingKey,
        index: usize,
        bound: &Type,
        fixed: bool,
    ) -> VarId {
        if let Some(id) = self.by_parameter.get(&(method.clone(), index)) {
            return *id;
        }
        let kind = VarKind::Parameter {
            method: method.clone(),
            index,
        };
        let id = if fixed {
            self.new_fixed_variable(kind, bound.clone())
        } else {
            self.new_variable(kind, Some(bound.clone()))
        };
        self.by_parameter.insert((method.clone(), index), id);
        id
    }

    /// The variable for a method's return slot, created on first use.
    pub fn variable_for_return(&mut self, method: &BindingKey, bound: &Type, fixed: bool) -> VarId {
        if let Some(id) = self.by_return.get(method) {
            return *id;
        }
        let kind = VarKind::Return {
            method: method.clone(),
        };
        let id = if fixed {
            self.new_fixed_variable(kind, bound.clone())
        } else {
            self.new_variable(kind, Some(bound.clone()))
        };
        self.by_return.insert(method.clone(), id);
        id
    }

    fn push_var(&mut self, var: ConstraintVariable) -> VarId {
        let id = VarId(u32::try_from(self.vars.len()).expect("variable arena overflow"));
        self.vars.push(var);
        id
    }

    /// Add an edge; exact duplicates collapse. Returns whether it was new.
    pub fn add_constraint(&mut self, left: VarId, right: VarId, op: ConstraintOp) -> bool {
        let constraint = TypeConstraint { left, right, op };
        if !self.seen.insert(constraint) {
            return false;
        }
        self.constraints.push(constraint);
        true
    }

    /// Attach the unit a variable's result should be reported against.
    /// This is the only mutation allowed after creation.
    pub fn set_unit(&mut self, id: VarId, file: FileId) {
        self.vars[id.0 as usize].unit = Some(file);
    }

    pub fn var(&self, id: VarId) -> &ConstraintVariable {
        &self.vars[id.0 as usize]
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn vars(&self) -> impl Iterator<Item = (VarId, &ConstraintVariable)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId(i as u32), v))
    }

    pub fn constraints(&self) -> &[TypeConstraint] {
        &self.constraints
    }

    /// Find the parameter-slot variable for `method`/`index`, if collected.
    pub fn parameter_variable(&self, method: &BindingKey, index: usize) -> Option<VarId> {
        self.by_parameter.get(&(method.clone(), index)).copied()
    }

    /// Find the return-slot variable for `method`, if collected.
    pub fn return_variable(&self, method: &BindingKey) -> Option<VarId> {
        self.by_return.get(method).copied()
    }

    /// Find the variable for a field/local binding, if collected.
    pub fn binding_variable(&self, key: &BindingKey) -> Option<VarId> {
        self.by_binding.get(key).copied()
    }
}
