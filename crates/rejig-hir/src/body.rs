//! Arena-based method body IR.
//!
//! Statements and expressions live in per-body vectors and are referenced by
//! integer ids, so downstream passes can key analysis state by id without
//! borrowing into the tree. Every expression carries its resolved static
//! type.

use rejig_core::{Name, Span};
use rejig_types::Type;

use crate::{FieldRef, MethodRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(pub u32);

#[derive(Debug, Clone)]
pub struct LocalData {
    pub name: Name,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct ExprData {
    pub kind: ExprKind,
    /// Resolved static type of the expression.
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Reference to a local variable of this body.
    Local(LocalId),
    /// Reference to a parameter of the enclosing method, by index.
    Param(usize),
    /// Reference to a field.
    Field(FieldRef),
    /// Method invocation; the callee is already resolved.
    Call {
        receiver: Option<ExprId>,
        method: MethodRef,
        args: Vec<ExprId>,
    },
    /// `new T(args)`; the expression's `ty` is the constructed type.
    New { args: Vec<ExprId> },
    /// `(T) operand`; the expression's `ty` is the cast target.
    Cast { operand: ExprId },
    /// Any constant; only its `ty` matters to the analyses.
    Literal,
}

#[derive(Debug, Clone)]
pub struct StmtData {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `T v = init;` (initializer optional).
    Local { local: LocalId, init: Option<ExprId> },
    /// `lhs = rhs;`
    Assign { lhs: ExprId, rhs: ExprId },
    /// Expression statement.
    Expr(ExprId),
    /// `return;` / `return e;`
    Return(Option<ExprId>),
    Block(Vec<StmtId>),
}

/// One method body. Append-only: ids handed out by `add_*` stay valid for
/// the body's lifetime.
#[derive(Debug, Clone, Default)]
pub struct Body {
    locals: Vec<LocalData>,
    exprs: Vec<ExprData>,
    stmts: Vec<StmtData>,
    root: Vec<StmtId>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_local(&mut self, name: impl Into<Name>, ty: Type) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.locals.push(LocalData {
            name: name.into(),
            ty,
        });
        id
    }

    pub fn add_expr(&mut self, kind: ExprKind, ty: Type, span: Span) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(ExprData { kind, ty, span });
        id
    }

    pub fn add_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(StmtData { kind, span });
        id
    }

    /// Append a statement to the body's top-level sequence.
    pub fn push_root(&mut self, stmt: StmtId) {
        self.root.push(stmt);
    }

    pub fn root(&self) -> &[StmtId] {
        &self.root
    }

    pub fn local(&self, id: LocalId) -> &LocalData {
        &self.locals[id.0 as usize]
    }

    pub fn expr(&self, id: ExprId) -> &ExprData {
        &self.exprs[id.0 as usize]
    }

    pub fn stmt(&self, id: StmtId) -> &StmtData {
        &self.stmts[id.0 as usize]
    }

    pub fn locals(&self) -> impl Iterator<Item = (LocalId, &LocalData)> {
        self.locals
            .iter()
            .enumerate()
            .map(|(i, data)| (LocalId(i as u32), data))
    }

    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rejig_types::PrimitiveKind;

    #[test]
    fn ids_are_stable_and_sequential() {
        let mut body = Body::new();
        let a = body.add_local("a", Type::Primitive(PrimitiveKind::Int));
        let b = body.add_local("b", Type::Primitive(PrimitiveKind::Long));
        assert_eq!((a, b), (LocalId(0), LocalId(1)));

        let lit = body.add_expr(
            ExprKind::Literal,
            Type::Primitive(PrimitiveKind::Int),
            Span::new(0, 1),
        );
        let stmt = body.add_stmt(
            StmtKind::Local {
                local: a,
                init: Some(lit),
            },
            Span::new(0, 10),
        );
        body.push_root(stmt);

        assert_eq!(body.root(), &[stmt]);
        assert_eq!(body.local(a).name.as_str(), "a");
        assert!(matches!(body.expr(lit).kind, ExprKind::Literal));
    }
}
