//! Constraint collection over resolved method bodies.
//!
//! The collector pattern-matches the syntactic contexts that induce
//! subtype obligations (declarations with initializers, assignments,
//! returns, invocation arguments, casts) and appends one edge per context
//! to the owned system. Entity variables (locals, fields, parameter and return
//! slots) are shared across their occurrences; expression occurrences are
//! fresh nodes.

use std::collections::{HashMap, HashSet};

use rejig_core::FileId;
use rejig_hir::{
    BindingKey, Body, CompilationUnit, ExprId, ExprKind, LocalId, MethodDecl, StmtId, StmtKind,
    TypeDecl,
};
use rejig_types::{is_subtype, TypeEnv};
use tracing::debug;

use crate::{ConstraintOp, ConstraintSystem, VarId, VarKind};

pub struct ConstraintCollector<'a> {
    env: &'a dyn TypeEnv,
    system: ConstraintSystem,
}

impl<'a> ConstraintCollector<'a> {
    pub fn new(env: &'a dyn TypeEnv) -> Self {
        Self {
            env,
            system: ConstraintSystem::new(),
        }
    }

    /// Collect constraints from every method body in `unit`.
    ///
    /// Parameter and return slots of methods declared outside the unit are
    /// fixed: the refactoring may not re-type code it does not own.
    pub fn collect_unit(&mut self, unit: &CompilationUnit) {
        let mut declared = HashSet::new();
        for ty in &unit.types {
            gather_declared_methods(ty, &mut declared);
        }
        for ty in &unit.types {
            self.collect_type(unit.file, ty, &declared);
        }
        debug!(
            variables = self.system.var_count(),
            constraints = self.system.constraints().len(),
            "collected constraint graph"
        );
    }

    /// Finish collection, handing the populated system to the solver.
    pub fn finish(self) -> ConstraintSystem {
        self.system
    }

    pub fn system(&self) -> &ConstraintSystem {
        &self.system
    }

    fn collect_type(&mut self, file: FileId, decl: &TypeDecl, declared: &HashSet<BindingKey>) {
        for method in &decl.methods {
            self.collect_method(file, method, declared);
        }
        for nested in &decl.nested {
            self.collect_type(file, nested, declared);
        }
    }

    fn collect_method(
        &mut self,
        file: FileId,
        method: &MethodDecl,
        declared: &HashSet<BindingKey>,
    ) {
        let Some(body) = &method.body else {
            return;
        };
        let mut cx = BodyCx {
            file,
            method,
            body,
            expr_vars: HashMap::new(),
            local_vars: HashMap::new(),
        };
        for stmt in body.root() {
            self.collect_stmt(&mut cx, *stmt, declared);
        }
    }

    fn collect_stmt(&mut self, cx: &mut BodyCx<'_>, id: StmtId, declared: &HashSet<BindingKey>) {
        match &cx.body.stmt(id).kind {
            StmtKind::Local { local, init } => {
                let var = self.local_var(cx, *local);
                if let Some(init) = init {
                    let init_var = self.collect_expr(cx, *init, declared);
                    self.system
                        .add_constraint(init_var, var, ConstraintOp::subtype());
                }
            }
            StmtKind::Assign { lhs, rhs } => {
                let lhs_var = self.collect_expr(cx, *lhs, declared);
                let rhs_var = self.collect_expr(cx, *rhs, declared);
                self.system
                    .add_constraint(rhs_var, lhs_var, ConstraintOp::subtype());
            }
            StmtKind::Expr(expr) => {
                self.collect_expr(cx, *expr, declared);
            }
            StmtKind::Return(expr) => {
                if let Some(expr) = expr {
                    let expr_var = self.collect_expr(cx, *expr, declared);
                    let ret = self.system.variable_for_return(
                        &cx.method.key,
                        &cx.method.return_type,
                        false,
                    );
                    self.system.set_unit(ret, cx.file);
                    self.system
                        .add_constraint(expr_var, ret, ConstraintOp::subtype());
                }
            }
            StmtKind::Block(stmts) => {
                for stmt in stmts.clone() {
                    self.collect_stmt(cx, stmt, declared);
                }
            }
        }
    }

    fn collect_expr(&mut self, cx: &mut BodyCx<'_>, id: ExprId, declared: &HashSet<BindingKey>) -> VarId {
        if let Some(var) = cx.expr_vars.get(&id) {
            return *var;
        }
        let data = cx.body.expr(id).clone();
        let var = match &data.kind {
            ExprKind::Local(local) => self.local_var(cx, *local),
            ExprKind::Param(index) => {
                let bound = &cx.method.params[*index].ty;
                let var = self
                    .system
                    .variable_for_parameter(&cx.method.key, *index, bound, false);
                self.system.set_unit(var, cx.file);
                var
            }
            ExprKind::Field(field) => {
                let var = self.system.variable_for_binding(&field.key, &field.ty);
                self.system.set_unit(var, cx.file);
                var
            }
            ExprKind::Call {
                receiver,
                method: callee,
                args,
            } => {
                if let Some(receiver) = receiver {
                    self.collect_expr(cx, *receiver, declared);
                }
                let external = !declared.contains(&callee.key);
                for (index, arg) in args.iter().enumerate() {
                    let arg_var = self.collect_expr(cx, *arg, declared);
                    let Some(param_ty) = callee.param_types.get(index) else {
                        continue;
                    };
                    let param_var = self.system.variable_for_parameter(
                        &callee.key,
                        index,
                        param_ty,
                        external,
                    );
                    self.system
                        .add_constraint(arg_var, param_var, ConstraintOp::subtype());
                }
                // A call expression *is* its callee's return slot.
                self.system
                    .variable_for_return(&callee.key, &callee.return_type, external)
            }
            ExprKind::New { args } => {
                for arg in args {
                    self.collect_expr(cx, *arg, declared);
                }
                // Allocation expressions have exactly their written type.
                self.system.new_fixed_variable(
                    VarKind::Expression {
                        file: cx.file,
                        span: data.span,
                    },
                    data.ty.clone(),
                )
            }
            ExprKind::Cast { operand } => {
                let operand_var = self.collect_expr(cx, *operand, declared);
                let operand_ty = cx.body.expr(*operand).ty.clone();
                let cast_var = self.system.new_variable(
                    VarKind::Type {
                        file: cx.file,
                        span: data.span,
                    },
                    Some(data.ty.clone()),
                );
                // Only an upcast ties the operand to the cast: a downcast is
                // an explicit conversion and induces no subtype obligation.
                if is_subtype(self.env, &operand_ty, &data.ty) {
                    self.system
                        .add_constraint(operand_var, cast_var, ConstraintOp::subtype());
                }
                cast_var
            }
            ExprKind::Literal => self.system.new_fixed_variable(
                VarKind::Expression {
                    file: cx.file,
                    span: data.span,
                },
                data.ty.clone(),
            ),
        };
        cx.expr_vars.insert(id, var);
        var
    }

    fn local_var(&mut self, cx: &mut BodyCx<'_>, local: LocalId) -> VarId {
        if let Some(var) = cx.local_vars.get(&local) {
            return *var;
        }
        let data = cx.body.local(local);
        let key = BindingKey::new(format!("{}#{}", cx.method.key.as_str(), data.name));
        let var = self.system.variable_for_binding(&key, &data.ty);
        self.system.set_unit(var, cx.file);
        cx.local_vars.insert(local, var);
        var
    }
}

fn gather_declared_methods(decl: &TypeDecl, out: &mut HashSet<BindingKey>) {
    for method in &decl.methods {
        out.insert(method.key.clone());
    }
    for nested in &decl.nested {
        gather_declared_methods(nested, out);
    }
}

struct BodyCx<'a> {
    file: FileId,
    method: &'a MethodDecl,
    body: &'a Body,
    expr_vars: HashMap<ExprId, VarId>,
    local_vars: HashMap<LocalId, VarId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rejig_core::Span;
    use rejig_hir::{FieldDecl, MethodRef, ParamDecl, TypeDeclKind};
    use rejig_jdk::JdkIndex;
    use rejig_types::Type;

    fn span() -> Span {
        Span::new(0, 0)
    }

    /// class C {
    ///   String f;
    ///   void m(String p) { String s = p; f = s; log(s); }
    /// }
    /// `log` is external: `void log(CharSequence)`.
    fn sample_unit(jdk: &JdkIndex) -> CompilationUnit {
        let string = Type::class(jdk.lookup_class("java.lang.String").unwrap(), vec![]);
        let char_seq = Type::class(jdk.lookup_class("java.lang.CharSequence").unwrap(), vec![]);

        let mut method = MethodDecl::new("m", BindingKey::new("C#m(String)"), Type::Void, span());
        method.params.push(ParamDecl::new("p", string.clone()));

        let mut body = Body::new();
        let s = body.add_local("s", string.clone());
        let p_ref = body.add_expr(ExprKind::Param(0), string.clone(), span());
        let decl = body.add_stmt(
            StmtKind::Local {
                local: s,
                init: Some(p_ref),
            },
            span(),
        );

        let f_ref = body.add_expr(
            ExprKind::Field(rejig_hir::FieldRef {
                key: BindingKey::new("C#f"),
                ty: string.clone(),
            }),
            string.clone(),
            span(),
        );
        let s_ref = body.add_expr(ExprKind::Local(s), string.clone(), span());
        let assign = body.add_stmt(
            StmtKind::Assign {
                lhs: f_ref,
                rhs: s_ref,
            },
            span(),
        );

        let s_ref2 = body.add_expr(ExprKind::Local(s), string.clone(), span());
        let call = body.add_expr(
            ExprKind::Call {
                receiver: None,
                method: MethodRef {
                    key: BindingKey::new("Log#log(CharSequence)"),
                    param_types: vec![char_seq],
                    return_type: Type::Void,
                },
                args: vec![s_ref2],
            },
            Type::Void,
            span(),
        );
        let call_stmt = body.add_stmt(StmtKind::Expr(call), span());

        body.push_root(decl);
        body.push_root(assign);
        body.push_root(call_stmt);
        method.body = Some(body);

        let mut class = TypeDecl::new("C", TypeDeclKind::Class, span());
        class.fields.push(FieldDecl {
            name: "f".into(),
            key: BindingKey::new("C#f"),
            ty: string,
            is_static: false,
            span: span(),
        });
        class.methods.push(method);

        let mut unit = CompilationUnit::new(FileId::new(0), "", None);
        unit.types.push(class);
        unit
    }

    #[test]
    fn emits_declaration_assignment_and_argument_edges() {
        let jdk = JdkIndex::new();
        let unit = sample_unit(&jdk);
        let mut collector = ConstraintCollector::new(&jdk);
        collector.collect_unit(&unit);
        let system = collector.finish();

        let method_key = BindingKey::new("C#m(String)");
        let local_key = BindingKey::new("C#m(String)#s");
        let p = system.parameter_variable(&method_key, 0).unwrap();
        let s = system.binding_variable(&local_key).unwrap();
        let f = system.binding_variable(&BindingKey::new("C#f")).unwrap();
        let log_p = system
            .parameter_variable(&BindingKey::new("Log#log(CharSequence)"), 0)
            .unwrap();

        let edges: Vec<(VarId, VarId)> = system
            .constraints()
            .iter()
            .map(|c| (c.left, c.right))
            .collect();
        assert_eq!(edges, vec![(p, s), (s, f), (s, log_p)]);

        // The external callee's slot is fixed; the unit's own are not.
        assert!(system.var(log_p).is_fixed());
        assert!(!system.var(p).is_fixed());
    }

    #[test]
    fn upcast_ties_operand_to_cast_but_downcast_does_not() {
        let jdk = JdkIndex::new();
        let string = Type::class(jdk.lookup_class("java.lang.String").unwrap(), vec![]);
        let char_seq = Type::class(jdk.lookup_class("java.lang.CharSequence").unwrap(), vec![]);

        let build = |operand_ty: Type, cast_ty: Type| {
            let mut method =
                MethodDecl::new("m", BindingKey::new("C#m()"), Type::Void, span());
            let mut body = Body::new();
            let v = body.add_local("v", operand_ty.clone());
            let v_ref = body.add_expr(ExprKind::Local(v), operand_ty, span());
            let cast = body.add_expr(ExprKind::Cast { operand: v_ref }, cast_ty.clone(), span());
            let target = body.add_local("t", cast_ty);
            let stmt = body.add_stmt(
                StmtKind::Local {
                    local: target,
                    init: Some(cast),
                },
                span(),
            );
            body.push_root(stmt);
            method.body = Some(body);

            let mut class = TypeDecl::new("C", TypeDeclKind::Class, span());
            class.methods.push(method);
            let mut unit = CompilationUnit::new(FileId::new(0), "", None);
            unit.types.push(class);

            let mut collector = ConstraintCollector::new(&jdk);
            collector.collect_unit(&unit);
            collector.finish()
        };

        // Upcast String -> CharSequence: operand constrained below the cast.
        let up = build(string.clone(), char_seq.clone());
        assert_eq!(up.constraints().len(), 2);

        // Downcast CharSequence -> String: only the declaration edge remains.
        let down = build(char_seq, string);
        assert_eq!(down.constraints().len(), 1);
    }
}
