//! End-to-end: collect a unit's constraints, then answer re-typing
//! questions by pinning slots and solving.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use rejig_constraints::{solve, ConstraintCollector, Solution, SolverOptions};
use rejig_core::{CancellationToken, FileId, Span};
use rejig_hir::{
    BindingKey, Body, CompilationUnit, ExprKind, MethodDecl, MethodRef, ParamDecl, StmtKind,
    TypeDecl, TypeDeclKind,
};
use rejig_jdk::JdkIndex;
use rejig_types::{Type, TypeEnv};

fn span() -> Span {
    Span::new(0, 0)
}

fn ty(jdk: &JdkIndex, name: &str) -> Type {
    Type::class(jdk.lookup_class(name).unwrap(), vec![])
}

/// class C {
///   String greet(String name) {
///     String copy = name;
///     sink(copy);            // external: void sink(CharSequence)
///     return copy;
///   }
/// }
fn greet_unit(jdk: &JdkIndex) -> CompilationUnit {
    let string = ty(jdk, "java.lang.String");
    let char_seq = ty(jdk, "java.lang.CharSequence");

    let mut method = MethodDecl::new(
        "greet",
        BindingKey::new("C#greet(String)"),
        string.clone(),
        span(),
    );
    method.params.push(ParamDecl::new("name", string.clone()));

    let mut body = Body::new();
    let copy = body.add_local("copy", string.clone());
    let name_ref = body.add_expr(ExprKind::Param(0), string.clone(), span());
    let decl = body.add_stmt(
        StmtKind::Local {
            local: copy,
            init: Some(name_ref),
        },
        span(),
    );

    let copy_ref = body.add_expr(ExprKind::Local(copy), string.clone(), span());
    let sink = body.add_expr(
        ExprKind::Call {
            receiver: None,
            method: MethodRef {
                key: BindingKey::new("Sink#sink(CharSequence)"),
                param_types: vec![char_seq],
                return_type: Type::Void,
            },
            args: vec![copy_ref],
        },
        Type::Void,
        span(),
    );
    let sink_stmt = body.add_stmt(StmtKind::Expr(sink), span());

    let copy_ref2 = body.add_expr(ExprKind::Local(copy), string.clone(), span());
    let ret = body.add_stmt(StmtKind::Return(Some(copy_ref2)), span());

    body.push_root(decl);
    body.push_root(sink_stmt);
    body.push_root(ret);
    method.body = Some(body);

    let mut class = TypeDecl::new("C", TypeDeclKind::Class, span());
    class.methods.push(method);
    let mut unit = CompilationUnit::new(FileId::new(0), "", None);
    unit.types.push(class);
    unit
}

#[test]
fn parameter_can_generalize_up_to_the_external_cap() {
    let jdk = JdkIndex::new();
    let unit = greet_unit(&jdk);
    let mut collector = ConstraintCollector::new(&jdk);
    collector.collect_unit(&unit);
    let system = collector.finish();

    let method_key = BindingKey::new("C#greet(String)");
    let param = system.parameter_variable(&method_key, 0).unwrap();
    let local = system
        .binding_variable(&BindingKey::new("C#greet(String)#copy"))
        .unwrap();
    let cancel = CancellationToken::new();

    // Unpinned: the local may widen to CharSequence (the external sink's
    // cap) but not beyond; its declared type stays the closest choice.
    let solution = solve(&system, &jdk, &SolverOptions::default(), &cancel).unwrap();
    let assignments = solution.assignments().expect("satisfiable");
    assert_eq!(
        assignments.admissible(local).unwrap(),
        &[ty(&jdk, "java.lang.String"), ty(&jdk, "java.lang.CharSequence")]
    );
    assert_eq!(assignments.chosen(local), Some(&ty(&jdk, "java.lang.String")));

    // Pinning the parameter to CharSequence: the return slot and the local
    // can still absorb it, so the plan is type-safe.
    let ok = solve(
        &system,
        &jdk,
        &SolverOptions {
            pinned: HashMap::from([(param, ty(&jdk, "java.lang.CharSequence"))]),
            ..Default::default()
        },
        &cancel,
    )
    .unwrap();
    assert!(ok.is_satisfiable());

    // Pinning it to Integer cannot work: the parameter flows through the
    // local into the CharSequence sink, and no supertype of Integer sits
    // below CharSequence.
    let bad = solve(
        &system,
        &jdk,
        &SolverOptions {
            pinned: HashMap::from([(param, ty(&jdk, "java.lang.Integer"))]),
            ..Default::default()
        },
        &cancel,
    )
    .unwrap();
    let Solution::Unsatisfiable(conflict) = bad else {
        panic!("expected a conflict");
    };
    assert!(!conflict.constraints.is_empty());
}
