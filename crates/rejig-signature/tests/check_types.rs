//! End-to-end semantic checks: stub context + two-round resolution.

use pretty_assertions::assert_eq;
use rejig_core::{CancellationToken, FileId, PackageName, SourceLevel};
use rejig_hir::CompilationUnit;
use rejig_resolve::{ImportMap, OnDemandImport, SingleTypeImport};
use rejig_signature::{
    MethodContext, SlotError, StubTypeContext, TypeContextChecker, TypeSlot,
};
use rejig_jdk::JdkIndex;
use rejig_types::{Type, TypeEnv};

fn widget_index() -> JdkIndex {
    let mut jdk = JdkIndex::new();
    jdk.add_project_type("p.a", "Widget", None);
    jdk.add_project_type("p.b", "Widget", None);
    jdk
}

fn context(package: &str, imports: ImportMap) -> MethodContext {
    MethodContext {
        package: Some(PackageName::from_dotted(package)),
        imports,
        type_params: Vec::new(),
        is_static: false,
        method_type_params: Vec::new(),
    }
}

fn empty_stub() -> StubTypeContext {
    let unit = CompilationUnit::new(FileId::new(0), "", None);
    StubTypeContext::create(&unit, 0)
}

fn stars(packages: &[&str]) -> ImportMap {
    ImportMap {
        single: Vec::new(),
        on_demand: packages
            .iter()
            .map(|p| OnDemandImport {
                package: PackageName::from_dotted(p),
            })
            .collect(),
    }
}

#[test]
fn ambiguous_simple_name_reports_candidate_count() {
    let jdk = widget_index();
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    let ctx = context("p", stars(&["p.a", "p.b"]));
    let cancel = CancellationToken::new();

    let results = checker
        .check_and_resolve_method_types(
            &ctx,
            &empty_stub(),
            &[TypeSlot::parameter("Widget"), TypeSlot::return_type("void")],
            &cancel,
        )
        .unwrap();

    assert_eq!(
        results[0],
        Err(SlotError::Ambiguous {
            type_text: "Widget".to_string(),
            candidates: 2,
        })
    );
    // The return slot is untouched by its neighbor's failure.
    let ret = results[1].as_ref().unwrap();
    assert_eq!(ret.resolved, Type::Void);
}

#[test]
fn qualified_name_resolves_despite_ambiguous_siblings() {
    let jdk = widget_index();
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    let ctx = context("p", stars(&["p.a", "p.b"]));
    let cancel = CancellationToken::new();

    let results = checker
        .check_and_resolve_method_types(
            &ctx,
            &empty_stub(),
            &[TypeSlot::parameter("p.a.Widget")],
            &cancel,
        )
        .unwrap();

    let ok = results[0].as_ref().unwrap();
    assert_eq!(ok.qualified_text, "p.a.Widget");
    assert_eq!(
        ok.resolved,
        Type::class(jdk.lookup_class("p.a.Widget").unwrap(), vec![])
    );
}

#[test]
fn unique_candidate_is_silently_qualified() {
    let mut jdk = JdkIndex::new();
    jdk.add_project_type("p.a", "Widget", None);
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    // No imports: the first round cannot see Widget at all.
    let ctx = context("q", ImportMap::default());
    let cancel = CancellationToken::new();

    let results = checker
        .check_and_resolve_method_types(
            &ctx,
            &empty_stub(),
            &[TypeSlot::parameter("Widget")],
            &cancel,
        )
        .unwrap();

    let ok = results[0].as_ref().unwrap();
    assert_eq!(ok.qualified_text, "p.a.Widget");
    assert_eq!(
        ok.resolved,
        Type::class(jdk.lookup_class("p.a.Widget").unwrap(), vec![])
    );
}

#[test]
fn unknown_names_are_not_found() {
    let jdk = widget_index();
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    let ctx = context("p", ImportMap::default());
    let cancel = CancellationToken::new();

    let results = checker
        .check_and_resolve_method_types(&ctx, &empty_stub(), &[TypeSlot::parameter("Wdgt")], &cancel)
        .unwrap();

    assert_eq!(
        results[0],
        Err(SlotError::NotFound {
            type_text: "Wdgt".to_string(),
        })
    );
}

#[test]
fn slots_fail_and_resolve_independently() {
    let jdk = widget_index();
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    let ctx = context("p", ImportMap::default());
    let cancel = CancellationToken::new();

    let results = checker
        .check_and_resolve_method_types(
            &ctx,
            &empty_stub(),
            &[
                TypeSlot::parameter("int"),
                TypeSlot::parameter("Bogus<"),
                TypeSlot::parameter("String"),
                TypeSlot::return_type("List<String>"),
            ],
            &cancel,
        )
        .unwrap();

    assert_eq!(results[0].as_ref().unwrap().qualified_text, "int");
    assert!(matches!(results[1], Err(SlotError::SyntaxInvalid { .. })));
    assert_eq!(
        results[2].as_ref().unwrap().qualified_text,
        "java.lang.String"
    );
    // `List` is not in scope without an import; the second round finds the
    // unique java.util.List and qualifies the argument too.
    assert_eq!(
        results[3].as_ref().unwrap().qualified_text,
        "java.util.List<java.lang.String>"
    );
}

#[test]
fn in_scope_type_variables_win() {
    let jdk = widget_index();
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    let mut ctx = context("p", ImportMap::default());
    ctx.type_params.push("T".into());
    let cancel = CancellationToken::new();

    let results = checker
        .check_and_resolve_method_types(&ctx, &empty_stub(), &[TypeSlot::parameter("T")], &cancel)
        .unwrap();

    let ok = results[0].as_ref().unwrap();
    assert_eq!(ok.resolved, Type::TypeVar("T".into()));
    assert_eq!(ok.qualified_text, "T");
}

#[test]
fn wrong_generic_arity_stays_unresolved() {
    let jdk = widget_index();
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    let ctx = context(
        "p",
        ImportMap {
            single: vec![SingleTypeImport::from_dotted("java.util.List")],
            on_demand: Vec::new(),
        },
    );
    let cancel = CancellationToken::new();

    let results = checker
        .check_and_resolve_method_types(
            &ctx,
            &empty_stub(),
            &[TypeSlot::parameter("List<String, Integer>")],
            &cancel,
        )
        .unwrap();

    // The name resolves, but the binding is generic yet neither raw nor
    // parameterized; the retry cannot fix the arity, so the slot fails.
    assert!(matches!(results[0], Err(SlotError::NotFound { .. })));
}

#[test]
fn cancellation_interrupts_resolution() {
    let jdk = widget_index();
    let checker = TypeContextChecker::new(&jdk, &jdk, SourceLevel::JAVA_5);
    let ctx = context("p", ImportMap::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = checker.check_and_resolve_method_types(
        &ctx,
        &empty_stub(),
        &[TypeSlot::parameter("int")],
        &cancel,
    );
    assert!(result.is_err());
}
