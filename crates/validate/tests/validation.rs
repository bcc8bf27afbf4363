use pretty_assertions::assert_eq;
use std::io::Write;
use wiring_graph::GraphForest;
use wiring_lang::{
    names, Annotation, AnnotationValue, DeclBuilder, DeclarationSet, FieldDecl, FunctionDecl,
    ParamDecl, TypeDecl, TypeRef,
};
use wiring_model::{ModelContext, Severity};
use wiring_validate::{
    validate, validate_into, validate_roots, Diagnostic, ValidateError, ValidationOptions,
    ValidationReport,
};

fn ty(name: &str) -> TypeRef {
    TypeRef::named(name)
}

fn context(decls: Vec<TypeDecl>) -> ModelContext {
    let _ = env_logger::builder().is_test(true).try_init();
    ModelContext::new(DeclarationSet::from_decls(decls).unwrap())
}

fn run(decls: Vec<TypeDecl>, options: &ValidationOptions) -> ValidationReport {
    let cx = context(decls);
    let forest = GraphForest::build_with(&cx, options.forest_options());
    validate(&forest, options)
}

fn run_default(decls: Vec<TypeDecl>) -> ValidationReport {
    run(decls, &ValidationOptions::default())
}

fn component(name: &str, modules: &[&str]) -> DeclBuilder {
    DeclBuilder::interface(name).annotated(
        Annotation::new(names::COMPONENT)
            .with("modules", AnnotationValue::types(modules.iter().map(|m| ty(m)))),
    )
}

fn module(name: &str) -> DeclBuilder {
    DeclBuilder::interface(name).marker(names::MODULE)
}

fn injectable(name: &str, params: Vec<ParamDecl>) -> TypeDecl {
    DeclBuilder::class(name).inject_constructor(params).build()
}

fn param(name: &str, ty: TypeRef) -> ParamDecl {
    ParamDecl::new(name, ty)
}

fn provides(name: &str, returns: TypeRef) -> FunctionDecl {
    FunctionDecl::new(name, returns)
        .annotated(Annotation::new(names::PROVIDES))
        .static_()
}

fn messages(diagnostics: Vec<&Diagnostic>) -> Vec<String> {
    diagnostics.into_iter().map(|d| d.message.clone()).collect()
}

#[test]
fn dependency_cycle_is_reported_once() {
    let report = run_default(vec![
        component("Root", &[])
            .abstract_method("a", ty("ClassA"))
            .abstract_method("b", ty("ClassB"))
            .build(),
        injectable("ClassA", vec![param("b", ty("ClassB"))]),
        injectable("ClassB", vec![param("a", ty("ClassA"))]),
    ]);

    assert_eq!(
        messages(report.errors()),
        vec!["dependency loop: ClassA -> ClassB -> ClassA"]
    );
    assert_eq!(report.diagnostics.len(), 1);
}

#[test]
fn missing_binding_lists_every_encounter_path() {
    let report = run_default(vec![component("Root", &[])
        .abstract_method("one", ty("Any"))
        .abstract_method("two", ty("Any"))
        .abstract_method("three", ty("Any"))
        .build()]);

    let errors = report.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "missing binding for Any");
    assert_eq!(errors[0].notes, vec!["Any is not declared"]);
    assert_eq!(
        errors[0].encounter_paths,
        vec![
            vec!["Root", "entry-point one: Any", "Any"],
            vec!["Root", "entry-point two: Any", "Any"],
            vec!["Root", "entry-point three: Any", "Any"],
        ]
    );
}

#[test]
fn encounter_paths_are_capped() {
    let options = ValidationOptions {
        max_issue_encounter_paths: 2,
        ..Default::default()
    };
    let report = run(
        vec![component("Root", &[])
            .abstract_method("one", ty("Any"))
            .abstract_method("two", ty("Any"))
            .abstract_method("three", ty("Any"))
            .build()],
        &options,
    );

    let errors = report.errors();
    assert_eq!(errors[0].encounter_paths.len(), 2);
    assert!(errors[0]
        .notes
        .contains(&"1 more encounter path(s) not shown".to_string()));
}

#[test]
fn missing_dependency_deep_in_the_graph_is_traced() {
    let report = run_default(vec![
        component("Root", &[]).abstract_method("service", ty("Service")).build(),
        injectable("Service", vec![param("repo", ty("Repository"))]),
        DeclBuilder::interface("Repository").build(),
    ]);

    let errors = report.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "missing binding for Repository");
    assert_eq!(
        errors[0].notes,
        vec!["Repository has no @Inject constructor and no module binds it"]
    );
    assert_eq!(errors[0].encounter_paths[0].len(), 4);
}

#[test]
fn never_condition_exclusion_is_only_a_warning() {
    let report = run_default(vec![
        DeclBuilder::object("Flags")
            .field(FieldDecl::new("a", ty(names::BOOLEAN)))
            .build(),
        DeclBuilder::class("Impossible")
            .annotated(
                Annotation::new(names::CONDITION_EXPRESSION)
                    .with("value", AnnotationValue::str("Flags.a && !Flags.a"))
                    .with("imports", AnnotationValue::types([ty("Flags")])),
            )
            .build(),
        component("Root", &["ApiModule"]).build(),
        module("ApiModule")
            .method(provides("api", ty("Api")).annotated(
                Annotation::new(names::CONDITIONAL)
                    .with("value", AnnotationValue::types([ty("Impossible")])),
            ))
            .build(),
    ]);

    assert!(!report.has_errors(), "{report}");
    let warnings = report.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert!(warnings[0].message.contains("can never be satisfied"));
}

#[test]
fn alias_loop_is_a_self_dependent_binding() {
    let binds = |name: &str, from: &str, to: &str| {
        FunctionDecl::new(name, ty(to))
            .param("source", ty(from))
            .annotated(Annotation::new(names::BINDS))
            .abstract_()
    };
    let report = run_default(vec![
        component("Root", &["Aliases"]).abstract_method("a", ty("A")).build(),
        module("Aliases")
            .method(binds("a", "B", "A"))
            .method(binds("b", "A", "B"))
            .build(),
        DeclBuilder::interface("A").extends(ty("B")).build(),
        DeclBuilder::interface("B").extends(ty("A")).build(),
    ]);

    assert_eq!(
        messages(report.errors()),
        vec!["self-dependent binding: A -> B -> A"]
    );
}

#[test]
fn provision_depending_on_itself_is_self_dependent() {
    let report = run_default(vec![
        component("Root", &["Loop"]).abstract_method("api", ty("Api")).build(),
        module("Loop")
            .method(provides("api", ty("Api")).param("api", ty("Api")))
            .build(),
    ]);

    assert_eq!(messages(report.errors()), vec!["self-dependent binding: Api -> Api"]);
}

#[test]
fn lazy_edges_break_loops() {
    let report = run_default(vec![
        component("Root", &[]).abstract_method("a", ty("ClassA")).build(),
        injectable(
            "ClassA",
            vec![param("b", TypeRef::generic(names::LAZY, vec![ty("ClassB")]))],
        ),
        injectable("ClassB", vec![param("a", ty("ClassA"))]),
    ]);

    assert!(report.is_empty(), "{report}");
}

#[test]
fn conditional_dependency_must_be_implied_by_its_requester() {
    let report = run_default(vec![
        DeclBuilder::object("Flags")
            .field(FieldDecl::new("a", ty(names::BOOLEAN)))
            .build(),
        DeclBuilder::class("FeatureA")
            .annotated(
                Annotation::new(names::CONDITION)
                    .with("value", AnnotationValue::Type(ty("Flags")))
                    .with("condition", AnnotationValue::str("a")),
            )
            .build(),
        component("Root", &["ApiModule"])
            .abstract_method("api", ty("Api"))
            .abstract_method(
                "maybeApi",
                TypeRef::generic(names::OPTIONAL, vec![ty("Api")]),
            )
            .build(),
        module("ApiModule")
            .method(provides("api", ty("Api")).annotated(
                Annotation::new(names::CONDITIONAL)
                    .with("value", AnnotationValue::types([ty("FeatureA")])),
            ))
            .build(),
    ]);

    let errors = report.errors();
    assert_eq!(errors.len(), 1, "{report}");
    assert!(errors[0].message.starts_with("Api is required under"));
    assert!(errors[0].message.ends_with("only present under Flags.a"));
    assert_eq!(errors[0].encounter_paths, vec![vec!["Root", "entry-point api: Api"]]);
}

#[test]
fn creator_must_supply_dependencies_and_modules() {
    let report = run_default(vec![
        DeclBuilder::interface("Root")
            .annotated(
                Annotation::new(names::COMPONENT)
                    .with("modules", AnnotationValue::types([ty("NetModule")]))
                    .with("dependencies", AnnotationValue::types([ty("Db")])),
            )
            .nested("Root.Builder")
            .build(),
        DeclBuilder::interface("Root.Builder")
            .marker(names::COMPONENT_BUILDER)
            .method(
                FunctionDecl::new("create", ty("Root"))
                    .param("extra", ty("Unrelated"))
                    .abstract_(),
            )
            .build(),
        DeclBuilder::interface("Db")
            .abstract_method("url", ty("String"))
            .build(),
        DeclBuilder::class("NetModule")
            .marker(names::MODULE)
            .constructor(FunctionDecl::new("NetModule", TypeRef::Void).param("url", ty("String")))
            .method(FunctionDecl::new("client", ty("Client")).annotated(Annotation::new(names::PROVIDES)))
            .build(),
    ]);

    let errors = messages(report.errors());
    for expected in [
        "creator Root.Builder does not supply component dependency Db",
        "creator Root.Builder does not supply module NetModule, which cannot be constructed",
        "creator input extra: Unrelated of Root.Builder is not a module or a component dependency and is not marked @BindsInstance",
    ] {
        assert!(errors.iter().any(|e| e == expected), "missing {expected:?} in {errors:#?}");
    }
}

#[test]
fn child_component_without_creator_is_an_error() {
    let report = run_default(vec![
        component("Root", &["RootModule"]).build(),
        DeclBuilder::interface("RootModule")
            .annotated(
                Annotation::new(names::MODULE)
                    .with("subcomponents", AnnotationValue::types([ty("Child")])),
            )
            .build(),
        DeclBuilder::interface("Child")
            .annotated(Annotation::new(names::COMPONENT).with("isRoot", AnnotationValue::Bool(false)))
            .build(),
    ]);

    assert_eq!(messages(report.errors()), vec!["child component Child has no creator"]);
}

#[test]
fn unused_instance_is_a_mandatory_warning_escalated_in_strict_mode() {
    let decls = || {
        vec![
            component("Root", &[]).nested("Root.Builder").build(),
            DeclBuilder::interface("Root.Builder")
                .marker(names::COMPONENT_BUILDER)
                .method(
                    FunctionDecl::new("create", ty("Root"))
                        .param_with(
                            param("name", ty("String"))
                                .annotated(Annotation::new(names::BINDS_INSTANCE)),
                        )
                        .abstract_(),
                )
                .build(),
        ]
    };

    let lenient = run_default(decls());
    assert!(!lenient.has_errors(), "{lenient}");
    let warnings = lenient.warnings();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::MandatoryWarning);
    assert_eq!(warnings[0].message, "@BindsInstance input name of Root is never used");

    let strict = ValidationOptions {
        strict_mode: true,
        ..Default::default()
    };
    let report = run(decls(), &strict);
    assert_eq!(
        messages(report.errors()),
        vec!["@BindsInstance input name of Root is never used"]
    );
}

#[test]
fn explicit_scope_must_be_declared_by_the_component() {
    let report = run_default(vec![
        DeclBuilder::annotation_class("Singleton").marker(names::SCOPE).build(),
        component("Root", &["DbModule"]).abstract_method("db", ty("Db")).build(),
        module("DbModule")
            .method(provides("db", ty("Db")).annotated(Annotation::new("Singleton")))
            .build(),
    ]);

    let errors = messages(report.errors());
    assert_eq!(errors.len(), 1);
    assert!(errors[0].ends_with("is scoped with @Singleton, which Root does not declare"));
}

#[test]
fn duplicate_map_keys_are_rejected() {
    let key = || Annotation::new("StringKey").with("value", AnnotationValue::str("main"));
    let handler = |name: &str| {
        provides(name, ty("Handler"))
            .annotated(Annotation::new(names::INTO_MAP))
            .annotated(key())
    };
    let report = run_default(vec![
        DeclBuilder::annotation_class("StringKey")
            .marker(names::INTO_MAP_KEY)
            .method(FunctionDecl::new("value", ty("String")))
            .build(),
        component("Root", &["Handlers"])
            .abstract_method(
                "handlers",
                TypeRef::generic(names::MAP, vec![ty("String"), ty("Handler")]),
            )
            .build(),
        module("Handlers")
            .method(handler("first"))
            .method(handler("second"))
            .build(),
    ]);

    let errors = messages(report.errors());
    assert_eq!(errors.len(), 1, "{errors:#?}");
    assert!(errors[0].starts_with("duplicate key @StringKey"));
    assert!(errors[0].ends_with("Handlers::first and Handlers::second"));
}

#[test]
fn raw_sink_receives_ungrouped_diagnostics() {
    let cx = context(vec![component("Root", &[])
        .abstract_method("one", ty("Any"))
        .build()]);
    let forest = GraphForest::build(&cx);
    let mut sink: Vec<Diagnostic> = Vec::new();
    validate_into(&forest, &ValidationOptions::default(), &mut sink);

    assert_eq!(sink.len(), 1);
    assert!(sink[0].is_error());
}

#[test]
fn options_load_from_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "strict_mode = true\nmax_issue_encounter_paths = 2").unwrap();

    let options = ValidationOptions::load(file.path()).unwrap();
    assert!(options.strict_mode);
    assert_eq!(options.max_issue_encounter_paths, 2);
    assert!(options.order_lists_by_default);
}

#[test]
fn validating_selected_roots_rejects_child_components() {
    let cx = context(vec![
        component("Root", &[]).abstract_method("one", ty("Any")).build(),
        DeclBuilder::interface("Child")
            .annotated(Annotation::new(names::COMPONENT).with("isRoot", AnnotationValue::Bool(false)))
            .build(),
    ]);
    let options = ValidationOptions::default();

    let report = validate_roots(&cx, &[ty("Root")], &options).unwrap();
    assert_eq!(messages(report.errors()), vec!["missing binding for Any"]);

    let err = validate_roots(&cx, &[ty("Child")], &options).unwrap_err();
    assert!(matches!(err, ValidateError::Graph(_)), "{err}");

    let invalid = ValidationOptions {
        max_issue_encounter_paths: 0,
        ..Default::default()
    };
    assert!(matches!(
        validate_roots(&cx, &[ty("Root")], &invalid),
        Err(ValidateError::InvalidOptions(_))
    ));
}

#[test]
fn keyless_map_contribution_is_not_a_plain_binding() {
    let keyless = || provides("keyless", ty("Handler")).annotated(Annotation::new(names::INTO_MAP));

    let report = run_default(vec![
        component("Root", &["Handlers"]).abstract_method("handler", ty("Handler")).build(),
        module("Handlers")
            .method(keyless())
            .method(provides("plain", ty("Handler")))
            .build(),
    ]);
    assert_eq!(
        messages(report.errors()),
        vec!["map contribution Handlers::keyless needs exactly one map key annotation, found 0"]
    );

    let report = run_default(vec![
        component("Root", &["Handlers"]).abstract_method("handler", ty("Handler")).build(),
        module("Handlers").method(keyless()).build(),
    ]);
    assert_eq!(
        messages(report.errors()),
        vec![
            "map contribution Handlers::keyless needs exactly one map key annotation, found 0",
            "missing binding for Handler",
        ]
    );
}
