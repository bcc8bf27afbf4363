use pretty_assertions::assert_eq;
use wiring_graph::{BindingKind, ForestOptions, GraphForest};
use wiring_lang::{
    names, Annotation, AnnotationValue, DeclBuilder, DeclarationSet, FieldDecl, FunctionDecl,
    ParamDecl, TypeDecl, TypeRef,
};
use wiring_model::{ClassBacked, ModelContext, Severity};

fn ty(name: &str) -> TypeRef {
    TypeRef::named(name)
}

fn list_of(name: &str) -> TypeRef {
    TypeRef::generic(names::LIST, vec![ty(name)])
}

fn context(decls: Vec<TypeDecl>) -> ModelContext {
    let _ = env_logger::builder().is_test(true).try_init();
    ModelContext::new(DeclarationSet::from_decls(decls).unwrap())
}

fn component(name: &str, modules: &[&str]) -> DeclBuilder {
    DeclBuilder::interface(name).annotated(
        Annotation::new(names::COMPONENT)
            .with("modules", AnnotationValue::types(modules.iter().map(|m| ty(m)))),
    )
}

fn child_component(name: &str, modules: &[&str]) -> DeclBuilder {
    DeclBuilder::interface(name).annotated(
        Annotation::new(names::COMPONENT)
            .with("isRoot", AnnotationValue::Bool(false))
            .with("modules", AnnotationValue::types(modules.iter().map(|m| ty(m)))),
    )
}

fn module(name: &str) -> DeclBuilder {
    DeclBuilder::interface(name).marker(names::MODULE)
}

fn installing(name: &str, children: &[&str]) -> DeclBuilder {
    DeclBuilder::interface(name).annotated(
        Annotation::new(names::MODULE)
            .with("subcomponents", AnnotationValue::types(children.iter().map(|c| ty(c)))),
    )
}

fn injectable(name: &str, deps: &[&str]) -> DeclBuilder {
    DeclBuilder::class(name).inject_constructor(
        deps.iter()
            .map(|d| ParamDecl::new(d.to_lowercase(), ty(d)))
            .collect(),
    )
}

fn provides(name: &str, returns: &str) -> FunctionDecl {
    FunctionDecl::new(name, ty(returns))
        .annotated(Annotation::new(names::PROVIDES))
        .static_()
}

fn into_list(name: &str, source: &str) -> FunctionDecl {
    FunctionDecl::new(name, ty("Base"))
        .param("impl", ty(source))
        .annotated(Annotation::new(names::BINDS))
        .annotated(Annotation::new(names::INTO_LIST))
        .abstract_()
}

fn plugins_pack(declare_list: Option<Annotation>) -> Vec<TypeDecl> {
    let mut list_module = module("ListModule")
        .method(into_list("a", "ClassA"))
        .method(into_list("b", "ClassB"))
        .method(into_list("c", "ClassC"));
    if let Some(annotation) = declare_list {
        list_module = list_module.method(
            FunctionDecl::new("bases", list_of("Base"))
                .annotated(annotation)
                .abstract_(),
        );
    }
    vec![
        component("Root", &["ListModule"])
            .abstract_method("bases", list_of("Base"))
            .build(),
        list_module.build(),
        DeclBuilder::interface("Base").build(),
        injectable("ClassA", &["ClassB"]).extends(ty("Base")).build(),
        injectable("ClassB", &[]).extends(ty("Base")).build(),
        injectable("ClassC", &["ClassA"]).extends(ty("Base")).build(),
    ]
}

fn element_order(forest: &GraphForest<'_>, cx: &ModelContext) -> Vec<String> {
    let root = forest.roots()[0];
    let list = cx.node(&list_of("Base"), None);
    let id = forest.resolve(root, &list).expect("list is multi-bound");
    let binding = forest.binding(id);
    let BindingKind::Multi(multi) = &binding.kind else {
        panic!("expected a multi-binding, got {binding}");
    };
    forest
        .contribution_order(id)
        .ordered
        .iter()
        .map(|&i| multi.contributions[i].anchor().unwrap().ty().simple_name().to_string())
        .collect()
}

#[test]
fn list_elements_follow_their_dependencies() {
    let cx = context(plugins_pack(None));
    let forest = GraphForest::build(&cx);

    assert_eq!(element_order(&forest, &cx), vec!["ClassB", "ClassA", "ClassC"]);
}

#[test]
fn unordered_list_keeps_declaration_order() {
    let declare = Annotation::new(names::DECLARE_LIST).with("orderDependent", AnnotationValue::Bool(false));
    let cx = context(plugins_pack(Some(declare)));
    let forest = GraphForest::build(&cx);

    assert_eq!(element_order(&forest, &cx), vec!["ClassA", "ClassB", "ClassC"]);
}

#[test]
fn default_list_ordering_can_be_disabled() {
    let cx = context(plugins_pack(None));
    let options = ForestOptions {
        order_lists_by_default: false,
    };
    let forest = GraphForest::build_with(&cx, options);

    assert_eq!(element_order(&forest, &cx), vec!["ClassA", "ClassB", "ClassC"]);
}

#[test]
fn mutually_dependent_elements_report_a_cycle() {
    let cx = context(vec![
        component("Root", &["ListModule"]).build(),
        module("ListModule")
            .method(into_list("a", "ClassA"))
            .method(into_list("b", "ClassB"))
            .build(),
        DeclBuilder::interface("Base").build(),
        injectable("ClassA", &["ClassB"]).extends(ty("Base")).build(),
        DeclBuilder::class("ClassB")
            .extends(ty("Base"))
            .inject_constructor(vec![ParamDecl::new("a", TypeRef::generic(names::PROVIDER, vec![ty("ClassA")]))])
            .build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];
    let id = forest.resolve(root, &cx.node(&list_of("Base"), None)).unwrap();

    let order = forest.contribution_order(id);
    assert_eq!(order.cycle, vec![0, 1]);
    assert_eq!(order.ordered.len(), 2, "cyclic elements are kept");
}

#[test]
fn scoped_implicit_binding_is_hosted_where_its_scope_is_declared() {
    let cx = context(vec![
        DeclBuilder::annotation_class("Singleton").marker(names::SCOPE).build(),
        component("Root", &["RootModule"])
            .annotated(Annotation::new("Singleton"))
            .build(),
        installing("RootModule", &["Child"]).build(),
        child_component("Child", &[])
            .abstract_method("database", ty("Database"))
            .abstract_method("repository", ty("Repository"))
            .build(),
        injectable("Database", &[]).annotated(Annotation::new("Singleton")).build(),
        injectable("Repository", &["Database"]).build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];
    let child = forest.graph(root).children()[0];
    assert_eq!(forest.graph_path(child), vec!["Root", "Child"]);

    let database = forest.resolve(child, &cx.node(&ty("Database"), None)).unwrap();
    assert_eq!(forest.binding(database).owner, root);
    assert!(forest.binding(database).is_implicit());

    let repository = forest.resolve(child, &cx.node(&ty("Repository"), None)).unwrap();
    assert_eq!(forest.binding(repository).owner, child);

    assert_eq!(forest.resolve(root, &cx.node(&ty("Database"), None)), Some(database));
}

#[test]
fn child_sees_parent_bindings_and_its_creator_is_injectable() {
    let cx = context(vec![
        component("Root", &["RootModule"]).build(),
        installing("RootModule", &["Child"])
            .method(provides("api", "Api"))
            .build(),
        child_component("Child", &[])
            .abstract_method("api", ty("Api"))
            .nested("Child.Builder")
            .build(),
        DeclBuilder::interface("Child.Builder")
            .marker(names::COMPONENT_BUILDER)
            .abstract_method("build", ty("Child"))
            .build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];
    let child = forest.graph(root).children()[0];

    let api = forest.resolve(child, &cx.node(&ty("Api"), None)).unwrap();
    assert_eq!(forest.binding(api).owner, root);

    let creator = forest
        .resolve(root, &cx.node(&ty("Child.Builder"), None))
        .expect("child creator is bound in the parent");
    assert!(matches!(
        forest.binding(creator).kind,
        BindingKind::SubComponentCreator { child: c } if c == child
    ));
}

#[test]
fn child_lists_inherit_ancestor_contributions_first() {
    let cx = context(vec![
        component("Root", &["RootModule"]).build(),
        installing("RootModule", &["Child"])
            .method(into_list("a", "ClassA"))
            .build(),
        child_component("Child", &["ChildModule"])
            .abstract_method("bases", list_of("Base"))
            .build(),
        module("ChildModule")
            .method(into_list("b", "ClassB"))
            .method(into_list("again", "ClassA"))
            .build(),
        DeclBuilder::interface("Base").build(),
        injectable("ClassA", &[]).extends(ty("Base")).build(),
        injectable("ClassB", &[]).extends(ty("Base")).build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];
    let child = forest.graph(root).children()[0];

    let id = forest
        .resolve(child, &cx.node(&list_of("Base"), None))
        .expect("child list is multi-bound");
    let binding = forest.binding(id);
    assert_eq!(binding.owner, child);
    let BindingKind::Multi(multi) = &binding.kind else {
        panic!("expected a multi-binding, got {binding}");
    };
    let elements: Vec<String> = forest
        .contribution_order(id)
        .ordered
        .iter()
        .map(|&i| multi.contributions[i].decl.origin.to_string())
        .collect();
    assert_eq!(elements, vec!["RootModule::a", "ChildModule::b"]);
}

#[test]
fn never_condition_excludes_binding_with_warning() {
    let cx = context(vec![
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
            .method(provides("api", "Api").annotated(
                Annotation::new(names::CONDITIONAL).with("value", AnnotationValue::types([ty("Impossible")])),
            ))
            .build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];

    assert_eq!(forest.resolve(root, &cx.node(&ty("Api"), None)), None);
    let issues = forest.graph(root).issues();
    assert_eq!(issues.len(), 1, "{issues:?}");
    assert_eq!(issues[0].severity, Severity::Warning);
    assert!(issues[0].message.contains("can never be satisfied"));
}

#[test]
fn never_excluded_binding_names_its_inject_fallback() {
    let cx = context(vec![
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
            .method(provides("api", "Api").annotated(
                Annotation::new(names::CONDITIONAL).with("value", AnnotationValue::types([ty("Impossible")])),
            ))
            .build(),
        injectable("Api", &[]).build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];

    let issues = forest.graph(root).issues();
    assert_eq!(issues.len(), 1, "{issues:?}");
    assert!(
        issues[0].message.ends_with("; Api is provided by its @Inject constructor instead"),
        "{}",
        issues[0].message
    );

    let api = forest.resolve(root, &cx.node(&ty("Api"), None)).unwrap();
    assert!(matches!(forest.binding(api).kind, BindingKind::InjectConstructor(_)));
}

#[test]
fn bindings_outside_the_variant_are_filtered() {
    let flavor = |name: &str| {
        DeclBuilder::class(name)
            .annotated(
                Annotation::new(names::COMPONENT_FLAVOR)
                    .with("dimension", AnnotationValue::Type(ty("Device"))),
            )
            .build()
    };
    let only_in = |flavor: &str| {
        Annotation::new(names::CONDITIONAL).with("onlyIn", AnnotationValue::types([ty(flavor)]))
    };
    let cx = context(vec![
        DeclBuilder::class("Device").marker(names::COMPONENT_VARIANT_DIMENSION).build(),
        flavor("Phone"),
        flavor("Tablet"),
        DeclBuilder::interface("Root")
            .annotated(
                Annotation::new(names::COMPONENT)
                    .with("modules", AnnotationValue::types([ty("UiModule")]))
                    .with("variant", AnnotationValue::types([ty("Phone")])),
            )
            .build(),
        module("UiModule")
            .method(provides("phoneLayout", "Layout").annotated(only_in("Phone")))
            .method(provides("tabletLayout", "Layout").annotated(only_in("Tablet")))
            .build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];

    assert!(forest.graph(root).issues().is_empty(), "{:?}", forest.graph(root).issues());
    let layout = forest.resolve(root, &cx.node(&ty("Layout"), None)).unwrap();
    assert_eq!(
        forest.binding(layout).declaration().map(|m| m.name.as_str()),
        Some("phoneLayout")
    );
}

#[test]
fn conflicting_explicit_bindings_are_reported() {
    let cx = context(vec![
        component("Root", &["First", "Second"]).build(),
        module("First").method(provides("api", "Api")).build(),
        module("Second").method(provides("otherApi", "Api")).build(),
    ]);
    let forest = GraphForest::build(&cx);
    let root = forest.roots()[0];

    let issues = forest.graph(root).issues();
    assert_eq!(issues.len(), 1, "{issues:?}");
    assert!(issues[0].is_error());
    assert!(issues[0].message.starts_with("conflicting bindings for Api"));
}

#[test]
fn component_hierarchy_loop_is_an_error() {
    let cx = context(vec![
        component("Root", &["RootModule"]).build(),
        installing("RootModule", &["Child"]).build(),
        child_component("Child", &["ChildModule"]).build(),
        installing("ChildModule", &["Grandchild"]).build(),
        child_component("Grandchild", &["LoopModule"]).build(),
        installing("LoopModule", &["Child"]).build(),
    ]);
    let forest = GraphForest::build(&cx);

    assert_eq!(forest.graphs().len(), 3);
    let grandchild = forest
        .graphs()
        .iter()
        .find(|g| g.component().simple_name() == "Grandchild")
        .unwrap();
    assert!(grandchild
        .issues()
        .iter()
        .any(|i| i.message == "component hierarchy loop: Root -> Child -> Grandchild -> Child"));
}

#[test]
fn build_from_roots_rejects_non_root_components() {
    let cx = context(vec![child_component("Child", &[]).build()]);
    assert!(GraphForest::build_from_roots(&cx, &[ty("Child")], ForestOptions::default()).is_err());
}

#[test]
fn summary_lists_bindings_and_ordered_elements() {
    let cx = context(plugins_pack(None));
    let forest = GraphForest::build(&cx);

    // Nothing is resolved up front; implicit bindings reached from the list still appear
    let summary = forest.summary();
    assert_eq!(summary.components.len(), 1);
    let component = &summary.components[0];
    assert_eq!(component.path, vec!["Root"]);
    assert_eq!(component.multibindings.len(), 1);
    assert_eq!(
        component.multibindings[0].elements,
        vec!["ListModule::b", "ListModule::a", "ListModule::c"]
    );
    for implicit in ["ClassA", "ClassB", "ClassC"] {
        assert!(
            component.bindings.iter().any(|b| b.node == implicit),
            "{implicit} missing from {:?}",
            component.bindings
        );
    }

    let json = forest.summary_json().unwrap();
    assert!(json.contains("\"requires_synchronized_access\": false"));
}
