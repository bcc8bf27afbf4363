use pretty_assertions::assert_eq;
use std::rc::Rc;
use wiring_lang::{
    names, Annotation, AnnotationValue, DeclBuilder, DeclarationSet, FieldDecl, FunctionDecl,
    ParamDecl, TypeDecl, TypeRef,
};
use wiring_model::{
    resolve_conditionals, BindingDeclKind, BindingTarget, ClassBacked, CollectionKind,
    CreatorInputKind, DependencyKind, ModelContext, Scope, Variant, VariantMatch,
};

fn ty(name: &str) -> TypeRef {
    TypeRef::named(name)
}

fn context(decls: Vec<TypeDecl>) -> ModelContext {
    let _ = env_logger::builder().is_test(true).try_init();
    ModelContext::new(DeclarationSet::from_decls(decls).unwrap())
}

fn flags() -> TypeDecl {
    DeclBuilder::object("Flags")
        .field(FieldDecl::new("a", ty(names::BOOLEAN)))
        .field(FieldDecl::new("b", ty(names::BOOLEAN)))
        .field(FieldDecl::new("name", ty("String")))
        .build()
}

fn flavor(name: &str, dimension: &str) -> TypeDecl {
    DeclBuilder::class(name)
        .annotated(
            Annotation::new(names::COMPONENT_FLAVOR)
                .with("dimension", AnnotationValue::Type(ty(dimension))),
        )
        .build()
}

fn dimension(name: &str) -> TypeDecl {
    DeclBuilder::class(name)
        .marker(names::COMPONENT_VARIANT_DIMENSION)
        .build()
}

#[test]
fn nodes_are_interned_by_type_and_qualifier() {
    let cx = context(vec![]);
    let named = Annotation::new(names::NAMED).with("value", AnnotationValue::str("db"));

    let a = cx.node(&ty("Api"), None);
    let b = cx.node(&ty("Api"), None);
    let qualified = cx.node(&ty("Api"), Some(named.clone()));

    assert_eq!(a, b);
    assert_ne!(a, qualified);
    assert_eq!(qualified, cx.node(&ty("Api"), Some(named)));
    assert_eq!(cx.node_count(), 2);
}

#[test]
fn void_maps_to_invalid_node() {
    let cx = context(vec![]);
    let node = cx.node(&TypeRef::Void, None);
    assert!(!node.is_valid());
    assert_eq!(node, cx.invalid_node());
}

#[test]
fn dependency_wrappers_are_unwrapped() {
    let cx = context(vec![]);
    let api = ty("Api");
    let cases = [
        (TypeRef::generic(names::LAZY, vec![api.clone()]), DependencyKind::Lazy),
        (TypeRef::generic(names::PROVIDER, vec![api.clone()]), DependencyKind::Provider),
        (TypeRef::generic(names::OPTIONAL, vec![api.clone()]), DependencyKind::Optional),
        (
            TypeRef::generic(
                names::OPTIONAL,
                vec![TypeRef::generic(names::LAZY, vec![api.clone()])],
            ),
            DependencyKind::OptionalLazy,
        ),
        (api.clone(), DependencyKind::Direct),
    ];

    for (declared, kind) in cases {
        let dependency = cx.dependency(&declared, &[]);
        assert_eq!(dependency.kind, kind, "for {declared}");
        assert_eq!(dependency.node, cx.node(&api, None));
    }
}

#[test]
fn custom_qualifier_is_recognised() {
    let cx = context(vec![DeclBuilder::annotation_class("Remote")
        .marker(names::QUALIFIER)
        .build()]);
    let dependency = cx.dependency(&ty("Api"), &[Annotation::new("Remote"), Annotation::new("Other")]);
    assert_eq!(dependency.node.qualifier(), Some(&Annotation::new("Remote")));
}

#[test]
fn condition_expression_resolves_through_import_as() {
    let feature = DeclBuilder::class("FeatureX")
        .annotated(
            Annotation::new(names::CONDITION_EXPRESSION)
                .with("value", AnnotationValue::str("F.a && !F.b"))
                .with(
                    "importAs",
                    AnnotationValue::Annotation(
                        Annotation::new(names::IMPORT_AS)
                            .with("value", AnnotationValue::Type(ty("Flags")))
                            .with("alias", AnnotationValue::str("F")),
                    ),
                ),
        )
        .build();
    let cx = context(vec![flags(), feature]);

    let model = cx.feature(&ty("FeatureX"));
    assert!(model.issues().is_empty(), "{:?}", model.issues());

    let a = cx.condition(&ty("Flags"), &["a".to_string()]);
    let b = cx.condition(&ty("Flags"), &["b".to_string()]);
    let expected = Scope::var(a.clone()).and(&Scope::var(b.clone()).not());
    assert_eq!(model.scope(), &expected);
    assert!(!a.model().requires_instance(), "object members are static");
    assert!(Rc::ptr_eq(&model, &cx.feature(&ty("FeatureX"))));
}

#[test]
fn non_boolean_condition_is_an_invalid_placeholder() {
    let feature = DeclBuilder::class("Named")
        .annotated(
            Annotation::new(names::CONDITION)
                .with("value", AnnotationValue::Type(ty("Flags")))
                .with("condition", AnnotationValue::str("name")),
        )
        .build();
    let cx = context(vec![flags(), feature]);

    let model = cx.feature(&ty("Named"));
    let condition = cx.condition(&ty("Flags"), &["name".to_string()]);
    assert!(!condition.model().is_valid());
    assert!(condition
        .model()
        .error()
        .unwrap()
        .contains("must end in a boolean member"));
    assert_eq!(model.scope(), &Scope::var(condition));
}

#[test]
fn condition_on_instance_member_requires_holder() {
    let holder = DeclBuilder::class("Config")
        .method(FunctionDecl::new("isEnabled", ty(names::BOOLEAN)))
        .build();
    let cx = context(vec![holder]);
    let condition = cx.condition(&ty("Config"), &["isEnabled".to_string()]);
    assert!(condition.model().is_valid());
    assert!(condition.model().requires_instance());
}

#[test]
fn feature_parse_error_is_recorded() {
    let feature = DeclBuilder::class("Broken")
        .annotated(
            Annotation::new(names::CONDITION_EXPRESSION)
                .with("value", AnnotationValue::str("Flags.a &&"))
                .with("imports", AnnotationValue::types([ty("Flags")])),
        )
        .build();
    let cx = context(vec![flags(), feature]);
    let model = cx.feature(&ty("Broken"));
    assert_eq!(model.issues().len(), 1);
    assert!(model.issues()[0].message.contains("at offset"));
}

#[test]
fn variant_merge_accumulates_conflicts() {
    let cx = context(vec![
        dimension("Dim1"),
        dimension("Dim2"),
        flavor("A", "Dim1"),
        flavor("B", "Dim1"),
        flavor("C", "Dim2"),
    ]);
    let base = Variant::from_flavors([cx.flavor(&ty("A"))]);

    let conflicting = base.plus(&Variant::from_flavors([cx.flavor(&ty("B"))]));
    let conflicts = conflicting.conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].0, &ty("Dim1"));
    assert!(conflicting.get(&ty("Dim1")).is_none());

    let compatible = base.plus(&Variant::from_flavors([cx.flavor(&ty("C"))]));
    assert!(compatible.conflicts().is_empty());
    assert_eq!(compatible.get(&ty("Dim2")).unwrap().ty(), &ty("C"));

    let repeated = base.plus(&base);
    assert!(repeated.conflicts().is_empty());
}

#[test]
fn variant_matching_reports_missing_dimension() {
    let cx = context(vec![
        dimension("Dim1"),
        dimension("Dim2"),
        flavor("A", "Dim1"),
        flavor("B", "Dim1"),
        flavor("C", "Dim2"),
    ]);
    let variant = Variant::from_flavors([cx.flavor(&ty("A"))]);

    assert_eq!(variant.matches(&[]), VariantMatch::Matched);
    assert_eq!(variant.matches(&[cx.flavor(&ty("A"))]), VariantMatch::Matched);
    assert_eq!(variant.matches(&[cx.flavor(&ty("B"))]), VariantMatch::NotMatched);
    assert_eq!(
        variant.matches(&[cx.flavor(&ty("C"))]),
        VariantMatch::MissingDimension(ty("Dim2"))
    );
}

#[test]
fn conditionals_filter_by_variant() {
    let conditional_b = Annotation::new(names::CONDITIONAL)
        .with("onlyIn", AnnotationValue::types([ty("B")]));
    let target = DeclBuilder::class("Target").annotated(conditional_b).build();
    let cx = context(vec![dimension("Dim1"), flavor("A", "Dim1"), flavor("B", "Dim1"), target]);

    let decl = cx.oracle().declaration("Target").unwrap();
    let conditionals = cx.conditionals(decl.as_ref());
    let in_a = resolve_conditionals(&conditionals, &Variant::from_flavors([cx.flavor(&ty("A"))]));
    assert!(in_a.variant_excluded);
    assert_eq!(in_a.scope, Scope::Never);

    let in_b = resolve_conditionals(&conditionals, &Variant::from_flavors([cx.flavor(&ty("B"))]));
    assert!(!in_b.variant_excluded);
    assert_eq!(in_b.scope, Scope::Always);
}

#[test]
fn module_members_are_classified() {
    let string_key = DeclBuilder::annotation_class("StringKey")
        .marker(names::INTO_MAP_KEY)
        .method(FunctionDecl::new("value", ty("String")))
        .build();
    let module = DeclBuilder::class("AppModule")
        .marker(names::MODULE)
        .method(
            FunctionDecl::new("bindApi", ty("Api"))
                .param("impl", ty("ApiImpl"))
                .annotated(Annotation::new(names::BINDS))
                .abstract_(),
        )
        .method(
            FunctionDecl::new("plugins", TypeRef::generic(names::LIST, vec![ty("Plugin")]))
                .annotated(Annotation::new(names::PROVIDES))
                .annotated(Annotation::new(names::INTO_LIST).with("flatten", AnnotationValue::Bool(true)))
                .static_(),
        )
        .method(
            FunctionDecl::new("handler", ty("Handler"))
                .annotated(Annotation::new(names::PROVIDES))
                .annotated(Annotation::new(names::INTO_MAP))
                .annotated(Annotation::new("StringKey").with("value", AnnotationValue::str("main"))),
        )
        .method(
            FunctionDecl::new("declared", TypeRef::generic(names::SET, vec![ty("Listener")]))
                .annotated(Annotation::new(names::MULTIBINDS))
                .abstract_(),
        )
        .build();
    let api_impl = DeclBuilder::class("ApiImpl").extends(ty("Api")).build();
    let cx = context(vec![string_key, module, api_impl, DeclBuilder::interface("Api").build()]);

    let model = cx.module(&ty("AppModule"));
    assert!(model.issues().is_empty(), "{:?}", model.issues());
    assert_eq!(model.bindings().len(), 3);

    let alias = &model.bindings()[0];
    assert!(alias.is_alias());
    assert!(alias.issues.is_empty(), "{:?}", alias.issues);

    let flatten = &model.bindings()[1];
    assert_eq!(
        flatten.target,
        BindingTarget::FlattenContribution {
            collection: CollectionKind::List,
            element: cx.node(&ty("Plugin"), None),
        }
    );
    assert!(matches!(
        flatten.kind,
        BindingDeclKind::Provides {
            requires_module_instance: false,
            ..
        }
    ));

    let mapping = &model.bindings()[2];
    let BindingTarget::MappingContribution { key, .. } = &mapping.target else {
        panic!("expected a map contribution, got {}", mapping.target);
    };
    assert_eq!(key.key_type, ty("String"));
    assert_eq!(key.value, AnnotationValue::str("main"));
    assert!(model.requires_instance());

    assert_eq!(model.multi_declarations().len(), 1);
    assert_eq!(model.multi_declarations()[0].kind, CollectionKind::Set);
}

#[test]
fn component_model_reads_entry_points_and_creator() {
    let component = DeclBuilder::interface("AppComponent")
        .marker(names::COMPONENT)
        .abstract_method("api", ty("Api"))
        .method(
            FunctionDecl::new("inject", TypeRef::Void)
                .param("target", ty("Activity"))
                .abstract_(),
        )
        .nested("AppComponent.Builder")
        .build();
    let builder = DeclBuilder::interface("AppComponent.Builder")
        .marker(names::COMPONENT_BUILDER)
        .method(
            FunctionDecl::new("create", ty("AppComponent"))
                .param_with(
                    ParamDecl::new("name", ty("String"))
                        .annotated(Annotation::new(names::BINDS_INSTANCE)),
                )
                .abstract_(),
        )
        .build();
    let activity = DeclBuilder::class("Activity")
        .field(FieldDecl::new("api", ty("Api")).annotated(Annotation::new(names::INJECT)))
        .build();
    let cx = context(vec![component, builder, activity]);

    let model = cx.component(&ty("AppComponent"));
    assert!(model.issues().is_empty(), "{:?}", model.issues());
    assert!(model.is_root());
    assert_eq!(model.simple_name(), "AppComponent");
    assert_eq!(model.entry_points().len(), 1);
    assert_eq!(model.members_injectors()[0].members.len(), 1);

    let creator = model.creator().unwrap();
    assert_eq!(creator.factory_method(), Some("create"));
    assert_eq!(
        creator.inputs()[0].kind,
        CreatorInputKind::Instance(cx.node(&ty("String"), None))
    );
}

#[test]
fn module_closure_follows_includes_once() {
    let include = |name: &str, included: &[&str]| {
        DeclBuilder::class(name)
            .annotated(
                Annotation::new(names::MODULE).with(
                    "includes",
                    AnnotationValue::types(included.iter().map(|n| ty(n))),
                ),
            )
            .build()
    };
    let component = DeclBuilder::interface("Root")
        .annotated(
            Annotation::new(names::COMPONENT)
                .with("modules", AnnotationValue::types([ty("M1"), ty("M2")])),
        )
        .build();
    let cx = context(vec![
        component,
        include("M1", &["M3"]),
        include("M2", &["M3", "M1"]),
        include("M3", &["M1"]),
    ]);

    let model = cx.component(&ty("Root"));
    let closure: Vec<String> = model
        .module_closure(&cx)
        .unwrap()
        .iter()
        .map(|m| m.simple_name().to_string())
        .collect();
    assert_eq!(closure, vec!["M1", "M2", "M3"]);
}

#[test]
fn malformed_contributions_bind_nothing() {
    let module = DeclBuilder::class("BrokenModule")
        .marker(names::MODULE)
        .method(
            FunctionDecl::new("keyless", ty("Handler"))
                .annotated(Annotation::new(names::PROVIDES))
                .annotated(Annotation::new(names::INTO_MAP))
                .static_(),
        )
        .method(
            FunctionDecl::new("both", ty("Plugin"))
                .annotated(Annotation::new(names::PROVIDES))
                .annotated(Annotation::new(names::INTO_LIST))
                .annotated(Annotation::new(names::INTO_SET))
                .static_(),
        )
        .method(
            FunctionDecl::new("notACollection", ty("Plugin"))
                .annotated(Annotation::new(names::PROVIDES))
                .annotated(Annotation::new(names::INTO_SET).with("flatten", AnnotationValue::Bool(true)))
                .static_(),
        )
        .build();
    let cx = context(vec![module]);

    let model = cx.module(&ty("BrokenModule"));
    assert_eq!(model.bindings().len(), 3);
    for decl in model.bindings() {
        assert!(!decl.target.node().is_valid(), "{} bound {}", decl.origin, decl.target);
        assert!(!decl.target.is_contribution());
        assert_eq!(decl.issues.len(), 1, "{:?}", decl.issues);
    }
}
