//! Typed accessors for the built-in annotation kinds.

use crate::annotation::{Annotated, Annotation};
use crate::names;
use crate::types::TypeRef;

/// `@Component(isRoot, modules, dependencies, variant, multiThreadAccess)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentAnnotation {
    pub is_root: bool,
    pub modules: Vec<TypeRef>,
    pub dependencies: Vec<TypeRef>,
    pub variant: Vec<TypeRef>,
    pub multi_thread_access: bool,
}

/// `@Module(includes, subcomponents)`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ModuleAnnotation {
    pub includes: Vec<TypeRef>,
    pub subcomponents: Vec<TypeRef>,
}

/// `@Conditional(value = [features], onlyIn = [flavors])`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConditionalAnnotation {
    pub features: Vec<TypeRef>,
    pub only_in: Vec<TypeRef>,
}

/// `@Condition(value = Holder, condition = "path")`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionAnnotation {
    pub holder: TypeRef,
    pub condition: String,
}

/// `@ConditionExpression(value = "a && !b", imports = [...], importAs = [...])`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConditionExpressionAnnotation {
    pub value: String,
    pub imports: Vec<TypeRef>,
    /// (alias, type) pairs from `@ImportAs`
    pub import_as: Vec<(String, TypeRef)>,
}

/// `@DeclareList(orderDependent = true)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclareListAnnotation {
    pub order_dependent: bool,
}

impl ComponentAnnotation {
    pub fn from_annotation(ann: &Annotation) -> Self {
        Self {
            is_root: ann.bool_attr("isRoot").unwrap_or(true),
            modules: ann.type_list("modules"),
            dependencies: ann.type_list("dependencies"),
            variant: ann.type_list("variant"),
            multi_thread_access: ann.bool_attr("multiThreadAccess").unwrap_or(false),
        }
    }
}

impl ModuleAnnotation {
    pub fn from_annotation(ann: &Annotation) -> Self {
        Self {
            includes: ann.type_list("includes"),
            subcomponents: ann.type_list("subcomponents"),
        }
    }
}

impl ConditionalAnnotation {
    pub fn from_annotation(ann: &Annotation) -> Self {
        Self {
            features: ann.type_list("value"),
            only_in: ann.type_list("onlyIn"),
        }
    }
}

impl ConditionAnnotation {
    pub fn from_annotation(ann: &Annotation) -> Option<Self> {
        Some(Self {
            holder: ann.type_attr("value")?.clone(),
            condition: ann.str_attr("condition")?.to_string(),
        })
    }
}

impl ConditionExpressionAnnotation {
    pub fn from_annotation(ann: &Annotation) -> Self {
        let import_as = ann
            .annotation_list("importAs")
            .into_iter()
            .filter(|nested| nested.class == names::IMPORT_AS)
            .filter_map(|nested| {
                let ty = nested.type_attr("value")?.clone();
                let alias = nested.str_attr("alias")?.to_string();
                Some((alias, ty))
            })
            .collect();

        Self {
            value: ann.str_attr("value").unwrap_or_default().to_string(),
            imports: ann.type_list("imports"),
            import_as,
        }
    }
}

/// Typed access to the built-in annotations on any annotated declaration
pub trait BuiltinAnnotations: Annotated {
    fn component_annotation(&self) -> Option<ComponentAnnotation> {
        self.annotation(names::COMPONENT)
            .map(ComponentAnnotation::from_annotation)
    }

    fn module_annotation(&self) -> Option<ModuleAnnotation> {
        self.annotation(names::MODULE)
            .map(ModuleAnnotation::from_annotation)
    }

    fn conditional_annotations(&self) -> Vec<ConditionalAnnotation> {
        self.annotations_of(names::CONDITIONAL)
            .map(ConditionalAnnotation::from_annotation)
            .collect()
    }

    /// `@IntoList(flatten)` / `@IntoSet(flatten)`; `None` when absent
    fn into_collection_flatten(&self, marker: &str) -> Option<bool> {
        self.annotation(marker)
            .map(|ann| ann.bool_attr("flatten").unwrap_or(false))
    }

    fn declare_list_annotation(&self) -> Option<DeclareListAnnotation> {
        self.annotation(names::DECLARE_LIST)
            .map(|ann| DeclareListAnnotation {
                order_dependent: ann.bool_attr("orderDependent").unwrap_or(true),
            })
    }

    /// Flavor dimension from `@ComponentFlavor(dimension = X)`
    fn flavor_dimension(&self) -> Option<TypeRef> {
        self.annotation(names::COMPONENT_FLAVOR)
            .and_then(|ann| ann.type_attr("dimension").cloned())
    }
}

impl<T: Annotated + ?Sized> BuiltinAnnotations for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationValue;
    use crate::decl::{DeclKind, TypeDecl};

    #[test]
    fn test_component_defaults() {
        let ann = ComponentAnnotation::from_annotation(&Annotation::new(names::COMPONENT));
        assert!(ann.is_root);
        assert!(!ann.multi_thread_access);
        assert!(ann.modules.is_empty());
    }

    #[test]
    fn test_condition_expression_import_as() {
        let import = Annotation::new(names::IMPORT_AS)
            .with("value", AnnotationValue::Type(TypeRef::named("a.b.Flags")))
            .with("alias", AnnotationValue::str("F"));
        let ann = Annotation::new(names::CONDITION_EXPRESSION)
            .with("value", AnnotationValue::str("F.on && !Other.off"))
            .with("imports", AnnotationValue::types([TypeRef::named("Other")]))
            .with("importAs", AnnotationValue::Array(vec![AnnotationValue::Annotation(import)]));

        let parsed = ConditionExpressionAnnotation::from_annotation(&ann);
        assert_eq!(parsed.value, "F.on && !Other.off");
        assert_eq!(parsed.imports, vec![TypeRef::named("Other")]);
        assert_eq!(parsed.import_as, vec![("F".to_string(), TypeRef::named("a.b.Flags"))]);
    }

    #[test]
    fn test_multiple_conditionals() {
        let mut decl = TypeDecl::new("Impl", DeclKind::Class);
        decl.annotations.push(
            Annotation::new(names::CONDITIONAL)
                .with("value", AnnotationValue::types([TypeRef::named("FeatureA")])),
        );
        decl.annotations.push(
            Annotation::new(names::CONDITIONAL)
                .with("onlyIn", AnnotationValue::types([TypeRef::named("Debug")])),
        );
        let conditionals = decl.conditional_annotations();
        assert_eq!(conditionals.len(), 2);
        assert_eq!(conditionals[1].only_in, vec![TypeRef::named("Debug")]);
    }
}
