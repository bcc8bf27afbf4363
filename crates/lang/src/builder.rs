use crate::annotation::Annotation;
use crate::decl::{DeclKind, FieldDecl, FunctionDecl, ParamDecl, TypeDecl, Visibility};
use crate::names;
use crate::types::TypeRef;

/// Fluent construction of [`TypeDecl`]s for front-ends and tests
#[derive(Debug, Clone)]
pub struct DeclBuilder {
    decl: TypeDecl,
}

impl DeclBuilder {
    pub fn class(name: impl Into<String>) -> Self {
        Self::of_kind(name, DeclKind::Class)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::of_kind(name, DeclKind::Interface)
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::of_kind(name, DeclKind::Object)
    }

    pub fn annotation_class(name: impl Into<String>) -> Self {
        Self::of_kind(name, DeclKind::Annotation)
    }

    fn of_kind(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            decl: TypeDecl::new(name, kind),
        }
    }

    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.decl.annotations.push(annotation);
        self
    }

    /// Attribute-less annotation
    #[must_use]
    pub fn marker(self, class: &str) -> Self {
        self.annotated(Annotation::new(class))
    }

    /// `@Inject` constructor with the given parameters
    #[must_use]
    pub fn inject_constructor(mut self, params: Vec<ParamDecl>) -> Self {
        let mut ctor = FunctionDecl::new("<init>", TypeRef::Void).annotated(Annotation::new(names::INJECT));
        ctor.params = params;
        self.decl.constructors.push(ctor);
        self
    }

    #[must_use]
    pub fn constructor(mut self, ctor: FunctionDecl) -> Self {
        self.decl.constructors.push(ctor);
        self
    }

    #[must_use]
    pub fn method(mut self, method: FunctionDecl) -> Self {
        self.decl.methods.push(method);
        self
    }

    /// Abstract method without parameters, e.g. a component entry point
    #[must_use]
    pub fn abstract_method(self, name: impl Into<String>, return_type: TypeRef) -> Self {
        self.method(FunctionDecl::new(name, return_type).abstract_())
    }

    #[must_use]
    pub fn field(mut self, field: FieldDecl) -> Self {
        self.decl.fields.push(field);
        self
    }

    #[must_use]
    pub fn extends(mut self, super_type: TypeRef) -> Self {
        self.decl.super_types.push(super_type);
        self
    }

    #[must_use]
    pub fn nested(mut self, name: impl Into<String>) -> Self {
        self.decl.nested.push(name.into());
        self
    }

    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.decl.is_abstract = true;
        self
    }

    #[must_use]
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.decl.visibility = visibility;
        self
    }

    pub fn build(self) -> TypeDecl {
        self.decl
    }
}
