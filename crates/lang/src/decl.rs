use crate::annotation::{Annotated, Annotation};
use crate::types::TypeRef;
use serde::{Deserialize, Serialize};

/// Kind of a declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    #[default]
    Class,
    Interface,
    Annotation,
    /// Singleton object; all of its members behave as static
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Internal,
    Private,
}

/// Declared type with its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    /// Fully qualified name, also the lookup key in the oracle
    pub name: String,

    #[serde(default)]
    pub kind: DeclKind,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub annotations: Vec<Annotation>,

    #[serde(default)]
    pub constructors: Vec<FunctionDecl>,

    /// Methods in declaration order (order matters for multi-bindings)
    #[serde(default)]
    pub methods: Vec<FunctionDecl>,

    #[serde(default)]
    pub fields: Vec<FieldDecl>,

    /// Direct super types (classes and interfaces)
    #[serde(default)]
    pub super_types: Vec<TypeRef>,

    /// Names of nested type declarations
    #[serde(default)]
    pub nested: Vec<String>,
}

/// Constructor or method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,

    #[serde(default)]
    pub annotations: Vec<Annotation>,

    #[serde(default)]
    pub params: Vec<ParamDecl>,

    #[serde(default = "void")]
    pub return_type: TypeRef,

    #[serde(default)]
    pub is_static: bool,

    #[serde(default)]
    pub is_abstract: bool,

    #[serde(default)]
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub visibility: Visibility,
}

fn void() -> TypeRef {
    TypeRef::Void
}

/// Field or zero-argument method, as used by condition paths
#[derive(Debug, Clone, Copy)]
pub enum Member<'a> {
    Field(&'a FieldDecl),
    Method(&'a FunctionDecl),
}

impl Member<'_> {
    pub fn name(&self) -> &str {
        match self {
            Self::Field(field) => &field.name,
            Self::Method(method) => &method.name,
        }
    }

    pub fn ty(&self) -> &TypeRef {
        match self {
            Self::Field(field) => &field.ty,
            Self::Method(method) => &method.return_type,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            Self::Field(field) => field.is_static,
            Self::Method(method) => method.is_static,
        }
    }

    pub fn visibility(&self) -> Visibility {
        match self {
            Self::Field(field) => field.visibility,
            Self::Method(method) => method.visibility,
        }
    }
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, kind: DeclKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            is_abstract: false,
            annotations: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            super_types: Vec::new(),
            nested: Vec::new(),
        }
    }

    /// Type reference naming this declaration (no type arguments)
    pub fn as_type(&self) -> TypeRef {
        TypeRef::named(self.name.clone())
    }

    /// Interfaces and abstract classes
    pub fn is_abstract_type(&self) -> bool {
        self.is_abstract || self.kind == DeclKind::Interface
    }

    pub fn is_object(&self) -> bool {
        self.kind == DeclKind::Object
    }

    /// Looks up a field or a parameterless method by name; fields win
    pub fn member(&self, name: &str) -> Option<Member<'_>> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(Member::Field)
            .or_else(|| {
                self.methods
                    .iter()
                    .find(|m| m.name == name && m.params.is_empty())
                    .map(Member::Method)
            })
    }

    /// Public no-argument constructor (or implicit default) on a concrete class
    pub fn has_default_constructor(&self) -> bool {
        if self.is_abstract_type() || self.kind == DeclKind::Annotation {
            return false;
        }
        if self.is_object() || self.constructors.is_empty() {
            return true;
        }
        self.constructors
            .iter()
            .any(|c| c.params.is_empty() && c.visibility != Visibility::Private)
    }
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            params: Vec::new(),
            return_type,
            is_static: false,
            is_abstract: false,
            visibility: Visibility::Public,
        }
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
        self.params.push(ParamDecl::new(name, ty));
        self
    }

    #[must_use]
    pub fn param_with(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    #[must_use]
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }
}

impl ParamDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            annotations: Vec::new(),
            is_static: false,
            visibility: Visibility::Public,
        }
    }

    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    #[must_use]
    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }
}

impl Annotated for TypeDecl {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

impl Annotated for FunctionDecl {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

impl Annotated for ParamDecl {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

impl Annotated for FieldDecl {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}
