use crate::context::ModelContext;
use std::sync::Arc;
use wiring_lang::{TypeDecl, TypeRef};

/// A type reference together with its declaration, when one exists
#[derive(Debug, Clone)]
pub struct DeclaredType {
    ty: TypeRef,
    decl: Option<Arc<TypeDecl>>,
}

impl DeclaredType {
    pub(crate) fn resolve(cx: &ModelContext, ty: &TypeRef) -> Self {
        Self {
            ty: ty.clone(),
            decl: cx.oracle().declaration_of(ty),
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn decl(&self) -> Option<&Arc<TypeDecl>> {
        self.decl.as_ref()
    }
}

/// Models backed by a declared type.
///
/// Shared behavior is reached through composition: each model holds a
/// [`DeclaredType`] and exposes it here.
pub trait ClassBacked {
    fn declared(&self) -> &DeclaredType;

    fn ty(&self) -> &TypeRef {
        self.declared().ty()
    }

    fn is_declared(&self) -> bool {
        self.declared().decl().is_some()
    }

    fn simple_name(&self) -> &str {
        self.ty().simple_name()
    }
}
