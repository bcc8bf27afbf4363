//! # Wiring Lang
//!
//! Read-only view of the declarations the graph is built from.
//!
//! The front-end that extracts declarations from source or compiled artifacts
//! lives outside this workspace. It hands the graph a [`TypeOracle`]: a lookup
//! from a type name to its [`TypeDecl`] (members, annotations, super types,
//! accessibility). Nothing downstream mutates this view.
//!
//! ## Architecture
//!
//! ```text
//! front-end (out of tree)
//!     │
//!     ├──> DeclarationSet (JSON or DeclBuilder)
//!     │      ├─ TypeDecl { constructors, methods, fields, annotations }
//!     │      └─ TypeRef  { Declared | Void | Error }
//!     │
//!     └──> TypeOracle::declaration(name)
//!            └─ consumed lazily by wiring-model
//! ```
//!
//! Unresolved types are reported by the front-end as [`TypeRef::Error`]; the
//! model turns them into diagnosable placeholder nodes instead of failing.

mod annotation;
mod builder;
mod builtin;
mod decl;
mod error;
pub mod names;
mod oracle;
mod types;

pub use annotation::{Annotated, Annotation, AnnotationValue};
pub use builder::DeclBuilder;
pub use builtin::{
    BuiltinAnnotations, ComponentAnnotation, ConditionAnnotation, ConditionExpressionAnnotation,
    ConditionalAnnotation, DeclareListAnnotation, ModuleAnnotation,
};
pub use decl::{DeclKind, FieldDecl, FunctionDecl, Member, ParamDecl, TypeDecl, Visibility};
pub use error::{LangError, Result};
pub use oracle::{DeclarationSet, TypeOracle};
pub use types::TypeRef;
