//! # Wiring Model
//!
//! Models of everything the binding graph is assembled from, built lazily
//! from the declarations a [`wiring_lang::TypeOracle`] exposes.
//!
//! ## Architecture
//!
//! ```text
//! TypeOracle
//!     │
//!     └──> ModelContext (one per pass, owns every interned model)
//!            ├─ Node            (type, qualifier), compared by identity
//!            ├─ ConditionRef    Holder.member.path -> boolean
//!            ├─ FeatureModel    AND of @Condition / @AnyCondition / @ConditionExpression
//!            ├─ FlavorModel     @ComponentFlavor(dimension)
//!            ├─ ModuleModel     @Provides / @Binds / @Multibinds members
//!            ├─ ComponentModel  entry points, injectors, creator, module closure
//!            └─ InjectConstructorModel / AssistedFactoryModel
//! ```
//!
//! Every model is created through an identity cache, so two requests for the
//! same declaration within a pass return the same `Rc`. Models never fail to
//! build: structural problems are recorded as [`Issue`]s and surfaced by the
//! validator when the model is actually reached.

mod binding;
mod cache;
mod component;
mod condition;
mod context;
mod declared;
mod error;
mod implicit;
mod issue;
mod module;
mod node;
mod variant;

pub use binding::{
    classify, BindingDecl, BindingDeclKind, BindingScope, BindingTarget, CollectionKind, MapKey,
    MemberMarker, MemberRef, MultiDeclaration,
};
pub use cache::{Interner, Memo};
pub use component::{
    ComponentDependencyModel, ComponentModel, CreatorInput, CreatorInputKind, CreatorModel,
    EntryPoint, MembersInjectorModel,
};
pub use condition::{
    instance_holders, invalid_conditions, resolve_conditionals, ConditionModel, ConditionRef,
    Conditional, ConditionalPresence, FeatureModel, Scope,
};
pub use context::ModelContext;
pub use declared::{ClassBacked, DeclaredType};
pub use error::{ModelError, Result};
pub use implicit::{AssistedFactoryModel, InjectConstructorModel, InjectedMember};
pub use issue::{Issue, Severity};
pub use module::ModuleModel;
pub use node::{Dependency, DependencyKind, Node, NodeModel};
pub use variant::{FlavorModel, Variant, VariantMatch};
