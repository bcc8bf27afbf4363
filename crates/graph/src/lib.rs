//! # Wiring Graph
//!
//! Binding graphs for every component placement, with lazy resolution of
//! implicit bindings and dependency-aware ordering of multi-bindings.
//!
//! ## Features
//!
//! - **Component forest** - one graph per root component and per installed child
//! - **Variant filtering** - explicit bindings filtered by the accumulated flavors
//! - **Hierarchical resolution** - innermost explicit binding wins, then `@Inject`
//! - **Scoped hosting** - cached bindings live where their scope is declared
//! - **List ordering** - Kahn sort over element dependencies, cycles reported
//!
//! ## Architecture
//!
//! ```text
//! ModelContext
//!     │
//!     ├──> ForestBuilder
//!     │      ├─ Accumulate variant and condition from the parent
//!     │      ├─ Install module closure (minus ancestors' modules)
//!     │      ├─ Recurse into child components
//!     │      └─ Register explicit + multi bindings, detect conflicts
//!     │
//!     ├──> GraphForest
//!     │      ├─ resolve(graph, node): explicit -> @Inject -> @AssistedFactory
//!     │      ├─ condition_of / runtime_condition
//!     │      ├─ dependencies (with presence guards)
//!     │      └─ contribution_order (petgraph toposort + SCC)
//!     │
//!     └──> ForestSummary (serde) for code generators
//! ```

mod assembler;
mod builder;
mod error;
mod graph;
mod multibinding;
mod types;

pub use assembler::{BindingSummary, ComponentSummary, ForestSummary, MultiBindingSummary};
pub use error::{GraphError, Result};
pub use graph::{ForestOptions, GraphForest};
pub use multibinding::ContributionOrder;
pub use types::{
    Binding, BindingGraph, BindingId, BindingKind, Contribution, GraphId, GuardedDependency,
    MultiBinding,
};
