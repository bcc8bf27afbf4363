//! # Wiring Validate
//!
//! The validation pass over a [`wiring_graph::GraphForest`].
//!
//! ## Architecture
//!
//! ```text
//! GraphForest
//!     │
//!     ├──> Validator (DFS, Unvisited -> Visiting -> Validated)
//!     │      ├─ Component, module, creator and variant checks per graph
//!     │      ├─ Entry points / members-injectors -> bindings -> dependencies
//!     │      ├─ Lazy / Provider edges deferred to a fresh stack
//!     │      ├─ Loops: dependency loop vs self-dependent binding
//!     │      └─ Condition compatibility via the propositional solver
//!     │
//!     ├──> EncounterGraph (petgraph): every entity -> entity step
//!     │
//!     └──> DiagnosticSink
//!            └─ Collector: grouped by (severity, message), paths merged
//! ```
//!
//! Problems never abort the pass. Each one is attached to the entity where
//! it was found and reported with every root-to-entity path, once the whole
//! forest has been traversed.

mod diagnostic;
mod encounter;
mod error;
mod options;
mod validator;

pub use diagnostic::{Collector, Diagnostic, DiagnosticSink, ValidationReport};
pub use encounter::{EncounterGraph, Entity};
pub use error::{Result, ValidateError};
pub use options::ValidationOptions;
pub use validator::{validate, validate_into, validate_roots};
