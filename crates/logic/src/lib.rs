//! # Wiring Logic
//!
//! Boolean conditions attached to bindings and components.
//!
//! ## Architecture
//!
//! ```text
//! "Flags.a && !(Flags.b || Other.c)"
//!     │
//!     ├──> Lexer + Pratt parser (parse.rs)
//!     │      └─ Expr<ConditionPath>, or ParseError { position }
//!     │
//!     ├──> ConditionScope { Always | Never | Expression }
//!     │      └─ and / or / not with structural short-circuits
//!     │
//!     └──> Solver
//!            ├─ tautology / contradiction / implies (Shannon expansion)
//!            └─ minimize (flatten, dedup, drop implied operands)
//! ```
//!
//! Expressions are generic over the variable type so the model can plug its
//! interned condition handles in after import resolution.

mod error;
mod expr;
mod parse;
mod scope;
mod solver;

pub use error::{ParseError, Result};
pub use expr::{Expr, ExprKind};
pub use parse::{parse, parse_member_path, ConditionPath, ImportTable};
pub use scope::ConditionScope;
pub use solver::Solver;
