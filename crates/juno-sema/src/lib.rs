//! Juno semantic analysis
//!
//! Two passes over the AST. Pre-analysis declares every top-level type's
//! skeleton in source order, then resolves supertypes and member headers,
//! so that method bodies can reference any sibling declaration. Analysis
//! walks bodies: it types every expression, allocates local slots,
//! resolves assignment targets into l-values, decides loop lowerings, and
//! rewrites the few forms (string concatenation, implicit `this`) that
//! code generation wants made explicit.
//!
//! Errors never abort a run. They land in the [`Diagnostics`] channel and
//! the offending node is typed with the `any` sentinel, which satisfies
//! every later check.

#![warn(missing_docs)]

pub mod analyze;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod symbols;

pub use analyze::analyze;
pub use context::ScopeChain;
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::SemanticError;
pub use symbols::LocalDef;
