//! Type resolution errors

use thiserror::Error;

/// Errors produced by the type registry.
///
/// These are not user-facing diagnostics by themselves; the analysis pass
/// catches them, reports a semantic error with the source line, and
/// substitutes the `any` sentinel so analysis can continue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// A textual type name did not resolve to any declared or built-in type.
    #[error("unresolved type: {name}")]
    UnresolvedType {
        /// The name that failed to resolve.
        name: String,
    },

    /// A type name was declared twice in the same compilation unit.
    #[error("type {name} is already declared")]
    DuplicateType {
        /// The redeclared name.
        name: String,
    },
}
