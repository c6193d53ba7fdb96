//! Code generation errors

use crate::opcode::Label;
use thiserror::Error;

/// Errors surfaced while emitting or sealing a symbolic module.
///
/// Code generation runs only on trees that analysis annotated without
/// diagnostics, so these indicate a driver bug (generating from an
/// unanalyzed or error-carrying tree) rather than a user mistake.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmitError {
    /// A node reached codegen without the annotation analysis fills in.
    #[error("missing analysis annotation: {what}")]
    MissingAnnotation {
        /// Which annotation was absent.
        what: &'static str,
    },

    /// A branch or handler refers to a label never placed in the stream.
    #[error("label {label} was never placed")]
    UnplacedLabel {
        /// The dangling label.
        label: Label,
    },

    /// An emit call arrived outside an open method or type.
    #[error("emit outside an open {scope}")]
    NoOpenScope {
        /// "type" or "method".
        scope: &'static str,
    },
}
