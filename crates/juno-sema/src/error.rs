//! Semantic error taxonomy

use thiserror::Error;

/// One kind of semantic error.
///
/// Every variant is recoverable: the analyzer reports it, substitutes the
/// `any` sentinel where a type is needed, and keeps going. A node typed
/// `any` satisfies every later check, so one real mistake produces one
/// diagnostic rather than a cascade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    /// A simple name resolved to no local, parameter, field or method.
    #[error("cannot resolve name: {name}")]
    UnresolvedName {
        /// The name as written.
        name: String,
    },

    /// A type name resolved to no declared or built-in type.
    #[error("cannot resolve type: {name}")]
    UnresolvedType {
        /// The name as written.
        name: String,
    },

    /// An expression's type did not satisfy what its context required.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Display name of the required type.
        expected: String,
        /// Display name of the type found.
        actual: String,
    },

    /// The target of an assignment or increment is not assignable.
    #[error("illegal l-value: {what}")]
    IllegalLValue {
        /// What the target was.
        what: String,
    },

    /// Abstract types or members used where a concrete one is required.
    #[error("{detail}")]
    IllegalAbstractUse {
        /// What went wrong.
        detail: String,
    },

    /// Modifiers that cannot be combined on one declaration.
    #[error("illegal modifier combination: {detail}")]
    IllegalModifierCombination {
        /// The offending combination.
        detail: String,
    },

    /// A throw whose type no enclosing catch or throws clause covers.
    #[error("unhandled exception type: {ty}")]
    UnhandledException {
        /// Display name of the thrown type.
        ty: String,
    },

    /// A structurally invalid try statement or catch clause.
    #[error("malformed try/catch: {detail}")]
    MalformedTryCatch {
        /// What is malformed.
        detail: String,
    },

    /// Two declarations of the same name in the same scope.
    #[error("{name} is already declared in this scope")]
    DuplicateDeclaration {
        /// The redeclared name.
        name: String,
    },

    /// A non-void method with no return statement on its fall-through path.
    #[error("non-void method {method} must return a value")]
    MissingReturn {
        /// The method name.
        method: String,
    },

    /// Instance state referenced from a static context.
    #[error("cannot reference {name} from a static context")]
    IllegalStaticReference {
        /// The referenced name (`this` or a member name).
        name: String,
    },
}

impl SemanticError {
    /// Stable error code for tooling.
    pub fn code(&self) -> &'static str {
        match self {
            SemanticError::UnresolvedName { .. } => "J1001",
            SemanticError::UnresolvedType { .. } => "J1002",
            SemanticError::TypeMismatch { .. } => "J1003",
            SemanticError::IllegalLValue { .. } => "J1004",
            SemanticError::IllegalAbstractUse { .. } => "J1005",
            SemanticError::IllegalModifierCombination { .. } => "J1006",
            SemanticError::UnhandledException { .. } => "J1007",
            SemanticError::MalformedTryCatch { .. } => "J1008",
            SemanticError::DuplicateDeclaration { .. } => "J1009",
            SemanticError::MissingReturn { .. } => "J1010",
            SemanticError::IllegalStaticReference { .. } => "J1011",
        }
    }
}
