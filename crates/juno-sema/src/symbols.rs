//! Symbol table entries

use juno_types::TypeId;

/// A local variable or parameter bound in some block scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalDef {
    /// Declared type.
    pub ty: TypeId,
    /// The method-local slot holding the value.
    pub slot: u32,
}
