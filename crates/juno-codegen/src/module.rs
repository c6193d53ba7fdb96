//! Symbolic module definitions
//!
//! The serializable output of code generation: one `ModuleDef` per
//! compilation unit, holding symbolic type definitions whose method
//! bodies are instruction streams with inline labels. Everything here is
//! plain data; the external assembler consumes it.

use crate::opcode::{Instruction, Label};
use serde::{Deserialize, Serialize};

/// A compiled compilation unit.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleDef {
    /// The compiled types, in source order.
    pub types: Vec<TypeDef>,
}

impl ModuleDef {
    /// Find a compiled type by canonical name.
    pub fn type_named(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Serialize the module to JSON for the external assembler.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One compiled class or interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Canonical type name.
    pub name: String,
    /// Canonical super class name; `None` for interfaces.
    pub super_name: Option<String>,
    /// Implemented (or, for interfaces, extended) interface names.
    pub interfaces: Vec<String>,
    /// Whether this is an interface.
    pub is_interface: bool,
    /// Whether the type is abstract.
    pub is_abstract: bool,
    /// Declared fields.
    pub fields: Vec<FieldDef>,
    /// Compiled methods, including synthesized `<init>` and `<clinit>`.
    pub methods: Vec<MethodDef>,
}

impl TypeDef {
    /// Find a method by name and descriptor.
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodDef> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Find a method by name alone (first match).
    pub fn method_named(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// One field of a compiled type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field descriptor.
    pub descriptor: String,
    /// Whether the field lives in class storage.
    pub is_static: bool,
}

/// One compiled method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    /// Method name (`<init>`, `<clinit>` for the synthesized ones).
    pub name: String,
    /// Method descriptor.
    pub descriptor: String,
    /// Whether the method is static.
    pub is_static: bool,
    /// Whether the method is abstract (no code).
    pub is_abstract: bool,
    /// Declared thrown exception type names.
    pub throws: Vec<String>,
    /// The instruction stream; empty for abstract methods.
    pub code: Vec<Instruction>,
    /// Exception handler table, in registration order (earlier entries
    /// win on dispatch).
    pub exception_table: Vec<ExceptionEntry>,
}

/// One exception handler registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    /// Start of the protected range (inclusive).
    pub start: Label,
    /// End of the protected range (exclusive).
    pub end: Label,
    /// Handler entry point.
    pub handler: Label,
    /// Caught type name; `None` catches everything (finally paths).
    pub catch_type: Option<String>,
}
