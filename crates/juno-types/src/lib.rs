//! Juno type model
//!
//! Canonical representation of the types of the Juno language (primitives,
//! arrays, classes, interfaces) plus the registry that interns them and
//! answers inheritance, member-lookup and descriptor queries for the
//! analysis and code-generation passes.

pub mod error;
pub mod registry;
pub mod ty;

pub use error::TypeError;
pub use registry::{IteratorProtocol, TypeRegistry};
pub use ty::{
    ClassType, FieldSignature, InterfaceType, MethodSignature, Type, TypeId, TypeSpec,
};
