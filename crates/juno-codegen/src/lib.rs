//! Code generation for analyzed Juno programs
//!
//! Consumes trees that `juno-sema` analyzed and annotated, and produces
//! symbolic stack-machine modules: one [`ModuleDef`] per compilation
//! unit, with labeled instruction streams and exception tables. Branch
//! offsets, constant pooling and binary encoding are the external
//! assembler's concern; everything here stays symbolic and serializes
//! to JSON via serde.
//!
//! The [`Emitter`] trait is the output seam. [`ClassBuilder`] is the
//! built-in implementation recording a [`ModuleDef`]; [`compile`] wires
//! the two together for the common case.

#![warn(missing_docs)]

pub mod emitter;
pub mod error;
pub mod gen;
pub mod module;
pub mod opcode;

pub use emitter::{ClassBuilder, Emitter};
pub use error::EmitError;
pub use gen::{compile, generate};
pub use module::{ExceptionEntry, FieldDef, MethodDef, ModuleDef, TypeDef};
pub use opcode::{Constant, Instruction, Label, Op};
