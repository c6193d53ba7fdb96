//! The symbolic instruction set
//!
//! Instructions for a stack machine with one slot per value (doubles and
//! references included). Branch targets stay symbolic labels; turning
//! them into byte offsets is the external assembler's job, along with
//! constant pooling and encoding.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A symbolic branch target. Created and placed through the emitter;
/// never turned into an offset here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Operation codes.
///
/// The conditional compare-branches are type-generic: they pop two values
/// of one type and compare them, so there is no separate double-compare
/// instruction. `IfEq`/`IfNe` test a single int against zero (booleans
/// are ints 0 and 1 on the stack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    // ========================================================================
    // Stack manipulation
    // ========================================================================
    /// Do nothing
    Nop,
    /// Discard the top value
    Pop,
    /// Duplicate the top value
    Dup,
    /// Duplicate the top two values
    Dup2,
    /// Duplicate the top value below the next one
    DupX1,
    /// Duplicate the top value below the next two
    DupX2,
    /// Swap the top two values
    Swap,

    // ========================================================================
    // Int arithmetic (operands and result are ints)
    // ========================================================================
    /// Add
    Iadd,
    /// Subtract
    Isub,
    /// Multiply
    Imul,
    /// Divide, truncating toward zero
    Idiv,
    /// Remainder, sign follows the dividend
    Irem,
    /// Negate
    Ineg,
    /// Shift left
    Ishl,
    /// Arithmetic shift right
    Ishr,
    /// Logical shift right, zero filling
    Iushr,
    /// Bitwise and
    Iand,
    /// Bitwise or
    Ior,
    /// Bitwise xor
    Ixor,

    // ========================================================================
    // Double arithmetic
    // ========================================================================
    /// Add
    Dadd,
    /// Subtract
    Dsub,
    /// Multiply
    Dmul,
    /// Divide
    Ddiv,
    /// Remainder
    Drem,
    /// Negate
    Dneg,

    // ========================================================================
    // Strings
    // ========================================================================
    /// Pop two values, stringify each, push the concatenation
    Sconcat,

    // ========================================================================
    // Arrays
    // ========================================================================
    /// Pop index and array, push the element
    ArrayLoad,
    /// Pop value, index and array, store the element
    ArrayStore,
    /// Pop an array, push its length
    ArrayLength,

    // ========================================================================
    // Locals
    // ========================================================================
    /// Push the value of a local slot
    LoadLocal,
    /// Pop into a local slot
    StoreLocal,

    // ========================================================================
    // Objects and members
    // ========================================================================
    /// Allocate an instance of a named class
    New,
    /// Pop a length, allocate an array of a named component type
    NewArray,
    /// Push an instance field of the popped receiver
    GetField,
    /// Pop value and receiver, store an instance field
    PutField,
    /// Push a static field
    GetStatic,
    /// Pop into a static field
    PutStatic,
    /// Invoke with dynamic dispatch through the receiver's class
    InvokeVirtual,
    /// Invoke a constructor on the popped receiver
    InvokeSpecial,
    /// Invoke with no receiver
    InvokeStatic,
    /// Invoke with dynamic dispatch through an interface
    InvokeInterface,

    // ========================================================================
    // Control transfer
    // ========================================================================
    /// Unconditional branch
    Goto,
    /// Branch if the popped int is zero
    IfEq,
    /// Branch if the popped int is not zero
    IfNe,
    /// Pop two, branch if equal
    IfCmpEq,
    /// Pop two, branch if not equal
    IfCmpNe,
    /// Pop two, branch if first is less
    IfCmpLt,
    /// Pop two, branch if first is less or equal
    IfCmpLe,
    /// Pop two, branch if first is greater
    IfCmpGt,
    /// Pop two, branch if first is greater or equal
    IfCmpGe,

    // ========================================================================
    // Exceptions and returns
    // ========================================================================
    /// Pop a throwable and raise it
    Athrow,
    /// Return from a void method
    Return,
    /// Pop the return value and return it
    ReturnValue,
}

/// A constant operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// An int (also chars and booleans, which are int-backed)
    Int(i32),
    /// A double
    Double(f64),
    /// A string
    Str(String),
    /// The null reference
    Null,
}

/// One instruction of a method body. Labels live inline in the stream;
/// a `Label` entry marks a position, a `Branch` entry refers to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// An operation with no operand
    Simple(Op),
    /// A local-slot operation (`LoadLocal`, `StoreLocal`)
    Slot {
        /// The operation
        op: Op,
        /// The local slot
        slot: u32,
    },
    /// In-place int increment of a local slot
    Inc {
        /// The local slot
        slot: u32,
        /// Signed amount
        delta: i32,
    },
    /// Push a constant
    Ldc(Constant),
    /// An operation naming a type (`New`, `NewArray`)
    TypeRef {
        /// The operation
        op: Op,
        /// Canonical type name
        name: String,
    },
    /// An operation naming a member (field and invoke families)
    MemberRef {
        /// The operation
        op: Op,
        /// Canonical name of the declaring type
        owner: String,
        /// Member name
        name: String,
        /// Member descriptor
        descriptor: String,
    },
    /// A branch to a label
    Branch {
        /// The operation
        op: Op,
        /// The target
        target: Label,
    },
    /// Marks the position of a label in the stream
    Label(Label),
}
