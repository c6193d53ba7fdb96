//! Expression AST nodes
//!
//! Every expression node carries a `ty` slot that analysis fills with the
//! expression's canonical type. Assignable expressions additionally get an
//! [`LValue`] describing where the store lands, and calls/field accesses
//! get resolved member references. Code generation reads these slots and
//! never consults the registry for name lookup again.

use crate::op::{AssignOp, BinaryOp, UnaryOp};
use crate::span::Span;
use juno_types::{TypeId, TypeSpec};

/// Expression (produces a value)
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal constant
    Literal {
        /// The constant value
        value: Literal,
        /// Source location
        span: Span,
        /// Filled by analysis
        ty: Option<TypeId>,
    },

    /// A simple name: local variable or parameter. Names that turn out to
    /// denote fields are rewritten to `FieldAccess` during analysis.
    Var {
        /// The name as written
        name: String,
        /// Source location
        span: Span,
        /// Local slot, filled by analysis
        slot: Option<u32>,
        /// Filled by analysis
        ty: Option<TypeId>,
    },

    /// The receiver reference `this`
    This {
        /// Source location
        span: Span,
        /// Filled by analysis (the enclosing class)
        ty: Option<TypeId>,
    },

    /// Field selection: `target.name` (covers static selection `Type.name`
    /// and the special array `.length`)
    FieldAccess {
        /// The selected-on expression
        target: Box<Expr>,
        /// Field name
        name: String,
        /// Source location
        span: Span,
        /// Filled by analysis
        ty: Option<TypeId>,
        /// Which field, filled by analysis
        resolved: Option<FieldRef>,
    },

    /// Array element: `array[index]`
    ArrayIndex {
        /// The array expression
        array: Box<Expr>,
        /// The `int` index expression
        index: Box<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis (the component type)
        ty: Option<TypeId>,
    },

    /// Method call: `target.name(args)`, `name(args)` (implicit receiver),
    /// or `Type.name(args)` (static)
    Call {
        /// Receiver; `None` until analysis inserts the implicit one
        target: Option<Box<Expr>>,
        /// Method name
        name: String,
        /// Argument expressions
        args: Vec<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis (the return type)
        ty: Option<TypeId>,
        /// Which method, filled by analysis
        resolved: Option<MethodRef>,
    },

    /// Object creation: `new Class(args)`
    New {
        /// The class being instantiated
        class: TypeSpec,
        /// Constructor arguments
        args: Vec<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis
        ty: Option<TypeId>,
        /// Which constructor, filled by analysis
        resolved: Option<MethodRef>,
    },

    /// Array creation: `new T[length]`
    NewArray {
        /// Component type
        element: TypeSpec,
        /// The `int` length expression
        length: Box<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis (the array type)
        ty: Option<TypeId>,
    },

    /// Unary operation. The inc/dec forms require an assignable operand
    /// and carry its resolved [`LValue`].
    Unary {
        /// The operator
        op: UnaryOp,
        /// The operand
        operand: Box<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis
        ty: Option<TypeId>,
        /// For inc/dec: where the store lands, filled by analysis
        lvalue: Option<LValue>,
        /// True when the value is discarded (expression statement)
        is_statement: bool,
    },

    /// Binary operation
    Binary {
        /// The operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<Expr>,
        /// Right operand
        rhs: Box<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis
        ty: Option<TypeId>,
    },

    /// String concatenation, synthesized during analysis from `+` when
    /// either operand is a string. The parser never produces this node,
    /// and analysis produces it at most once per `+`.
    Concat {
        /// Left operand (already analyzed)
        lhs: Box<Expr>,
        /// Right operand (already analyzed)
        rhs: Box<Expr>,
        /// Source location
        span: Span,
        /// Always the string type
        ty: Option<TypeId>,
    },

    /// Conditional expression: `cond ? then : else`
    Ternary {
        /// The `boolean` condition
        cond: Box<Expr>,
        /// Value when true
        then_expr: Box<Expr>,
        /// Value when false
        else_expr: Box<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis (the branches' common type)
        ty: Option<TypeId>,
    },

    /// Assignment, simple or compound
    Assign {
        /// `=` or a compound form
        op: AssignOp,
        /// The assignable target expression
        target: Box<Expr>,
        /// The value being stored
        value: Box<Expr>,
        /// Source location
        span: Span,
        /// Filled by analysis (the target's type)
        ty: Option<TypeId>,
        /// Where the store lands, filled by analysis
        lvalue: Option<LValue>,
        /// True when the value is discarded (expression statement)
        is_statement: bool,
    },
}

impl Expr {
    /// Source location of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. }
            | Expr::Var { span, .. }
            | Expr::This { span, .. }
            | Expr::FieldAccess { span, .. }
            | Expr::ArrayIndex { span, .. }
            | Expr::Call { span, .. }
            | Expr::New { span, .. }
            | Expr::NewArray { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Concat { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Assign { span, .. } => *span,
        }
    }

    /// The type analysis attached, if analysis has run.
    pub fn ty(&self) -> Option<TypeId> {
        match self {
            Expr::Literal { ty, .. }
            | Expr::Var { ty, .. }
            | Expr::This { ty, .. }
            | Expr::FieldAccess { ty, .. }
            | Expr::ArrayIndex { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::New { ty, .. }
            | Expr::NewArray { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Concat { ty, .. }
            | Expr::Ternary { ty, .. }
            | Expr::Assign { ty, .. } => *ty,
        }
    }

    /// Can this expression syntactically appear on the left of `=`?
    pub fn is_assignable_form(&self) -> bool {
        matches!(
            self,
            Expr::Var { .. } | Expr::FieldAccess { .. } | Expr::ArrayIndex { .. }
        )
    }
}

// ============================================================================
// Literals
// ============================================================================

/// A literal constant value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `int` literal
    Int(i32),
    /// `double` literal
    Double(f64),
    /// `char` literal
    Char(char),
    /// String literal
    Str(String),
    /// `true` or `false`
    Bool(bool),
    /// `null`
    Null,
}

// ============================================================================
// Resolved references (filled by analysis)
// ============================================================================

/// How a resolved call is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Dynamic dispatch through the receiver's class
    Virtual,
    /// No receiver
    Static,
    /// Dynamic dispatch through an interface
    Interface,
    /// Constructor invocation
    Special,
}

/// A method call resolved to its declaring type and descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRef {
    /// The type declaring the matched signature
    pub owner: TypeId,
    /// Target-format method descriptor
    pub descriptor: String,
    /// Dispatch kind
    pub dispatch: Dispatch,
}

/// A field access resolved to its declaring type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    /// The type declaring the field
    pub owner: TypeId,
    /// Whether the field lives in class (static) storage
    pub is_static: bool,
    /// True for the built-in array `.length`
    pub is_array_length: bool,
}

/// Where an assignment (or inc/dec) stores its value.
///
/// Resolved once during analysis. This union is closed: every assignable
/// expression form maps to exactly one variant, and code generation
/// matches on it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum LValue {
    /// A local variable or parameter slot
    Local {
        /// The method-local slot
        slot: u32,
        /// Declared type
        ty: TypeId,
    },
    /// An instance field
    Field {
        /// Declaring type
        owner: TypeId,
        /// Field name
        name: String,
        /// Field type
        ty: TypeId,
    },
    /// A static field
    StaticField {
        /// Declaring type
        owner: TypeId,
        /// Field name
        name: String,
        /// Field type
        ty: TypeId,
    },
    /// An array element
    ArrayElem {
        /// Component type
        elem_ty: TypeId,
    },
}

impl LValue {
    /// The type of the stored value.
    pub fn ty(&self) -> TypeId {
        match self {
            LValue::Local { ty, .. }
            | LValue::Field { ty, .. }
            | LValue::StaticField { ty, .. } => *ty,
            LValue::ArrayElem { elem_ty } => *elem_ty,
        }
    }
}
