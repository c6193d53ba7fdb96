//! Statement AST nodes

use crate::expr::Expr;
use crate::span::Span;
use juno_types::{IteratorProtocol, TypeId, TypeSpec};

/// Block-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A nested `{ ... }` block opening a new scope
    Block(Block),

    /// An expression evaluated for effect, value discarded
    Expr {
        /// The expression
        expr: Expr,
        /// Source location
        span: Span,
    },

    /// Local variable declaration
    VarDecl(VarDecl),

    /// If statement, optionally with an else branch
    If {
        /// The `boolean` condition
        cond: Expr,
        /// Taken when true
        then_branch: Box<Stmt>,
        /// Taken when false, if present
        else_branch: Option<Box<Stmt>>,
        /// Source location
        span: Span,
    },

    /// While loop
    While {
        /// The `boolean` condition
        cond: Expr,
        /// Loop body
        body: Box<Stmt>,
        /// Source location
        span: Span,
    },

    /// Basic for loop. The init statements and the loop scope together
    /// open one scope: variables declared in `init` are visible in the
    /// condition, update and body, and nowhere outside.
    For {
        /// Initializers (declarations or expression statements)
        init: Vec<Stmt>,
        /// Condition; absent means always true
        cond: Option<Expr>,
        /// Update expressions, evaluated for effect after each iteration
        update: Vec<Expr>,
        /// Loop body
        body: Box<Stmt>,
        /// Source location
        span: Span,
    },

    /// Enhanced for loop over an array or iterable
    ForEach(ForEachStmt),

    /// Return statement
    Return {
        /// Returned value; absent in `void` methods
        value: Option<Expr>,
        /// Source location
        span: Span,
    },

    /// Throw statement
    Throw {
        /// The thrown expression
        value: Expr,
        /// Source location
        span: Span,
    },

    /// Try statement with catch clauses and/or a finally block
    Try(TryStmt),
}

impl Stmt {
    /// Source location of this statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Block(b) => b.span,
            Stmt::Expr { span, .. }
            | Stmt::If { span, .. }
            | Stmt::While { span, .. }
            | Stmt::For { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::Throw { span, .. } => *span,
            Stmt::VarDecl(d) => d.span,
            Stmt::ForEach(f) => f.span,
            Stmt::Try(t) => t.span,
        }
    }
}

/// A `{ ... }` sequence of statements
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The statements, in order
    pub stmts: Vec<Stmt>,
    /// Source location
    pub span: Span,
}

/// Local variable declaration: `T name = init;`
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    /// Variable name
    pub name: String,
    /// Declared type as written
    pub ty_spec: TypeSpec,
    /// Initializer, if present
    pub init: Option<Expr>,
    /// Source location
    pub span: Span,
    /// Resolved type, filled by analysis
    pub ty: Option<TypeId>,
    /// Allocated local slot, filled by analysis
    pub slot: Option<u32>,
}

/// Enhanced for loop: `for (T name : iterable) body`
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachStmt {
    /// Loop variable name
    pub var_name: String,
    /// Loop variable type as written
    pub var_ty_spec: TypeSpec,
    /// The array or iterable expression
    pub iterable: Expr,
    /// Loop body
    pub body: Block,
    /// Source location
    pub span: Span,
    /// Resolved loop variable type, filled by analysis
    pub var_ty: Option<TypeId>,
    /// Loop variable slot, filled by analysis
    pub var_slot: Option<u32>,
    /// Which lowering applies, decided once during analysis
    pub lowering: Option<ForEachLowering>,
}

/// The lowering strategy for a for-each loop.
///
/// Decided statically during analysis from the iterable's type: arrays get
/// the hidden array-and-index-counter form, everything else goes through
/// the iterator protocol. Code generation never re-decides.
#[derive(Debug, Clone, PartialEq)]
pub enum ForEachLowering {
    /// Index-counter form over an array
    Array {
        /// Hidden slot holding the evaluated array
        array_slot: u32,
        /// Hidden slot holding the index counter
        index_slot: u32,
    },
    /// `iterator()` / `hasNext()` / `next()` form
    Iterator {
        /// Hidden slot holding the iterator object
        iter_slot: u32,
        /// The resolved protocol methods
        protocol: IteratorProtocol,
    },
}

/// Try statement: `try body catch... finally?`
#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    /// The protected block
    pub body: Block,
    /// Catch clauses, tried in order
    pub catches: Vec<CatchClause>,
    /// Finally block, runs on every exit path
    pub finally: Option<Block>,
    /// Source location
    pub span: Span,
    /// Hidden slot parking an in-flight exception while the finally copy
    /// on the abrupt path runs, filled by analysis
    pub finally_slot: Option<u32>,
}

/// One catch clause, possibly a multi-catch (`catch (A | B e)`)
#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// The exception parameter name
    pub param_name: String,
    /// The caught types as written (more than one for multi-catch)
    pub ty_specs: Vec<TypeSpec>,
    /// Clause body
    pub body: Block,
    /// Source location
    pub span: Span,
    /// Resolved parameter type (the single caught type, or the throwable
    /// root for multi-catch), filled by analysis
    pub param_ty: Option<TypeId>,
    /// Parameter slot, filled by analysis
    pub param_slot: Option<u32>,
    /// Resolved caught types, one per spec, filled by analysis
    pub resolved_tys: Vec<TypeId>,
}
