//! Juno abstract syntax tree
//!
//! The tree the parser hands to semantic analysis. Nodes carry slots for
//! the facts analysis computes (types, local slots, resolved member
//! references, loop lowerings); the parser leaves those `None` and the
//! analysis pass fills them in place before code generation reads them.

pub mod decl;
pub mod expr;
pub mod op;
pub mod span;
pub mod stmt;

pub use decl::{
    ClassDecl, CompilationUnit, FieldDecl, FormalParam, InterfaceDecl, Member, MethodDecl,
    Modifiers, TypeDecl,
};
pub use expr::{Dispatch, Expr, FieldRef, LValue, Literal, MethodRef};
pub use op::{AssignOp, BinaryOp, UnaryOp};
pub use span::Span;
pub use stmt::{Block, CatchClause, ForEachLowering, ForEachStmt, Stmt, TryStmt, VarDecl};
