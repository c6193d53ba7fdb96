//! Declaration AST nodes: compilation units, classes, interfaces, members

use crate::expr::Expr;
use crate::span::Span;
use crate::stmt::Block;
use juno_types::{TypeId, TypeSpec};

/// One source file: an optional package and its top-level types, in
/// source order. Pre-analysis declares every type's skeleton in this
/// order before any member is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    /// Package name, if declared
    pub package: Option<String>,
    /// Top-level type declarations in source order
    pub types: Vec<TypeDecl>,
}

/// A top-level type declaration
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDecl {
    /// A class
    Class(ClassDecl),
    /// An interface
    Interface(InterfaceDecl),
}

impl TypeDecl {
    /// The declared name.
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Class(c) => &c.name,
            TypeDecl::Interface(i) => &i.name,
        }
    }
}

/// Declaration modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// `public`
    pub is_public: bool,
    /// `private`
    pub is_private: bool,
    /// `static`
    pub is_static: bool,
    /// `abstract`
    pub is_abstract: bool,
    /// `final`
    pub is_final: bool,
}

/// Class declaration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    /// Modifiers as written
    pub mods: Modifiers,
    /// Simple class name
    pub name: String,
    /// Extends clause; absent means the root object type
    pub super_spec: Option<TypeSpec>,
    /// Implements clause
    pub interfaces: Vec<TypeSpec>,
    /// Members in source order
    pub members: Vec<Member>,
    /// Source location
    pub span: Span,
    /// This class's type, filled by pre-analysis
    pub ty: Option<TypeId>,
    /// Resolved super class, filled by pre-analysis
    pub super_ty: Option<TypeId>,
}

impl ClassDecl {
    /// Does the class declare any constructor of its own? When not,
    /// pre-analysis synthesizes the no-argument default.
    pub fn has_explicit_ctor(&self) -> bool {
        self.members
            .iter()
            .any(|m| matches!(m, Member::Constructor(_)))
    }
}

/// Interface declaration. Interface methods are implicitly abstract;
/// interface fields are implicitly static.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    /// Modifiers as written
    pub mods: Modifiers,
    /// Simple interface name
    pub name: String,
    /// Extends clause
    pub extends: Vec<TypeSpec>,
    /// Members in source order (fields and abstract methods)
    pub members: Vec<Member>,
    /// Source location
    pub span: Span,
    /// This interface's type, filled by pre-analysis
    pub ty: Option<TypeId>,
}

/// A class or interface member
#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    /// A field
    Field(FieldDecl),
    /// A method
    Method(MethodDecl),
    /// A constructor (name is the class name in source; compiled as `<init>`)
    Constructor(MethodDecl),
    /// An instance or static initialization block
    InitBlock {
        /// `static { ... }` vs `{ ... }`
        is_static: bool,
        /// The block body
        body: Block,
        /// Source location
        span: Span,
    },
}

/// Field declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Modifiers as written
    pub mods: Modifiers,
    /// Field name
    pub name: String,
    /// Declared type as written
    pub ty_spec: TypeSpec,
    /// Initializer, if present (compiled into `<init>` or `<clinit>`)
    pub init: Option<Expr>,
    /// Source location
    pub span: Span,
    /// Resolved type, filled by pre-analysis
    pub ty: Option<TypeId>,
}

/// Method or constructor declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    /// Modifiers as written
    pub mods: Modifiers,
    /// Method name (`<init>` after constructor normalization)
    pub name: String,
    /// Formal parameters
    pub params: Vec<FormalParam>,
    /// Return type as written (`void` for constructors)
    pub return_spec: TypeSpec,
    /// Declared throws clause
    pub throws: Vec<TypeSpec>,
    /// Body; absent for abstract and interface methods
    pub body: Option<Block>,
    /// Source location
    pub span: Span,
    /// Resolved return type, filled by pre-analysis
    pub return_ty: Option<TypeId>,
    /// Resolved parameter types, filled by pre-analysis
    pub param_tys: Vec<TypeId>,
    /// Resolved throws types, filled by pre-analysis
    pub throws_tys: Vec<TypeId>,
    /// Target-format descriptor, filled by pre-analysis
    pub descriptor: Option<String>,
}

/// Formal method parameter
#[derive(Debug, Clone, PartialEq)]
pub struct FormalParam {
    /// Parameter name
    pub name: String,
    /// Declared type as written
    pub ty_spec: TypeSpec,
    /// Source location
    pub span: Span,
    /// Resolved type, filled by pre-analysis
    pub ty: Option<TypeId>,
    /// Allocated local slot, filled by analysis
    pub slot: Option<u32>,
}
