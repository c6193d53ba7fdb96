//! Core type definitions for the Juno type system

use std::fmt;

/// Unique identifier for a type in the type registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub(crate) u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// A textual, not-yet-resolved type as written in source.
///
/// The parser produces these; `TypeRegistry::resolve` turns them into
/// canonical [`TypeId`] handles. Resolution is idempotent: resolving the
/// same spec twice yields the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSpec {
    /// The `int` primitive
    Int,
    /// The `double` primitive
    Double,
    /// The `char` primitive (int-backed)
    Char,
    /// The `boolean` primitive
    Boolean,
    /// The `void` pseudo-type (method returns only)
    Void,
    /// A named class or interface type, simple or qualified
    Named(String),
    /// An array of some component type
    Array(Box<TypeSpec>),
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Int => write!(f, "int"),
            TypeSpec::Double => write!(f, "double"),
            TypeSpec::Char => write!(f, "char"),
            TypeSpec::Boolean => write!(f, "boolean"),
            TypeSpec::Void => write!(f, "void"),
            TypeSpec::Named(name) => write!(f, "{}", name),
            TypeSpec::Array(component) => write!(f, "{}[]", component),
        }
    }
}

/// A field signature on a class or interface type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSignature {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: TypeId,
    /// Whether the field lives in class (static) storage
    pub is_static: bool,
}

/// A method signature on a class or interface type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    /// Method name (`<init>` for constructors)
    pub name: String,
    /// Parameter types, in order
    pub params: Vec<TypeId>,
    /// Return type (`void` allowed)
    pub return_type: TypeId,
    /// Declared thrown exception types
    pub throws: Vec<TypeId>,
    /// Whether the method is static
    pub is_static: bool,
    /// Whether the method is abstract (no body)
    pub is_abstract: bool,
}

/// A class type (nominal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassType {
    /// Qualified class name
    pub name: String,
    /// Super class; `None` only for the root object type
    pub super_type: Option<TypeId>,
    /// Implemented interfaces
    pub implements: Vec<TypeId>,
    /// Declared fields
    pub fields: Vec<FieldSignature>,
    /// Declared methods (including constructors as `<init>`)
    pub methods: Vec<MethodSignature>,
    /// Whether the class is abstract
    pub is_abstract: bool,
    /// Whether the class is final (cannot be extended)
    pub is_final: bool,
    /// Set once the member list is attached at the end of pre-analysis
    pub finalized: bool,
}

/// An interface type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceType {
    /// Qualified interface name
    pub name: String,
    /// Extended interfaces
    pub extends: Vec<TypeId>,
    /// Declared fields (static only)
    pub fields: Vec<FieldSignature>,
    /// Declared methods (all abstract)
    pub methods: Vec<MethodSignature>,
    /// Set once the member list is attached at the end of pre-analysis
    pub finalized: bool,
}

/// The canonical type representation.
///
/// Two values denote the same type iff their canonical names are equal,
/// which the registry guarantees by interning: one `Type` per distinct
/// name, addressed by [`TypeId`].
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// The `int` primitive
    Int,
    /// The `double` primitive
    Double,
    /// The `char` primitive (int-backed, not numeric for promotion)
    Char,
    /// The `boolean` primitive
    Boolean,
    /// The `void` pseudo-type
    Void,
    /// Sentinel substituted after a semantic error; matches everything
    Any,
    /// The type of the `null` literal; assignable to any reference type
    Null,
    /// An array type
    Array {
        /// Component type
        element: TypeId,
    },
    /// A class type
    Class(ClassType),
    /// An interface type
    Interface(InterfaceType),
}

impl Type {
    /// Is this `int` or `double`? (`char` is deliberately excluded from
    /// numeric promotion.)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Double)
    }

    /// Is this a primitive (non-reference, non-sentinel) type?
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Type::Int | Type::Double | Type::Char | Type::Boolean
        )
    }

    /// Is this a reference type (array, class, interface, or null)?
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Array { .. } | Type::Class(_) | Type::Interface(_) | Type::Null
        )
    }

    /// Is this the `any` error sentinel?
    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// Get the class representation, if this is a class
    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Get the interface representation, if this is an interface
    pub fn as_interface(&self) -> Option<&InterfaceType> {
        match self {
            Type::Interface(i) => Some(i),
            _ => None,
        }
    }
}
