//! The type registry
//!
//! Interns one [`Type`] per canonical name and answers the queries the
//! analysis and code-generation passes need: resolution of textual type
//! specs, inheritance walks, member lookup, and target-format descriptors.
//!
//! The registry is populated in a fixed order: every top-level type's
//! skeleton is declared (in source order) before any member header is
//! attached, and all member headers are attached before any method body is
//! analyzed. That ordering is what lets sibling declarations reference each
//! other freely.

use crate::error::TypeError;
use crate::ty::{
    ClassType, FieldSignature, InterfaceType, MethodSignature, Type, TypeId, TypeSpec,
};
use rustc_hash::FxHashMap;

/// Qualified name of the root object type.
pub const OBJECT: &str = "java/lang/Object";
/// Qualified name of the string type.
pub const STRING: &str = "java/lang/String";
/// Qualified name of the throwable root.
pub const THROWABLE: &str = "java/lang/Throwable";
/// Qualified name of the general exception class.
pub const EXCEPTION: &str = "java/lang/Exception";

/// The resolved shape of an iterable-capable type, probed once during
/// analysis of a for-each statement and reused unchanged during codegen.
#[derive(Debug, Clone, PartialEq)]
pub struct IteratorProtocol {
    /// Type declaring `iterator()`
    pub iterator_owner: TypeId,
    /// The `iterator()` signature
    pub iterator_sig: MethodSignature,
    /// The iterator type returned by `iterator()`
    pub iterator_ty: TypeId,
    /// Type declaring `hasNext()`
    pub has_next_owner: TypeId,
    /// The `hasNext()` signature
    pub has_next_sig: MethodSignature,
    /// Type declaring `next()`
    pub next_owner: TypeId,
    /// The `next()` signature
    pub next_sig: MethodSignature,
    /// Element type yielded by `next()`
    pub element_ty: TypeId,
}

/// Interning registry for all types of one compilation.
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<Type>,
    by_name: FxHashMap<String, TypeId>,

    int_ty: TypeId,
    double_ty: TypeId,
    char_ty: TypeId,
    boolean_ty: TypeId,
    void_ty: TypeId,
    any_ty: TypeId,
    null_ty: TypeId,
    object_ty: TypeId,
    string_ty: TypeId,
    throwable_ty: TypeId,
    exception_ty: TypeId,
}

impl TypeRegistry {
    /// Create a registry pre-populated with the primitives, the error
    /// sentinel, and the built-in reference types.
    pub fn new() -> Self {
        let mut reg = TypeRegistry {
            types: Vec::new(),
            by_name: FxHashMap::default(),
            int_ty: TypeId(0),
            double_ty: TypeId(0),
            char_ty: TypeId(0),
            boolean_ty: TypeId(0),
            void_ty: TypeId(0),
            any_ty: TypeId(0),
            null_ty: TypeId(0),
            object_ty: TypeId(0),
            string_ty: TypeId(0),
            throwable_ty: TypeId(0),
            exception_ty: TypeId(0),
        };

        reg.int_ty = reg.intern("int", Type::Int);
        reg.double_ty = reg.intern("double", Type::Double);
        reg.char_ty = reg.intern("char", Type::Char);
        reg.boolean_ty = reg.intern("boolean", Type::Boolean);
        reg.void_ty = reg.intern("void", Type::Void);
        reg.any_ty = reg.intern("any", Type::Any);
        reg.null_ty = reg.intern("null", Type::Null);

        reg.object_ty = reg.install_builtin_class(OBJECT, "Object", None);
        reg.string_ty = reg.install_builtin_class(STRING, "String", Some(reg.object_ty));
        reg.throwable_ty = reg.install_builtin_class(THROWABLE, "Throwable", Some(reg.object_ty));
        reg.exception_ty = reg.install_builtin_class(EXCEPTION, "Exception", Some(reg.throwable_ty));

        reg.install_builtin_members();
        reg
    }

    fn intern(&mut self, name: &str, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        self.by_name.insert(name.to_string(), id);
        id
    }

    fn install_builtin_class(
        &mut self,
        qualified: &str,
        simple: &str,
        super_type: Option<TypeId>,
    ) -> TypeId {
        let id = self.intern(
            qualified,
            Type::Class(ClassType {
                name: qualified.to_string(),
                super_type,
                implements: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                is_abstract: false,
                is_final: qualified == STRING,
                finalized: true,
            }),
        );
        self.by_name.insert(simple.to_string(), id);
        id
    }

    fn install_builtin_members(&mut self) {
        let string_ty = self.string_ty;
        let int_ty = self.int_ty;
        let void_ty = self.void_ty;

        let default_ctor = MethodSignature {
            name: "<init>".to_string(),
            params: Vec::new(),
            return_type: void_ty,
            throws: Vec::new(),
            is_static: false,
            is_abstract: false,
        };
        let message_ctor = MethodSignature {
            name: "<init>".to_string(),
            params: vec![string_ty],
            return_type: void_ty,
            throws: Vec::new(),
            is_static: false,
            is_abstract: false,
        };
        let to_string = MethodSignature {
            name: "toString".to_string(),
            params: Vec::new(),
            return_type: string_ty,
            throws: Vec::new(),
            is_static: false,
            is_abstract: false,
        };
        let get_message = MethodSignature {
            name: "getMessage".to_string(),
            params: Vec::new(),
            return_type: string_ty,
            throws: Vec::new(),
            is_static: false,
            is_abstract: false,
        };
        let length = MethodSignature {
            name: "length".to_string(),
            params: Vec::new(),
            return_type: int_ty,
            throws: Vec::new(),
            is_static: false,
            is_abstract: false,
        };

        let object_ty = self.object_ty;
        let throwable_ty = self.throwable_ty;
        let exception_ty = self.exception_ty;

        self.push_method(object_ty, default_ctor.clone());
        self.push_method(object_ty, to_string);
        self.push_method(string_ty, length);
        self.push_method(throwable_ty, default_ctor.clone());
        self.push_method(throwable_ty, message_ctor.clone());
        self.push_method(throwable_ty, get_message);
        self.push_method(exception_ty, default_ctor);
        self.push_method(exception_ty, message_ctor);
    }

    fn push_method(&mut self, owner: TypeId, sig: MethodSignature) {
        match &mut self.types[owner.0 as usize] {
            Type::Class(c) => c.methods.push(sig),
            Type::Interface(i) => i.methods.push(sig),
            _ => {}
        }
    }

    // ---- accessors ----

    /// The `int` type
    pub fn int(&self) -> TypeId {
        self.int_ty
    }
    /// The `double` type
    pub fn double(&self) -> TypeId {
        self.double_ty
    }
    /// The `char` type
    pub fn char_ty(&self) -> TypeId {
        self.char_ty
    }
    /// The `boolean` type
    pub fn boolean(&self) -> TypeId {
        self.boolean_ty
    }
    /// The `void` pseudo-type
    pub fn void(&self) -> TypeId {
        self.void_ty
    }
    /// The `any` error sentinel
    pub fn any(&self) -> TypeId {
        self.any_ty
    }
    /// The type of the `null` literal
    pub fn null(&self) -> TypeId {
        self.null_ty
    }
    /// The root object type
    pub fn object(&self) -> TypeId {
        self.object_ty
    }
    /// The string type
    pub fn string(&self) -> TypeId {
        self.string_ty
    }
    /// The throwable root type
    pub fn throwable(&self) -> TypeId {
        self.throwable_ty
    }
    /// The built-in exception type
    pub fn exception(&self) -> TypeId {
        self.exception_ty
    }

    /// Look at the canonical representation behind a handle.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    /// Canonical display name for a type.
    pub fn name(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Int => "int".to_string(),
            Type::Double => "double".to_string(),
            Type::Char => "char".to_string(),
            Type::Boolean => "boolean".to_string(),
            Type::Void => "void".to_string(),
            Type::Any => "any".to_string(),
            Type::Null => "null".to_string(),
            Type::Array { element } => format!("{}[]", self.name(*element)),
            Type::Class(c) => c.name.clone(),
            Type::Interface(i) => i.name.clone(),
        }
    }

    /// Is the type `int` or `double`?
    pub fn is_numeric(&self, id: TypeId) -> bool {
        self.get(id).is_numeric()
    }

    /// Is the type an interface?
    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.get(id), Type::Interface(_))
    }

    // ---- resolution and declaration ----

    /// Resolve a textual type spec to a canonical handle.
    ///
    /// Idempotent; unknown names produce [`TypeError::UnresolvedType`].
    pub fn resolve(&mut self, spec: &TypeSpec) -> Result<TypeId, TypeError> {
        match spec {
            TypeSpec::Int => Ok(self.int_ty),
            TypeSpec::Double => Ok(self.double_ty),
            TypeSpec::Char => Ok(self.char_ty),
            TypeSpec::Boolean => Ok(self.boolean_ty),
            TypeSpec::Void => Ok(self.void_ty),
            TypeSpec::Named(name) => {
                self.by_name
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| TypeError::UnresolvedType { name: name.clone() })
            }
            TypeSpec::Array(component) => {
                let element = self.resolve(component)?;
                Ok(self.array_of(element))
            }
        }
    }

    /// Intern (or look up) the array type over `element`.
    pub fn array_of(&mut self, element: TypeId) -> TypeId {
        let name = format!("{}[]", self.name(element));
        if let Some(&id) = self.by_name.get(&name) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(Type::Array { element });
        self.by_name.insert(name, id);
        id
    }

    /// Component type of an array, if `id` is one.
    pub fn component(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            Type::Array { element } => Some(*element),
            _ => None,
        }
    }

    /// Declare a class skeleton (pre-analysis, source order). The super
    /// type defaults to the root object type until `set_super` runs.
    pub fn declare_class(
        &mut self,
        name: &str,
        is_abstract: bool,
        is_final: bool,
    ) -> Result<TypeId, TypeError> {
        if self.by_name.contains_key(name) {
            return Err(TypeError::DuplicateType {
                name: name.to_string(),
            });
        }
        Ok(self.intern(
            name,
            Type::Class(ClassType {
                name: name.to_string(),
                super_type: Some(self.object_ty),
                implements: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                is_abstract,
                is_final,
                finalized: false,
            }),
        ))
    }

    /// Declare an interface skeleton (pre-analysis, source order).
    pub fn declare_interface(&mut self, name: &str) -> Result<TypeId, TypeError> {
        if self.by_name.contains_key(name) {
            return Err(TypeError::DuplicateType {
                name: name.to_string(),
            });
        }
        Ok(self.intern(
            name,
            Type::Interface(InterfaceType {
                name: name.to_string(),
                extends: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                finalized: false,
            }),
        ))
    }

    /// Attach the resolved super class to a declared class.
    pub fn set_super(&mut self, class: TypeId, super_type: TypeId) {
        if let Type::Class(c) = &mut self.types[class.0 as usize] {
            c.super_type = Some(super_type);
        }
    }

    /// Attach an implemented (class) or extended (interface) interface.
    pub fn add_interface(&mut self, owner: TypeId, interface: TypeId) {
        match &mut self.types[owner.0 as usize] {
            Type::Class(c) => c.implements.push(interface),
            Type::Interface(i) => i.extends.push(interface),
            _ => {}
        }
    }

    /// Attach a field signature during member-header pre-analysis.
    pub fn add_field(&mut self, owner: TypeId, field: FieldSignature) {
        match &mut self.types[owner.0 as usize] {
            Type::Class(c) => c.fields.push(field),
            Type::Interface(i) => i.fields.push(field),
            _ => {}
        }
    }

    /// Attach a method signature during member-header pre-analysis.
    pub fn add_method(&mut self, owner: TypeId, method: MethodSignature) {
        self.push_method(owner, method);
    }

    /// Has the type's member list been attached and sealed? Primitives
    /// and arrays count as finalized.
    pub fn is_finalized(&self, id: TypeId) -> bool {
        match self.get(id) {
            Type::Class(c) => c.finalized,
            Type::Interface(i) => i.finalized,
            _ => true,
        }
    }

    /// Mark the member list of a declared type as complete.
    pub fn finalize_type(&mut self, id: TypeId) {
        match &mut self.types[id.0 as usize] {
            Type::Class(c) => c.finalized = true,
            Type::Interface(i) => i.finalized = true,
            _ => {}
        }
    }

    // ---- compatibility ----

    /// `sub` is assignable to `sup` iff they are the same type, either is
    /// the `any` sentinel, `sub` is `null` and `sup` a reference type, or
    /// `sub` reaches `sup` along declared `extends`/`implements` edges.
    /// Arrays are invariant but assignable to the root object type.
    pub fn is_assignable(&self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        match (self.get(sub), self.get(sup)) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Null, t) => t.is_reference(),
            (Type::Array { .. }, _) => sup == self.object_ty,
            (Type::Class(_), _) => {
                self.class_reaches(sub, sup)
            }
            (Type::Interface(_), _) => {
                sup == self.object_ty || self.interface_reaches(sub, sup)
            }
            _ => false,
        }
    }

    fn class_reaches(&self, class: TypeId, target: TypeId) -> bool {
        let mut current = Some(class);
        while let Some(id) = current {
            if id == target {
                return true;
            }
            match self.get(id) {
                Type::Class(c) => {
                    for &iface in &c.implements {
                        if iface == target || self.interface_reaches(iface, target) {
                            return true;
                        }
                    }
                    current = c.super_type;
                }
                _ => return false,
            }
        }
        false
    }

    fn interface_reaches(&self, iface: TypeId, target: TypeId) -> bool {
        if iface == target {
            return true;
        }
        match self.get(iface) {
            Type::Interface(i) => i
                .extends
                .iter()
                .any(|&parent| self.interface_reaches(parent, target)),
            _ => false,
        }
    }

    // ---- member lookup ----

    /// Find a field by name, walking the super chain.
    pub fn field_in(&self, owner: TypeId, name: &str) -> Option<(TypeId, FieldSignature)> {
        let mut current = Some(owner);
        while let Some(id) = current {
            match self.get(id) {
                Type::Class(c) => {
                    if let Some(f) = c.fields.iter().find(|f| f.name == name) {
                        return Some((id, f.clone()));
                    }
                    current = c.super_type;
                }
                Type::Interface(i) => {
                    if let Some(f) = i.fields.iter().find(|f| f.name == name) {
                        return Some((id, f.clone()));
                    }
                    for &parent in &i.extends {
                        if let Some(found) = self.field_in(parent, name) {
                            return Some(found);
                        }
                    }
                    return None;
                }
                _ => return None,
            }
        }
        None
    }

    /// Find an applicable method: same name, same arity, each argument
    /// assignable to the corresponding parameter. Walks the super chain
    /// first, then the interface closure.
    pub fn method_in(
        &self,
        owner: TypeId,
        name: &str,
        args: &[TypeId],
    ) -> Option<(TypeId, MethodSignature)> {
        let mut interfaces = Vec::new();
        let mut current = Some(owner);
        while let Some(id) = current {
            match self.get(id) {
                Type::Class(c) => {
                    if let Some(m) = self.applicable(&c.methods, name, args) {
                        return Some((id, m));
                    }
                    interfaces.extend(c.implements.iter().copied());
                    current = c.super_type;
                }
                Type::Interface(i) => {
                    if let Some(m) = self.applicable(&i.methods, name, args) {
                        return Some((id, m));
                    }
                    interfaces.extend(i.extends.iter().copied());
                    current = None;
                }
                _ => return None,
            }
        }
        while let Some(iface) = interfaces.pop() {
            if let Type::Interface(i) = self.get(iface) {
                if let Some(m) = self.applicable(&i.methods, name, args) {
                    return Some((iface, m));
                }
                interfaces.extend(i.extends.iter().copied());
            }
        }
        None
    }

    fn applicable(
        &self,
        methods: &[MethodSignature],
        name: &str,
        args: &[TypeId],
    ) -> Option<MethodSignature> {
        methods
            .iter()
            .find(|m| {
                m.name == name
                    && m.params.len() == args.len()
                    && m.params
                        .iter()
                        .zip(args)
                        .all(|(&p, &a)| self.is_assignable(a, p))
            })
            .cloned()
    }

    /// Find an applicable constructor. Constructors are not inherited, so
    /// only the class's own `<init>` entries are considered.
    pub fn constructor_in(
        &self,
        class: TypeId,
        args: &[TypeId],
    ) -> Option<MethodSignature> {
        match self.get(class) {
            Type::Class(c) => self.applicable(&c.methods, "<init>", args),
            _ => None,
        }
    }

    /// Abstract methods visible on `class` (inherited abstracts plus the
    /// full interface closure) that no class in the chain implements.
    pub fn unimplemented_abstract(&self, class: TypeId) -> Vec<(TypeId, MethodSignature)> {
        let mut pending = Vec::new();

        // Abstract methods along the super chain.
        let mut interfaces = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            match self.get(id) {
                Type::Class(c) => {
                    for m in c.methods.iter().filter(|m| m.is_abstract) {
                        pending.push((id, m.clone()));
                    }
                    interfaces.extend(c.implements.iter().copied());
                    current = c.super_type;
                }
                _ => break,
            }
        }

        // Every interface method is implicitly abstract.
        while let Some(iface) = interfaces.pop() {
            if let Type::Interface(i) = self.get(iface) {
                for m in &i.methods {
                    pending.push((iface, m.clone()));
                }
                interfaces.extend(i.extends.iter().copied());
            }
        }

        pending
            .into_iter()
            .filter(|(_, m)| !self.has_concrete_impl(class, m))
            .collect()
    }

    fn has_concrete_impl(&self, class: TypeId, sig: &MethodSignature) -> bool {
        let mut current = Some(class);
        while let Some(id) = current {
            match self.get(id) {
                Type::Class(c) => {
                    if c.methods.iter().any(|m| {
                        !m.is_abstract && m.name == sig.name && m.params == sig.params
                    }) {
                        return true;
                    }
                    current = c.super_type;
                }
                _ => break,
            }
        }
        false
    }

    /// Probe a collection type for the iterator protocol: an `iterator()`
    /// method whose return type offers `hasNext(): boolean` and `next(): T`.
    pub fn iterator_protocol(&self, collection: TypeId) -> Option<IteratorProtocol> {
        let (iterator_owner, iterator_sig) = self.method_in(collection, "iterator", &[])?;
        let iterator_ty = iterator_sig.return_type;
        let (has_next_owner, has_next_sig) = self.method_in(iterator_ty, "hasNext", &[])?;
        if has_next_sig.return_type != self.boolean_ty {
            return None;
        }
        let (next_owner, next_sig) = self.method_in(iterator_ty, "next", &[])?;
        if next_sig.return_type == self.void_ty {
            return None;
        }
        let element_ty = next_sig.return_type;
        Some(IteratorProtocol {
            iterator_owner,
            iterator_sig,
            iterator_ty,
            has_next_owner,
            has_next_sig,
            next_owner,
            next_sig,
            element_ty,
        })
    }

    // ---- descriptors ----

    /// Target-format descriptor for one type.
    pub fn descriptor(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Int => "I".to_string(),
            Type::Double => "D".to_string(),
            Type::Char => "C".to_string(),
            Type::Boolean => "Z".to_string(),
            Type::Void => "V".to_string(),
            // The sentinels never survive an error-free analysis; map them
            // to the root object type so descriptor building stays total.
            Type::Any | Type::Null => format!("L{};", OBJECT),
            Type::Array { element } => format!("[{}", self.descriptor(*element)),
            Type::Class(c) => format!("L{};", c.name),
            Type::Interface(i) => format!("L{};", i.name),
        }
    }

    /// Target-format descriptor for a method signature.
    pub fn method_descriptor(&self, params: &[TypeId], return_type: TypeId) -> String {
        let mut descriptor = String::from("(");
        for &p in params {
            descriptor.push_str(&self.descriptor(p));
        }
        descriptor.push(')');
        descriptor.push_str(&self.descriptor(return_type));
        descriptor
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
