//! Pre-analysis: type skeletons and member headers
//!
//! Three stages over the unit, all before any method body is looked at:
//! declare every top-level type in source order, resolve supertype
//! clauses, then attach member headers (field types, method signatures
//! with descriptors). A fourth stage finalizes each type and checks that
//! concrete classes implement every inherited abstract method.

use super::Analyzer;
use crate::error::SemanticError;
use juno_ast::{ClassDecl, CompilationUnit, InterfaceDecl, Member, MethodDecl, TypeDecl};
use juno_types::{FieldSignature, MethodSignature, Type, TypeId, TypeSpec};

impl Analyzer<'_> {
    pub(crate) fn pre_analyze(&mut self, unit: &mut CompilationUnit) {
        // Stage 1: skeletons, in source order.
        for decl in &mut unit.types {
            match decl {
                TypeDecl::Class(c) => self.declare_class_skeleton(c),
                TypeDecl::Interface(i) => self.declare_interface_skeleton(i),
            }
        }

        // Stage 2: supertype clauses. Every sibling skeleton now exists.
        for decl in &mut unit.types {
            match decl {
                TypeDecl::Class(c) => self.resolve_class_supers(c),
                TypeDecl::Interface(i) => self.resolve_interface_supers(i),
            }
        }

        // Stage 3: member headers.
        for decl in &mut unit.types {
            match decl {
                TypeDecl::Class(c) => self.attach_class_members(c),
                TypeDecl::Interface(i) => self.attach_interface_members(i),
            }
        }

        // Stage 4: finalize and check abstract coverage.
        for decl in &unit.types {
            let id = match decl {
                TypeDecl::Class(c) => c.ty,
                TypeDecl::Interface(i) => i.ty,
            };
            if let Some(id) = id {
                self.registry.finalize_type(id);
            }
        }
        for decl in &unit.types {
            if let TypeDecl::Class(c) = decl {
                self.check_abstract_coverage(c);
            }
        }
    }

    fn declare_class_skeleton(&mut self, c: &mut ClassDecl) {
        // Already declared by an earlier run over the same tree;
        // re-analysis keeps the existing registration.
        if c.ty.is_some() {
            return;
        }
        if c.mods.is_abstract && c.mods.is_final {
            self.error(
                c.span,
                SemanticError::IllegalModifierCombination {
                    detail: format!("class {} cannot be both abstract and final", c.name),
                },
            );
        }
        if c.mods.is_public && c.mods.is_private {
            self.error(
                c.span,
                SemanticError::IllegalModifierCombination {
                    detail: format!("class {} cannot be both public and private", c.name),
                },
            );
        }
        match self
            .registry
            .declare_class(&c.name, c.mods.is_abstract, c.mods.is_final)
        {
            Ok(id) => c.ty = Some(id),
            Err(_) => {
                self.error(
                    c.span,
                    SemanticError::DuplicateDeclaration {
                        name: c.name.clone(),
                    },
                );
                c.ty = Some(self.registry.any());
            }
        }
    }

    fn declare_interface_skeleton(&mut self, i: &mut InterfaceDecl) {
        if i.ty.is_some() {
            return;
        }
        match self.registry.declare_interface(&i.name) {
            Ok(id) => i.ty = Some(id),
            Err(_) => {
                self.error(
                    i.span,
                    SemanticError::DuplicateDeclaration {
                        name: i.name.clone(),
                    },
                );
                i.ty = Some(self.registry.any());
            }
        }
    }

    fn resolve_class_supers(&mut self, c: &mut ClassDecl) {
        let Some(id) = c.ty else { return };
        if self.registry.is_finalized(id) {
            return;
        }
        if let Some(spec) = &c.super_spec {
            let spec = spec.clone();
            let super_ty = self.resolve_or_any(&spec, c.span);
            let (is_class, is_final) = match self.registry.get(super_ty) {
                Type::Class(sc) => (true, sc.is_final),
                _ => (false, false),
            };
            if is_class && is_final {
                let name = self.registry.name(super_ty);
                self.error(
                    c.span,
                    SemanticError::IllegalAbstractUse {
                        detail: format!("cannot extend final class {}", name),
                    },
                );
            } else if is_class {
                self.registry.set_super(id, super_ty);
                c.super_ty = Some(super_ty);
            } else if !matches!(self.registry.get(super_ty), Type::Any) {
                let name = self.registry.name(super_ty);
                self.error(
                    c.span,
                    SemanticError::TypeMismatch {
                        expected: "a class".to_string(),
                        actual: name,
                    },
                );
            }
        }
        if c.super_ty.is_none() {
            c.super_ty = Some(self.registry.object());
        }
        for spec in c.interfaces.clone() {
            let iface = self.resolve_or_any(&spec, c.span);
            if self.registry.is_interface(iface) {
                self.registry.add_interface(id, iface);
            } else if !matches!(self.registry.get(iface), Type::Any) {
                let name = self.registry.name(iface);
                self.error(
                    c.span,
                    SemanticError::TypeMismatch {
                        expected: "an interface".to_string(),
                        actual: name,
                    },
                );
            }
        }
    }

    fn resolve_interface_supers(&mut self, i: &mut InterfaceDecl) {
        let Some(id) = i.ty else { return };
        if self.registry.is_finalized(id) {
            return;
        }
        for spec in i.extends.clone() {
            let parent = self.resolve_or_any(&spec, i.span);
            if self.registry.is_interface(parent) {
                self.registry.add_interface(id, parent);
            } else if !matches!(self.registry.get(parent), Type::Any) {
                let name = self.registry.name(parent);
                self.error(
                    i.span,
                    SemanticError::TypeMismatch {
                        expected: "an interface".to_string(),
                        actual: name,
                    },
                );
            }
        }
    }

    fn attach_class_members(&mut self, c: &mut ClassDecl) {
        let Some(id) = c.ty else { return };
        if self.registry.is_finalized(id) {
            return;
        }
        let class_is_abstract = c.mods.is_abstract;
        let class_name = c.name.clone();

        for member in &mut c.members {
            match member {
                Member::Field(f) => {
                    let ty = self.resolve_or_any(&f.ty_spec, f.span);
                    f.ty = Some(ty);
                    if self.field_already_declared(id, &f.name) {
                        self.error(
                            f.span,
                            SemanticError::DuplicateDeclaration {
                                name: f.name.clone(),
                            },
                        );
                        continue;
                    }
                    self.registry.add_field(
                        id,
                        FieldSignature {
                            name: f.name.clone(),
                            ty,
                            is_static: f.mods.is_static,
                        },
                    );
                }
                Member::Method(m) => {
                    self.check_method_modifiers(m, class_is_abstract, &class_name);
                    let sig = self.resolve_method_header(m, false);
                    self.registry.add_method(id, sig);
                }
                Member::Constructor(m) => {
                    m.name = "<init>".to_string();
                    m.return_spec = TypeSpec::Void;
                    if m.mods.is_static || m.mods.is_abstract {
                        self.error(
                            m.span,
                            SemanticError::IllegalModifierCombination {
                                detail: "constructors cannot be static or abstract".to_string(),
                            },
                        );
                    }
                    let sig = self.resolve_method_header(m, false);
                    self.registry.add_method(id, sig);
                }
                Member::InitBlock { .. } => {}
            }
        }

        // Default constructor when none is written.
        if !c.has_explicit_ctor() {
            let void = self.registry.void();
            self.registry.add_method(
                id,
                MethodSignature {
                    name: "<init>".to_string(),
                    params: Vec::new(),
                    return_type: void,
                    throws: Vec::new(),
                    is_static: false,
                    is_abstract: false,
                },
            );
        }
    }

    fn attach_interface_members(&mut self, i: &mut InterfaceDecl) {
        let Some(id) = i.ty else { return };
        if self.registry.is_finalized(id) {
            return;
        }
        for member in &mut i.members {
            match member {
                Member::Field(f) => {
                    // Interface fields live in class storage regardless of
                    // what was written.
                    f.mods.is_static = true;
                    let ty = self.resolve_or_any(&f.ty_spec, f.span);
                    f.ty = Some(ty);
                    if f.init.is_none() {
                        self.error(
                            f.span,
                            SemanticError::IllegalModifierCombination {
                                detail: format!(
                                    "interface field {} must have an initializer",
                                    f.name
                                ),
                            },
                        );
                    }
                    self.registry.add_field(
                        id,
                        FieldSignature {
                            name: f.name.clone(),
                            ty,
                            is_static: true,
                        },
                    );
                }
                Member::Method(m) => {
                    if m.body.is_some() {
                        self.error(
                            m.span,
                            SemanticError::IllegalModifierCombination {
                                detail: format!("interface method {} cannot have a body", m.name),
                            },
                        );
                        m.body = None;
                    }
                    m.mods.is_abstract = true;
                    let sig = self.resolve_method_header(m, true);
                    self.registry.add_method(id, sig);
                }
                Member::Constructor(m) => {
                    self.error(
                        m.span,
                        SemanticError::IllegalModifierCombination {
                            detail: "interfaces cannot declare constructors".to_string(),
                        },
                    );
                }
                Member::InitBlock { span, .. } => {
                    let span = *span;
                    self.error(
                        span,
                        SemanticError::IllegalModifierCombination {
                            detail: "interfaces cannot contain initialization blocks".to_string(),
                        },
                    );
                }
            }
        }
    }

    fn field_already_declared(&self, owner: TypeId, name: &str) -> bool {
        match self.registry.get(owner) {
            Type::Class(c) => c.fields.iter().any(|f| f.name == name),
            Type::Interface(i) => i.fields.iter().any(|f| f.name == name),
            _ => false,
        }
    }

    fn check_method_modifiers(&mut self, m: &mut MethodDecl, class_is_abstract: bool, class_name: &str) {
        if m.mods.is_abstract {
            let conflicting = [
                (m.mods.is_private, "private"),
                (m.mods.is_static, "static"),
                (m.mods.is_final, "final"),
            ];
            for (set, word) in conflicting {
                if set {
                    self.error(
                        m.span,
                        SemanticError::IllegalModifierCombination {
                            detail: format!("abstract method {} cannot be {}", m.name, word),
                        },
                    );
                }
            }
            if m.body.is_some() {
                self.error(
                    m.span,
                    SemanticError::IllegalModifierCombination {
                        detail: format!("abstract method {} cannot have a body", m.name),
                    },
                );
                m.body = None;
            }
            if !class_is_abstract {
                self.error(
                    m.span,
                    SemanticError::IllegalAbstractUse {
                        detail: format!(
                            "class {} must be abstract to declare abstract method {}",
                            class_name, m.name
                        ),
                    },
                );
            }
        } else if m.body.is_none() {
            self.error(
                m.span,
                SemanticError::IllegalModifierCombination {
                    detail: format!("non-abstract method {} must have a body", m.name),
                },
            );
        }
    }

    /// Resolve a method header into a registry signature, filling the
    /// node's resolved types and descriptor along the way.
    fn resolve_method_header(&mut self, m: &mut MethodDecl, in_interface: bool) -> MethodSignature {
        let mut params = Vec::with_capacity(m.params.len());
        for p in &mut m.params {
            let ty = self.resolve_or_any(&p.ty_spec, p.span);
            p.ty = Some(ty);
            params.push(ty);
        }
        let return_type = self.resolve_or_any(&m.return_spec, m.span);
        m.return_ty = Some(return_type);

        let mut throws = Vec::with_capacity(m.throws.len());
        let throwable = self.registry.throwable();
        for spec in m.throws.clone() {
            let ty = self.resolve_or_any(&spec, m.span);
            if !self.registry.is_assignable(ty, throwable) {
                let name = self.registry.name(ty);
                self.error(
                    m.span,
                    SemanticError::TypeMismatch {
                        expected: "a throwable type".to_string(),
                        actual: name,
                    },
                );
            }
            throws.push(ty);
        }
        m.throws_tys = throws.clone();
        m.param_tys = params.clone();
        m.descriptor = Some(self.registry.method_descriptor(&params, return_type));

        MethodSignature {
            name: m.name.clone(),
            params,
            return_type,
            throws,
            is_static: m.mods.is_static,
            is_abstract: m.mods.is_abstract || in_interface,
        }
    }

    fn check_abstract_coverage(&mut self, c: &ClassDecl) {
        let Some(id) = c.ty else { return };
        if c.mods.is_abstract || !matches!(self.registry.get(id), Type::Class(_)) {
            return;
        }
        let missing = self.registry.unimplemented_abstract(id);
        for (owner, sig) in missing {
            let owner_name = self.registry.name(owner);
            self.error(
                c.span,
                SemanticError::IllegalAbstractUse {
                    detail: format!(
                        "class {} must implement abstract method {}.{}",
                        c.name, owner_name, sig.name
                    ),
                },
            );
        }
    }
}
