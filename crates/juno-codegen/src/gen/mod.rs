//! The code generation pass
//!
//! Walks an analyzed tree and drives an [`Emitter`]. The walker reads
//! only the annotations analysis filled in (types, slots, l-values,
//! resolved members, loop lowerings); it performs no name resolution of
//! its own. Generating from a tree that still carries diagnostics is a
//! driver bug and surfaces as [`EmitError::MissingAnnotation`].

mod expr;
mod stmt;

use crate::emitter::{ClassBuilder, Emitter};
use crate::error::EmitError;
use crate::module::ModuleDef;
use crate::opcode::Op;
use juno_ast::{Block, ClassDecl, CompilationUnit, Expr, InterfaceDecl, Member, MethodDecl, TypeDecl};
use juno_types::{TypeId, TypeRegistry};

/// Generate code for a whole compilation unit into `emitter`.
pub fn generate<E: Emitter>(
    unit: &CompilationUnit,
    registry: &TypeRegistry,
    emitter: &mut E,
) -> Result<(), EmitError> {
    let mut gen = CodeGen {
        registry,
        emitter,
        finally_blocks: Vec::new(),
    };
    for decl in &unit.types {
        match decl {
            TypeDecl::Class(c) => gen.gen_class(c)?,
            TypeDecl::Interface(i) => gen.gen_interface(i)?,
        }
    }
    Ok(())
}

/// Generate a symbolic module for a whole compilation unit.
pub fn compile(unit: &CompilationUnit, registry: &TypeRegistry) -> Result<ModuleDef, EmitError> {
    let mut builder = ClassBuilder::new();
    generate(unit, registry, &mut builder)?;
    builder.finish_module()
}

pub(crate) struct CodeGen<'a, E: Emitter> {
    pub(crate) registry: &'a TypeRegistry,
    pub(crate) emitter: &'a mut E,
    /// Finally blocks of the enclosing try statements, outermost first.
    /// A return emits a copy of each before leaving the method.
    pub(crate) finally_blocks: Vec<&'a Block>,
}

impl<'a, E: Emitter> CodeGen<'a, E> {
    pub(crate) fn expr_ty(&self, e: &Expr) -> Result<TypeId, EmitError> {
        e.ty().ok_or(EmitError::MissingAnnotation {
            what: "expression type",
        })
    }

    fn gen_class(&mut self, c: &'a ClassDecl) -> Result<(), EmitError> {
        let id = c.ty.ok_or(EmitError::MissingAnnotation { what: "class type" })?;
        let super_ty = c.super_ty.ok_or(EmitError::MissingAnnotation {
            what: "super class type",
        })?;
        let name = self.registry.name(id);
        let super_name = self.registry.name(super_ty);
        let interfaces: Vec<String> = self
            .registry
            .get(id)
            .as_class()
            .map(|cl| cl.implements.iter().map(|&i| self.registry.name(i)).collect())
            .unwrap_or_default();
        self.emitter
            .begin_type(&name, Some(&super_name), &interfaces, false, c.mods.is_abstract);

        for member in &c.members {
            if let Member::Field(f) = member {
                let ty = f.ty.ok_or(EmitError::MissingAnnotation { what: "field type" })?;
                let descriptor = self.registry.descriptor(ty);
                self.emitter
                    .declare_field(&f.name, &descriptor, f.mods.is_static);
            }
        }

        let mut has_ctor = false;
        for member in &c.members {
            match member {
                Member::Method(m) if m.mods.is_abstract => {
                    let descriptor = m.descriptor.as_deref().ok_or(
                        EmitError::MissingAnnotation {
                            what: "method descriptor",
                        },
                    )?;
                    let throws = self.throws_names(m);
                    self.emitter
                        .declare_abstract_method(&m.name, descriptor, &throws);
                }
                Member::Method(m) => self.gen_method(c, m, false)?,
                Member::Constructor(m) => {
                    has_ctor = true;
                    self.gen_method(c, m, true)?;
                }
                _ => {}
            }
        }

        if !has_ctor {
            self.gen_default_ctor(c)?;
        }
        self.gen_clinit(c)?;

        self.emitter.finish_type();
        Ok(())
    }

    fn gen_interface(&mut self, i: &'a InterfaceDecl) -> Result<(), EmitError> {
        let id = i.ty.ok_or(EmitError::MissingAnnotation {
            what: "interface type",
        })?;
        let name = self.registry.name(id);
        let extends: Vec<String> = self
            .registry
            .get(id)
            .as_interface()
            .map(|it| it.extends.iter().map(|&p| self.registry.name(p)).collect())
            .unwrap_or_default();
        self.emitter.begin_type(&name, None, &extends, true, true);

        let mut has_static_init = false;
        for member in &i.members {
            match member {
                Member::Field(f) => {
                    let ty = f.ty.ok_or(EmitError::MissingAnnotation { what: "field type" })?;
                    let descriptor = self.registry.descriptor(ty);
                    self.emitter.declare_field(&f.name, &descriptor, true);
                    has_static_init |= f.init.is_some();
                }
                Member::Method(m) => {
                    let descriptor = m.descriptor.as_deref().ok_or(
                        EmitError::MissingAnnotation {
                            what: "method descriptor",
                        },
                    )?;
                    let throws = self.throws_names(m);
                    self.emitter
                        .declare_abstract_method(&m.name, descriptor, &throws);
                }
                _ => {}
            }
        }

        // Interface constant initializers run in the class initializer.
        if has_static_init {
            self.emitter.begin_method("<clinit>", "()V", true, &[]);
            for member in &i.members {
                if let Member::Field(f) = member {
                    self.gen_static_field_init(&name, f)?;
                }
            }
            self.emitter.emit(Op::Return);
            self.emitter.finish_method();
        }

        self.emitter.finish_type();
        Ok(())
    }

    fn throws_names(&self, m: &MethodDecl) -> Vec<String> {
        m.throws_tys.iter().map(|&t| self.registry.name(t)).collect()
    }

    fn gen_method(&mut self, c: &'a ClassDecl, m: &'a MethodDecl, is_ctor: bool) -> Result<(), EmitError> {
        let descriptor = m.descriptor.as_deref().ok_or(EmitError::MissingAnnotation {
            what: "method descriptor",
        })?;
        let throws = self.throws_names(m);
        self.emitter
            .begin_method(&m.name, descriptor, m.mods.is_static, &throws);

        if is_ctor {
            self.gen_ctor_prologue(c)?;
        }
        if let Some(body) = &m.body {
            for stmt in &body.stmts {
                self.gen_stmt(stmt)?;
            }
        }

        let return_ty = m.return_ty.ok_or(EmitError::MissingAnnotation {
            what: "method return type",
        })?;
        if return_ty == self.registry.void() {
            self.emitter.emit(Op::Return);
        }

        self.emitter.finish_method();
        Ok(())
    }

    /// Call the super constructor, then run the instance field
    /// initializers and instance init blocks in declaration order.
    fn gen_ctor_prologue(&mut self, c: &'a ClassDecl) -> Result<(), EmitError> {
        let super_ty = c.super_ty.ok_or(EmitError::MissingAnnotation {
            what: "super class type",
        })?;
        let super_name = self.registry.name(super_ty);
        self.emitter.emit_slot(Op::LoadLocal, 0);
        self.emitter
            .emit_member_ref(Op::InvokeSpecial, &super_name, "<init>", "()V");

        let class_id = c.ty.ok_or(EmitError::MissingAnnotation { what: "class type" })?;
        let class_name = self.registry.name(class_id);
        for member in &c.members {
            match member {
                Member::Field(f) if !f.mods.is_static => {
                    if let Some(init) = &f.init {
                        let ty = f.ty.ok_or(EmitError::MissingAnnotation { what: "field type" })?;
                        let descriptor = self.registry.descriptor(ty);
                        self.emitter.emit_slot(Op::LoadLocal, 0);
                        self.gen_value(init)?;
                        self.emitter
                            .emit_member_ref(Op::PutField, &class_name, &f.name, &descriptor);
                    }
                }
                Member::InitBlock {
                    is_static: false,
                    body,
                    ..
                } => {
                    self.gen_block(body)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// A class without a written constructor gets the zero-argument one.
    fn gen_default_ctor(&mut self, c: &'a ClassDecl) -> Result<(), EmitError> {
        self.emitter.begin_method("<init>", "()V", false, &[]);
        self.gen_ctor_prologue(c)?;
        self.emitter.emit(Op::Return);
        self.emitter.finish_method();
        Ok(())
    }

    /// Static field initializers and static init blocks go to `<clinit>`,
    /// in declaration order. No `<clinit>` is produced when there are none.
    fn gen_clinit(&mut self, c: &'a ClassDecl) -> Result<(), EmitError> {
        let needs_clinit = c.members.iter().any(|m| match m {
            Member::Field(f) => f.mods.is_static && f.init.is_some(),
            Member::InitBlock { is_static, .. } => *is_static,
            _ => false,
        });
        if !needs_clinit {
            return Ok(());
        }

        let class_id = c.ty.ok_or(EmitError::MissingAnnotation { what: "class type" })?;
        let class_name = self.registry.name(class_id);
        self.emitter.begin_method("<clinit>", "()V", true, &[]);
        for member in &c.members {
            match member {
                Member::Field(f) if f.mods.is_static => {
                    self.gen_static_field_init(&class_name, f)?;
                }
                Member::InitBlock {
                    is_static: true,
                    body,
                    ..
                } => {
                    self.gen_block(body)?;
                }
                _ => {}
            }
        }
        self.emitter.emit(Op::Return);
        self.emitter.finish_method();
        Ok(())
    }

    fn gen_static_field_init(
        &mut self,
        class_name: &str,
        f: &'a juno_ast::FieldDecl,
    ) -> Result<(), EmitError> {
        if let Some(init) = &f.init {
            let ty = f.ty.ok_or(EmitError::MissingAnnotation { what: "field type" })?;
            let descriptor = self.registry.descriptor(ty);
            self.gen_value(init)?;
            self.emitter
                .emit_member_ref(Op::PutStatic, class_name, &f.name, &descriptor);
        }
        Ok(())
    }
}
