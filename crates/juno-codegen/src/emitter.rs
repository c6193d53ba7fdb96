//! The emitter boundary
//!
//! [`Emitter`] is the seam between the code generator and whatever
//! consumes the instructions. The walker only ever talks to this trait;
//! [`ClassBuilder`] is the in-crate implementation that records a
//! symbolic [`ModuleDef`]. A binary assembler would be another
//! implementation, out of scope here.

use crate::error::EmitError;
use crate::module::{ExceptionEntry, FieldDef, MethodDef, ModuleDef, TypeDef};
use crate::opcode::{Constant, Instruction, Label, Op};
use rustc_hash::FxHashSet;

/// Receives the output of code generation, one type at a time.
///
/// Calls arrive in a fixed shape: `begin_type`, then field declarations
/// and methods (each bracketed by `begin_method`/`finish_method`, with
/// instruction emits in between), then `finish_type`. Labels are created
/// and placed within one method; a label is placed exactly once.
pub trait Emitter {
    /// Open a type definition.
    fn begin_type(
        &mut self,
        name: &str,
        super_name: Option<&str>,
        interfaces: &[String],
        is_interface: bool,
        is_abstract: bool,
    );

    /// Declare a field on the open type.
    fn declare_field(&mut self, name: &str, descriptor: &str, is_static: bool);

    /// Open a method body on the open type.
    fn begin_method(&mut self, name: &str, descriptor: &str, is_static: bool, throws: &[String]);

    /// Declare an abstract method (no body) on the open type.
    fn declare_abstract_method(&mut self, name: &str, descriptor: &str, throws: &[String]);

    /// Seal the open method.
    fn finish_method(&mut self);

    /// Emit a no-operand instruction.
    fn emit(&mut self, op: Op);

    /// Emit a local-slot instruction.
    fn emit_slot(&mut self, op: Op, slot: u32);

    /// Emit an in-place int increment of a local slot.
    fn emit_inc(&mut self, slot: u32, delta: i32);

    /// Emit a constant push.
    fn emit_ldc(&mut self, constant: Constant);

    /// Emit a type-operand instruction.
    fn emit_type_ref(&mut self, op: Op, name: &str);

    /// Emit a member-operand instruction.
    fn emit_member_ref(&mut self, op: Op, owner: &str, name: &str, descriptor: &str);

    /// Emit a branch to a label.
    fn emit_branch(&mut self, op: Op, target: Label);

    /// Mint a fresh label.
    fn create_label(&mut self) -> Label;

    /// Pin a label to the current position in the stream.
    fn place_label(&mut self, label: Label);

    /// Register an exception handler over `[start, end)`. A `None` catch
    /// type catches everything.
    fn register_handler(&mut self, start: Label, end: Label, handler: Label, catch_type: Option<&str>);

    /// Seal the open type.
    fn finish_type(&mut self);
}

/// Records emitted code as a symbolic [`ModuleDef`].
#[derive(Debug, Default)]
pub struct ClassBuilder {
    module: ModuleDef,
    current_type: Option<TypeDef>,
    current_method: Option<MethodDef>,
    next_label: u32,
    misused: Option<&'static str>,
}

impl ClassBuilder {
    /// Fresh builder for one compilation unit.
    pub fn new() -> Self {
        ClassBuilder::default()
    }

    fn push(&mut self, instruction: Instruction) {
        match &mut self.current_method {
            Some(m) => m.code.push(instruction),
            None => self.misused = Some("method"),
        }
    }

    /// Seal the module, validating that every referenced label was
    /// placed and that no emit arrived outside its scope.
    pub fn finish_module(mut self) -> Result<ModuleDef, EmitError> {
        if let Some(m) = self.current_method.take() {
            if let Some(t) = &mut self.current_type {
                t.methods.push(m);
            }
        }
        if let Some(t) = self.current_type.take() {
            self.module.types.push(t);
        }
        if let Some(scope) = self.misused {
            return Err(EmitError::NoOpenScope { scope });
        }
        for ty in &self.module.types {
            for method in &ty.methods {
                let placed: FxHashSet<Label> = method
                    .code
                    .iter()
                    .filter_map(|i| match i {
                        Instruction::Label(l) => Some(*l),
                        _ => None,
                    })
                    .collect();
                let mut referenced: Vec<Label> = method
                    .code
                    .iter()
                    .filter_map(|i| match i {
                        Instruction::Branch { target, .. } => Some(*target),
                        _ => None,
                    })
                    .collect();
                for entry in &method.exception_table {
                    referenced.extend([entry.start, entry.end, entry.handler]);
                }
                for label in referenced {
                    if !placed.contains(&label) {
                        return Err(EmitError::UnplacedLabel { label });
                    }
                }
            }
        }
        Ok(self.module)
    }
}

impl Emitter for ClassBuilder {
    fn begin_type(
        &mut self,
        name: &str,
        super_name: Option<&str>,
        interfaces: &[String],
        is_interface: bool,
        is_abstract: bool,
    ) {
        if let Some(t) = self.current_type.take() {
            self.module.types.push(t);
        }
        self.current_type = Some(TypeDef {
            name: name.to_string(),
            super_name: super_name.map(str::to_string),
            interfaces: interfaces.to_vec(),
            is_interface,
            is_abstract,
            fields: Vec::new(),
            methods: Vec::new(),
        });
    }

    fn declare_field(&mut self, name: &str, descriptor: &str, is_static: bool) {
        match &mut self.current_type {
            Some(t) => t.fields.push(FieldDef {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
                is_static,
            }),
            None => self.misused = Some("type"),
        }
    }

    fn begin_method(&mut self, name: &str, descriptor: &str, is_static: bool, throws: &[String]) {
        if let Some(m) = self.current_method.take() {
            if let Some(t) = &mut self.current_type {
                t.methods.push(m);
            }
        }
        self.current_method = Some(MethodDef {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            is_static,
            is_abstract: false,
            throws: throws.to_vec(),
            code: Vec::new(),
            exception_table: Vec::new(),
        });
    }

    fn declare_abstract_method(&mut self, name: &str, descriptor: &str, throws: &[String]) {
        match &mut self.current_type {
            Some(t) => t.methods.push(MethodDef {
                name: name.to_string(),
                descriptor: descriptor.to_string(),
                is_static: false,
                is_abstract: true,
                throws: throws.to_vec(),
                code: Vec::new(),
                exception_table: Vec::new(),
            }),
            None => self.misused = Some("type"),
        }
    }

    fn finish_method(&mut self) {
        match self.current_method.take() {
            Some(m) => match &mut self.current_type {
                Some(t) => t.methods.push(m),
                None => self.misused = Some("type"),
            },
            None => self.misused = Some("method"),
        }
    }

    fn emit(&mut self, op: Op) {
        self.push(Instruction::Simple(op));
    }

    fn emit_slot(&mut self, op: Op, slot: u32) {
        self.push(Instruction::Slot { op, slot });
    }

    fn emit_inc(&mut self, slot: u32, delta: i32) {
        self.push(Instruction::Inc { slot, delta });
    }

    fn emit_ldc(&mut self, constant: Constant) {
        self.push(Instruction::Ldc(constant));
    }

    fn emit_type_ref(&mut self, op: Op, name: &str) {
        self.push(Instruction::TypeRef {
            op,
            name: name.to_string(),
        });
    }

    fn emit_member_ref(&mut self, op: Op, owner: &str, name: &str, descriptor: &str) {
        self.push(Instruction::MemberRef {
            op,
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
        });
    }

    fn emit_branch(&mut self, op: Op, target: Label) {
        self.push(Instruction::Branch { op, target });
    }

    fn create_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    fn place_label(&mut self, label: Label) {
        self.push(Instruction::Label(label));
    }

    fn register_handler(
        &mut self,
        start: Label,
        end: Label,
        handler: Label,
        catch_type: Option<&str>,
    ) {
        match &mut self.current_method {
            Some(m) => m.exception_table.push(ExceptionEntry {
                start,
                end,
                handler,
                catch_type: catch_type.map(str::to_string),
            }),
            None => self.misused = Some("method"),
        }
    }

    fn finish_type(&mut self) {
        if let Some(m) = self.current_method.take() {
            if let Some(t) = &mut self.current_type {
                t.methods.push(m);
            }
        }
        match self.current_type.take() {
            Some(t) => self.module.types.push(t),
            None => self.misused = Some("type"),
        }
    }
}
