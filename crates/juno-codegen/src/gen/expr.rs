//! Expression lowering
//!
//! Values are generated by `gen_value`, leaving exactly one value on the
//! stack. Boolean-producing expressions in branch position go through
//! `gen_branch` instead, which emits compare-and-branch forms directly
//! and only materializes 0/1 when a boolean is consumed as a value.
//! Assignments and increments follow a fixed l-value protocol: prelude,
//! operand loads, a dup when the surrounding expression consumes the
//! value, then the store.

use crate::emitter::Emitter;
use crate::error::EmitError;
use crate::opcode::{Constant, Label, Op};
use juno_ast::{BinaryOp, Dispatch, Expr, LValue, Literal, UnaryOp};
use juno_types::TypeId;

use super::CodeGen;

impl<'a, E: Emitter> CodeGen<'a, E> {
    pub(crate) fn gen_value(&mut self, e: &'a Expr) -> Result<(), EmitError> {
        match e {
            Expr::Literal { value, .. } => {
                self.emitter.emit_ldc(match value {
                    Literal::Int(v) => Constant::Int(*v),
                    Literal::Double(v) => Constant::Double(*v),
                    Literal::Char(c) => Constant::Int(*c as i32),
                    Literal::Str(s) => Constant::Str(s.clone()),
                    Literal::Bool(b) => Constant::Int(*b as i32),
                    Literal::Null => Constant::Null,
                });
                Ok(())
            }

            Expr::Var { slot, .. } => {
                let slot = slot.ok_or(EmitError::MissingAnnotation {
                    what: "local variable slot",
                })?;
                self.emitter.emit_slot(Op::LoadLocal, slot);
                Ok(())
            }

            Expr::This { .. } => {
                self.emitter.emit_slot(Op::LoadLocal, 0);
                Ok(())
            }

            Expr::FieldAccess {
                target, resolved, name, ..
            } => {
                let fr = resolved.as_ref().ok_or(EmitError::MissingAnnotation {
                    what: "field resolution",
                })?;
                if fr.is_array_length {
                    self.gen_value(target)?;
                    self.emitter.emit(Op::ArrayLength);
                    return Ok(());
                }
                let owner = self.registry.name(fr.owner);
                let descriptor = self.registry.descriptor(self.expr_ty(e)?);
                if fr.is_static {
                    self.emitter
                        .emit_member_ref(Op::GetStatic, &owner, name, &descriptor);
                } else {
                    self.gen_value(target)?;
                    self.emitter
                        .emit_member_ref(Op::GetField, &owner, name, &descriptor);
                }
                Ok(())
            }

            Expr::ArrayIndex { array, index, .. } => {
                self.gen_value(array)?;
                self.gen_value(index)?;
                self.emitter.emit(Op::ArrayLoad);
                Ok(())
            }

            Expr::Call {
                target,
                name,
                args,
                resolved,
                ..
            } => {
                let mr = resolved.as_ref().ok_or(EmitError::MissingAnnotation {
                    what: "method resolution",
                })?;
                let owner = self.registry.name(mr.owner);
                let op = match mr.dispatch {
                    Dispatch::Static => Op::InvokeStatic,
                    Dispatch::Virtual => Op::InvokeVirtual,
                    Dispatch::Interface => Op::InvokeInterface,
                    Dispatch::Special => Op::InvokeSpecial,
                };
                // A static call's target, when present, just names the
                // type; nothing to evaluate.
                if mr.dispatch != Dispatch::Static {
                    if let Some(target) = target {
                        self.gen_value(target)?;
                    }
                }
                for arg in args {
                    self.gen_value(arg)?;
                }
                self.emitter
                    .emit_member_ref(op, &owner, name, &mr.descriptor);
                Ok(())
            }

            Expr::New { args, resolved, .. } => {
                let mr = resolved.as_ref().ok_or(EmitError::MissingAnnotation {
                    what: "constructor resolution",
                })?;
                let owner = self.registry.name(mr.owner);
                self.emitter.emit_type_ref(Op::New, &owner);
                self.emitter.emit(Op::Dup);
                for arg in args {
                    self.gen_value(arg)?;
                }
                self.emitter
                    .emit_member_ref(Op::InvokeSpecial, &owner, "<init>", &mr.descriptor);
                Ok(())
            }

            Expr::NewArray { length, .. } => {
                let array_ty = self.expr_ty(e)?;
                let component = self
                    .registry
                    .component(array_ty)
                    .ok_or(EmitError::MissingAnnotation {
                        what: "array component type",
                    })?;
                let name = self.registry.name(component);
                self.gen_value(length)?;
                self.emitter.emit_type_ref(Op::NewArray, &name);
                Ok(())
            }

            Expr::Unary {
                op,
                operand,
                lvalue,
                is_statement,
                ..
            } => match op {
                // Numeric identity; the operand is the value.
                UnaryOp::Plus => self.gen_value(operand),
                UnaryOp::Neg => {
                    self.gen_value(operand)?;
                    let neg = if self.expr_ty(e)? == self.registry.double() {
                        Op::Dneg
                    } else {
                        Op::Ineg
                    };
                    self.emitter.emit(neg);
                    Ok(())
                }
                UnaryOp::Not => self.materialize_boolean(e),
                UnaryOp::Complement => {
                    self.gen_value(operand)?;
                    self.emitter.emit_ldc(Constant::Int(-1));
                    self.emitter.emit(Op::Ixor);
                    Ok(())
                }
                UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                    let lv = lvalue.as_ref().ok_or(EmitError::MissingAnnotation {
                        what: "increment l-value",
                    })?;
                    self.gen_inc_dec(*op, operand, lv, *is_statement)
                }
            },

            Expr::Binary { op, lhs, rhs, .. } => {
                if op.is_comparison() || matches!(*op, BinaryOp::LAnd | BinaryOp::LOr) {
                    return self.materialize_boolean(e);
                }
                self.gen_value(lhs)?;
                self.gen_value(rhs)?;
                let ty = self.expr_ty(e)?;
                self.emitter.emit(self.arith_op(*op, ty)?);
                Ok(())
            }

            Expr::Concat { lhs, rhs, .. } => {
                self.gen_value(lhs)?;
                self.gen_value(rhs)?;
                self.emitter.emit(Op::Sconcat);
                Ok(())
            }

            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                let else_label = self.emitter.create_label();
                let end = self.emitter.create_label();
                self.gen_branch(cond, else_label, false)?;
                self.gen_value(then_expr)?;
                self.emitter.emit_branch(Op::Goto, end);
                self.emitter.place_label(else_label);
                self.gen_value(else_expr)?;
                self.emitter.place_label(end);
                Ok(())
            }

            Expr::Assign {
                op,
                target,
                value,
                lvalue,
                is_statement,
                ..
            } => {
                let lv = lvalue.as_ref().ok_or(EmitError::MissingAnnotation {
                    what: "assignment l-value",
                })?;
                match op.binary_op() {
                    None => self.gen_simple_assign(target, value, lv, *is_statement),
                    Some(binary) => {
                        self.gen_compound_assign(target, value, lv, binary, *is_statement)
                    }
                }
            }
        }
    }

    // ========================================================================
    // Assignment protocol
    // ========================================================================

    /// Simple `=`. Value first, then a dup shaped for the l-value when
    /// the assignment's own value is consumed, then the store.
    fn gen_simple_assign(
        &mut self,
        target: &'a Expr,
        value: &'a Expr,
        lv: &LValue,
        is_statement: bool,
    ) -> Result<(), EmitError> {
        match lv {
            LValue::Local { slot, .. } => {
                self.gen_value(value)?;
                if !is_statement {
                    self.emitter.emit(Op::Dup);
                }
                self.emitter.emit_slot(Op::StoreLocal, *slot);
            }
            LValue::StaticField { owner, name, ty } => {
                self.gen_value(value)?;
                if !is_statement {
                    self.emitter.emit(Op::Dup);
                }
                self.put_static(*owner, name, *ty);
            }
            LValue::Field { owner, name, ty } => {
                self.gen_field_receiver(target)?;
                self.gen_value(value)?;
                if !is_statement {
                    self.emitter.emit(Op::DupX1);
                }
                self.put_field(*owner, name, *ty);
            }
            LValue::ArrayElem { .. } => {
                let (array, index) = Self::array_index_parts(target)?;
                self.gen_value(array)?;
                self.gen_value(index)?;
                self.gen_value(value)?;
                if !is_statement {
                    self.emitter.emit(Op::DupX2);
                }
                self.emitter.emit(Op::ArrayStore);
            }
        }
        Ok(())
    }

    /// Compound `op=`. Prelude loads the old value (duplicating the
    /// receiver or array/index pair so the store can reuse them), the
    /// operator is applied, then dup-if-consumed and store.
    fn gen_compound_assign(
        &mut self,
        target: &'a Expr,
        value: &'a Expr,
        lv: &LValue,
        binary: BinaryOp,
        is_statement: bool,
    ) -> Result<(), EmitError> {
        let ty = lv.ty();
        match lv {
            LValue::Local { slot, .. } => {
                self.emitter.emit_slot(Op::LoadLocal, *slot);
                self.gen_value(value)?;
                self.emit_compound_op(binary, ty)?;
                if !is_statement {
                    self.emitter.emit(Op::Dup);
                }
                self.emitter.emit_slot(Op::StoreLocal, *slot);
            }
            LValue::StaticField { owner, name, .. } => {
                self.get_static(*owner, name, ty);
                self.gen_value(value)?;
                self.emit_compound_op(binary, ty)?;
                if !is_statement {
                    self.emitter.emit(Op::Dup);
                }
                self.put_static(*owner, name, ty);
            }
            LValue::Field { owner, name, .. } => {
                self.gen_field_receiver(target)?;
                self.emitter.emit(Op::Dup);
                self.get_field(*owner, name, ty);
                self.gen_value(value)?;
                self.emit_compound_op(binary, ty)?;
                if !is_statement {
                    self.emitter.emit(Op::DupX1);
                }
                self.put_field(*owner, name, ty);
            }
            LValue::ArrayElem { .. } => {
                let (array, index) = Self::array_index_parts(target)?;
                self.gen_value(array)?;
                self.gen_value(index)?;
                self.emitter.emit(Op::Dup2);
                self.emitter.emit(Op::ArrayLoad);
                self.gen_value(value)?;
                self.emit_compound_op(binary, ty)?;
                if !is_statement {
                    self.emitter.emit(Op::DupX2);
                }
                self.emitter.emit(Op::ArrayStore);
            }
        }
        Ok(())
    }

    /// Increment and decrement. Int locals get the in-place `Inc` form;
    /// everything else goes through the general l-value protocol with
    /// the old or new value duplicated under the prelude as the operator
    /// position demands.
    fn gen_inc_dec(
        &mut self,
        op: UnaryOp,
        operand: &'a Expr,
        lv: &LValue,
        is_statement: bool,
    ) -> Result<(), EmitError> {
        let ty = lv.ty();
        let delta: i32 = match op {
            UnaryOp::PreInc | UnaryOp::PostInc => 1,
            _ => -1,
        };

        if let LValue::Local { slot, .. } = lv {
            if ty == self.registry.int() {
                if is_statement {
                    self.emitter.emit_inc(*slot, delta);
                } else if op.is_postfix() {
                    self.emitter.emit_slot(Op::LoadLocal, *slot);
                    self.emitter.emit_inc(*slot, delta);
                } else {
                    self.emitter.emit_inc(*slot, delta);
                    self.emitter.emit_slot(Op::LoadLocal, *slot);
                }
                return Ok(());
            }
        }

        // Prelude plus old value.
        match lv {
            LValue::Local { slot, .. } => self.emitter.emit_slot(Op::LoadLocal, *slot),
            LValue::StaticField { owner, name, .. } => self.get_static(*owner, name, ty),
            LValue::Field { owner, name, .. } => {
                self.gen_field_receiver(operand)?;
                self.emitter.emit(Op::Dup);
                self.get_field(*owner, name, ty);
            }
            LValue::ArrayElem { .. } => {
                let (array, index) = Self::array_index_parts(operand)?;
                self.gen_value(array)?;
                self.gen_value(index)?;
                self.emitter.emit(Op::Dup2);
                self.emitter.emit(Op::ArrayLoad);
            }
        }

        let consumed = !is_statement;
        if consumed && op.is_postfix() {
            self.emitter.emit(self.dup_under(lv));
        }

        if ty == self.registry.double() {
            self.emitter.emit_ldc(Constant::Double(1.0));
            self.emitter
                .emit(if delta > 0 { Op::Dadd } else { Op::Dsub });
        } else {
            self.emitter.emit_ldc(Constant::Int(1));
            self.emitter
                .emit(if delta > 0 { Op::Iadd } else { Op::Isub });
        }

        if consumed && !op.is_postfix() {
            self.emitter.emit(self.dup_under(lv));
        }

        match lv {
            LValue::Local { slot, .. } => self.emitter.emit_slot(Op::StoreLocal, *slot),
            LValue::StaticField { owner, name, .. } => self.put_static(*owner, name, ty),
            LValue::Field { owner, name, .. } => self.put_field(*owner, name, ty),
            LValue::ArrayElem { .. } => self.emitter.emit(Op::ArrayStore),
        }
        Ok(())
    }

    /// The dup that tucks a copy of the top value below the l-value's
    /// prelude operands.
    fn dup_under(&self, lv: &LValue) -> Op {
        match lv {
            LValue::Local { .. } | LValue::StaticField { .. } => Op::Dup,
            LValue::Field { .. } => Op::DupX1,
            LValue::ArrayElem { .. } => Op::DupX2,
        }
    }

    /// The receiver expression under an instance-field target.
    fn gen_field_receiver(&mut self, target: &'a Expr) -> Result<(), EmitError> {
        match target {
            Expr::FieldAccess { target, .. } => self.gen_value(target),
            _ => Err(EmitError::MissingAnnotation {
                what: "field assignment target",
            }),
        }
    }

    fn array_index_parts(target: &'a Expr) -> Result<(&'a Expr, &'a Expr), EmitError> {
        match target {
            Expr::ArrayIndex { array, index, .. } => Ok((array, index)),
            _ => Err(EmitError::MissingAnnotation {
                what: "array assignment target",
            }),
        }
    }

    fn get_field(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        let owner = self.registry.name(owner);
        let descriptor = self.registry.descriptor(ty);
        self.emitter
            .emit_member_ref(Op::GetField, &owner, name, &descriptor);
    }

    fn put_field(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        let owner = self.registry.name(owner);
        let descriptor = self.registry.descriptor(ty);
        self.emitter
            .emit_member_ref(Op::PutField, &owner, name, &descriptor);
    }

    fn get_static(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        let owner = self.registry.name(owner);
        let descriptor = self.registry.descriptor(ty);
        self.emitter
            .emit_member_ref(Op::GetStatic, &owner, name, &descriptor);
    }

    fn put_static(&mut self, owner: TypeId, name: &str, ty: TypeId) {
        let owner = self.registry.name(owner);
        let descriptor = self.registry.descriptor(ty);
        self.emitter
            .emit_member_ref(Op::PutStatic, &owner, name, &descriptor);
    }

    // ========================================================================
    // Arithmetic selection
    // ========================================================================

    fn arith_op(&self, op: BinaryOp, ty: TypeId) -> Result<Op, EmitError> {
        let double = ty == self.registry.double();
        let selected = match op {
            BinaryOp::Add => {
                if double {
                    Op::Dadd
                } else {
                    Op::Iadd
                }
            }
            BinaryOp::Sub => {
                if double {
                    Op::Dsub
                } else {
                    Op::Isub
                }
            }
            BinaryOp::Mul => {
                if double {
                    Op::Dmul
                } else {
                    Op::Imul
                }
            }
            BinaryOp::Div => {
                if double {
                    Op::Ddiv
                } else {
                    Op::Idiv
                }
            }
            BinaryOp::Rem => {
                if double {
                    Op::Drem
                } else {
                    Op::Irem
                }
            }
            BinaryOp::Shl => Op::Ishl,
            BinaryOp::Shr => Op::Ishr,
            BinaryOp::Ushr => Op::Iushr,
            BinaryOp::BitAnd => Op::Iand,
            BinaryOp::BitOr => Op::Ior,
            BinaryOp::BitXor => Op::Ixor,
            _ => {
                return Err(EmitError::MissingAnnotation {
                    what: "arithmetic operator",
                })
            }
        };
        Ok(selected)
    }

    /// Operator applied in a compound assignment. A string target turns
    /// `+=` into concatenation.
    fn emit_compound_op(&mut self, binary: BinaryOp, ty: TypeId) -> Result<(), EmitError> {
        if binary == BinaryOp::Add && ty == self.registry.string() {
            self.emitter.emit(Op::Sconcat);
            return Ok(());
        }
        self.emitter.emit(self.arith_op(binary, ty)?);
        Ok(())
    }

    // ========================================================================
    // Boolean branches
    // ========================================================================

    /// A boolean consumed as a value: branch to push 0 or 1.
    fn materialize_boolean(&mut self, e: &'a Expr) -> Result<(), EmitError> {
        let false_label = self.emitter.create_label();
        let end = self.emitter.create_label();
        self.gen_branch(e, false_label, false)?;
        self.emitter.emit_ldc(Constant::Int(1));
        self.emitter.emit_branch(Op::Goto, end);
        self.emitter.place_label(false_label);
        self.emitter.emit_ldc(Constant::Int(0));
        self.emitter.place_label(end);
        Ok(())
    }

    /// Branch to `target` when `e` evaluates to `on_true`. Comparisons
    /// emit compare-branches directly; `!` flips the polarity; the
    /// short-circuit operators decompose into chained branches; boolean
    /// literals fold to a goto or nothing.
    pub(crate) fn gen_branch(
        &mut self,
        e: &'a Expr,
        target: Label,
        on_true: bool,
    ) -> Result<(), EmitError> {
        match e {
            Expr::Literal {
                value: Literal::Bool(b),
                ..
            } => {
                if *b == on_true {
                    self.emitter.emit_branch(Op::Goto, target);
                }
                Ok(())
            }

            Expr::Unary {
                op: UnaryOp::Not,
                operand,
                ..
            } => self.gen_branch(operand, target, !on_true),

            Expr::Binary { op, lhs, rhs, .. } if op.is_comparison() => {
                self.gen_value(lhs)?;
                self.gen_value(rhs)?;
                self.emitter.emit_branch(Self::compare_op(*op, on_true), target);
                Ok(())
            }

            Expr::Binary {
                op: BinaryOp::LAnd,
                lhs,
                rhs,
                ..
            } => {
                if on_true {
                    let fall = self.emitter.create_label();
                    self.gen_branch(lhs, fall, false)?;
                    self.gen_branch(rhs, target, true)?;
                    self.emitter.place_label(fall);
                } else {
                    self.gen_branch(lhs, target, false)?;
                    self.gen_branch(rhs, target, false)?;
                }
                Ok(())
            }

            Expr::Binary {
                op: BinaryOp::LOr,
                lhs,
                rhs,
                ..
            } => {
                if on_true {
                    self.gen_branch(lhs, target, true)?;
                    self.gen_branch(rhs, target, true)?;
                } else {
                    let fall = self.emitter.create_label();
                    self.gen_branch(lhs, fall, true)?;
                    self.gen_branch(rhs, target, false)?;
                    self.emitter.place_label(fall);
                }
                Ok(())
            }

            _ => {
                self.gen_value(e)?;
                let op = if on_true { Op::IfNe } else { Op::IfEq };
                self.emitter.emit_branch(op, target);
                Ok(())
            }
        }
    }

    fn compare_op(op: BinaryOp, on_true: bool) -> Op {
        if on_true {
            match op {
                BinaryOp::Eq => Op::IfCmpEq,
                BinaryOp::Ne => Op::IfCmpNe,
                BinaryOp::Lt => Op::IfCmpLt,
                BinaryOp::Le => Op::IfCmpLe,
                BinaryOp::Gt => Op::IfCmpGt,
                _ => Op::IfCmpGe,
            }
        } else {
            match op {
                BinaryOp::Eq => Op::IfCmpNe,
                BinaryOp::Ne => Op::IfCmpEq,
                BinaryOp::Lt => Op::IfCmpGe,
                BinaryOp::Le => Op::IfCmpGt,
                BinaryOp::Gt => Op::IfCmpLe,
                _ => Op::IfCmpLt,
            }
        }
    }
}
