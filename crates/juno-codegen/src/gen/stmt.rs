//! Statement lowering

use crate::emitter::Emitter;
use crate::error::EmitError;
use crate::opcode::{Constant, Op};
use juno_ast::{Block, Expr, ForEachLowering, ForEachStmt, Stmt, TryStmt};
use juno_types::{MethodSignature, TypeId};

use super::CodeGen;

impl<'a, E: Emitter> CodeGen<'a, E> {
    pub(crate) fn gen_block(&mut self, block: &'a Block) -> Result<(), EmitError> {
        for stmt in &block.stmts {
            self.gen_stmt(stmt)?;
        }
        Ok(())
    }

    pub(crate) fn gen_stmt(&mut self, stmt: &'a Stmt) -> Result<(), EmitError> {
        match stmt {
            Stmt::Block(b) => self.gen_block(b),

            Stmt::Expr { expr, .. } => self.gen_expr_stmt(expr),

            Stmt::VarDecl(decl) => {
                if let Some(init) = &decl.init {
                    let slot = decl.slot.ok_or(EmitError::MissingAnnotation {
                        what: "local variable slot",
                    })?;
                    self.gen_value(init)?;
                    self.emitter.emit_slot(Op::StoreLocal, slot);
                }
                Ok(())
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let after = self.emitter.create_label();
                match else_branch {
                    Some(else_branch) => {
                        let else_label = self.emitter.create_label();
                        self.gen_branch(cond, else_label, false)?;
                        self.gen_stmt(then_branch)?;
                        self.emitter.emit_branch(Op::Goto, after);
                        self.emitter.place_label(else_label);
                        self.gen_stmt(else_branch)?;
                    }
                    None => {
                        self.gen_branch(cond, after, false)?;
                        self.gen_stmt(then_branch)?;
                    }
                }
                self.emitter.place_label(after);
                Ok(())
            }

            Stmt::While { cond, body, .. } => {
                let top = self.emitter.create_label();
                let out = self.emitter.create_label();
                self.emitter.place_label(top);
                self.gen_branch(cond, out, false)?;
                self.gen_stmt(body)?;
                self.emitter.emit_branch(Op::Goto, top);
                self.emitter.place_label(out);
                Ok(())
            }

            Stmt::For {
                init,
                cond,
                update,
                body,
                ..
            } => {
                for stmt in init {
                    self.gen_stmt(stmt)?;
                }
                let top = self.emitter.create_label();
                let out = self.emitter.create_label();
                self.emitter.place_label(top);
                if let Some(cond) = cond {
                    self.gen_branch(cond, out, false)?;
                }
                self.gen_stmt(body)?;
                for expr in update {
                    self.gen_expr_stmt(expr)?;
                }
                self.emitter.emit_branch(Op::Goto, top);
                self.emitter.place_label(out);
                Ok(())
            }

            Stmt::ForEach(fe) => self.gen_for_each(fe),

            Stmt::Return { value, .. } => {
                match value {
                    Some(value) => {
                        self.gen_value(value)?;
                        self.gen_enclosing_finallies()?;
                        self.emitter.emit(Op::ReturnValue);
                    }
                    None => {
                        self.gen_enclosing_finallies()?;
                        self.emitter.emit(Op::Return);
                    }
                }
                Ok(())
            }

            Stmt::Throw { value, .. } => {
                // No inline finally copies here: an in-flight exception
                // reaches enclosing finallies through their catch-all
                // handlers.
                self.gen_value(value)?;
                self.emitter.emit(Op::Athrow);
                Ok(())
            }

            Stmt::Try(t) => self.gen_try(t),
        }
    }

    /// An expression in statement position. Assignments and
    /// increment/decrement were marked by analysis and lower to forms
    /// that leave nothing on the stack; any other value gets popped.
    fn gen_expr_stmt(&mut self, expr: &'a Expr) -> Result<(), EmitError> {
        match expr {
            Expr::Assign { .. } => self.gen_value(expr),
            Expr::Unary { op, .. } if op.is_inc_dec() => self.gen_value(expr),
            _ => {
                self.gen_value(expr)?;
                if self.expr_ty(expr)? != self.registry.void() {
                    self.emitter.emit(Op::Pop);
                }
                Ok(())
            }
        }
    }

    fn gen_for_each(&mut self, fe: &'a ForEachStmt) -> Result<(), EmitError> {
        let lowering = fe.lowering.as_ref().ok_or(EmitError::MissingAnnotation {
            what: "for-each lowering",
        })?;
        let var_slot = fe.var_slot.ok_or(EmitError::MissingAnnotation {
            what: "for-each variable slot",
        })?;
        match lowering {
            ForEachLowering::Array {
                array_slot,
                index_slot,
            } => {
                self.gen_value(&fe.iterable)?;
                self.emitter.emit_slot(Op::StoreLocal, *array_slot);
                self.emitter.emit_ldc(Constant::Int(0));
                self.emitter.emit_slot(Op::StoreLocal, *index_slot);

                let top = self.emitter.create_label();
                let out = self.emitter.create_label();
                self.emitter.place_label(top);
                self.emitter.emit_slot(Op::LoadLocal, *index_slot);
                self.emitter.emit_slot(Op::LoadLocal, *array_slot);
                self.emitter.emit(Op::ArrayLength);
                self.emitter.emit_branch(Op::IfCmpGe, out);

                self.emitter.emit_slot(Op::LoadLocal, *array_slot);
                self.emitter.emit_slot(Op::LoadLocal, *index_slot);
                self.emitter.emit(Op::ArrayLoad);
                self.emitter.emit_slot(Op::StoreLocal, var_slot);

                self.gen_block(&fe.body)?;
                self.emitter.emit_inc(*index_slot, 1);
                self.emitter.emit_branch(Op::Goto, top);
                self.emitter.place_label(out);
            }
            ForEachLowering::Iterator { iter_slot, protocol } => {
                self.gen_value(&fe.iterable)?;
                self.invoke_protocol(protocol.iterator_owner, &protocol.iterator_sig);
                self.emitter.emit_slot(Op::StoreLocal, *iter_slot);

                let top = self.emitter.create_label();
                let out = self.emitter.create_label();
                self.emitter.place_label(top);
                self.emitter.emit_slot(Op::LoadLocal, *iter_slot);
                self.invoke_protocol(protocol.has_next_owner, &protocol.has_next_sig);
                self.emitter.emit_branch(Op::IfEq, out);

                self.emitter.emit_slot(Op::LoadLocal, *iter_slot);
                self.invoke_protocol(protocol.next_owner, &protocol.next_sig);
                self.emitter.emit_slot(Op::StoreLocal, var_slot);

                self.gen_block(&fe.body)?;
                self.emitter.emit_branch(Op::Goto, top);
                self.emitter.place_label(out);
            }
        }
        Ok(())
    }

    fn invoke_protocol(&mut self, owner: TypeId, sig: &MethodSignature) {
        let op = if self.registry.is_interface(owner) {
            Op::InvokeInterface
        } else {
            Op::InvokeVirtual
        };
        let owner_name = self.registry.name(owner);
        let descriptor = self.registry.method_descriptor(&sig.params, sig.return_type);
        self.emitter
            .emit_member_ref(op, &owner_name, &sig.name, &descriptor);
    }

    /// Emit copies of every enclosing finally block, innermost first.
    /// Each copy is generated with itself and the blocks inside it off
    /// the stack, so a return inside a finally re-runs only the outer
    /// ones.
    fn gen_enclosing_finallies(&mut self) -> Result<(), EmitError> {
        let saved = self.finally_blocks.clone();
        while let Some(block) = self.finally_blocks.pop() {
            self.gen_block(block)?;
        }
        self.finally_blocks = saved;
        Ok(())
    }

    fn gen_try(&mut self, t: &'a TryStmt) -> Result<(), EmitError> {
        let start = self.emitter.create_label();
        let end = self.emitter.create_label();
        let done = self.emitter.create_label();

        // Protected body.
        self.emitter.place_label(start);
        if let Some(f) = &t.finally {
            self.finally_blocks.push(f);
        }
        self.gen_block(&t.body)?;
        if t.finally.is_some() {
            self.finally_blocks.pop();
        }
        self.emitter.place_label(end);

        // Normal exit: one finally copy, then skip the handlers.
        if let Some(f) = &t.finally {
            self.gen_block(f)?;
        }
        self.emitter.emit_branch(Op::Goto, done);

        // Catch handlers, in source order. A multi-type catch registers
        // one table entry per caught type, all pointing at one handler.
        // With a finally present, each catch body is itself protected by
        // the catch-all so an exception raised there still runs it.
        let catch_all = t.finally.as_ref().map(|_| self.emitter.create_label());
        for catch in &t.catches {
            let handler = self.emitter.create_label();
            self.emitter.place_label(handler);
            for &caught in &catch.resolved_tys {
                let name = self.registry.name(caught);
                self.emitter
                    .register_handler(start, end, handler, Some(&name));
            }
            let slot = catch.param_slot.ok_or(EmitError::MissingAnnotation {
                what: "catch parameter slot",
            })?;
            self.emitter.emit_slot(Op::StoreLocal, slot);

            if let Some(f) = &t.finally {
                self.finally_blocks.push(f);
            }
            self.gen_block(&catch.body)?;
            if t.finally.is_some() {
                self.finally_blocks.pop();
            }
            if let Some(all) = catch_all {
                let body_end = self.emitter.create_label();
                self.emitter.place_label(body_end);
                self.emitter.register_handler(handler, body_end, all, None);
            }
            if let Some(f) = &t.finally {
                self.gen_block(f)?;
            }
            self.emitter.emit_branch(Op::Goto, done);
        }

        // Catch-all path: run the finally copy, then rethrow. Registered
        // after the typed handlers so they win when both apply.
        if let (Some(f), Some(catch_all)) = (&t.finally, catch_all) {
            self.emitter.place_label(catch_all);
            self.emitter.register_handler(start, end, catch_all, None);
            let slot = t.finally_slot.ok_or(EmitError::MissingAnnotation {
                what: "finally temporary slot",
            })?;
            self.emitter.emit_slot(Op::StoreLocal, slot);
            self.gen_block(f)?;
            self.emitter.emit_slot(Op::LoadLocal, slot);
            self.emitter.emit(Op::Athrow);
        }

        self.emitter.place_label(done);
        Ok(())
    }
}
