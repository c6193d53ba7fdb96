//! Analysis of declarations bodies and statements

use super::Analyzer;
use crate::error::SemanticError;
use juno_ast::{
    Block, CatchClause, ClassDecl, CompilationUnit, Expr, ForEachLowering, ForEachStmt,
    InterfaceDecl, Member, MethodDecl, Stmt, TryStmt, TypeDecl, VarDecl,
};

impl Analyzer<'_> {
    pub(crate) fn analyze_unit(&mut self, mut unit: CompilationUnit) -> CompilationUnit {
        unit.types = unit
            .types
            .into_iter()
            .map(|decl| match decl {
                TypeDecl::Class(c) => TypeDecl::Class(self.analyze_class(c)),
                TypeDecl::Interface(i) => TypeDecl::Interface(self.analyze_interface(i)),
            })
            .collect();
        unit
    }

    fn analyze_class(&mut self, mut c: ClassDecl) -> ClassDecl {
        let Some(id) = c.ty else { return c };
        self.scopes.enter_class(id);
        c.members = c
            .members
            .into_iter()
            .map(|member| self.analyze_member(member))
            .collect();
        self.scopes.exit_class();
        c
    }

    fn analyze_interface(&mut self, mut i: InterfaceDecl) -> InterfaceDecl {
        let Some(id) = i.ty else { return i };
        self.scopes.enter_class(id);
        i.members = i
            .members
            .into_iter()
            .map(|member| match member {
                // Interface field initializers run in class-init context.
                Member::Field(mut f) => {
                    if let Some(init) = f.init.take() {
                        let void = self.registry.void();
                        self.scopes.enter_method(void, true);
                        let init = self.analyze_expr(init);
                        if let (Some(actual), Some(expected)) = (init.ty(), f.ty) {
                            self.must_match(actual, expected, f.span);
                        }
                        self.scopes.exit_method();
                        f.init = Some(init);
                    }
                    Member::Field(f)
                }
                other => other,
            })
            .collect();
        self.scopes.exit_class();
        i
    }

    fn analyze_member(&mut self, member: Member) -> Member {
        match member {
            Member::Field(mut f) => {
                if let Some(init) = f.init.take() {
                    // Initializers are compiled into <init> or <clinit>;
                    // analyze them in the matching frame so `this` and
                    // static rules apply.
                    let void = self.registry.void();
                    self.scopes.enter_method(void, f.mods.is_static);
                    let init = self.analyze_expr(init);
                    if let (Some(actual), Some(expected)) = (init.ty(), f.ty) {
                        self.must_match(actual, expected, f.span);
                    }
                    self.scopes.exit_method();
                    f.init = Some(init);
                }
                Member::Field(f)
            }
            Member::Method(m) => Member::Method(self.analyze_method(m)),
            Member::Constructor(m) => Member::Constructor(self.analyze_method(m)),
            Member::InitBlock {
                is_static,
                body,
                span,
            } => {
                let void = self.registry.void();
                self.scopes.enter_method(void, is_static);
                let body = self.analyze_block(body);
                self.scopes.exit_method();
                Member::InitBlock {
                    is_static,
                    body,
                    span,
                }
            }
        }
    }

    fn analyze_method(&mut self, mut m: MethodDecl) -> MethodDecl {
        let any = self.registry.any();
        let void = self.registry.void();
        let return_ty = m.return_ty.unwrap_or(any);
        self.declared_throws = m.throws_tys.clone();
        self.method_name = m.name.clone();
        self.scopes.enter_method(return_ty, m.mods.is_static);

        for p in &mut m.params {
            let ty = p.ty.unwrap_or(any);
            match self.scopes.define(&p.name, ty) {
                Some(slot) => p.slot = Some(slot),
                None => {
                    self.error(
                        p.span,
                        SemanticError::DuplicateDeclaration {
                            name: p.name.clone(),
                        },
                    );
                    p.slot = Some(self.scopes.alloc_slot());
                }
            }
        }

        if let Some(body) = m.body.take() {
            // The method frame already opened the body's scope; the
            // outermost block shares it with the parameters.
            let stmts = body
                .stmts
                .into_iter()
                .map(|s| self.analyze_stmt(s))
                .collect();
            m.body = Some(Block {
                stmts,
                span: body.span,
            });
        }

        let frame = self.scopes.exit_method();
        if let Some(frame) = frame {
            if m.body.is_some() && return_ty != void && return_ty != any && !frame.has_return {
                self.error(
                    m.span,
                    SemanticError::MissingReturn {
                        method: self.method_name.clone(),
                    },
                );
            }
        }
        self.declared_throws.clear();
        m
    }

    pub(crate) fn analyze_block(&mut self, block: Block) -> Block {
        self.scopes.push_block();
        let stmts = block
            .stmts
            .into_iter()
            .map(|s| self.analyze_stmt(s))
            .collect();
        self.scopes.pop_block();
        Block {
            stmts,
            span: block.span,
        }
    }

    pub(crate) fn analyze_stmt(&mut self, stmt: Stmt) -> Stmt {
        match stmt {
            Stmt::Block(b) => Stmt::Block(self.analyze_block(b)),

            Stmt::Expr { expr, span } => {
                let mut expr = self.analyze_expr(expr);
                // The value of a top-level expression is discarded.
                match &mut expr {
                    Expr::Assign { is_statement, .. } | Expr::Unary { is_statement, .. } => {
                        *is_statement = true;
                    }
                    _ => {}
                }
                Stmt::Expr { expr, span }
            }

            Stmt::VarDecl(d) => Stmt::VarDecl(self.analyze_var_decl(d)),

            Stmt::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => {
                let cond = self.boolean_cond(cond);
                let then_branch = Box::new(self.analyze_stmt(*then_branch));
                let else_branch = else_branch.map(|e| Box::new(self.analyze_stmt(*e)));
                Stmt::If {
                    cond,
                    then_branch,
                    else_branch,
                    span,
                }
            }

            Stmt::While { cond, body, span } => {
                let cond = self.boolean_cond(cond);
                let body = Box::new(self.analyze_stmt(*body));
                Stmt::While { cond, body, span }
            }

            Stmt::For {
                init,
                cond,
                update,
                body,
                span,
            } => {
                // One scope spans the initializers, condition, update and
                // body.
                self.scopes.push_block();
                let init = init.into_iter().map(|s| self.analyze_stmt(s)).collect();
                let cond = cond.map(|c| self.boolean_cond(c));
                let update = update
                    .into_iter()
                    .map(|e| {
                        let mut e = self.analyze_expr(e);
                        if let Expr::Assign { is_statement, .. } | Expr::Unary { is_statement, .. } =
                            &mut e
                        {
                            *is_statement = true;
                        }
                        e
                    })
                    .collect();
                let body = Box::new(self.analyze_stmt(*body));
                self.scopes.pop_block();
                Stmt::For {
                    init,
                    cond,
                    update,
                    body,
                    span,
                }
            }

            Stmt::ForEach(f) => Stmt::ForEach(self.analyze_for_each(f)),

            Stmt::Return { value, span } => {
                self.scopes.mark_return();
                let (expected, any, void) = {
                    let m = self.scopes.method();
                    (
                        m.map(|m| m.return_ty),
                        self.registry.any(),
                        self.registry.void(),
                    )
                };
                let expected = expected.unwrap_or(any);
                let value = value.map(|v| self.analyze_expr(v));
                match &value {
                    Some(v) => {
                        if expected == void {
                            let actual = v.ty().unwrap_or(any);
                            let actual = self.registry.name(actual);
                            self.error(
                                span,
                                SemanticError::TypeMismatch {
                                    expected: "void".to_string(),
                                    actual,
                                },
                            );
                        } else {
                            self.must_match(v.ty().unwrap_or(any), expected, span);
                        }
                    }
                    None => {
                        if expected != void && expected != any {
                            let expected = self.registry.name(expected);
                            self.error(
                                span,
                                SemanticError::TypeMismatch {
                                    expected,
                                    actual: "void".to_string(),
                                },
                            );
                        }
                    }
                }
                Stmt::Return { value, span }
            }

            Stmt::Throw { value, span } => {
                let value = self.analyze_expr(value);
                let any = self.registry.any();
                let throwable = self.registry.throwable();
                let thrown = value.ty().unwrap_or(any);
                if !self.registry.is_assignable(thrown, throwable) {
                    let actual = self.registry.name(thrown);
                    self.error(
                        span,
                        SemanticError::TypeMismatch {
                            expected: "a throwable type".to_string(),
                            actual,
                        },
                    );
                } else if thrown != any && !self.throw_is_covered(thrown) {
                    let ty = self.registry.name(thrown);
                    self.error(span, SemanticError::UnhandledException { ty });
                }
                Stmt::Throw { value, span }
            }

            Stmt::Try(t) => Stmt::Try(self.analyze_try(t)),
        }
    }

    fn analyze_var_decl(&mut self, mut d: VarDecl) -> VarDecl {
        let ty = self.resolve_or_any(&d.ty_spec, d.span);
        d.ty = Some(ty);
        if let Some(init) = d.init.take() {
            let init = self.analyze_expr(init);
            let any = self.registry.any();
            self.must_match(init.ty().unwrap_or(any), ty, d.span);
            d.init = Some(init);
        }
        // Bound after the initializer: a variable is not in scope in its
        // own initializer.
        match self.scopes.define(&d.name, ty) {
            Some(slot) => d.slot = Some(slot),
            None => {
                self.error(
                    d.span,
                    SemanticError::DuplicateDeclaration {
                        name: d.name.clone(),
                    },
                );
                d.slot = Some(self.scopes.alloc_slot());
            }
        }
        d
    }

    fn analyze_for_each(&mut self, mut f: ForEachStmt) -> ForEachStmt {
        let iterable = self.analyze_expr(f.iterable);
        let any = self.registry.any();
        let iter_ty = iterable.ty().unwrap_or(any);
        f.iterable = iterable;

        self.scopes.push_block();
        let var_ty = self.resolve_or_any(&f.var_ty_spec, f.span);
        f.var_ty = Some(var_ty);

        // The lowering decision is static: arrays get the index-counter
        // form, everything else must offer the iterator protocol. Hidden
        // slots are allocated before the loop variable's.
        if let Some(element) = self.registry.component(iter_ty) {
            let array_slot = self.scopes.alloc_slot();
            let index_slot = self.scopes.alloc_slot();
            self.must_match(element, var_ty, f.span);
            f.lowering = Some(ForEachLowering::Array {
                array_slot,
                index_slot,
            });
        } else if iter_ty != any {
            match self.registry.iterator_protocol(iter_ty) {
                Some(protocol) => {
                    let iter_slot = self.scopes.alloc_slot();
                    self.must_match(protocol.element_ty, var_ty, f.span);
                    f.lowering = Some(ForEachLowering::Iterator {
                        iter_slot,
                        protocol,
                    });
                }
                None => {
                    let actual = self.registry.name(iter_ty);
                    self.error(
                        f.span,
                        SemanticError::TypeMismatch {
                            expected: "an array or iterable type".to_string(),
                            actual,
                        },
                    );
                }
            }
        }

        match self.scopes.define(&f.var_name, var_ty) {
            Some(slot) => f.var_slot = Some(slot),
            None => {
                self.error(
                    f.span,
                    SemanticError::DuplicateDeclaration {
                        name: f.var_name.clone(),
                    },
                );
                f.var_slot = Some(self.scopes.alloc_slot());
            }
        }
        f.body = self.analyze_block(f.body);
        self.scopes.pop_block();
        f
    }

    fn analyze_try(&mut self, mut t: TryStmt) -> TryStmt {
        if t.catches.is_empty() && t.finally.is_none() {
            self.error(
                t.span,
                SemanticError::MalformedTryCatch {
                    detail: "try requires at least one catch clause or a finally block"
                        .to_string(),
                },
            );
        }

        // Resolve caught types first so throws inside the body see them.
        let throwable = self.registry.throwable();
        for catch in &mut t.catches {
            catch.resolved_tys.clear();
            for spec in catch.ty_specs.clone() {
                let ty = self.resolve_or_any(&spec, catch.span);
                if !self.registry.is_assignable(ty, throwable) {
                    let actual = self.registry.name(ty);
                    self.error(
                        catch.span,
                        SemanticError::MalformedTryCatch {
                            detail: format!("catch of non-throwable type {}", actual),
                        },
                    );
                }
                catch.resolved_tys.push(ty);
            }
            catch.param_ty = Some(match catch.resolved_tys.as_slice() {
                [single] => *single,
                // Multi-catch parameters get the throwable root.
                _ => throwable,
            });
        }

        let handled: Vec<_> = t
            .catches
            .iter()
            .flat_map(|c| c.resolved_tys.iter().copied())
            .collect();
        self.handled.push(handled);
        t.body = self.analyze_block(t.body);
        self.handled.pop();

        t.catches = t
            .catches
            .into_iter()
            .map(|c| self.analyze_catch(c))
            .collect();

        if let Some(finally) = t.finally.take() {
            t.finally_slot = Some(self.scopes.alloc_slot());
            t.finally = Some(self.analyze_block(finally));
        }
        t
    }

    fn analyze_catch(&mut self, mut c: CatchClause) -> CatchClause {
        let any = self.registry.any();
        self.scopes.push_block();
        let param_ty = c.param_ty.unwrap_or(any);
        match self.scopes.define(&c.param_name, param_ty) {
            Some(slot) => c.param_slot = Some(slot),
            None => c.param_slot = Some(self.scopes.alloc_slot()),
        }
        c.body = self.analyze_block(c.body);
        self.scopes.pop_block();
        c
    }

    pub(crate) fn boolean_cond(&mut self, cond: Expr) -> Expr {
        let cond = self.analyze_expr(cond);
        let any = self.registry.any();
        let boolean = self.registry.boolean();
        self.must_match(cond.ty().unwrap_or(any), boolean, cond.span());
        cond
    }
}
