//! Analysis of expressions
//!
//! `analyze_expr` consumes a node and returns the node that code
//! generation will see. Most forms come back unchanged with their `ty`
//! filled; two are rewritten: `+` over a string operand becomes an
//! explicit `Concat` node (exactly once, operands already analyzed), and
//! a bare name denoting a field of the enclosing class becomes a field
//! selection on `this` (or on the class, for static fields).

use super::Analyzer;
use crate::error::SemanticError;
use juno_ast::{
    AssignOp, BinaryOp, Dispatch, Expr, FieldRef, LValue, Literal, MethodRef, Span, UnaryOp,
};
use juno_types::{Type, TypeId, TypeSpec};

impl Analyzer<'_> {
    pub(crate) fn analyze_expr(&mut self, expr: Expr) -> Expr {
        match expr {
            Expr::Literal { value, span, .. } => {
                let ty = match &value {
                    Literal::Int(_) => self.registry.int(),
                    Literal::Double(_) => self.registry.double(),
                    Literal::Char(_) => self.registry.char_ty(),
                    Literal::Str(_) => self.registry.string(),
                    Literal::Bool(_) => self.registry.boolean(),
                    Literal::Null => self.registry.null(),
                };
                Expr::Literal {
                    value,
                    span,
                    ty: Some(ty),
                }
            }

            Expr::Var { name, span, .. } => self.analyze_var(name, span),

            Expr::This { span, .. } => {
                let in_static = self.scopes.method().map(|m| m.is_static).unwrap_or(true);
                let ty = if in_static {
                    self.error(
                        span,
                        SemanticError::IllegalStaticReference {
                            name: "this".to_string(),
                        },
                    );
                    self.registry.any()
                } else {
                    self.scopes.current_class().unwrap_or(self.registry.any())
                };
                Expr::This { span, ty: Some(ty) }
            }

            Expr::FieldAccess {
                target, name, span, ..
            } => self.analyze_field_access(*target, name, span),

            Expr::ArrayIndex {
                array, index, span, ..
            } => {
                let array = self.analyze_expr(*array);
                let index = self.analyze_expr(*index);
                let any = self.registry.any();
                let int = self.registry.int();
                self.must_match(index.ty().unwrap_or(any), int, index.span());
                let array_ty = array.ty().unwrap_or(any);
                let ty = match self.registry.component(array_ty) {
                    Some(element) => element,
                    None => {
                        if array_ty != any {
                            let actual = self.registry.name(array_ty);
                            self.error(
                                span,
                                SemanticError::TypeMismatch {
                                    expected: "an array type".to_string(),
                                    actual,
                                },
                            );
                        }
                        any
                    }
                };
                Expr::ArrayIndex {
                    array: Box::new(array),
                    index: Box::new(index),
                    span,
                    ty: Some(ty),
                }
            }

            Expr::Call {
                target,
                name,
                args,
                span,
                ..
            } => self.analyze_call(target, name, args, span),

            Expr::New {
                class, args, span, ..
            } => self.analyze_new(class, args, span),

            Expr::NewArray {
                element,
                length,
                span,
                ..
            } => {
                let element_ty = self.resolve_or_any(&element, span);
                let length = self.analyze_expr(*length);
                let any = self.registry.any();
                let int = self.registry.int();
                self.must_match(length.ty().unwrap_or(any), int, length.span());
                let ty = self.registry.array_of(element_ty);
                Expr::NewArray {
                    element,
                    length: Box::new(length),
                    span,
                    ty: Some(ty),
                }
            }

            Expr::Unary {
                op,
                operand,
                span,
                is_statement,
                ..
            } => self.analyze_unary(op, *operand, span, is_statement),

            Expr::Binary {
                op, lhs, rhs, span, ..
            } => self.analyze_binary(op, *lhs, *rhs, span),

            // Already-rewritten concatenation; re-analysis is a no-op in
            // shape, so analysis stays idempotent.
            Expr::Concat { lhs, rhs, span, .. } => {
                let lhs = self.analyze_expr(*lhs);
                let rhs = self.analyze_expr(*rhs);
                let string = self.registry.string();
                Expr::Concat {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    span,
                    ty: Some(string),
                }
            }

            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                span,
                ..
            } => {
                let cond = self.boolean_cond(*cond);
                let then_expr = self.analyze_expr(*then_expr);
                let else_expr = self.analyze_expr(*else_expr);
                let any = self.registry.any();
                let tt = then_expr.ty().unwrap_or(any);
                let et = else_expr.ty().unwrap_or(any);
                let ty = if tt == et {
                    tt
                } else if tt == any {
                    et
                } else if et == any {
                    tt
                } else {
                    let err = SemanticError::TypeMismatch {
                        expected: self.registry.name(tt),
                        actual: self.registry.name(et),
                    };
                    self.error(span, err);
                    any
                };
                Expr::Ternary {
                    cond: Box::new(cond),
                    then_expr: Box::new(then_expr),
                    else_expr: Box::new(else_expr),
                    span,
                    ty: Some(ty),
                }
            }

            Expr::Assign {
                op,
                target,
                value,
                span,
                is_statement,
                ..
            } => self.analyze_assign(op, *target, *value, span, is_statement),
        }
    }

    fn analyze_var(&mut self, name: String, span: Span) -> Expr {
        if let Some(def) = self.scopes.lookup(&name) {
            return Expr::Var {
                name,
                span,
                slot: Some(def.slot),
                ty: Some(def.ty),
            };
        }

        // Not a local: a field of the enclosing class gets the implicit
        // receiver made explicit.
        if let Some(class) = self.scopes.current_class() {
            if let Some((owner, field)) = self.registry.field_in(class, &name) {
                let in_static = self.scopes.method().map(|m| m.is_static).unwrap_or(true);
                if field.is_static {
                    let owner_name = self.registry.name(owner);
                    return Expr::FieldAccess {
                        target: Box::new(Expr::Var {
                            name: owner_name,
                            span,
                            slot: None,
                            ty: Some(owner),
                        }),
                        name,
                        span,
                        ty: Some(field.ty),
                        resolved: Some(FieldRef {
                            owner,
                            is_static: true,
                            is_array_length: false,
                        }),
                    };
                }
                if in_static {
                    self.error(
                        span,
                        SemanticError::IllegalStaticReference { name: name.clone() },
                    );
                }
                return Expr::FieldAccess {
                    target: Box::new(Expr::This {
                        span,
                        ty: Some(class),
                    }),
                    name,
                    span,
                    ty: Some(field.ty),
                    resolved: Some(FieldRef {
                        owner,
                        is_static: false,
                        is_array_length: false,
                    }),
                };
            }
        }

        self.error(span, SemanticError::UnresolvedName { name: name.clone() });
        Expr::Var {
            name,
            span,
            slot: None,
            ty: Some(self.registry.any()),
        }
    }

    /// A `Var` target that names neither a local nor a field but does name
    /// a declared type is a static receiver.
    fn static_receiver(&mut self, target: &Expr) -> Option<TypeId> {
        let Expr::Var { name, .. } = target else {
            return None;
        };
        if self.scopes.lookup(name).is_some() {
            return None;
        }
        if let Some(class) = self.scopes.current_class() {
            if self.registry.field_in(class, name).is_some() {
                return None;
            }
        }
        self.registry.resolve(&TypeSpec::Named(name.clone())).ok()
    }

    fn analyze_field_access(&mut self, target: Expr, name: String, span: Span) -> Expr {
        let any = self.registry.any();

        if let Some(owner) = self.static_receiver(&target) {
            let (ty, resolved) = match self.registry.field_in(owner, &name) {
                Some((decl_owner, field)) if field.is_static => (
                    field.ty,
                    Some(FieldRef {
                        owner: decl_owner,
                        is_static: true,
                        is_array_length: false,
                    }),
                ),
                Some(_) => {
                    self.error(
                        span,
                        SemanticError::IllegalStaticReference { name: name.clone() },
                    );
                    (any, None)
                }
                None => {
                    self.error(span, SemanticError::UnresolvedName { name: name.clone() });
                    (any, None)
                }
            };
            let owner_name = self.registry.name(owner);
            return Expr::FieldAccess {
                target: Box::new(Expr::Var {
                    name: owner_name,
                    span,
                    slot: None,
                    ty: Some(owner),
                }),
                name,
                span,
                ty: Some(ty),
                resolved,
            };
        }

        let target = self.analyze_expr(target);
        let target_ty = target.ty().unwrap_or(any);

        // The built-in array length pseudo-field.
        if self.registry.component(target_ty).is_some() && name == "length" {
            let int = self.registry.int();
            return Expr::FieldAccess {
                target: Box::new(target),
                name,
                span,
                ty: Some(int),
                resolved: Some(FieldRef {
                    owner: target_ty,
                    is_static: false,
                    is_array_length: true,
                }),
            };
        }

        let (ty, resolved) = if target_ty == any {
            (any, None)
        } else {
            match self.registry.field_in(target_ty, &name) {
                Some((owner, field)) => (
                    field.ty,
                    Some(FieldRef {
                        owner,
                        is_static: field.is_static,
                        is_array_length: false,
                    }),
                ),
                None => {
                    self.error(span, SemanticError::UnresolvedName { name: name.clone() });
                    (any, None)
                }
            }
        };
        Expr::FieldAccess {
            target: Box::new(target),
            name,
            span,
            ty: Some(ty),
            resolved,
        }
    }

    fn analyze_call(
        &mut self,
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
        span: Span,
    ) -> Expr {
        let any = self.registry.any();
        let args: Vec<Expr> = args.into_iter().map(|a| self.analyze_expr(a)).collect();
        let arg_tys: Vec<TypeId> = args.iter().map(|a| a.ty().unwrap_or(any)).collect();

        let (receiver, receiver_ty, implicit) = match target {
            None => {
                let class = self.scopes.current_class();
                match class {
                    Some(class) => (None, class, true),
                    None => {
                        self.error(span, SemanticError::UnresolvedName { name: name.clone() });
                        return Expr::Call {
                            target: None,
                            name,
                            args,
                            span,
                            ty: Some(any),
                            resolved: None,
                        };
                    }
                }
            }
            Some(t) => {
                if let Some(owner) = self.static_receiver(&t) {
                    let owner_name = self.registry.name(owner);
                    let receiver = Expr::Var {
                        name: owner_name,
                        span: t.span(),
                        slot: None,
                        ty: Some(owner),
                    };
                    (Some(Box::new(receiver)), owner, false)
                } else {
                    let t = self.analyze_expr(*t);
                    let ty = t.ty().unwrap_or(any);
                    (Some(Box::new(t)), ty, false)
                }
            }
        };

        if receiver_ty == any {
            return Expr::Call {
                target: receiver,
                name,
                args,
                span,
                ty: Some(any),
                resolved: None,
            };
        }

        let Some((owner, sig)) = self.registry.method_in(receiver_ty, &name, &arg_tys) else {
            self.error(span, SemanticError::UnresolvedName { name: name.clone() });
            return Expr::Call {
                target: receiver,
                name,
                args,
                span,
                ty: Some(any),
                resolved: None,
            };
        };

        let in_static = self.scopes.method().map(|m| m.is_static).unwrap_or(true);
        let target = if implicit {
            if sig.is_static {
                None
            } else {
                if in_static {
                    self.error(
                        span,
                        SemanticError::IllegalStaticReference { name: name.clone() },
                    );
                }
                Some(Box::new(Expr::This {
                    span,
                    ty: Some(receiver_ty),
                }))
            }
        } else {
            receiver
        };

        let dispatch = if sig.is_static {
            Dispatch::Static
        } else if self.registry.is_interface(receiver_ty) {
            Dispatch::Interface
        } else {
            Dispatch::Virtual
        };
        let descriptor = self.registry.method_descriptor(&sig.params, sig.return_type);

        Expr::Call {
            target,
            name,
            args,
            span,
            ty: Some(sig.return_type),
            resolved: Some(MethodRef {
                owner,
                descriptor,
                dispatch,
            }),
        }
    }

    fn analyze_new(&mut self, class: TypeSpec, args: Vec<Expr>, span: Span) -> Expr {
        let any = self.registry.any();
        let args: Vec<Expr> = args.into_iter().map(|a| self.analyze_expr(a)).collect();
        let arg_tys: Vec<TypeId> = args.iter().map(|a| a.ty().unwrap_or(any)).collect();

        let ty = self.resolve_or_any(&class, span);
        if ty == any {
            return Expr::New {
                class,
                args,
                span,
                ty: Some(any),
                resolved: None,
            };
        }

        let (is_class, is_abstract) = match self.registry.get(ty) {
            Type::Class(c) => (true, c.is_abstract),
            _ => (false, false),
        };
        if !is_class {
            let name = self.registry.name(ty);
            self.error(
                span,
                SemanticError::IllegalAbstractUse {
                    detail: format!("cannot instantiate {}", name),
                },
            );
            return Expr::New {
                class,
                args,
                span,
                ty: Some(any),
                resolved: None,
            };
        }
        if is_abstract {
            let name = self.registry.name(ty);
            self.error(
                span,
                SemanticError::IllegalAbstractUse {
                    detail: format!("cannot instantiate abstract class {}", name),
                },
            );
        }

        let resolved = match self.registry.constructor_in(ty, &arg_tys) {
            Some(sig) => {
                let descriptor = self.registry.method_descriptor(&sig.params, sig.return_type);
                Some(MethodRef {
                    owner: ty,
                    descriptor,
                    dispatch: Dispatch::Special,
                })
            }
            None => {
                let name = self.registry.name(ty);
                self.error(
                    span,
                    SemanticError::UnresolvedName {
                        name: format!("constructor {}({})", name, arg_tys.len()),
                    },
                );
                None
            }
        };

        Expr::New {
            class,
            args,
            span,
            ty: Some(ty),
            resolved,
        }
    }

    fn analyze_unary(&mut self, op: UnaryOp, operand: Expr, span: Span, is_statement: bool) -> Expr {
        let any = self.registry.any();

        if op.is_inc_dec() {
            if !operand.is_assignable_form() {
                self.error(
                    span,
                    SemanticError::IllegalLValue {
                        what: format!("operand of {}", op),
                    },
                );
                let operand = self.analyze_expr(operand);
                return Expr::Unary {
                    op,
                    operand: Box::new(operand),
                    span,
                    ty: Some(any),
                    lvalue: None,
                    is_statement,
                };
            }
            let operand = self.analyze_expr(operand);
            let operand_ty = operand.ty().unwrap_or(any);
            let ty = if operand_ty == any || self.registry.is_numeric(operand_ty) {
                operand_ty
            } else {
                let actual = self.registry.name(operand_ty);
                self.error(
                    span,
                    SemanticError::TypeMismatch {
                        expected: "int or double".to_string(),
                        actual,
                    },
                );
                any
            };
            let lvalue = self.resolve_lvalue(&operand, span);
            return Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
                ty: Some(ty),
                lvalue,
                is_statement,
            };
        }

        let operand = self.analyze_expr(operand);
        let operand_ty = operand.ty().unwrap_or(any);
        let ty = match op {
            UnaryOp::Plus | UnaryOp::Neg => {
                if operand_ty == any || self.registry.is_numeric(operand_ty) {
                    operand_ty
                } else {
                    let actual = self.registry.name(operand_ty);
                    self.error(
                        span,
                        SemanticError::TypeMismatch {
                            expected: "int or double".to_string(),
                            actual,
                        },
                    );
                    any
                }
            }
            UnaryOp::Not => {
                let boolean = self.registry.boolean();
                self.must_match(operand_ty, boolean, span);
                boolean
            }
            UnaryOp::Complement => {
                let int = self.registry.int();
                self.must_match(operand_ty, int, span);
                int
            }
            _ => unreachable!("inc/dec handled above"),
        };
        Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
            ty: Some(ty),
            lvalue: None,
            is_statement,
        }
    }

    fn analyze_binary(&mut self, op: BinaryOp, lhs: Expr, rhs: Expr, span: Span) -> Expr {
        let any = self.registry.any();
        let lhs = self.analyze_expr(lhs);
        let rhs = self.analyze_expr(rhs);
        let lt = lhs.ty().unwrap_or(any);
        let rt = rhs.ty().unwrap_or(any);

        // `+` with a string side becomes concatenation, exactly once,
        // without re-analyzing the operands.
        if op == BinaryOp::Add {
            let string = self.registry.string();
            if lt == string || rt == string {
                return Expr::Concat {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                    span,
                    ty: Some(string),
                };
            }
        }

        let ty = match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                self.numeric_operands(lt, rt, span)
            }
            BinaryOp::Shl
            | BinaryOp::Shr
            | BinaryOp::Ushr
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor => {
                let int = self.registry.int();
                self.must_match(lt, int, lhs.span());
                self.must_match(rt, int, rhs.span());
                int
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                self.numeric_operands(lt, rt, span);
                self.registry.boolean()
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if !self.registry.is_assignable(lt, rt) && !self.registry.is_assignable(rt, lt) {
                    let err = SemanticError::TypeMismatch {
                        expected: self.registry.name(lt),
                        actual: self.registry.name(rt),
                    };
                    self.error(span, err);
                }
                self.registry.boolean()
            }
            BinaryOp::LAnd | BinaryOp::LOr => {
                let boolean = self.registry.boolean();
                self.must_match(lt, boolean, lhs.span());
                self.must_match(rt, boolean, rhs.span());
                boolean
            }
        };
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            span,
            ty: Some(ty),
        }
    }

    fn analyze_assign(
        &mut self,
        op: AssignOp,
        target: Expr,
        value: Expr,
        span: Span,
        is_statement: bool,
    ) -> Expr {
        let any = self.registry.any();

        if !target.is_assignable_form() {
            self.error(
                span,
                SemanticError::IllegalLValue {
                    what: "target of assignment".to_string(),
                },
            );
            let target = self.analyze_expr(target);
            let value = self.analyze_expr(value);
            return Expr::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
                span,
                ty: Some(any),
                lvalue: None,
                is_statement,
            };
        }

        let target = self.analyze_expr(target);
        let target_ty = target.ty().unwrap_or(any);
        let lvalue = self.resolve_lvalue(&target, span);
        let value = self.analyze_expr(value);
        let value_ty = value.ty().unwrap_or(any);

        match op.binary_op() {
            None => {
                self.must_match(value_ty, target_ty, span);
            }
            Some(BinaryOp::Add) => {
                let string = self.registry.string();
                if target_ty != string {
                    // Numeric compound add; `+=` on a string concatenates
                    // anything.
                    self.numeric_operands(target_ty, value_ty, span);
                }
            }
            Some(b) if b.is_integral_only() => {
                let int = self.registry.int();
                self.must_match(target_ty, int, span);
                self.must_match(value_ty, int, span);
            }
            Some(_) => {
                self.numeric_operands(target_ty, value_ty, span);
            }
        }

        Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
            span,
            ty: Some(target_ty),
            lvalue,
            is_statement,
        }
    }

    /// Map an analyzed assignable expression to its l-value. Reports when
    /// the form looks assignable but is not (array `.length`).
    fn resolve_lvalue(&mut self, target: &Expr, span: Span) -> Option<LValue> {
        match target {
            Expr::Var {
                slot: Some(slot),
                ty: Some(ty),
                ..
            } => Some(LValue::Local {
                slot: *slot,
                ty: *ty,
            }),
            Expr::FieldAccess {
                resolved: Some(fr),
                ty: Some(ty),
                name,
                ..
            } => {
                if fr.is_array_length {
                    self.error(
                        span,
                        SemanticError::IllegalLValue {
                            what: "array length".to_string(),
                        },
                    );
                    return None;
                }
                if fr.is_static {
                    Some(LValue::StaticField {
                        owner: fr.owner,
                        name: name.clone(),
                        ty: *ty,
                    })
                } else {
                    Some(LValue::Field {
                        owner: fr.owner,
                        name: name.clone(),
                        ty: *ty,
                    })
                }
            }
            Expr::ArrayIndex { ty: Some(ty), .. } => Some(LValue::ArrayElem { elem_ty: *ty }),
            _ => None,
        }
    }
}
