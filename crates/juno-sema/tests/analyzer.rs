//! Analyzer integration tests over hand-built trees.

use juno_ast::{
    AssignOp, BinaryOp, Block, ClassDecl, CompilationUnit, Expr, FieldDecl, ForEachLowering,
    ForEachStmt, FormalParam, Literal, Member, MethodDecl, Modifiers, Span, Stmt, TypeDecl,
    VarDecl,
};
use juno_sema::{analyze, Diagnostics, SemanticError};
use juno_types::{TypeRegistry, TypeSpec};

fn sp() -> Span {
    Span::synthetic(1)
}

fn int_lit(v: i32) -> Expr {
    Expr::Literal {
        value: Literal::Int(v),
        span: sp(),
        ty: None,
    }
}

fn double_lit(v: f64) -> Expr {
    Expr::Literal {
        value: Literal::Double(v),
        span: sp(),
        ty: None,
    }
}

fn str_lit(s: &str) -> Expr {
    Expr::Literal {
        value: Literal::Str(s.to_string()),
        span: sp(),
        ty: None,
    }
}

fn var(name: &str) -> Expr {
    Expr::Var {
        name: name.to_string(),
        span: sp(),
        slot: None,
        ty: None,
    }
}

fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span: sp(),
        ty: None,
    }
}

fn assign(target: Expr, value: Expr) -> Expr {
    Expr::Assign {
        op: AssignOp::Assign,
        target: Box::new(target),
        value: Box::new(value),
        span: sp(),
        ty: None,
        lvalue: None,
        is_statement: false,
    }
}

fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr { expr, span: sp() }
}

fn decl_stmt(name: &str, ty_spec: TypeSpec, init: Expr) -> Stmt {
    Stmt::VarDecl(VarDecl {
        name: name.to_string(),
        ty_spec,
        init: Some(init),
        span: sp(),
        ty: None,
        slot: None,
    })
}

fn block(stmts: Vec<Stmt>) -> Block {
    Block { stmts, span: sp() }
}

fn method(name: &str, is_static: bool, return_spec: TypeSpec, body: Vec<Stmt>) -> MethodDecl {
    MethodDecl {
        mods: Modifiers {
            is_public: true,
            is_static,
            ..Modifiers::default()
        },
        name: name.to_string(),
        params: Vec::new(),
        return_spec,
        throws: Vec::new(),
        body: Some(block(body)),
        span: sp(),
        return_ty: None,
        param_tys: Vec::new(),
        throws_tys: Vec::new(),
        descriptor: None,
    }
}

fn class(name: &str, members: Vec<Member>) -> ClassDecl {
    ClassDecl {
        mods: Modifiers {
            is_public: true,
            ..Modifiers::default()
        },
        name: name.to_string(),
        super_spec: None,
        interfaces: Vec::new(),
        members,
        span: sp(),
        ty: None,
        super_ty: None,
    }
}

fn unit(classes: Vec<ClassDecl>) -> CompilationUnit {
    CompilationUnit {
        package: None,
        types: classes.into_iter().map(TypeDecl::Class).collect(),
    }
}

/// The sum-of-one-to-ten method body, the running example of the suite.
fn sum_body() -> Vec<Stmt> {
    vec![
        decl_stmt("total", TypeSpec::Int, int_lit(0)),
        decl_stmt("i", TypeSpec::Int, int_lit(1)),
        Stmt::While {
            cond: bin(BinaryOp::Le, var("i"), int_lit(10)),
            body: Box::new(Stmt::Block(block(vec![
                expr_stmt(assign(var("total"), bin(BinaryOp::Add, var("total"), var("i")))),
                expr_stmt(assign(var("i"), bin(BinaryOp::Add, var("i"), int_lit(1)))),
            ]))),
            span: sp(),
        },
        Stmt::Return {
            value: Some(var("total")),
            span: sp(),
        },
    ]
}

#[test]
fn sum_method_analyzes_cleanly() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method("sum", true, TypeSpec::Int, sum_body()))],
    )]);

    let tree = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty(), "unexpected diagnostics: {:?}", diags.entries());

    let TypeDecl::Class(c) = &tree.types[0] else {
        panic!("expected class")
    };
    let Member::Method(m) = &c.members[0] else {
        panic!("expected method")
    };
    assert_eq!(m.descriptor.as_deref(), Some("()I"));
    assert_eq!(m.return_ty, Some(registry.int()));

    // Static method: slots start at 0.
    let body = m.body.as_ref().unwrap();
    let Stmt::VarDecl(total) = &body.stmts[0] else {
        panic!("expected declaration")
    };
    let Stmt::VarDecl(i) = &body.stmts[1] else {
        panic!("expected declaration")
    };
    assert_eq!(total.slot, Some(0));
    assert_eq!(i.slot, Some(1));
    assert_eq!(total.ty, Some(registry.int()));
}

#[test]
fn analysis_is_idempotent() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method("sum", true, TypeSpec::Int, sum_body()))],
    )]);

    let once = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty());
    let twice = analyze(once.clone(), &mut registry, &mut diags);
    assert!(diags.is_empty(), "re-analysis reported: {:?}", diags.entries());
    assert_eq!(once, twice);
}

#[test]
fn mixed_numeric_operands_are_rejected() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method(
            "bad",
            true,
            TypeSpec::Int,
            vec![Stmt::Return {
                value: Some(bin(BinaryOp::Add, int_lit(1), double_lit(2.0))),
                span: sp(),
            }],
        ))],
    )]);

    analyze(tree, &mut registry, &mut diags);
    assert_eq!(diags.len(), 1);
    assert!(matches!(
        diags.entries()[0].error,
        SemanticError::TypeMismatch { .. }
    ));
}

#[test]
fn string_plus_rewrites_to_concat_once() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method(
            "greet",
            true,
            TypeSpec::Named("String".to_string()),
            vec![Stmt::Return {
                value: Some(bin(BinaryOp::Add, str_lit("n = "), int_lit(7))),
                span: sp(),
            }],
        ))],
    )]);

    let tree = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty());

    let extract = |tree: &CompilationUnit| {
        let TypeDecl::Class(c) = &tree.types[0] else {
            panic!()
        };
        let Member::Method(m) = &c.members[0] else {
            panic!()
        };
        let Stmt::Return {
            value: Some(v), ..
        } = &m.body.as_ref().unwrap().stmts[0]
        else {
            panic!()
        };
        v.clone()
    };

    let value = extract(&tree);
    let Expr::Concat { ty, lhs, .. } = &value else {
        panic!("expected concat rewrite, got {:?}", value)
    };
    assert_eq!(*ty, Some(registry.string()));
    assert!(matches!(**lhs, Expr::Literal { .. }));

    // Re-analysis must not nest another rewrite.
    let again = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty());
    assert!(matches!(extract(&again), Expr::Concat { .. }));
}

#[test]
fn bare_field_name_becomes_explicit_this_selection() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let counter_field = FieldDecl {
        mods: Modifiers {
            is_private: true,
            ..Modifiers::default()
        },
        name: "count".to_string(),
        ty_spec: TypeSpec::Int,
        init: None,
        span: sp(),
        ty: None,
    };
    let tree = unit(vec![class(
        "Counter",
        vec![
            Member::Field(counter_field),
            Member::Method(method(
                "get",
                false,
                TypeSpec::Int,
                vec![Stmt::Return {
                    value: Some(var("count")),
                    span: sp(),
                }],
            )),
        ],
    )]);

    let tree = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let TypeDecl::Class(c) = &tree.types[0] else {
        panic!()
    };
    let Member::Method(m) = &c.members[1] else {
        panic!()
    };
    let Stmt::Return {
        value: Some(value), ..
    } = &m.body.as_ref().unwrap().stmts[0]
    else {
        panic!()
    };
    let Expr::FieldAccess {
        target, resolved, ..
    } = value
    else {
        panic!("expected field access, got {:?}", value)
    };
    assert!(matches!(**target, Expr::This { .. }));
    let fr = resolved.as_ref().unwrap();
    assert!(!fr.is_static);
}

#[test]
fn uncovered_throw_is_reported_and_declared_throws_covers() {
    let throw_stmt = Stmt::Throw {
        value: Expr::New {
            class: TypeSpec::Named("Exception".to_string()),
            args: Vec::new(),
            span: sp(),
            ty: None,
            resolved: None,
        },
        span: sp(),
    };

    // Without coverage: one UnhandledException.
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method(
            "boom",
            true,
            TypeSpec::Void,
            vec![throw_stmt.clone()],
        ))],
    )]);
    analyze(tree, &mut registry, &mut diags);
    assert_eq!(diags.len(), 1);
    assert!(matches!(
        diags.entries()[0].error,
        SemanticError::UnhandledException { .. }
    ));

    // With a throws clause naming the type: clean.
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let mut m = method("boom", true, TypeSpec::Void, vec![throw_stmt]);
    m.throws = vec![TypeSpec::Named("Exception".to_string())];
    let tree = unit(vec![class("Main", vec![Member::Method(m)])]);
    analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty(), "{:?}", diags.entries());
}

#[test]
fn unresolved_name_reports_once_without_cascade() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method(
            "get",
            true,
            TypeSpec::Int,
            vec![Stmt::Return {
                value: Some(bin(BinaryOp::Add, var("missing"), int_lit(1))),
                span: sp(),
            }],
        ))],
    )]);

    analyze(tree, &mut registry, &mut diags);
    assert_eq!(diags.len(), 1, "{:?}", diags.entries());
    assert!(matches!(
        diags.entries()[0].error,
        SemanticError::UnresolvedName { .. }
    ));
}

#[test]
fn sibling_blocks_never_share_slots() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method(
            "run",
            true,
            TypeSpec::Void,
            vec![
                Stmt::Block(block(vec![decl_stmt("a", TypeSpec::Int, int_lit(1))])),
                Stmt::Block(block(vec![decl_stmt("b", TypeSpec::Int, int_lit(2))])),
            ],
        ))],
    )]);

    let tree = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty());

    let TypeDecl::Class(c) = &tree.types[0] else {
        panic!()
    };
    let Member::Method(m) = &c.members[0] else {
        panic!()
    };
    let body = m.body.as_ref().unwrap();
    let slot_of = |s: &Stmt| {
        let Stmt::Block(b) = s else { panic!() };
        let Stmt::VarDecl(d) = &b.stmts[0] else {
            panic!()
        };
        d.slot.unwrap()
    };
    assert_eq!(slot_of(&body.stmts[0]), 0);
    assert_eq!(slot_of(&body.stmts[1]), 1);
}

#[test]
fn for_each_over_array_gets_index_counter_lowering() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let for_each = Stmt::ForEach(ForEachStmt {
        var_name: "v".to_string(),
        var_ty_spec: TypeSpec::Int,
        iterable: var("values"),
        body: block(Vec::new()),
        span: sp(),
        var_ty: None,
        var_slot: None,
        lowering: None,
    });
    let mut m = method("total", true, TypeSpec::Void, vec![for_each]);
    m.params = vec![FormalParam {
        name: "values".to_string(),
        ty_spec: TypeSpec::Array(Box::new(TypeSpec::Int)),
        span: sp(),
        ty: None,
        slot: None,
    }];
    let tree = unit(vec![class("Main", vec![Member::Method(m)])]);

    let tree = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let TypeDecl::Class(c) = &tree.types[0] else {
        panic!()
    };
    let Member::Method(m) = &c.members[0] else {
        panic!()
    };
    let Stmt::ForEach(f) = &m.body.as_ref().unwrap().stmts[0] else {
        panic!()
    };
    // Parameter takes slot 0; hidden array and index counters follow,
    // then the loop variable.
    let Some(ForEachLowering::Array {
        array_slot,
        index_slot,
    }) = &f.lowering
    else {
        panic!("expected array lowering, got {:?}", f.lowering)
    };
    assert_eq!(*array_slot, 1);
    assert_eq!(*index_slot, 2);
    assert_eq!(f.var_slot, Some(3));
}

#[test]
fn for_each_over_iterator_protocol_type() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();

    // class RangeIter { boolean hasNext() {...} int next() {...} }
    let range_iter = class(
        "RangeIter",
        vec![
            Member::Method(method(
                "hasNext",
                false,
                TypeSpec::Boolean,
                vec![Stmt::Return {
                    value: Some(Expr::Literal {
                        value: Literal::Bool(false),
                        span: sp(),
                        ty: None,
                    }),
                    span: sp(),
                }],
            )),
            Member::Method(method(
                "next",
                false,
                TypeSpec::Int,
                vec![Stmt::Return {
                    value: Some(int_lit(0)),
                    span: sp(),
                }],
            )),
        ],
    );
    // class Range { RangeIter iterator() { return new RangeIter(); } }
    let range = class(
        "Range",
        vec![Member::Method(method(
            "iterator",
            false,
            TypeSpec::Named("RangeIter".to_string()),
            vec![Stmt::Return {
                value: Some(Expr::New {
                    class: TypeSpec::Named("RangeIter".to_string()),
                    args: Vec::new(),
                    span: sp(),
                    ty: None,
                    resolved: None,
                }),
                span: sp(),
            }],
        ))],
    );
    let for_each = Stmt::ForEach(ForEachStmt {
        var_name: "v".to_string(),
        var_ty_spec: TypeSpec::Int,
        iterable: var("r"),
        body: block(Vec::new()),
        span: sp(),
        var_ty: None,
        var_slot: None,
        lowering: None,
    });
    let mut m = method("walk", true, TypeSpec::Void, vec![for_each]);
    m.params = vec![FormalParam {
        name: "r".to_string(),
        ty_spec: TypeSpec::Named("Range".to_string()),
        span: sp(),
        ty: None,
        slot: None,
    }];
    let tree = unit(vec![range_iter, range, class("Main", vec![Member::Method(m)])]);

    let tree = analyze(tree, &mut registry, &mut diags);
    assert!(diags.is_empty(), "{:?}", diags.entries());

    let TypeDecl::Class(c) = &tree.types[2] else {
        panic!()
    };
    let Member::Method(m) = &c.members[0] else {
        panic!()
    };
    let Stmt::ForEach(f) = &m.body.as_ref().unwrap().stmts[0] else {
        panic!()
    };
    let Some(ForEachLowering::Iterator { iter_slot, protocol }) = &f.lowering else {
        panic!("expected iterator lowering, got {:?}", f.lowering)
    };
    assert_eq!(*iter_slot, 1);
    assert_eq!(protocol.element_ty, registry.int());
    assert_eq!(protocol.has_next_sig.name, "hasNext");
}

#[test]
fn shift_operands_must_be_int() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method(
            "bad",
            true,
            TypeSpec::Void,
            vec![decl_stmt(
                "x",
                TypeSpec::Int,
                bin(BinaryOp::Ushr, double_lit(1.5), int_lit(2)),
            )],
        ))],
    )]);

    analyze(tree, &mut registry, &mut diags);
    assert_eq!(diags.len(), 1, "{:?}", diags.entries());
    assert!(matches!(
        diags.entries()[0].error,
        SemanticError::TypeMismatch { .. }
    ));
}

#[test]
fn compound_shift_assign_on_double_target_is_rejected() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method(
            "bad",
            true,
            TypeSpec::Void,
            vec![
                decl_stmt("d", TypeSpec::Double, double_lit(1.0)),
                expr_stmt(Expr::Assign {
                    op: AssignOp::ShlAssign,
                    target: Box::new(var("d")),
                    value: Box::new(int_lit(1)),
                    span: sp(),
                    ty: None,
                    lvalue: None,
                    is_statement: false,
                }),
            ],
        ))],
    )]);

    analyze(tree, &mut registry, &mut diags);
    assert_eq!(diags.len(), 1, "{:?}", diags.entries());
    assert!(matches!(
        diags.entries()[0].error,
        SemanticError::TypeMismatch { .. }
    ));
}

#[test]
fn missing_return_in_non_void_method() {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = unit(vec![class(
        "Main",
        vec![Member::Method(method("get", true, TypeSpec::Int, vec![]))],
    )]);

    analyze(tree, &mut registry, &mut diags);
    assert_eq!(diags.len(), 1);
    assert!(matches!(
        diags.entries()[0].error,
        SemanticError::MissingReturn { .. }
    ));
}
