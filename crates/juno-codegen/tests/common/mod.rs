//! Shared fixtures for the codegen suites: tree builders mirroring the
//! analyzer tests, a build helper running analysis plus codegen, and a
//! small stack evaluator that executes symbolic modules directly so the
//! emitted streams can be checked by behavior, not just by shape.

#![allow(dead_code)]

use juno_ast::{
    AssignOp, BinaryOp, Block, CatchClause, ClassDecl, CompilationUnit, Expr, FieldDecl,
    ForEachStmt, FormalParam, Literal, Member, MethodDecl, Modifiers, Span, Stmt, TryStmt,
    TypeDecl, UnaryOp, VarDecl,
};
use juno_codegen::{Constant, Instruction, Label, MethodDef, ModuleDef, Op};
use juno_sema::Diagnostics;
use juno_types::{TypeRegistry, TypeSpec};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

// ============================================================================
// Tree builders
// ============================================================================

pub fn sp() -> Span {
    Span::synthetic(1)
}

pub fn int_lit(v: i32) -> Expr {
    Expr::Literal {
        value: Literal::Int(v),
        span: sp(),
        ty: None,
    }
}

pub fn double_lit(v: f64) -> Expr {
    Expr::Literal {
        value: Literal::Double(v),
        span: sp(),
        ty: None,
    }
}

pub fn str_lit(s: &str) -> Expr {
    Expr::Literal {
        value: Literal::Str(s.to_string()),
        span: sp(),
        ty: None,
    }
}

pub fn bool_lit(v: bool) -> Expr {
    Expr::Literal {
        value: Literal::Bool(v),
        span: sp(),
        ty: None,
    }
}

pub fn var(name: &str) -> Expr {
    Expr::Var {
        name: name.to_string(),
        span: sp(),
        slot: None,
        ty: None,
    }
}

pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span: sp(),
        ty: None,
    }
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    Expr::Unary {
        op,
        operand: Box::new(operand),
        span: sp(),
        ty: None,
        lvalue: None,
        is_statement: false,
    }
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    assign_op(AssignOp::Assign, target, value)
}

pub fn assign_op(op: AssignOp, target: Expr, value: Expr) -> Expr {
    Expr::Assign {
        op,
        target: Box::new(target),
        value: Box::new(value),
        span: sp(),
        ty: None,
        lvalue: None,
        is_statement: false,
    }
}

pub fn call(target: Option<Expr>, name: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        target: target.map(Box::new),
        name: name.to_string(),
        args,
        span: sp(),
        ty: None,
        resolved: None,
    }
}

pub fn new_obj(class: &str, args: Vec<Expr>) -> Expr {
    Expr::New {
        class: TypeSpec::Named(class.to_string()),
        args,
        span: sp(),
        ty: None,
        resolved: None,
    }
}

pub fn new_array(element: TypeSpec, length: Expr) -> Expr {
    Expr::NewArray {
        element,
        length: Box::new(length),
        span: sp(),
        ty: None,
    }
}

pub fn index(array: Expr, idx: Expr) -> Expr {
    Expr::ArrayIndex {
        array: Box::new(array),
        index: Box::new(idx),
        span: sp(),
        ty: None,
    }
}

pub fn ternary(cond: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    Expr::Ternary {
        cond: Box::new(cond),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
        span: sp(),
        ty: None,
    }
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::Expr { expr, span: sp() }
}

pub fn decl_stmt(name: &str, ty_spec: TypeSpec, init: Expr) -> Stmt {
    Stmt::VarDecl(VarDecl {
        name: name.to_string(),
        ty_spec,
        init: Some(init),
        span: sp(),
        ty: None,
        slot: None,
    })
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return {
        value: Some(value),
        span: sp(),
    }
}

pub fn ret_void() -> Stmt {
    Stmt::Return {
        value: None,
        span: sp(),
    }
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block { stmts, span: sp() }
}

pub fn throw_stmt(value: Expr) -> Stmt {
    Stmt::Throw { value, span: sp() }
}

pub fn catch_clause(param_name: &str, ty: &str, body: Vec<Stmt>) -> CatchClause {
    CatchClause {
        param_name: param_name.to_string(),
        ty_specs: vec![TypeSpec::Named(ty.to_string())],
        body: block(body),
        span: sp(),
        param_ty: None,
        param_slot: None,
        resolved_tys: Vec::new(),
    }
}

pub fn try_stmt(body: Vec<Stmt>, catches: Vec<CatchClause>, finally: Option<Vec<Stmt>>) -> Stmt {
    Stmt::Try(TryStmt {
        body: block(body),
        catches,
        finally: finally.map(block),
        span: sp(),
        finally_slot: None,
    })
}

pub fn for_each(var_name: &str, var_ty: TypeSpec, iterable: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::ForEach(ForEachStmt {
        var_name: var_name.to_string(),
        var_ty_spec: var_ty,
        iterable,
        body: block(body),
        span: sp(),
        var_ty: None,
        var_slot: None,
        lowering: None,
    })
}

pub fn param(name: &str, ty_spec: TypeSpec) -> FormalParam {
    FormalParam {
        name: name.to_string(),
        ty_spec,
        span: sp(),
        ty: None,
        slot: None,
    }
}

pub fn method(name: &str, is_static: bool, return_spec: TypeSpec, body: Vec<Stmt>) -> MethodDecl {
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

pub fn field(name: &str, is_static: bool, ty_spec: TypeSpec, init: Option<Expr>) -> FieldDecl {
    FieldDecl {
        mods: Modifiers {
            is_private: true,
            is_static,
            ..Modifiers::default()
        },
        name: name.to_string(),
        ty_spec,
        init,
        span: sp(),
        ty: None,
    }
}

pub fn class(name: &str, members: Vec<Member>) -> ClassDecl {
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

pub fn unit(classes: Vec<ClassDecl>) -> CompilationUnit {
    CompilationUnit {
        package: None,
        types: classes.into_iter().map(TypeDecl::Class).collect(),
    }
}

/// Analyze a tree and compile it, asserting both stages stay clean.
pub fn build(tree: CompilationUnit) -> ModuleDef {
    let mut registry = TypeRegistry::new();
    let mut diags = Diagnostics::new();
    let tree = juno_sema::analyze(tree, &mut registry, &mut diags);
    assert!(
        diags.is_empty(),
        "analysis diagnostics: {:?}",
        diags.entries()
    );
    juno_codegen::compile(&tree, &registry).expect("codegen failed")
}

// ============================================================================
// Stack evaluator
// ============================================================================

/// A runtime value of the evaluator. One stack slot each, like the
/// target machine.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i32),
    Double(f64),
    Str(String),
    Null,
    Obj(Rc<RefCell<Object>>),
    Array(Rc<RefCell<Vec<Value>>>),
}

#[derive(Debug)]
pub struct Object {
    pub class: String,
    pub fields: FxHashMap<String, Value>,
}

impl Value {
    pub fn as_int(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            other => panic!("expected int, got {:?}", other),
        }
    }

    pub fn as_double(&self) -> f64 {
        match self {
            Value::Double(v) => *v,
            other => panic!("expected double, got {:?}", other),
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => panic!("expected string, got {:?}", other),
        }
    }

    fn stringify(&self) -> String {
        match self {
            Value::Int(v) => v.to_string(),
            Value::Double(v) => v.to_string(),
            Value::Str(s) => s.clone(),
            Value::Null => "null".to_string(),
            Value::Obj(o) => format!("{}@obj", o.borrow().class),
            Value::Array(_) => "array".to_string(),
        }
    }
}

enum Flow {
    Next,
    Jump(usize),
    Return(Option<Value>),
    Raise(Value),
}

/// Interprets the symbolic instruction streams of one module. Built-in
/// `java/lang` members used by compiled code (`Object.<init>`,
/// `Throwable.<init>`, `getMessage`, `String.length`) are intercepted.
pub struct Machine<'m> {
    module: &'m ModuleDef,
    statics: FxHashMap<(String, String), Value>,
    initialized: Vec<String>,
}

impl<'m> Machine<'m> {
    pub fn new(module: &'m ModuleDef) -> Self {
        Machine {
            module,
            statics: FxHashMap::default(),
            initialized: Vec::new(),
        }
    }

    /// Call a static method, panicking on an uncaught exception.
    pub fn call_static(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Value {
        match self.invoke_static(class, name, descriptor, args) {
            Ok(v) => v.unwrap_or(Value::Null),
            Err(e) => panic!("uncaught exception: {:?}", e),
        }
    }

    /// Call a static method, surfacing a thrown value as `Err`.
    pub fn call_static_caught(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Value> {
        self.invoke_static(class, name, descriptor, args)
    }

    /// Read a static field, running the class initializer if needed.
    pub fn static_field(&mut self, class: &str, name: &str) -> Value {
        self.ensure_initialized(class);
        if let Some(value) = self.statics.get(&(class.to_string(), name.to_string())) {
            return value.clone();
        }
        // Never written: the declared field's default.
        self.module
            .type_named(class)
            .and_then(|t| t.fields.iter().find(|f| f.name == name))
            .map(|f| default_for_descriptor(&f.descriptor))
            .unwrap_or(Value::Null)
    }

    fn invoke_static(
        &mut self,
        class: &str,
        name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, Value> {
        self.ensure_initialized(class);
        let method = self
            .module
            .type_named(class)
            .and_then(|t| t.method(name, descriptor))
            .unwrap_or_else(|| panic!("no static method {}.{}{}", class, name, descriptor));
        self.run_frame(method, args)
    }

    fn ensure_initialized(&mut self, class: &str) {
        if self.initialized.iter().any(|c| c == class) {
            return;
        }
        self.initialized.push(class.to_string());
        let clinit = self
            .module
            .type_named(class)
            .and_then(|t| t.method("<clinit>", "()V"));
        if let Some(m) = clinit {
            self.run_frame(m, Vec::new())
                .expect("class initializer threw");
        }
    }

    fn run_frame(
        &mut self,
        method: &'m MethodDef,
        mut locals: Vec<Value>,
    ) -> Result<Option<Value>, Value> {
        let labels: FxHashMap<Label, usize> = method
            .code
            .iter()
            .enumerate()
            .filter_map(|(i, ins)| match ins {
                Instruction::Label(l) => Some((*l, i)),
                _ => None,
            })
            .collect();
        let mut stack: Vec<Value> = Vec::new();
        let mut pc = 0usize;
        loop {
            if pc >= method.code.len() {
                return Ok(None);
            }
            let flow = self.exec(&method.code[pc], &mut stack, &mut locals, &labels);
            match flow {
                Flow::Next => pc += 1,
                Flow::Jump(target) => pc = target,
                Flow::Return(v) => return Ok(v),
                Flow::Raise(exn) => match self.handler_for(method, &labels, pc, &exn) {
                    Some(handler) => {
                        stack.clear();
                        stack.push(exn);
                        pc = handler;
                    }
                    None => return Err(exn),
                },
            }
        }
    }

    fn handler_for(
        &self,
        method: &MethodDef,
        labels: &FxHashMap<Label, usize>,
        pc: usize,
        exn: &Value,
    ) -> Option<usize> {
        for entry in &method.exception_table {
            let start = labels[&entry.start];
            let end = labels[&entry.end];
            if pc < start || pc >= end {
                continue;
            }
            match &entry.catch_type {
                None => return Some(labels[&entry.handler]),
                Some(caught) => {
                    if let Value::Obj(o) = exn {
                        if self.is_subclass(&o.borrow().class, caught) {
                            return Some(labels[&entry.handler]);
                        }
                    }
                }
            }
        }
        None
    }

    fn is_subclass(&self, class: &str, target: &str) -> bool {
        let mut current = class.to_string();
        loop {
            if current == target {
                return true;
            }
            let parent = self
                .module
                .type_named(&current)
                .and_then(|t| t.super_name.clone())
                .or_else(|| builtin_super(&current));
            match parent {
                Some(p) => current = p,
                None => return false,
            }
        }
    }

    fn exec(
        &mut self,
        ins: &Instruction,
        stack: &mut Vec<Value>,
        locals: &mut Vec<Value>,
        labels: &FxHashMap<Label, usize>,
    ) -> Flow {
        match ins {
            Instruction::Label(_) => Flow::Next,

            Instruction::Ldc(c) => {
                stack.push(match c {
                    Constant::Int(v) => Value::Int(*v),
                    Constant::Double(v) => Value::Double(*v),
                    Constant::Str(s) => Value::Str(s.clone()),
                    Constant::Null => Value::Null,
                });
                Flow::Next
            }

            Instruction::Slot { op: Op::LoadLocal, slot } => {
                stack.push(locals[*slot as usize].clone());
                Flow::Next
            }
            Instruction::Slot { op: Op::StoreLocal, slot } => {
                let slot = *slot as usize;
                if locals.len() <= slot {
                    locals.resize(slot + 1, Value::Null);
                }
                locals[slot] = stack.pop().unwrap();
                Flow::Next
            }
            Instruction::Slot { op, .. } => panic!("bad slot op {:?}", op),

            Instruction::Inc { slot, delta } => {
                let slot = *slot as usize;
                if locals.len() <= slot {
                    locals.resize(slot + 1, Value::Null);
                }
                locals[slot] = Value::Int(locals[slot].as_int() + delta);
                Flow::Next
            }

            Instruction::Branch { op, target } => {
                let target = labels[target];
                match op {
                    Op::Goto => Flow::Jump(target),
                    Op::IfEq | Op::IfNe => {
                        let v = stack.pop().unwrap().as_int();
                        let taken = (v == 0) == matches!(op, Op::IfEq);
                        if taken {
                            Flow::Jump(target)
                        } else {
                            Flow::Next
                        }
                    }
                    Op::IfCmpEq | Op::IfCmpNe | Op::IfCmpLt | Op::IfCmpLe | Op::IfCmpGt
                    | Op::IfCmpGe => {
                        let b = stack.pop().unwrap();
                        let a = stack.pop().unwrap();
                        if compare_taken(*op, &a, &b) {
                            Flow::Jump(target)
                        } else {
                            Flow::Next
                        }
                    }
                    other => panic!("bad branch op {:?}", other),
                }
            }

            Instruction::TypeRef { op: Op::New, name } => {
                stack.push(Value::Obj(Rc::new(RefCell::new(Object {
                    class: name.clone(),
                    fields: FxHashMap::default(),
                }))));
                Flow::Next
            }
            Instruction::TypeRef { op: Op::NewArray, name } => {
                let length = stack.pop().unwrap().as_int() as usize;
                let fill = default_for_type_name(name);
                stack.push(Value::Array(Rc::new(RefCell::new(vec![fill; length]))));
                Flow::Next
            }
            Instruction::TypeRef { op, .. } => panic!("bad type op {:?}", op),

            Instruction::MemberRef {
                op,
                owner,
                name,
                descriptor,
            } => self.exec_member(*op, owner, name, descriptor, stack),

            Instruction::Simple(op) => self.exec_simple(*op, stack),
        }
    }

    fn exec_member(
        &mut self,
        op: Op,
        owner: &str,
        name: &str,
        descriptor: &str,
        stack: &mut Vec<Value>,
    ) -> Flow {
        match op {
            Op::GetStatic => {
                self.ensure_initialized(owner);
                let value = self
                    .statics
                    .get(&(owner.to_string(), name.to_string()))
                    .cloned()
                    .unwrap_or_else(|| default_for_descriptor(descriptor));
                stack.push(value);
                Flow::Next
            }
            Op::PutStatic => {
                self.ensure_initialized(owner);
                let value = stack.pop().unwrap();
                self.statics
                    .insert((owner.to_string(), name.to_string()), value);
                Flow::Next
            }
            Op::GetField => {
                let recv = stack.pop().unwrap();
                let Value::Obj(o) = recv else {
                    return Flow::Raise(self.make_exception("null receiver"));
                };
                let value = o
                    .borrow()
                    .fields
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| default_for_descriptor(descriptor));
                stack.push(value);
                Flow::Next
            }
            Op::PutField => {
                let value = stack.pop().unwrap();
                let recv = stack.pop().unwrap();
                let Value::Obj(o) = recv else {
                    return Flow::Raise(self.make_exception("null receiver"));
                };
                o.borrow_mut().fields.insert(name.to_string(), value);
                Flow::Next
            }
            Op::InvokeStatic => {
                let args = pop_n(stack, arg_count(descriptor));
                match self.invoke_static(owner, name, descriptor, args) {
                    Ok(Some(v)) => {
                        stack.push(v);
                        Flow::Next
                    }
                    Ok(None) => Flow::Next,
                    Err(e) => Flow::Raise(e),
                }
            }
            Op::InvokeVirtual | Op::InvokeInterface => {
                let args = pop_n(stack, arg_count(descriptor));
                let recv = stack.pop().unwrap();
                let dynamic = match &recv {
                    Value::Obj(o) => o.borrow().class.clone(),
                    Value::Str(_) => "java/lang/String".to_string(),
                    other => panic!("bad receiver {:?}", other),
                };
                match self.find_instance_method(&dynamic, name, descriptor) {
                    Some(m) => {
                        let mut locals = vec![recv];
                        locals.extend(args);
                        match self.run_frame(m, locals) {
                            Ok(Some(v)) => {
                                stack.push(v);
                                Flow::Next
                            }
                            Ok(None) => Flow::Next,
                            Err(e) => Flow::Raise(e),
                        }
                    }
                    None => self.builtin_call(recv, name, stack),
                }
            }
            Op::InvokeSpecial => {
                let args = pop_n(stack, arg_count(descriptor));
                let recv = stack.pop().unwrap();
                match self
                    .module
                    .type_named(owner)
                    .and_then(|t| t.method(name, descriptor))
                {
                    Some(m) => {
                        let mut locals = vec![recv];
                        locals.extend(args);
                        match self.run_frame(m, locals) {
                            Ok(_) => Flow::Next,
                            Err(e) => Flow::Raise(e),
                        }
                    }
                    // Built-in constructors: Throwable's takes a message.
                    None => {
                        if let (Value::Obj(o), Some(message)) = (&recv, args.first()) {
                            o.borrow_mut()
                                .fields
                                .insert("message".to_string(), message.clone());
                        }
                        Flow::Next
                    }
                }
            }
            other => panic!("bad member op {:?}", other),
        }
    }

    fn builtin_call(&mut self, recv: Value, name: &str, stack: &mut Vec<Value>) -> Flow {
        match (recv, name) {
            (Value::Str(s), "length") => {
                stack.push(Value::Int(s.chars().count() as i32));
                Flow::Next
            }
            (Value::Obj(o), "getMessage") => {
                let message = o.borrow().fields.get("message").cloned();
                stack.push(message.unwrap_or(Value::Null));
                Flow::Next
            }
            (recv, "toString") => {
                stack.push(Value::Str(recv.stringify()));
                Flow::Next
            }
            (recv, name) => panic!("unsupported builtin {}.{}", recv.stringify(), name),
        }
    }

    fn find_instance_method(
        &self,
        class: &str,
        name: &str,
        descriptor: &str,
    ) -> Option<&'m MethodDef> {
        let mut current = class.to_string();
        loop {
            let ty = self.module.type_named(&current)?;
            if let Some(m) = ty.method(name, descriptor) {
                if !m.is_abstract {
                    return Some(m);
                }
            }
            current = ty.super_name.clone().or_else(|| builtin_super(&current))?;
        }
    }

    fn make_exception(&self, message: &str) -> Value {
        let mut fields = FxHashMap::default();
        fields.insert("message".to_string(), Value::Str(message.to_string()));
        Value::Obj(Rc::new(RefCell::new(Object {
            class: "java/lang/Exception".to_string(),
            fields,
        })))
    }

    fn exec_simple(&mut self, op: Op, stack: &mut Vec<Value>) -> Flow {
        match op {
            Op::Nop => {}
            Op::Pop => {
                stack.pop().unwrap();
            }
            Op::Dup => {
                let top = stack.last().unwrap().clone();
                stack.push(top);
            }
            Op::Dup2 => {
                let a = stack[stack.len() - 1].clone();
                let b = stack[stack.len() - 2].clone();
                stack.push(b);
                stack.push(a);
            }
            Op::DupX1 => {
                let top = stack.last().unwrap().clone();
                stack.insert(stack.len() - 2, top);
            }
            Op::DupX2 => {
                let top = stack.last().unwrap().clone();
                stack.insert(stack.len() - 3, top);
            }
            Op::Swap => {
                let len = stack.len();
                stack.swap(len - 1, len - 2);
            }

            Op::Iadd | Op::Isub | Op::Imul | Op::Idiv | Op::Irem | Op::Ishl | Op::Ishr
            | Op::Iushr | Op::Iand | Op::Ior | Op::Ixor => {
                let b = stack.pop().unwrap().as_int();
                let a = stack.pop().unwrap().as_int();
                let v = match op {
                    Op::Iadd => a.wrapping_add(b),
                    Op::Isub => a.wrapping_sub(b),
                    Op::Imul => a.wrapping_mul(b),
                    Op::Idiv => a.wrapping_div(b),
                    Op::Irem => a.wrapping_rem(b),
                    Op::Ishl => a.wrapping_shl(b as u32),
                    Op::Ishr => a.wrapping_shr(b as u32),
                    Op::Iushr => (a as u32).wrapping_shr(b as u32) as i32,
                    Op::Iand => a & b,
                    Op::Ior => a | b,
                    _ => a ^ b,
                };
                stack.push(Value::Int(v));
            }
            Op::Ineg => {
                let a = stack.pop().unwrap().as_int();
                stack.push(Value::Int(a.wrapping_neg()));
            }

            Op::Dadd | Op::Dsub | Op::Dmul | Op::Ddiv | Op::Drem => {
                let b = stack.pop().unwrap().as_double();
                let a = stack.pop().unwrap().as_double();
                let v = match op {
                    Op::Dadd => a + b,
                    Op::Dsub => a - b,
                    Op::Dmul => a * b,
                    Op::Ddiv => a / b,
                    _ => a % b,
                };
                stack.push(Value::Double(v));
            }
            Op::Dneg => {
                let a = stack.pop().unwrap().as_double();
                stack.push(Value::Double(-a));
            }

            Op::Sconcat => {
                let b = stack.pop().unwrap();
                let a = stack.pop().unwrap();
                stack.push(Value::Str(a.stringify() + &b.stringify()));
            }

            Op::ArrayLoad => {
                let idx = stack.pop().unwrap().as_int() as usize;
                let Value::Array(a) = stack.pop().unwrap() else {
                    panic!("array load on non-array")
                };
                let v = a.borrow()[idx].clone();
                stack.push(v);
            }
            Op::ArrayStore => {
                let v = stack.pop().unwrap();
                let idx = stack.pop().unwrap().as_int() as usize;
                let Value::Array(a) = stack.pop().unwrap() else {
                    panic!("array store on non-array")
                };
                a.borrow_mut()[idx] = v;
            }
            Op::ArrayLength => {
                let Value::Array(a) = stack.pop().unwrap() else {
                    panic!("array length on non-array")
                };
                let len = a.borrow().len() as i32;
                stack.push(Value::Int(len));
            }

            Op::Athrow => {
                return Flow::Raise(stack.pop().unwrap());
            }
            Op::Return => {
                return Flow::Return(None);
            }
            Op::ReturnValue => {
                return Flow::Return(Some(stack.pop().unwrap()));
            }

            other => panic!("unhandled op {:?}", other),
        }
        Flow::Next
    }
}

fn compare_taken(op: Op, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => match op {
            Op::IfCmpEq => a == b,
            Op::IfCmpNe => a != b,
            Op::IfCmpLt => a < b,
            Op::IfCmpLe => a <= b,
            Op::IfCmpGt => a > b,
            _ => a >= b,
        },
        (Value::Double(a), Value::Double(b)) => match op {
            Op::IfCmpEq => a == b,
            Op::IfCmpNe => a != b,
            Op::IfCmpLt => a < b,
            Op::IfCmpLe => a <= b,
            Op::IfCmpGt => a > b,
            _ => a >= b,
        },
        (a, b) => {
            // Reference equality only.
            let same = match (a, b) {
                (Value::Null, Value::Null) => true,
                (Value::Obj(x), Value::Obj(y)) => Rc::ptr_eq(x, y),
                (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
                (Value::Str(x), Value::Str(y)) => x == y,
                _ => false,
            };
            match op {
                Op::IfCmpEq => same,
                Op::IfCmpNe => !same,
                other => panic!("ordering compare on references: {:?}", other),
            }
        }
    }
}

fn pop_n(stack: &mut Vec<Value>, n: usize) -> Vec<Value> {
    let at = stack.len() - n;
    stack.split_off(at)
}

fn arg_count(descriptor: &str) -> usize {
    let close = descriptor.find(')').expect("malformed descriptor");
    let bytes = descriptor[1..close].as_bytes();
    let mut i = 0;
    let mut n = 0;
    while i < bytes.len() {
        while bytes[i] == b'[' {
            i += 1;
        }
        if bytes[i] == b'L' {
            while bytes[i] != b';' {
                i += 1;
            }
        }
        i += 1;
        n += 1;
    }
    n
}

fn default_for_descriptor(descriptor: &str) -> Value {
    match descriptor.as_bytes()[0] {
        b'I' | b'C' | b'Z' => Value::Int(0),
        b'D' => Value::Double(0.0),
        _ => Value::Null,
    }
}

fn default_for_type_name(name: &str) -> Value {
    match name {
        "int" | "char" | "boolean" => Value::Int(0),
        "double" => Value::Double(0.0),
        _ => Value::Null,
    }
}

fn builtin_super(class: &str) -> Option<String> {
    match class {
        "java/lang/Exception" => Some("java/lang/Throwable".to_string()),
        "java/lang/Throwable" | "java/lang/String" => Some("java/lang/Object".to_string()),
        _ => None,
    }
}
