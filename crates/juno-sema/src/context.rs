//! The scope chain
//!
//! One `ScopeChain` lives for the duration of an analysis run. It holds at
//! most one class frame and one method frame at a time, plus a stack of
//! block scopes for locals. Slot allocation is monotonic within a method:
//! leaving a block pops its names but never rewinds the counter, so
//! sibling blocks get distinct offsets.

use crate::symbols::LocalDef;
use juno_types::TypeId;
use rustc_hash::FxHashMap;

/// Facts about the class currently being analyzed.
#[derive(Debug, Clone, Copy)]
pub struct ClassFrame {
    /// The class's type.
    pub ty: TypeId,
}

/// Facts about the method currently being analyzed.
#[derive(Debug, Clone, Copy)]
pub struct MethodFrame {
    /// Declared return type.
    pub return_ty: TypeId,
    /// Whether the method is static (no `this` in slot 0).
    pub is_static: bool,
    /// Set when a return statement is analyzed anywhere in the body.
    pub has_return: bool,
    next_slot: u32,
}

impl MethodFrame {
    /// Number of local slots the method body uses.
    pub fn max_slots(&self) -> u32 {
        self.next_slot
    }
}

/// The nested scopes of one analysis run.
#[derive(Debug, Default)]
pub struct ScopeChain {
    class: Option<ClassFrame>,
    method: Option<MethodFrame>,
    blocks: Vec<FxHashMap<String, LocalDef>>,
}

impl ScopeChain {
    /// Fresh, empty chain.
    pub fn new() -> Self {
        ScopeChain::default()
    }

    /// Enter a class body.
    pub fn enter_class(&mut self, ty: TypeId) {
        self.class = Some(ClassFrame { ty });
    }

    /// Leave the current class body.
    pub fn exit_class(&mut self) {
        self.class = None;
    }

    /// The class being analyzed, if any.
    pub fn current_class(&self) -> Option<TypeId> {
        self.class.map(|c| c.ty)
    }

    /// Enter a method body. Slot 0 belongs to `this` in instance methods,
    /// so the counter starts at 1 there and at 0 in static methods.
    pub fn enter_method(&mut self, return_ty: TypeId, is_static: bool) {
        self.method = Some(MethodFrame {
            return_ty,
            is_static,
            has_return: false,
            next_slot: if is_static { 0 } else { 1 },
        });
        self.blocks.clear();
        self.blocks.push(FxHashMap::default());
    }

    /// Leave the current method body, yielding its accumulated facts.
    pub fn exit_method(&mut self) -> Option<MethodFrame> {
        self.blocks.clear();
        self.method.take()
    }

    /// The method frame, if inside a method.
    pub fn method(&self) -> Option<&MethodFrame> {
        self.method.as_ref()
    }

    /// Record that a return statement was seen.
    pub fn mark_return(&mut self) {
        if let Some(m) = &mut self.method {
            m.has_return = true;
        }
    }

    /// Open a nested block scope.
    pub fn push_block(&mut self) {
        self.blocks.push(FxHashMap::default());
    }

    /// Close the innermost block scope. Slots stay allocated.
    pub fn pop_block(&mut self) {
        self.blocks.pop();
    }

    /// Allocate the next local slot without binding a name. Used for the
    /// hidden temporaries of loop and try lowering.
    pub fn alloc_slot(&mut self) -> u32 {
        let m = self
            .method
            .as_mut()
            .expect("slot allocation outside a method");
        let slot = m.next_slot;
        m.next_slot += 1;
        slot
    }

    /// Bind a name in the innermost block, allocating its slot. Returns
    /// `None` when the name is already bound in that same block (shadowing
    /// an outer block's binding is allowed).
    pub fn define(&mut self, name: &str, ty: TypeId) -> Option<u32> {
        if self
            .blocks
            .last()
            .map(|b| b.contains_key(name))
            .unwrap_or(false)
        {
            return None;
        }
        let slot = self.alloc_slot();
        self.blocks
            .last_mut()
            .expect("no open block scope")
            .insert(name.to_string(), LocalDef { ty, slot });
        Some(slot)
    }

    /// Innermost-out lookup of a local or parameter.
    pub fn lookup(&self, name: &str) -> Option<LocalDef> {
        self.blocks.iter().rev().find_map(|b| b.get(name).copied())
    }
}
