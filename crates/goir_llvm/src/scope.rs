//! Per-function slot arena and lexical scope.
//!
//! Grounded on `ori_llvm::codegen::value_id` (arena + opaque-id pattern) and
//! `ori_llvm::codegen::scope::Scope` (persistent `im::HashMap` bindings, so
//! entering/leaving a lexical block is a cheap structural-sharing clone
//! rather than a deep copy or a push/pop stack).

use goir_hir::{Name, TypeId};
use im::HashMap as ImHashMap;
use inkwell::values::PointerValue;

use crate::value::Value;

/// Opaque handle into a `SlotArena`. Addressable (stack-allocated) locals
/// are referenced this way rather than by their raw `PointerValue` so that
/// `Value::pointer`/`receiver` back-references stay decoupled from
/// inkwell's `'ll` lifetime threading through every call site (§9's design
/// note on back-references as relations, not ownership edges).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct SlotId(u32);

/// Owns every `alloca` created for addressable locals within one function
/// lowering. Slots outlive the `Value`s that reference them for the
/// duration of the enclosing function.
pub struct SlotArena<'ll> {
    slots: Vec<PointerValue<'ll>>,
}

impl<'ll> SlotArena<'ll> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn alloc(&mut self, ptr: PointerValue<'ll>) -> SlotId {
        let id = SlotId(self.slots.len() as u32);
        self.slots.push(ptr);
        id
    }

    pub fn get(&self, id: SlotId) -> PointerValue<'ll> {
        self.slots[id.0 as usize]
    }
}

impl<'ll> Default for SlotArena<'ll> {
    fn default() -> Self {
        Self::new()
    }
}

/// What a name in scope is bound to.
#[derive(Copy, Clone)]
pub enum ScopeBinding<'ll> {
    /// A value that was never stored to a stack slot (e.g. a function
    /// parameter passed by value, never reassigned).
    Immutable(Value<'ll>),
    /// An addressable local: `name`'s current value must be loaded from
    /// `slot` on every read.
    Mutable { slot: SlotId, ty: TypeId },
}

/// Lexical scope: a persistent map from name to binding. Cloning a `Scope`
/// (e.g. on entering a nested block) is O(1) thanks to `im::HashMap`'s
/// structural sharing; mutations inside the child are invisible to the
/// parent once the child scope is dropped.
#[derive(Clone)]
pub struct Scope<'ll> {
    bindings: ImHashMap<Name, ScopeBinding<'ll>>,
}

impl<'ll> Scope<'ll> {
    pub fn new() -> Self {
        Self {
            bindings: ImHashMap::new(),
        }
    }

    pub fn define_immutable(&mut self, name: Name, value: Value<'ll>) {
        self.bindings.insert(name, ScopeBinding::Immutable(value));
    }

    pub fn define_mutable(&mut self, name: Name, slot: SlotId, ty: TypeId) {
        self.bindings.insert(name, ScopeBinding::Mutable { slot, ty });
    }

    pub fn lookup(&self, name: Name) -> Option<ScopeBinding<'ll>> {
        self.bindings.get(&name).copied()
    }

    /// A child scope that starts as a copy of `self`; bindings added to the
    /// child never leak back into `self`.
    pub fn child(&self) -> Self {
        self.clone()
    }
}

impl<'ll> Default for Scope<'ll> {
    fn default() -> Self {
        Self::new()
    }
}
