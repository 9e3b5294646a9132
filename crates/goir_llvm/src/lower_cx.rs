//! The master lowering context: one instance drives a single compilation
//! unit start-to-finish with one IR builder (§5 — single-threaded,
//! cooperative, no suspension points).
//!
//! Bundles the builder, type cache, scope, current function, and
//! module-level caches into one struct that the rest of C2–C7 implement
//! methods on, spread across `value.rs`/`runtime.rs`/`runtime_types.rs`/
//! `selector.rs`/`call.rs`/`builtins.rs`/`visitor/*.rs` by concern rather
//! than bundled into a single monolithic type.

use goir_hir::{ExprArena, Name, StringInterner, TypePool};
use inkwell::builder::Builder;
use inkwell::values::{FunctionValue, GlobalValue};
use rustc_hash::FxHashMap;

use crate::config::LowerConfig;
use crate::context::SimpleCx;
use crate::layout::Layout;
use crate::scope::{Scope, SlotArena};
use crate::types::TypeMapper;

pub struct LowerCx<'ll, 'a> {
    pub scx: &'a SimpleCx<'ll>,
    pub config: &'a LowerConfig,
    pub builder: Builder<'ll>,
    pub types: TypeMapper<'ll, 'a>,
    pub layout: Layout,
    pub pool: &'a TypePool,
    pub exprs: &'a ExprArena,
    pub interner: &'a StringInterner,

    /// Declared/defined functions, keyed by their source name (predefine
    /// then define, mirroring `ori_llvm::declare`'s two-phase pattern).
    pub functions: FxHashMap<Name, FunctionValue<'ll>>,

    pub scope: Scope<'ll>,
    pub slots: SlotArena<'ll>,
    pub current_function: Option<FunctionValue<'ll>>,

    /// C2's descriptor cache, folded in here rather than a separate
    /// lifetime-entangled struct: same structural key as `types`'s cache,
    /// same monotonic-growth discipline (§5).
    pub(crate) descriptor_cache: FxHashMap<String, GlobalValue<'ll>>,
}

impl<'ll, 'a> LowerCx<'ll, 'a> {
    pub fn new(
        scx: &'a SimpleCx<'ll>,
        config: &'a LowerConfig,
        pool: &'a TypePool,
        exprs: &'a ExprArena,
        interner: &'a StringInterner,
    ) -> Self {
        Self {
            scx,
            config,
            builder: scx.llcx.create_builder(),
            types: TypeMapper::new(scx, config),
            layout: Layout::native(),
            pool,
            exprs,
            interner,
            functions: FxHashMap::default(),
            scope: Scope::new(),
            slots: SlotArena::new(),
            current_function: None,
            descriptor_cache: FxHashMap::default(),
        }
    }

    pub fn current_function(&self) -> FunctionValue<'ll> {
        self.current_function
            .expect("current_function accessed outside of a function body")
    }
}
