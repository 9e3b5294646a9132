//! Expression/type lowering engine for the source language's LLVM front-end.
//!
//! This crate implements the "hardest parts" of lowering a typed AST to LLVM
//! IR: mapping source types to LLVM types and runtime reflection descriptors
//! (C1/C2), the tagged `Value` abstraction (C3), string/slice/map lowerings
//! through a fixed runtime ABI (C4), the recursive expression visitor (C5,
//! including short-circuit `&&`/`||`), embedded-field/interface selector
//! resolution (C6), and the built-in/call dispatcher (C7).
//!
//! # Architecture
//!
//! - **Context** (`context.rs`): `SimpleCx`, a thin wrapper over an inkwell
//!   `Context`/`Module` pair for constructing primitive/aggregate LLVM types.
//! - **Lowering context** (`lower_cx.rs`): `LowerCx`, the per-compilation
//!   struct every other module implements methods on — one IR builder, one
//!   type cache, one descriptor cache, one scope, for the lifetime of a
//!   single compilation unit (§5: single-threaded, cooperative).
//! - **Types** (`types.rs`): C1, the source-type → LLVM-type mapper.
//! - **Runtime types** (`runtime_types.rs`): C2, the runtime reflection
//!   descriptor builder.
//! - **Value** (`value.rs`): C3, the tagged `Value`/`LLVMValue`/`ConstValue`/
//!   `TypeValue` union and its `convert`/`binary_op`/`unary_op` operations.
//! - **Runtime** (`runtime.rs`): C4, calls into the fixed `goir_runtime` ABI
//!   for strings/slices/maps.
//! - **Visitor** (`visitor/`): C5, the recursive expression lowering
//!   dispatch, including short-circuit evaluation (`visitor/shortcircuit.rs`).
//! - **Selector** (`selector.rs`): C6, embedded-field/interface resolution.
//! - **Call/builtins** (`call.rs`, `builtins.rs`): C7, call-form dispatch and
//!   built-in lowerings.
//!
//! # Debugging
//!
//! Enable tracing with environment variables:
//! - `RUST_LOG=goir_llvm=debug` — debug-level tracing
//! - `RUST_LOG=goir_llvm=trace` — trace-level (very verbose)
//!
//! # Example
//!
//!     use goir_llvm::config::LowerConfig;
//!     use goir_llvm::context::SimpleCx;
//!     use goir_llvm::lower_cx::LowerCx;
//!     use goir_hir::{ExprArena, StringInterner, TypePool};
//!     use inkwell::context::Context;
//!
//!     let llcx = Context::create();
//!     let scx = SimpleCx::new(&llcx, "m", 64);
//!     let config = LowerConfig::default();
//!     let pool = TypePool::new();
//!     let exprs = ExprArena::new();
//!     let interner = StringInterner::new();
//!     let mut cx = LowerCx::new(&scx, &config, &pool, &exprs, &interner);

pub mod builtins;
pub mod call;
pub mod config;
pub mod context;
pub mod error;
pub mod layout;
pub mod lower_cx;
pub mod runtime;
pub mod runtime_types;
pub mod scope;
pub mod selector;
pub mod types;
pub mod value;
pub mod visitor;

pub use config::LowerConfig;
pub use context::SimpleCx;
pub use error::{CodegenError, Result};
pub use lower_cx::LowerCx;
pub use value::{ConstValue, LLVMValue, TypeValue, Value};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=goir_llvm=debug` or `RUST_LOG=goir_llvm=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
