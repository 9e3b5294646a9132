//! Failure modes of the lowering engine (§7).
//!
//! Every fatal condition halts the current compilation and is returned to
//! the caller with a message; no partial modules are handed out. `?` is
//! used throughout C1–C7, never `unwrap`/`expect` outside tests.

use goir_hir::ExprId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    /// C1 hit `Bad`, `Chan`, or another type it does not implement.
    #[error("unsupported type in lowering: {detail}")]
    UnsupportedType { detail: String },

    /// A built-in name appeared somewhere other than a callable position.
    #[error("built-in `{name}` cannot be resolved in this position")]
    UnresolvedBuiltin { name: String },

    /// An argument could not be converted to its declared parameter type.
    #[error("type mismatch: cannot convert value of type {found} to {expected}")]
    TypeMismatch { expected: String, found: String },

    /// Selector BFS (§4.6) exhausted without a hit. The type checker should
    /// have prevented this; kept here as a defensive backstop.
    #[error("selector `{name}` not found on type {on_type}")]
    SelectorNotFound { name: String, on_type: String },

    /// LLVM rejected the emitted module.
    #[error("module failed IR verification: {message}")]
    IRVerificationFailure { message: String },

    /// An AST shape reached this code that an earlier pass should have
    /// filtered out.
    #[error("unreachable expression shape at {expr:?}: {detail}")]
    Unreachable { expr: ExprId, detail: String },
}

pub type Result<T> = std::result::Result<T, CodegenError>;
