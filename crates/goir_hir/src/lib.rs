//! Minimal stand-in for an already-resolved typed AST: just enough shape to
//! drive and test the lowering engine in `goir_llvm` without being a parser
//! or type checker.

pub mod expr;
pub mod name;
pub mod types;

pub use expr::{BinOp, ExprArena, ExprId, ExprKind, Lit, ObjKind, Object, UnOp};
pub use name::{Name, StringInterner};
pub use types::{BasicKind, Field, Method, TypeId, TypeKind, TypePool};
