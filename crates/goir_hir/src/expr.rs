//! Typed expression AST stand-in.
//!
//! This is deliberately not a parser or type checker: it is "just enough
//! shape" for the lowering engine in `goir_llvm` to walk and for tests to
//! build typed-AST fixtures by hand. Every node is pre-resolved — it already
//! carries the `TypeId` the (out-of-scope) checker would have assigned — so
//! the `expr → type` mapping required of the external "typed AST" contract
//! is just `ExprArena::ty(id)`.
//!
//! Arena-of-ids, mirroring `ori_ir::arena`/`ori_ir::expr_id`: nodes are
//! pushed into a `Vec` and referenced by the `Copy` `ExprId` handle, so a
//! call's argument list or a binary expression's operands are plain indices
//! rather than `Box<Expr>` trees.

use crate::name::Name;
use crate::types::TypeId;

/// Opaque handle into an `ExprArena`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    pub const NONE: ExprId = ExprId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }
}

/// Kind of resolved object an `Ident` refers to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ObjKind {
    Var,
    Fun,
    Typ,
    Con,
    Pkg,
}

/// A resolved object reference, as carried on an `Ident` leaf.
#[derive(Copy, Clone, Debug)]
pub struct Object {
    pub kind: ObjKind,
    pub name: Name,
    pub ty: TypeId,
}

/// A literal value as written at the `BasicLit` site. Strings are
/// pre-interned; integers/floats keep their source radix collapsed to a
/// single numeric representation (this stand-in does not model untyped
/// constant precision beyond `i64`/`f64`).
#[derive(Copy, Clone, Debug)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(Name),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
    LAnd,
    LOr,
}

impl BinOp {
    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::LAnd | BinOp::LOr)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eql | BinOp::Neq | BinOp::Lss | BinOp::Leq | BinOp::Gtr | BinOp::Geq
        )
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UnOp {
    Pos,
    Neg,
    Not,
    Xor,
    /// `*x` as a unary operator (address dereference).
    Deref,
    /// `&x` (address-of).
    Addr,
}

/// One node of the typed expression tree.
///
/// `CompositeLit`/`FuncLit` and other non-core node shapes are out of scope
/// here (§1): they belong to a sibling statement/declaration visitor and
/// this core only assumes they ultimately produce a `Value` consistent with
/// `goir_llvm::value::Value`.
#[derive(Clone, Debug)]
pub enum ExprKind {
    BasicLit(Lit),
    Ident(Object),
    Binary {
        op: BinOp,
        x: ExprId,
        y: ExprId,
    },
    Unary {
        op: UnOp,
        x: ExprId,
    },
    Paren(ExprId),
    Star(ExprId),
    Index {
        x: ExprId,
        index: ExprId,
    },
    Selector {
        x: ExprId,
        sel: Name,
    },
    Call {
        func: ExprId,
        args: Vec<ExprId>,
        /// `f(xs...)`: the final argument is already a slice of the
        /// variadic element type and must not be repacked.
        ellipsis: bool,
    },
    /// `x.(T)`. The `.(type)` switch form has no node here — it is handled
    /// entirely by the out-of-scope statement visitor.
    TypeAssert {
        x: ExprId,
        target: TypeId,
    },
}

struct ExprNode {
    kind: ExprKind,
    ty: TypeId,
}

/// Arena of typed expression nodes.
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(64)
        }
    }

    fn push(&mut self, kind: ExprKind, ty: TypeId) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(ExprNode { kind, ty });
        id
    }

    pub fn kind(&self, id: ExprId) -> &ExprKind {
        &self.nodes[id.0 as usize].kind
    }

    /// The type the (out-of-scope) checker assigned this node — the
    /// `expr → type` mapping required of the typed-AST input contract.
    pub fn ty(&self, id: ExprId) -> TypeId {
        self.nodes[id.0 as usize].ty
    }

    pub fn basic_lit(&mut self, lit: Lit, ty: TypeId) -> ExprId {
        self.push(ExprKind::BasicLit(lit), ty)
    }

    pub fn ident(&mut self, obj: Object) -> ExprId {
        let ty = obj.ty;
        self.push(ExprKind::Ident(obj), ty)
    }

    pub fn binary(&mut self, op: BinOp, x: ExprId, y: ExprId, ty: TypeId) -> ExprId {
        self.push(ExprKind::Binary { op, x, y }, ty)
    }

    pub fn unary(&mut self, op: UnOp, x: ExprId, ty: TypeId) -> ExprId {
        self.push(ExprKind::Unary { op, x }, ty)
    }

    pub fn paren(&mut self, x: ExprId) -> ExprId {
        let ty = self.ty(x);
        self.push(ExprKind::Paren(x), ty)
    }

    pub fn star(&mut self, x: ExprId, ty: TypeId) -> ExprId {
        self.push(ExprKind::Star(x), ty)
    }

    pub fn index(&mut self, x: ExprId, index: ExprId, ty: TypeId) -> ExprId {
        self.push(ExprKind::Index { x, index }, ty)
    }

    pub fn selector(&mut self, x: ExprId, sel: Name, ty: TypeId) -> ExprId {
        self.push(ExprKind::Selector { x, sel }, ty)
    }

    pub fn call(&mut self, func: ExprId, args: Vec<ExprId>, ellipsis: bool, ty: TypeId) -> ExprId {
        self.push(ExprKind::Call { func, args, ellipsis }, ty)
    }

    pub fn type_assert(&mut self, x: ExprId, target: TypeId) -> ExprId {
        self.push(ExprKind::TypeAssert { x, target }, target)
    }
}

impl Default for ExprArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BasicKind, TypePool};

    #[test]
    fn ident_type_comes_from_its_object() {
        let mut pool = TypePool::new();
        let mut names = crate::name::StringInterner::new();
        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let mut exprs = ExprArena::new();
        let x_name = names.intern("x");
        let obj = Object {
            kind: ObjKind::Var,
            name: x_name,
            ty: int_ty,
        };
        let id = exprs.ident(obj);
        assert_eq!(exprs.ty(id), int_ty);
        match exprs.kind(id) {
            ExprKind::Ident(o) => assert_eq!(o.name, x_name),
            _ => panic!("expected ident"),
        }
    }

    #[test]
    fn paren_inherits_inner_type() {
        let mut pool = TypePool::new();
        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let mut exprs = ExprArena::new();
        let lit = exprs.basic_lit(Lit::Int(7), int_ty);
        let parened = exprs.paren(lit);
        assert_eq!(exprs.ty(parened), int_ty);
    }

    #[test]
    fn binop_classification() {
        assert!(BinOp::LAnd.is_logical());
        assert!(BinOp::LOr.is_logical());
        assert!(!BinOp::Add.is_logical());
        assert!(BinOp::Shl.is_shift());
        assert!(BinOp::Eql.is_comparison());
        assert!(!BinOp::Shl.is_comparison());
    }

    #[test]
    fn call_args_preserved_in_order() {
        let mut pool = TypePool::new();
        let mut names = crate::name::StringInterner::new();
        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let func_ty = pool.alloc_func(None, vec![int_ty, int_ty], vec![int_ty], false);
        let mut exprs = ExprArena::new();
        let f_name = names.intern("add");
        let f = exprs.ident(Object {
            kind: ObjKind::Fun,
            name: f_name,
            ty: func_ty,
        });
        let a = exprs.basic_lit(Lit::Int(1), int_ty);
        let b = exprs.basic_lit(Lit::Int(2), int_ty);
        let call = exprs.call(f, vec![a, b], false, int_ty);
        match exprs.kind(call) {
            ExprKind::Call { func, args, ellipsis } => {
                assert_eq!(*func, f);
                assert_eq!(args, &vec![a, b]);
                assert!(!ellipsis);
            }
            _ => panic!("expected call"),
        }
    }
}
