//! C7 (part 2) — Built-in function lowerings: `print`/`println`, `len`,
//! `new`, `make`, `append`, `delete`, `panic`, and the `unsafe.*` family.

use goir_hir::{BasicKind, ExprId, Lit, TypeId, TypeKind};
use inkwell::types::BasicType;
use inkwell::values::BasicValue;

use crate::error::{CodegenError, Result};
use crate::lower_cx::LowerCx;
use crate::value::{ConstValue, Value};

impl<'ll, 'a> LowerCx<'ll, 'a> {
    /// `new(T)`: a zero-initialized stack slot, returned as a pointer.
    pub(crate) fn builtin_new(&mut self, t: TypeId, result_ty: TypeId) -> Result<Value<'ll>> {
        let llvm_ty = self.types.to_llvm(self.pool, t)?.ty;
        let slot = self.builder.build_alloca(llvm_ty, "new").unwrap();
        self.builder.build_store(slot, llvm_ty.const_zero()).unwrap();
        Ok(Value::Llvm(crate::value::LLVMValue::simple(
            slot.as_basic_value_enum(),
            result_ty,
        )))
    }

    /// `make(T, ...)`. Only `make(map[K]V)` has a real lowering here;
    /// `make(chan ...)` is unsupported since channels are out of scope for
    /// this core, and `make([]T, len, cap)` belongs to the composite-literal
    /// visitor (out of scope — see `goir_hir::expr`'s doc comment).
    pub(crate) fn builtin_make(&mut self, t: TypeId, result_ty: TypeId) -> Result<Value<'ll>> {
        let underlying = self.pool.underlying_id(t);
        match self.pool.get(underlying) {
            TypeKind::Map { .. } => {
                let slot = self.lower_make_map();
                Ok(Value::Llvm(crate::value::LLVMValue::simple(
                    slot.as_basic_value_enum(),
                    result_ty,
                )))
            }
            _ => Err(CodegenError::UnresolvedBuiltin {
                name: "make".to_owned(),
            }),
        }
    }

    /// `len(x)`. Constant for arrays; a struct-field read for slices/maps;
    /// the stored length word for strings.
    pub(crate) fn builtin_len(&mut self, x: Value<'ll>, x_ty: TypeId, result_ty: TypeId) -> Result<Value<'ll>> {
        let underlying = self.pool.underlying_id(x_ty);
        match self.pool.get(underlying).clone() {
            TypeKind::Array { len, .. } => Ok(Value::Const(ConstValue {
                lit: Lit::Int(len as i64),
                ty: result_ty,
            })),
            TypeKind::Slice { .. } => {
                let v = self.materialize(&x)?.into_struct_value();
                let len = self.builder.build_extract_value(v, 1, "slice.len").unwrap();
                Ok(Value::Llvm(crate::value::LLVMValue::simple(len, result_ty)))
            }
            TypeKind::Basic(BasicKind::String) => {
                let v = self.materialize(&x)?.into_struct_value();
                let len = self.builder.build_extract_value(v, 1, "string.len").unwrap();
                Ok(Value::Llvm(crate::value::LLVMValue::simple(len, result_ty)))
            }
            TypeKind::Map { .. } => {
                let ptr = x.as_llvm().and_then(|v| v.pointer).ok_or_else(|| CodegenError::TypeMismatch {
                    expected: "addressable map value".to_owned(),
                    found: "non-addressable value".to_owned(),
                })?;
                let header_ty = self.scx.type_struct(&[self.scx.type_i32().into(), self.scx.type_ptr().into()], false);
                let size_ptr = self
                    .builder
                    .build_struct_gep(header_ty, ptr, 0, "map.size.ptr")
                    .unwrap();
                let size = self.builder.build_load(self.scx.type_i32(), size_ptr, "map.size").unwrap();
                Ok(Value::Llvm(crate::value::LLVMValue::simple(size, result_ty)))
            }
            _ => Err(CodegenError::UnresolvedBuiltin { name: "len".to_owned() }),
        }
    }

    /// `unsafe.Sizeof(x)`, as a `uintptr` constant.
    pub(crate) fn builtin_sizeof(&mut self, x_ty: TypeId, result_ty: TypeId) -> Result<Value<'ll>> {
        let llvm_ty = self.types.to_llvm(self.pool, x_ty)?.ty;
        let size = self.layout.size_of(llvm_ty);
        Ok(Value::Const(ConstValue {
            lit: Lit::Int(size as i64),
            ty: result_ty,
        }))
    }

    /// `unsafe.Alignof(x)`. SPEC_FULL.md §9 decides, against the distilled
    /// spec's "unimplemented" note, to implement this for real: `self.layout`
    /// already has the answer `unsafe.Sizeof` needs, so there is no reason
    /// to leave this a stub.
    pub(crate) fn builtin_alignof(&mut self, x_ty: TypeId, result_ty: TypeId) -> Result<Value<'ll>> {
        let llvm_ty = self.types.to_llvm(self.pool, x_ty)?.ty;
        let align = self.layout.align_of(llvm_ty);
        Ok(Value::Const(ConstValue {
            lit: Lit::Int(align as i64),
            ty: result_ty,
        }))
    }

    /// `unsafe.Offsetof(x.field)`. Same §9 decision as `Alignof`: callers
    /// pass the struct type and the already-resolved field index (the
    /// selector resolver has already done the BFS to find it).
    pub(crate) fn builtin_offsetof(&mut self, struct_ty: TypeId, field_index: u32, result_ty: TypeId) -> Result<Value<'ll>> {
        let llvm_ty = self.types.to_llvm(self.pool, struct_ty)?.ty.into_struct_type();
        let offset = self.layout.offset_of_field(llvm_ty, field_index);
        Ok(Value::Const(ConstValue {
            lit: Lit::Int(offset as i64),
            ty: result_ty,
        }))
    }

    /// `delete(m, key)`.
    pub(crate) fn builtin_delete(&mut self, m: Value<'ll>, key: Value<'ll>, key_ty: TypeId, elem_ty: TypeId) -> Result<()> {
        let ptr = m.as_llvm().and_then(|v| v.pointer).ok_or_else(|| CodegenError::TypeMismatch {
            expected: "addressable map value".to_owned(),
            found: "non-addressable value".to_owned(),
        })?;
        self.lower_map_delete(ptr, key, key_ty, elem_ty)
    }

    /// `append(s, x)`.
    pub(crate) fn builtin_append(&mut self, s: Value<'ll>, elem: Value<'ll>, elem_ty: TypeId, result_ty: TypeId) -> Result<Value<'ll>> {
        self.lower_append(s, elem, elem_ty, result_ty)
    }

    /// `print(args...)`/`println(args...)`: each argument dispatches to a
    /// `goir_print_*` runtime entry point keyed on its kind; `println` adds
    /// inter-operand spacing and a trailing newline, `print` does neither.
    pub(crate) fn builtin_print(&mut self, args: &[Value<'ll>], newline: bool) -> Result<()> {
        self.lower_print(args, newline)
    }

    /// `panic(x)`: stubbed as the distilled spec allows. Emits an
    /// `unreachable` terminator so the block it appears in stays well-formed
    /// for verification without needing real unwinding support.
    pub(crate) fn builtin_panic(&mut self, _x: Value<'ll>) -> Result<()> {
        self.builder.build_unreachable().unwrap();
        Ok(())
    }

    pub(crate) fn unreachable_expr(&self, expr: ExprId, detail: impl Into<String>) -> CodegenError {
        CodegenError::Unreachable {
            expr,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use goir_hir::{BasicKind, ExprArena, Lit, StringInterner, TypePool};
    use inkwell::context::Context;

    use crate::config::LowerConfig;
    use crate::context::SimpleCx;
    use crate::lower_cx::LowerCx;
    use crate::value::Value;

    fn new_function<'ll>(cx: &mut LowerCx<'ll, 'll>, name: &str) {
        let f = cx.scx.llmod.add_function(name, cx.scx.type_void_func(&[]), None);
        let entry = cx.scx.llcx.append_basic_block(f, "entry");
        cx.builder.position_at_end(entry);
        cx.current_function = Some(f);
    }

    #[test]
    fn len_of_an_array_is_a_compile_time_constant() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let array_ty = pool.alloc_array(int_ty, 5);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "len_test");

        let dummy = Value::Const(crate::value::ConstValue { lit: Lit::Int(0), ty: array_ty });
        let len = cx.builtin_len(dummy, array_ty, int_ty).unwrap();
        match len {
            Value::Const(c) => match c.lit {
                Lit::Int(n) => assert_eq!(n, 5),
                _ => panic!("expected an int literal"),
            },
            _ => panic!("expected a constant for an array's len"),
        }
    }

    #[test]
    fn sizeof_int32_is_four_bytes() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let uintptr_ty = pool.alloc_basic(BasicKind::Uintptr);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "sizeof_test");

        let size = cx.builtin_sizeof(int_ty, uintptr_ty).unwrap();
        match size {
            Value::Const(c) => match c.lit {
                Lit::Int(n) => assert_eq!(n, 4),
                _ => panic!("expected an int literal"),
            },
            _ => panic!("expected a constant from Sizeof"),
        }
    }

    #[test]
    fn new_allocates_a_zeroed_stack_slot() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let ptr_ty = pool.alloc_pointer(int_ty);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "new_test");

        let v = cx.builtin_new(int_ty, ptr_ty).unwrap();
        assert!(v.as_llvm().unwrap().ssa.is_pointer_value());
        cx.builder.build_return(None).unwrap();
        assert!(cx.scx.llmod.verify().is_ok());
    }
}
