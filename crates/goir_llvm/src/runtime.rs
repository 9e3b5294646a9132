//! C4 — Runtime Call Lowering.
//!
//! Declares (on first use) and calls the fixed set of `extern "C"` symbols
//! `goir_runtime` exports, grounded on that crate's exact signatures so the
//! declared LLVM function types always match what the linked library
//! actually expects.

use goir_hir::{BinOp, TypeId};
use inkwell::types::{BasicMetadataTypeEnum, BasicTypeEnum, FunctionType};
use inkwell::values::{BasicValue, BasicValueEnum, FunctionValue, PointerValue};
use inkwell::IntPredicate;

use crate::error::{CodegenError, Result};
use crate::lower_cx::LowerCx;
use crate::value::{LLVMValue, Value};

impl<'ll, 'a> LowerCx<'ll, 'a> {
    fn declare_runtime_fn(
        &mut self,
        name: &str,
        build: impl FnOnce(&Self) -> FunctionType<'ll>,
    ) -> FunctionValue<'ll> {
        if let Some(existing) = self.scx.llmod.get_function(name) {
            return existing;
        }
        let fn_ty = build(self);
        self.scx.llmod.add_function(name, fn_ty, None)
    }

    fn string_ty(&self) -> BasicTypeEnum<'ll> {
        self.scx.type_struct(&[self.scx.type_ptr().into(), self.scx.type_i32().into()], false).into()
    }

    fn slice_ty(&self) -> BasicTypeEnum<'ll> {
        self.scx
            .type_struct(
                &[self.scx.type_ptr().into(), self.scx.isize_ty.into(), self.scx.isize_ty.into()],
                false,
            )
            .into()
    }

    fn goir_strcat(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_strcat", |cx| {
            let s = cx.string_ty();
            s.fn_type(&[s.into(), s.into()], false)
        })
    }

    fn goir_strcmp(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_strcmp", |cx| {
            let s = cx.string_ty();
            cx.scx.type_i32().fn_type(&[s.into(), s.into()], false)
        })
    }

    fn goir_memequal(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_memequal", |cx| {
            let params: [BasicMetadataTypeEnum; 3] =
                [cx.scx.isize_ty.into(), cx.scx.type_ptr().into(), cx.scx.type_ptr().into()];
            cx.scx.type_i1().fn_type(&params, false)
        })
    }

    fn goir_append(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_append", |cx| {
            let slice = cx.slice_ty();
            let params: [BasicMetadataTypeEnum; 3] =
                [slice.into(), cx.scx.type_ptr().into(), cx.scx.isize_ty.into()];
            slice.fn_type(&params, false)
        })
    }

    fn goir_map_new(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_map_new", |cx| cx.map_header_ty().fn_type(&[], false))
    }

    fn goir_map_insert(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_map_insert", |cx| {
            let params: [BasicMetadataTypeEnum; 5] = [
                cx.scx.type_ptr().into(),
                cx.scx.isize_ty.into(),
                cx.scx.isize_ty.into(),
                cx.scx.type_ptr().into(),
                cx.scx.type_ptr().into(),
            ];
            cx.scx.llcx.void_type().fn_type(&params, false)
        })
    }

    fn goir_map_lookup(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_map_lookup", |cx| {
            let params: [BasicMetadataTypeEnum; 5] = [
                cx.scx.type_ptr().into(),
                cx.scx.isize_ty.into(),
                cx.scx.isize_ty.into(),
                cx.scx.type_ptr().into(),
                cx.scx.type_ptr().into(),
            ];
            cx.scx.type_i1().fn_type(&params, false)
        })
    }

    fn goir_map_delete(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_map_delete", |cx| {
            let params: [BasicMetadataTypeEnum; 4] = [
                cx.scx.type_ptr().into(),
                cx.scx.isize_ty.into(),
                cx.scx.isize_ty.into(),
                cx.scx.type_ptr().into(),
            ];
            cx.scx.llcx.void_type().fn_type(&params, false)
        })
    }

    /// `{ i32 size, <ListNode> head }` is private to the runtime crate's
    /// layout; callers only ever hold an opaque pointer to it, so the
    /// module-side type is just a one-word-plus-pointer shape matching
    /// `GoirMap`'s `#[repr(C)]` layout.
    fn map_header_ty(&self) -> BasicTypeEnum<'ll> {
        self.scx
            .type_struct(&[self.scx.type_i32().into(), self.scx.type_ptr().into()], false)
            .into()
    }

    /// Reshape a `{ptr, i32}`/`{ptr, isize, isize}` aggregate whose LLVM
    /// struct type is a *named* struct (because it came from a `Named`
    /// source type with `Basic(String)`/`Slice` underlying) into the
    /// anonymous runtime-call shape, by extracting and re-inserting each
    /// field. A no-op in the common case where the value is already
    /// anonymous (LLVM structural types alias directly).
    fn coerce_struct(&mut self, v: BasicValueEnum<'ll>, target: BasicTypeEnum<'ll>) -> BasicValueEnum<'ll> {
        if v.get_type() == target {
            return v;
        }
        let src = v.into_struct_value();
        let target_struct = target.into_struct_type();
        let mut agg = target_struct.get_undef();
        for i in 0..src.count_fields() {
            let field = self.builder.build_extract_value(src, i, "field").unwrap();
            agg = self.builder.build_insert_value(agg, field, i, "field").unwrap().into_struct_value();
        }
        agg.as_basic_value_enum()
    }

    fn to_runtime_string(&mut self, v: &Value<'ll>) -> Result<BasicValueEnum<'ll>> {
        let raw = self.materialize(v)?;
        let target = self.string_ty();
        Ok(self.coerce_struct(raw, target))
    }

    /// `a + b`, `a == b`, `a < b`, etc. on `Basic(String)` operands.
    pub(crate) fn lower_string_binary_op(
        &mut self,
        op: BinOp,
        lhs: Value<'ll>,
        rhs: Value<'ll>,
        result_ty: TypeId,
    ) -> Result<Value<'ll>> {
        let l = self.to_runtime_string(&lhs)?;
        let r = self.to_runtime_string(&rhs)?;

        if op == BinOp::Add {
            let f = self.goir_strcat();
            let call = self
                .builder
                .build_call(f, &[l.into(), r.into()], "strcat")
                .unwrap();
            let result = call.try_as_basic_value().left().expect("goir_strcat returns a value");
            return Ok(Value::Llvm(LLVMValue::simple(result, result_ty)));
        }

        let f = self.goir_strcmp();
        let call = self
            .builder
            .build_call(f, &[l.into(), r.into()], "strcmp")
            .unwrap();
        let cmp = call
            .try_as_basic_value()
            .left()
            .expect("goir_strcmp returns a value")
            .into_int_value();
        let zero = self.scx.type_i32().const_int(0, false);
        let pred = match op {
            BinOp::Eql => IntPredicate::EQ,
            BinOp::Neq => IntPredicate::NE,
            BinOp::Lss => IntPredicate::SLT,
            BinOp::Leq => IntPredicate::SLE,
            BinOp::Gtr => IntPredicate::SGT,
            BinOp::Geq => IntPredicate::SGE,
            _ => {
                return Err(CodegenError::UnresolvedBuiltin {
                    name: format!("{op:?} on string operands"),
                })
            }
        };
        let result = self.builder.build_int_compare(pred, cmp, zero, "strcmp.result").unwrap();
        Ok(Value::Llvm(LLVMValue::simple(result.as_basic_value_enum(), result_ty)))
    }

    /// `len(s) == 0`-style byte equality for `Struct`/`Array` operands
    /// (composite `==`/`!=`, SPEC_FULL.md §4 comparability rules), via
    /// `goir_memequal` over the ABI size computed by `self.layout`.
    pub(crate) fn lower_composite_equality(
        &mut self,
        lhs_ptr: PointerValue<'ll>,
        rhs_ptr: PointerValue<'ll>,
        operand_ty: TypeId,
        negate: bool,
        result_ty: TypeId,
    ) -> Result<Value<'ll>> {
        let llvm_ty = self.types.to_llvm(self.pool, operand_ty)?.ty;
        let size = self.layout.size_of(llvm_ty);
        let f = self.goir_memequal();
        let size_const = self.scx.isize_ty.const_int(size, false);
        let call = self
            .builder
            .build_call(
                f,
                &[size_const.into(), lhs_ptr.into(), rhs_ptr.into()],
                "memequal",
            )
            .unwrap();
        let equal = call
            .try_as_basic_value()
            .left()
            .expect("goir_memequal returns a value")
            .into_int_value();
        let result = if negate {
            self.builder.build_not(equal, "not_equal").unwrap()
        } else {
            equal
        };
        Ok(Value::Llvm(LLVMValue::simple(result.as_basic_value_enum(), result_ty)))
    }

    /// `append(s, x)`: grows through `goir_append`, reading/writing through
    /// a temporary stack slot for the element being appended (the runtime
    /// call takes it by pointer).
    pub(crate) fn lower_append(
        &mut self,
        slice: Value<'ll>,
        elem: Value<'ll>,
        elem_ty: TypeId,
        result_ty: TypeId,
    ) -> Result<Value<'ll>> {
        let slice_raw = self.materialize(&slice)?;
        let slice_coerced = self.coerce_struct(slice_raw, self.slice_ty());

        let elem_llvm_ty = self.types.to_llvm(self.pool, elem_ty)?.ty;
        let elem_val = self.materialize(&elem)?;
        let tmp = self.builder.build_alloca(elem_llvm_ty, "append.elem").unwrap();
        self.builder.build_store(tmp, elem_val).unwrap();
        let elem_size = self.layout.size_of(elem_llvm_ty);

        let f = self.goir_append();
        let size_const = self.scx.isize_ty.const_int(elem_size, false);
        let call = self
            .builder
            .build_call(f, &[slice_coerced.into(), tmp.into(), size_const.into()], "append")
            .unwrap();
        let grown = call.try_as_basic_value().left().expect("goir_append returns a value");
        let grown = self.coerce_struct(grown, self.types.to_llvm(self.pool, result_ty)?.ty);
        Ok(Value::Llvm(LLVMValue::simple(grown, result_ty)))
    }

    pub(crate) fn lower_map_lookup(
        &mut self,
        map_ptr: PointerValue<'ll>,
        key: Value<'ll>,
        key_ty: TypeId,
        elem_ty: TypeId,
        result_ty: TypeId,
        bool_ty: TypeId,
    ) -> Result<(Value<'ll>, Value<'ll>)> {
        let key_llvm_ty = self.types.to_llvm(self.pool, key_ty)?.ty;
        let elem_llvm_ty = self.types.to_llvm(self.pool, elem_ty)?.ty;
        let key_val = self.materialize(&key)?;
        let key_slot = self.builder.build_alloca(key_llvm_ty, "map.key").unwrap();
        self.builder.build_store(key_slot, key_val).unwrap();
        let out_slot = self.builder.build_alloca(elem_llvm_ty, "map.out").unwrap();

        let key_size = self.layout.size_of(key_llvm_ty);
        let elem_size = self.layout.size_of(elem_llvm_ty);
        let f = self.goir_map_lookup();
        let call = self
            .builder
            .build_call(
                f,
                &[
                    map_ptr.into(),
                    self.scx.isize_ty.const_int(key_size, false).into(),
                    self.scx.isize_ty.const_int(elem_size, false).into(),
                    key_slot.into(),
                    out_slot.into(),
                ],
                "map.lookup",
            )
            .unwrap();
        let present = call.try_as_basic_value().left().expect("goir_map_lookup returns a value");
        let loaded = self.builder.build_load(elem_llvm_ty, out_slot, "map.value").unwrap();
        Ok((
            Value::Llvm(LLVMValue::simple(loaded, result_ty)),
            Value::Llvm(LLVMValue::simple(present, bool_ty)),
        ))
    }

    pub(crate) fn lower_map_insert(&mut self, map_ptr: PointerValue<'ll>, key: Value<'ll>, key_ty: TypeId, elem: Value<'ll>, elem_ty: TypeId) -> Result<()> {
        let key_llvm_ty = self.types.to_llvm(self.pool, key_ty)?.ty;
        let elem_llvm_ty = self.types.to_llvm(self.pool, elem_ty)?.ty;
        let key_val = self.materialize(&key)?;
        let elem_val = self.materialize(&elem)?;
        let key_slot = self.builder.build_alloca(key_llvm_ty, "map.key").unwrap();
        self.builder.build_store(key_slot, key_val).unwrap();
        let elem_slot = self.builder.build_alloca(elem_llvm_ty, "map.elem").unwrap();
        self.builder.build_store(elem_slot, elem_val).unwrap();

        let key_size = self.layout.size_of(key_llvm_ty);
        let elem_size = self.layout.size_of(elem_llvm_ty);
        let f = self.goir_map_insert();
        self.builder
            .build_call(
                f,
                &[
                    map_ptr.into(),
                    self.scx.isize_ty.const_int(key_size, false).into(),
                    self.scx.isize_ty.const_int(elem_size, false).into(),
                    key_slot.into(),
                    elem_slot.into(),
                ],
                "map.insert",
            )
            .unwrap();
        Ok(())
    }

    pub(crate) fn lower_map_delete(&mut self, map_ptr: PointerValue<'ll>, key: Value<'ll>, key_ty: TypeId, elem_ty: TypeId) -> Result<()> {
        let key_llvm_ty = self.types.to_llvm(self.pool, key_ty)?.ty;
        let elem_llvm_ty = self.types.to_llvm(self.pool, elem_ty)?.ty;
        let key_val = self.materialize(&key)?;
        let key_slot = self.builder.build_alloca(key_llvm_ty, "map.key").unwrap();
        self.builder.build_store(key_slot, key_val).unwrap();

        let key_size = self.layout.size_of(key_llvm_ty);
        let elem_size = self.layout.size_of(elem_llvm_ty);
        let f = self.goir_map_delete();
        self.builder
            .build_call(
                f,
                &[
                    map_ptr.into(),
                    self.scx.isize_ty.const_int(key_size, false).into(),
                    self.scx.isize_ty.const_int(elem_size, false).into(),
                    key_slot.into(),
                ],
                "map.delete",
            )
            .unwrap();
        Ok(())
    }

    /// `make(map[K]V)`: allocate on the stack and initialize via
    /// `goir_map_new`, returning the addressable slot so later
    /// inserts/lookups can take its pointer.
    pub(crate) fn lower_make_map(&mut self) -> PointerValue<'ll> {
        let f = self.goir_map_new();
        let call = self.builder.build_call(f, &[], "map.new").unwrap();
        let header = call.try_as_basic_value().left().expect("goir_map_new returns a value");
        let slot = self.builder.build_alloca(self.map_header_ty(), "map").unwrap();
        self.builder.build_store(slot, header).unwrap();
        slot
    }

    fn goir_print_str(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_print_str", |cx| {
            let s = cx.string_ty();
            cx.scx.llcx.void_type().fn_type(&[s.into()], false)
        })
    }

    fn goir_print_int(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_print_int", |cx| {
            cx.scx.llcx.void_type().fn_type(&[cx.scx.type_i64().into()], false)
        })
    }

    fn goir_print_float(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_print_float", |cx| {
            cx.scx.llcx.void_type().fn_type(&[cx.scx.type_f64().into()], false)
        })
    }

    fn goir_print_bool(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_print_bool", |cx| {
            cx.scx.llcx.void_type().fn_type(&[cx.scx.type_i1().into()], false)
        })
    }

    fn goir_print_space(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_print_space", |cx| cx.scx.llcx.void_type().fn_type(&[], false))
    }

    fn goir_print_newline(&mut self) -> FunctionValue<'ll> {
        self.declare_runtime_fn("goir_print_newline", |cx| cx.scx.llcx.void_type().fn_type(&[], false))
    }

    /// `print(args...)`/`println(args...)`: each operand is dispatched to
    /// the `goir_print_*` entry point matching its kind (C7). `println`
    /// additionally separates operands with `goir_print_space` and emits
    /// a trailing `goir_print_newline`; `print` adds neither.
    pub(crate) fn lower_print(&mut self, args: &[Value<'ll>], newline: bool) -> Result<()> {
        for (i, arg) in args.iter().enumerate() {
            if newline && i > 0 {
                let f = self.goir_print_space();
                self.builder.build_call(f, &[], "print.space").unwrap();
            }
            self.print_one(*arg)?;
        }
        if newline {
            let f = self.goir_print_newline();
            self.builder.build_call(f, &[], "print.newline").unwrap();
        }
        Ok(())
    }

    fn print_one(&mut self, v: Value<'ll>) -> Result<()> {
        let ty = v.ty();
        if self.is_string(ty) {
            let s = self.to_runtime_string(&v)?;
            let f = self.goir_print_str();
            self.builder.build_call(f, &[s.into()], "print.str").unwrap();
            return Ok(());
        }
        if self.is_float(ty) {
            let raw = self.materialize(&v)?.into_float_value();
            let widened = self
                .builder
                .build_float_cast(raw, self.scx.type_f64(), "print.f64")
                .unwrap();
            let f = self.goir_print_float();
            self.builder.build_call(f, &[widened.into()], "print.float").unwrap();
            return Ok(());
        }
        if let Some((bits, signed)) = self.int_info(ty) {
            let raw = self.materialize(&v)?.into_int_value();
            if bits == 1 {
                let f = self.goir_print_bool();
                self.builder.build_call(f, &[raw.into()], "print.bool").unwrap();
                return Ok(());
            }
            let i64_ty = self.scx.type_i64();
            let widened = match bits.cmp(&64) {
                std::cmp::Ordering::Less if signed => {
                    self.builder.build_int_s_extend(raw, i64_ty, "print.i64").unwrap()
                }
                std::cmp::Ordering::Less => {
                    self.builder.build_int_z_extend(raw, i64_ty, "print.i64").unwrap()
                }
                _ => raw,
            };
            let f = self.goir_print_int();
            self.builder.build_call(f, &[widened.into()], "print.int").unwrap();
            return Ok(());
        }
        Err(CodegenError::UnresolvedBuiltin {
            name: "print on a non-printable operand kind".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use goir_hir::{BasicKind, BinOp, ExprArena, Lit, StringInterner, TypePool};
    use inkwell::context::Context;

    use crate::config::LowerConfig;
    use crate::context::SimpleCx;
    use crate::lower_cx::LowerCx;
    use crate::value::{ConstValue, Value};

    fn new_function<'ll>(cx: &mut LowerCx<'ll, 'll>, name: &str) {
        let f = cx.scx.llmod.add_function(name, cx.scx.type_void_func(&[]), None);
        let entry = cx.scx.llcx.append_basic_block(f, "entry");
        cx.builder.position_at_end(entry);
        cx.current_function = Some(f);
    }

    /// SPEC_FULL.md §9 Open Question #3: `NEQ` on strings must route
    /// through C4 (`goir_strcmp`) alongside `EQ`, not fall into an unclear
    /// fallback path.
    #[test]
    fn string_neq_routes_through_strcmp_not_a_fallback() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let string_ty = pool.alloc_basic(BasicKind::String);
        let bool_ty = pool.alloc_basic(BasicKind::Bool);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "strneq_test");

        let foo = interner.intern("foo");
        let bar = interner.intern("bar");
        let lhs = Value::Const(ConstValue { lit: Lit::Str(foo), ty: string_ty });
        let rhs = Value::Const(ConstValue { lit: Lit::Str(bar), ty: string_ty });

        cx.lower_string_binary_op(BinOp::Neq, lhs, rhs, bool_ty).unwrap();

        assert!(
            cx.scx.llmod.get_function("goir_strcmp").is_some(),
            "NEQ on strings must declare/call goir_strcmp, the same path EQ uses"
        );
        assert!(cx.scx.llmod.verify().is_ok());
    }

    /// `println(x, 7, true)`: each argument must route through its own
    /// `goir_print_*` entry point, plus spacing and a trailing newline.
    #[test]
    fn println_declares_one_runtime_fn_per_argument_kind_and_spacing_calls() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let string_ty = pool.alloc_basic(BasicKind::String);
        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let bool_ty = pool.alloc_basic(BasicKind::Bool);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "println_test");

        let hello = interner.intern("hello");
        let args = vec![
            Value::Const(ConstValue { lit: Lit::Str(hello), ty: string_ty }),
            Value::Const(ConstValue { lit: Lit::Int(7), ty: int_ty }),
            Value::Const(ConstValue { lit: Lit::Bool(true), ty: bool_ty }),
        ];

        cx.lower_print(&args, true).unwrap();

        for name in ["goir_print_str", "goir_print_int", "goir_print_bool", "goir_print_space", "goir_print_newline"] {
            assert!(cx.scx.llmod.get_function(name).is_some(), "{name} must be declared");
        }
        cx.builder.build_return(None).unwrap();
        assert!(cx.scx.llmod.verify().is_ok());
    }

    /// `print(x)`: no inter-operand spacing or trailing newline function.
    #[test]
    fn print_without_newline_skips_space_and_newline_calls() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "print_test");

        let args = vec![Value::Const(ConstValue { lit: Lit::Int(1), ty: int_ty })];
        cx.lower_print(&args, false).unwrap();

        assert!(cx.scx.llmod.get_function("goir_print_int").is_some());
        assert!(cx.scx.llmod.get_function("goir_print_space").is_none());
        assert!(cx.scx.llmod.get_function("goir_print_newline").is_none());
        cx.builder.build_return(None).unwrap();
        assert!(cx.scx.llmod.verify().is_ok());
    }

    #[test]
    fn append_declares_goir_append_and_returns_a_well_formed_slice() {
        let llcx = Context::create();
        let scx = Box::leak(Box::new(SimpleCx::new(&llcx, "m", 64)));
        let config = Box::leak(Box::new(LowerConfig::default()));
        let pool = Box::leak(Box::new(TypePool::new()));
        let exprs = Box::leak(Box::new(ExprArena::new()));
        let interner = Box::leak(Box::new(StringInterner::new()));

        let int_ty = pool.alloc_basic(BasicKind::Int32);
        let slice_ty = pool.alloc_slice(int_ty);
        let mut cx = LowerCx::new(scx, config, pool, exprs, interner);
        new_function(&mut cx, "append_test");

        let slice_llvm = cx.types.to_llvm(cx.pool, slice_ty).unwrap().ty;
        let slot = cx.builder.build_alloca(slice_llvm, "s").unwrap();
        let loaded = cx.builder.build_load(slice_llvm, slot, "s.load").unwrap();
        let slice_val = Value::Llvm(crate::value::LLVMValue::addressable(loaded, slice_ty, slot));
        let elem = Value::Const(ConstValue { lit: Lit::Int(7), ty: int_ty });

        let grown = cx.lower_append(slice_val, elem, int_ty, slice_ty).unwrap();
        assert_eq!(grown.ty(), slice_ty);
        assert!(cx.scx.llmod.get_function("goir_append").is_some());
        assert!(cx.scx.llmod.verify().is_ok());
    }
}
