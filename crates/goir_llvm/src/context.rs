//! Thin wrapper over an inkwell `Context`/`Module` pair, giving the rest of
//! the crate a single place to construct primitive and aggregate LLVM
//! types.

use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicTypeEnum, FloatType, FunctionType, IntType, PointerType, StructType};
use inkwell::AddressSpace;

/// Owns nothing beyond references into the `Context`/`Module` the caller
/// created; this crate never calls `Context::create()` itself (§9: process-
/// wide LLVM state is the caller's responsibility).
pub struct SimpleCx<'ll> {
    pub llcx: &'ll Context,
    pub llmod: Module<'ll>,
    /// Opaque pointer type (`ptr`), used uniformly since LLVM 17 dropped
    /// typed pointers.
    pub ptr_type: PointerType<'ll>,
    pub isize_ty: IntType<'ll>,
}

impl<'ll> SimpleCx<'ll> {
    pub fn new(llcx: &'ll Context, module_name: &str, pointer_width: u32) -> Self {
        let llmod = llcx.create_module(module_name);
        let ptr_type = llcx.ptr_type(AddressSpace::default());
        let isize_ty = match pointer_width {
            32 => llcx.i32_type(),
            _ => llcx.i64_type(),
        };
        Self {
            llcx,
            llmod,
            ptr_type,
            isize_ty,
        }
    }

    pub fn into_module(self) -> Module<'ll> {
        self.llmod
    }

    pub fn type_i1(&self) -> IntType<'ll> {
        self.llcx.bool_type()
    }

    pub fn type_i8(&self) -> IntType<'ll> {
        self.llcx.i8_type()
    }

    pub fn type_i16(&self) -> IntType<'ll> {
        self.llcx.i16_type()
    }

    pub fn type_i32(&self) -> IntType<'ll> {
        self.llcx.i32_type()
    }

    pub fn type_i64(&self) -> IntType<'ll> {
        self.llcx.i64_type()
    }

    pub fn type_f32(&self) -> FloatType<'ll> {
        self.llcx.f32_type()
    }

    pub fn type_f64(&self) -> FloatType<'ll> {
        self.llcx.f64_type()
    }

    pub fn type_void_ret(&self) -> inkwell::types::VoidType<'ll> {
        self.llcx.void_type()
    }

    pub fn type_ptr(&self) -> PointerType<'ll> {
        self.ptr_type
    }

    /// Anonymous (structurally-named) struct type.
    pub fn type_struct(&self, fields: &[BasicTypeEnum<'ll>], packed: bool) -> StructType<'ll> {
        self.llcx.struct_type(fields, packed)
    }

    /// Opaque named struct, body set later via `set_struct_body` — the
    /// mechanism that lets a cyclic `Named -> Pointer -> Struct` graph
    /// terminate (§4.1, §9): the handle exists and can be embedded in other
    /// types before its own fields are known.
    pub fn type_named_struct(&self, name: &str) -> StructType<'ll> {
        self.llcx.opaque_struct_type(name)
    }

    pub fn set_struct_body(&self, st: StructType<'ll>, fields: &[BasicTypeEnum<'ll>], packed: bool) {
        st.set_body(fields, packed);
    }

    pub fn type_func(&self, params: &[BasicTypeEnum<'ll>], ret: BasicTypeEnum<'ll>) -> FunctionType<'ll> {
        let param_meta: Vec<_> = params.iter().map(|t| (*t).into()).collect();
        ret.fn_type(&param_meta, false)
    }

    pub fn type_void_func(&self, params: &[BasicTypeEnum<'ll>]) -> FunctionType<'ll> {
        let param_meta: Vec<_> = params.iter().map(|t| (*t).into()).collect();
        self.llcx.void_type().fn_type(&param_meta, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_cx_types() {
        let context = Context::create();
        let scx = SimpleCx::new(&context, "test_mod", 64);
        assert_eq!(scx.type_i1().get_bit_width(), 1);
        assert_eq!(scx.type_i8().get_bit_width(), 8);
        assert_eq!(scx.type_i32().get_bit_width(), 32);
        assert_eq!(scx.type_i64().get_bit_width(), 64);
        assert_eq!(scx.isize_ty.get_bit_width(), 64);

        let st = scx.type_named_struct("MyStruct");
        assert!(st.is_opaque());
        scx.set_struct_body(st, &[scx.type_i32().into(), scx.type_i32().into()], false);
        assert!(!st.is_opaque());
        assert_eq!(st.count_fields(), 2);
    }

    #[test]
    fn isize_follows_pointer_width_config() {
        let context = Context::create();
        let scx32 = SimpleCx::new(&context, "m32", 32);
        assert_eq!(scx32.isize_ty.get_bit_width(), 32);
    }
}
