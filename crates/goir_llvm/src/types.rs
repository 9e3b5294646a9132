//! C1 — LLVM Type Mapper.
//!
//! `to_llvm(t)` is a pure function of `Underlying(t)`: identical underlyings
//! yield the same LLVM handle, via a structural-string-keyed cache sitting
//! on the mapper (grounded on `ori_llvm::context::SimpleCx` plus
//! `ori_llvm::codegen::type_info`'s own `FxHashMap`-backed cache).

use inkwell::types::{BasicType, BasicTypeEnum, FunctionType};
use rustc_hash::FxHashMap;

use goir_hir::{BasicKind, TypeId, TypeKind, TypePool};

use crate::config::{IntWidth, LowerConfig};
use crate::context::SimpleCx;
use crate::error::{CodegenError, Result};

/// An LLVM type handle plus a flag recording whether it was allocated as a
/// *named* (opaque-then-bodied) struct. Named allocation is what lets a
/// `Named -> Pointer -> Struct` graph terminate; most other variants are
/// anonymous and LLVM uniques them structurally on its own.
#[derive(Copy, Clone)]
pub struct LlvmType<'ll> {
    pub ty: BasicTypeEnum<'ll>,
    pub named: bool,
}

impl<'ll> LlvmType<'ll> {
    fn anon(ty: impl Into<BasicTypeEnum<'ll>>) -> Self {
        Self {
            ty: ty.into(),
            named: false,
        }
    }

    fn named(ty: impl Into<BasicTypeEnum<'ll>>) -> Self {
        Self {
            ty: ty.into(),
            named: true,
        }
    }
}

/// Maps `goir_hir` source types to LLVM types, with a structural cache so
/// repeated calls for the same underlying shape are free after the first.
pub struct TypeMapper<'ll, 'a> {
    scx: &'a SimpleCx<'ll>,
    config: &'a LowerConfig,
    cache: FxHashMap<String, LlvmType<'ll>>,
    next_struct_id: u32,
}

impl<'ll, 'a> TypeMapper<'ll, 'a> {
    pub fn new(scx: &'a SimpleCx<'ll>, config: &'a LowerConfig) -> Self {
        Self {
            scx,
            config,
            cache: FxHashMap::default(),
            next_struct_id: 0,
        }
    }

    fn int_bits(&self) -> u32 {
        match self.config.int_width {
            IntWidth::Bits32 => 32,
            IntWidth::Bits64 => 64,
        }
    }

    fn int_type_of_width(&self, bits: u32) -> BasicTypeEnum<'ll> {
        match bits {
            1 => self.scx.type_i1().into(),
            8 => self.scx.type_i8().into(),
            16 => self.scx.type_i16().into(),
            32 => self.scx.type_i32().into(),
            _ => self.scx.type_i64().into(),
        }
    }

    fn basic_llvm(&self, kind: BasicKind) -> BasicTypeEnum<'ll> {
        match kind {
            BasicKind::Bool => self.scx.type_i1().into(),
            BasicKind::Int8 | BasicKind::Uint8 => self.scx.type_i8().into(),
            BasicKind::Int16 | BasicKind::Uint16 => self.scx.type_i16().into(),
            BasicKind::Int32 | BasicKind::Uint32 => self.scx.type_i32().into(),
            BasicKind::Int64 | BasicKind::Uint64 => self.scx.type_i64().into(),
            BasicKind::Int | BasicKind::Uint => self.int_type_of_width(self.int_bits()),
            BasicKind::Float32 => self.scx.type_f32().into(),
            BasicKind::Float64 => self.scx.type_f64().into(),
            BasicKind::String => self
                .scx
                .type_struct(&[self.scx.type_ptr().into(), self.scx.type_i32().into()], false)
                .into(),
            BasicKind::UnsafePointer => self.scx.type_ptr().into(),
            BasicKind::Uintptr => self.int_type_of_width(self.config.pointer_width),
        }
    }

    /// `runtime.strcat`/`runtime.strcmp` and friends all take this shape —
    /// exposed so C4 doesn't have to rebuild `{ptr, i32}` by hand.
    pub fn string_type(&self) -> BasicTypeEnum<'ll> {
        self.basic_llvm(BasicKind::String)
    }

    pub fn slice_len_cap_type(&self) -> BasicTypeEnum<'ll> {
        self.scx.isize_ty.into()
    }

    /// Translate a source type to its LLVM representation. Pure in `t`'s
    /// `Underlying`: two types with the same canonical key always return
    /// the cached handle from the first call.
    pub fn to_llvm(&mut self, pool: &TypePool, t: TypeId) -> Result<LlvmType<'ll>> {
        let key = pool.canonical_key(t);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(*cached);
        }
        let underlying = pool.underlying_id(t);
        let result = match pool.get(underlying) {
            TypeKind::Bad => {
                return Err(CodegenError::UnsupportedType {
                    detail: "Bad type reached the lowering engine".to_owned(),
                })
            }
            TypeKind::Chan { .. } => {
                return Err(CodegenError::UnsupportedType {
                    detail: "channel types are not implemented".to_owned(),
                })
            }
            TypeKind::Basic(kind) => LlvmType::anon(self.basic_llvm(*kind)),
            TypeKind::Array { elem, len } => {
                let elem_ty = self.to_llvm(pool, *elem)?;
                LlvmType::anon(elem_ty.ty.array_type(*len as u32))
            }
            TypeKind::Slice { elem } => {
                let elem_ty = self.to_llvm(pool, *elem)?;
                let _ = elem_ty; // slices are opaque-pointer based; elem type isn't embedded.
                let isize_ty = self.scx.isize_ty;
                LlvmType::anon(self.scx.type_struct(
                    &[self.scx.type_ptr().into(), isize_ty.into(), isize_ty.into()],
                    false,
                ))
            }
            TypeKind::Struct { fields } => {
                // Insert the opaque struct into the cache *before* visiting
                // members: a field that (transitively, through a pointer)
                // refers back to this struct only ever needs `ptr`, but
                // inserting first keeps repeated self/mutual references to
                // this exact struct sharing one allocation regardless.
                let name = format!("goir.struct.{}", self.next_struct_id);
                self.next_struct_id += 1;
                let opaque = self.scx.type_named_struct(&name);
                let placeholder = LlvmType::named(opaque);
                self.cache.insert(key.clone(), placeholder);

                let mut field_tys = Vec::with_capacity(fields.len());
                for field in fields {
                    field_tys.push(self.to_llvm(pool, field.ty)?.ty);
                }
                self.scx.set_struct_body(opaque, &field_tys, false);
                placeholder
            }
            TypeKind::Pointer { .. } => LlvmType::anon(self.scx.type_ptr()),
            TypeKind::Func { .. } => LlvmType::anon(self.scx.type_ptr()),
            TypeKind::Interface { methods } => {
                let mut fields = vec![self.scx.type_ptr().into(), self.scx.type_ptr().into()];
                for _ in methods {
                    fields.push(self.scx.type_ptr().into());
                }
                LlvmType::anon(self.scx.type_struct(&fields, false))
            }
            TypeKind::Map { key: k, elem } => {
                let k_ty = self.to_llvm(pool, *k)?.ty;
                let elem_ty = self.to_llvm(pool, *elem)?.ty;
                let node = self
                    .scx
                    .type_struct(&[self.scx.type_ptr().into(), k_ty, elem_ty], false);
                LlvmType::anon(
                    self.scx
                        .type_struct(&[self.scx.type_i32().into(), node.into()], false),
                )
            }
            TypeKind::Named { .. } => unreachable!("underlying_id never returns a Named id"),
        };
        self.cache.insert(key, result);
        Ok(result)
    }

    /// Build the `FunctionType` for a `Func` source type — the composed
    /// `fn(return, params*)` signature that `to_llvm` itself only reports
    /// as an opaque `ptr`. The receiver, if present, is prepended as the
    /// leading parameter (§3 invariant). Multiple results pack into an
    /// anonymous struct return type.
    pub fn function_signature(&mut self, pool: &TypePool, func_id: TypeId) -> Result<FunctionType<'ll>> {
        let underlying = pool.underlying_id(func_id);
        let TypeKind::Func {
            recv,
            params,
            results,
            variadic: _,
        } = pool.get(underlying).clone()
        else {
            return Err(CodegenError::UnsupportedType {
                detail: "function_signature called on a non-Func type".to_owned(),
            });
        };

        let mut param_tys = Vec::with_capacity(params.len() + 1);
        if let Some(recv_ty) = recv {
            param_tys.push(self.to_llvm(pool, recv_ty)?.ty);
        }
        for p in &params {
            param_tys.push(self.to_llvm(pool, *p)?.ty);
        }
        let param_meta: Vec<_> = param_tys.iter().map(|t| (*t).into()).collect();

        Ok(match results.len() {
            0 => self.scx.llcx.void_type().fn_type(&param_meta, false),
            1 => {
                let ret = self.to_llvm(pool, results[0])?.ty;
                ret.fn_type(&param_meta, false)
            }
            _ => {
                let mut result_tys = Vec::with_capacity(results.len());
                for r in &results {
                    result_tys.push(self.to_llvm(pool, *r)?.ty);
                }
                let packed = self.scx.type_struct(&result_tys, false);
                packed.fn_type(&param_meta, false)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use goir_hir::{BasicKind as HirBasicKind, Field};
    use inkwell::context::Context;

    #[test]
    fn identical_underlyings_map_to_the_same_handle() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut mapper = TypeMapper::new(&scx, &config);

        let mut pool = TypePool::new();
        let mut names = goir_hir::StringInterner::new();
        let int_ty = pool.alloc_basic(HirBasicKind::Int32);
        let a_name = names.intern("A");
        let b_name = names.intern("B");
        let named_a = pool.alloc_named(a_name, int_ty, vec![]);
        let named_b = pool.alloc_named(b_name, int_ty, vec![]);

        let llvm_a = mapper.to_llvm(&pool, named_a).unwrap();
        let llvm_b = mapper.to_llvm(&pool, named_b).unwrap();
        assert_eq!(llvm_a.ty, llvm_b.ty);
    }

    #[test]
    fn bad_and_chan_are_unsupported() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut mapper = TypeMapper::new(&scx, &config);
        let mut pool = TypePool::new();
        let bad = pool.alloc_bad();
        assert!(mapper.to_llvm(&pool, bad).is_err());

        let elem = pool.alloc_basic(HirBasicKind::Int32);
        let chan = pool.alloc_chan(elem);
        assert!(mapper.to_llvm(&pool, chan).is_err());
    }

    #[test]
    fn recursive_struct_through_pointer_terminates() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut mapper = TypeMapper::new(&scx, &config);

        let mut pool = TypePool::new();
        let mut names = goir_hir::StringInterner::new();
        let node_name = names.intern("Node");
        let placeholder = pool.reserve();
        let next_name = names.intern("next");
        let ptr_to_node = pool.alloc_pointer(placeholder);
        let struct_id = pool.alloc_struct(vec![Field {
            name: next_name,
            ty: ptr_to_node,
        }]);
        pool.patch(
            placeholder,
            TypeKind::Named {
                name: node_name,
                underlying: struct_id,
                methods: vec![],
            },
        );

        let llvm_ty = mapper.to_llvm(&pool, placeholder).unwrap();
        assert!(llvm_ty.named);
        match llvm_ty.ty {
            BasicTypeEnum::StructType(st) => assert_eq!(st.count_fields(), 1),
            _ => panic!("expected struct"),
        }
    }

    #[test]
    fn slice_is_base_len_cap_triple() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut mapper = TypeMapper::new(&scx, &config);
        let mut pool = TypePool::new();
        let elem = pool.alloc_basic(HirBasicKind::Int32);
        let slice = pool.alloc_slice(elem);
        let llvm_ty = mapper.to_llvm(&pool, slice).unwrap();
        match llvm_ty.ty {
            BasicTypeEnum::StructType(st) => assert_eq!(st.count_fields(), 3),
            _ => panic!("expected struct"),
        }
    }

    #[test]
    fn interface_field_count_matches_method_count_plus_two() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut mapper = TypeMapper::new(&scx, &config);
        let mut pool = TypePool::new();
        let mut names = goir_hir::StringInterner::new();
        let unit_fn = pool.alloc_func(None, vec![], vec![], false);
        let m1 = names.intern("Foo");
        let m2 = names.intern("Bar");
        let iface = pool.alloc_interface(vec![
            goir_hir::Method { name: m1, sig: unit_fn },
            goir_hir::Method { name: m2, sig: unit_fn },
        ]);
        let llvm_ty = mapper.to_llvm(&pool, iface).unwrap();
        match llvm_ty.ty {
            BasicTypeEnum::StructType(st) => assert_eq!(st.count_fields(), 4),
            _ => panic!("expected struct"),
        }
    }
}
