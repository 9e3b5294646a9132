//! C2 — Runtime Type Descriptor Builder.
//!
//! Builds the layered `commonType` + kind-extension (+ optional
//! `uncommonType`) constant globals a runtime uses for reflection, type
//! switches, and interface conversions. Grounded on the same insert-before-
//! recurse discipline as C1's struct mapping (`ori_llvm::codegen::type_info`),
//! reusing `self.layout` so there is exactly one source of truth for size
//! and alignment.

use goir_hir::{BasicKind, Name, TypeId, TypeKind};
use inkwell::types::{BasicType, StructType};
use inkwell::values::{BasicValue, BasicValueEnum, GlobalValue};

use crate::error::Result;
use crate::lower_cx::LowerCx;

/// Reflection kind ordinals. Order is arbitrary but must stay stable within
/// one compilation (nothing outside this module inspects the raw values).
#[derive(Clone, Copy)]
#[repr(u8)]
enum ReflectKind {
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    Uint8 = 6,
    Uint16 = 7,
    Uint32 = 8,
    Uint64 = 9,
    Float32 = 10,
    Float64 = 11,
    String = 12,
    UnsafePointer = 13,
    Uintptr = 14,
    Array = 15,
    Slice = 16,
    Struct = 17,
    Pointer = 18,
    Func = 19,
    Interface = 20,
    Map = 21,
    Chan = 22,
}

impl<'ll, 'a> LowerCx<'ll, 'a> {
    fn common_type_ty(&self) -> StructType<'ll> {
        let i8p = self.scx.type_ptr();
        self.scx.type_struct(
            &[
                self.scx.isize_ty.into(),  // size
                self.scx.type_i64().into(), // hash (kept wide to skip real hashing work here)
                self.scx.type_i8().into(),  // padding flag
                self.scx.type_i8().into(),  // align_var
                self.scx.type_i8().into(),  // align_field
                self.scx.type_i8().into(),  // kind
                i8p.into(),                 // alg_ptr
                i8p.into(),                 // string_ptr
                i8p.into(),                 // uncommon_ptr
                i8p.into(),                 // gc
                i8p.into(),                 // ptrToThis
            ],
            false,
        )
    }

    fn goir_memequal_ptr(&mut self) -> BasicValueEnum<'ll> {
        let f = self.declare_memequal_for_descriptor();
        f.as_global_value().as_pointer_value().as_basic_value_enum()
    }

    fn declare_memequal_for_descriptor(&mut self) -> inkwell::values::FunctionValue<'ll> {
        if let Some(existing) = self.scx.llmod.get_function("goir_memequal") {
            return existing;
        }
        let params = [self.scx.isize_ty.into(), self.scx.type_ptr().into(), self.scx.type_ptr().into()];
        let fn_ty = self.scx.type_i1().fn_type(&params, false);
        self.scx.llmod.add_function("goir_memequal", fn_ty, None)
    }

    fn null_ptr(&self) -> BasicValueEnum<'ll> {
        self.scx.type_ptr().const_null().as_basic_value_enum()
    }

    fn common_fields(&mut self, t: TypeId, kind: ReflectKind) -> Vec<BasicValueEnum<'ll>> {
        let llvm_ty = self.types.to_llvm(self.pool, t).expect("to_runtime called after to_llvm already validated t");
        let size = self.layout.size_of(llvm_ty.ty);
        let align = self.layout.align_of(llvm_ty.ty);
        let equal_fn = self.goir_memequal_ptr();
        vec![
            self.scx.isize_ty.const_int(size, false).as_basic_value_enum(),
            self.scx.type_i64().const_int(0, false).as_basic_value_enum(),
            self.scx.type_i8().const_int(0, false).as_basic_value_enum(),
            self.scx.type_i8().const_int(u64::from(align as u8), false).as_basic_value_enum(),
            self.scx.type_i8().const_int(u64::from(align as u8), false).as_basic_value_enum(),
            self.scx.type_i8().const_int(kind as u64, false).as_basic_value_enum(),
            equal_fn,
            self.null_ptr(),
            self.null_ptr(),
            self.null_ptr(),
            self.null_ptr(), // ptrToThis patched in after the global exists
        ]
    }

    fn basic_kind_ordinal(kind: BasicKind) -> ReflectKind {
        match kind {
            BasicKind::Bool => ReflectKind::Bool,
            BasicKind::Int | BasicKind::Int32 => ReflectKind::Int32,
            BasicKind::Int8 => ReflectKind::Int8,
            BasicKind::Int16 => ReflectKind::Int16,
            BasicKind::Int64 => ReflectKind::Int64,
            BasicKind::Uint | BasicKind::Uint32 => ReflectKind::Uint32,
            BasicKind::Uint8 => ReflectKind::Uint8,
            BasicKind::Uint16 => ReflectKind::Uint16,
            BasicKind::Uint64 => ReflectKind::Uint64,
            BasicKind::Float32 => ReflectKind::Float32,
            BasicKind::Float64 => ReflectKind::Float64,
            BasicKind::String => ReflectKind::String,
            BasicKind::UnsafePointer => ReflectKind::UnsafePointer,
            BasicKind::Uintptr => ReflectKind::Uintptr,
        }
    }

    /// `to_runtime(t) -> GlobalPtr`. Returns the (cached) `commonType*`
    /// global describing `t`.
    pub fn to_runtime(&mut self, t: TypeId) -> Result<GlobalValue<'ll>> {
        let key = self.pool.canonical_key(t);
        if let Some(existing) = self.descriptor_cache.get(&key).copied() {
            return self.wrap_named_if_needed(t, existing, &key);
        }

        let underlying = self.pool.underlying_id(t);
        let global = self.build_descriptor(underlying, &key)?;
        self.descriptor_cache.insert(key.clone(), global);
        self.wrap_named_if_needed(t, global, &key)
    }

    fn wrap_named_if_needed(&mut self, t: TypeId, underlying_global: GlobalValue<'ll>, underlying_key: &str) -> Result<GlobalValue<'ll>> {
        let named_key = format!("named:{}", t.raw());
        if self.pool.underlying_id(t) == t {
            // t is not a Named wrapper (it already *is* its own underlying).
            return Ok(underlying_global);
        }
        if let Some(existing) = self.descriptor_cache.get(&named_key).copied() {
            return Ok(existing);
        }

        let (name, methods) = match self.pool.get(t) {
            TypeKind::Named { name, methods, .. } => (*name, methods.clone()),
            _ => return Ok(underlying_global),
        };

        let common_ty = self.common_type_ty();
        let uncommon_global_name = format!("reflect.uncommon.{}", self.interner.lookup(name));
        let uncommon_ty = self.scx.type_struct(
            &[self.scx.type_ptr().into(), self.scx.isize_ty.into()],
            false,
        );
        let name_global = self
            .builder
            .build_global_string_ptr(self.interner.lookup(name), "reflect.name")
            .unwrap();
        let uncommon_init = uncommon_ty.const_named_struct(&[
            name_global.as_pointer_value().as_basic_value_enum(),
            self.scx.isize_ty.const_int(methods.len() as u64, false).as_basic_value_enum(),
        ]);
        let uncommon_global = self.scx.llmod.add_global(uncommon_ty, None, &uncommon_global_name);
        uncommon_global.set_initializer(&uncommon_init);
        uncommon_global.set_linkage(inkwell::module::Linkage::Private);

        let reflect_name = format!("reflect.{}", self.interner.lookup(name));
        let global = self.scx.llmod.add_global(common_ty, None, &reflect_name);
        global.set_linkage(inkwell::module::Linkage::Private);

        // `underlying_global` stays reachable via `underlying_key`'s cache
        // entry; this wrapper clones `commonType`'s scalar fields rather
        // than delegating to it, since the two descriptors differ only in
        // `uncommon_ptr`.
        let _ = underlying_key;

        let mut fields = self.common_fields(t, Self::basic_kind_ordinal_or_struct(self.pool, t));
        fields[8] = uncommon_global.as_pointer_value().as_basic_value_enum();
        global.set_initializer(&common_ty.const_named_struct(&fields));

        // `ptrToThis` (index 10) is set by rebuilding the initializer once
        // the global's own address is known, mirroring the two-phase
        // "placeholder then patch" pattern used everywhere else a value
        // needs to embed its own address.
        fields[10] = global.as_pointer_value().as_basic_value_enum();
        global.set_initializer(&common_ty.const_named_struct(&fields));

        self.descriptor_cache.insert(named_key, global);
        Ok(global)
    }

    fn basic_kind_ordinal_or_struct(pool: &goir_hir::TypePool, t: TypeId) -> ReflectKind {
        match pool.get(pool.underlying_id(t)) {
            TypeKind::Basic(k) => Self::basic_kind_ordinal(*k),
            TypeKind::Struct { .. } => ReflectKind::Struct,
            TypeKind::Array { .. } => ReflectKind::Array,
            TypeKind::Slice { .. } => ReflectKind::Slice,
            TypeKind::Pointer { .. } => ReflectKind::Pointer,
            TypeKind::Func { .. } => ReflectKind::Func,
            TypeKind::Interface { .. } => ReflectKind::Interface,
            TypeKind::Map { .. } => ReflectKind::Map,
            TypeKind::Chan { .. } => ReflectKind::Chan,
            TypeKind::Bad | TypeKind::Named { .. } => ReflectKind::UnsafePointer,
        }
    }

    /// The per-kind extension record type laid out after `commonType`
    /// (§3/§4.2 step 4): `sliceType{common, elem}`, `ptrType{common, base}`,
    /// `mapType{common, key, elem}`, `structType{common, fields}`,
    /// `interfaceType{common, methods}`. `commonType` is embedded as the
    /// leading field so a pointer to the extension record is also a valid
    /// `commonType*` under LLVM 17's opaque pointers (no bitcast needed).
    /// `arrayType`/`funcType`/`chanType` stay unextended per §4.1's "may be
    /// stubs" allowance.
    fn extension_ty(&self, kind: ReflectKind, common_ty: StructType<'ll>) -> StructType<'ll> {
        let ptr = self.scx.type_ptr();
        match kind {
            ReflectKind::Slice => self.scx.type_struct(&[common_ty.into(), ptr.into()], false),
            ReflectKind::Pointer => self.scx.type_struct(&[common_ty.into(), ptr.into()], false),
            ReflectKind::Map => self.scx.type_struct(&[common_ty.into(), ptr.into(), ptr.into()], false),
            ReflectKind::Struct => self.scx.type_struct(&[common_ty.into(), ptr.into()], false),
            ReflectKind::Interface => self.scx.type_struct(&[common_ty.into(), ptr.into()], false),
            _ => common_ty,
        }
    }

    /// `{name: i8*, type: commonType*, offset: uintptr}`, one per struct
    /// field, for `structType.fields`.
    fn struct_field_descriptor_ty(&self) -> StructType<'ll> {
        let ptr = self.scx.type_ptr();
        self.scx.type_struct(&[ptr.into(), ptr.into(), self.scx.isize_ty.into()], false)
    }

    /// `{name: i8*, type: commonType*}`, one per interface method, for
    /// `interfaceType.methods`.
    fn method_descriptor_ty(&self) -> StructType<'ll> {
        let ptr = self.scx.type_ptr();
        self.scx.type_struct(&[ptr.into(), ptr.into()], false)
    }

    /// Trailing fields for `kind`'s extension record (everything after the
    /// embedded `commonType`), recursing into `to_runtime` for any
    /// referenced element/base/key/field/method type. Empty for kinds that
    /// carry no extension (`extension_ty` returned `common_ty` unchanged).
    fn extension_fields(&mut self, underlying: TypeId, kind: ReflectKind) -> Result<Vec<BasicValueEnum<'ll>>> {
        match kind {
            ReflectKind::Slice => {
                let elem = match self.pool.get(underlying) {
                    TypeKind::Slice { elem } => *elem,
                    _ => unreachable!("ReflectKind::Slice implies TypeKind::Slice"),
                };
                let elem_desc = self.to_runtime(elem)?.as_pointer_value().as_basic_value_enum();
                Ok(vec![elem_desc])
            }
            ReflectKind::Pointer => {
                let base = match self.pool.get(underlying) {
                    TypeKind::Pointer { base } => *base,
                    _ => unreachable!("ReflectKind::Pointer implies TypeKind::Pointer"),
                };
                let base_desc = self.to_runtime(base)?.as_pointer_value().as_basic_value_enum();
                Ok(vec![base_desc])
            }
            ReflectKind::Map => {
                let (key, elem) = match self.pool.get(underlying) {
                    TypeKind::Map { key, elem } => (*key, *elem),
                    _ => unreachable!("ReflectKind::Map implies TypeKind::Map"),
                };
                let key_desc = self.to_runtime(key)?.as_pointer_value().as_basic_value_enum();
                let elem_desc = self.to_runtime(elem)?.as_pointer_value().as_basic_value_enum();
                Ok(vec![key_desc, elem_desc])
            }
            ReflectKind::Struct => {
                let fields = match self.pool.get(underlying) {
                    TypeKind::Struct { fields } => fields.clone(),
                    _ => unreachable!("ReflectKind::Struct implies TypeKind::Struct"),
                };
                let fields_ptr = self.build_struct_fields_array(underlying, &fields)?;
                Ok(vec![fields_ptr])
            }
            ReflectKind::Interface => {
                let methods = match self.pool.get(underlying) {
                    TypeKind::Interface { methods } => methods.clone(),
                    _ => unreachable!("ReflectKind::Interface implies TypeKind::Interface"),
                };
                let methods_ptr = self.build_interface_methods_array(&methods)?;
                Ok(vec![methods_ptr])
            }
            _ => Ok(vec![]),
        }
    }

    /// Builds the `[structField]` constant array backing `structType.fields`
    /// and returns a pointer to it. Field offsets come from `self.layout`
    /// (the same `TargetData` query `unsafe.Offsetof` uses), so there is one
    /// source of truth for "where does this field live".
    fn build_struct_fields_array(&mut self, underlying: TypeId, fields: &[goir_hir::Field]) -> Result<BasicValueEnum<'ll>> {
        let struct_llvm_ty = self.types.to_llvm(self.pool, underlying)?.ty.into_struct_type();
        let field_desc_ty = self.struct_field_descriptor_ty();
        let mut entries = Vec::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            let name_str = self.interner.lookup(field.name);
            let name_global = self.builder.build_global_string_ptr(name_str, "reflect.field.name").unwrap();
            let type_desc = self.to_runtime(field.ty)?.as_pointer_value().as_basic_value_enum();
            let offset = self.layout.offset_of_field(struct_llvm_ty, i as u32);
            entries.push(field_desc_ty.const_named_struct(&[
                name_global.as_pointer_value().as_basic_value_enum(),
                type_desc,
                self.scx.isize_ty.const_int(offset, false).as_basic_value_enum(),
            ]));
        }
        let array_ty = field_desc_ty.array_type(entries.len() as u32);
        let array_val = if entries.is_empty() {
            array_ty.const_zero()
        } else {
            field_desc_ty.const_array(&entries)
        };
        let array_global = self.scx.llmod.add_global(array_ty, None, "reflect.structfields");
        array_global.set_linkage(inkwell::module::Linkage::Private);
        array_global.set_initializer(&array_val);
        Ok(array_global.as_pointer_value().as_basic_value_enum())
    }

    /// Builds the `[imethod]` constant array backing `interfaceType.methods`
    /// and returns a pointer to it. Methods are already sorted lexically by
    /// `TypePool::alloc_interface` (§3's witness-table invariant), so the
    /// array order doubles as the binary-search order C6 relies on.
    fn build_interface_methods_array(&mut self, methods: &[goir_hir::Method]) -> Result<BasicValueEnum<'ll>> {
        let method_desc_ty = self.method_descriptor_ty();
        let mut entries = Vec::with_capacity(methods.len());
        for m in methods {
            let name_str = self.interner.lookup(m.name);
            let name_global = self.builder.build_global_string_ptr(name_str, "reflect.method.name").unwrap();
            let sig_desc = self.to_runtime(m.sig)?.as_pointer_value().as_basic_value_enum();
            entries.push(method_desc_ty.const_named_struct(&[
                name_global.as_pointer_value().as_basic_value_enum(),
                sig_desc,
            ]));
        }
        let array_ty = method_desc_ty.array_type(entries.len() as u32);
        let array_val = if entries.is_empty() {
            array_ty.const_zero()
        } else {
            method_desc_ty.const_array(&entries)
        };
        let array_global = self.scx.llmod.add_global(array_ty, None, "reflect.ifacemethods");
        array_global.set_linkage(inkwell::module::Linkage::Private);
        array_global.set_initializer(&array_val);
        Ok(array_global.as_pointer_value().as_basic_value_enum())
    }

    fn build_descriptor(&mut self, underlying: TypeId, key: &str) -> Result<GlobalValue<'ll>> {
        let common_ty = self.common_type_ty();
        let kind = Self::basic_kind_ordinal_or_struct(self.pool, underlying);
        let ext_ty = self.extension_ty(kind, common_ty);
        let global_name = format!("reflect.{key}");
        let global = self.scx.llmod.add_global(ext_ty, None, &global_name);
        global.set_linkage(inkwell::module::Linkage::Private);
        // Insert into the cache before building field values that might
        // recurse back into `to_runtime` for this same key (pointer/slice/
        // map element descriptors pointing back at an enclosing struct).
        self.descriptor_cache.insert(key.to_owned(), global);

        let mut common_fields = self.common_fields(underlying, kind);
        let ext_fields = self.extension_fields(underlying, kind)?;
        // Kinds with no extension record keep `ext_ty == common_ty`, so the
        // initializer is the flat 11-field `commonType` directly; kinds that
        // do widen the global embed `commonType` as the extension's leading
        // field (§4.2's "common/uncommon + per-kind record" layering).
        let assemble = |common_fields: &[BasicValueEnum<'ll>]| {
            if ext_fields.is_empty() {
                common_ty.const_named_struct(common_fields)
            } else {
                let mut all = vec![common_ty.const_named_struct(common_fields).as_basic_value_enum()];
                all.extend_from_slice(&ext_fields);
                ext_ty.const_named_struct(&all)
            }
        };

        global.set_initializer(&assemble(&common_fields));

        let self_ptr = global.as_pointer_value().as_basic_value_enum();
        common_fields[10] = self_ptr;
        global.set_initializer(&assemble(&common_fields));

        Ok(global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LowerConfig;
    use crate::context::SimpleCx;
    use goir_hir::{BasicKind as HirBasicKind, ExprArena, StringInterner, TypePool};
    use inkwell::context::Context;

    #[test]
    fn to_runtime_is_idempotent_per_type() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut pool = TypePool::new();
        let exprs = ExprArena::new();
        let interner = StringInterner::new();
        let int_ty = pool.alloc_basic(HirBasicKind::Int32);

        let mut cx = LowerCx::new(&scx, &config, &pool, &exprs, &interner);
        let a = cx.to_runtime(int_ty).unwrap();
        let b = cx.to_runtime(int_ty).unwrap();
        assert_eq!(a.as_pointer_value(), b.as_pointer_value());
    }

    #[test]
    fn named_wrapper_gets_a_distinct_descriptor_from_its_underlying() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut pool = TypePool::new();
        let exprs = ExprArena::new();
        let mut interner = StringInterner::new();
        let int_ty = pool.alloc_basic(HirBasicKind::Int32);
        let name = interner.intern("MyInt");
        let named = pool.alloc_named(name, int_ty, vec![]);

        let mut cx = LowerCx::new(&scx, &config, &pool, &exprs, &interner);
        let underlying_desc = cx.to_runtime(int_ty).unwrap();
        let named_desc = cx.to_runtime(named).unwrap();
        assert_ne!(underlying_desc.as_pointer_value(), named_desc.as_pointer_value());
    }

    #[test]
    fn cyclic_struct_descriptor_terminates() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut pool = TypePool::new();
        let exprs = ExprArena::new();
        let mut interner = StringInterner::new();
        let node_name = interner.intern("Node");
        let placeholder = pool.reserve();
        let next_name = interner.intern("next");
        let ptr_to_node = pool.alloc_pointer(placeholder);
        let struct_id = pool.alloc_struct(vec![goir_hir::Field {
            name: next_name,
            ty: ptr_to_node,
        }]);
        pool.patch(
            placeholder,
            goir_hir::TypeKind::Named {
                name: node_name,
                underlying: struct_id,
                methods: vec![],
            },
        );

        let mut cx = LowerCx::new(&scx, &config, &pool, &exprs, &interner);
        let desc = cx.to_runtime(placeholder).unwrap();
        assert!(!desc.as_pointer_value().is_null());
    }

    #[test]
    fn slice_descriptor_carries_an_elem_extension_field() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut pool = TypePool::new();
        let exprs = ExprArena::new();
        let interner = StringInterner::new();
        let int_ty = pool.alloc_basic(HirBasicKind::Int32);
        let slice_ty = pool.alloc_slice(int_ty);

        let mut cx = LowerCx::new(&scx, &config, &pool, &exprs, &interner);
        let desc = cx.to_runtime(slice_ty).unwrap();
        let elem_desc = cx.to_runtime(int_ty).unwrap();

        // The extension's `elem` field (index 1, after the embedded
        // `commonType`) is the int32 descriptor, not a null/stub pointer.
        let operand = desc.get_initializer().unwrap().into_struct_value().get_field_at_index(1).unwrap();
        assert_eq!(operand.into_pointer_value(), elem_desc.as_pointer_value());
        assert!(cx.scx.llmod.verify().is_ok());
    }

    #[test]
    fn struct_descriptor_carries_a_nonnull_fields_array() {
        let llcx = Context::create();
        let scx = SimpleCx::new(&llcx, "m", 64);
        let config = LowerConfig::default();
        let mut pool = TypePool::new();
        let exprs = ExprArena::new();
        let mut interner = StringInterner::new();
        let int_ty = pool.alloc_basic(HirBasicKind::Int32);
        let field_name = interner.intern("x");
        let struct_ty = pool.alloc_struct(vec![goir_hir::Field { name: field_name, ty: int_ty }]);

        let mut cx = LowerCx::new(&scx, &config, &pool, &exprs, &interner);
        let desc = cx.to_runtime(struct_ty).unwrap();
        let fields_ptr = desc.get_initializer().unwrap().into_struct_value().get_field_at_index(1).unwrap();
        assert!(!fields_ptr.into_pointer_value().is_null());
        assert!(cx.scx.llmod.verify().is_ok());
    }
}
