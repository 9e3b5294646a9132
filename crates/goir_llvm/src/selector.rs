//! C6 — Selector Resolver.
//!
//! `x.f` is resolved breadth-first over the embedding graph: a field's own
//! fields/methods are promoted into its enclosing struct at the depth they
//! sit, and the shallowest match wins (ties are the type checker's problem,
//! not re-validated here).

use goir_hir::{Method, Name, TypeId, TypeKind};
use inkwell::values::{BasicValue, PointerValue};
use std::collections::VecDeque;

use crate::error::{CodegenError, Result};
use crate::lower_cx::LowerCx;
use crate::value::{LLVMValue, Value};

/// What BFS found at the end of a path: either a named-type/interface
/// method (bound via a receiver pointer) or a plain data field (resolved
/// to a pointer via chained GEPs).
enum Found {
    Method { sig: TypeId, index_path: Vec<u32> },
    Field { ty: TypeId, index_path: Vec<u32> },
}

struct Frontier {
    index_path: Vec<u32>,
    ty: TypeId,
}

impl<'ll, 'a> LowerCx<'ll, 'a> {
    /// Strip exactly one layer of `Pointer` (selectors implicitly
    /// dereference through at most one pointer hop at each BFS step).
    fn deref_one(&self, t: TypeId) -> TypeId {
        let underlying = self.pool.underlying_id(t);
        match self.pool.get(underlying) {
            TypeKind::Pointer { base } => *base,
            _ => t,
        }
    }

    fn find_method<'m>(&self, methods: &'m [Method], name: Name) -> Option<&'m Method> {
        methods.iter().find(|m| m.name == name)
    }

    fn find_field_index(&self, fields: &[goir_hir::Field], name: Name) -> Option<usize> {
        fields.iter().position(|f| !f.is_embedded() && f.name == name)
    }

    /// Resolve `x.field`'s index within `x`'s immediately enclosing struct.
    /// `unsafe.Offsetof` operates on a direct field only — no promotion
    /// through embedding — so this skips the BFS `select` uses and looks
    /// at `x`'s own field list. Returns the dereffed struct type alongside
    /// the index so the caller can hand both straight to `builtin_offsetof`.
    pub(crate) fn direct_field_index(&self, x_ty: TypeId, sel: Name) -> Option<(TypeId, u32)> {
        let underlying = self.pool.underlying_id(self.deref_one(x_ty));
        let TypeKind::Struct { fields } = self.pool.get(underlying) else {
            return None;
        };
        self.find_field_index(fields, sel).map(|i| (underlying, i as u32))
    }

    fn resolve_selector_bfs(&self, start: TypeId, sel: Name) -> Option<Found> {
        let mut queue: VecDeque<Frontier> = VecDeque::new();
        queue.push_back(Frontier { index_path: vec![], ty: start });

        while let Some(Frontier { index_path, ty }) = queue.pop_front() {
            let dereffed = self.deref_one(ty);
            let underlying = self.pool.underlying_id(dereffed);

            if let TypeKind::Named { methods, .. } = self.pool.get(dereffed) {
                if let Some(m) = self.find_method(methods, sel) {
                    return Some(Found::Method { sig: m.sig, index_path });
                }
            }

            if let TypeKind::Struct { fields } = self.pool.get(underlying) {
                if let Some(i) = self.find_field_index(fields, sel) {
                    let mut path = index_path.clone();
                    path.push(i as u32);
                    return Some(Found::Field {
                        ty: fields[i].ty,
                        index_path: path,
                    });
                }
                for (i, field) in fields.iter().enumerate() {
                    if field.is_embedded() {
                        let mut path = index_path.clone();
                        path.push(i as u32);
                        queue.push_back(Frontier { index_path: path, ty: field.ty });
                    }
                }
            }
        }
        None
    }

    /// Chain GEPs along `index_path` starting from `base` (a pointer to a
    /// struct), auto-dereferencing a layer wherever the current field type
    /// is itself a pointer before indexing deeper into it.
    fn gep_chain(&mut self, mut base: PointerValue<'ll>, mut cur_ty: TypeId, index_path: &[u32]) -> Result<(PointerValue<'ll>, TypeId)> {
        for &idx in index_path {
            let dereffed = self.deref_one(cur_ty);
            if dereffed != cur_ty {
                // cur_ty was itself a Pointer; load through it before
                // indexing its pointee's fields.
                let llvm_ty = self.types.to_llvm(self.pool, dereffed)?.ty;
                base = self
                    .builder
                    .build_load(self.scx.type_ptr(), base, "selector.deref")
                    .unwrap()
                    .into_pointer_value();
                let _ = llvm_ty;
                cur_ty = dereffed;
            }
            let underlying = self.pool.underlying_id(cur_ty);
            let TypeKind::Struct { fields } = self.pool.get(underlying) else {
                return Err(CodegenError::SelectorNotFound {
                    name: "<gep step>".to_owned(),
                    on_type: self.pool.canonical_key(cur_ty),
                });
            };
            let field_ty = fields[idx as usize].ty;
            let struct_llvm = self.types.to_llvm(self.pool, cur_ty)?.ty.into_struct_type();
            base = self
                .builder
                .build_struct_gep(struct_llvm, base, idx, "selector.gep")
                .map_err(|_| CodegenError::SelectorNotFound {
                    name: "<gep>".to_owned(),
                    on_type: self.pool.canonical_key(cur_ty),
                })?;
            cur_ty = field_ty;
        }
        Ok((base, cur_ty))
    }

    /// `x.f`. `x` must be addressable (its `Value::pointer` is used as the
    /// GEP base); interface selectors go through `select_interface_method`
    /// instead, since there is no struct layout to GEP through.
    pub fn select(&mut self, x: Value<'ll>, x_ty: TypeId, sel: Name) -> Result<Value<'ll>> {
        let underlying = self.pool.underlying_id(self.deref_one(x_ty));
        if let TypeKind::Interface { methods } = self.pool.get(underlying).clone() {
            return self.select_interface_method(x, &methods, sel);
        }

        let found = self.resolve_selector_bfs(x_ty, sel).ok_or_else(|| {
            let on_type = self.pool.canonical_key(x_ty);
            tracing::warn!(on_type = %on_type, "selector BFS exhausted the embedding graph without a match");
            CodegenError::SelectorNotFound {
                name: "<selector>".to_owned(),
                on_type,
            }
        })?;

        let base_ptr = x.as_llvm().and_then(|v| v.pointer).ok_or_else(|| CodegenError::TypeMismatch {
            expected: "addressable struct value".to_owned(),
            found: "non-addressable value".to_owned(),
        })?;

        match found {
            Found::Method { sig, index_path } => {
                let (receiver_ptr, _) = if index_path.is_empty() {
                    (base_ptr, x_ty)
                } else {
                    self.gep_chain(base_ptr, self.deref_one(x_ty), &index_path)?
                };
                let receiver = receiver_ptr.as_basic_value_enum();
                Ok(Value::Llvm(LLVMValue {
                    ssa: receiver,
                    ty: sig,
                    pointer: None,
                    receiver: Some(receiver),
                }))
            }
            Found::Field { ty, index_path } => {
                let (field_ptr, resolved_ty) = self.gep_chain(base_ptr, self.deref_one(x_ty), &index_path)?;
                let _ = resolved_ty;
                let llvm_ty = self.types.to_llvm(self.pool, ty)?.ty;
                let loaded = self.builder.build_load(llvm_ty, field_ptr, "field").unwrap();
                Ok(Value::Llvm(LLVMValue::addressable(loaded, ty, field_ptr)))
            }
        }
    }

    /// Interface method selection: binary-search the sorted method list
    /// (`alloc_interface` guarantees sortedness), then extract the receiver
    /// (slot 0) and function pointer (slot `i+2`) from the interface's
    /// `{value, type, fn_ptrs...}` runtime representation.
    fn select_interface_method(&mut self, x: Value<'ll>, methods: &[Method], sel: Name) -> Result<Value<'ll>> {
        let i = methods.binary_search_by_key(&sel, |m| m.name).map_err(|_| {
            tracing::warn!("interface method selector not found among its sorted method set");
            CodegenError::SelectorNotFound {
                name: "<interface method>".to_owned(),
                on_type: "interface".to_owned(),
            }
        })?;
        let sig = methods[i].sig;

        let iface_val = self.materialize(&x)?.into_struct_value();
        let receiver = self
            .builder
            .build_extract_value(iface_val, 0, "iface.receiver")
            .unwrap();
        let fn_ptr = self
            .builder
            .build_extract_value(iface_val, (i + 2) as u32, "iface.method")
            .unwrap();

        Ok(Value::Llvm(LLVMValue {
            ssa: fn_ptr,
            ty: sig,
            pointer: None,
            receiver: Some(receiver),
        }))
    }
}
