//! Source type system: the sum-of-variants `TypeKind` from SPEC_FULL.md §3,
//! stored in an arena (`TypePool`) and referenced everywhere by the `Copy`
//! `TypeId` handle.
//!
//! Mirrors the arena + opaque-id pattern of `ori_types::idx`/`type_interner`:
//! recursive (possibly cyclic) type graphs become plain index arithmetic
//! instead of owned recursive structures, so a `Named` type whose underlying
//! struct points back to itself through a `Pointer` is just two `TypeId`s
//! referring into the same `Vec`.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::name::Name;

/// Opaque handle into a `TypePool`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    pub const NONE: TypeId = TypeId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "TypeId(NONE)")
        } else {
            write!(f, "TypeId({})", self.0)
        }
    }
}

/// Basic (non-composite) kinds. `Int`/`Uint` are fixed at 32 bits regardless
/// of host platform — SPEC_FULL.md §9 flags this as a divergence from common
/// conventions and asks for it to be an explicit configuration choice; see
/// `goir_llvm::config::LowerConfig::int_width`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    UnsafePointer,
    Uintptr,
}

/// One field of a `Struct`. A field whose `name` is `Name::EMPTY` is
/// **embedded**: its own fields/methods are promoted into the enclosing
/// struct (SPEC_FULL.md §4.6 / §6 glossary).
#[derive(Clone, Debug)]
pub struct Field {
    pub name: Name,
    pub ty: TypeId,
}

impl Field {
    pub fn is_embedded(&self) -> bool {
        self.name == Name::EMPTY
    }
}

/// One method of a `Named` type or entry of an `Interface`'s method set.
/// `sig` is the `TypeId` of a `Func` type.
#[derive(Clone, Debug)]
pub struct Method {
    pub name: Name,
    pub sig: TypeId,
}

/// The sum-of-variants source type, per SPEC_FULL.md §3.
#[derive(Clone, Debug)]
pub enum TypeKind {
    /// Placeholder for a type the checker could not resolve; never reaches
    /// a successful lowering (see `CodegenError::UnsupportedType`).
    Bad,
    Basic(BasicKind),
    Array {
        elem: TypeId,
        len: u64,
    },
    Slice {
        elem: TypeId,
    },
    /// Field order is significant (layout + embedding promotion order).
    Struct {
        fields: Vec<Field>,
    },
    Pointer {
        base: TypeId,
    },
    Func {
        /// `Some` iff this is a method; lowered as the leading parameter.
        recv: Option<TypeId>,
        params: Vec<TypeId>,
        results: Vec<TypeId>,
        variadic: bool,
    },
    /// Methods must be sorted lexicographically by name (binary search at
    /// the selector site, stable witness-table layout). Use
    /// `TypePool::alloc_interface` to get this for free.
    Interface {
        methods: Vec<Method>,
    },
    Map {
        key: TypeId,
        elem: TypeId,
    },
    Chan {
        elem: TypeId,
    },
    /// A declared name over an underlying type, plus its method set.
    /// Methods need not be sorted (selector resolution on a named type's own
    /// methods is by linear/binary search over the small, explicit list; only
    /// `Interface` witness tables require the sortedness invariant).
    Named {
        name: Name,
        underlying: TypeId,
        methods: Vec<Method>,
    },
}

/// Arena of interned `TypeKind`s.
///
/// Structural (non-`Named`, non-`Bad`) shapes are hash-consed: allocating the
/// same shape twice (after stripping `Named` wrappers from every child,
/// per the `Underlying(t)` invariant) returns the same `TypeId`. `Named`
/// types are never hash-consed — each declared name is its own identity,
/// even if two named types happen to share an underlying shape.
pub struct TypePool {
    kinds: Vec<TypeKind>,
    structural_cache: FxHashMap<String, TypeId>,
}

impl TypePool {
    pub fn new() -> Self {
        Self {
            kinds: Vec::with_capacity(64),
            structural_cache: FxHashMap::default(),
        }
    }

    pub fn get(&self, id: TypeId) -> &TypeKind {
        &self.kinds[id.raw() as usize]
    }

    /// `Underlying(t)`: strip all `Named` layers, returning the id of the
    /// first non-`Named` ancestor.
    pub fn underlying_id(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        loop {
            match self.get(cur) {
                TypeKind::Named { underlying, .. } => cur = *underlying,
                _ => return cur,
            }
        }
    }

    fn alloc_raw(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind);
        id
    }

    /// Allocate a structural (hash-consed) type: same shape in, same
    /// `TypeId` out. `key` must already reflect `Underlying` of every child
    /// (callers go through the `alloc_*` helpers below, which take care of
    /// this).
    fn alloc_structural(&mut self, key: String, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.structural_cache.get(&key) {
            return id;
        }
        let id = self.alloc_raw(kind);
        self.structural_cache.insert(key, id);
        id
    }

    pub fn alloc_bad(&mut self) -> TypeId {
        self.alloc_structural("bad".to_owned(), TypeKind::Bad)
    }

    pub fn alloc_basic(&mut self, kind: BasicKind) -> TypeId {
        let key = format!("basic:{kind:?}");
        self.alloc_structural(key, TypeKind::Basic(kind))
    }

    pub fn alloc_array(&mut self, elem: TypeId, len: u64) -> TypeId {
        let ue = self.underlying_id(elem);
        let key = format!("array:{}:{len}", ue.raw());
        self.alloc_structural(key, TypeKind::Array { elem, len })
    }

    pub fn alloc_slice(&mut self, elem: TypeId) -> TypeId {
        let ue = self.underlying_id(elem);
        let key = format!("slice:{}", ue.raw());
        self.alloc_structural(key, TypeKind::Slice { elem })
    }

    pub fn alloc_struct(&mut self, fields: Vec<Field>) -> TypeId {
        let parts: Vec<String> = fields
            .iter()
            .map(|f| format!("{}:{}", f.name.raw(), self.underlying_id(f.ty).raw()))
            .collect();
        let key = format!("struct:{}", parts.join(","));
        self.alloc_structural(key, TypeKind::Struct { fields })
    }

    pub fn alloc_pointer(&mut self, base: TypeId) -> TypeId {
        let ub = self.underlying_id(base);
        let key = format!("ptr:{}", ub.raw());
        self.alloc_structural(key, TypeKind::Pointer { base })
    }

    pub fn alloc_func(
        &mut self,
        recv: Option<TypeId>,
        params: Vec<TypeId>,
        results: Vec<TypeId>,
        variadic: bool,
    ) -> TypeId {
        let recv_key = recv.map_or(-1i64, |r| self.underlying_id(r).raw() as i64);
        let param_key: Vec<String> = params
            .iter()
            .map(|&p| self.underlying_id(p).raw().to_string())
            .collect();
        let result_key: Vec<String> = results
            .iter()
            .map(|&r| self.underlying_id(r).raw().to_string())
            .collect();
        let key = format!(
            "func:{recv_key}:{}:{}:{variadic}",
            param_key.join(","),
            result_key.join(",")
        );
        self.alloc_structural(
            key,
            TypeKind::Func {
                recv,
                params,
                results,
                variadic,
            },
        )
    }

    /// Allocate an interface type, sorting its method set by name first
    /// (selector resolution binary-searches this list, so it must stay sorted).
    pub fn alloc_interface(&mut self, mut methods: Vec<Method>) -> TypeId {
        methods.sort_by_key(|m| m.name);
        let parts: Vec<String> = methods
            .iter()
            .map(|m| format!("{}:{}", m.name.raw(), self.underlying_id(m.sig).raw()))
            .collect();
        let key = format!("iface:{}", parts.join(","));
        self.alloc_structural(key, TypeKind::Interface { methods })
    }

    pub fn alloc_map(&mut self, key_ty: TypeId, elem: TypeId) -> TypeId {
        let uk = self.underlying_id(key_ty);
        let ue = self.underlying_id(elem);
        let key = format!("map:{}:{}", uk.raw(), ue.raw());
        self.alloc_structural(key, TypeKind::Map { key: key_ty, elem })
    }

    pub fn alloc_chan(&mut self, elem: TypeId) -> TypeId {
        let ue = self.underlying_id(elem);
        let key = format!("chan:{}", ue.raw());
        self.alloc_structural(key, TypeKind::Chan { elem })
    }

    /// Allocate a `Named` type. Unlike the structural `alloc_*` helpers,
    /// every call produces a fresh `TypeId` — two declarations with
    /// identical underlying shapes are still distinct named types.
    ///
    /// `underlying` may reference a `Pointer`/`Struct` that (transitively)
    /// points back at the `TypeId` this call returns; callers build the
    /// cyclic pieces with a placeholder and patch them in afterward (see
    /// `TypePool::reserve` below), mirroring "insert the opaque struct into
    /// the cache before visiting its members" in SPEC_FULL.md §9.
    pub fn alloc_named(&mut self, name: Name, underlying: TypeId, methods: Vec<Method>) -> TypeId {
        self.alloc_raw(TypeKind::Named {
            name,
            underlying,
            methods,
        })
    }

    /// Reserve a slot for a type that will be patched in once its
    /// (possibly cyclic) definition is known. Returns a `TypeId` that is
    /// valid to embed in other types immediately; `patch` must be called
    /// with the real `TypeKind` before the pool is used for lowering.
    pub fn reserve(&mut self) -> TypeId {
        self.alloc_raw(TypeKind::Bad)
    }

    pub fn patch(&mut self, id: TypeId, kind: TypeKind) {
        self.kinds[id.raw() as usize] = kind;
    }

    /// The canonical string cache key for `Underlying(t)`, as required by
    /// SPEC_FULL.md §4.1 ("keyed by canonical string"). Structural identity
    /// is already established by hash-consing in `alloc_*`, so this is the
    /// same string that would have been computed when `id`'s underlying
    /// shape was first allocated; recomputing it here (rather than storing
    /// it) keeps `TypePool` from needing a reverse id→key map.
    pub fn canonical_key(&self, id: TypeId) -> String {
        let u = self.underlying_id(id);
        match self.get(u) {
            TypeKind::Bad => "bad".to_owned(),
            TypeKind::Basic(k) => format!("basic:{k:?}"),
            TypeKind::Array { elem, len } => {
                format!("array:{}:{len}", self.underlying_id(*elem).raw())
            }
            TypeKind::Slice { elem } => format!("slice:{}", self.underlying_id(*elem).raw()),
            TypeKind::Struct { fields } => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}:{}", f.name.raw(), self.underlying_id(f.ty).raw()))
                    .collect();
                format!("struct:{}", parts.join(","))
            }
            TypeKind::Pointer { base } => format!("ptr:{}", self.underlying_id(*base).raw()),
            TypeKind::Func {
                recv,
                params,
                results,
                variadic,
            } => {
                let recv_key = recv.map_or(-1i64, |r| self.underlying_id(r).raw() as i64);
                let param_key: Vec<String> = params
                    .iter()
                    .map(|&p| self.underlying_id(p).raw().to_string())
                    .collect();
                let result_key: Vec<String> = results
                    .iter()
                    .map(|&r| self.underlying_id(r).raw().to_string())
                    .collect();
                format!(
                    "func:{recv_key}:{}:{}:{variadic}",
                    param_key.join(","),
                    result_key.join(",")
                )
            }
            TypeKind::Interface { methods } => {
                let parts: Vec<String> = methods
                    .iter()
                    .map(|m| format!("{}:{}", m.name.raw(), self.underlying_id(m.sig).raw()))
                    .collect();
                format!("iface:{}", parts.join(","))
            }
            TypeKind::Map { key, elem } => {
                format!(
                    "map:{}:{}",
                    self.underlying_id(*key).raw(),
                    self.underlying_id(*elem).raw()
                )
            }
            TypeKind::Chan { elem } => format!("chan:{}", self.underlying_id(*elem).raw()),
            TypeKind::Named { .. } => unreachable!("underlying_id never returns a Named id"),
        }
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}
