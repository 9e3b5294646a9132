//! C-ABI runtime functions that `goir_llvm`-emitted modules declare and
//! call by name.
//!
//! This is a stand-in for the real garbage-collected runtime library (§1,
//! §6): just enough so the lowering engine has real symbols to declare and
//! so tests can call them directly instead of only inspecting IR shape.
//! `goir_` is prefixed onto every export because bare names like `strcat`
//! collide with libc symbols of the same name once linked into a binary.
//!
//! All functions use `extern "C"` for FFI compatibility with LLVM-generated
//! calls; none are marked `unsafe` at the call boundary itself since they
//! are FFI entry points, matching the convention of the runtime library this
//! workspace links `goir_llvm`-emitted code against.

#![allow(
    clippy::not_unsafe_ptr_arg_deref,
    reason = "FFI entry points receive pointers from LLVM-generated code, which guarantees validity"
)]

use std::alloc::{self, Layout};
use std::cmp::Ordering;

/// Source-language string representation: `{ data: i8*, len: i32 }`, per
/// the LLVM type mapping for `Basic(String)`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct GoirString {
    pub data: *const u8,
    pub len: i32,
}

impl GoirString {
    /// # Safety
    /// `data` must point at `len` valid, initialized bytes.
    pub unsafe fn as_str(&self) -> &str {
        if self.data.is_null() || self.len <= 0 {
            return "";
        }
        let bytes = std::slice::from_raw_parts(self.data, self.len as usize);
        std::str::from_utf8_unchecked(bytes)
    }

    fn from_boxed(bytes: Box<[u8]>) -> Self {
        let len = bytes.len() as i32;
        let data = Box::into_raw(bytes) as *const u8;
        GoirString { data, len }
    }
}

/// Source-language slice representation: `{ base: T*, len: uint, cap: uint }`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct GoirSlice {
    pub base: *mut u8,
    pub len: usize,
    pub cap: usize,
}

/// `runtime.strcat(a, b) -> string`: concatenation (C4).
#[no_mangle]
pub unsafe extern "C" fn goir_strcat(a: GoirString, b: GoirString) -> GoirString {
    let mut out = Vec::with_capacity(a.len.max(0) as usize + b.len.max(0) as usize);
    out.extend_from_slice(a.as_str().as_bytes());
    out.extend_from_slice(b.as_str().as_bytes());
    GoirString::from_boxed(out.into_boxed_slice())
}

/// `runtime.strcmp(a, b) -> i32`: lexicographic ordering, followed by
/// comparison against zero at the call site for `<`/`<=`/`>`/`>=`; `==`/`!=`
/// may route through this too (C4 notes both paths are acceptable).
#[no_mangle]
pub unsafe extern "C" fn goir_strcmp(a: GoirString, b: GoirString) -> i32 {
    match a.as_str().cmp(b.as_str()) {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    }
}

/// `runtime.memequal(size, a, b) -> bool`: the primitive backing struct/array
/// equality and the dedicated string `==`/`!=` fast path.
///
/// # Safety
/// `a` and `b` must each point at `size` valid, initialized bytes.
#[no_mangle]
pub unsafe extern "C" fn goir_memequal(size: usize, a: *const u8, b: *const u8) -> bool {
    if size == 0 {
        return true;
    }
    std::slice::from_raw_parts(a, size) == std::slice::from_raw_parts(b, size)
}

/// Growable-slice append. Reallocates when `cap` is exhausted (doubling),
/// copies `elem_size` bytes from `elem` into the new final slot.
///
/// # Safety
/// `slice.base` (if non-null) must have been allocated with `Layout::array`
/// for `cap` elements of `elem_size` bytes; `elem` must point at `elem_size`
/// valid bytes.
#[no_mangle]
pub unsafe extern "C" fn goir_append(slice: GoirSlice, elem: *const u8, elem_size: usize) -> GoirSlice {
    if elem_size == 0 {
        return GoirSlice {
            base: slice.base,
            len: slice.len + 1,
            cap: slice.cap.max(slice.len + 1),
        };
    }
    if slice.len < slice.cap {
        let dst = slice.base.add(slice.len * elem_size);
        std::ptr::copy_nonoverlapping(elem, dst, elem_size);
        return GoirSlice {
            base: slice.base,
            len: slice.len + 1,
            cap: slice.cap,
        };
    }
    let new_cap = (slice.cap * 2).max(4);
    let new_layout = Layout::array::<u8>(new_cap * elem_size).expect("append capacity overflow");
    let new_base = alloc::alloc(new_layout);
    if !slice.base.is_null() && slice.len > 0 {
        std::ptr::copy_nonoverlapping(slice.base, new_base, slice.len * elem_size);
        let old_layout =
            Layout::array::<u8>(slice.cap * elem_size).expect("append capacity overflow");
        alloc::dealloc(slice.base, old_layout);
    }
    let dst = new_base.add(slice.len * elem_size);
    std::ptr::copy_nonoverlapping(elem, dst, elem_size);
    GoirSlice {
        base: new_base,
        len: slice.len + 1,
        cap: new_cap,
    }
}

/// `print`/`println` (C7) write each operand through one of these
/// per-type entry points rather than a single variadic/format-string
/// function, since the kind of each operand is already known at lowering
/// time and a format string would just rediscover it. `goir_print_space`/
/// `goir_print_newline` back `println`'s inter-operand spacing and
/// trailing newline.
///
/// # Safety
/// `s.data` must point at `s.len` valid, initialized bytes (same
/// requirement as `GoirString::as_str`).
#[no_mangle]
pub unsafe extern "C" fn goir_print_str(s: GoirString) {
    print!("{}", s.as_str());
}

#[no_mangle]
pub extern "C" fn goir_print_int(n: i64) {
    print!("{n}");
}

#[no_mangle]
pub extern "C" fn goir_print_float(f: f64) {
    print!("{f}");
}

#[no_mangle]
pub extern "C" fn goir_print_bool(b: bool) {
    print!("{b}");
}

#[no_mangle]
pub extern "C" fn goir_print_space() {
    print!(" ");
}

#[no_mangle]
pub extern "C" fn goir_print_newline() {
    println!();
}

/// One entry of the placeholder map representation described in SPEC_FULL.md
/// §4.1/§9: `ListNode = { *ListNode next, k key, e elem }`. Key and element
/// bytes are stored inline after the `next` pointer, at caller-supplied
/// sizes (the map is generic over `k`/`e` only at the LLVM type level; this
/// runtime only ever sees raw byte spans).
///
/// Node layout: `[next: *mut u8][key: key_size bytes][elem: elem_size bytes]`.
#[repr(C)]
struct GoirMapNode {
    next: *mut u8,
}

fn node_layout(key_size: usize, elem_size: usize) -> Layout {
    Layout::array::<u8>(std::mem::size_of::<*mut u8>() + key_size + elem_size)
        .expect("map node size overflow")
}

unsafe fn node_key<'a>(node: *mut u8, key_size: usize) -> &'a [u8] {
    let key_ptr = node.add(std::mem::size_of::<*mut u8>());
    std::slice::from_raw_parts(key_ptr, key_size)
}

unsafe fn node_elem<'a>(node: *mut u8, key_size: usize, elem_size: usize) -> &'a [u8] {
    let elem_ptr = node.add(std::mem::size_of::<*mut u8>() + key_size);
    std::slice::from_raw_parts(elem_ptr, elem_size)
}

unsafe fn node_next(node: *mut u8) -> *mut u8 {
    (*(node as *mut GoirMapNode)).next
}

/// Map header: `{ i32 size, ListNode }`. Unlike the original this is flagged
/// against in SPEC_FULL.md §9, `size` is the authoritative entry count,
/// including doubling as the "is this map empty" sentinel: a fresh map has
/// `size == 0` and an undefined (never-read) inline node.
#[repr(C)]
pub struct GoirMap {
    pub size: i32,
    head: *mut u8,
}

/// Allocate an empty map header. Not part of the fixed signature list in
/// §6, but a necessary companion: the placeholder `ListNode` layout has no
/// other construction path.
#[no_mangle]
pub extern "C" fn goir_map_new() -> GoirMap {
    GoirMap {
        size: 0,
        head: std::ptr::null_mut(),
    }
}

/// Insert or overwrite `key -> elem`. Companion to `goir_map_lookup`/
/// `goir_map_delete`; byte-equality is used for key comparison, which is
/// correct for the fixed-size comparable key types the source language
/// allows as map keys.
///
/// # Safety
/// `key`/`elem` must point at `key_size`/`elem_size` valid bytes.
#[no_mangle]
pub unsafe extern "C" fn goir_map_insert(
    map: &mut GoirMap,
    key_size: usize,
    elem_size: usize,
    key: *const u8,
    elem: *const u8,
) {
    let key_bytes = std::slice::from_raw_parts(key, key_size);
    let mut cur = map.head;
    while !cur.is_null() {
        if node_key(cur, key_size) == key_bytes {
            let elem_ptr = cur.add(std::mem::size_of::<*mut u8>() + key_size);
            std::ptr::copy_nonoverlapping(elem, elem_ptr, elem_size);
            return;
        }
        cur = node_next(cur);
    }
    let layout = node_layout(key_size, elem_size);
    let node = alloc::alloc(layout);
    (*(node as *mut GoirMapNode)).next = map.head;
    let key_ptr = node.add(std::mem::size_of::<*mut u8>());
    std::ptr::copy_nonoverlapping(key, key_ptr, key_size);
    let elem_ptr = node.add(std::mem::size_of::<*mut u8>() + key_size);
    std::ptr::copy_nonoverlapping(elem, elem_ptr, elem_size);
    map.head = node;
    map.size += 1;
}

/// `mapLookup(m, key, commaOk) -> (value, present)`, realized as an
/// out-parameter plus a `bool` return for "present".
///
/// # Safety
/// `key` must point at `key_size` valid bytes; `out_elem` must point at
/// `elem_size` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn goir_map_lookup(
    map: &GoirMap,
    key_size: usize,
    elem_size: usize,
    key: *const u8,
    out_elem: *mut u8,
) -> bool {
    if map.size == 0 {
        return false;
    }
    let key_bytes = std::slice::from_raw_parts(key, key_size);
    let mut cur = map.head;
    while !cur.is_null() {
        if node_key(cur, key_size) == key_bytes {
            let elem_bytes = node_elem(cur, key_size, elem_size);
            std::ptr::copy_nonoverlapping(elem_bytes.as_ptr(), out_elem, elem_size);
            return true;
        }
        cur = node_next(cur);
    }
    false
}

/// `mapDelete(m, key)`.
///
/// # Safety
/// `key` must point at `key_size` valid bytes.
#[no_mangle]
pub unsafe extern "C" fn goir_map_delete(map: &mut GoirMap, key_size: usize, elem_size: usize, key: *const u8) {
    if map.size == 0 {
        return;
    }
    let key_bytes = std::slice::from_raw_parts(key, key_size);
    let mut prev: *mut u8 = std::ptr::null_mut();
    let mut cur = map.head;
    while !cur.is_null() {
        let next = node_next(cur);
        if node_key(cur, key_size) == key_bytes {
            if prev.is_null() {
                map.head = next;
            } else {
                (*(prev as *mut GoirMapNode)).next = next;
            }
            let layout = node_layout(key_size, elem_size);
            alloc::dealloc(cur, layout);
            map.size -= 1;
            return;
        }
        prev = cur;
        cur = next;
    }
}
