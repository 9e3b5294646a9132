//! Size/alignment/offset queries backed by inkwell's `TargetData`, grounded
//! on `ori_llvm::aot::target`'s `Once`-gated native-target initialization.
//!
//! §9 flags `Alignof`/`Offsetof` as unimplemented in the distilled spec and
//! records the decision to implement them for real, since `to_llvm` already
//! produces concrete LLVM types this can query — a few lines of real code
//! beats a silent no-op. The same queries back the `size`/`align` fields of
//! C2's runtime descriptors, so there is exactly one source of truth for
//! "how big is this type" rather than a hand-rolled calculator duplicating
//! what LLVM itself already knows.

use std::sync::Once;

use inkwell::targets::{
    CodeModel, InitializationConfig, RelocMode, Target, TargetData, TargetMachine, TargetTriple,
};
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::OptimizationLevel;

static NATIVE_TARGET_INIT: Once = Once::new();

fn ensure_native_target_initialized() {
    NATIVE_TARGET_INIT.call_once(|| {
        Target::initialize_native(&InitializationConfig::default())
            .expect("failed to initialize native LLVM target");
    });
}

/// Host data layout. This crate performs no cross compilation — full AOT
/// target selection is out of scope (§2.1's `LowerConfig` is intentionally
/// scaled down) — so this is always the native triple.
pub struct Layout {
    target_data: TargetData,
}

impl Layout {
    pub fn native() -> Self {
        ensure_native_target_initialized();
        let triple = TargetMachine::get_default_triple();
        let target =
            Target::from_triple(&triple).expect("host target not supported by this LLVM build");
        let machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::None,
                RelocMode::Default,
                CodeModel::Default,
            )
            .expect("failed to create a target machine for the host triple");
        Self {
            target_data: machine.get_target_data(),
        }
    }

    /// ABI size in bytes, as `unsafe.Sizeof` returns (via C7).
    pub fn size_of(&self, ty: BasicTypeEnum<'_>) -> u64 {
        self.target_data.get_store_size(&ty)
    }

    /// ABI alignment in bytes.
    pub fn align_of(&self, ty: BasicTypeEnum<'_>) -> u32 {
        self.target_data.get_abi_alignment(&ty)
    }

    /// Byte offset of `field_index` within `struct_ty`.
    pub fn offset_of_field(&self, struct_ty: StructType<'_>, field_index: u32) -> u64 {
        self.target_data
            .offset_of_element(&struct_ty, field_index)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn i32_size_and_align_are_four_bytes() {
        let llcx = Context::create();
        let layout = Layout::native();
        let i32_ty = llcx.i32_type();
        assert_eq!(layout.size_of(i32_ty.into()), 4);
        assert_eq!(layout.align_of(i32_ty.into()), 4);
    }

    #[test]
    fn struct_field_offsets_are_monotonic() {
        let llcx = Context::create();
        let layout = Layout::native();
        let st = llcx.struct_type(&[llcx.i8_type().into(), llcx.i64_type().into()], false);
        let off0 = layout.offset_of_field(st, 0);
        let off1 = layout.offset_of_field(st, 1);
        assert_eq!(off0, 0);
        assert!(off1 >= 1);
    }
}
