//! Lowering configuration: the small set of target/host facts the engine
//! needs without pulling in full AOT target selection (`ori_llvm::aot::target`
//! does the real version of this — out of scope here).

/// Bit width used for `Int`/`Uint` (§9 flags the distilled spec's hardcoded
/// 32-bit choice as something that should be an explicit configuration
/// knob rather than buried in match arms).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum IntWidth {
    Bits32,
    Bits64,
}

impl IntWidth {
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::Bits32 => 32,
            IntWidth::Bits64 => 64,
        }
    }
}

/// Target/host facts needed to lower constant-folded expressions that
/// reference build configuration (the `GOOS`/`GOARCH`-equivalent boolean
/// folds in §8's testable properties).
#[derive(Clone, Debug)]
pub struct LowerConfig {
    /// `Int`/`Uint` width; kept fixed at `Bits32` by default to match the
    /// distilled behavior, but callers may opt into 64-bit.
    pub int_width: IntWidth,
    /// Pointer width in bits, used for `UnsafePointer`/`Uintptr` and for
    /// `Alignof`/`Offsetof`/`Sizeof`.
    pub pointer_width: u32,
    /// Host "OS" constant, compared against string literals in constant
    /// folds the way `GOOS == "linux"` would be.
    pub host_os: String,
    /// Host "architecture" constant, same role as `host_os`.
    pub host_arch: String,
}

impl LowerConfig {
    pub fn new(host_os: impl Into<String>, host_arch: impl Into<String>) -> Self {
        Self {
            int_width: IntWidth::Bits32,
            pointer_width: 64,
            host_os: host_os.into(),
            host_arch: host_arch.into(),
        }
    }
}

impl Default for LowerConfig {
    fn default() -> Self {
        Self::new("linux", "amd64")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_common_linux_amd64_host() {
        let cfg = LowerConfig::default();
        assert_eq!(cfg.host_os, "linux");
        assert_eq!(cfg.host_arch, "amd64");
        assert_eq!(cfg.int_width.bits(), 32);
    }
}
