//! Engine configuration.
//!
//! Collects everything that influences translation semantics: the resolved
//! architecture and dialect plus the option and environment switches the
//! driver passes through. The engine itself never reads the process
//! environment, which keeps every switch testable in isolation.

use crate::arch::Arch;
use crate::dialect::Dialect;

/// Configuration for one translation stream.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Resolved target architecture
    pub arch: Arch,
    /// Output dialect
    pub dialect: Dialect,
    /// Emit `.unreq` twice, lower- and uppercased (old gas stores both)
    pub fix_unreq: bool,
    /// Apply the thumb-forcing rewrites and start in thumb mode
    pub force_thumb: bool,
    /// AArch64 syntax shims for the early Xcode 5 toolchain
    pub fix_xcode5: bool,
    /// Split `ldr Xd, =sym-off` into a load plus `sub` (armasm64 shim)
    pub armasm64_skip_neg_offset: bool,
    /// Drop `prfum` instructions entirely (armasm64 shim)
    pub armasm64_skip_prfum: bool,
    /// Rewrite fixed-point conversion scales to `64 - scale` (armasm64 shim)
    pub armasm64_invert_scale: bool,
}

impl EngineConfig {
    pub fn new(arch: Arch, dialect: Dialect) -> Self {
        EngineConfig {
            arch,
            dialect,
            fix_unreq: false,
            force_thumb: false,
            fix_xcode5: false,
            armasm64_skip_neg_offset: false,
            armasm64_skip_prfum: false,
            armasm64_invert_scale: false,
        }
    }

    pub fn with_fix_unreq(mut self, on: bool) -> Self {
        self.fix_unreq = on;
        self
    }

    pub fn with_force_thumb(mut self, on: bool) -> Self {
        self.force_thumb = on;
        self
    }

    pub fn with_fix_xcode5(mut self, on: bool) -> Self {
        self.fix_xcode5 = on;
        self
    }
}
