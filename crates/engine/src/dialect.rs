//! Output dialect tags and their feature tables.
//!
//! A dialect is orthogonal to the architecture: it selects the directive
//! vocabulary of the downstream assembler and the bug shims it needs.
//! Adding a dialect is a data-only change to [`DialectFeatures`].

use crate::error::EngineError;

/// The assembler the translated stream is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Modern GNU as; essentially a pass-through target
    Gas,
    /// Apple's legacy gas fork shipped with old Xcode releases
    AppleGas,
    /// Clang's integrated assembler, non-Darwin
    Clang,
    /// Clang's integrated assembler targeting Mach-O
    AppleClang,
    /// llvm-gcc's assembler on Darwin
    LlvmGcc,
    /// Microsoft armasm / armasm64
    Armasm,
}

/// Per-dialect switches consulted by the rewrite pipeline.
pub struct DialectFeatures {
    /// Rewrite `.L<name>` local labels to `L<name>`
    pub strip_local_label_dot: bool,
    /// Apply Mach-O directive renames (`.global` -> `.globl`, ...)
    pub mach_o: bool,
    /// Rewrite `#:pg_hi21:`/`#:lo12:` into `@PAGE`/`@PAGEOFF`
    pub adrp_page_syntax: bool,
    /// Split add/sub immediates that are large multiples of 4096
    pub split_wide_add_imm: bool,
    /// Track thumb-mode labels and emit `.thumb_func` declarations
    pub thumb_func_tracking: bool,
    /// Directives the assembler rejects; commented out of the output
    pub commented_directives: &'static [&'static str],
}

const GAS: DialectFeatures = DialectFeatures {
    strip_local_label_dot: false,
    mach_o: false,
    adrp_page_syntax: false,
    split_wide_add_imm: false,
    thumb_func_tracking: false,
    commented_directives: &[],
};

const APPLE_GAS: DialectFeatures = DialectFeatures {
    strip_local_label_dot: true,
    mach_o: true,
    adrp_page_syntax: true,
    split_wide_add_imm: false,
    thumb_func_tracking: true,
    commented_directives: &[
        ".type",
        ".endfunc",
        ".size",
        ".fpu",
        ".arch",
        ".object_arch",
    ],
};

const CLANG: DialectFeatures = DialectFeatures {
    strip_local_label_dot: false,
    mach_o: false,
    adrp_page_syntax: false,
    split_wide_add_imm: true,
    thumb_func_tracking: false,
    commented_directives: &[],
};

const APPLE_CLANG: DialectFeatures = DialectFeatures {
    strip_local_label_dot: true,
    mach_o: true,
    adrp_page_syntax: true,
    split_wide_add_imm: true,
    thumb_func_tracking: true,
    commented_directives: &[".type", ".endfunc", ".size", ".fpu", ".arch", ".object_arch"],
};

const LLVM_GCC: DialectFeatures = DialectFeatures {
    strip_local_label_dot: true,
    mach_o: true,
    adrp_page_syntax: true,
    split_wide_add_imm: false,
    thumb_func_tracking: true,
    commented_directives: &[".type", ".endfunc", ".size", ".fpu", ".object_arch"],
};

const ARMASM: DialectFeatures = DialectFeatures {
    strip_local_label_dot: true,
    mach_o: false,
    adrp_page_syntax: false,
    split_wide_add_imm: true,
    thumb_func_tracking: false,
    commented_directives: &[".type", ".size", ".fpu", ".arch", ".object_arch"],
};

impl Dialect {
    /// Canonicalize a dialect name as given to `-as-type`.
    pub fn from_name(name: &str) -> Result<Dialect, EngineError> {
        match name {
            "gas" => Ok(Dialect::Gas),
            "apple-gas" => Ok(Dialect::AppleGas),
            "clang" => Ok(Dialect::Clang),
            "apple-clang" => Ok(Dialect::AppleClang),
            "llvm_gcc" | "llvm-gcc" => Ok(Dialect::LlvmGcc),
            "armasm" | "armasm64" => Ok(Dialect::Armasm),
            _ => Err(EngineError::Config(format!("unknown as-type '{}'", name))),
        }
    }

    /// True for the Darwin family (apple-gas, apple-clang, llvm_gcc).
    pub fn is_apple(self) -> bool {
        matches!(
            self,
            Dialect::AppleGas | Dialect::AppleClang | Dialect::LlvmGcc
        )
    }

    /// Feature switches for this dialect.
    pub fn features(self) -> &'static DialectFeatures {
        match self {
            Dialect::Gas => &GAS,
            Dialect::AppleGas => &APPLE_GAS,
            Dialect::Clang => &CLANG,
            Dialect::AppleClang => &APPLE_CLANG,
            Dialect::LlvmGcc => &LLVM_GCC,
            Dialect::Armasm => &ARMASM,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_names() {
        assert_eq!(Dialect::from_name("gas").unwrap(), Dialect::Gas);
        assert_eq!(Dialect::from_name("apple-gas").unwrap(), Dialect::AppleGas);
        assert_eq!(Dialect::from_name("llvm_gcc").unwrap(), Dialect::LlvmGcc);
        assert_eq!(Dialect::from_name("armasm64").unwrap(), Dialect::Armasm);
        assert!(Dialect::from_name("masm").is_err());
    }

    #[test]
    fn test_apple_family() {
        assert!(Dialect::AppleGas.is_apple());
        assert!(Dialect::LlvmGcc.is_apple());
        assert!(!Dialect::Clang.is_apple());
        assert!(!Dialect::Armasm.is_apple());
    }

    #[test]
    fn test_feature_table_consistency() {
        // Every apple dialect strips .L labels and tracks thumb functions
        for d in [Dialect::AppleGas, Dialect::AppleClang, Dialect::LlvmGcc] {
            assert!(d.features().strip_local_label_dot);
            assert!(d.features().thumb_func_tracking);
        }
        // armasm strips .L but handles thumb marking natively
        assert!(Dialect::Armasm.features().strip_local_label_dot);
        assert!(!Dialect::Armasm.features().thumb_func_tracking);
    }
}
