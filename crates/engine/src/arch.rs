//! Target architecture tags.
//!
//! The architecture decides the input comment syntax, the word size used by
//! the literal pool, and which rewrite-rule families are active.

use crate::error::EngineError;

/// Canonical target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Arm,
    Aarch64,
    PowerPc,
}

impl Arch {
    /// Canonicalize an architecture name.
    ///
    /// Accepts the aliases a compiler driver passes with `-arch`:
    /// `armv7`/`armv7s`/`arm`, `arm64`/`arm64e`/`aarch64`, `ppc`/`powerpc`
    /// and their 64-bit variants.
    pub fn from_name(name: &str) -> Result<Arch, EngineError> {
        let name = name.to_ascii_lowercase();
        // arm64 must be checked before the arm prefix
        if name.starts_with("arm64") || name.starts_with("aarch64") {
            Ok(Arch::Aarch64)
        } else if name.starts_with("arm") {
            Ok(Arch::Arm)
        } else if name.starts_with("ppc") || name.starts_with("powerpc") {
            Ok(Arch::PowerPc)
        } else {
            Err(EngineError::Config(format!(
                "unknown architecture '{}'",
                name
            )))
        }
    }

    /// The comment introducer recognized in input for this architecture.
    pub fn comment_str(self) -> &'static str {
        match self {
            Arch::Arm => "@",
            Arch::Aarch64 => "//",
            Arch::PowerPc => "#",
        }
    }

    /// Data directive used when flushing literal-pool entries.
    pub fn pool_word_directive(self) -> &'static str {
        match self {
            Arch::Aarch64 => ".quad",
            Arch::Arm | Arch::PowerPc => ".word",
        }
    }

    /// Power-of-two alignment emitted before a literal-pool flush.
    pub fn pool_align(self) -> u32 {
        match self {
            Arch::Aarch64 => 3,
            Arch::Arm | Arch::PowerPc => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_aliases() {
        assert_eq!(Arch::from_name("armv7").unwrap(), Arch::Arm);
        assert_eq!(Arch::from_name("arm").unwrap(), Arch::Arm);
        assert_eq!(Arch::from_name("arm64").unwrap(), Arch::Aarch64);
        assert_eq!(Arch::from_name("arm64e").unwrap(), Arch::Aarch64);
        assert_eq!(Arch::from_name("aarch64").unwrap(), Arch::Aarch64);
        assert_eq!(Arch::from_name("ppc64").unwrap(), Arch::PowerPc);
        assert_eq!(Arch::from_name("powerpc").unwrap(), Arch::PowerPc);
        assert!(Arch::from_name("riscv64").is_err());
    }

    #[test]
    fn test_comment_syntax() {
        assert_eq!(Arch::Arm.comment_str(), "@");
        assert_eq!(Arch::Aarch64.comment_str(), "//");
        assert_eq!(Arch::PowerPc.comment_str(), "#");
    }
}
