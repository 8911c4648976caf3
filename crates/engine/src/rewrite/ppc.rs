//! PowerPC rewrites for Apple's assembler: relocation operators and
//! special-purpose register mnemonics.

use super::Rewriter;
use crate::re;

/// SPRs addressed by mnemonic in gas but only by number on the Apple side.
fn spr_number(name: &str) -> Option<u32> {
    match name {
        "ctr" => Some(9),
        "vrsave" => Some(256),
        _ => None,
    }
}

impl Rewriter<'_> {
    pub(super) fn apply_ppc(&mut self, line: &mut String) {
        // sym@ha / sym@l -> ha16(sym) / lo16(sym)
        let ha = re!(r"([\w.]+)@ha\b").replace_all(line, "ha16($1)");
        let lo = re!(r"([\w.]+)@l\b").replace_all(&ha, "lo16($1)");
        if lo != *line {
            *line = lo.into_owned();
        }

        if let Some(caps) = re!(r"^(\s*)mt(\w+)\s+(\S+)\s*$").captures(line)
            && let Some(num) = spr_number(&caps[2])
        {
            *line = format!("{}mtspr {}, {}", &caps[1], num, &caps[3]);
            return;
        }
        if let Some(caps) = re!(r"^(\s*)mf(\w+)\s+(\S+)\s*$").captures(line)
            && let Some(num) = spr_number(&caps[2])
        {
            *line = format!("{}mfspr {}, {}", &caps[1], &caps[3], num);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Rewriter;
    use crate::state::EngineState;
    use crate::{Arch, Dialect, EngineConfig};

    fn rewrite(line: &str) -> Vec<String> {
        let config = EngineConfig::new(Arch::PowerPc, Dialect::AppleGas);
        let mut state = EngineState::new();
        Rewriter {
            config: &config,
            state: &mut state,
        }
        .rewrite(line)
        .unwrap()
    }

    #[test]
    fn test_relocation_operators() {
        assert_eq!(
            rewrite("  lis r3, table@ha"),
            vec!["  lis r3, ha16(table)"]
        );
        assert_eq!(
            rewrite("  addi r3, r3, table@l"),
            vec!["  addi r3, r3, lo16(table)"]
        );
    }

    #[test]
    fn test_spr_moves() {
        assert_eq!(rewrite("  mtctr r12"), vec!["  mtspr 9, r12"]);
        assert_eq!(rewrite("  mfvrsave r0"), vec!["  mfspr r0, 256"]);
        // Unknown SPR mnemonics are left for the assembler
        assert_eq!(rewrite("  mtlr r0"), vec!["  mtlr r0"]);
    }
}
