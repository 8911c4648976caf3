//! ARM-specific rewrites: NEON register aliases and thumb wide immediates.

use super::Rewriter;
use crate::re;
use crate::replace_word;
use crate::state::NeonAlias;
use crate::{expr, Arch};

impl Rewriter<'_> {
    /// Record a `NAME .dn/.qn REG[.TYPE][INDEX]` alias. Returns true when
    /// the line was a declaration (which is consumed).
    pub(super) fn handle_neon_alias(&mut self, line: &str) -> bool {
        let caps = match re!(r"^\s*(\w+)\s+\.[dq]n\s+(\S+)\s*$").captures(line) {
            Some(caps) => caps,
            None => return false,
        };
        let name = caps[1].to_string();
        let operand = &caps[2];

        // d0.8b[1] -> register d0[1], datatype 8b
        let (register, datatype) = match operand.split_once('.') {
            Some((reg, tail)) => match tail.find('[') {
                Some(idx) => (
                    format!("{}{}", reg, &tail[idx..]),
                    Some(tail[..idx].to_string()),
                ),
                None => (reg.to_string(), Some(tail.to_string())),
            },
            None => (operand.to_string(), None),
        };
        self.state.neon_aliases.push(NeonAlias {
            name,
            register,
            datatype,
        });
        true
    }

    /// Substitute NEON aliases into a `v`-prefixed instruction line. The
    /// first substituted alias also types the mnemonic.
    pub(super) fn apply_neon_aliases(&mut self, line: &mut String) {
        if self.state.neon_aliases.is_empty() {
            return;
        }
        let mnemonic = match crate::first_token(line) {
            Some(tok) if tok.starts_with('v') => tok.to_string(),
            _ => return,
        };
        let mut typed = mnemonic.contains('.');
        for alias in &self.state.neon_aliases {
            let replaced = replace_word(line, &alias.name, &alias.register);
            if replaced == *line {
                continue;
            }
            *line = replaced;
            if !typed && let Some(datatype) = &alias.datatype {
                // Append the datatype to the mnemonic token
                *line = line.replacen(&mnemonic, &format!("{}.{}", mnemonic, datatype), 1);
                typed = true;
            }
        }
    }

    /// In thumb mode `add` with an immediate above 255 needs the wide
    /// encoding spelled out for old assemblers.
    pub(super) fn widen_thumb_add(&mut self, line: &mut String) {
        if self.config.arch != Arch::Arm || !self.state.thumb {
            return;
        }
        let caps = match re!(r"^(\s*)add(\s.*#\s*([\w]+))\s*$").captures(line) {
            Some(caps) => caps,
            None => return,
        };
        if let Some(imm) = expr::parse_int(&caps[3])
            && imm > 255
        {
            *line = format!("{}add.w{}", &caps[1], &caps[2]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Rewriter;
    use crate::state::EngineState;
    use crate::{Arch, Dialect, EngineConfig};

    fn rewrite(config: &EngineConfig, state: &mut EngineState, line: &str) -> Vec<String> {
        Rewriter { config, state }.rewrite(line).unwrap()
    }

    #[test]
    fn test_dn_alias_substitution() {
        let config = EngineConfig::new(Arch::Arm, Dialect::AppleGas);
        let mut state = EngineState::new();
        assert_eq!(rewrite(&config, &mut state, "mask .dn d0.8b"), Vec::<String>::new());
        assert_eq!(
            rewrite(&config, &mut state, "vand d1, d2, mask"),
            vec!["vand.8b d1, d2, d0"]
        );
    }

    #[test]
    fn test_qn_alias_without_type() {
        let config = EngineConfig::new(Arch::Arm, Dialect::AppleGas);
        let mut state = EngineState::new();
        rewrite(&config, &mut state, "acc .qn q4");
        assert_eq!(
            rewrite(&config, &mut state, "vadd.s16 acc, acc, q0"),
            vec!["vadd.s16 q4, q4, q0"]
        );
    }

    #[test]
    fn test_alias_only_on_vector_instructions() {
        let config = EngineConfig::new(Arch::Arm, Dialect::AppleGas);
        let mut state = EngineState::new();
        rewrite(&config, &mut state, "mask .dn d0.8b");
        assert_eq!(
            rewrite(&config, &mut state, "add r0, mask, r1"),
            vec!["add r0, mask, r1"]
        );
    }

    #[test]
    fn test_thumb_wide_add() {
        let config = EngineConfig::new(Arch::Arm, Dialect::AppleGas);
        let mut state = EngineState::new();
        rewrite(&config, &mut state, ".code 16");
        assert_eq!(
            rewrite(&config, &mut state, "  add r0, r0, #0x3fc"),
            vec!["  add.w r0, r0, #0x3fc"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  add r0, r0, #12"),
            vec!["  add r0, r0, #12"]
        );
    }
}
