//! AArch64 rewrites: `.req` alias resolution and instruction shims.

use super::Rewriter;
use crate::error::EngineError;
use crate::re;
use crate::replace_word;
use crate::{expr, Arch, Dialect};

/// Resolution is iterative (aliases may chain); anything deeper is a cycle.
const MAX_ALIAS_DEPTH: usize = 32;

impl Rewriter<'_> {
    fn resolves_aliases(&self) -> bool {
        self.config.arch == Arch::Aarch64 || self.config.dialect == Dialect::Armasm
    }

    /// Record or remove `.req` aliases. Returns true when the line was
    /// consumed (the downstream assembler never sees the directive).
    pub(super) fn handle_req_alias(
        &mut self,
        line: &str,
        out: &mut Vec<String>,
    ) -> Result<bool, EngineError> {
        if self.resolves_aliases() {
            if let Some(caps) = re!(r"^\s*(\w+)\s+\.req\s+(\w+)\s*$").captures(line) {
                self.state
                    .req_aliases
                    .insert(caps[1].to_string(), caps[2].to_string());
                return Ok(true);
            }
            if let Some(caps) = re!(r"^\s*\.unreq\s+(\w+)\s*$").captures(line) {
                self.state.req_aliases.remove(&caps[1]);
                return Ok(true);
            }
            return Ok(false);
        }

        // Old Darwin gas records `.req` aliases in both cases; remove both
        if self.config.fix_unreq
            && let Some(caps) = re!(r"^(\s*)\.unreq\s+(\w+)\s*$").captures(line)
        {
            out.push(format!("{}.unreq {}", &caps[1], caps[2].to_lowercase()));
            out.push(format!("{}.unreq {}", &caps[1], caps[2].to_uppercase()));
            return Ok(true);
        }
        Ok(false)
    }

    /// Substitute `.req` aliases to their fixed point.
    pub(super) fn resolve_req_aliases(&mut self, line: &mut String) -> Result<(), EngineError> {
        if !self.resolves_aliases() || self.state.req_aliases.is_empty() {
            return Ok(());
        }
        for _ in 0..MAX_ALIAS_DEPTH {
            let mut changed = false;
            for (alias, register) in &self.state.req_aliases {
                let replaced = replace_word(line, alias, register);
                if replaced != *line {
                    *line = replaced;
                    changed = true;
                }
            }
            if !changed {
                return Ok(());
            }
        }
        Err(EngineError::Directive(format!(
            "circular .req alias chain in '{}'",
            line.trim()
        )))
    }

    /// Syntax fixes for AArch64 assemblers that predate common gas forms.
    pub(super) fn apply_aarch64_shims(&mut self, line: &mut String) {
        // The Xcode 5 assembler (and armasm64) lack several aliases
        if self.config.fix_xcode5 || self.config.dialect == Dialect::Armasm {
            let orr = re!(r"^(\s*)mov(\s+v\d+\.(?:\d+)?[bhsd]\s*,\s*)(v\d+\.(?:\d+)?[bhsd])\s*$");
            if let Some(caps) = orr.captures(line) {
                *line = format!("{}orr{}{}, {}", &caps[1], &caps[2], &caps[3], &caps[3]);
            }
            let movi = re!(r"^(\s*movi\s+v\d+\.(?:2h|4h|8h|2s|4s)\s*,\s*#[^,]+?)\s*$");
            if let Some(caps) = movi.captures(line) {
                *line = format!("{}, lsl #0", &caps[1]);
            }
            let xtl = re!(r"^(\s*)([us])xtl(2?)\s+(v\d+\.\w+)\s*,\s*(v\d+\.\w+)\s*$");
            if let Some(caps) = xtl.captures(line) {
                *line = format!(
                    "{}{}shll{} {}, {}, #0",
                    &caps[1], &caps[2], &caps[3], &caps[4], &caps[5]
                );
            }
        }

        // Wide page-offset immediates must be shifted explicitly
        if self.config.dialect.features().split_wide_add_imm {
            let add = re!(r"^(\s*)(adds?|subs?)\s+([wx]\d+|sp)\s*,\s*([wx]\d+|sp)\s*,\s*#([0-9][\w]*)\s*$");
            if let Some(caps) = add.captures(line)
                && let Some(imm) = expr::parse_int(&caps[5])
                && imm > 4095
                && imm % 4096 == 0
            {
                *line = format!(
                    "{}{} {}, {}, #{}, lsl #12",
                    &caps[1],
                    &caps[2],
                    &caps[3],
                    &caps[4],
                    imm >> 12
                );
            }
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
    fn test_req_alias_resolution() {
        let config = EngineConfig::new(Arch::Aarch64, Dialect::Clang);
        let mut state = EngineState::new();
        assert!(rewrite(&config, &mut state, "width .req x3").is_empty());
        assert!(rewrite(&config, &mut state, "w .req width").is_empty());
        assert_eq!(
            rewrite(&config, &mut state, "  add x0, x0, w"),
            vec!["  add x0, x0, x3"]
        );
        assert!(rewrite(&config, &mut state, ".unreq w").is_empty());
        assert_eq!(
            rewrite(&config, &mut state, "  add x0, x0, w"),
            vec!["  add x0, x0, w"]
        );
    }

    #[test]
    fn test_circular_alias_is_fatal() {
        let config = EngineConfig::new(Arch::Aarch64, Dialect::Clang);
        let mut state = EngineState::new();
        rewrite(&config, &mut state, "a .req b");
        rewrite(&config, &mut state, "b .req a");
        let mut rewriter = Rewriter {
            config: &config,
            state: &mut state,
        };
        assert!(rewriter.rewrite("mov a, #0").is_err());
    }

    #[test]
    fn test_unreq_dual_case() {
        let config =
            EngineConfig::new(Arch::Arm, Dialect::AppleGas).with_fix_unreq(true);
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  .unreq Width"),
            vec!["  .unreq width", "  .unreq WIDTH"]
        );
    }

    #[test]
    fn test_xcode5_vector_mov() {
        let config =
            EngineConfig::new(Arch::Aarch64, Dialect::AppleClang).with_fix_xcode5(true);
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  mov v0.16b, v1.16b"),
            vec!["  orr v0.16b, v1.16b, v1.16b"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  movi v4.4s, #0"),
            vec!["  movi v4.4s, #0, lsl #0"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  uxtl2 v2.8h, v3.16b"),
            vec!["  ushll2 v2.8h, v3.16b, #0"]
        );
    }

    #[test]
    fn test_wide_add_imm_split() {
        let config = EngineConfig::new(Arch::Aarch64, Dialect::Clang);
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  add x0, x1, #0x2000"),
            vec!["  add x0, x1, #2, lsl #12"]
        );
        // Not a multiple of 4096: left alone
        assert_eq!(
            rewrite(&config, &mut state, "  add x0, x1, #0x2001"),
            vec!["  add x0, x1, #0x2001"]
        );
    }
}
