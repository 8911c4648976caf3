//! Rewrites for the Darwin assembler family (apple-gas, apple-clang,
//! llvm_gcc): directive renames, unsupported-directive filtering, and
//! `.thumb_func` bookkeeping for Mach-O thumb interworking.

use super::Rewriter;
use crate::error::EngineError;
use crate::re;
use crate::Dialect;

impl Rewriter<'_> {
    /// Apply the Darwin rules. Returns true when the line was consumed
    /// (pushed to `out` or dropped); extra declarations may be pushed ahead
    /// of the caller's own emission.
    pub(super) fn apply_apple(
        &mut self,
        line: &mut String,
        out: &mut Vec<String>,
    ) -> Result<bool, EngineError> {
        let features = self.config.dialect.features();

        if features.thumb_func_tracking {
            // Labels defined in thumb mode need .thumb_func declarations at
            // their call sites (or in the epilogue)
            if let Some(caps) = re!(r"^\s*([A-Za-z_][\w$]*)\s*:").captures(line) {
                self.state.labels_seen.insert(caps[1].to_string());
                if self.state.thumb {
                    self.state.thumb_labels.insert(caps[1].to_string());
                }
            }

            if let Some(caps) = re!(r"^(\s*)\.func\b\s*(.*)$").captures(line) {
                if self.state.thumb {
                    let name = caps[2].trim();
                    *line = if name.is_empty() {
                        format!("{}.thumb_func", &caps[1])
                    } else {
                        format!("{}.thumb_func {}", &caps[1], name)
                    };
                } else {
                    out.push(self.comment_out(line));
                    return Ok(true);
                }
            }

            if let Some(caps) = re!(r"^\s*\.globa?l\s+([A-Za-z_][\w$]*)\s*$").captures(line) {
                self.note_call_target(&caps[1], out);
            }

            let branch = re!(
                r"^\s*(?:blx|bl|bx|b)(?:eq|ne|cs|hs|cc|lo|mi|pl|vs|vc|hi|ls|ge|lt|gt|le|al)?(?:\.w)?\s+([A-Za-z_][\w$]*)\s*$"
            );
            if let Some(caps) = branch.captures(line) {
                self.note_call_target(&caps[1], out);
            }
        }

        // Directive vocabulary of the Darwin toolchain
        let renamed = re!(r"^(\s*)\.global\b").replace(line, "${1}.globl");
        let renamed = re!(r"^(\s*)\.int\b").replace_all(&renamed, "${1}.long");
        let renamed = re!(r"^(\s*)\.float\b").replace_all(&renamed, "${1}.single");
        if renamed != *line {
            *line = renamed.into_owned();
        }

        if self.config.dialect == Dialect::AppleGas {
            let vmrs = re!(r"\bvmrs\s+APSR_nzcv\b").replace(line, "fmrx r15");
            if vmrs != *line {
                *line = vmrs.into_owned();
            }
        }

        // Directives this assembler rejects outright
        if let Some(token) = crate::first_token(line)
            && features
                .commented_directives
                .iter()
                .any(|d| *d == token)
        {
            out.push(self.comment_out(line));
            return Ok(true);
        }

        Ok(false)
    }

    /// Emit a `.thumb_func` for a known thumb destination, or remember the
    /// name so the epilogue can declare it once defined.
    fn note_call_target(&mut self, target: &str, out: &mut Vec<String>) {
        if super::is_register(target) {
            return;
        }
        if self.state.thumb_labels.contains(target) {
            out.push(format!(".thumb_func {}", target));
        } else {
            self.state.call_targets.insert(target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Rewriter;
    use crate::state::EngineState;
    use crate::{Arch, Dialect, EngineConfig};

    fn rewriter_env() -> (EngineConfig, EngineState) {
        (
            EngineConfig::new(Arch::Arm, Dialect::AppleGas),
            EngineState::new(),
        )
    }

    fn rewrite(config: &EngineConfig, state: &mut EngineState, line: &str) -> Vec<String> {
        Rewriter { config, state }.rewrite(line).unwrap()
    }

    #[test]
    fn test_global_rename() {
        let (config, mut state) = rewriter_env();
        assert_eq!(
            rewrite(&config, &mut state, ".global my_func"),
            vec![".globl my_func"]
        );
    }

    #[test]
    fn test_data_directive_renames() {
        let (config, mut state) = rewriter_env();
        assert_eq!(rewrite(&config, &mut state, "  .int 5"), vec!["  .long 5"]);
        assert_eq!(
            rewrite(&config, &mut state, "  .float 1.5"),
            vec!["  .single 1.5"]
        );
    }

    #[test]
    fn test_unsupported_directives_commented() {
        let (config, mut state) = rewriter_env();
        assert_eq!(
            rewrite(&config, &mut state, ".type my_func, %function"),
            vec!["@ .type my_func, %function"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  .size my_func, .-my_func"),
            vec!["@ .size my_func, .-my_func"]
        );
    }

    #[test]
    fn test_thumb_branch_declares_thumb_func() {
        let (config, mut state) = rewriter_env();
        rewrite(&config, &mut state, ".thumb");
        rewrite(&config, &mut state, "do_loop:");
        assert_eq!(
            rewrite(&config, &mut state, "  bl do_loop"),
            vec![".thumb_func do_loop", "  bl do_loop"]
        );
    }

    #[test]
    fn test_unknown_branch_target_recorded() {
        let (config, mut state) = rewriter_env();
        rewrite(&config, &mut state, ".thumb");
        rewrite(&config, &mut state, "  bl helper");
        assert!(state.call_targets.contains("helper"));
    }

    #[test]
    fn test_bic_not_treated_as_branch() {
        let (config, mut state) = rewriter_env();
        rewrite(&config, &mut state, "  bic r0, r1, #7");
        assert!(!state.call_targets.contains("r0"));
        assert!(!state.call_targets.contains("r1"));
    }

    #[test]
    fn test_func_in_thumb_mode() {
        let (config, mut state) = rewriter_env();
        rewrite(&config, &mut state, ".thumb");
        assert_eq!(
            rewrite(&config, &mut state, ".func start"),
            vec![".thumb_func start"]
        );
    }

    #[test]
    fn test_func_in_arm_mode_commented() {
        let (config, mut state) = rewriter_env();
        assert_eq!(
            rewrite(&config, &mut state, ".func start"),
            vec!["@ .func start"]
        );
    }

    #[test]
    fn test_vmrs_shim() {
        let (config, mut state) = rewriter_env();
        assert_eq!(
            rewrite(&config, &mut state, "  vmrs APSR_nzcv, fpscr"),
            vec!["  fmrx r15, fpscr"]
        );
    }
}
