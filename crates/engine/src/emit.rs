//! End-of-stream epilogue.

use crate::config::EngineConfig;
use crate::state::EngineState;
use crate::Dialect;

/// Lines appended after the last input line.
///
/// armasm streams declare every referenced-but-undefined symbol and close
/// with `END`; everything else flushes the literal pool and marks thumb
/// call targets for Mach-O.
pub(crate) fn epilogue(config: &EngineConfig, state: &mut EngineState) -> Vec<String> {
    let mut out = Vec::new();

    if config.dialect == Dialect::Armasm {
        for name in state.call_targets.iter().chain(state.import_symbols.iter()) {
            if !state.labels_seen.contains(name) && !seen_in(&out, name) {
                out.push(format!("\tIMPORT {}", name));
            }
        }
        out.push("\tEND".to_string());
        return out;
    }

    if !state.literals.is_empty() {
        out.push(".text".to_string());
        out.push(format!(".align {}", config.arch.pool_align()));
        let word = config.arch.pool_word_directive();
        for (label, expr) in state.literals.drain() {
            out.push(format!("{}:", label));
            out.push(format!("{} {}", word, expr));
        }
    }

    if config.dialect.features().thumb_func_tracking {
        for target in state.call_targets.iter() {
            if state.thumb_labels.contains(target) {
                out.push(format!(".thumb_func {}", target));
            }
        }
    }
    out
}

fn seen_in(lines: &[String], name: &str) -> bool {
    let import = format!("\tIMPORT {}", name);
    lines.iter().any(|l| *l == import)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arch, EngineConfig};

    #[test]
    fn test_armasm_epilogue_imports() {
        let config = EngineConfig::new(Arch::Aarch64, Dialect::Armasm);
        let mut state = EngineState::new();
        state.call_targets.insert("memcpy");
        state.import_symbols.insert("coeff_table");
        state.import_symbols.insert("local_sym");
        state.labels_seen.insert("local_sym".to_string());
        assert_eq!(
            epilogue(&config, &mut state),
            vec!["\tIMPORT memcpy", "\tIMPORT coeff_table", "\tEND"]
        );
    }

    #[test]
    fn test_apple_epilogue_flushes_pool_and_thumb_funcs() {
        let config = EngineConfig::new(Arch::Arm, Dialect::AppleGas);
        let mut state = EngineState::new();
        state.literals.label_for("0x1234");
        state.call_targets.insert("loop_start");
        state.thumb_labels.insert("loop_start".to_string());
        assert_eq!(
            epilogue(&config, &mut state),
            vec![
                ".text",
                ".align 2",
                "Literal_0:",
                ".word 0x1234",
                ".thumb_func loop_start"
            ]
        );
    }

    #[test]
    fn test_empty_epilogue() {
        let config = EngineConfig::new(Arch::Arm, Dialect::Gas);
        let mut state = EngineState::new();
        assert!(epilogue(&config, &mut state).is_empty());
    }
}
