//! Rewrites applied when thumb encoding is forced on code written for ARM
//! mode. Thumb-1 lacks several addressing forms, so some instructions are
//! split into two.

use super::Rewriter;
use crate::re;

impl Rewriter<'_> {
    /// Apply the thumb-forcing shims. Returns true when the replacement was
    /// pushed to `out` (multi-line rewrites); single-line fixes edit `line`
    /// in place and return false.
    pub(super) fn apply_force_thumb(&mut self, line: &mut String, out: &mut Vec<String>) -> bool {
        if line.trim() == ".arm" {
            *line = line.replace(".arm", ".thumb");
            return false;
        }

        if let Some(caps) = re!(r"^(\s*)mov\s+pc\s*,\s*lr\s*$").captures(line) {
            *line = format!("{}bx lr", &caps[1]);
            return false;
        }

        // Post-indexed register offset: ldr Rd, [Rn], Rm
        if let Some(caps) =
            re!(r"^(\s*)(ldr|str)\s+(\w+)\s*,\s*\[(\w+)\]\s*,\s*(\w+)\s*$").captures(line)
        {
            out.push(format!("{}{} {}, [{}]", &caps[1], &caps[2], &caps[3], &caps[4]));
            out.push(format!("{}add {}, {}, {}", &caps[1], &caps[4], &caps[4], &caps[5]));
            return true;
        }

        // Single-register push/pop
        if let Some(caps) = re!(r"^(\s*)stmdb\s+sp!\s*,\s*\{(\w+)\}\s*$").captures(line) {
            *line = format!("{}str {}, [sp, #-4]!", &caps[1], &caps[2]);
            return false;
        }
        if let Some(caps) = re!(r"^(\s*)ldmia\s+sp!\s*,\s*\{(\w+)\}\s*$").captures(line) {
            *line = format!("{}ldr {}, [sp], #4", &caps[1], &caps[2]);
            return false;
        }

        // Thumb muls only takes two registers; split out the flag setting
        if let Some(caps) =
            re!(r"^(\s*)muls\s+(\w+)\s*,\s*(\w+)\s*,\s*(\w+)\s*$").captures(line)
        {
            out.push(format!("{}mul {}, {}, {}", &caps[1], &caps[2], &caps[3], &caps[4]));
            out.push(format!("{}cmp {}, #0", &caps[1], &caps[2]));
            return true;
        }

        // and with sp as the first operand is not encodable
        if let Some(caps) = re!(r"^(\s*)and\s+(\w+)\s*,\s*sp\s*,\s*(#\w+)\s*$").captures(line) {
            out.push(format!("{}mov {}, sp", &caps[1], &caps[2]));
            out.push(format!("{}and {}, {}, {}", &caps[1], &caps[2], &caps[2], &caps[3]));
            return true;
        }

        // Same-register scaled index beyond the thumb shift range
        if let Some(caps) =
            re!(r"^(\s*)ldr\s+(\w+)\s*,\s*\[(\w+)\s*,\s*(\w+)\s*,\s*lsl\s*#(\d+)\]\s*$")
                .captures(line)
            && caps[2] == caps[3]
            && caps[5].parse::<u32>().map_or(false, |n| n > 3)
        {
            out.push(format!(
                "{}add {}, {}, {}, lsl #{}",
                &caps[1], &caps[2], &caps[2], &caps[4], &caps[5]
            ));
            out.push(format!("{}ldr {}, [{}]", &caps[1], &caps[2], &caps[2]));
            return true;
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::super::Rewriter;
    use crate::state::EngineState;
    use crate::{Arch, Dialect, EngineConfig};

    fn rewrite(line: &str) -> Vec<String> {
        let config = EngineConfig::new(Arch::Arm, Dialect::AppleGas).with_force_thumb(true);
        let mut state = EngineState::new();
        Rewriter {
            config: &config,
            state: &mut state,
        }
        .rewrite(line)
        .unwrap()
    }

    #[test]
    fn test_mov_pc_lr() {
        assert_eq!(rewrite("  mov pc, lr"), vec!["  bx lr"]);
    }

    #[test]
    fn test_post_indexed_load() {
        assert_eq!(
            rewrite("  ldr r0, [r1], r2"),
            vec!["  ldr r0, [r1]", "  add r1, r1, r2"]
        );
    }

    #[test]
    fn test_single_register_push_pop() {
        assert_eq!(rewrite("  stmdb sp!, {r4}"), vec!["  str r4, [sp, #-4]!"]);
        assert_eq!(rewrite("  ldmia sp!, {r4}"), vec!["  ldr r4, [sp], #4"]);
    }

    #[test]
    fn test_muls_split() {
        assert_eq!(
            rewrite("  muls r0, r1, r2"),
            vec!["  mul r0, r1, r2", "  cmp r0, #0"]
        );
    }

    #[test]
    fn test_and_with_sp() {
        assert_eq!(
            rewrite("  and r2, sp, #7"),
            vec!["  mov r2, sp", "  and r2, r2, #7"]
        );
    }

    #[test]
    fn test_scaled_index_same_register() {
        assert_eq!(
            rewrite("  ldr r0, [r0, r1, lsl #4]"),
            vec!["  add r0, r0, r1, lsl #4", "  ldr r0, [r0]"]
        );
        // Shift within range: unchanged
        assert_eq!(
            rewrite("  ldr r0, [r0, r1, lsl #2]"),
            vec!["  ldr r0, [r0, r1, lsl #2]"]
        );
    }

    #[test]
    fn test_arm_directive_becomes_thumb() {
        assert_eq!(rewrite(".arm"), vec![".thumb"]);
    }
}
