//! Translation to Microsoft armasm/armasm64 syntax.
//!
//! This is the largest rule family: armasm uses a different directive
//! vocabulary, cannot parse gas local numeric labels, requires labels and
//! instructions in separate columns, and several released versions need
//! bug-compatibility shims (gated by the `armasm64_*` config switches).

use super::{is_register, Rewriter};
use crate::error::EngineError;
use crate::re;
use crate::replace_word;
use crate::Arch;

impl Rewriter<'_> {
    pub(super) fn apply_armasm(
        &mut self,
        line: String,
        out: &mut Vec<String>,
    ) -> Result<(), EngineError> {
        let mut line = line;

        // armasm inserts IT blocks implicitly
        if self.config.arch == Arch::Arm && re!(r"^\s*it[te]{0,3}\s").is_match(&line) {
            return Ok(());
        }
        if self.config.armasm64_skip_prfum && re!(r"^\s*prfum\b").is_match(&line) {
            return Ok(());
        }

        self.substitute_symbols(&mut line);

        if self.split_labels(&mut line, out)? {
            return Ok(());
        }

        if self.translate_armasm_directive(&mut line, out)? {
            return Ok(());
        }

        if self.config.arch == Arch::Arm && self.apply_armasm32(&mut line, out)? {
            return Ok(());
        }
        if self.config.arch == Arch::Aarch64 && self.apply_armasm64(&mut line, out)? {
            return Ok(());
        }

        self.resolve_branch_locals(&mut line)?;
        self.fold_armasm_expressions(&mut line);

        // gas alignment hints inside addressing: [x0, :128] -> [x0@128]
        let aligned = re!(r"\[([^\[\],]+),\s*:(\d+)\]").replace_all(&line, "[$1@$2]");
        if aligned != line {
            line = aligned.into_owned();
        }

        // armasm reads &0x as a malformed hex literal
        if line.contains("&0x") {
            line = line.replace("&0x", "& 0x");
        }

        self.push_indented(line, out);
        Ok(())
    }

    /// armasm has no `.set`; substitute known symbol values textually.
    fn substitute_symbols(&mut self, line: &mut String) {
        if self.state.symbols.is_empty() {
            return;
        }
        let mut entries: Vec<(&String, &i64)> = self.state.symbols.iter().collect();
        entries.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
        for (name, value) in entries {
            let replaced = replace_word(line, name, &value.to_string());
            if replaced != *line {
                *line = replaced;
            }
        }
    }

    /// Peel labels off the front of the line onto their own output lines.
    /// Numeric labels are replaced by synthesized names. Returns true when
    /// the whole line was consumed.
    fn split_labels(
        &mut self,
        line: &mut String,
        out: &mut Vec<String>,
    ) -> Result<bool, EngineError> {
        loop {
            if let Some(caps) = re!(r"^\s*(\d+)\s*:\s*(.*)$").captures(line) {
                let num = caps[1].to_string();
                let rest = caps[2].to_string();
                let pending = self
                    .state
                    .local_labels
                    .entry(num.clone())
                    .or_default()
                    .pending_forward
                    .take();
                if let Some(pending) = pending {
                    out.push(format!("{}:", pending));
                }
                let fresh = self.state.next_temp_label();
                self.state
                    .local_labels
                    .get_mut(&num)
                    .expect("entry created above")
                    .last = Some(fresh.clone());
                out.push(format!("{}:", fresh));
                *line = rest;
                continue;
            }
            if let Some(caps) = re!(r"^\s*([A-Za-z_.][\w.$]*)\s*:\s*(.*)$").captures(line) {
                let name = caps[1].to_string();
                let rest = caps[2].to_string();
                self.state.labels_seen.insert(name.clone());
                out.push(format!("{}:", name));
                *line = rest;
                continue;
            }
            break;
        }
        Ok(line.trim().is_empty())
    }

    /// Directive vocabulary translation. Returns true when consumed.
    fn translate_armasm_directive(
        &mut self,
        line: &mut String,
        out: &mut Vec<String>,
    ) -> Result<bool, EngineError> {
        let trimmed = line.trim().to_string();

        if let Some(caps) = re!(r"^\.func\s+([\w.$]+)").captures(&trimmed) {
            self.state.labels_seen.insert(caps[1].to_string());
            out.push(format!("{} PROC", &caps[1]));
            return Ok(true);
        }
        if trimmed == ".endfunc" {
            out.push("\tENDP".to_string());
            return Ok(true);
        }
        if trimmed == ".thumb" || re!(r"^\.code\s+16\b").is_match(&trimmed) {
            out.push("\tTHUMB".to_string());
            return Ok(true);
        }
        if trimmed == ".arm" || re!(r"^\.code\s+32\b").is_match(&trimmed) {
            out.push("\tARM".to_string());
            return Ok(true);
        }
        if trimmed == ".ltorg" {
            out.push("\tLTORG".to_string());
            return Ok(true);
        }
        if let Some(caps) = re!(r"^\.globa?l\s+([\w.$]+)\s*$").captures(&trimmed) {
            out.push(format!("\tEXPORT {}", &caps[1]));
            return Ok(true);
        }
        if let Some(caps) = re!(r"^\.extern\s+([\w.$]+)\s*$").captures(&trimmed) {
            self.state.labels_seen.insert(caps[1].to_string());
            out.push(format!("\tIMPORT {}", &caps[1]));
            return Ok(true);
        }
        if let Some(caps) = re!(r"^\.(?:p2)?align\s+(\w+)").captures(&trimmed) {
            let exponent = crate::expr::eval(&caps[1], &self.state.symbols)?;
            out.push(format!("\tALIGN {}", 1i64 << exponent.clamp(0, 31)));
            return Ok(true);
        }

        if let Some(token) = crate::first_token(&trimmed)
            && self
                .config
                .dialect
                .features()
                .commented_directives
                .contains(&token)
        {
            out.push(self.comment_out(line));
            return Ok(true);
        }

        // Data directives, with local-label references resolved
        if let Some(caps) =
            re!(r"^(\s*)\.(word|long|int|short|hword|byte|ascii|asciz|quad|xword|dword|float)\s+(.*)$")
                .captures(line)
        {
            let ws = caps[1].to_string();
            let directive = caps[2].to_string();
            let args = self.resolve_local_refs(&caps[3])?;
            let translated = match directive.as_str() {
                "word" | "long" | "int" => format!("{}dcd {}", ws, args),
                "short" | "hword" => format!("{}dcw {}", ws, args),
                "byte" | "ascii" => format!("{}dcb {}", ws, args),
                "asciz" => format!("{}dcb {},0", ws, args),
                "quad" | "xword" | "dword" => format!("{}dcq {}", ws, args),
                _ => format!("{}dcfs {}", ws, args),
            };
            self.push_indented(translated, out);
            return Ok(true);
        }

        Ok(false)
    }

    /// armasm32-only instruction fixes. Returns true when consumed.
    fn apply_armasm32(
        &mut self,
        line: &mut String,
        out: &mut Vec<String>,
    ) -> Result<bool, EngineError> {
        // movw/movt #:lower16:/#:upper16: pairs collapse into mov32
        if let Some(caps) =
            re!(r"^\s*movw\s+(\w+)\s*,\s*#:lower16:([\w.$]+)\s*$").captures(line)
        {
            self.state.pending_mov32 = Some((caps[1].to_string(), caps[2].to_string()));
            return Ok(true);
        }
        if let Some(caps) =
            re!(r"^\s*movt\s+(\w+)\s*,\s*#:upper16:([\w.$]+)\s*$").captures(line)
        {
            if let Some((register, symbol)) = self.state.pending_mov32.take()
                && register == caps[1]
                && symbol == caps[2]
            {
                self.state.import_symbols.insert(&symbol);
                out.push(format!("\tmov32 {}, {}", register, symbol));
                return Ok(true);
            }
            return Ok(false);
        }

        // armasm cannot parse untyped scalar VFP forms
        if let Some(caps) = re!(r"^(\s*)(vmov|vadd)(\s+.*)$").captures(line)
            && re!(r"\bs\d+\b").is_match(&caps[3])
        {
            *line = format!("{}{}.f32{}", &caps[1], &caps[2], &caps[3]);
        }
        Ok(false)
    }

    /// armasm64-only instruction fixes. Returns true when consumed.
    fn apply_armasm64(
        &mut self,
        line: &mut String,
        out: &mut Vec<String>,
    ) -> Result<bool, EngineError> {
        // b.cond -> bcond before any branch handling
        let bcond = re!(r"^(\s*)b\.(\w+)\b").replace(line, "${1}b$2");
        if bcond != *line {
            *line = bcond.into_owned();
        }

        let ext = re!(r"^(\s*)ext(\s)").replace(line, "${1}ext8$2");
        if ext != *line {
            *line = ext.into_owned();
        }

        // adrp: strip the page offset; the matching add re-applies it
        if let Some(caps) =
            re!(r"^(\s*)adrp\s+(\w+)\s*,\s*#?(?::pg_hi21:)?([A-Za-z_.][\w.$]*)(\+\d+)?\s*$")
                .captures(line)
        {
            self.state.import_symbols.insert(&caps[3]);
            *line = format!("{}adrp {}, {}", &caps[1], &caps[2], &caps[3]);
            return Ok(false);
        }
        if let Some(caps) =
            re!(r"^(\s*)add\s+(\w+)\s*,\s*(\w+)\s*,\s*#?:lo12:([A-Za-z_.][\w.$]*)(?:\+(\d+))?\s*$")
                .captures(line)
        {
            self.state.import_symbols.insert(&caps[4]);
            out.push(format!("{}add {}, {}, {}", &caps[1], &caps[2], &caps[3], &caps[4]));
            if let Some(offset) = caps.get(5)
                && offset.as_str() != "0"
            {
                out.push(format!(
                    "{}add {}, {}, #{}",
                    &caps[1],
                    &caps[2],
                    &caps[2],
                    offset.as_str()
                ));
            }
            return Ok(true);
        }

        // ldr Xd, =sym records the import; armasm handles the pool itself
        if let Some(caps) =
            re!(r"^(\s*)ldr\s+(\w+)\s*,\s*=([A-Za-z_.][\w.$]*)(?:([+-])(\w+))?\s*$")
                .captures(line)
        {
            self.state.import_symbols.insert(&caps[3]);
            if self.config.armasm64_skip_neg_offset
                && caps.get(4).map(|m| m.as_str()) == Some("-")
            {
                out.push(format!("{}ldr {}, ={}", &caps[1], &caps[2], &caps[3]));
                out.push(format!(
                    "{}sub {}, {}, #{}",
                    &caps[1],
                    &caps[2],
                    &caps[2],
                    &caps[5]
                ));
                return Ok(true);
            }
            return Ok(false);
        }

        // tbz/tbnz only accept x registers
        let tb = re!(r"^(\s*tbn?z\s+)w(\d+)").replace(line, "${1}x$2");
        if tb != *line {
            *line = tb.into_owned();
        }

        // Trailing extend operators need an explicit shift
        let extend = re!(r"(,\s*[us]xt[wbh])\s*$").replace(line, "$1 #0");
        if extend != *line {
            *line = extend.into_owned();
        }

        let umov = re!(r"^(\s*)mov(\s+[wx]\d+\s*,\s*v\d+\.)").replace(line, "${1}umov$2");
        if umov != *line {
            *line = umov.into_owned();
        }

        // Fuse trailing condition operands into the mnemonic
        if let Some(caps) = re!(
            r"^(\s*)(ccmp|csel|cinc|cset)\s+(.+?)\s*,\s*(eq|ne|cs|hs|cc|lo|mi|pl|vs|vc|hi|ls|ge|lt|gt|le|al)\s*$"
        )
        .captures(line)
        {
            *line = format!(
                "{}{}{} {}",
                &caps[1],
                &caps[2],
                caps[4].to_uppercase(),
                &caps[3]
            );
        }

        // Negative unscaled offsets need the ldur/stur forms
        if let Some(caps) =
            re!(r"^(\s*)(ldr|str)([bh]?)\s+(\w+)\s*,\s*(\[\w+,\s*#-\d+\])\s*$").captures(line)
        {
            let unscaled = match (&caps[2], &caps[3]) {
                ("ldr", suffix) => format!("ldur{}", suffix),
                (_, suffix) => format!("stur{}", suffix),
            };
            *line = format!("{}{} {}, {}", &caps[1], unscaled, &caps[4], &caps[5]);
        }

        if self.config.armasm64_invert_scale
            && let Some(caps) =
                re!(r"^(\s*)(fcvtzs|scvtf)\s+(.+)\s*,\s*#(\d+)\s*$").captures(line)
            && let Ok(scale) = caps[4].parse::<i64>()
        {
            *line = format!("{}{} {}, #{}", &caps[1], &caps[2], &caps[3], 64 - scale);
        }

        // Register ranges become explicit lists
        let ranged = re!(r"\{\s*v(\d+)\.(\w+)\s*-\s*v(\d+)\.\w+\s*\}").replace_all(
            line,
            |caps: &regex::Captures<'_>| {
                let first: u32 = caps[1].parse().unwrap_or(0);
                let last: u32 = caps[3].parse().unwrap_or(first);
                let lanes = &caps[2];
                let regs: Vec<String> = (first..=last.max(first))
                    .map(|n| format!("v{}.{}", n, lanes))
                    .collect();
                format!("{{{}}}", regs.join(","))
            },
        );
        if ranged != *line {
            *line = ranged.into_owned();
        }

        Ok(false)
    }

    /// Rewrite `Nb`/`Nf` operands of branches and `adr`, and record
    /// non-local branch targets for the epilogue's IMPORT list.
    fn resolve_branch_locals(&mut self, line: &mut String) -> Result<(), EngineError> {
        let branch = re!(
            r"^(\s*)((?:blx|bl|bx|b)(?:eq|ne|cs|hs|cc|lo|mi|pl|vs|vc|hi|ls|ge|lt|gt|le|al)?(?:\.w)?)\s+(\S+)\s*$"
        );
        if let Some(caps) = branch.captures(line) {
            let target = caps[3].to_string();
            if let Some(resolved) = self.resolve_local_operand(&target)? {
                *line = format!("{}{} {}", &caps[1], &caps[2], resolved);
            } else if !is_register(&target) && re!(r"^[A-Za-z_.][\w.$]*$").is_match(&target) {
                self.state.call_targets.insert(&target);
            }
            return Ok(());
        }

        if let Some(caps) =
            re!(r"^(\s*)(cbn?z\s+\w+\s*,\s*)(\S+)\s*$").captures(line)
        {
            let target = caps[3].to_string();
            if let Some(resolved) = self.resolve_local_operand(&target)? {
                *line = format!("{}{}{}", &caps[1], &caps[2], resolved);
            } else if !is_register(&target) && re!(r"^[A-Za-z_.][\w.$]*$").is_match(&target) {
                self.state.call_targets.insert(&target);
            }
            return Ok(());
        }

        if let Some(caps) =
            re!(r"^(\s*)(tbn?z\s+\w+\s*,\s*#?\w+\s*,\s*)(\S+)\s*$").captures(line)
        {
            let target = caps[3].to_string();
            if let Some(resolved) = self.resolve_local_operand(&target)? {
                *line = format!("{}{}{}", &caps[1], &caps[2], resolved);
            } else if !is_register(&target) && re!(r"^[A-Za-z_.][\w.$]*$").is_match(&target) {
                self.state.call_targets.insert(&target);
            }
            return Ok(());
        }

        if let Some(caps) = re!(r"^(\s*)(adr\w*\s+\w+\s*,\s*)(\d+[bf])\s*$").captures(line)
            && let Some(resolved) = self.resolve_local_operand(&caps[3])?
        {
            *line = format!("{}{}{}", &caps[1], &caps[2], resolved);
        }
        Ok(())
    }

    /// Resolve a single `Nb`/`Nf` operand, if it is one.
    fn resolve_local_operand(&mut self, operand: &str) -> Result<Option<String>, EngineError> {
        let caps = match re!(r"^(\d+)([bf])$").captures(operand) {
            Some(caps) => caps,
            None => return Ok(None),
        };
        let num = caps[1].to_string();
        Ok(Some(self.resolve_local(&num, caps[2].chars().next() == Some('b'))?))
    }

    fn resolve_local(&mut self, num: &str, backward: bool) -> Result<String, EngineError> {
        if backward {
            return self
                .state
                .local_labels
                .get(num)
                .and_then(|l| l.last.clone())
                .ok_or_else(|| {
                    EngineError::Directive(format!(
                        "backward reference to undefined local label '{}b'",
                        num
                    ))
                });
        }
        if let Some(pending) = self
            .state
            .local_labels
            .get(num)
            .and_then(|l| l.pending_forward.clone())
        {
            return Ok(pending);
        }
        let fresh = self.state.next_temp_label();
        self.state
            .local_labels
            .entry(num.to_string())
            .or_default()
            .pending_forward = Some(fresh.clone());
        Ok(fresh)
    }

    /// Resolve every `Nb`/`Nf` reference inside a data directive's operands.
    fn resolve_local_refs(&mut self, args: &str) -> Result<String, EngineError> {
        let matches: Vec<(usize, usize, String, bool)> = re!(r"\b(\d+)([bf])\b")
            .captures_iter(args)
            .map(|caps| {
                let m = caps.get(0).expect("whole match");
                (
                    m.start(),
                    m.end(),
                    caps[1].to_string(),
                    &caps[2] == "b",
                )
            })
            .collect();
        if matches.is_empty() {
            return Ok(args.to_string());
        }
        let mut resolved = String::with_capacity(args.len());
        let mut last = 0;
        for (start, end, num, backward) in matches {
            resolved.push_str(&args[last..start]);
            resolved.push_str(&self.resolve_local(&num, backward)?);
            last = end;
        }
        resolved.push_str(&args[last..]);
        Ok(resolved)
    }

    /// Fold the literal boolean forms armasm cannot parse; anything more
    /// complex is left to the assembler.
    fn fold_armasm_expressions(&mut self, line: &mut String) {
        let negated = re!(r"!(\d+)").replace_all(line, |caps: &regex::Captures<'_>| {
            let value: i64 = caps[1].parse().unwrap_or(0);
            if value == 0 { "1" } else { "0" }.to_string()
        });
        if negated != *line {
            *line = negated.into_owned();
        }
        let compared =
            re!(r"\((\d+)\s*([<>])\s*(\d+)\)").replace_all(line, |caps: &regex::Captures<'_>| {
                let lhs: i64 = caps[1].parse().unwrap_or(0);
                let rhs: i64 = caps[3].parse().unwrap_or(0);
                let result = if &caps[2] == "<" { lhs < rhs } else { lhs > rhs };
                if result { "1" } else { "0" }.to_string()
            });
        if compared != *line {
            *line = compared.into_owned();
        }
    }

    /// armasm instruction lines must not start in the label column.
    fn push_indented(&self, line: String, out: &mut Vec<String>) {
        if line.starts_with(char::is_whitespace) || line.is_empty() {
            out.push(line);
        } else {
            out.push(format!("\t{}", line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Rewriter;
    use crate::state::EngineState;
    use crate::{Arch, Dialect, EngineConfig};

    fn config64() -> EngineConfig {
        EngineConfig::new(Arch::Aarch64, Dialect::Armasm)
    }

    fn config32() -> EngineConfig {
        EngineConfig::new(Arch::Arm, Dialect::Armasm)
    }

    fn rewrite(config: &EngineConfig, state: &mut EngineState, line: &str) -> Vec<String> {
        Rewriter { config, state }.rewrite(line).unwrap()
    }

    #[test]
    fn test_forward_local_label() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  b.eq 1f"),
            vec!["  beq temp_label_0"]
        );
        // Both forward references share one synthesized name
        assert_eq!(
            rewrite(&config, &mut state, "  b.ne 1f"),
            vec!["  bne temp_label_0"]
        );
        // The definition emits the pending name, then a fresh backward target
        assert_eq!(
            rewrite(&config, &mut state, "1:"),
            vec!["temp_label_0:", "temp_label_1:"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  b 1b"),
            vec!["  b temp_label_1"]
        );
    }

    #[test]
    fn test_label_split_from_instruction() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "func1: add x0, x0, x1"),
            vec!["func1:", "\tadd x0, x0, x1"]
        );
        assert!(state.labels_seen.contains("func1"));
    }

    #[test]
    fn test_directive_vocabulary() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, ".global do_sum"),
            vec!["\tEXPORT do_sum"]
        );
        assert_eq!(rewrite(&config, &mut state, ".align 4"), vec!["\tALIGN 16"]);
        assert_eq!(
            rewrite(&config, &mut state, "  .word 32, 1f"),
            vec!["  dcd 32, temp_label_0"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  .asciz \"ab\""),
            vec!["  dcb \"ab\",0"]
        );
        assert_eq!(
            rewrite(&config, &mut state, ".text"),
            vec!["\tAREA |.text|, CODE, READONLY, ALIGN=4, CODEALIGN"]
        );
    }

    #[test]
    fn test_symbol_substitution() {
        let config = config64();
        let mut state = EngineState::new();
        state.symbols.insert("stride".to_string(), 64);
        assert_eq!(
            rewrite(&config, &mut state, "  add x0, x0, #stride"),
            vec!["  add x0, x0, #64"]
        );
    }

    #[test]
    fn test_tbz_register_widening() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  tbz w4, #3, 2f"),
            vec!["  tbz x4, #3, temp_label_0"]
        );
    }

    #[test]
    fn test_cond_fused_mnemonics() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  ccmp x0, x1, #0, eq"),
            vec!["  ccmpEQ x0, x1, #0"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  cset w0, lo"),
            vec!["  csetLO w0"]
        );
    }

    #[test]
    fn test_negative_offset_loads() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  ldrb w0, [x1, #-1]"),
            vec!["  ldurb w0, [x1, #-1]"]
        );
        // Writeback forms keep the scaled mnemonic
        assert_eq!(
            rewrite(&config, &mut state, "  ldr x0, [x1, #-8]!"),
            vec!["  ldr x0, [x1, #-8]!"]
        );
    }

    #[test]
    fn test_register_range_expansion() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  ld1 {v1.4h-v3.4h}, [x0]"),
            vec!["  ld1 {v1.4h,v2.4h,v3.4h}, [x0]"]
        );
    }

    #[test]
    fn test_mov32_pair() {
        let config = config32();
        let mut state = EngineState::new();
        assert!(rewrite(&config, &mut state, "  movw r0, #:lower16:coeffs").is_empty());
        assert_eq!(
            rewrite(&config, &mut state, "  movt r0, #:upper16:coeffs"),
            vec!["\tmov32 r0, coeffs"]
        );
        assert!(state.import_symbols.contains("coeffs"));
    }

    #[test]
    fn test_it_blocks_dropped() {
        let config = config32();
        let mut state = EngineState::new();
        assert!(rewrite(&config, &mut state, "  itt eq").is_empty());
        assert_eq!(
            rewrite(&config, &mut state, "  ittt eq"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_vfp_type_injection() {
        let config = config32();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  vadd s0, s1, s2"),
            vec!["  vadd.f32 s0, s1, s2"]
        );
    }

    #[test]
    fn test_expression_folding() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  mov x0, #!0"),
            vec!["  mov x0, #1"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  mov x0, #(3<5)"),
            vec!["  mov x0, #1"]
        );
    }

    #[test]
    fn test_adrp_offset_stripped_and_readded() {
        let config = config64();
        let mut state = EngineState::new();
        assert_eq!(
            rewrite(&config, &mut state, "  adrp x0, table+16"),
            vec!["  adrp x0, table"]
        );
        assert_eq!(
            rewrite(&config, &mut state, "  add x0, x0, :lo12:table+16"),
            vec!["  add x0, x0, table", "  add x0, x0, #16"]
        );
        assert!(state.import_symbols.contains("table"));
    }

    #[test]
    fn test_unknown_branch_target_imported() {
        let config = config64();
        let mut state = EngineState::new();
        rewrite(&config, &mut state, "  bl external_fn");
        assert!(state.call_targets.contains("external_fn"));
        // Register branches are not import candidates
        rewrite(&config, &mut state, "  bx lr");
        assert!(!state.call_targets.contains("lr"));
    }
}
