//! The serialized-line rewriter.
//!
//! Receives each fully expanded, condition-true line and applies an ordered
//! pipeline of dialect- and architecture-scoped rewrites. The rule families
//! live in sibling modules (`arm`, `aarch64`, `ppc`, `apple`, `armasm`,
//! `thumb`); this module owns the dispatcher plus the rules every dialect
//! shares: mode tracking, the section stack, and the literal pool.

mod aarch64;
mod apple;
mod arm;
mod armasm;
mod ppc;
mod thumb;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::re;
use crate::state::EngineState;
use crate::{Arch, Dialect};

/// Register names must never be recorded as branch or call targets.
pub(crate) fn is_register(name: &str) -> bool {
    re!(r"^(?:[rwxvdqs]\d+|sp|wsp|lr|pc|fp|ip|sl|sb|xzr|wzr)$").is_match(name)
}

/// One rewrite pass over a line, borrowing the engine tables.
pub struct Rewriter<'a> {
    pub config: &'a EngineConfig,
    pub state: &'a mut EngineState,
}

impl Rewriter<'_> {
    /// Run the rule pipeline; returns the output lines for this input line.
    pub fn rewrite(&mut self, raw: &str) -> Result<Vec<String>, EngineError> {
        let mut out = Vec::new();
        let mut line = raw.trim_end().to_string();

        if line.trim().is_empty() {
            out.push(line);
            return Ok(out);
        }

        self.track_mode(&line);

        // Assemblers other than gas reject the GNU stack-note section
        if self.config.dialect != Dialect::Gas
            && re!(r"^\s*\.section\s+\.note\.GNU-stack").is_match(&line)
        {
            out.push(self.comment_out(&line));
            return Ok(out);
        }

        if self.handle_section(&line, &mut out)? {
            return Ok(out);
        }

        if self.config.dialect != Dialect::Armasm && self.handle_literal_pool(&mut line, &mut out) {
            return Ok(out);
        }

        self.apply_adrp_page_syntax(&mut line);
        self.widen_thumb_add(&mut line);
        self.strip_local_label_dot(&mut line);

        if self.config.arch == Arch::Arm {
            if self.handle_neon_alias(&line) {
                return Ok(out);
            }
            self.apply_neon_aliases(&mut line);
        }

        if self.handle_req_alias(&line, &mut out)? {
            return Ok(out);
        }
        self.resolve_req_aliases(&mut line)?;

        if self.config.arch == Arch::PowerPc {
            self.apply_ppc(&mut line);
        }

        if self.config.arch == Arch::Aarch64 {
            self.apply_aarch64_shims(&mut line);
        }

        if self.config.dialect == Dialect::Armasm {
            self.apply_armasm(line, &mut out)?;
            return Ok(out);
        }

        if self.config.dialect.is_apple() && self.apply_apple(&mut line, &mut out)? {
            return Ok(out);
        }

        if self.config.force_thumb && self.apply_force_thumb(&mut line, &mut out) {
            return Ok(out);
        }

        out.push(line);
        Ok(out)
    }

    /// `.code 16`/`.thumb` and `.code 32`/`.arm` toggle thumb mode.
    fn track_mode(&mut self, line: &str) {
        let trimmed = line.trim();
        if trimmed == ".thumb" || re!(r"^\.code\s+16\b").is_match(trimmed) {
            self.state.thumb = true;
        } else if trimmed == ".arm" || re!(r"^\.code\s+32\b").is_match(trimmed) {
            // Forced thumb stays in thumb mode; the directive itself is
            // rewritten later
            self.state.thumb = self.config.force_thumb;
        }
    }

    /// Prefix a line with the output dialect's comment introducer.
    pub(crate) fn comment_out(&self, line: &str) -> String {
        let prefix = if self.config.dialect == Dialect::Armasm {
            ";"
        } else {
            self.config.arch.comment_str()
        };
        format!("{} {}", prefix, line.trim_start())
    }

    /// Section directives push onto the section stack; `.previous` restores
    /// the prior entry. Returns true when the line was consumed.
    fn handle_section(
        &mut self,
        line: &str,
        out: &mut Vec<String>,
    ) -> Result<bool, EngineError> {
        let trimmed = line.trim();
        if trimmed == ".previous" {
            if self.state.sections.len() < 2 {
                return Err(EngineError::Directive(
                    ".previous without a prior section".to_string(),
                ));
            }
            self.state.sections.pop();
            let previous = self
                .state
                .sections
                .last()
                .expect("section stack checked above")
                .clone();
            out.push(previous);
            return Ok(true);
        }

        let caps = match re!(r"^\s*(\.text|\.data|\.bss|\.rodata|\.const_data|\.section)\b\s*(.*)$")
            .captures(trimmed)
        {
            Some(caps) => caps,
            None => return Ok(false),
        };
        let directive = caps.get(1).map_or("", |m| m.as_str());
        let args = caps.get(2).map_or("", |m| m.as_str()).trim();

        if self.config.dialect.is_apple()
            && directive == ".section"
            && !args.contains("__")
        {
            return Err(EngineError::Config(format!(
                "'.section {}' is not representable on Mach-O",
                args
            )));
        }

        let translated = match self.config.dialect {
            Dialect::Armasm => armasm_section(directive, args),
            d if d.is_apple() && directive == ".rodata" => "\t.const_data".to_string(),
            _ => line.trim_end().to_string(),
        };
        self.state.sections.push(translated.clone());
        out.push(translated);
        Ok(true)
    }

    /// `ldr Rd, =expr` collects into the literal pool; `.ltorg` flushes it.
    /// Returns true when the line was consumed.
    fn handle_literal_pool(&mut self, line: &mut String, out: &mut Vec<String>) -> bool {
        if line.trim() == ".ltorg" {
            self.flush_literals(out);
            return true;
        }
        let caps = match re!(r"^(\s*)(ldr[a-z]*(?:\.w)?)\s+([^,]+?)\s*,\s*=\s*(.+?)\s*$")
            .captures(line)
        {
            Some(caps) => caps,
            None => return false,
        };
        let label = self.state.literals.label_for(&caps[4]);
        *line = format!("{}{} {}, {}", &caps[1], &caps[2], &caps[3], label);
        false
    }

    /// Emit the alignment directive and all pending literal words.
    pub(crate) fn flush_literals(&mut self, out: &mut Vec<String>) {
        out.push(format!(".align {}", self.config.arch.pool_align()));
        let word = self.config.arch.pool_word_directive();
        for (label, expr) in self.state.literals.drain() {
            out.push(format!("{}:", label));
            out.push(format!("{} {}", word, expr));
        }
    }

    /// Apple dialects spell AArch64 PC-relative relocations with
    /// `@PAGE`/`@PAGEOFF` instead of `:pg_hi21:`/`:lo12:`.
    fn apply_adrp_page_syntax(&mut self, line: &mut String) {
        if !self.config.dialect.features().adrp_page_syntax || self.config.arch != Arch::Aarch64 {
            return;
        }
        let paged = re!(r"#?:pg_hi21:([\w.]+)").replace_all(line, "$1@PAGE");
        let full = re!(r"#?:lo12:([\w.]+)").replace_all(&paged, "$1@PAGEOFF");
        if full != *line {
            *line = full.into_owned();
        }
    }

    /// Strip the `.L` local-label prefix: Mach-O uses a plain `L` prefix and
    /// armasm rejects the leading dot.
    fn strip_local_label_dot(&mut self, line: &mut String) {
        if !self.config.dialect.features().strip_local_label_dot {
            return;
        }
        let replaced = re!(r"(^|[^\w])\.L(\w+)").replace_all(line, "${1}L$2");
        if replaced != *line {
            *line = replaced.into_owned();
        }
    }
}

/// Map a gas section directive to an armasm `AREA` line.
fn armasm_section(directive: &str, args: &str) -> String {
    match directive {
        ".text" => "\tAREA |.text|, CODE, READONLY, ALIGN=4, CODEALIGN".to_string(),
        ".data" | ".bss" => "\tAREA |.data|, DATA, ALIGN=4".to_string(),
        ".rodata" | ".const_data" => "\tAREA |.rodata|, DATA, READONLY, ALIGN=5".to_string(),
        _ => {
            // .section NAME[,flags]: code areas keep code attributes
            let name = args.split(',').next().unwrap_or(args).trim();
            if name.starts_with(".text") {
                format!("\tAREA |{}|, CODE, READONLY, ALIGN=4, CODEALIGN", name)
            } else {
                format!("\tAREA |{}|, DATA, ALIGN=4", name)
            }
        }
    }
}
