//! gaspp translation engine
//!
//! Translates GNU-as (gas) syntax assembly into the dialects of weaker or
//! incompatible assemblers: Apple's legacy gas, clang's integrated
//! assembler, and Microsoft armasm/armasm64.
//!
//! The engine is a single forward pass over the preprocessed input. Each
//! logical line runs through the conditional-assembly stack and the
//! macro/repetition engine; lines produced by an expansion are pushed onto
//! a work queue consumed by the same state machine, so nested macro calls,
//! conditionals and repetitions resolve without recursion. Fully expanded
//! lines then pass through the dialect rewriter and are appended to the
//! output.
//!
//! ```rust
//! use gaspp_engine::{translate, Arch, Dialect, EngineConfig};
//!
//! let config = EngineConfig::new(Arch::Arm, Dialect::AppleGas);
//! let out = translate(".rept 2\n  nop\n.endr\n", &config).unwrap();
//! assert_eq!(out, "  nop\n  nop\n");
//! ```

/// Compile a regex literal once, on first use.
macro_rules! re {
    ($pattern:literal) => {{
        static RE: std::sync::LazyLock<regex::Regex> =
            std::sync::LazyLock::new(|| regex::Regex::new($pattern).unwrap());
        &*RE
    }};
}
pub(crate) use re;

pub mod arch;
pub mod cond;
pub mod config;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod macros;
pub mod reader;
pub mod rewrite;
pub mod state;

mod emit;

pub use arch::Arch;
pub use config::EngineConfig;
pub use dialect::Dialect;
pub use error::EngineError;

use macros::{Capture, CaptureKind, RepeatKind};
use rewrite::Rewriter;
use state::EngineState;
use std::collections::VecDeque;
use std::fmt::Write as _;

/// Replace word-bounded occurrences of `word` in `line`.
///
/// Boundaries are non-identifier characters; `mask` never substitutes into
/// the middle of `bitmask` or `masked`.
pub(crate) fn replace_word(line: &str, word: &str, replacement: &str) -> String {
    if word.is_empty() {
        return line.to_string();
    }
    let is_word = |c: u8| c.is_ascii_alphanumeric() || c == b'_';
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while let Some(rel) = line[i..].find(word) {
        let start = i + rel;
        let end = start + word.len();
        let left_ok = start == 0 || !is_word(bytes[start - 1]);
        let right_ok = end == line.len() || !is_word(bytes[end]);
        if left_ok && right_ok {
            out.push_str(&line[i..start]);
            out.push_str(replacement);
            i = end;
        } else {
            // Skip one character past the rejected match start
            let step = line[start..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&line[i..start + step]);
            i = start + step;
        }
    }
    out.push_str(&line[i..]);
    out
}

/// First whitespace-delimited token of a line, if any.
pub(crate) fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

/// Translate one preprocessed source to a dialect-adjusted output stream.
pub fn translate(source: &str, config: &EngineConfig) -> Result<String, EngineError> {
    let mut engine = Engine::new(config.clone());
    engine.feed(source)?;
    engine.finish()
}

/// The translation state machine for one stream.
pub struct Engine {
    config: EngineConfig,
    state: EngineState,
    output: String,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Engine {
        let mut state = EngineState::new();
        state.thumb = config.force_thumb;
        Engine {
            config,
            state,
            output: String::new(),
        }
    }

    /// Feed a complete preprocessed source through the pipeline.
    pub fn feed(&mut self, source: &str) -> Result<(), EngineError> {
        let mut queue: VecDeque<String> =
            reader::logical_lines(source, self.config.arch.comment_str()).into();
        while let Some(line) = queue.pop_front() {
            self.process_line(&line, &mut queue)?;
        }
        Ok(())
    }

    /// Emit the epilogue and return the translated stream.
    pub fn finish(mut self) -> Result<String, EngineError> {
        if self.state.capture.is_some() {
            return Err(EngineError::Directive(
                "end of input inside .macro or .rept body".to_string(),
            ));
        }
        if self.state.cond.depth() != 0 {
            return Err(EngineError::Directive(
                "end of input inside .if block".to_string(),
            ));
        }
        for line in emit::epilogue(&self.config, &mut self.state) {
            writeln!(self.output, "{}", line)?;
        }
        Ok(self.output)
    }

    fn emit(&mut self, line: &str) -> Result<(), EngineError> {
        writeln!(self.output, "{}", line)?;
        Ok(())
    }

    fn process_line(
        &mut self,
        line: &str,
        queue: &mut VecDeque<String>,
    ) -> Result<(), EngineError> {
        // Inside a capture nothing is evaluated; only nesting is counted
        if self.state.capture.is_some() {
            return self.feed_capture(line, queue);
        }

        let token = first_token(line).unwrap_or("");

        // Conditional directives are tracked even in suppressed regions so
        // nested .endif pair up correctly
        if token == ".elseif" || token == ".else" || token == ".endif" || token.starts_with(".if")
        {
            let rest = line.trim_start()[token.len()..].trim().to_string();
            return self.handle_conditional(token, &rest);
        }

        if !self.state.cond.is_active() {
            return Ok(());
        }

        let rest = || line.trim_start()[token.len()..].trim().to_string();
        match token {
            ".macro" => {
                let def = macros::parse_macro_header(&rest())?;
                self.state.capture = Some(Capture::macro_def(def));
                return Ok(());
            }
            ".endm" => {
                return Err(EngineError::Directive(
                    ".endm without matching .macro".to_string(),
                ));
            }
            ".endr" => {
                return Err(EngineError::Directive(
                    ".endr without matching .rept/.irp".to_string(),
                ));
            }
            ".purgem" => {
                let name = rest();
                if self.state.macros.remove(&name).is_none() {
                    return Err(EngineError::Directive(format!(
                        ".purgem of undefined macro '{}'",
                        name
                    )));
                }
                return Ok(());
            }
            ".rept" => {
                let rest = rest();
                let mut first_body_line = None;
                let count = match expr::eval(&rest, &self.state.symbols) {
                    Ok(count) => count,
                    // The count may be followed by the first body statement
                    Err(err) => match rest.split_once(char::is_whitespace) {
                        Some((head, tail)) => {
                            let count =
                                expr::eval(head, &self.state.symbols).map_err(|_| err)?;
                            first_body_line = Some(tail.to_string());
                            count
                        }
                        None => return Err(err),
                    },
                };
                let mut capture = Capture::repeat(RepeatKind::Count(count));
                if let Some(first) = first_body_line {
                    capture.body.push(first);
                }
                self.state.capture = Some(capture);
                return Ok(());
            }
            ".irp" => {
                let kind = macros::parse_irp(&rest(), false)?;
                self.state.capture = Some(Capture::repeat(kind));
                return Ok(());
            }
            ".irpc" => {
                let kind = macros::parse_irp(&rest(), true)?;
                self.state.capture = Some(Capture::repeat(kind));
                return Ok(());
            }
            ".altmacro" => {
                self.state.altmacro = true;
                return Ok(());
            }
            ".noaltmacro" => {
                self.state.altmacro = false;
                return Ok(());
            }
            ".set" | ".equ" => {
                self.handle_set(&rest())?;
                if self.config.dialect != Dialect::Armasm {
                    self.emit(line)?;
                }
                return Ok(());
            }
            _ => {}
        }

        // Macro invocation, with an optional leading label
        let invoke = re!(r"^\s*(?:([A-Za-z_.$][\w.$]*)\s*:)?\s*([\w.]+)\s*(.*)$");
        if let Some(caps) = invoke.captures(line) {
            let name = caps.get(2).map_or("", |m| m.as_str());
            if self.state.macros.contains_key(name) {
                if let Some(label) = caps.get(1) {
                    self.rewrite_and_emit(&format!("{}:", label.as_str()))?;
                }
                let args = caps.get(3).map_or("", |m| m.as_str());
                let def = self.state.macros[name].clone();
                let invocation = self.state.next_macro_invocation();
                let expanded = macros::expand_macro(
                    &def,
                    args,
                    invocation,
                    self.state.altmacro,
                    &self.state.symbols,
                )?;
                for line in expanded.into_iter().rev() {
                    queue.push_front(line);
                }
                return Ok(());
            }
        }

        self.rewrite_and_emit(line)
    }

    fn rewrite_and_emit(&mut self, line: &str) -> Result<(), EngineError> {
        let mut rewriter = Rewriter {
            config: &self.config,
            state: &mut self.state,
        };
        for out in rewriter.rewrite(line)? {
            writeln!(self.output, "{}", out)?;
        }
        Ok(())
    }

    /// Append a line to an open capture, closing it when its end directive
    /// arrives at depth zero.
    fn feed_capture(
        &mut self,
        line: &str,
        queue: &mut VecDeque<String>,
    ) -> Result<(), EngineError> {
        let token = first_token(line).unwrap_or("");
        let capture = self.state.capture.as_mut().expect("capture in progress");
        let capturing_macro = matches!(capture.kind, CaptureKind::Macro(_));

        let (opener, closer) = if capturing_macro {
            (token == ".macro", token == ".endm")
        } else {
            (
                matches!(token, ".rept" | ".irp" | ".irpc"),
                token == ".endr",
            )
        };

        if opener {
            capture.depth += 1;
            capture.body.push(line.to_string());
            return Ok(());
        }
        if !closer {
            capture.body.push(line.to_string());
            return Ok(());
        }
        if !capturing_macro && line.trim() != ".endr" {
            return Err(EngineError::Directive(
                ".endr must be alone on its line".to_string(),
            ));
        }
        if capture.depth > 0 {
            capture.depth -= 1;
            capture.body.push(line.to_string());
            return Ok(());
        }

        // Depth zero: the capture is complete
        let capture = self.state.capture.take().expect("capture in progress");
        match capture.kind {
            CaptureKind::Macro(mut def) => {
                def.body = capture.body;
                self.state.macros.insert(def.name.clone(), def);
            }
            CaptureKind::Repeat(kind) => {
                let expanded = macros::expand_repeat(&kind, &capture.body);
                for line in expanded.into_iter().rev() {
                    queue.push_front(line);
                }
            }
        }
        Ok(())
    }

    fn handle_conditional(&mut self, token: &str, rest: &str) -> Result<(), EngineError> {
        match token {
            ".elseif" => {
                let value = self.state.cond.parent_active() && self.eval_cond_expr(rest, |v| v != 0);
                self.state.cond.elseif(value)
            }
            ".else" => self.state.cond.else_(),
            ".endif" => self.state.cond.endif(),
            _ => {
                // Don't evaluate conditions in suppressed regions; garbage
                // expressions inside a dead branch must not be fatal
                if !self.state.cond.is_active() {
                    self.state.cond.push(false);
                    return Ok(());
                }
                // `.if(expr)` without a space keeps the expression glued to
                // the directive token
                let tail = &token[3..];
                let split = tail
                    .find(|c: char| !c.is_ascii_lowercase())
                    .unwrap_or(tail.len());
                let (suffix, glued) = tail.split_at(split);
                let expr_text = if glued.is_empty() {
                    rest.to_string()
                } else {
                    format!("{} {}", glued, rest)
                };
                let value = match suffix {
                    "" | "ne" => self.eval_cond_expr(&expr_text, |v| v != 0),
                    "n" | "eq" => self.eval_cond_expr(&expr_text, |v| v == 0),
                    "lt" => self.eval_cond_expr(&expr_text, |v| v < 0),
                    "le" => self.eval_cond_expr(&expr_text, |v| v <= 0),
                    "gt" => self.eval_cond_expr(&expr_text, |v| v > 0),
                    "ge" => self.eval_cond_expr(&expr_text, |v| v >= 0),
                    "b" => expr_text.trim().is_empty(),
                    "nb" => !expr_text.trim().is_empty(),
                    "c" => self.ifc_operands_equal(&expr_text)?,
                    "nc" => !self.ifc_operands_equal(&expr_text)?,
                    other => {
                        return Err(EngineError::Directive(format!(
                            "unknown conditional directive '.if{}'",
                            other
                        )));
                    }
                };
                self.state.cond.push(value);
                Ok(())
            }
        }
    }

    /// Evaluate a conditional expression; failures (e.g. forward references)
    /// are silently false.
    fn eval_cond_expr(&self, expr_text: &str, test: impl Fn(i64) -> bool) -> bool {
        expr::eval(expr_text, &self.state.symbols).map(test).unwrap_or(false)
    }

    fn ifc_operands_equal(&self, rest: &str) -> Result<bool, EngineError> {
        let (a, b) = rest.split_once(',').ok_or_else(|| {
            EngineError::Directive(".ifc expects two comma-separated operands".to_string())
        })?;
        Ok(unquote(a.trim()) == unquote(b.trim()))
    }

    fn handle_set(&mut self, rest: &str) -> Result<(), EngineError> {
        let (name, value) = rest.split_once(',').ok_or_else(|| {
            EngineError::Directive(".set expects 'symbol, expression'".to_string())
        })?;
        let value = expr::eval(value, &self.state.symbols)?;
        self.state.symbols.insert(name.trim().to_string(), value);
        Ok(())
    }
}

fn unquote(text: &str) -> &str {
    let stripped = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')));
    stripped.unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_word_bounded() {
        assert_eq!(replace_word("mov mask, r0", "mask", "d0"), "mov d0, r0");
        assert_eq!(replace_word("bitmask masked", "mask", "d0"), "bitmask masked");
        assert_eq!(replace_word("mask mask", "mask", "d0"), "d0 d0");
    }

    #[test]
    fn test_first_token() {
        assert_eq!(first_token("  .rept 4"), Some(".rept"));
        assert_eq!(first_token("   "), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"abc\""), "abc");
        assert_eq!(unquote("'abc'"), "abc");
        assert_eq!(unquote("abc"), "abc");
    }
}
