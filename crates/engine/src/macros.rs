//! Macro and repetition expansion.
//!
//! `.macro`/`.endm` and `.rept`/`.irp`/`.irpc`/`.endr` bodies are captured
//! verbatim (nothing inside a capture is evaluated, only nesting depth is
//! counted) and re-fed through the pipeline on expansion, so nested macro
//! calls, conditionals and repetitions resolve recursively.

use crate::error::EngineError;
use crate::expr;
use crate::replace_word;
use std::collections::HashMap;

/// One formal parameter of a `.macro` definition.
#[derive(Debug, Clone)]
pub struct MacroParam {
    pub name: String,
    pub default: Option<String>,
    /// Absorbs all trailing call-site arguments, keeping their separators
    pub vararg: bool,
}

/// A user-defined macro.
#[derive(Debug, Clone)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<MacroParam>,
    pub body: Vec<String>,
}

/// What a finished repetition capture expands into.
#[derive(Debug)]
pub enum RepeatKind {
    /// `.rept N`
    Count(i64),
    /// `.irp`/`.irpc`: substitute `\param` for each value
    ForEach { param: String, values: Vec<String> },
}

#[derive(Debug)]
pub enum CaptureKind {
    Macro(MacroDef),
    Repeat(RepeatKind),
}

/// An in-progress `.macro` or repetition capture.
#[derive(Debug)]
pub struct Capture {
    pub kind: CaptureKind,
    pub body: Vec<String>,
    /// Nesting depth of same-kind openers seen inside the body
    pub depth: u32,
}

impl Capture {
    pub fn macro_def(def: MacroDef) -> Self {
        Capture {
            kind: CaptureKind::Macro(def),
            body: Vec::new(),
            depth: 0,
        }
    }

    pub fn repeat(kind: RepeatKind) -> Self {
        Capture {
            kind: CaptureKind::Repeat(kind),
            body: Vec::new(),
            depth: 0,
        }
    }
}

/// Parse the header of `.macro NAME [param[=default]] ...`.
///
/// Parameters are separated by whitespace and/or commas. A parameter may
/// carry `:vararg` (must be last) and/or `=default`; the gas `:req`
/// modifier is accepted and ignored.
pub fn parse_macro_header(rest: &str) -> Result<MacroDef, EngineError> {
    let mut tokens = rest
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty());
    let name = tokens
        .next()
        .ok_or_else(|| EngineError::Directive(".macro without a name".to_string()))?
        .to_string();

    let mut params = Vec::new();
    for token in tokens {
        let (head, default) = match token.split_once('=') {
            Some((head, default)) => (head, Some(default.to_string())),
            None => (token, None),
        };
        let (pname, vararg) = match head.split_once(':') {
            Some((pname, "vararg")) => (pname, true),
            Some((pname, "req")) => (pname, false),
            Some((_, modifier)) => {
                return Err(EngineError::Directive(format!(
                    "unknown macro parameter modifier ':{}'",
                    modifier
                )));
            }
            None => (head, false),
        };
        params.push(MacroParam {
            name: pname.to_string(),
            default,
            vararg,
        });
    }

    // :vararg only makes sense on the final parameter
    if params
        .iter()
        .rev()
        .skip(1)
        .any(|p| p.vararg)
    {
        return Err(EngineError::Directive(format!(
            "macro '{}': only the last parameter may be :vararg",
            name
        )));
    }

    Ok(MacroDef {
        name,
        params,
        body: Vec::new(),
    })
}

/// How a call-site argument was separated from its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    First,
    Comma,
    Space,
}

/// Tokenize invocation arguments into (separator, text) slots.
///
/// Comma-separated slots are further split on whitespace; the separators
/// are recorded so `:vararg` expansion can reproduce them.
fn tokenize_args(args: &str) -> Vec<(Separator, String)> {
    let mut tokens = Vec::new();
    if args.trim().is_empty() {
        return tokens;
    }
    for (slot_idx, slot) in args.split(',').enumerate() {
        let mut words = slot.split_whitespace().peekable();
        if words.peek().is_none() {
            // Explicitly empty argument, e.g. `m a,,c`
            let sep = if slot_idx == 0 {
                Separator::First
            } else {
                Separator::Comma
            };
            tokens.push((sep, String::new()));
            continue;
        }
        for (word_idx, word) in words.enumerate() {
            let sep = match (slot_idx, word_idx) {
                (0, 0) => Separator::First,
                (_, 0) => Separator::Comma,
                _ => Separator::Space,
            };
            tokens.push((sep, word.to_string()));
        }
    }
    tokens
}

/// Bind call-site arguments to parameters.
///
/// Positional arguments fill parameters in declaration order; `key=value`
/// binds by name without advancing the positional cursor. Arguments beyond
/// the parameter list are absorbed by a trailing `:vararg` parameter or
/// rejected.
fn bind_args(
    def: &MacroDef,
    args: &str,
) -> Result<HashMap<String, String>, EngineError> {
    let mut bindings: HashMap<String, String> = HashMap::new();
    let mut cursor = 0usize;

    for (sep, text) in tokenize_args(args) {
        // Named form, e.g. `width=16`
        if let Some((key, value)) = text.split_once('=')
            && def.params.iter().any(|p| p.name == key)
        {
            bindings.insert(key.to_string(), value.to_string());
            continue;
        }

        let last_is_vararg = def.params.last().is_some_and(|p| p.vararg);
        if last_is_vararg && cursor + 1 == def.params.len() {
            // The cursor reached the :vararg slot: absorb everything that
            // remains, reproducing the call-site separators
            let name = def.params[cursor].name.clone();
            let entry = bindings.entry(name).or_default();
            if !entry.is_empty() {
                match sep {
                    Separator::Comma | Separator::First => entry.push_str(", "),
                    Separator::Space => entry.push(' '),
                }
            }
            entry.push_str(&text);
        } else if cursor >= def.params.len() {
            return Err(EngineError::Directive(format!(
                "macro '{}' invoked with too many arguments",
                def.name
            )));
        } else {
            bindings.insert(def.params[cursor].name.clone(), text);
            cursor += 1;
        }
    }

    // Fill defaults, then empty strings, for unbound parameters
    for param in &def.params {
        if !bindings.contains_key(&param.name) {
            let value = param.default.clone().unwrap_or_default();
            bindings.insert(param.name.clone(), value);
        }
    }
    Ok(bindings)
}

/// Expand a macro invocation into its substituted body lines.
///
/// `invocation` seeds `\@`; `symbols` backs `.altmacro` `%expr` evaluation.
pub fn expand_macro(
    def: &MacroDef,
    args: &str,
    invocation: u32,
    altmacro: bool,
    symbols: &HashMap<String, i64>,
) -> Result<Vec<String>, EngineError> {
    let bindings = bind_args(def, args)?;

    // Longest name first so `\w` never captures the prefix of `\width`
    let mut order: Vec<&MacroParam> = def.params.iter().collect();
    order.sort_by_key(|p| std::cmp::Reverse(p.name.len()));

    let counter = invocation.to_string();
    let mut lines = Vec::with_capacity(def.body.len());
    for body_line in &def.body {
        let mut line = body_line.clone();
        for param in &order {
            let value = &bindings[&param.name];
            line = line.replace(&format!("\\{}", param.name), value);
            if altmacro {
                line = replace_word(&line, &param.name, value);
            }
        }
        line = line.replace("\\@", &counter);
        line = line.replace("\\()", "");
        if altmacro {
            line = substitute_percent_exprs(&line, symbols);
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Expand a finished repetition capture into the lines to re-feed.
pub fn expand_repeat(kind: &RepeatKind, body: &[String]) -> Vec<String> {
    match kind {
        RepeatKind::Count(n) => {
            let n = (*n).max(0) as usize;
            let mut lines = Vec::with_capacity(body.len() * n);
            for _ in 0..n {
                lines.extend(body.iter().cloned());
            }
            lines
        }
        RepeatKind::ForEach { param, values } => {
            let marker = format!("\\{}", param);
            let mut lines = Vec::with_capacity(body.len() * values.len());
            for value in values {
                for body_line in body {
                    lines.push(body_line.replace(&marker, value).replace("\\()", ""));
                }
            }
            lines
        }
    }
}

/// Parse `.irp param, a b c` / `.irpc param, abc` operands.
pub fn parse_irp(rest: &str, per_char: bool) -> Result<RepeatKind, EngineError> {
    let rest = rest.trim();
    let (param, args) = match rest.split_once(|c: char| c == ',' || c.is_whitespace()) {
        Some((param, args)) => (param.trim(), args.trim()),
        None if !rest.is_empty() => (rest, ""),
        _ => {
            return Err(EngineError::Directive(
                ".irp without a parameter name".to_string(),
            ));
        }
    };
    let values = if per_char {
        args.chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| c.to_string())
            .collect()
    } else {
        args.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    };
    Ok(RepeatKind::ForEach {
        param: param.to_string(),
        values,
    })
}

/// Replace `.altmacro` `%expr` occurrences with their evaluated value.
///
/// Expressions that do not evaluate are left untouched; there is no
/// canonical gas behavior to follow for those.
fn substitute_percent_exprs(line: &str, symbols: &HashMap<String, i64>) -> String {
    let re = crate::re!(r"%([\w()+\-*/<>&|^~]+)");
    re.replace_all(line, |caps: &regex::Captures<'_>| {
        match expr::eval(&caps[1], symbols) {
            Ok(value) => value.to_string(),
            Err(_) => caps[0].to_string(),
        }
    })
    .into_owned()
}
