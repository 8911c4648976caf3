//! Integer expression evaluation.
//!
//! Used by `.if` and friends, `.set`/`.equ`, `.rept` counts, and the
//! immediate heuristics in the rewrite rules. Identifiers are resolved
//! against the symbol table; an unknown identifier is an evaluation error,
//! which callers in forward-reference-tolerant contexts treat as zero.

use crate::error::EngineError;
use std::collections::HashMap;

/// Evaluate an integer expression over the given symbol table.
///
/// Supports C-like precedence for
/// `|| && | ^ & == != < > <= >= << >> + - * / %` and the unary
/// operators `- + ~ !`, with decimal, hex (`0x`), binary (`0b`), octal
/// (leading `0`) and character (`'c`) literals.
pub fn eval(expr: &str, symbols: &HashMap<String, i64>) -> Result<i64, EngineError> {
    let tokens = tokenize(expr)?;
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        symbols,
        source: expr,
    };
    let value = parser.parse_expr(0)?;
    if parser.pos != parser.tokens.len() {
        return Err(EngineError::Expr(expr.trim().to_string()));
    }
    Ok(value)
}

/// Evaluate an expression with no symbols in scope.
///
/// Convenience for the rewrite rules, which mostly fold literal immediates.
pub fn eval_literal(expr: &str) -> Option<i64> {
    static EMPTY: std::sync::LazyLock<HashMap<String, i64>> =
        std::sync::LazyLock::new(HashMap::new);
    eval(expr, &EMPTY).ok()
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(i64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Tok>, EngineError> {
    let mut tokens = Vec::new();
    let bytes = expr.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' => i += 1,
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            '0'..='9' => {
                let start = i;
                while i < bytes.len() && (bytes[i] as char).is_ascii_alphanumeric() {
                    i += 1;
                }
                let text = &expr[start..i];
                tokens.push(Tok::Num(parse_int(text).ok_or_else(|| {
                    EngineError::Expr(expr.trim().to_string())
                })?));
            }
            '\'' => {
                // gas character constant: 'c or 'c'
                i += 1;
                if i >= bytes.len() {
                    return Err(EngineError::Expr(expr.trim().to_string()));
                }
                tokens.push(Tok::Num(bytes[i] as i64));
                i += 1;
                if i < bytes.len() && bytes[i] == b'\'' {
                    i += 1;
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '.' => {
                let start = i;
                while i < bytes.len() {
                    let c = bytes[i] as char;
                    if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$' {
                        i += 1;
                    } else {
                        break;
                    }
                }
                tokens.push(Tok::Ident(expr[start..i].to_string()));
            }
            _ => {
                let next = bytes.get(i + 1).copied();
                let op: &'static str = match (c, next) {
                    ('<', Some(b'<')) => "<<",
                    ('>', Some(b'>')) => ">>",
                    ('=', Some(b'=')) => "==",
                    ('!', Some(b'=')) => "!=",
                    ('<', Some(b'=')) => "<=",
                    ('>', Some(b'=')) => ">=",
                    ('&', Some(b'&')) => "&&",
                    ('|', Some(b'|')) => "||",
                    ('+', _) => "+",
                    ('-', _) => "-",
                    ('*', _) => "*",
                    ('/', _) => "/",
                    ('%', _) => "%",
                    ('&', _) => "&",
                    ('|', _) => "|",
                    ('^', _) => "^",
                    ('~', _) => "~",
                    ('!', _) => "!",
                    ('<', _) => "<",
                    ('>', _) => ">",
                    _ => return Err(EngineError::Expr(expr.trim().to_string())),
                };
                tokens.push(Tok::Op(op));
                i += op.len();
            }
        }
    }
    Ok(tokens)
}

/// Parse a gas integer literal: decimal, `0x` hex, `0b` binary, leading-zero
/// octal.
pub fn parse_int(text: &str) -> Option<i64> {
    let (neg, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(&text[1..], 8).ok()?
    } else {
        text.parse().ok()?
    };
    Some(if neg { -value } else { value })
}

fn binding_power(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

struct ExprParser<'a> {
    tokens: Vec<Tok>,
    pos: usize,
    symbols: &'a HashMap<String, i64>,
    source: &'a str,
}

impl ExprParser<'_> {
    fn error(&self) -> EngineError {
        EngineError::Expr(self.source.trim().to_string())
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<i64, EngineError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Op(op)) => *op,
                _ => break,
            };
            let bp = match binding_power(op) {
                Some(bp) if bp >= min_bp => bp,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_expr(bp + 1)?;
            lhs = match op {
                "||" => ((lhs != 0) || (rhs != 0)) as i64,
                "&&" => ((lhs != 0) && (rhs != 0)) as i64,
                "|" => lhs | rhs,
                "^" => lhs ^ rhs,
                "&" => lhs & rhs,
                "==" => (lhs == rhs) as i64,
                "!=" => (lhs != rhs) as i64,
                "<" => (lhs < rhs) as i64,
                ">" => (lhs > rhs) as i64,
                "<=" => (lhs <= rhs) as i64,
                ">=" => (lhs >= rhs) as i64,
                "<<" => lhs.wrapping_shl(rhs as u32),
                ">>" => lhs.wrapping_shr(rhs as u32),
                "+" => lhs.wrapping_add(rhs),
                "-" => lhs.wrapping_sub(rhs),
                "*" => lhs.wrapping_mul(rhs),
                "/" => {
                    if rhs == 0 {
                        return Err(self.error());
                    }
                    lhs.wrapping_div(rhs)
                }
                "%" => {
                    if rhs == 0 {
                        return Err(self.error());
                    }
                    lhs.wrapping_rem(rhs)
                }
                _ => return Err(self.error()),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<i64, EngineError> {
        match self.peek().cloned() {
            Some(Tok::Op("-")) => {
                self.pos += 1;
                Ok(self.parse_unary()?.wrapping_neg())
            }
            Some(Tok::Op("+")) => {
                self.pos += 1;
                self.parse_unary()
            }
            Some(Tok::Op("~")) => {
                self.pos += 1;
                Ok(!self.parse_unary()?)
            }
            Some(Tok::Op("!")) => {
                self.pos += 1;
                Ok((self.parse_unary()? == 0) as i64)
            }
            Some(Tok::Num(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Tok::Ident(name)) => {
                self.pos += 1;
                self.symbols
                    .get(&name)
                    .copied()
                    .ok_or_else(|| self.error())
            }
            Some(Tok::LParen) => {
                self.pos += 1;
                let value = self.parse_expr(0)?;
                match self.peek() {
                    Some(Tok::RParen) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    _ => Err(self.error()),
                }
            }
            _ => Err(self.error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(expr: &str) -> i64 {
        eval(expr, &HashMap::new()).unwrap()
    }

    #[test]
    fn test_literals() {
        assert_eq!(ev("42"), 42);
        assert_eq!(ev("0x20"), 32);
        assert_eq!(ev("0b101"), 5);
        assert_eq!(ev("010"), 8);
        assert_eq!(ev("'A"), 65);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(ev("1 + 2 * 3"), 7);
        assert_eq!(ev("(1 + 2) * 3"), 9);
        assert_eq!(ev("1 << 4 | 1"), 17);
        assert_eq!(ev("16 >> 2"), 4);
        assert_eq!(ev("7 & 3 ^ 1"), 2);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(ev("3 < 5"), 1);
        assert_eq!(ev("5 < 3"), 0);
        assert_eq!(ev("4 == 4"), 1);
        assert_eq!(ev("4 != 4"), 0);
        assert_eq!(ev("2 >= 2 && 1 < 2"), 1);
    }

    #[test]
    fn test_unary() {
        assert_eq!(ev("-3 + 5"), 2);
        assert_eq!(ev("~0"), -1);
        assert_eq!(ev("!0"), 1);
        assert_eq!(ev("!7"), 0);
    }

    #[test]
    fn test_symbols() {
        let mut symbols = HashMap::new();
        symbols.insert("width".to_string(), 16i64);
        assert_eq!(eval("width * 2", &symbols).unwrap(), 32);
        assert!(eval("height * 2", &symbols).is_err());
    }

    #[test]
    fn test_malformed() {
        assert!(eval("1 +", &HashMap::new()).is_err());
        assert!(eval("(1", &HashMap::new()).is_err());
        assert!(eval("1 / 0", &HashMap::new()).is_err());
        assert!(eval("", &HashMap::new()).is_err());
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("255"), Some(255));
        assert_eq!(parse_int("0xff"), Some(255));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("abc"), None);
    }
}
