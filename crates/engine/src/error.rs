//! Translation error types.

/// Error type for the translation pipeline.
///
/// This allows proper error propagation using `?` for both logical errors
/// (malformed directives, bad expressions, bad configuration) and formatting
/// errors while emitting translated lines.
#[derive(Debug)]
pub enum EngineError {
    /// A malformed or misused directive (unmatched closer, bad operands)
    Directive(String),
    /// An expression that could not be evaluated
    Expr(String),
    /// Invalid configuration (unknown architecture, dialect, or section)
    Config(String),
    /// A formatting error when writing translated output
    Format(std::fmt::Error),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Directive(s) => write!(f, "{}", s),
            EngineError::Expr(s) => write!(f, "cannot evaluate expression: {}", s),
            EngineError::Config(s) => write!(f, "{}", s),
            EngineError::Format(e) => write!(f, "output error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::fmt::Error> for EngineError {
    fn from(e: std::fmt::Error) -> Self {
        EngineError::Format(e)
    }
}
