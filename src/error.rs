use crate::scanner::token::TokenType;
use crate::span::Span;
use thiserror::Error;

/// A malformed character stream.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} (found '{found}') at {span}")]
pub struct ScanError {
    pub span: Span,
    pub found: char,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}")]
pub struct ParseError {
    pub span: Span,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseErrorKind {
    #[error("expected {expected} {context}, got {found} '{value}'")]
    Unexpected {
        expected: TokenType,
        found: TokenType,
        value: String,
        context: String,
    },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}")]
pub struct RuntimeError {
    pub span: Span,
    pub kind: RuntimeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("cannot resolve '{name}' as it does not exist")]
    UnboundName { name: String },
    #[error("'{name}' is already defined in this scope")]
    DuplicateName { name: String },
    #[error("cannot reassign '{name}' as it was declared constant")]
    ConstantReassign { name: String },
    #[error("type error: {0}")]
    Type(String),
    #[error("range error: {0}")]
    Range(String),
    #[error("cannot divide {numerator} by zero in strict mode")]
    DivisionByZero { numerator: String },
    #[error("{0}")]
    ControlFlow(String),
    #[error("object does not have property '{property}'")]
    MissingProperty { property: String },
    #[error("missing {missing} argument(s) in call to {function}")]
    MissingArguments { function: String, missing: usize },
    #[error("{function}: {message}")]
    Native { function: String, message: String },
    #[error("{0}")]
    Source(Box<DumError>),
}

impl RuntimeErrorKind {
    pub fn at(self, span: Span) -> RuntimeError {
        RuntimeError { span, kind: self }
    }
}

/// Attaches the span of the node being evaluated to an error raised below the evaluator.
pub trait WithSpan<T> {
    fn at(self, span: Span) -> Result<T, RuntimeError>;
}

impl<T> WithSpan<T> for Result<T, RuntimeErrorKind> {
    fn at(self, span: Span) -> Result<T, RuntimeError> {
        self.map_err(|kind| kind.at(span))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DumError {
    #[error("lex error: {0}")]
    Scan(#[from] ScanError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

impl DumError {
    pub fn span(&self) -> Span {
        match self {
            DumError::Scan(e) => e.span,
            DumError::Parse(e) => e.span,
            DumError::Runtime(e) => e.span,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DumError::Scan(_) => "lex",
            DumError::Parse(_) => "parse",
            DumError::Runtime(_) => "runtime",
        }
    }

    pub fn message(&self) -> String {
        match self {
            DumError::Scan(e) => format!("{} (found '{}')", e.message, e.found),
            DumError::Parse(e) => e.kind.to_string(),
            DumError::Runtime(e) => e.kind.to_string(),
        }
    }
}
