use crate::span::Span;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A structural shape the lowering does not and will not handle.
    #[error("Unsupported construct `{kind}` at {span}: {message}")]
    UnsupportedConstruct {
        kind: &'static str,
        span: Span,
        message: String,
    },
    /// An internal invariant was violated by the input handed to the core.
    #[error("Inconsistent state: {0}")]
    InconsistentState(String),
    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    pub fn unsupported(kind: &'static str, span: Span, message: impl Into<String>) -> Self {
        Error::UnsupportedConstruct {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn inconsistent(message: impl Into<String>) -> Self {
        Error::InconsistentState(message.into())
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::UnsupportedConstruct { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Short machine-readable code used when the error is turned into a diagnostic.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnsupportedConstruct { .. } => "unsupported-construct",
            Error::InconsistentState(_) => "inconsistent-state",
            Error::Generic(_) => "generic",
        }
    }
}

pub type Result<T> = result::Result<T, Error>;

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

// Convert from std::io::Error to our Error type
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
