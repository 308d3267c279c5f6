//! Structured error types shared across theoris crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`TheoError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (symbol names, chains, units, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for theoris.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum TheoError {
    /// A symbol depends on itself through its defining expressions.
    #[error("cycle detected: {0}")]
    CycleDetected(ErrorInfo),
    /// A leaf required by a section is neither declared nor defined.
    #[error("missing argument: {0}")]
    MissingArgument(ErrorInfo),
    /// Units of composed operands cannot be reconciled.
    #[error("incompatible units: {0}")]
    IncompatibleUnits(ErrorInfo),
    /// An equation could not be solved for the requested symbol.
    #[error("symbol unresolvable: {0}")]
    SymbolUnresolvable(ErrorInfo),
    /// The satisfiability backend could not be started or talked to.
    #[error("solver unavailable: {0}")]
    SolverUnavailable(ErrorInfo),
    /// Section construction rejected the requested layout.
    #[error("invalid section: {0}")]
    InvalidSection(ErrorInfo),
    /// Expression evaluation or translation errors.
    #[error("expression error: {0}")]
    Expression(ErrorInfo),
    /// Symbol table lookup and mutation errors.
    #[error("symbol error: {0}")]
    Symbol(ErrorInfo),
    /// Configuration loading and validation errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and hashing errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl TheoError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            TheoError::CycleDetected(info)
            | TheoError::MissingArgument(info)
            | TheoError::IncompatibleUnits(info)
            | TheoError::SymbolUnresolvable(info)
            | TheoError::SolverUnavailable(info)
            | TheoError::InvalidSection(info)
            | TheoError::Expression(info)
            | TheoError::Symbol(info)
            | TheoError::Config(info)
            | TheoError::Serde(info) => info,
        }
    }

    /// Returns the stable machine readable code of the error.
    pub fn code(&self) -> &str {
        &self.info().code
    }

    /// Adds a context entry to the payload, keeping the variant.
    pub fn with_context(self, key: impl Into<String>, value: impl ToString) -> Self {
        match self {
            TheoError::CycleDetected(info) => {
                TheoError::CycleDetected(info.with_context(key, value))
            }
            TheoError::MissingArgument(info) => {
                TheoError::MissingArgument(info.with_context(key, value))
            }
            TheoError::IncompatibleUnits(info) => {
                TheoError::IncompatibleUnits(info.with_context(key, value))
            }
            TheoError::SymbolUnresolvable(info) => {
                TheoError::SymbolUnresolvable(info.with_context(key, value))
            }
            TheoError::SolverUnavailable(info) => {
                TheoError::SolverUnavailable(info.with_context(key, value))
            }
            TheoError::InvalidSection(info) => {
                TheoError::InvalidSection(info.with_context(key, value))
            }
            TheoError::Expression(info) => TheoError::Expression(info.with_context(key, value)),
            TheoError::Symbol(info) => TheoError::Symbol(info.with_context(key, value)),
            TheoError::Config(info) => TheoError::Config(info.with_context(key, value)),
            TheoError::Serde(info) => TheoError::Serde(info.with_context(key, value)),
        }
    }
}

/// Result alias used throughout theoris.
pub type TheoResult<T> = Result<T, TheoError>;
