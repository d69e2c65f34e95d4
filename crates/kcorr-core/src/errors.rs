//! Structured error types shared across kcorr crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`CorrError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (frame indices, sizes, etc.).
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

/// Canonical error type for the correlation engine.
///
/// Configuration and backend errors abort a run. Numerical degeneracies are
/// normally recovered per shell and never surface here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum CorrError {
    /// Inconsistent input: periodicity, field synchronisation, empty frames.
    #[error("configuration error: {0}")]
    Config(ErrorInfo),
    /// Accelerated reduction backend missing or not functional.
    #[error("backend error: {0}")]
    Backend(ErrorInfo),
    /// Unrecoverable numerical failure.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// Filesystem errors while reading inputs or writing artefacts.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
    /// The run was cancelled cooperatively.
    #[error("cancelled: {0}")]
    Cancelled(ErrorInfo),
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

impl CorrError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            CorrError::Config(info)
            | CorrError::Backend(info)
            | CorrError::Numeric(info)
            | CorrError::Io(info)
            | CorrError::Serde(info)
            | CorrError::Cancelled(info) => info,
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(code: &str, message: impl Into<String>) -> Self {
        CorrError::Config(ErrorInfo::new(code, message))
    }

    /// Shorthand for a backend error.
    pub fn backend(code: &str, message: impl Into<String>) -> Self {
        CorrError::Backend(ErrorInfo::new(code, message))
    }

    /// Shorthand for an io error built from any displayable source.
    pub fn io(code: &str, err: impl ToString) -> Self {
        CorrError::Io(ErrorInfo::new(code, err.to_string()))
    }

    /// Returns true when the error stems from cooperative cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CorrError::Cancelled(_))
    }
}
