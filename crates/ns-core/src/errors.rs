//! Structured error types shared across the sampling crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`NsError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (walker ids, lengths, indices).
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

/// Canonical error type for the proposal kernel.
///
/// Only [`NsError::Contract`] and configuration/artefact failures ever leave
/// an engine's `execute`; likelihood failures are folded into rejections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum NsError {
    /// Caller contract violations (malformed fit index, wrong lengths, busy walkers).
    #[error("contract violation: {0}")]
    Contract(ErrorInfo),
    /// Invalid problem definitions.
    #[error("problem error: {0}")]
    Problem(ErrorInfo),
    /// Likelihood evaluation signalled an invalid point.
    #[error("likelihood error: {0}")]
    Likelihood(ErrorInfo),
    /// Configuration parse or validation errors.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Serialization and artefact I/O errors.
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

impl NsError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            NsError::Contract(info)
            | NsError::Problem(info)
            | NsError::Likelihood(info)
            | NsError::Config(info)
            | NsError::Serde(info) => info,
        }
    }

    /// Shorthand for a contract violation with the given code and message.
    pub fn contract(code: impl Into<String>, message: impl Into<String>) -> Self {
        NsError::Contract(ErrorInfo::new(code, message))
    }

    /// True for errors that indicate a caller bug rather than sampling dynamics.
    pub fn is_contract(&self) -> bool {
        matches!(self, NsError::Contract(_))
    }
}
