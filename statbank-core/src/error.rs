//! Error kinds for Statbank transfers.
//!
//! Every failure is terminal for the transfer that raised it. Configuration and
//! validation errors are produced before any network I/O. No variant ever
//! carries a password, a ciphertext or an authorization header.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Result type alias for Statbank operations.
pub type Result<T> = std::result::Result<T, StatbankError>;

#[derive(Error, Debug)]
pub enum StatbankError {
    /// Malformed local parameters (bad date, wrong initials length, unknown code).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The encryption exchange or the description fetch was not authorized.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Transport failure or a non-200 response from Statbank.
    #[error("Connection error (status {}): {body}", status.map(|s| s.to_string()).unwrap_or_else(|| "none".into()))]
    Connection { status: Option<u16>, body: String },

    /// Every mismatch between the supplied data and the table description.
    #[error("Validation failed: {0}")]
    Validation(ValidationReport),

    /// The loader answered 200 but the status message lacked an expected anchor.
    #[error("Could not parse Statbank response: {0}")]
    ProtocolParse(String),

    /// The transfer was already submitted (or already failed) once.
    #[error("Transfer cannot be resubmitted: {0}")]
    Resubmission(String),
}

impl StatbankError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn connection(status: Option<u16>, body: impl Into<String>) -> Self {
        Self::Connection {
            status,
            body: body.into(),
        }
    }

    pub fn protocol_parse(msg: impl Into<String>) -> Self {
        Self::ProtocolParse(msg.into())
    }
}

/// Outcome of validating data against a table description.
///
/// `errors` is keyed so that the same violation found twice collapses into a
/// single entry. `warnings` are informational and never fail a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: BTreeMap<String, String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(key.into(), message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Errors out with the whole report when anything was found.
    pub fn into_result(self) -> Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(StatbankError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s)", self.errors.len())?;
        for (key, message) in &self.errors {
            write!(f, "; {key}: {message}")?;
        }
        Ok(())
    }
}
