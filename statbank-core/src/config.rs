//! Where Statbank lives and how to reach it.
//!
//! [`StatbankConfig`] is built once (by the CLI, from YAML) and handed to the
//! clients and transfers explicitly. Endpoint and load-log URLs are derived
//! from the environment's base URL unless `base_url` overrides it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, StatbankError};

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_CIPHERTEXT_FIELD: &str = "message";

const LOADER_PATH: &str = "statbank/sos/v1/DataLoader";
const DESCRIPTION_PATH: &str = "statbank/sos/v1/uttaksbeskrivelse";
const LOG_GUI_PATH: &str = "lastelogg/gui/";
const LOG_API_PATH: &str = "lastelogg/api/";

/// Which Statbank installation to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Environment {
    Prod,
    Test,
    Qa,
    Utv,
}

impl Environment {
    pub fn default_base_url(self) -> &'static str {
        match self {
            Environment::Prod => "https://i.ssb.no/",
            Environment::Test => "https://i.test.ssb.no/",
            Environment::Qa => "https://i.qa.ssb.no/",
            Environment::Utv => "https://i.utv.ssb.no/",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Prod => "PROD",
            Environment::Test => "TEST",
            Environment::Qa => "QA",
            Environment::Utv => "UTV",
        }
    }
}

impl FromStr for Environment {
    type Err = StatbankError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "PROD" => Ok(Environment::Prod),
            "TEST" => Ok(Environment::Test),
            "QA" => Ok(Environment::Qa),
            "UTV" => Ok(Environment::Utv),
            other => Err(StatbankError::configuration(format!(
                "environment {other} not among PROD, TEST, QA, UTV"
            ))),
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = StatbankError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a client needs to reach Statbank and the encryption service.
///
/// Passed explicitly into the clients at construction; nothing in the core
/// reads the process environment.
#[derive(Debug, Clone)]
pub struct StatbankConfig {
    pub environment: Environment,
    /// Overrides the environment's default base URL when set.
    pub base_url: Option<String>,
    pub encryption_url: String,
    /// JSON field holding the ciphertext in the encryption response.
    pub ciphertext_field: String,
    /// The "lastebruker": username half of the Basic credential.
    pub loaduser: String,
    pub timeout_secs: u64,
}

impl StatbankConfig {
    pub fn new(environment: Environment, encryption_url: impl Into<String>, loaduser: impl Into<String>) -> Self {
        Self {
            environment,
            base_url: None,
            encryption_url: encryption_url.into(),
            ciphertext_field: DEFAULT_CIPHERTEXT_FIELD.to_string(),
            loaduser: loaduser.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Base URL, always ending in a single `/`.
    pub fn base(&self) -> String {
        let raw = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.default_base_url());
        format!("{}/", raw.trim_end_matches('/'))
    }

    pub fn loader_url(&self) -> String {
        format!("{}{}", self.base(), LOADER_PATH)
    }

    pub fn description_url(&self) -> String {
        format!("{}{}", self.base(), DESCRIPTION_PATH)
    }

    pub fn log_gui_url(&self, job_number: &str) -> String {
        format!("{}{}{}", self.base(), LOG_GUI_PATH, job_number)
    }

    pub fn log_api_url(&self, job_number: &str) -> String {
        format!("{}{}{}", self.base(), LOG_API_PATH, job_number)
    }

    pub fn validate(&self) -> Result<()> {
        if self.loaduser.trim().is_empty() {
            return Err(StatbankError::configuration("loaduser must be set"));
        }
        if self.encryption_url.trim().is_empty() {
            return Err(StatbankError::configuration("encryption_url must be set"));
        }
        if self.ciphertext_field.trim().is_empty() {
            return Err(StatbankError::configuration("ciphertext_field must not be empty"));
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            environment = %self.environment,
            base_url = %self.base(),
            loaduser = %self.loaduser,
            timeout_secs = self.timeout_secs,
            "Loaded StatbankConfig"
        );
        debug!(?self, "StatbankConfig loaded (full debug)");
    }
}
