//! Client for the password encryption service.
//!
//! Statbank does not accept the load user's password in clear text. It is
//! posted once, as `{"message": <password>}`, to an encryption service that
//! answers with the ciphertext under a configurable field name.

use std::fmt;

use async_trait::async_trait;
use reqwest::StatusCode;
use statbank_core::config::StatbankConfig;
use statbank_core::contract::CredentialEncryptor;
use statbank_core::error::{Result, StatbankError};

use crate::client::build_http;

pub struct HttpEncryptor {
    http: reqwest::Client,
    url: String,
    token: String,
    ciphertext_field: String,
}

impl HttpEncryptor {
    /// `token` is the bearer token for the encryption service itself.
    pub fn new(config: &StatbankConfig, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(StatbankError::configuration(
                "encryption service token must not be empty",
            ));
        }
        tracing::info!(
            url = %config.encryption_url,
            ciphertext_field = %config.ciphertext_field,
            "Initialized HttpEncryptor"
        );
        Ok(Self {
            http: build_http(config.timeout_secs)?,
            url: config.encryption_url.clone(),
            token,
            ciphertext_field: config.ciphertext_field.clone(),
        })
    }
}

impl fmt::Debug for HttpEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEncryptor")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("ciphertext_field", &self.ciphertext_field)
            .finish()
    }
}

#[async_trait]
impl CredentialEncryptor for HttpEncryptor {
    async fn encrypt(&self, password: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "message": password }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %self.url, "[AUTH] Encryption service unreachable");
                StatbankError::auth(format!("encryption service unreachable: {e}"))
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::error!(status = status.as_u16(), url = %self.url, "[AUTH] Encryption refused");
            return Err(StatbankError::auth(format!(
                "encryption service answered {status}"
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| StatbankError::auth(format!("unreadable encryption response: {e}")))?;
        body.get(&self.ciphertext_field)
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                StatbankError::auth(format!(
                    "encryption response has no '{}' field",
                    self.ciphertext_field
                ))
            })
    }
}
