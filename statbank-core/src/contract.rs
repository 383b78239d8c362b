#![allow(unused)]

//! # contract: the seams between the transfer pipeline and the outside world
//!
//! The pipeline never talks to the network or the terminal directly. It goes
//! through the three traits below, which the root crate implements with
//! reqwest and an interactive prompt, and which tests replace with `mockall`
//! mocks.
//!
//! - [`StatbankApi`]: the two Statbank endpoints (extract description, loader).
//! - [`CredentialEncryptor`]: the remote password encryption service.
//! - [`PasswordPrompt`]: a masked prompt for the load user's password.
//!
//! Implementations report transport failures as [`StatbankError::Connection`]
//! and hand back every HTTP answer, successful or not, as a [`RawResponse`].
//! Interpreting status codes is the pipeline's job.

use async_trait::async_trait;

use mockall::{automock, predicate::*};

use crate::auth::AuthHeader;
use crate::error::{Result, StatbankError};
use crate::params::LoadParams;

/// Status code and body of an HTTP answer, uninterpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Access to the Statbank endpoints.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StatbankApi: Send + Sync {
    /// `GET uttaksbeskrivelse?tableId=<table>`; `table` may be an id or a name.
    async fn get_description(&self, auth: &AuthHeader, table: &str) -> Result<RawResponse>;

    /// `POST DataLoader?<params>` with the multipart `body`.
    async fn post_data(
        &self,
        auth: &AuthHeader,
        params: &LoadParams,
        body: String,
    ) -> Result<RawResponse>;
}

/// Exchanges a plaintext password for the ciphertext Statbank accepts.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CredentialEncryptor: Send + Sync {
    async fn encrypt(&self, password: &str) -> Result<String>;
}

/// Asks the operator for the load user's password without echoing it.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait PasswordPrompt: Send + Sync {
    fn prompt_password(&self, loaduser: &str) -> Result<String>;
}
