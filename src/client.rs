//! # Statbank HTTP client
//!
//! Implements [`StatbankApi`] from `statbank-core` on top of `reqwest`, giving
//! the transfer pipeline access to the two Statbank endpoints:
//!
//! - `GET  <base>statbank/sos/v1/uttaksbeskrivelse?tableId=<table>`
//! - `POST <base>statbank/sos/v1/DataLoader?<load parameters>`
//!
//! The client only moves bytes. Every HTTP answer, whatever its status, comes
//! back as a [`RawResponse`]; only transport failures (DNS, TLS, timeouts)
//! become [`StatbankError::Connection`]. The `Authorization` value is passed in
//! per call and never logged.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONNECTION, CONTENT_TYPE};
use statbank_core::auth::AuthHeader;
use statbank_core::config::StatbankConfig;
use statbank_core::contract::{RawResponse, StatbankApi};
use statbank_core::encode;
use statbank_core::error::{Result, StatbankError};
use statbank_core::params::LoadParams;

pub struct StatbankClient {
    http: reqwest::Client,
    config: StatbankConfig,
}

impl StatbankClient {
    pub fn new(config: StatbankConfig) -> Result<Self> {
        let http = build_http(config.timeout_secs)?;
        tracing::info!(
            environment = %config.environment,
            base_url = %config.base(),
            timeout_secs = config.timeout_secs,
            "Initialized StatbankClient"
        );
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &StatbankConfig {
        &self.config
    }
}

pub(crate) fn build_http(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StatbankError::configuration(format!("cannot build HTTP client: {e}")))
}

async fn read_response(response: reqwest::Response) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| {
        tracing::error!(error = %e, status, "Failed to read response body");
        StatbankError::connection(Some(status), format!("unreadable body: {e}"))
    })?;
    Ok(RawResponse::new(status, body))
}

#[async_trait]
impl StatbankApi for StatbankClient {
    async fn get_description(&self, auth: &AuthHeader, table: &str) -> Result<RawResponse> {
        let url = self.config.description_url();
        tracing::debug!(url = %url, table = %table, "GET extract description");
        let response = self
            .http
            .get(&url)
            .query(&[("tableId", table)])
            .header(AUTHORIZATION, auth.as_str())
            .header(ACCEPT, "*/*")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Transport error fetching description");
                StatbankError::connection(None, e.to_string())
            })?;
        read_response(response).await
    }

    async fn post_data(
        &self,
        auth: &AuthHeader,
        params: &LoadParams,
        body: String,
    ) -> Result<RawResponse> {
        let url = self.config.loader_url();
        tracing::debug!(
            url = %url,
            main_table = %params.main_table_name,
            body_bytes = body.len(),
            "POST to loader"
        );
        let response = self
            .http
            .post(&url)
            .query(&params.query_pairs())
            .header(AUTHORIZATION, auth.as_str())
            .header(CONTENT_TYPE, encode::CONTENT_TYPE)
            .header(ACCEPT, "*/*")
            .header(CONNECTION, "keep-alive")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Transport error posting to loader");
                StatbankError::connection(None, e.to_string())
            })?;
        read_response(response).await
    }
}
