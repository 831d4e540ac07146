//! CMDB read client

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};

use super::models::CmdbResponse;

/// Build the HTTP client shared by CMDB reads and the bulk write
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("bulksend2cmdb/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Client for the CMDB read API rooted at a base URL
#[derive(Debug, Clone)]
pub struct CmdbClient {
    http: Client,
    base_url: Url,
}

impl CmdbClient {
    /// `base_url` is treated as a directory: relative endpoints are appended to it
    pub fn new(http: Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint (e.g. `tenant/filters/service_id/x?include_docs=true`)
    pub fn endpoint(&self, url_endpoint: &str) -> Result<Url> {
        self.base_url
            .join(url_endpoint)
            .with_context(|| format!("Invalid CMDB endpoint '{}'", url_endpoint))
    }

    /// GET an endpoint and decode whichever envelope the CMDB answered with.
    ///
    /// Error envelopes are returned as `CmdbResponse::Error` regardless of the
    /// HTTP status (a missing provider answers 404 + `not_found`); a body that
    /// matches no envelope is an error.
    pub async fn get(&self, url_endpoint: &str) -> Result<CmdbResponse> {
        let url = self.endpoint(url_endpoint)?;
        log::debug!("GET {}", url);

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        match serde_json::from_str::<CmdbResponse>(&body) {
            Ok(decoded) => Ok(decoded),
            Err(_) if !status.is_success() => {
                anyhow::bail!("{} answered HTTP {}: {}", url, status, body.trim())
            }
            Err(e) => Err(anyhow::Error::new(e).context(format!("Unexpected response from {}", url))),
        }
    }
}
