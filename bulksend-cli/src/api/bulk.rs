//! Bulk write of reconciled records to the CMDB

use anyhow::{Context, Result};
use log::{debug, error, info};
use reqwest::Client;

use super::auth::Credentials;
use super::models::BulkDocs;
use crate::error::SyncError;
use crate::record::Record;

/// What the CMDB answered to a bulk write
///
/// The per-document statuses in `body` are logged, not interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOutcome {
    pub status: u16,
    pub body: String,
}

/// Submits the output sequence as one `_bulk_docs` request
#[derive(Debug, Clone)]
pub struct BulkPublisher {
    http: Client,
    write_endpoint: String,
    credentials: Option<Credentials>,
}

impl BulkPublisher {
    pub fn new(
        http: Client,
        write_endpoint: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            http,
            write_endpoint: write_endpoint.into(),
            credentials,
        }
    }

    /// `{write_endpoint}/_bulk_docs`
    pub fn bulk_url(&self) -> String {
        format!("{}/_bulk_docs", self.write_endpoint.trim_end_matches('/'))
    }

    /// POST every record in one envelope.
    ///
    /// # Errors
    /// `SyncError::MissingCredentials` before any request is made when neither
    /// a token nor a user/password pair is configured; otherwise transport
    /// failures and non-2xx answers.
    pub async fn publish(&self, records: &[Record]) -> Result<BulkOutcome> {
        let Some(credentials) = &self.credentials else {
            error!("{}", SyncError::MissingCredentials);
            return Err(SyncError::MissingCredentials.into());
        };

        let url = self.bulk_url();
        info!(
            "BULK POSTING {} records to {} ({})",
            records.len(),
            url,
            credentials.kind()
        );

        let request = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&BulkDocs { docs: records });

        let response = credentials
            .apply(request)
            .send()
            .await
            .with_context(|| format!("Bulk POST to {} failed", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read bulk POST response")?;
        debug!("Result/s of BULK POST: {}", body);

        if !status.is_success() {
            anyhow::bail!("CMDB rejected bulk POST with HTTP {}: {}", status, body.trim());
        }

        info!("CMDB accepted bulk POST (HTTP {})", status);
        Ok(BulkOutcome {
            status: status.as_u16(),
            body,
        })
    }
}
