//! CMDB HTTP API
//!
//! Read-side client for the CMDB query endpoints and the `_bulk_docs`
//! publisher used to submit the reconciled records in one request.

pub mod auth;
pub mod bulk;
pub mod client;
pub mod models;

pub use auth::Credentials;
pub use bulk::{BulkOutcome, BulkPublisher};
pub use client::{CmdbClient, build_http_client};
pub use models::{BulkDocs, CmdbErrorBody, CmdbResponse, CmdbRow, CmdbRows, StoredDocument};
