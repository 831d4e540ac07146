//! Reconciles CIP inventory records against a CMDB and pushes the resulting
//! creates, updates and deletes as one CouchDB bulk write.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod record;
pub mod schema;
pub mod sync;

pub use error::SyncError;
pub use record::Record;
pub use schema::EntityType;
pub use sync::{IntegrityPolicy, Reconciler, SyncPlan};
