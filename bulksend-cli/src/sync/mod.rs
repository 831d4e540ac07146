//! Reconciliation of CIP records against the CMDB
//!
//! The engine walks the entity hierarchy top-down, matching every CIP record
//! to its CMDB counterpart (or allocating a new id), then walks the CMDB side
//! to tombstone documents that lost their CIP counterpart, and finally
//! rewrites business-key cross references into CMDB ids.

pub mod engine;
pub mod plan;
pub mod resolver;
pub mod source;
pub mod target;

pub use engine::{Reconciler, TOMBSTONE_ENTRY};
pub use plan::{RecordAction, SyncPlan};
pub use resolver::CrossReferenceResolver;
pub use source::SourceIndex;
pub use target::{EmptyBackend, HttpBackend, SnapshotBackend, TargetBackend, TargetIndex};

/// How strictly data-integrity problems are treated during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntegrityPolicy {
    /// Abort when two CIP records share a business key under one parent
    pub reject_duplicate_source_keys: bool,
    /// Abort when a CMDB read fails instead of treating the scope as empty
    pub fail_on_backend_error: bool,
}

impl IntegrityPolicy {
    /// Abort on every integrity problem
    pub fn strict() -> Self {
        Self {
            reject_duplicate_source_keys: true,
            fail_on_backend_error: true,
        }
    }
}
