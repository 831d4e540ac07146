//! Error types raised while reconciling CIP records against the CMDB

use crate::schema::EntityType;

/// Errors raised by the reconciliation core
///
/// Integrity and schema violations (`UnknownEntityType`, `TargetLookupAmbiguous`,
/// `DuplicateSourceKey` in strict mode) abort the run. `TargetBackendUnreachable`
/// is degraded to an empty read unless the run asks for it to be fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// A `type` value outside provider|service|tenant|image|flavor
    UnknownEntityType { value: String },
    /// More than one CMDB record carries the same business key in one scope
    TargetLookupAmbiguous {
        entity: EntityType,
        key: String,
        scope: Option<String>,
        matches: usize,
    },
    /// The CMDB read endpoint could not be queried or answered garbage
    TargetBackendUnreachable {
        entity: EntityType,
        scope: Option<String>,
        reason: String,
    },
    /// A bulk write was requested without a token or user/password pair
    MissingCredentials,
    /// Two CIP records of the same type share a business key under one parent
    DuplicateSourceKey {
        entity: EntityType,
        key: String,
        scope: Option<String>,
    },
    /// The CMDB snapshot file could not be read or decoded
    InvalidSnapshot { reason: String },
    /// A CMDB document of a known type does not have the record shape
    InvalidDocument { id: Option<String>, reason: String },
}

fn scope_label(scope: &Option<String>) -> &str {
    scope.as_deref().unwrap_or("<unscoped>")
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::UnknownEntityType { value } => {
                write!(
                    f,
                    "Unknown entity type '{}' (expected one of provider|service|tenant|image|flavor)",
                    value
                )
            }
            SyncError::TargetLookupAmbiguous {
                entity,
                key,
                scope,
                matches,
            } => {
                write!(
                    f,
                    "CMDB holds {} '{}' records with key '{}' under scope '{}' - refusing to pick one",
                    matches,
                    entity,
                    key,
                    scope_label(scope)
                )
            }
            SyncError::TargetBackendUnreachable {
                entity,
                scope,
                reason,
            } => {
                write!(
                    f,
                    "Could not read '{}' records from CMDB (scope '{}'): {}",
                    entity,
                    scope_label(scope),
                    reason
                )
            }
            SyncError::MissingCredentials => {
                write!(
                    f,
                    "No authorization credentials (OpenID token OR user/password) were provided"
                )
            }
            SyncError::DuplicateSourceKey { entity, key, scope } => {
                write!(
                    f,
                    "CIP data contains more than one '{}' record with key '{}' under parent '{}'",
                    entity,
                    key,
                    scope_label(scope)
                )
            }
            SyncError::InvalidSnapshot { reason } => {
                write!(f, "Invalid CMDB snapshot: {}", reason)
            }
            SyncError::InvalidDocument { id, reason } => {
                write!(
                    f,
                    "Invalid CMDB document {}: {}",
                    id.as_deref().unwrap_or("<no id>"),
                    reason
                )
            }
        }
    }
}

impl std::error::Error for SyncError {}

impl SyncError {
    /// Whether this error should stop the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::TargetBackendUnreachable { .. })
    }
}
