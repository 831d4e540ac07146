//! CMDB-side record index
//!
//! `TargetIndex` answers scoped list/find queries over the current CMDB
//! contents through one of the `TargetBackend` implementations:
//! a pre-loaded snapshot file, or the CMDB read API.

pub mod file;
pub mod http;

pub use file::SnapshotBackend;
pub use http::HttpBackend;

use std::collections::HashMap;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;

use crate::error::SyncError;
use crate::record::{Record, key_string};
use crate::schema::EntityType;

/// Source of CMDB documents for one entity type and scope
#[async_trait]
pub trait TargetBackend: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Documents of `entity` within `scope` (the parent's CMDB id; for the
    /// root, the provider's own id). `None` lists every document of the type.
    async fn fetch(&self, entity: EntityType, scope: Option<&str>) -> Result<Vec<Record>, SyncError>;
}

/// Backend for runs without any CMDB data: every record is a creation
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyBackend;

#[async_trait]
impl TargetBackend for EmptyBackend {
    fn name(&self) -> &'static str {
        "empty"
    }

    async fn fetch(
        &self,
        _entity: EntityType,
        _scope: Option<&str>,
    ) -> Result<Vec<Record>, SyncError> {
        Ok(Vec::new())
    }
}

type ScopeKey = (EntityType, Option<String>);

/// Scoped, memoized view over a `TargetBackend`
pub struct TargetIndex {
    backend: Box<dyn TargetBackend>,
    fail_on_backend_error: bool,
    cache: HashMap<ScopeKey, Vec<Record>>,
}

impl std::fmt::Debug for TargetIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetIndex")
            .field("backend", &self.backend.name())
            .field("fail_on_backend_error", &self.fail_on_backend_error)
            .field("cached_scopes", &self.cache.len())
            .finish()
    }
}

impl TargetIndex {
    pub fn new(backend: Box<dyn TargetBackend>) -> Self {
        Self {
            backend,
            fail_on_backend_error: false,
            cache: HashMap::new(),
        }
    }

    /// Index over an empty CMDB
    pub fn empty() -> Self {
        Self::new(Box::new(EmptyBackend))
    }

    /// Surface backend failures instead of degrading them to empty results
    pub fn fail_on_backend_error(mut self, enabled: bool) -> Self {
        self.fail_on_backend_error = enabled;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// CMDB documents of `entity` under `scope`.
    ///
    /// Each (entity, scope) pair is fetched once per run; the CMDB is not
    /// written until the run has finished reading it.
    pub async fn list(
        &mut self,
        entity: EntityType,
        scope: Option<&str>,
    ) -> Result<Vec<Record>, SyncError> {
        let cache_key = (entity, scope.map(str::to_string));
        if let Some(records) = self.cache.get(&cache_key) {
            return Ok(records.clone());
        }

        let records = match self.backend.fetch(entity, scope).await {
            Ok(records) => records,
            Err(err @ SyncError::TargetBackendUnreachable { .. }) if !self.fail_on_backend_error => {
                warn!("{} - treating scope as empty", err);
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        debug!(
            "Got {} '{}' records from {} backend (scope: {:?})",
            records.len(),
            entity,
            self.backend.name(),
            scope
        );
        self.cache.insert(cache_key, records.clone());
        Ok(records)
    }

    /// The single CMDB document of `entity` under `scope` whose business key
    /// equals `key`.
    ///
    /// # Errors
    /// `TargetLookupAmbiguous` when more than one document matches.
    pub async fn find(
        &mut self,
        entity: EntityType,
        key: &Value,
        scope: Option<&str>,
    ) -> Result<Option<Record>, SyncError> {
        let mut matches: Vec<Record> = self
            .list(entity, scope)
            .await?
            .into_iter()
            .filter(|record| record.has_business_key(key))
            .collect();

        if matches.len() > 1 {
            return Err(SyncError::TargetLookupAmbiguous {
                entity,
                key: key_string(key),
                scope: scope.map(str::to_string),
                matches: matches.len(),
            });
        }
        Ok(matches.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct UnreachableBackend;

    #[async_trait]
    impl TargetBackend for UnreachableBackend {
        fn name(&self) -> &'static str {
            "unreachable"
        }

        async fn fetch(
            &self,
            entity: EntityType,
            scope: Option<&str>,
        ) -> Result<Vec<Record>, SyncError> {
            Err(SyncError::TargetBackendUnreachable {
                entity,
                scope: scope.map(str::to_string),
                reason: "connection refused".to_string(),
            })
        }
    }

    struct CountingBackend {
        inner: SnapshotBackend,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TargetBackend for CountingBackend {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch(
            &self,
            entity: EntityType,
            scope: Option<&str>,
        ) -> Result<Vec<Record>, SyncError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch(entity, scope).await
        }
    }

    fn tenant(id: &str, tenant_id: &str, service: &str) -> Record {
        Record::stored(
            EntityType::Tenant,
            id,
            "1-a",
            json!({"tenant_id": tenant_id, "service": service})
                .as_object()
                .cloned()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_find_within_scope() {
        let backend = SnapshotBackend::from_records(vec![
            tenant("a", "t1", "svc-1"),
            tenant("b", "t1", "svc-2"),
            tenant("c", "t2", "svc-1"),
        ]);
        let mut index = TargetIndex::new(Box::new(backend));

        let found = index
            .find(EntityType::Tenant, &json!("t1"), Some("svc-2"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.target_id.as_deref(), Some("b"));

        let missing = index
            .find(EntityType::Tenant, &json!("t2"), Some("svc-2"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_ambiguous_is_an_error() {
        let backend = SnapshotBackend::from_records(vec![
            tenant("a", "t1", "svc-1"),
            tenant("b", "t1", "svc-1"),
        ]);
        let mut index = TargetIndex::new(Box::new(backend));

        let err = index
            .find(EntityType::Tenant, &json!("t1"), Some("svc-1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::TargetLookupAmbiguous { matches: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_degrades_to_empty() {
        let mut index = TargetIndex::new(Box::new(UnreachableBackend));
        let records = index.list(EntityType::Service, Some("site-A")).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_fails_when_asked() {
        let mut index = TargetIndex::new(Box::new(UnreachableBackend)).fail_on_backend_error(true);
        let err = index
            .find(EntityType::Service, &json!("https://a"), Some("site-A"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::TargetBackendUnreachable { .. }));
    }

    #[tokio::test]
    async fn test_list_is_memoized_per_scope() {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = CountingBackend {
            inner: SnapshotBackend::from_records(vec![tenant("a", "t1", "svc-1")]),
            calls: calls.clone(),
        };
        let mut index = TargetIndex::new(Box::new(backend));

        index.list(EntityType::Tenant, Some("svc-1")).await.unwrap();
        index
            .find(EntityType::Tenant, &json!("t1"), Some("svc-1"))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        index.list(EntityType::Tenant, Some("svc-2")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_index() {
        let mut index = TargetIndex::empty();
        assert_eq!(index.backend_name(), "empty");
        assert!(index.list(EntityType::Provider, None).await.unwrap().is_empty());
    }
}
