//! Reconciliation engine
//!
//! Two recursive, depth-first passes over the entity hierarchy:
//!
//! 1. `reconcile` walks the CIP records top-down. Every record is matched
//!    against the CMDB by business key within its parent's scope. A match
//!    reuses the CMDB id and revision (update). Otherwise the record is a
//!    creation: non-leaf records get a new id so their children can point at
//!    them, and providers take their own name as id. The parent-reference
//!    field is rewritten to the parent's CMDB id.
//! 2. `detect_deletions` walks the CMDB top-down from `TOMBSTONE_ENTRY` and
//!    tombstones every document whose business key no longer appears among
//!    the output records of its scope.
//!
//! Providers and services are never tombstoned. CMDB documents whose parent
//! no longer exists are invisible to scoped queries and are left alone.

use std::collections::{HashMap, HashSet};

use futures::FutureExt;
use futures::future::BoxFuture;
use log::{debug, info, warn};
use serde_json::Value;
use uuid::Uuid;

use super::IntegrityPolicy;
use super::plan::SyncPlan;
use super::resolver::CrossReferenceResolver;
use super::source::SourceIndex;
use super::target::TargetIndex;
use crate::error::SyncError;
use crate::record::{Record, key_string};
use crate::schema::EntityType;

/// First entity type the delete pass looks at, scoped under every output
/// record of its parent type
pub const TOMBSTONE_ENTRY: EntityType = EntityType::Tenant;

/// One reconciliation run
pub struct Reconciler<'a> {
    source: &'a SourceIndex,
    target: &'a mut TargetIndex,
    policy: IntegrityPolicy,
    plan: SyncPlan,
    tombstoned: HashSet<String>,
}

impl<'a> Reconciler<'a> {
    pub fn new(source: &'a SourceIndex, target: &'a mut TargetIndex, policy: IntegrityPolicy) -> Self {
        Self {
            source,
            target,
            policy,
            plan: SyncPlan::new(),
            tombstoned: HashSet::new(),
        }
    }

    /// Run both passes and cross-reference resolution, returning the output
    /// sequence for the bulk write
    pub async fn run(mut self) -> Result<SyncPlan, SyncError> {
        info!(
            "Reconciling {} CIP records against {} CMDB backend",
            self.source.len(),
            self.target.backend_name()
        );
        self.reconcile(EntityType::ROOT, None, None).await?;

        let mut seen = HashSet::new();
        let scopes: Vec<String> = TOMBSTONE_ENTRY
            .parent()
            .map(|parent| {
                self.plan
                    .live(parent)
                    .filter_map(|record| record.target_id.clone())
                    .filter(|id| seen.insert(id.clone()))
                    .collect()
            })
            .unwrap_or_default();

        info!(
            "Looking for deleted '{}' records under {} scopes",
            TOMBSTONE_ENTRY,
            scopes.len()
        );
        for scope in scopes {
            self.detect_deletions(TOMBSTONE_ENTRY, Some(scope)).await?;
        }

        let resolved = CrossReferenceResolver::new(&mut *self.target)
            .resolve(&mut self.plan)
            .await?;
        debug!("Resolved {} cross references", resolved);

        Ok(self.plan)
    }

    /// Records produced so far
    pub fn plan(&self) -> &SyncPlan {
        &self.plan
    }

    pub fn into_plan(self) -> SyncPlan {
        self.plan
    }

    /// Create/update pass for `entity` records below the CIP parent
    /// `source_parent` (CIP business key) whose CMDB id is `target_parent`.
    pub fn reconcile(
        &mut self,
        entity: EntityType,
        source_parent: Option<Value>,
        target_parent: Option<String>,
    ) -> BoxFuture<'_, Result<(), SyncError>> {
        async move {
            let source = self.source;
            let items: Vec<&Record> = source.filter(entity, source_parent.as_ref()).collect();
            debug!(
                "Got {} records from CIP based on entity <{}> and parent <{:?}>",
                items.len(),
                entity,
                source_parent
            );
            self.check_duplicates(entity, &items, target_parent.as_deref())?;

            for item in items {
                let Some(key) = item.business_key().cloned() else {
                    warn!(
                        "Skipping CIP '{}' record without '{}': {}",
                        entity,
                        entity.business_key_field(),
                        Value::Object(item.data.clone())
                    );
                    continue;
                };

                // A provider is its own scope unless the caller says otherwise
                let scope = match &target_parent {
                    Some(parent) => Some(parent.clone()),
                    None if entity.is_root() => Some(key_string(&key)),
                    None => None,
                };

                let mut record = item.clone();
                match self.target.find(entity, &key, scope.as_deref()).await? {
                    Some(existing) => {
                        debug!(
                            "Found record in CMDB matching entity <{}> and CIP id <{}> [action: update]",
                            entity, key
                        );
                        record.target_id = existing.target_id;
                        record.target_revision = existing.target_revision;
                    }
                    None if entity.is_leaf() => {
                        debug!("Record <{}> not in CMDB [action: create]", key);
                    }
                    None if entity.is_root() => {
                        debug!("Record <{}> not in CMDB [action: create, id from name]", key);
                        record.target_id = scope.clone();
                    }
                    None => {
                        let id = Uuid::new_v4().to_string();
                        debug!("Record <{}> not in CMDB [action: create, id {}]", key, id);
                        record.target_id = Some(id);
                    }
                }

                if let Some(field) = entity.parent_ref_field() {
                    let parent_id = scope.clone().map_or(Value::Null, Value::String);
                    record.data.insert(field.to_string(), parent_id);
                }

                let child_scope = record.target_id.clone();
                self.plan.push(record);

                for &child in entity.children() {
                    self.reconcile(child, Some(key.clone()), child_scope.clone())
                        .await?;
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Delete pass for `entity` documents under the CMDB scope `scope`
    pub fn detect_deletions(
        &mut self,
        entity: EntityType,
        scope: Option<String>,
    ) -> BoxFuture<'_, Result<(), SyncError>> {
        async move {
            let existing = self.target.list(entity, scope.as_deref()).await?;
            let surviving: Vec<Value> = self
                .plan
                .surviving_keys(entity, scope.as_deref())
                .into_iter()
                .cloned()
                .collect();
            debug!(
                "CMDB holds {} '{}' records under <{:?}>, {} survive",
                existing.len(),
                entity,
                scope,
                surviving.len()
            );

            for target_record in existing {
                match target_record.business_key() {
                    Some(key) if surviving.contains(key) => {}
                    Some(_) => self.tombstone(&target_record, scope.as_deref()),
                    None => warn!(
                        "CMDB '{}' record {:?} has no '{}' - leaving it alone",
                        entity,
                        target_record.target_id,
                        entity.business_key_field()
                    ),
                }

                // Children of doomed records are walked too, so they get tombstoned
                if let Some(id) = &target_record.target_id {
                    for &child in entity.children() {
                        self.detect_deletions(child, Some(id.clone())).await?;
                    }
                }
            }
            Ok(())
        }
        .boxed()
    }

    fn tombstone(&mut self, record: &Record, scope: Option<&str>) {
        if let Some(id) = &record.target_id {
            if !self.tombstoned.insert(id.clone()) {
                return;
            }
        }
        debug!(
            "Record from CMDB not found in CIP data (parent: {:?}): {:?} [action: delete]",
            scope, record.target_id
        );
        self.plan.push(record.tombstone());
    }

    fn check_duplicates(
        &self,
        entity: EntityType,
        items: &[&Record],
        scope: Option<&str>,
    ) -> Result<(), SyncError> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for key in items.iter().filter_map(|item| item.business_key()) {
            *counts.entry(key_string(key)).or_insert(0) += 1;
        }

        let mut duplicates: Vec<String> = counts
            .into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(key, _)| key)
            .collect();
        duplicates.sort();

        for key in duplicates {
            let err = SyncError::DuplicateSourceKey {
                entity,
                key,
                scope: scope.map(str::to_string),
            };
            if self.policy.reject_duplicate_source_keys {
                return Err(err);
            }
            warn!("{} - the last one wins in CMDB", err);
        }
        Ok(())
    }
}
