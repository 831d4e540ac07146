//! Rewrites business-key cross references into CMDB ids
//!
//! Some records name a sibling by business key rather than through the
//! parent/child hierarchy (a child service points at its parent service by
//! endpoint). Once every record has its CMDB id, those references are
//! rewritten to the sibling's id. Unresolvable references keep their
//! business key.

use std::collections::BTreeSet;

use log::{debug, info, warn};
use serde_json::Value;

use super::plan::SyncPlan;
use super::target::TargetIndex;
use crate::error::SyncError;
use crate::record::key_string;
use crate::schema::{CROSS_REFERENCES, CrossReference};

/// A reference waiting to be resolved
#[derive(Debug, Clone)]
struct PendingReference {
    index: usize,
    reference: CrossReference,
    key: Value,
    scope: Option<String>,
}

pub struct CrossReferenceResolver<'a> {
    target: &'a mut TargetIndex,
    references: &'a [CrossReference],
}

impl<'a> CrossReferenceResolver<'a> {
    /// Resolver for the schema's cross references
    pub fn new(target: &'a mut TargetIndex) -> Self {
        Self::with_references(target, CROSS_REFERENCES)
    }

    pub fn with_references(target: &'a mut TargetIndex, references: &'a [CrossReference]) -> Self {
        Self { target, references }
    }

    /// Rewrite every resolvable reference in `plan`, returning how many were
    /// rewritten.
    ///
    /// Siblings produced by this run are searched first, then the CMDB.
    ///
    /// # Errors
    /// `TargetLookupAmbiguous` from the CMDB fallback lookup.
    pub async fn resolve(&mut self, plan: &mut SyncPlan) -> Result<usize, SyncError> {
        let pending = self.pending(plan);
        let mut resolved = 0;

        for item in pending {
            let Some(id) = self.lookup(plan, &item).await? else {
                info!(
                    "Could not resolve {}.{} <{}> under <{:?}> - leaving it as is",
                    item.reference.entity, item.reference.field, item.key, item.scope
                );
                continue;
            };

            info!(
                "Customizing {} <{}> with CMDB {} ID: {}",
                item.reference.field, item.key, item.reference.refers_to, id
            );
            if let Some(record) = plan.records_mut().get_mut(item.index) {
                record
                    .data
                    .insert(item.reference.field.to_string(), Value::String(id));
                resolved += 1;
            }
        }
        Ok(resolved)
    }

    fn pending(&self, plan: &SyncPlan) -> Vec<PendingReference> {
        let mut pending = Vec::new();
        for (index, record) in plan.records().iter().enumerate() {
            if record.deleted {
                continue;
            }
            for reference in self.references {
                if reference.entity != record.entity_type {
                    continue;
                }
                let Some(key) = record.data.get(reference.field).filter(|v| !v.is_null()) else {
                    continue;
                };
                debug!("Found {} for record <{:?}>", reference.field, record.target_id);
                pending.push(PendingReference {
                    index,
                    reference: *reference,
                    key: key.clone(),
                    scope: record.parent_ref().map(key_string),
                });
            }
        }
        pending
    }

    async fn lookup(
        &mut self,
        plan: &SyncPlan,
        item: &PendingReference,
    ) -> Result<Option<String>, SyncError> {
        let entity = item.reference.refers_to;
        // Repeated CIP records share one id and are not ambiguous
        let siblings: BTreeSet<&str> = plan
            .live(entity)
            .filter(|record| record.has_business_key(&item.key))
            .filter(|record| {
                item.scope
                    .as_deref()
                    .is_none_or(|scope| record.in_scope(scope))
            })
            .filter_map(|record| record.target_id.as_deref())
            .collect();
        let siblings: Vec<&str> = siblings.into_iter().collect();

        match siblings.as_slice() {
            [id] => return Ok(Some(id.to_string())),
            [] => {}
            _ => {
                warn!(
                    "{} '{}' records with key <{}> in this run - not resolving {}",
                    siblings.len(),
                    entity,
                    item.key,
                    item.reference.field
                );
                return Ok(None);
            }
        }

        let found = self
            .target
            .find(entity, &item.key, item.scope.as_deref())
            .await?;
        Ok(found.and_then(|record| record.target_id))
    }
}
