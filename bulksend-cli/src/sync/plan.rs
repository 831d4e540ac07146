//! The output sequence produced by a reconciliation run

use serde::Serialize;
use serde_json::Value;

use crate::api::BulkDocs;
use crate::record::Record;
use crate::schema::EntityType;

/// What the CMDB will do with an output record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordAction {
    /// New document (no revision)
    Create,
    /// Existing document, matched by business key (carries its revision)
    Update,
    /// Tombstone for a document without CIP counterpart
    Delete,
}

impl RecordAction {
    pub fn of(record: &Record) -> Self {
        if record.deleted {
            RecordAction::Delete
        } else if record.target_revision.is_some() {
            RecordAction::Update
        } else {
            RecordAction::Create
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordAction::Create => "create",
            RecordAction::Update => "update",
            RecordAction::Delete => "delete",
        }
    }
}

/// Ordered records ready for the bulk write: parents before descendants,
/// tombstones after every create/update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncPlan {
    records: Vec<Record>,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Non-tombstone records of `entity`
    pub fn live(&self, entity: EntityType) -> impl Iterator<Item = &Record> + '_ {
        self.records
            .iter()
            .filter(move |record| record.entity_type == entity && !record.deleted)
    }

    /// Business keys of the create/update records of `entity` under `scope`
    pub fn surviving_keys(&self, entity: EntityType, scope: Option<&str>) -> Vec<&Value> {
        self.live(entity)
            .filter(|record| scope.is_none_or(|scope| record.in_scope(scope)))
            .filter_map(Record::business_key)
            .collect()
    }

    pub fn count_by_action(&self, action: RecordAction) -> usize {
        self.records
            .iter()
            .filter(|record| RecordAction::of(record) == action)
            .count()
    }

    pub fn create_count(&self) -> usize {
        self.count_by_action(RecordAction::Create)
    }

    pub fn update_count(&self) -> usize {
        self.count_by_action(RecordAction::Update)
    }

    pub fn delete_count(&self) -> usize {
        self.count_by_action(RecordAction::Delete)
    }

    /// The `_bulk_docs` request body for this plan
    pub fn to_bulk_json(&self, pretty: bool) -> serde_json::Result<String> {
        let envelope = BulkDocs {
            docs: &self.records,
        };
        if pretty {
            serde_json::to_string_pretty(&envelope)
        } else {
            serde_json::to_string(&envelope)
        }
    }
}
