//! CIP-side record index

use std::io::Read;

use serde_json::Value;

use crate::record::{Record, key_string, matches_key};
use crate::schema::EntityType;

/// The CIP snapshot, read once and never modified during a run
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    records: Vec<Record>,
}

impl SourceIndex {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Decode a JSON array of `{type, data}` records
    pub fn from_reader<R: Read>(reader: R) -> serde_json::Result<Self> {
        let records: Vec<Record> = serde_json::from_reader(reader)?;
        Ok(Self::new(records))
    }

    /// Records of `entity`, in input order, optionally restricted to the
    /// children of the parent with CIP business key `parent_key`.
    ///
    /// The returned iterator is lazy and can be cloned to restart it.
    pub fn filter<'a>(
        &'a self,
        entity: EntityType,
        parent_key: Option<&'a Value>,
    ) -> impl Iterator<Item = &'a Record> + Clone + 'a {
        let parent_field = entity.scope_field();
        let parent = parent_key.map(key_string);
        self.records.iter().filter(move |record| {
            record.entity_type == entity
                && parent.as_deref().is_none_or(|parent| {
                    record
                        .data
                        .get(parent_field)
                        .is_some_and(|value| matches_key(value, parent))
                })
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
