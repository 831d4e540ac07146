//! CMDB snapshot loaded from a JSON file

use std::io::Read;
use std::path::Path;

use async_trait::async_trait;

use super::TargetBackend;
use crate::error::SyncError;
use crate::record::Record;
use crate::schema::EntityType;

/// Static CMDB snapshot: a JSON array of `{_id, _rev, type, data}` documents
#[derive(Debug, Clone, Default)]
pub struct SnapshotBackend {
    records: Vec<Record>,
}

impl SnapshotBackend {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SyncError> {
        let records: Vec<Record> =
            serde_json::from_reader(reader).map_err(|e| SyncError::InvalidSnapshot {
                reason: e.to_string(),
            })?;
        Ok(Self::from_records(records))
    }

    pub fn from_path(path: &Path) -> Result<Self, SyncError> {
        let file = std::fs::File::open(path).map_err(|e| SyncError::InvalidSnapshot {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let backend = Self::from_reader(std::io::BufReader::new(file))?;
        log::info!(
            "Loaded {} CMDB records from {}",
            backend.records.len(),
            path.display()
        );
        Ok(backend)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl TargetBackend for SnapshotBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, entity: EntityType, scope: Option<&str>) -> Result<Vec<Record>, SyncError> {
        Ok(self
            .records
            .iter()
            .filter(|record| record.entity_type == entity)
            .filter(|record| scope.is_none_or(|scope| record.in_scope(scope)))
            .cloned()
            .collect())
    }
}
