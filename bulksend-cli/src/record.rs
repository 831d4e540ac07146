//! Records flowing from CIP through the reconciliation engine into the CMDB

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::EntityType;

/// A CIP or CMDB document
///
/// Serializes in the CMDB document shape (`_id`, `_rev`, `_deleted`, `type`,
/// `data`). CIP input simply lacks the underscore fields. Unknown top-level
/// fields from the CMDB are carried through untouched so tombstones are
/// written back exactly as they were read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// CMDB id, set once matched or newly assigned
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// CMDB revision, set only when matched against an existing document
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub target_revision: Option<String>,
    /// Tombstone flag for documents that no longer have a CIP counterpart
    #[serde(rename = "_deleted", default, skip_serializing_if = "is_false")]
    pub deleted: bool,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Record {
    /// Create a record without CMDB identity
    pub fn new(entity_type: EntityType, data: Map<String, Value>) -> Self {
        Record {
            target_id: None,
            target_revision: None,
            deleted: false,
            entity_type,
            data,
            extra: Map::new(),
        }
    }

    /// Create a record with an existing CMDB id and revision
    pub fn stored(
        entity_type: EntityType,
        target_id: impl Into<String>,
        target_revision: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Record {
            target_id: Some(target_id.into()),
            target_revision: Some(target_revision.into()),
            ..Record::new(entity_type, data)
        }
    }

    /// Value of this record's business-key field
    pub fn business_key(&self) -> Option<&Value> {
        self.data
            .get(self.entity_type.business_key_field())
            .filter(|v| !v.is_null())
    }

    pub fn has_business_key(&self, key: &Value) -> bool {
        self.business_key() == Some(key)
    }

    /// Value of this record's parent-reference field
    pub fn parent_ref(&self) -> Option<&Value> {
        self.entity_type
            .parent_ref_field()
            .and_then(|field| self.data.get(field))
    }

    /// Whether this record belongs to the given CMDB scope (its parent's id,
    /// or for the root, its own id)
    pub fn in_scope(&self, scope: &str) -> bool {
        self.data
            .get(self.entity_type.scope_field())
            .is_some_and(|value| matches_key(value, scope))
    }

    /// Copy of this record marked for deletion, otherwise unchanged
    pub fn tombstone(&self) -> Record {
        Record {
            deleted: true,
            ..self.clone()
        }
    }
}

/// Render a business-key value as the string used for CMDB ids and scopes
pub fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether a data value identifies the given key string
pub fn matches_key(value: &Value, key: &str) -> bool {
    match value {
        Value::String(s) => s == key,
        Value::Null => false,
        other => other.to_string() == key,
    }
}
