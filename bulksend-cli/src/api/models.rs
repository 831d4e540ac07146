//! Wire shapes of CMDB responses and requests

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SyncError;
use crate::record::{Record, key_string};
use crate::schema::EntityType;

/// Any body returned by a CMDB read endpoint
///
/// Filter endpoints answer with a view result (`rows`), id endpoints answer
/// with the bare document, and failures answer with an `error` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CmdbResponse {
    Error(CmdbErrorBody),
    Rows(CmdbRows),
    Document(StoredDocument),
}

/// `{"error": ..., "reason": ...}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CmdbErrorBody {
    pub error: Value,
    #[serde(default)]
    pub reason: Option<Value>,
}

impl std::fmt::Display for CmdbErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "{} ({})", self.error, reason),
            None => write!(f, "{}", self.error),
        }
    }
}

/// View result with `include_docs=true`
#[derive(Debug, Clone, Deserialize)]
pub struct CmdbRows {
    #[serde(default)]
    pub total_rows: Option<u64>,
    pub rows: Vec<CmdbRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmdbRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub doc: Option<StoredDocument>,
}

/// A CMDB document whose `type` has not been checked yet
///
/// Kept apart from `Record` so one document of an unknown type fails on its
/// own instead of making the whole response undecodable.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredDocument {
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StoredDocument {
    /// # Errors
    /// `UnknownEntityType` for a `type` outside the schema, `InvalidDocument`
    /// when the rest of the document does not fit the record shape.
    pub fn into_record(self) -> Result<Record, SyncError> {
        let entity: EntityType = self.entity_type.parse()?;
        let id = self.fields.get("_id").map(key_string);

        let mut fields = self.fields;
        fields.insert("type".to_string(), Value::String(entity.as_str().to_string()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| SyncError::InvalidDocument {
            id,
            reason: e.to_string(),
        })
    }
}

impl CmdbResponse {
    /// Flatten the response into its documents, or hand back the error envelope
    pub fn into_documents(self) -> Result<Vec<StoredDocument>, CmdbErrorBody> {
        match self {
            CmdbResponse::Error(body) => Err(body),
            CmdbResponse::Rows(rows) => Ok(rows.rows.into_iter().filter_map(|row| row.doc).collect()),
            CmdbResponse::Document(doc) => Ok(vec![doc]),
        }
    }
}

/// Request body of `POST {db}/_bulk_docs`
#[derive(Debug, Serialize)]
pub struct BulkDocs<'a> {
    pub docs: &'a [Record],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EntityType;
    use serde_json::json;

    #[test]
    fn test_decode_rows() {
        let body = json!({
            "total_rows": 2,
            "offset": 0,
            "rows": [
                {"id": "a", "key": "svc", "value": null,
                 "doc": {"_id": "a", "_rev": "1-a", "type": "tenant", "data": {"tenant_id": "t1"}}},
                {"id": "b", "key": "svc", "value": null}
            ]
        });
        let response: CmdbResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(response, CmdbResponse::Rows(_)));

        let docs = response.into_documents().unwrap();
        assert_eq!(docs.len(), 1);
        let record = docs[0].clone().into_record().unwrap();
        assert_eq!(record.entity_type, EntityType::Tenant);
        assert_eq!(record.target_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_decode_single_document() {
        let body = json!({"_id": "site-A", "_rev": "4-x", "type": "provider", "data": {"name": "site-A"}});
        let response: CmdbResponse = serde_json::from_value(body).unwrap();

        let docs = response.into_documents().unwrap();
        assert_eq!(docs.len(), 1);
        let record = docs[0].clone().into_record().unwrap();
        assert_eq!(record.target_revision.as_deref(), Some("4-x"));
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = json!({"error": "not_found", "reason": "missing"});
        let response: CmdbResponse = serde_json::from_value(body).unwrap();

        let err = response.into_documents().unwrap_err();
        assert_eq!(err.error, json!("not_found"));
        assert_eq!(err.to_string(), "\"not_found\" (\"missing\")");
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(serde_json::from_value::<CmdbResponse>(json!({"hello": "world"})).is_err());
    }

    #[test]
    fn test_unknown_type_fails_per_document() {
        let body = json!({
            "total_rows": 2,
            "rows": [
                {"id": "ten-1", "doc": {"_id": "ten-1", "type": "tenant", "data": {"tenant_id": "t1"}}},
                {"id": "net-1", "doc": {"_id": "net-1", "type": "network", "data": {}}}
            ]
        });
        let response: CmdbResponse = serde_json::from_value(body).unwrap();
        let docs = response.into_documents().unwrap();
        assert_eq!(docs.len(), 2);

        assert!(docs[0].clone().into_record().is_ok());
        assert_eq!(
            docs[1].clone().into_record().unwrap_err(),
            SyncError::UnknownEntityType {
                value: "network".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_document_is_invalid() {
        let body = json!({"_id": "x", "type": "image", "data": "not an object"});
        let response: CmdbResponse = serde_json::from_value(body).unwrap();
        let err = response.into_documents().unwrap()[0]
            .clone()
            .into_record()
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidDocument { .. }));
    }

    #[test]
    fn test_bulk_envelope() {
        let docs = vec![Record::new(
            EntityType::Image,
            json!({"image_id": "i"}).as_object().cloned().unwrap(),
        )];
        let body = serde_json::to_value(BulkDocs { docs: &docs }).unwrap();
        assert_eq!(body, json!({"docs": [{"type": "image", "data": {"image_id": "i"}}]}));
    }
}
