//! CMDB read API backend

use async_trait::async_trait;
use log::debug;

use super::TargetBackend;
use crate::api::{CmdbClient, StoredDocument};
use crate::error::SyncError;
use crate::record::Record;
use crate::schema::EntityType;

/// Queries the CMDB per (entity, scope) through its filter endpoints
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: CmdbClient,
}

impl HttpBackend {
    pub fn new(client: CmdbClient) -> Self {
        Self { client }
    }

    /// Relative endpoint listing `entity` documents under `scope`
    pub fn url_endpoint(entity: EntityType, scope: Option<&str>) -> String {
        let Some(scope) = scope else {
            return format!("{}/list?include_docs=true", entity);
        };
        let scope = urlencoding::encode(scope);
        match entity {
            EntityType::Provider => format!("provider/id/{}?include_docs=true", scope),
            EntityType::Service => {
                format!("service/filters/provider_id/{}?include_docs=true", scope)
            }
            EntityType::Tenant => format!("tenant/filters/service_id/{}?include_docs=true", scope),
            EntityType::Image => format!("image/filters/tenant_id/{}?include_docs=true", scope),
            EntityType::Flavor => format!("flavor/filters/tenant_id/{}?include_docs=true", scope),
        }
    }
}

#[async_trait]
impl TargetBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, entity: EntityType, scope: Option<&str>) -> Result<Vec<Record>, SyncError> {
        let url_endpoint = Self::url_endpoint(entity, scope);
        let response = self.client.get(&url_endpoint).await.map_err(|e| {
            SyncError::TargetBackendUnreachable {
                entity,
                scope: scope.map(str::to_string),
                reason: format!("{:#}", e),
            }
        })?;

        let documents = match response.into_documents() {
            Ok(documents) => documents,
            Err(body) => {
                debug!("Got CMDB error in HTTP request: {}", body);
                return Ok(Vec::new());
            }
        };

        // A document outside the schema aborts the run rather than hiding its scope
        documents
            .into_iter()
            .map(StoredDocument::into_record)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_http_client;
    use crate::sync::target::TargetIndex;
    use reqwest::Url;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> HttpBackend {
        let http = build_http_client(Duration::from_secs(5)).unwrap();
        let base = Url::parse(&format!("{}/cmdb/v1", server.uri())).unwrap();
        HttpBackend::new(CmdbClient::new(http, base))
    }

    #[test]
    fn test_url_endpoints() {
        assert_eq!(
            HttpBackend::url_endpoint(EntityType::Provider, Some("site-A")),
            "provider/id/site-A?include_docs=true"
        );
        assert_eq!(
            HttpBackend::url_endpoint(EntityType::Tenant, Some("svc-1")),
            "tenant/filters/service_id/svc-1?include_docs=true"
        );
        assert_eq!(
            HttpBackend::url_endpoint(EntityType::Flavor, Some("a b")),
            "flavor/filters/tenant_id/a%20b?include_docs=true"
        );
        assert_eq!(
            HttpBackend::url_endpoint(EntityType::Image, None),
            "image/list?include_docs=true"
        );
    }

    #[tokio::test]
    async fn test_fetch_rows() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cmdb/v1/service/filters/provider_id/site-A"))
            .and(query_param("include_docs", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_rows": 1,
                "offset": 0,
                "rows": [{"id": "svc-1", "doc": {
                    "_id": "svc-1", "_rev": "1-a", "type": "service",
                    "data": {"endpoint": "https://a:5000", "provider_id": "site-A"}
                }}]
            })))
            .mount(&mock_server)
            .await;

        let records = backend(&mock_server)
            .fetch(EntityType::Service, Some("site-A"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_id.as_deref(), Some("svc-1"));
    }

    #[tokio::test]
    async fn test_fetch_single_provider_document() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cmdb/v1/provider/id/site-A"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_id": "site-A", "_rev": "7-p", "type": "provider", "data": {"name": "site-A"}
            })))
            .mount(&mock_server)
            .await;

        let records = backend(&mock_server)
            .fetch(EntityType::Provider, Some("site-A"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].target_revision.as_deref(), Some("7-p"));
    }

    #[tokio::test]
    async fn test_error_envelope_means_no_records() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cmdb/v1/provider/id/site-Z"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"error": "not_found", "reason": "missing"})),
            )
            .mount(&mock_server)
            .await;

        let records = backend(&mock_server)
            .fetch(EntityType::Provider, Some("site-Z"))
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_type_in_rows_is_fatal() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/cmdb/v1/tenant/filters/service_id/svc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_rows": 2,
                "offset": 0,
                "rows": [
                    {"id": "ten-1", "doc": {
                        "_id": "ten-1", "_rev": "1-t", "type": "tenant",
                        "data": {"tenant_id": "t1", "service": "svc-1"}
                    }},
                    {"id": "net-1", "doc": {
                        "_id": "net-1", "_rev": "1-n", "type": "network",
                        "data": {"service": "svc-1"}
                    }}
                ]
            })))
            .mount(&mock_server)
            .await;

        let mut index = TargetIndex::new(Box::new(backend(&mock_server)));
        let err = index
            .find(EntityType::Tenant, &json!("t1"), Some("svc-1"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::UnknownEntityType {
                value: "network".to_string()
            }
        );
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_server_failure_is_unreachable() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&mock_server)
            .await;

        let err = backend(&mock_server)
            .fetch(EntityType::Tenant, Some("svc-1"))
            .await
            .unwrap_err();
        match err {
            SyncError::TargetBackendUnreachable { entity, scope, reason } => {
                assert_eq!(entity, EntityType::Tenant);
                assert_eq!(scope.as_deref(), Some("svc-1"));
                assert!(reason.contains("502"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
