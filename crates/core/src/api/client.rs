//! PDFMonkey REST API client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::api::RemoteApi;
use crate::errors::ApiError;
use crate::models::{RemoteErrors, ResourceSnapshot, ResourceType, UpdateOutcome, UpdatePayload};

pub const DEFAULT_API_URL: &str = "https://api.pdfmonkey.io/api/v1";

/// Asynchronous PDFMonkey REST API client.
#[derive(Clone)]
pub struct PdfMonkeyClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl PdfMonkeyClient {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("pdfmonkey-cli/", env!("CARGO_PKG_VERSION"))),
        );
        let http = reqwest::Client::builder().default_headers(headers).build()?;
        info!(api_url = %api_url, "created PdfMonkeyClient");
        Ok(Self {
            http,
            api_url,
            api_key: api_key.into(),
        })
    }

    fn resource_url(&self, resource_type: ResourceType, id: &str) -> String {
        format!("{}/{}/{}", self.api_url, resource_type.collection(), id)
    }

    /// Read a response body as JSON, keeping the status for error reporting.
    async fn read_json(resp: reqwest::Response) -> Result<(u16, Value), ApiError> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        match serde_json::from_str(&body) {
            Ok(json) => Ok((status, json)),
            Err(_) => Err(ApiError::Status { status, body }),
        }
    }

    /// Split a response into remote errors or the wrapped resource object.
    fn extract(
        resource_type: ResourceType,
        status: u16,
        json: &Value,
    ) -> Result<Result<ResourceSnapshot, RemoteErrors>, ApiError> {
        if let Some(errors) = json.get("errors") {
            let errors: RemoteErrors = serde_json::from_value(errors.clone())
                .map_err(|e| ApiError::Parse(format!("unreadable errors payload: {}", e)))?;
            return Ok(Err(errors));
        }

        if !(200..300).contains(&status) {
            return Err(ApiError::Status {
                status,
                body: json.to_string(),
            });
        }

        let resource = json.get(resource_type.response_key()).ok_or_else(|| {
            ApiError::Parse(format!("response has no '{}' key", resource_type.response_key()))
        })?;
        ResourceSnapshot::from_json(resource_type, resource).map(Ok)
    }
}

#[async_trait]
impl RemoteApi for PdfMonkeyClient {
    #[instrument(skip(self))]
    async fn fetch(
        &self,
        resource_type: ResourceType,
        id: &str,
    ) -> Result<Option<ResourceSnapshot>, ApiError> {
        let resp = self
            .http
            .get(self.resource_url(resource_type, id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let (status, json) = Self::read_json(resp).await?;

        match Self::extract(resource_type, status, &json)? {
            Ok(snapshot) => {
                debug!(updated_at = %snapshot.updated_at, "fetched {}", resource_type);
                Ok(Some(snapshot))
            }
            Err(errors) => {
                error!("{}", errors.format());
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, payload))]
    async fn update(
        &self,
        resource_type: ResourceType,
        id: &str,
        payload: &UpdatePayload,
    ) -> Result<UpdateOutcome, ApiError> {
        let resp = self
            .http
            .patch(self.resource_url(resource_type, id))
            .bearer_auth(&self.api_key)
            .json(payload)
            .send()
            .await?;
        let (status, json) = Self::read_json(resp).await?;

        match Self::extract(resource_type, status, &json)? {
            Ok(snapshot) => {
                info!(updated_at = %snapshot.updated_at, "updated {}", resource_type);
                Ok(UpdateOutcome::Updated(snapshot))
            }
            Err(errors) => Ok(UpdateOutcome::Rejected(errors)),
        }
    }

    #[instrument(skip(self))]
    async fn debug_preview_url(&self, template_id: &str) -> Result<String, ApiError> {
        let url = format!("{}/document_template_debugs/{}", self.api_url, template_id);
        let resp = self.http.get(&url).bearer_auth(&self.api_key).send().await?;
        let (status, json) = Self::read_json(resp).await?;

        if let Some(errors) = json.get("errors") {
            return Err(ApiError::Status {
                status,
                body: errors.to_string(),
            });
        }

        json.pointer("/document_template_debug/url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ApiError::Parse("debug response has no url".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use axum::extract::Path;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    async fn get_template(Path(id): Path<String>, headers: AxumHeaders) -> (StatusCode, Json<Value>) {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer secret");
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "errors": [{ "status": 401, "title": "Unauthorized", "detail": "bad key" }] })),
            );
        }
        (
            StatusCode::OK,
            Json(json!({ "document_template": {
                "id": id,
                "updated_at": "2024-05-01T08:00:00Z",
                "body_draft": "<p>Hi</p>",
                "scss_style_draft": "",
                "sample_data_draft": "{}",
                "preview_url": "https://preview.example/1"
            }})),
        )
    }

    async fn patch_template(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
        if body["body_draft"] == "broken" {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": { "body_draft": ["is invalid"] } })),
            );
        }
        (
            StatusCode::OK,
            Json(json!({ "document_template": {
                "id": "tpl",
                "updated_at": "2024-05-02T08:00:00Z",
                "body_draft": body["body_draft"],
                "scss_style_draft": body["scss_style_draft"],
                "sample_data_draft": body["sample_data_draft"]
            }})),
        )
    }

    async fn debug_url() -> Json<Value> {
        Json(json!({ "document_template_debug": { "url": "https://debug.example/tpl" } }))
    }

    async fn spawn_api() -> String {
        let app = Router::new()
            .route("/document_templates/:id", get(get_template).patch(patch_template))
            .route("/document_template_debugs/:id", get(debug_url));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn payload(body: &str) -> UpdatePayload {
        let mut fields = BTreeMap::new();
        fields.insert("body_draft", body.to_string());
        fields.insert("scss_style_draft", String::new());
        fields.insert("sample_data_draft", "{}".to_string());
        UpdatePayload(fields)
    }

    #[tokio::test]
    async fn test_fetch_template() {
        let client = PdfMonkeyClient::new(spawn_api().await, "secret").unwrap();
        let snapshot = client.fetch(ResourceType::Template, "tpl").await.unwrap().unwrap();
        assert_eq!(snapshot.id, "tpl");
        assert_eq!(snapshot.fields["body_draft"].as_deref(), Some("<p>Hi</p>"));
        assert_eq!(snapshot.preview_url.as_deref(), Some("https://preview.example/1"));
    }

    #[tokio::test]
    async fn test_fetch_with_errors_yields_none() {
        let client = PdfMonkeyClient::new(spawn_api().await, "wrong").unwrap();
        let snapshot = client.fetch(ResourceType::Template, "tpl").await.unwrap();
        assert!(snapshot.is_none());
    }

    #[tokio::test]
    async fn test_update_success_and_rejection() {
        let client = PdfMonkeyClient::new(spawn_api().await, "secret").unwrap();

        match client.update(ResourceType::Template, "tpl", &payload("<p>new</p>")).await.unwrap() {
            UpdateOutcome::Updated(snapshot) => {
                assert_eq!(snapshot.fields["body_draft"].as_deref(), Some("<p>new</p>"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        match client.update(ResourceType::Template, "tpl", &payload("broken")).await.unwrap() {
            UpdateOutcome::Rejected(errors) => assert_eq!(errors.format(), "HTML: is invalid"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_debug_preview_url() {
        let client = PdfMonkeyClient::new(spawn_api().await, "secret").unwrap();
        let url = client.debug_preview_url("tpl").await.unwrap();
        assert_eq!(url, "https://debug.example/tpl");

        let snapshot = client.fetch(ResourceType::Template, "tpl").await.unwrap().unwrap();
        let normal = crate::api::preview_url(&client, &snapshot, false).await.unwrap();
        assert_eq!(normal.as_deref(), Some("https://preview.example/1"));
        let debug = crate::api::preview_url(&client, &snapshot, true).await.unwrap();
        assert_eq!(debug.as_deref(), Some("https://debug.example/tpl"));
    }

    #[tokio::test]
    async fn test_non_json_response_is_status_error() {
        let client = PdfMonkeyClient::new(spawn_api().await, "secret").unwrap();
        let err = client.fetch(ResourceType::Snippet, "missing").await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 404, .. }));
    }
}
