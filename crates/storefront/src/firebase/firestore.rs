//! Cloud Firestore REST v1 client.
//!
//! Documents live at
//! `v1/projects/{project}/databases/(default)/documents/{collection}/{id}`
//! and carry their fields as typed values:
//!
//! ```json
//! { "name": ".../documents/users/abc", "fields": { "role": { "stringValue": "admin" } } }
//! ```
//!
//! Field kinds the storefront does not use (references, geo points, bytes) are
//! skipped on decode, so lookups of such fields see them as absent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::instrument;
use url::Url;

use super::{endpoint, excerpt};
use crate::backend::{Document, DocumentStore, FieldValue, Fields, IdToken, StoreError};
use crate::config::FirebaseConfig;

const PAGE_SIZE: &str = "300";

/// Document store backed by Cloud Firestore.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    client: reqwest::Client,
    base_url: Url,
    project_id: String,
    api_key: SecretString,
}

#[derive(Deserialize)]
struct WireDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<WireDocument>,
    next_page_token: Option<String>,
}

impl Firestore {
    #[must_use]
    pub fn new(client: reqwest::Client, config: &FirebaseConfig) -> Self {
        Self {
            inner: Arc::new(FirestoreInner {
                client,
                base_url: config.firestore_url.clone(),
                project_id: config.project_id.clone(),
                api_key: config.api_key.clone(),
            }),
        }
    }

    /// URL of a collection, or of one document when `id` is given.
    fn url(&self, collection: &str, id: Option<&str>) -> Url {
        let mut segments = vec![
            "v1",
            "projects",
            self.inner.project_id.as_str(),
            "databases",
            "(default)",
            "documents",
            collection,
        ];
        segments.extend(id);
        let mut url = endpoint(&self.inner.base_url, &segments);
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        url
    }

    /// Send a request with the caller's ID token and return the status and body.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        token: Option<&IdToken>,
    ) -> Result<(reqwest::StatusCode, String), StoreError> {
        let request = match token {
            Some(token) => request.bearer_auth(token.expose()),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Network(e.without_url().to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.without_url().to_string()))?;
        Ok((status, text))
    }
}

#[async_trait]
impl DocumentStore for Firestore {
    #[instrument(skip(self, token))]
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
        token: Option<&IdToken>,
    ) -> Result<Option<Document>, StoreError> {
        let request = self.inner.client.get(self.url(collection, Some(id)));
        let (status, text) = self.send(request, token).await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        check_status(status, &text)?;
        parse_document(&text).map(Some)
    }

    #[instrument(skip(self, token))]
    async fn list_documents(
        &self,
        collection: &str,
        token: Option<&IdToken>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.url(collection, None);
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", PAGE_SIZE);
                if let Some(page_token) = &page_token {
                    query.append_pair("pageToken", page_token);
                }
            }

            let (status, text) = self.send(self.inner.client.get(url), token).await?;
            check_status(status, &text)?;

            let page: ListResponse =
                serde_json::from_str(&text).map_err(|e| StoreError::Malformed(e.to_string()))?;
            documents.extend(page.documents.into_iter().map(decode_document));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(documents)
    }

    #[instrument(skip(self, fields, token))]
    async fn create_document(
        &self,
        collection: &str,
        fields: Fields,
        token: Option<&IdToken>,
    ) -> Result<Document, StoreError> {
        let request = self
            .inner
            .client
            .post(self.url(collection, None))
            .json(&encode_map(&fields));
        let (status, text) = self.send(request, token).await?;
        check_status(status, &text)?;
        parse_document(&text)
    }

    #[instrument(skip(self, fields, token))]
    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        token: Option<&IdToken>,
    ) -> Result<(), StoreError> {
        let request = self
            .inner
            .client
            .patch(self.url(collection, Some(id)))
            .json(&encode_map(&fields));
        let (status, text) = self.send(request, token).await?;
        check_status(status, &text)
    }

    #[instrument(skip(self, token))]
    async fn delete_document(
        &self,
        collection: &str,
        id: &str,
        token: Option<&IdToken>,
    ) -> Result<(), StoreError> {
        let request = self.inner.client.delete(self.url(collection, Some(id)));
        let (status, text) = self.send(request, token).await?;
        check_status(status, &text)
    }
}

fn check_status(status: reqwest::StatusCode, body: &str) -> Result<(), StoreError> {
    if status.is_success() {
        return Ok(());
    }

    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| excerpt(body));

    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            Err(StoreError::Permission(message))
        }
        _ => {
            tracing::error!(status = %status, body = %excerpt(body), "Firestore returned non-success status");
            Err(StoreError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn parse_document(body: &str) -> Result<Document, StoreError> {
    let wire: WireDocument =
        serde_json::from_str(body).map_err(|e| StoreError::Malformed(e.to_string()))?;
    Ok(decode_document(wire))
}

fn decode_document(wire: WireDocument) -> Document {
    let id = wire
        .name
        .rsplit_once('/')
        .map_or(wire.name.as_str(), |(_, id)| id)
        .to_owned();

    Document {
        id,
        fields: decode_fields(&wire.fields),
    }
}

fn decode_fields(fields: &Map<String, Value>) -> Fields {
    fields
        .iter()
        .filter_map(|(name, value)| Some((name.clone(), decode_value(value)?)))
        .collect()
}

fn decode_value(value: &Value) -> Option<FieldValue> {
    let (kind, inner) = value.as_object()?.iter().next()?;
    match kind.as_str() {
        "stringValue" => inner.as_str().map(|s| FieldValue::String(s.to_owned())),
        "doubleValue" => inner.as_f64().map(FieldValue::Double),
        // 64-bit integers are sent as strings
        "integerValue" => match inner {
            Value::String(s) => s.parse().ok().map(FieldValue::Integer),
            other => other.as_i64().map(FieldValue::Integer),
        },
        "booleanValue" => inner.as_bool().map(FieldValue::Boolean),
        "timestampValue" => inner
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc))),
        "arrayValue" => {
            // An empty array is sent as `{}`
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(decode_value).collect())
                .unwrap_or_default();
            Some(FieldValue::Array(values))
        }
        "mapValue" => {
            let fields = inner
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default();
            Some(FieldValue::Map(fields))
        }
        "nullValue" => Some(FieldValue::Null),
        _ => None,
    }
}

fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Boolean(b) => json!({ "booleanValue": b }),
        FieldValue::Timestamp(ts) => json!({ "timestampValue": ts.to_rfc3339() }),
        FieldValue::Array(values) => {
            let values: Vec<Value> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Map(fields) => json!({ "mapValue": encode_map(fields) }),
        FieldValue::Null => json!({ "nullValue": null }),
    }
}

fn encode_map(fields: &Fields) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(name, value)| (name.clone(), encode_value(value)))
        .collect();
    json!({ "fields": encoded })
}
