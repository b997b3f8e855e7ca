//! Firestore REST v1 backend.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Map, Value, json};
use tracing::instrument;
use url::Url;

use super::codec::{decode_fields, encode_fields, encode_value};
use super::{
    Direction, Document, DocumentStore, FieldOp, Filter, FilterOp, Query, StoreError, assign,
};
use crate::firebase::AccessTokenProvider;

/// Public Firestore REST endpoint.
pub const FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// [`DocumentStore`] backed by a Firestore database's default instance.
#[derive(Clone)]
pub struct FirestoreStore {
    inner: Arc<FirestoreStoreInner>,
}

struct FirestoreStoreInner {
    client: reqwest::Client,
    tokens: Arc<AccessTokenProvider>,
    endpoint: String,
    /// `projects/<id>/databases/(default)/documents`
    root: String,
}

impl FirestoreStore {
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        tokens: Arc<AccessTokenProvider>,
        project_id: &str,
    ) -> Self {
        Self::with_endpoint(client, tokens, project_id, FIRESTORE_ENDPOINT)
    }

    /// Talk to a non-default endpoint (emulator, tests).
    #[must_use]
    pub fn with_endpoint(
        client: reqwest::Client,
        tokens: Arc<AccessTokenProvider>,
        project_id: &str,
        endpoint: &str,
    ) -> Self {
        Self {
            inner: Arc::new(FirestoreStoreInner {
                client,
                tokens,
                endpoint: endpoint.trim_end_matches('/').to_owned(),
                root: format!("projects/{project_id}/databases/(default)/documents"),
            }),
        }
    }

    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{}", self.inner.root, urlencoding::encode(id))
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{name}", self.inner.endpoint)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let token = self.inner.tokens.access_token().await?;
        Ok(request.bearer_auth(token.expose_secret()).send().await?)
    }

    async fn check(
        response: reqwest::Response,
        collection: &str,
        id: &str,
    ) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound {
                collection: collection.to_owned(),
                id: id.to_owned(),
            });
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

/// Quote a field path segment unless it is a plain identifier.
fn quote_segment(segment: &str) -> String {
    let simple = segment
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        segment.to_owned()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn field_path(path: &str) -> String {
    path.split('.').map(quote_segment).collect::<Vec<_>>().join(".")
}

fn document_id(name: &str) -> String {
    let raw = name.rsplit('/').next().unwrap_or(name);
    urlencoding::decode(raw).map_or_else(|_| raw.to_owned(), |id| id.into_owned())
}

fn encode_filter(filter: &Filter) -> Value {
    let op = match filter.op {
        FilterOp::Equal => "EQUAL",
        FilterOp::GreaterOrEqual => "GREATER_THAN_OR_EQUAL",
    };
    json!({
        "fieldFilter": {
            "field": { "fieldPath": field_path(&filter.field) },
            "op": op,
            "value": encode_value(&filter.value),
        }
    })
}

fn structured_query(collection: &str, query: &Query) -> Value {
    let mut structured = Map::new();
    structured.insert("from".into(), json!([{ "collectionId": collection }]));

    match query.filters.as_slice() {
        [] => {}
        [single] => {
            structured.insert("where".into(), encode_filter(single));
        }
        many => {
            structured.insert(
                "where".into(),
                json!({
                    "compositeFilter": {
                        "op": "AND",
                        "filters": many.iter().map(encode_filter).collect::<Vec<_>>(),
                    }
                }),
            );
        }
    }

    if let Some((field, direction)) = &query.order {
        let direction = match direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        structured.insert(
            "orderBy".into(),
            json!([{ "field": { "fieldPath": field_path(field) }, "direction": direction }]),
        );
    }
    if let Some(limit) = query.limit {
        structured.insert("limit".into(), json!(limit));
    }

    json!({ "structuredQuery": structured })
}

fn object(collection: &str, data: Value) -> Result<Map<String, Value>, StoreError> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Codec(format!(
            "{collection}: documents must be JSON objects, got {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let url = self.url(&self.document_name(collection, id));
        let response = self.send(self.inner.client.get(url)).await?;
        match Self::check(response, collection, id).await {
            Ok(response) => {
                let body: Value = response.json().await?;
                Ok(Some(decode_fields(body.get("fields"))?))
            }
            Err(StoreError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, data))]
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        let fields = object(collection, data)?;
        let url = self.url(&self.document_name(collection, id));
        let request = self
            .inner
            .client
            .patch(url)
            .json(&json!({ "fields": encode_fields(&fields) }));
        Self::check(self.send(request).await?, collection, id).await?;
        Ok(())
    }

    #[instrument(skip(self, fields))]
    async fn merge(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut url = Url::parse(&self.url(&self.document_name(collection, id)))
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            for key in fields.keys() {
                pairs.append_pair("updateMask.fieldPaths", &quote_segment(key));
            }
        }
        let request = self
            .inner
            .client
            .patch(url)
            .json(&json!({ "fields": encode_fields(&fields) }));
        Self::check(self.send(request).await?, collection, id).await?;
        Ok(())
    }

    #[instrument(skip(self, ops))]
    async fn update(
        &self,
        collection: &str,
        id: &str,
        ops: Vec<(String, FieldOp)>,
    ) -> Result<(), StoreError> {
        let mut fields = Map::new();
        let mut mask = Vec::new();
        let mut transforms = Vec::new();
        for (path, op) in ops {
            match op {
                FieldOp::Set(value) => {
                    assign(&mut fields, &path, value);
                    mask.push(field_path(&path));
                }
                FieldOp::ArrayUnion(values) => transforms.push(json!({
                    "fieldPath": field_path(&path),
                    "appendMissingElements": {
                        "values": values.iter().map(encode_value).collect::<Vec<_>>(),
                    }
                })),
            }
        }

        let write = json!({
            "update": {
                "name": self.document_name(collection, id),
                "fields": encode_fields(&fields),
            },
            "updateMask": { "fieldPaths": mask },
            "updateTransforms": transforms,
            "currentDocument": { "exists": true },
        });
        let url = format!("{}:commit", self.url(&self.inner.root));
        let request = self
            .inner
            .client
            .post(url)
            .json(&json!({ "writes": [write] }));
        Self::check(self.send(request).await?, collection, id).await?;
        Ok(())
    }

    #[instrument(skip(self, data))]
    async fn add(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        let fields = object(collection, data)?;
        let url = self.url(&format!("{}/{collection}", self.inner.root));
        let request = self
            .inner
            .client
            .post(url)
            .json(&json!({ "fields": encode_fields(&fields) }));
        let response = Self::check(self.send(request).await?, collection, "").await?;
        let created: Value = response.json().await?;
        created
            .get("name")
            .and_then(Value::as_str)
            .map(document_id)
            .ok_or_else(|| StoreError::Codec("created document has no name".to_string()))
    }

    #[instrument(skip(self, query))]
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.url(&self.inner.root));
        let request = self
            .inner
            .client
            .post(url)
            .json(&structured_query(collection, query));
        let response = Self::check(self.send(request).await?, collection, "").await?;
        let rows: Vec<Value> = response.json().await?;

        rows.iter()
            .filter_map(|row| row.get("document"))
            .map(|doc| {
                let name = doc
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| StoreError::Codec("query result has no name".to_string()))?;
                Ok(Document {
                    id: document_id(name),
                    data: decode_fields(doc.get("fields"))?,
                })
            })
            .collect()
    }
}
