//! Firestore REST API client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use gcp_auth::TokenProvider;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::error::{FirestoreError, FirestoreResult};
use crate::retry::{with_retry, RetryConfig};
use crate::value::{Document, ListDocumentsResponse, Value};

const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Firestore client configuration.
#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl FirestoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> FirestoreResult<Self> {
        Ok(Self {
            project_id: std::env::var("GCP_PROJECT_ID")
                .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
                .map_err(|_| FirestoreError::auth_error("GCP_PROJECT_ID not set"))?,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        })
    }
}

/// Firestore REST API client.
pub struct FirestoreClient {
    http: Client,
    auth: Arc<dyn TokenProvider>,
    config: FirestoreConfig,
    base_url: String,
}

impl Clone for FirestoreClient {
    fn clone(&self) -> Self {
        Self {
            http: self.http.clone(),
            auth: Arc::clone(&self.auth),
            config: self.config.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

impl FirestoreClient {
    /// Create a new Firestore client.
    pub async fn new(config: FirestoreConfig) -> FirestoreResult<Self> {
        let auth = gcp_auth::provider()
            .await
            .map_err(|e| FirestoreError::auth_error(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(FirestoreError::Network)?;

        let base_url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
            config.project_id, config.database_id
        );

        Ok(Self {
            http,
            auth,
            config,
            base_url,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> FirestoreResult<Self> {
        let config = FirestoreConfig::from_env()?;
        Self::new(config).await
    }

    async fn get_token(&self) -> FirestoreResult<String> {
        let token = self
            .auth
            .token(&[DATASTORE_SCOPE])
            .await
            .map_err(|e| FirestoreError::auth_error(e.to_string()))?;
        Ok(token.as_str().to_string())
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Get a document.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> FirestoreResult<Option<Document>> {
        metrics::counter!("tscout_firestore_ops_total", "op" => "get").increment(1);
        let url = self.document_path(collection, doc_id);
        let token = self.get_token().await?;
        let http = self.http.clone();

        with_retry(&self.config.retry, "get_document", move || {
            let http = http.clone();
            let url = url.clone();
            let token = token.clone();
            async move {
                let response = http.get(&url).bearer_auth(&token).send().await?;
                match response.status() {
                    StatusCode::OK => {
                        let doc: Document = response.json().await?;
                        Ok(Some(doc))
                    }
                    StatusCode::NOT_FOUND => Ok(None),
                    status => Err(error_from_status(status, "GET", &url, response).await),
                }
            }
        })
        .await
    }

    /// Create a document. Fails if it already exists.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> FirestoreResult<Document> {
        metrics::counter!("tscout_firestore_ops_total", "op" => "create").increment(1);
        let url = format!("{}/{}?documentId={}", self.base_url, collection, doc_id);
        let token = self.get_token().await?;
        let body = Document::new(fields);

        with_retry(&self.config.retry, "create_document", || async {
            let response = self
                .http
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?;
            match response.status() {
                StatusCode::OK | StatusCode::CREATED => Ok(response.json().await?),
                StatusCode::CONFLICT => Err(FirestoreError::AlreadyExists(format!(
                    "{collection}/{doc_id}"
                ))),
                status => Err(error_from_status(status, "POST", &url, response).await),
            }
        })
        .await
    }

    /// Update a document, replacing (or with a mask, merging) its fields.
    pub async fn update_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Option<Vec<String>>,
    ) -> FirestoreResult<Document> {
        metrics::counter!("tscout_firestore_ops_total", "op" => "update").increment(1);
        let mut url = self.document_path(collection, doc_id);
        if let Some(mask) = update_mask {
            let mask_params: Vec<String> = mask
                .iter()
                .map(|f| format!("updateMask.fieldPaths={}", urlencoding::encode(f)))
                .collect();
            url = format!("{}?{}", url, mask_params.join("&"));
        }

        let token = self.get_token().await?;
        let body = Document::new(fields);

        with_retry(&self.config.retry, "update_document", || async {
            let response = self
                .http
                .patch(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                StatusCode::NOT_FOUND => {
                    Err(FirestoreError::not_found(format!("{collection}/{doc_id}")))
                }
                status => Err(error_from_status(status, "PATCH", &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting a missing document is a no-op.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> FirestoreResult<()> {
        metrics::counter!("tscout_firestore_ops_total", "op" => "delete").increment(1);
        let url = self.document_path(collection, doc_id);
        let token = self.get_token().await?;

        with_retry(&self.config.retry, "delete_document", || async {
            let response = self.http.delete(&url).bearer_auth(&token).send().await?;
            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("document {}/{} already deleted", collection, doc_id);
                    Ok(())
                }
                status => Err(error_from_status(status, "DELETE", &url, response).await),
            }
        })
        .await
    }

    /// List documents in a collection, one page at a time.
    pub async fn list_documents(
        &self,
        collection: &str,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> FirestoreResult<ListDocumentsResponse> {
        metrics::counter!("tscout_firestore_ops_total", "op" => "list").increment(1);
        let mut url = format!("{}/{}", self.base_url, collection);
        let mut params = Vec::new();
        if let Some(size) = page_size {
            params.push(format!("pageSize={size}"));
        }
        if let Some(token) = page_token {
            params.push(format!("pageToken={}", urlencoding::encode(token)));
        }
        if !params.is_empty() {
            url = format!("{}?{}", url, params.join("&"));
        }

        let token = self.get_token().await?;

        with_retry(&self.config.retry, "list_documents", || async {
            let response = self.http.get(&url).bearer_auth(&token).send().await?;
            match response.status() {
                StatusCode::OK => Ok(response.json().await?),
                status => Err(error_from_status(status, "LIST", &url, response).await),
            }
        })
        .await
    }

    /// List every document in a collection, following pagination.
    pub async fn list_all_documents(&self, collection: &str) -> FirestoreResult<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self
                .list_documents(collection, Some(300), page_token.as_deref())
                .await?;
            documents.extend(page.documents.unwrap_or_default());
            page_token = page.next_page_token;
            if page_token.is_none() {
                break;
            }
        }
        Ok(documents)
    }
}

async fn error_from_status(
    status: StatusCode,
    verb: &str,
    url: &str,
    response: reqwest::Response,
) -> FirestoreError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .map(|secs| secs * 1000)
            .unwrap_or(1000);
        return FirestoreError::RateLimited(retry_after);
    }
    let body = response.text().await.unwrap_or_default();
    FirestoreError::request_failed(format!("{verb} {url} failed with {status}: {body}"))
}
