//! Typed repositories over the store collections.
//!
//! Persisted layout: one document per project under `projects`, one per
//! job under `jobs`, secrets under `user_secrets` keyed by
//! `(user_id, service)`. Scripts, outlines and thumbnails are nested
//! sub-documents on the project.

use std::collections::HashMap;

use tracing::info;

use tscout_models::{ChannelId, Job, JobId, Project, ProjectId, SecretsSnapshot, UserSecret};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::value::{document_to_json, json_to_fields, json_to_value, Document};

const PROJECTS: &str = "projects";
const JOBS: &str = "jobs";
const USER_SECRETS: &str = "user_secrets";

fn to_fields<T: serde::Serialize>(value: &T) -> FirestoreResult<HashMap<String, crate::value::Value>> {
    let json = serde_json::to_value(value)?;
    json_to_fields(&json)
        .ok_or_else(|| FirestoreError::invalid_response("document did not serialize to an object"))
}

fn from_document<T: serde::de::DeserializeOwned>(document: &Document) -> FirestoreResult<T> {
    Ok(serde_json::from_value(document_to_json(document))?)
}

// ============================================================================
// Projects
// ============================================================================

/// Repository for project documents.
#[derive(Clone)]
pub struct ProjectRepository {
    client: FirestoreClient,
}

impl ProjectRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Create a new project record.
    pub async fn create(&self, project: &Project) -> FirestoreResult<()> {
        self.client
            .create_document(PROJECTS, project.id.as_str(), to_fields(project)?)
            .await?;
        info!("created project record: {}", project.id);
        Ok(())
    }

    /// Get a project by id.
    pub async fn get(&self, id: &ProjectId) -> FirestoreResult<Option<Project>> {
        match self.client.get_document(PROJECTS, id.as_str()).await? {
            Some(document) => Ok(Some(from_document(&document)?)),
            None => Ok(None),
        }
    }

    /// Replace the full project document.
    ///
    /// Callers must hold the project's write lock across the surrounding
    /// read-modify-write cycle.
    pub async fn put(&self, project: &Project) -> FirestoreResult<()> {
        self.client
            .update_document(PROJECTS, project.id.as_str(), to_fields(project)?, None)
            .await?;
        Ok(())
    }

    /// Delete a project and everything nested on it.
    pub async fn delete(&self, id: &ProjectId) -> FirestoreResult<()> {
        self.client.delete_document(PROJECTS, id.as_str()).await?;
        info!("deleted project {}", id);
        Ok(())
    }

    /// All projects visible to a user.
    pub async fn list_for_user(&self, user_id: &str) -> FirestoreResult<Vec<Project>> {
        let documents = self.client.list_all_documents(PROJECTS).await?;
        let mut projects = Vec::new();
        for document in &documents {
            // Tolerate foreign documents in the collection.
            if let Ok(project) = from_document::<Project>(document) {
                if project.is_visible_to(user_id) {
                    projects.push(project);
                }
            }
        }
        Ok(projects)
    }

    /// Find a project whose seed channel matches, if any.
    pub async fn find_by_seed_channel(
        &self,
        channel_id: &ChannelId,
    ) -> FirestoreResult<Option<ProjectId>> {
        let documents = self.client.list_all_documents(PROJECTS).await?;
        for document in &documents {
            if let Ok(project) = from_document::<Project>(document) {
                if &project.seed_channel.id == channel_id {
                    return Ok(Some(project.id));
                }
            }
        }
        Ok(None)
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// Repository for job documents.
#[derive(Clone)]
pub struct JobRepository {
    client: FirestoreClient,
}

impl JobRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Create a job record. Jobs are created before their worker starts.
    pub async fn create(&self, job: &Job) -> FirestoreResult<()> {
        self.client
            .create_document(JOBS, job.id.as_str(), to_fields(job)?)
            .await?;
        Ok(())
    }

    /// Get a job by id.
    pub async fn get(&self, id: &JobId) -> FirestoreResult<Option<Job>> {
        match self.client.get_document(JOBS, id.as_str()).await? {
            Some(document) => Ok(Some(from_document(&document)?)),
            None => Ok(None),
        }
    }

    /// Replace the full job document.
    pub async fn put(&self, job: &Job) -> FirestoreResult<()> {
        self.client
            .update_document(JOBS, job.id.as_str(), to_fields(job)?, None)
            .await?;
        Ok(())
    }

    /// Flag a running job for cooperative cancellation.
    pub async fn request_cancel(&self, id: &JobId) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "cancel_requested".to_string(),
            json_to_value(&serde_json::Value::Bool(true)),
        );
        self.client
            .update_document(
                JOBS,
                id.as_str(),
                fields,
                Some(vec!["cancel_requested".to_string()]),
            )
            .await?;
        Ok(())
    }
}

// ============================================================================
// User secrets
// ============================================================================

/// Repository for per-user service keys.
#[derive(Clone)]
pub struct SecretsRepository {
    client: FirestoreClient,
}

impl SecretsRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn doc_id(user_id: &str, service: &str) -> String {
        format!("{user_id}:{service}")
    }

    /// Store (or replace) one secret.
    pub async fn put(&self, secret: &UserSecret) -> FirestoreResult<()> {
        // PATCH upserts, so create-or-replace is one call.
        self.client
            .update_document(
                USER_SECRETS,
                &Self::doc_id(&secret.user_id, &secret.service),
                to_fields(secret)?,
                None,
            )
            .await?;
        info!("stored secret for service '{}'", secret.service);
        Ok(())
    }

    /// Get one secret.
    pub async fn get(&self, user_id: &str, service: &str) -> FirestoreResult<Option<UserSecret>> {
        match self
            .client
            .get_document(USER_SECRETS, &Self::doc_id(user_id, service))
            .await?
        {
            Some(document) => Ok(Some(from_document(&document)?)),
            None => Ok(None),
        }
    }

    /// Delete one secret. Idempotent.
    pub async fn delete(&self, user_id: &str, service: &str) -> FirestoreResult<()> {
        self.client
            .delete_document(USER_SECRETS, &Self::doc_id(user_id, service))
            .await
    }

    /// Snapshot every secret a user has stored. Taken once at job start;
    /// later rotations do not affect the running job.
    pub async fn snapshot_for_user(&self, user_id: &str) -> FirestoreResult<SecretsSnapshot> {
        let documents = self.client.list_all_documents(USER_SECRETS).await?;
        let mut keys = HashMap::new();
        for document in &documents {
            if let Ok(secret) = from_document::<UserSecret>(document) {
                if secret.user_id == user_id {
                    keys.insert(secret.service, secret.api_key);
                }
            }
        }
        Ok(SecretsSnapshot::new(keys))
    }
}
