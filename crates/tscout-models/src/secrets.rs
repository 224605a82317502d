//! Per-user service secrets.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Well-known service names.
pub mod services {
    pub const ANTHROPIC: &str = "anthropic";
    pub const YOUTUBE: &str = "youtube";
    pub const REPLICATE: &str = "replicate";
    pub const ELEVENLABS: &str = "elevenlabs";
}

/// One stored API key, keyed by `(user_id, service)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserSecret {
    pub user_id: String,
    pub service: String,
    pub api_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-only snapshot of a user's secrets, taken when a job starts.
/// Rotating a key does not affect a running job.
#[derive(Debug, Clone, Default)]
pub struct SecretsSnapshot {
    keys: HashMap<String, String>,
}

impl SecretsSnapshot {
    pub fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }

    /// Key for `service`, if the user stored one.
    pub fn get(&self, service: &str) -> Option<&str> {
        self.keys.get(service).map(|s| s.as_str())
    }

    /// Key for `service`, falling back to an environment default.
    pub fn get_or_env(&self, service: &str, env_var: &str) -> Option<String> {
        self.get(service)
            .map(|s| s.to_string())
            .or_else(|| std::env::var(env_var).ok())
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
