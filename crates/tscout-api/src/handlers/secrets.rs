//! Per-user service key management.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use tscout_llm::{ChatRequest, LlmClient, LlmConfig};
use tscout_models::{secrets::services, UserSecret};
use tscout_youtube::{YoutubeClient, YoutubeConfig};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SaveSecretRequest {
    #[validate(length(min = 1, max = 100))]
    pub service: String,
    #[validate(length(min = 8, max = 500))]
    pub key: String,
}

/// POST /api/secrets
pub async fn save_secret(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<SaveSecretRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    body.validate()
        .map_err(|e| ApiError::validation(e.to_string()))?;

    let now = Utc::now();
    let secret = UserSecret {
        user_id: user.uid.clone(),
        service: body.service.trim().to_lowercase(),
        api_key: body.key,
        created_at: now,
        updated_at: now,
    };
    state.secrets.put(&secret).await?;

    Ok(Json(json!({"status": "saved", "service": secret.service})))
}

/// DELETE /api/secrets/:service
pub async fn delete_secret(
    State(state): State<AppState>,
    Path(service): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    state.secrets.delete(&user.uid, &service.to_lowercase()).await?;
    Ok(Json(json!({"status": "deleted"})))
}

/// POST /api/secrets/:service/test
///
/// Runs a cheap read-only call on the stored key. Services without a
/// probe report saved-but-untested.
pub async fn test_secret(
    State(state): State<AppState>,
    Path(service): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<serde_json::Value>> {
    let service = service.to_lowercase();
    let secret = state
        .secrets
        .get(&user.uid, &service)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("no key stored for '{service}'")))?;

    match service.as_str() {
        services::ANTHROPIC => {
            let client = LlmClient::new(LlmConfig::new(secret.api_key))
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            let probe = ChatRequest::new().user("Reply with the word ok.").max_tokens(10);
            match client.call(&probe).await {
                Ok(_) => Ok(Json(json!({"ok": true, "message": "API key is valid and working"}))),
                Err(e) => Ok(Json(json!({"ok": false, "message": e.to_string()}))),
            }
        }
        services::YOUTUBE => {
            let client = YoutubeClient::new(YoutubeConfig::new(vec![secret.api_key]))
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            match client.search("test", 1).await {
                Ok(_) => Ok(Json(json!({"ok": true, "message": "API key is valid and working"}))),
                Err(e) => Ok(Json(json!({"ok": false, "message": e.to_string()}))),
            }
        }
        _ => Ok(Json(json!({
            "ok": true,
            "message": "key saved (testing not implemented for this service)"
        }))),
    }
}
