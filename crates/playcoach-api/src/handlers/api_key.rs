//! Session API key handlers.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::session::SessionStore;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ApiKeyRequest {
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiKeyStatus {
    pub configured: bool,
}

/// Store a Gemini API key for the caller's session, creating the session if needed.
pub async fn set_api_key(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<ApiKeyRequest>,
) -> ApiResult<(CookieJar, Json<MessageResponse>)> {
    let api_key = request
        .api_key
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("No API key provided"))?;

    let session_id = match state.sessions.session_id(&jar)? {
        Some(id) => id,
        None => SessionStore::new_session_id(),
    };
    state.sessions.set_key(&session_id, &api_key).await?;
    info!("API key configured for session");

    let jar = jar.add(state.sessions.cookie(&session_id)?);
    Ok((
        jar,
        Json(MessageResponse {
            message: "API key saved successfully".to_string(),
        }),
    ))
}

pub async fn verify_api_key(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<ApiKeyStatus>> {
    let configured = state.sessions.key_for(&jar).await?.is_some();
    Ok(Json(ApiKeyStatus { configured }))
}
