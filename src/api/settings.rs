use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Config response with API key redacted
#[derive(Serialize)]
pub struct LlmConfigResponse {
    pub provider: String,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub temperature: f32,
    pub has_api_key: bool,
}

/// GET /api/config - Current LLM config (API key redacted)
pub async fn get_config(State(state): State<AppState>) -> Json<LlmConfigResponse> {
    let config = &state.llm_config;
    Json(LlmConfigResponse {
        provider: config.provider.clone(),
        base_url: config.base_url.clone(),
        chat_model: config.chat_model.clone(),
        embedding_model: config.embedding_model.clone(),
        embedding_dim: config.embedding_dim,
        temperature: config.temperature,
        has_api_key: config.api_key.is_some(),
    })
}
