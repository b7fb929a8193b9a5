pub mod chat;
pub mod documents;
pub mod query;
pub mod settings;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// All HTTP routes, bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/doc/process-document",
            post(documents::process_document),
        )
        .route(
            "/api/doc/supported-formats",
            get(documents::supported_formats),
        )
        .route("/api/doc/search-merged", post(documents::search_merged))
        .route("/api/doc/rebuild-merged", post(documents::rebuild_merged))
        .route("/api/doc/list", get(documents::list_documents))
        .route("/api/doc/{id}", get(documents::get_document))
        .route("/api/chat/req", post(chat::chat))
        .route("/query/tables", get(query::list_tables))
        .route("/query/table/{table_name}", get(query::table_info))
        .route("/query/execute", get(query::execute_query))
        .route("/api/config", get(settings::get_config))
        .with_state(state)
}
