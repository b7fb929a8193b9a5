use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::models::{ExecuteQueryParams, QueryResult};
use crate::sql::SalesDb;
use crate::state::AppState;

fn sales_db(state: &AppState) -> Result<&SalesDb, (StatusCode, String)> {
    state.sales_db.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Sales database is not configured (set ADSALES_SALES_DB)".to_string(),
        )
    })
}

/// GET /query/tables
pub async fn list_tables(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, String)> {
    let tables = sales_db(&state)?.list_tables().await.map_err(|e| {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to fetch tables: {e:#}"))
    })?;
    Ok(Json(json!({ "tables": tables })))
}

/// GET /query/table/{table_name}
pub async fn table_info(
    State(state): State<AppState>,
    Path(table_name): Path<String>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let ddl = sales_db(&state)?
        .table_ddl(&table_name)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to fetch table info: {e:#}"),
            )
        })?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Table {table_name} not found")))?;
    Ok(Json(json!({ "table_info": ddl })))
}

/// GET /query/execute?query=...&limit=10
pub async fn execute_query(
    State(state): State<AppState>,
    Query(params): Query<ExecuteQueryParams>,
) -> Result<Json<QueryResult>, (StatusCode, String)> {
    if params.query.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Query is required".to_string()));
    }
    let limit = params.limit.unwrap_or(state.config.sql_row_limit);
    let (query, result) = sales_db(&state)?
        .execute(&params.query, limit)
        .await
        .map_err(|e| {
            tracing::warn!("Ad-hoc query failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Query execution failed: {e:#}"),
            )
        })?;
    Ok(Json(QueryResult { result, query }))
}
