//! Spec listing and rendering endpoints

use crate::core::record::ApiRecord;
use crate::http::errors::HttpResult;
use crate::http::handlers::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// GET /swagger-specs, GET /list - every registered API keyed by name
pub async fn list_specs(State(state): State<AppState>) -> Json<BTreeMap<String, ApiRecord>> {
    let snapshot = state.service.registry().snapshot().await;
    debug!("Listing {} API spec(s)", snapshot.len());
    Json(snapshot.as_ref().clone())
}

/// GET /api/*name - fetch the named spec and rebase it on its source URL
pub async fn render_spec(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> HttpResult<Json<Value>> {
    debug!("Rendering API spec '{}'", name);
    let doc = state.service.renderer().render(&name).await?;
    Ok(Json(doc))
}
