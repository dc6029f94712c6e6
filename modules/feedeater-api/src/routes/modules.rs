use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;

use crate::AppState;

/// `GET /api/modules` — returns every registered module's manifest.
pub async fn list_modules(State(state): State<Arc<AppState>>) -> Json<Vec<feedeater_common::model::ModuleManifest>> {
    Json(state.host.manifests().cloned().collect())
}
