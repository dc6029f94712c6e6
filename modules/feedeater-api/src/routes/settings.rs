use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use feedeater_common::model::Setting;
use serde::Deserialize;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PutSettingBody {
    pub value: Option<String>,
    #[serde(default)]
    pub is_secret: bool,
}

/// `GET /api/settings/<module>` — every setting for a module, with secret
/// values stripped (spec §4.3: secrets are readable only to trusted
/// internal callers, which this external surface is not).
pub async fn get_module_settings(
    State(state): State<Arc<AppState>>,
    Path(module): Path<String>,
) -> impl IntoResponse {
    if state.host.manifest(&module).is_none() {
        return (StatusCode::NOT_FOUND, Json(Vec::<Setting>::new()));
    }

    match state.settings.get_all(&module).await {
        Ok(settings) => (StatusCode::OK, Json(feedeater_settings::SettingsRegistry::redact_for_external(settings))),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(Vec::new())),
    }
}

/// `GET /api/settings/<module>/<key>`.
pub async fn get_one_setting(
    State(state): State<Arc<AppState>>,
    Path((module, key)): Path<(String, String)>,
) -> impl IntoResponse {
    match state.settings.get_all(&module).await {
        Ok(settings) => {
            let redacted = feedeater_settings::SettingsRegistry::redact_for_external(settings);
            match redacted.into_iter().find(|s| s.key == key) {
                Some(setting) => (StatusCode::OK, Json(Some(setting))),
                None => (StatusCode::NOT_FOUND, Json(None)),
            }
        }
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(None)),
    }
}

/// `PUT /api/settings/<module>/<key>` — write-through to the store.
pub async fn put_setting(
    State(state): State<Arc<AppState>>,
    Path((module, key)): Path<(String, String)>,
    Json(body): Json<PutSettingBody>,
) -> impl IntoResponse {
    match state.settings.put(&module, &key, body.value.as_deref(), body.is_secret).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
