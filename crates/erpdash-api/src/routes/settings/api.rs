//! Settings API endpoints - JSON API

use erpdash_config::Config;

use crate::AppState;

pub async fn api_settings(state: axum::extract::State<AppState>) -> axum::Json<Config> {
    axum::Json(state.config.clone())
}
