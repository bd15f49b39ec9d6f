use axum::{extract::State, http::StatusCode, response::Response, routing::get, Router};
use tracing::{error, info};

use crate::{
    state::AppState,
    views::{format_timestamp, with_status, DbCheckPage, View},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/test-db", get(test_db))
}

/// Connectivity check. Open to anyone; failure details go to the log only.
pub async fn test_db(State(state): State<AppState>) -> Response {
    match state.probe.probe().await {
        Ok(info) => {
            info!(version = %info.version, "database probe ok");
            with_status(
                StatusCode::OK,
                View::DbCheck(DbCheckPage {
                    ok: true,
                    now: Some(format_timestamp(info.now)),
                    version: Some(info.version),
                }),
            )
        }
        Err(e) => {
            error!(error = %e, "database probe failed");
            with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                View::DbCheck(DbCheckPage {
                    ok: false,
                    now: None,
                    version: None,
                }),
            )
        }
    }
}
