//! Session endpoints
//!
//! - GET /sessions/:session_id - List the images held for a session
//! - DELETE /sessions/:session_id - Drop a session and all of its images

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::error::Result;
use crate::state::AppState;
use crate::store::SessionSummary;

#[derive(Debug, Serialize)]
pub struct DeleteSessionResponse {
    pub success: bool,
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/sessions/:session_id",
        get(get_session).delete(delete_session),
    )
}

/// GET /sessions/:session_id
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionSummary>> {
    let summary = state.store().list(&session_id)?;
    Ok(Json(summary))
}

/// DELETE /sessions/:session_id
async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteSessionResponse>> {
    state.store().delete_session(&session_id)?;

    Ok(Json(DeleteSessionResponse {
        success: true,
        message: format!("Session {} deleted", session_id),
    }))
}
