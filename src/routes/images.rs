//! Image retrieval endpoint

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::Result;
use crate::state::AppState;

/// Rendered pages never change for a given id within a session
const IMAGE_CACHE_CONTROL: &str = "public, max-age=3600";

pub fn router() -> Router<AppState> {
    Router::new().route("/images/:session_id/:image_id", get(get_image))
}

/// GET /images/:session_id/:image_id
///
/// Returns the stored PNG bytes.
async fn get_image(
    State(state): State<AppState>,
    Path((session_id, image_id)): Path<(String, String)>,
) -> Result<Response> {
    let image = state.store().get(&session_id, &image_id)?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL),
        ],
        image.data,
    )
        .into_response())
}
