//! Route modules for the PDF page image service

pub mod extract;
pub mod health;
pub mod images;
pub mod sessions;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let max_upload_bytes = state.config().server.max_upload_bytes;
    let cors = cors_layer(&state.config().cors);

    Router::new()
        .merge(health::router())
        .merge(extract::router(max_upload_bytes))
        .merge(images::router())
        .merge(sessions::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS for a fixed allow-list of origins, with credentials
///
/// A wildcard cannot be combined with credentials, so methods and headers
/// are mirrored from the preflight request instead.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter(|origin| {
            let wildcard = origin.as_str() == "*";
            if wildcard {
                tracing::warn!("Ignoring wildcard CORS origin; credentials are allowed");
            }
            !wildcard
        })
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}: {}", origin, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
