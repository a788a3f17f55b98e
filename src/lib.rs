//! PDF Page Image Service Library
//!
//! Rasterizes uploaded PDFs into PNG page images and serves them back by
//! session. The binary in main.rs wires these modules into an axum server.
//!
//! # Modules
//!
//! - `render`: Page rasterization behind the `PageRenderer` trait (MuPDF)
//! - `store`: Session-scoped in-memory image store with LRU/TTL eviction
//! - `extraction`: Orchestrates rendering of a PDF into a session
//! - `routes`: HTTP surface

pub mod config;
pub mod error;
pub mod extraction;
pub mod render;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use routes::app;
pub use state::AppState;
