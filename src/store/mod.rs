//! Session-scoped image store
//!
//! Holds rendered page PNGs keyed by (session id, image id). The store is
//! owned by the application state rather than being a global, so tests can
//! build as many isolated stores as they like.
//!
//! Growth is bounded two ways:
//! - LRU capacity on the number of sessions
//! - idle TTL, enforced lazily on access and by a background sweeper

mod image_store;
mod types;

pub use image_store::ImageStore;
pub use types::{
    NotFoundKind, SessionSummary, StoreError, StoreStats, StoredImage, StoredImageInfo,
};
