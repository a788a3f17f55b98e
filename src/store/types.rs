//! Image store types

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Which lookup failed in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Session,
    Image,
}

/// Store errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Image not found: {image_id} (session {session_id})")]
    ImageNotFound {
        session_id: String,
        image_id: String,
    },
}

impl StoreError {
    pub fn kind(&self) -> NotFoundKind {
        match self {
            Self::SessionNotFound(_) => NotFoundKind::Session,
            Self::ImageNotFound { .. } => NotFoundKind::Image,
        }
    }
}

/// A rendered page held by the store
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// PNG bytes
    pub data: Bytes,
    /// 1-based page number
    pub page_number: usize,
    /// Pixel width as reported by the renderer
    pub width: u32,
    /// Pixel height as reported by the renderer
    pub height: u32,
}

/// Per-image metadata returned when listing a session
///
/// Serializes exactly like the image entries of an extraction response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredImageInfo {
    pub id: String,
    pub page_number: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
}

/// Snapshot of one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub image_count: usize,
    /// Ordered by page number
    pub images: Vec<StoredImageInfo>,
}

/// Store statistics
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    /// Live sessions
    pub sessions: usize,
    /// Images across all sessions
    pub images: usize,
    /// Total PNG bytes held
    pub total_bytes: usize,
    /// Maximum sessions before LRU eviction
    pub max_sessions: usize,
    /// Total PNG bytes allowed before LRU eviction, if bounded
    pub byte_limit: Option<usize>,
}
