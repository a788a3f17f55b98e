//! Extraction request/response types

use axum::body::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Input to one extraction run
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Uploaded filename, if the client sent one
    pub filename: Option<String>,
    /// Raw PDF bytes
    pub data: Bytes,
    /// Target session; `None` or blank generates a new one
    pub session_id: Option<String>,
    /// Extract at most this many leading pages
    pub max_pages: Option<usize>,
}

/// Metadata for one extracted page image
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExtractedImage {
    pub id: String,
    pub page_number: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
}

impl ExtractedImage {
    /// Image id for a 1-based page number
    pub fn id_for_page(page_number: usize) -> String {
        format!("page-{}", page_number)
    }

    /// Human-readable label for a 1-based page number
    pub fn label_for_page(page_number: usize) -> String {
        format!("Page {}", page_number)
    }
}

/// Outcome of a successful extraction
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub session_id: String,
    /// Page count of the source document
    pub total_pages: usize,
    /// Pages actually rendered and stored
    pub extracted_pages: usize,
    /// In ascending page order
    pub images: Vec<ExtractedImage>,
}

/// Extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The upload or parameters were rejected before rendering
    #[error("{0}")]
    InvalidInput(String),

    /// The document could not be opened or a page failed to render
    #[error("{0}")]
    Failed(String),

    /// A render step exceeded the configured timeout
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },
}

impl From<crate::render::RenderError> for ExtractionError {
    fn from(err: crate::render::RenderError) -> Self {
        ExtractionError::Failed(err.to_string())
    }
}
