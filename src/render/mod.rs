//! Page rasterization
//!
//! The extraction pipeline only needs two capabilities from a PDF backend:
//! counting pages and rendering one page at a given scale to PNG. They are
//! captured by the [`PageRenderer`] trait so the HTTP layer and the
//! orchestrator can be exercised without a native PDF library.
//!
//! [`MuPdfRenderer`] is the production implementation.

mod mupdf_renderer;

pub use mupdf_renderer::{encode_png, MuPdfRenderer};

use async_trait::async_trait;
use axum::body::Bytes;
use thiserror::Error;

/// Renderer error type
#[derive(Debug, Error)]
pub enum RenderError {
    /// The bytes could not be opened as a PDF
    #[error("Failed to open document: {0}")]
    Open(String),

    /// Requested page is past the end of the document
    #[error("Page {index} out of range (document has {page_count} pages)")]
    PageOutOfRange { index: usize, page_count: usize },

    /// Scale must be positive and finite
    #[error("Invalid render scale: {0}")]
    InvalidScale(f32),

    /// MuPDF failed while rendering a page
    #[error("Render error: {0}")]
    Render(String),

    /// PNG encoding failed
    #[error("Image error: {0}")]
    Image(String),

    /// The blocking render task panicked or was cancelled
    #[error("Task join error: {0}")]
    Join(String),
}

/// Result type alias for render operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<mupdf::Error> for RenderError {
    fn from(err: mupdf::Error) -> Self {
        RenderError::Render(err.to_string())
    }
}

/// A rasterized page encoded as PNG
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// PNG-encoded bytes
    pub png: Bytes,
    /// Pixel width of the encoded image
    pub width: u32,
    /// Pixel height of the encoded image
    pub height: u32,
}

/// Rasterizes PDF pages to PNG
///
/// Implementations receive the full document bytes on every call; they are
/// free to reopen the document per call. Page indices are 0-based.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Number of pages in the document
    async fn page_count(&self, pdf: Bytes) -> RenderResult<usize>;

    /// Render one page at `scale` (1.0 = 72 DPI) and encode it as PNG
    async fn render_page(&self, pdf: Bytes, page_index: usize, scale: f32)
        -> RenderResult<RenderedPage>;
}
