//! PDF page extraction
//!
//! Drives a [`PageRenderer`](crate::render::PageRenderer) over the leading
//! pages of an uploaded PDF and commits the resulting PNGs to the
//! [`ImageStore`](crate::store::ImageStore).
//!
//! Pages are rendered strictly in order and buffered locally; the store only
//! sees them once every page has rendered. A failed extraction therefore
//! leaves the store untouched.

mod orchestrator;
mod types;

pub use orchestrator::{generate_session_id, is_pdf_filename, Extractor, MAX_RENDER_ATTEMPTS};
pub use types::{ExtractedImage, ExtractionError, ExtractionRequest, ExtractionResult};
