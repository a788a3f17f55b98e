//! PDF extraction endpoint
//!
//! `POST /extract` takes a multipart upload with a `file` field. The optional
//! `session_id` and `max_pages` parameters are read from the query string or
//! from multipart text fields; form fields win when both are present.

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, Query, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::extraction::{is_pdf_filename, ExtractedImage, ExtractionRequest, ExtractionResult};
use crate::state::AppState;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/extract", post(extract_pdf))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Query parameters for extraction
#[derive(Debug, Default, Deserialize)]
pub struct ExtractQuery {
    #[serde(default)]
    pub session_id: Option<String>,
    /// Kept as text so bad values produce a JSON 400 rather than a rejection
    #[serde(default)]
    pub max_pages: Option<String>,
}

/// Successful extraction response
#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub success: bool,
    pub session_id: String,
    pub total_pages: usize,
    pub extracted_pages: usize,
    pub images: Vec<ExtractedImage>,
}

impl From<ExtractionResult> for ExtractResponse {
    fn from(result: ExtractionResult) -> Self {
        Self {
            success: true,
            session_id: result.session_id,
            total_pages: result.total_pages,
            extracted_pages: result.extracted_pages,
            images: result.images,
        }
    }
}

/// Uploaded file as read from the multipart body
struct UploadedFile {
    filename: String,
    data: Bytes,
}

/// POST /extract
async fn extract_pdf(
    State(state): State<AppState>,
    Query(query): Query<ExtractQuery>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractResponse>> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected non-multipart upload: {}", e);
        AppError::InvalidInput("Expected a multipart/form-data upload with a 'file' field".into())
    })?;

    let mut file: Option<UploadedFile> = None;
    let mut session_id = query.session_id;
    let mut max_pages = query.max_pages;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error("Failed to read upload", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(|s| s.to_string()).unwrap_or_default();

                // Reject before buffering the body
                if !is_pdf_filename(&filename) {
                    return Err(AppError::InvalidInput("File must be a PDF".into()));
                }

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error("Failed to read file data", e))?;

                tracing::debug!(filename = %filename, size = data.len(), "Received upload");
                file = Some(UploadedFile { filename, data });
            }
            "session_id" | "max_pages" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| upload_error(&format!("Failed to read field '{}'", name), e))?;
                if name == "session_id" {
                    session_id = Some(value);
                } else {
                    max_pages = Some(value);
                }
            }
            _ => {
                tracing::debug!("Ignoring multipart field '{}'", name);
            }
        }
    }

    let file = file.ok_or_else(|| AppError::InvalidInput("No file uploaded".into()))?;
    let max_pages = parse_max_pages(max_pages.as_deref())?;

    let result = state
        .extractor()
        .extract(ExtractionRequest {
            filename: Some(file.filename),
            data: file.data,
            session_id,
            max_pages,
        })
        .await?;

    Ok(Json(result.into()))
}

/// Map a multipart read failure, keeping the body limit distinct
fn upload_error(context: &str, err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::PayloadTooLarge;
    }
    tracing::error!("{}: {}", context, err);
    AppError::InvalidInput(format!("{}: {}", context, err))
}

/// Parse the optional page cap; blank means "no cap"
fn parse_max_pages(raw: Option<&str>) -> Result<Option<usize>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(AppError::InvalidInput(
            "max_pages must be a positive integer".into(),
        )),
    }
}
