//! Shared helpers for HTTP tests
//!
//! `StubRenderer` stands in for MuPDF. Uploaded "PDFs" are tiny text
//! descriptors produced by [`fake_pdf`], e.g. `%PDF-stub pages=3 width=300 height=400`.
//! Anything else fails to open, which exercises the 500 path.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use image::GenericImageView;

use pdf_page_images::render::{encode_png, PageRenderer, RenderError, RenderResult, RenderedPage};
use pdf_page_images::{app, AppState, Config};

const STUB_MAGIC: &str = "%PDF-stub";

/// Parsed stub document
struct StubDocument {
    pages: usize,
    width: f32,
    height: f32,
    fail_at: Option<usize>,
}

fn parse_stub(pdf: &[u8]) -> RenderResult<StubDocument> {
    let text = std::str::from_utf8(pdf)
        .map_err(|_| RenderError::Open("not a stub document".to_string()))?;
    let mut parts = text.split_whitespace();
    if parts.next() != Some(STUB_MAGIC) {
        return Err(RenderError::Open("no objects found".to_string()));
    }

    let mut doc = StubDocument {
        pages: 1,
        width: 612.0,
        height: 792.0,
        fail_at: None,
    };
    for part in parts {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| RenderError::Open(format!("bad token {}", part)))?;
        let bad = || RenderError::Open(format!("bad value for {}", key));
        match key {
            "pages" => doc.pages = value.parse().map_err(|_| bad())?,
            "width" => doc.width = value.parse().map_err(|_| bad())?,
            "height" => doc.height = value.parse().map_err(|_| bad())?,
            "fail_at" => doc.fail_at = Some(value.parse().map_err(|_| bad())?),
            _ => {}
        }
    }
    Ok(doc)
}

/// Renderer that synthesizes white pages, rounding sizes up like MuPDF
pub struct StubRenderer;

#[async_trait]
impl PageRenderer for StubRenderer {
    async fn page_count(&self, pdf: Bytes) -> RenderResult<usize> {
        Ok(parse_stub(&pdf)?.pages)
    }

    async fn render_page(
        &self,
        pdf: Bytes,
        page_index: usize,
        scale: f32,
    ) -> RenderResult<RenderedPage> {
        let doc = parse_stub(&pdf)?;
        if page_index >= doc.pages {
            return Err(RenderError::PageOutOfRange {
                index: page_index,
                page_count: doc.pages,
            });
        }
        if doc.fail_at == Some(page_index) {
            return Err(RenderError::Render("syntax error in content stream".to_string()));
        }

        let width = (doc.width * scale).ceil() as u32;
        let height = (doc.height * scale).ceil() as u32;
        let samples = vec![255u8; width as usize * height as usize * 3];
        let png = encode_png(&samples, 3, width, height)?;

        Ok(RenderedPage {
            png: Bytes::from(png),
            width,
            height,
        })
    }
}

/// Stub PDF with `pages` pages of `width` x `height` points
pub fn fake_pdf(pages: usize, width: u32, height: u32) -> Vec<u8> {
    format!("{} pages={} width={} height={}", STUB_MAGIC, pages, width, height).into_bytes()
}

/// Stub PDF whose page at `fail_at` (0-based) fails to render
pub fn failing_pdf(pages: usize, fail_at: usize) -> Vec<u8> {
    format!("{} pages={} fail_at={}", STUB_MAGIC, pages, fail_at).into_bytes()
}

pub fn test_state(config: Config) -> AppState {
    AppState::new(config, Arc::new(StubRenderer))
}

pub fn test_server() -> TestServer {
    test_server_with(Config::default())
}

pub fn test_server_with(config: Config) -> TestServer {
    TestServer::new(app(test_state(config))).unwrap()
}

/// Multipart form carrying a file field
pub fn upload_form(filename: &str, data: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(data)
            .file_name(filename)
            .mime_type("application/pdf"),
    )
}

/// Decode PNG bytes and return (width, height)
pub fn png_dimensions(bytes: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png).unwrap();
    (img.width(), img.height())
}
