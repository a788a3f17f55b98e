//! MuPDF-backed page renderer
//!
//! MuPDF documents are not thread-safe, so every operation opens a fresh
//! document from the shared bytes inside `spawn_blocking` and drops it before
//! returning. Nothing MuPDF-owned outlives a single call.

use std::io::Cursor;

use async_trait::async_trait;
use axum::body::Bytes;
use image::{DynamicImage, RgbImage};
use mupdf::{Colorspace, Document, Matrix};

use super::{PageRenderer, RenderError, RenderResult, RenderedPage};

const PDF_MIME: &str = "application/pdf";

/// Production [`PageRenderer`] using MuPDF
#[derive(Debug, Clone, Default)]
pub struct MuPdfRenderer;

impl MuPdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn open_document(data: &[u8]) -> RenderResult<Document> {
    Document::from_bytes(data, PDF_MIME).map_err(|e| RenderError::Open(e.to_string()))
}

fn count_pages(doc: &Document) -> RenderResult<usize> {
    let count = doc
        .page_count()
        .map_err(|e| RenderError::Open(e.to_string()))?;
    Ok(count.max(0) as usize)
}

#[async_trait]
impl PageRenderer for MuPdfRenderer {
    async fn page_count(&self, pdf: Bytes) -> RenderResult<usize> {
        tokio::task::spawn_blocking(move || {
            let doc = open_document(&pdf)?;
            count_pages(&doc)
        })
        .await
        .map_err(|e| RenderError::Join(e.to_string()))?
    }

    async fn render_page(
        &self,
        pdf: Bytes,
        page_index: usize,
        scale: f32,
    ) -> RenderResult<RenderedPage> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(RenderError::InvalidScale(scale));
        }

        tokio::task::spawn_blocking(move || {
            let doc = open_document(&pdf)?;
            let page_count = count_pages(&doc)?;
            if page_index >= page_count {
                return Err(RenderError::PageOutOfRange {
                    index: page_index,
                    page_count,
                });
            }

            let page = doc.load_page(page_index as i32)?;
            let matrix = Matrix::new_scale(scale, scale);
            let colorspace = Colorspace::device_rgb();
            // No alpha channel: pages are flattened onto white
            let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;

            let width = pixmap.width() as u32;
            let height = pixmap.height() as u32;
            let channels = pixmap.n() as usize;
            let png = encode_png(pixmap.samples(), channels, width, height)?;

            Ok(RenderedPage {
                png: Bytes::from(png),
                width,
                height,
            })
        })
        .await
        .map_err(|e| RenderError::Join(e.to_string()))?
    }
}

/// Encode interleaved pixel samples as an RGB PNG
///
/// `channels` is the number of samples per pixel; only the first three are
/// used. Grayscale input (`channels < 3`) is expanded to RGB.
pub fn encode_png(
    samples: &[u8],
    channels: usize,
    width: u32,
    height: u32,
) -> RenderResult<Vec<u8>> {
    if channels == 0 {
        return Err(RenderError::Image("Pixmap has no color channels".to_string()));
    }

    let pixel_count = width as usize * height as usize;
    let mut rgb_buffer = Vec::with_capacity(pixel_count * 3);

    for pixel in 0..pixel_count {
        let offset = pixel * channels;
        if channels >= 3 {
            let r = samples.get(offset).copied().unwrap_or(255);
            let g = samples.get(offset + 1).copied().unwrap_or(255);
            let b = samples.get(offset + 2).copied().unwrap_or(255);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        } else {
            let v = samples.get(offset).copied().unwrap_or(255);
            rgb_buffer.extend_from_slice(&[v, v, v]);
        }
    }

    let img = RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| RenderError::Image("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)
        .map_err(|e| RenderError::Image(e.to_string()))?;

    Ok(output)
}
