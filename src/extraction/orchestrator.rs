//! Extraction orchestrator

use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use tokio::time::timeout;
use uuid::Uuid;

use super::types::{ExtractedImage, ExtractionError, ExtractionRequest, ExtractionResult};
use crate::config::RenderConfig;
use crate::render::{PageRenderer, RenderResult, RenderedPage};
use crate::store::{ImageStore, StoredImage};

/// Render attempts per page while fitting the width limit
pub const MAX_RENDER_ATTEMPTS: usize = 3;
/// Length of generated session ids (hex characters)
const GENERATED_SESSION_ID_LEN: usize = 8;
/// Longest caller-supplied session id accepted
const MAX_SESSION_ID_LEN: usize = 128;

/// Renders uploaded PDFs into a session of the image store
#[derive(Clone)]
pub struct Extractor {
    renderer: Arc<dyn PageRenderer>,
    store: ImageStore,
    settings: RenderConfig,
}

impl Extractor {
    pub fn new(renderer: Arc<dyn PageRenderer>, store: ImageStore, settings: RenderConfig) -> Self {
        Self {
            renderer,
            store,
            settings,
        }
    }

    /// Extract the leading pages of a PDF into a session
    pub async fn extract(
        &self,
        request: ExtractionRequest,
    ) -> Result<ExtractionResult, ExtractionError> {
        if let Some(filename) = request.filename.as_deref() {
            if !is_pdf_filename(filename) {
                return Err(ExtractionError::InvalidInput("File must be a PDF".to_string()));
            }
        }
        if request.max_pages == Some(0) {
            return Err(ExtractionError::InvalidInput(
                "max_pages must be a positive integer".to_string(),
            ));
        }
        let session_id = resolve_session_id(request.session_id.as_deref())?;
        let pdf = request.data;

        let total_pages = self
            .bounded("Opening document", self.renderer.page_count(pdf.clone()))
            .await?;
        let pages_to_extract = request
            .max_pages
            .map_or(total_pages, |cap| cap.min(total_pages));

        tracing::info!(
            session_id = %session_id,
            filename = ?request.filename,
            size = pdf.len(),
            total_pages,
            pages_to_extract,
            "Extracting PDF pages"
        );

        let mut images = Vec::with_capacity(pages_to_extract);
        let mut pending = Vec::with_capacity(pages_to_extract);

        for page_index in 0..pages_to_extract {
            let page_number = page_index + 1;
            let rendered = self.render_within_width(&pdf, page_index).await.map_err(|e| {
                tracing::warn!(
                    session_id = %session_id,
                    page = page_number,
                    error = %e,
                    "Page extraction failed"
                );
                e
            })?;

            let id = ExtractedImage::id_for_page(page_number);
            images.push(ExtractedImage {
                id: id.clone(),
                page_number,
                label: ExtractedImage::label_for_page(page_number),
                width: rendered.width,
                height: rendered.height,
            });
            pending.push((
                id,
                StoredImage {
                    data: rendered.png,
                    page_number,
                    width: rendered.width,
                    height: rendered.height,
                },
            ));
        }

        self.store.put_all(&session_id, pending);

        tracing::info!(
            session_id = %session_id,
            extracted_pages = images.len(),
            "Extraction complete"
        );

        Ok(ExtractionResult {
            session_id,
            total_pages,
            extracted_pages: images.len(),
            images,
        })
    }

    /// Render a page, shrinking the scale until it fits `max_width`
    async fn render_within_width(
        &self,
        pdf: &Bytes,
        page_index: usize,
    ) -> Result<RenderedPage, ExtractionError> {
        let max_width = self.settings.max_width;
        let mut scale = self.settings.scale;
        let mut page = self.render_at(pdf, page_index, scale).await?;

        let mut attempts = 1;
        while page.width > max_width && attempts < MAX_RENDER_ATTEMPTS {
            let previous_width = page.width;
            scale *= max_width as f32 / page.width as f32;
            page = self.render_at(pdf, page_index, scale).await?;
            attempts += 1;

            tracing::debug!(
                page = page_index + 1,
                previous_width,
                width = page.width,
                scale,
                "Re-rendered page to fit max width"
            );
        }

        if page.width > max_width {
            tracing::warn!(
                page = page_index + 1,
                width = page.width,
                max_width,
                "Page still wider than max width after {} attempts",
                MAX_RENDER_ATTEMPTS
            );
        }

        Ok(page)
    }

    async fn render_at(
        &self,
        pdf: &Bytes,
        page_index: usize,
        scale: f32,
    ) -> Result<RenderedPage, ExtractionError> {
        self.bounded(
            &format!("Rendering page {}", page_index + 1),
            self.renderer.render_page(pdf.clone(), page_index, scale),
        )
        .await
    }

    /// Apply the render timeout to one renderer call
    async fn bounded<T, F>(&self, operation: &str, call: F) -> Result<T, ExtractionError>
    where
        F: Future<Output = RenderResult<T>>,
    {
        match timeout(self.settings.timeout(), call).await {
            Ok(result) => result.map_err(ExtractionError::from),
            Err(_) => Err(ExtractionError::Timeout {
                operation: operation.to_string(),
                secs: self.settings.timeout_secs,
            }),
        }
    }
}

/// Whether a filename carries a `.pdf` extension (case-insensitive)
pub fn is_pdf_filename(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}

/// Generate a short session id from the first 32 bits of a v4 UUID
pub fn generate_session_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(GENERATED_SESSION_ID_LEN);
    id
}

/// Use the caller's session id as given, or generate one when absent
fn resolve_session_id(requested: Option<&str>) -> Result<String, ExtractionError> {
    let requested = requested.unwrap_or_default();
    if requested.is_empty() {
        return Ok(generate_session_id());
    }

    if requested.chars().count() > MAX_SESSION_ID_LEN {
        return Err(ExtractionError::InvalidInput(format!(
            "session_id must be at most {} characters",
            MAX_SESSION_ID_LEN
        )));
    }

    Ok(requested.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{encode_png, RenderError};
    use crate::store::NotFoundKind;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renderer producing blank pages of fixed point sizes
    struct FakeRenderer {
        /// (width, height) in points per page
        pages: Vec<(f32, f32)>,
        fail_on_page: Option<usize>,
        render_calls: AtomicUsize,
    }

    impl FakeRenderer {
        fn new(pages: Vec<(f32, f32)>) -> Self {
            Self {
                pages,
                fail_on_page: None,
                render_calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, page_index: usize) -> Self {
            self.fail_on_page = Some(page_index);
            self
        }
    }

    #[async_trait]
    impl PageRenderer for FakeRenderer {
        async fn page_count(&self, _pdf: Bytes) -> RenderResult<usize> {
            Ok(self.pages.len())
        }

        async fn render_page(
            &self,
            _pdf: Bytes,
            page_index: usize,
            scale: f32,
        ) -> RenderResult<RenderedPage> {
            self.render_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on_page == Some(page_index) {
                return Err(RenderError::Render("corrupt content stream".to_string()));
            }
            let (w, h) = self.pages[page_index];
            let width = (w * scale).round() as u32;
            let height = (h * scale).round() as u32;
            let samples = vec![255u8; width as usize * height as usize * 3];
            let png = encode_png(&samples, 3, width, height)?;
            Ok(RenderedPage {
                png: Bytes::from(png),
                width,
                height,
            })
        }
    }

    fn extractor(renderer: FakeRenderer) -> (Extractor, ImageStore) {
        let store = ImageStore::default();
        let extractor = Extractor::new(Arc::new(renderer), store.clone(), RenderConfig::default());
        (extractor, store)
    }

    fn request(session_id: Option<&str>, max_pages: Option<usize>) -> ExtractionRequest {
        ExtractionRequest {
            filename: Some("doc.pdf".to_string()),
            data: Bytes::from_static(b"%PDF-1.4 stub"),
            session_id: session_id.map(str::to_string),
            max_pages,
        }
    }

    #[test]
    fn test_is_pdf_filename() {
        assert!(is_pdf_filename("report.pdf"));
        assert!(is_pdf_filename("REPORT.PDF"));
        assert!(!is_pdf_filename("report.txt"));
        assert!(!is_pdf_filename("pdf"));
    }

    #[test]
    fn test_generate_session_id() {
        let ids: HashSet<String> = (0..100).map(|_| generate_session_id()).collect();
        assert_eq!(ids.len(), 100);
        for id in ids {
            assert_eq!(id.len(), 8);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_resolve_session_id() {
        assert_eq!(resolve_session_id(Some("abc-123")).unwrap(), "abc-123");
        assert_eq!(resolve_session_id(Some("user.42")).unwrap(), "user.42");
        assert_eq!(resolve_session_id(Some("org:7")).unwrap(), "org:7");
        assert_eq!(resolve_session_id(Some("")).unwrap().len(), 8);
        assert_eq!(resolve_session_id(None).unwrap().len(), 8);
        assert_eq!(resolve_session_id(Some(&"é".repeat(128))).unwrap().chars().count(), 128);
        assert!(resolve_session_id(Some(&"a".repeat(129))).is_err());
    }

    #[tokio::test]
    async fn test_extract_all_pages() {
        let (extractor, store) = extractor(FakeRenderer::new(vec![(300.0, 400.0); 3]));

        let result = extractor.extract(request(Some("s1"), None)).await.unwrap();

        assert_eq!(result.session_id, "s1");
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.extracted_pages, 3);
        let pages: Vec<usize> = result.images.iter().map(|i| i.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(result.images[0].id, "page-1");
        assert_eq!(result.images[0].label, "Page 1");
        assert_eq!((result.images[0].width, result.images[0].height), (600, 800));

        for image in &result.images {
            let stored = store.get("s1", &image.id).unwrap();
            assert_eq!((stored.width, stored.height), (image.width, image.height));
        }
    }

    #[tokio::test]
    async fn test_extract_respects_page_cap() {
        let (extractor, store) = extractor(FakeRenderer::new(vec![(100.0, 100.0); 5]));

        let result = extractor.extract(request(Some("s1"), Some(2))).await.unwrap();
        assert_eq!(result.total_pages, 5);
        assert_eq!(result.extracted_pages, 2);
        assert_eq!(store.get("s1", "page-3").unwrap_err().kind(), NotFoundKind::Image);

        let result = extractor.extract(request(Some("s2"), Some(50))).await.unwrap();
        assert_eq!(result.extracted_pages, 5);
    }

    #[tokio::test]
    async fn test_wide_pages_are_downscaled() {
        // 1000pt at 2x = 2000px, must come back at the 1200px limit
        let renderer = FakeRenderer::new(vec![(1000.0, 500.0), (300.0, 300.0)]);
        let (extractor, _store) = extractor(renderer);

        let result = extractor.extract(request(None, None)).await.unwrap();
        let wide = &result.images[0];
        assert_eq!(wide.width, 1200);
        assert_eq!(wide.height, 600);

        let narrow = &result.images[1];
        assert_eq!((narrow.width, narrow.height), (600, 600));
    }

    #[tokio::test]
    async fn test_failed_extraction_stores_nothing() {
        let renderer = FakeRenderer::new(vec![(100.0, 100.0); 4]).failing_on(2);
        let (extractor, store) = extractor(renderer);

        let err = extractor.extract(request(Some("s1"), None)).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Failed(ref msg) if msg.contains("corrupt")));
        assert!(!store.contains_session("s1"));
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let (extractor, _store) = extractor(FakeRenderer::new(vec![(100.0, 100.0)]));

        let mut bad_name = request(None, None);
        bad_name.filename = Some("report.txt".to_string());
        assert!(matches!(
            extractor.extract(bad_name).await,
            Err(ExtractionError::InvalidInput(_))
        ));

        assert!(matches!(
            extractor.extract(request(None, Some(0))).await,
            Err(ExtractionError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_renders_each_page_once_when_within_width() {
        let renderer = Arc::new(FakeRenderer::new(vec![(100.0, 100.0); 3]));
        let extractor = Extractor::new(renderer.clone(), ImageStore::default(), RenderConfig::default());

        extractor.extract(request(None, None)).await.unwrap();
        assert_eq!(renderer.render_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_reextraction_merges_into_session() {
        let (extractor, store) = extractor(FakeRenderer::new(vec![(100.0, 100.0); 3]));

        extractor.extract(request(Some("s1"), None)).await.unwrap();
        let result = extractor.extract(request(Some("s1"), Some(1))).await.unwrap();

        assert_eq!(result.extracted_pages, 1);
        assert_eq!(store.list("s1").unwrap().image_count, 3);
    }

    struct SlowRenderer;

    #[async_trait]
    impl PageRenderer for SlowRenderer {
        async fn page_count(&self, _pdf: Bytes) -> RenderResult<usize> {
            Ok(1)
        }

        async fn render_page(
            &self,
            _pdf: Bytes,
            _page_index: usize,
            _scale: f32,
        ) -> RenderResult<RenderedPage> {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            Err(RenderError::Render("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_render_timeout() {
        let settings = RenderConfig {
            timeout_secs: 1,
            ..RenderConfig::default()
        };
        let store = ImageStore::default();
        let extractor = Extractor::new(Arc::new(SlowRenderer), store.clone(), settings);

        let err = extractor.extract(request(Some("slow"), None)).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Timeout { ref operation, secs: 1 } if operation == "Rendering page 1"
        ));
        assert!(!store.contains_session("slow"));
    }
}
