//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::extraction::Extractor;
use crate::render::PageRenderer;
use crate::store::ImageStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: ImageStore,
    extractor: Extractor,
}

impl AppState {
    /// Create application state around a renderer
    ///
    /// The image store is built from `config.store`; the extractor shares it.
    pub fn new(config: Config, renderer: Arc<dyn PageRenderer>) -> Self {
        let store = ImageStore::new(&config.store);
        let extractor = Extractor::new(renderer, store.clone(), config.render.clone());

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                extractor,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the image store
    pub fn store(&self) -> &ImageStore {
        &self.inner.store
    }

    /// Get the extraction orchestrator
    pub fn extractor(&self) -> &Extractor {
        &self.inner.extractor
    }
}
