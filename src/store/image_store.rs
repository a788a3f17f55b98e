//! In-memory image store with LRU and TTL eviction

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;

use super::types::{SessionSummary, StoreError, StoreStats, StoredImage, StoredImageInfo};
use crate::config::StoreConfig;
use crate::extraction::ExtractedImage;

/// Fallback capacity if a zero limit slips through
const DEFAULT_MAX_SESSIONS: usize = 256;

struct SessionEntry {
    images: HashMap<String, StoredImage>,
    created_at: DateTime<Utc>,
    last_access: Instant,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            images: HashMap::new(),
            created_at: Utc::now(),
            last_access: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Option<Duration>, now: Instant) -> bool {
        ttl.is_some_and(|ttl| now.duration_since(self.last_access) > ttl)
    }

    fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    fn total_bytes(&self) -> usize {
        self.images.values().map(|image| image.data.len()).sum()
    }
}

/// Thread-safe session → image store
///
/// Cloning is cheap; clones share the same underlying map. Every operation
/// takes the single store lock for a short, non-async critical section, so a
/// session is never observable half-written or half-deleted.
#[derive(Clone)]
pub struct ImageStore {
    inner: Arc<ImageStoreInner>,
}

struct ImageStoreInner {
    sessions: Mutex<LruCache<String, SessionEntry>>,
    session_ttl: Option<Duration>,
    byte_limit: Option<usize>,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new(&StoreConfig::default())
    }
}

impl ImageStore {
    /// Create a store from configuration
    pub fn new(config: &StoreConfig) -> Self {
        Self::with_byte_limit(config.max_sessions, config.session_ttl(), config.byte_limit())
    }

    /// Create a store with an explicit session capacity and idle TTL
    pub fn with_limits(max_sessions: usize, session_ttl: Option<Duration>) -> Self {
        Self::with_byte_limit(max_sessions, session_ttl, None)
    }

    /// Create a store that also bounds the total PNG bytes it holds
    ///
    /// When a write pushes the total over `byte_limit`, least recently used
    /// sessions are evicted until it fits again. The session being written
    /// is never evicted by its own write.
    pub fn with_byte_limit(
        max_sessions: usize,
        session_ttl: Option<Duration>,
        byte_limit: Option<usize>,
    ) -> Self {
        let capacity = NonZeroUsize::new(max_sessions)
            .or(NonZeroUsize::new(DEFAULT_MAX_SESSIONS))
            .unwrap_or(NonZeroUsize::MIN);

        Self {
            inner: Arc::new(ImageStoreInner {
                sessions: Mutex::new(LruCache::new(capacity)),
                session_ttl,
                byte_limit,
            }),
        }
    }

    /// Store a single image, creating the session if needed
    ///
    /// An existing image with the same id is replaced.
    pub fn put(&self, session_id: &str, image_id: &str, image: StoredImage) {
        self.put_all(session_id, vec![(image_id.to_string(), image)]);
    }

    /// Store a batch of images into one session under a single lock
    ///
    /// Images are merged into an existing session by id: matching ids are
    /// overwritten, all other images already in the session are kept.
    pub fn put_all(&self, session_id: &str, images: Vec<(String, StoredImage)>) {
        let count = images.len();
        let mut sessions = self.inner.sessions.lock();
        let now = Instant::now();

        let stale = sessions
            .peek(session_id)
            .map(|entry| entry.is_expired(self.inner.session_ttl, now))
            .unwrap_or(true);

        if stale {
            if let Some((evicted_id, evicted)) =
                sessions.push(session_id.to_string(), SessionEntry::new())
            {
                if evicted_id != session_id {
                    tracing::info!(
                        session_id = %evicted_id,
                        images = evicted.images.len(),
                        "Evicted least recently used session"
                    );
                }
            }
        }

        // Present after the push above
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.images.extend(images);
            entry.touch();
            tracing::debug!(
                session_id = %session_id,
                stored = count,
                session_images = entry.images.len(),
                "Stored images"
            );
        }

        if let Some(limit) = self.inner.byte_limit {
            evict_over_byte_limit(&mut sessions, session_id, limit);
        }
    }

    /// Fetch one image
    ///
    /// Distinguishes an unknown (or expired) session from an unknown image.
    pub fn get(&self, session_id: &str, image_id: &str) -> Result<StoredImage, StoreError> {
        let mut sessions = self.inner.sessions.lock();
        let entry = live_entry(&mut sessions, session_id, self.inner.session_ttl)?;

        entry
            .images
            .get(image_id)
            .cloned()
            .ok_or_else(|| StoreError::ImageNotFound {
                session_id: session_id.to_string(),
                image_id: image_id.to_string(),
            })
    }

    /// Describe a session and its images, ordered by page number
    pub fn list(&self, session_id: &str) -> Result<SessionSummary, StoreError> {
        let mut sessions = self.inner.sessions.lock();
        let entry = live_entry(&mut sessions, session_id, self.inner.session_ttl)?;

        let mut images: Vec<StoredImageInfo> = entry
            .images
            .iter()
            .map(|(id, image)| StoredImageInfo {
                id: id.clone(),
                page_number: image.page_number,
                label: ExtractedImage::label_for_page(image.page_number),
                width: image.width,
                height: image.height,
            })
            .collect();
        images.sort_by(|a, b| a.page_number.cmp(&b.page_number).then_with(|| a.id.cmp(&b.id)));

        Ok(SessionSummary {
            session_id: session_id.to_string(),
            created_at: entry.created_at,
            image_count: images.len(),
            images,
        })
    }

    /// Remove a session and all of its images
    ///
    /// Returns the number of images removed.
    pub fn delete_session(&self, session_id: &str) -> Result<usize, StoreError> {
        let entry = {
            let mut sessions = self.inner.sessions.lock();
            sessions
                .pop(session_id)
                .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?
        };

        // An expired session is already gone as far as callers can tell
        if entry.is_expired(self.inner.session_ttl, Instant::now()) {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }

        tracing::info!(
            session_id = %session_id,
            images = entry.images.len(),
            "Deleted session"
        );

        Ok(entry.images.len())
    }

    /// Whether a live session exists, without refreshing its recency
    #[cfg(test)]
    pub(crate) fn contains_session(&self, session_id: &str) -> bool {
        let sessions = self.inner.sessions.lock();
        sessions
            .peek(session_id)
            .is_some_and(|entry| !entry.is_expired(self.inner.session_ttl, Instant::now()))
    }

    /// Remove every session idle for longer than the TTL
    ///
    /// Returns the number of sessions removed.
    pub fn purge_expired(&self) -> usize {
        let Some(ttl) = self.inner.session_ttl else {
            return 0;
        };

        let now = Instant::now();
        let mut sessions = self.inner.sessions.lock();

        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, entry)| entry.is_expired(Some(ttl), now))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.pop(id);
            tracing::debug!(session_id = %id, "Purged expired session");
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "Purged expired sessions");
        }

        expired.len()
    }

    /// Current store statistics
    pub fn stats(&self) -> StoreStats {
        let sessions = self.inner.sessions.lock();
        let (images, total_bytes) = sessions
            .iter()
            .fold((0, 0), |(images, bytes), (_, entry)| {
                (images + entry.images.len(), bytes + entry.total_bytes())
            });

        StoreStats {
            sessions: sessions.len(),
            images,
            total_bytes,
            max_sessions: sessions.cap().get(),
            byte_limit: self.inner.byte_limit,
        }
    }

    /// Start the background sweeper that purges expired sessions
    pub fn start_cleanup_task(self, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                self.purge_expired();

                let stats = self.stats();
                tracing::debug!(
                    sessions = stats.sessions,
                    images = stats.images,
                    total_bytes = stats.total_bytes,
                    "Image store usage"
                );
            }
        })
    }
}

/// Look up a session, dropping it if it has expired, and mark it as used
fn live_entry<'a>(
    sessions: &'a mut LruCache<String, SessionEntry>,
    session_id: &str,
    ttl: Option<Duration>,
) -> Result<&'a mut SessionEntry, StoreError> {
    let expired = sessions
        .peek(session_id)
        .map(|entry| entry.is_expired(ttl, Instant::now()))
        .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;

    if expired {
        sessions.pop(session_id);
        tracing::debug!(session_id = %session_id, "Session expired on access");
        return Err(StoreError::SessionNotFound(session_id.to_string()));
    }

    let entry = sessions
        .get_mut(session_id)
        .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
    entry.touch();
    Ok(entry)
}

/// Evict least recently used sessions until the store fits `limit` bytes
fn evict_over_byte_limit(
    sessions: &mut LruCache<String, SessionEntry>,
    keep: &str,
    limit: usize,
) {
    let mut total: usize = sessions.iter().map(|(_, entry)| entry.total_bytes()).sum();

    while total > limit {
        match sessions.peek_lru() {
            Some((id, _)) if id.as_str() != keep => {}
            _ => break,
        }
        let Some((evicted_id, evicted)) = sessions.pop_lru() else {
            break;
        };
        let freed = evicted.total_bytes();
        total = total.saturating_sub(freed);
        tracing::info!(
            session_id = %evicted_id,
            freed_bytes = freed,
            total_bytes = total,
            "Evicted session to stay within byte limit"
        );
    }

    if total > limit {
        tracing::warn!(
            session_id = %keep,
            total_bytes = total,
            limit,
            "Session alone exceeds the store byte limit"
        );
    }
}
