//! The connector cache.
//!
//! A [`Connector`] pairs a resolved connection string with the engine built
//! for it. The [`ConnectorCache`] holds at most one connector per string, so
//! binds that resolve to the same URL share an engine, and a dynamic bind
//! that alternates between URLs reuses the engine it built the first time.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use uuid::Uuid;

use crate::backends::sqlite::Engine;
use crate::config::EngineOptions;
use crate::error::BindResult;
use crate::url::DatabaseUrl;

/// A cached engine together with the URL and state it belongs to.
#[derive(Debug)]
pub struct Connector {
    url: String,
    engine: Arc<Engine>,
    owner: Uuid,
}

impl Connector {
    /// Returns the connection string this connector was built for.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the engine.
    pub fn get_engine(&self) -> Arc<Engine> {
        Arc::clone(&self.engine)
    }

    /// Returns the id of the bind state that created this connector.
    pub fn owner_id(&self) -> Uuid {
        self.owner
    }
}

#[derive(Debug)]
struct CacheEntry {
    connector: Arc<Connector>,
    last_access: AtomicU64,
}

/// Connectors keyed by resolved connection string.
#[derive(Debug)]
pub struct ConnectorCache {
    owner: Uuid,
    options: EngineOptions,
    max_connectors: Option<usize>,
    pinned: Option<String>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    clock: AtomicU64,
}

impl ConnectorCache {
    /// Creates an empty, unbounded cache owned by `owner`.
    pub fn new(owner: Uuid, options: EngineOptions) -> Self {
        Self {
            owner,
            options,
            max_connectors: None,
            pinned: None,
            entries: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    /// Caps the number of cached connectors.
    ///
    /// When a new connector would exceed the cap, the least recently used
    /// connector other than the pinned one is evicted. A pinned cache needs
    /// a cap of at least 2 to stay within it.
    pub fn with_max_connectors(mut self, max: Option<usize>) -> Self {
        self.max_connectors = max;
        self
    }

    /// Protects the connector for `url` from eviction.
    pub fn with_pinned(mut self, url: impl Into<String>) -> Self {
        self.pinned = Some(url.into());
        self
    }

    /// Returns the id of the owning state.
    pub fn owner(&self) -> Uuid {
        self.owner
    }

    /// Returns the connector for `url`, building its engine on first use.
    pub fn get_or_create(&self, url: &str) -> BindResult<Arc<Connector>> {
        if let Some(connector) = self.get(url) {
            tracing::debug!(url = %url, "Connector cache hit");
            return Ok(connector);
        }

        let mut entries = self.entries.write();
        // Another resolver may have created it while we waited for the lock.
        if let Some(entry) = entries.get(url) {
            entry.last_access.store(self.tick(), Ordering::Relaxed);
            return Ok(Arc::clone(&entry.connector));
        }

        tracing::debug!(url = %url, "Connector cache miss");
        let engine = Engine::new(DatabaseUrl::parse(url)?, &self.options)?;
        tracing::info!(url = %url, engine_id = %engine.id(), "Created connector");

        let connector = Arc::new(Connector {
            url: url.to_string(),
            engine: Arc::new(engine),
            owner: self.owner,
        });
        entries.insert(
            url.to_string(),
            CacheEntry {
                connector: Arc::clone(&connector),
                last_access: AtomicU64::new(self.tick()),
            },
        );

        for evicted in self.urls_to_evict(&entries, url) {
            entries.remove(&evicted);
            tracing::debug!(url = %evicted, "Evicted least recently used connector");
        }

        Ok(connector)
    }

    /// Returns the cached connector for `url`, if any.
    pub fn get(&self, url: &str) -> Option<Arc<Connector>> {
        let entries = self.entries.read();
        entries.get(url).map(|entry| {
            entry.last_access.store(self.tick(), Ordering::Relaxed);
            Arc::clone(&entry.connector)
        })
    }

    /// Returns `true` if a connector exists for `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.entries.read().contains_key(url)
    }

    /// Returns the number of cached connectors.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no connector is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the cached connection strings, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.entries.read().keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Returns all cached connectors, sorted by URL.
    pub fn connectors(&self) -> Vec<Arc<Connector>> {
        let entries = self.entries.read();
        let mut connectors: Vec<_> = entries.values().map(|e| Arc::clone(&e.connector)).collect();
        connectors.sort_by(|a, b| a.url.cmp(&b.url));
        connectors
    }

    /// Removes the connector for `url`.
    pub fn remove(&self, url: &str) -> Option<Arc<Connector>> {
        self.entries.write().remove(url).map(|entry| entry.connector)
    }

    /// Removes every connector.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        tracing::debug!(count, "Cleared connector cache");
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    fn urls_to_evict(&self, entries: &HashMap<String, CacheEntry>, keep: &str) -> Vec<String> {
        let max = self.max_connectors.unwrap_or(usize::MAX);
        if entries.len() <= max {
            return Vec::new();
        }

        let mut candidates: Vec<_> = entries
            .iter()
            .filter(|(url, _)| url.as_str() != keep && Some(url.as_str()) != self.pinned.as_deref())
            .map(|(url, entry)| (entry.last_access.load(Ordering::Relaxed), url))
            .collect();
        candidates.sort();

        let to_evict = entries.len() - max;
        candidates
            .into_iter()
            .take(to_evict)
            .map(|(_, url)| url.clone())
            .collect()
    }
}
