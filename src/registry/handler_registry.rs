//! # Handler Registry
//!
//! Loads the ordered handler set and hot-reloads it lazily.
//!
//! A load is: statically registered handlers first, then every manifest in
//! the handler directory in filename order, then a stable sort by ascending
//! priority. Candidates that fail discovery are skipped with a warning.
//!
//! The set lives behind `RwLock<Arc<HandlerSet>>`. A reload builds a whole
//! new set and swaps the `Arc` in one write, so a dispatch holding a
//! snapshot keeps iterating the old set untouched.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::catalog::HandlerCatalog;
use super::manifest::{discover_manifests, HandlerManifest};
use super::{DiscoveryError, HandlerDescriptor};
use crate::config::HandlerConfig;
use crate::logging::log_registry_operation;

/// One immutable, priority-ordered generation of handlers.
#[derive(Debug)]
pub struct HandlerSet {
    handlers: Vec<Arc<HandlerDescriptor>>,
    generation: u64,
    loaded_at: Instant,
}

impl HandlerSet {
    pub fn handlers(&self) -> &[Arc<HandlerDescriptor>] {
        &self.handlers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<HandlerDescriptor>> {
        self.handlers.iter()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Increments on every load, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}

#[derive(Debug)]
pub struct HandlerRegistry {
    directory: Option<PathBuf>,
    catalog: HandlerCatalog,
    static_handlers: Vec<Arc<HandlerDescriptor>>,
    reload_interval: Duration,
    current: RwLock<Arc<HandlerSet>>,
    generations: AtomicU64,
}

impl HandlerRegistry {
    /// Registry over a manifest directory. Performs the initial load.
    pub fn new(directory: impl Into<PathBuf>, catalog: HandlerCatalog, reload_interval: Duration) -> Self {
        Self::build(Some(directory.into()), catalog, Vec::new(), reload_interval)
    }

    pub fn from_config(config: &HandlerConfig, catalog: HandlerCatalog) -> Self {
        Self::new(&config.directory, catalog, config.reload_interval)
    }

    /// Registry over an explicit handler list, with no directory scan.
    pub fn with_handlers(handlers: Vec<HandlerDescriptor>, reload_interval: Duration) -> Self {
        Self::build(
            None,
            HandlerCatalog::new(),
            handlers.into_iter().map(Arc::new).collect(),
            reload_interval,
        )
    }

    fn build(
        directory: Option<PathBuf>,
        catalog: HandlerCatalog,
        static_handlers: Vec<Arc<HandlerDescriptor>>,
        reload_interval: Duration,
    ) -> Self {
        let registry = Self {
            directory,
            catalog,
            static_handlers,
            reload_interval,
            current: RwLock::new(Arc::new(HandlerSet {
                handlers: Vec::new(),
                generation: 0,
                loaded_at: Instant::now(),
            })),
            generations: AtomicU64::new(0),
        };
        registry.load();
        registry
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn reload_interval(&self) -> Duration {
        self.reload_interval
    }

    /// Current handler set. Cheap: one `Arc` clone under a read lock.
    pub fn snapshot(&self) -> Arc<HandlerSet> {
        Arc::clone(&*self.current.read())
    }

    /// Rebuild the handler set from scratch and swap it in.
    pub fn load(&self) -> Arc<HandlerSet> {
        let mut handlers = self.static_handlers.clone();
        handlers.extend(self.discover().into_iter().map(Arc::new));
        // Stable: equal priorities keep discovery order.
        handlers.sort_by_key(|h| h.priority());

        let set = Arc::new(HandlerSet {
            handlers,
            generation: self.generations.fetch_add(1, Ordering::SeqCst) + 1,
            loaded_at: Instant::now(),
        });

        info!(
            generation = set.generation,
            handlers = ?set.names(),
            "Handler registry loaded"
        );

        *self.current.write() = Arc::clone(&set);
        set
    }

    /// Reload if more than the reload interval has passed since the last
    /// load. Returns whether a reload happened.
    pub fn maybe_reload(&self) -> bool {
        let elapsed = self.current.read().loaded_at.elapsed();
        if elapsed > self.reload_interval {
            debug!(elapsed_ms = elapsed.as_millis() as u64, "Reload interval elapsed");
            self.load();
            true
        } else {
            false
        }
    }

    fn discover(&self) -> Vec<HandlerDescriptor> {
        let Some(directory) = &self.directory else {
            return Vec::new();
        };

        let paths = match discover_manifests(directory) {
            Ok(paths) => paths,
            Err(e) => {
                warn!(error = %e, "Handler directory unavailable, no handlers discovered");
                return Vec::new();
            }
        };

        paths
            .iter()
            .filter_map(|path| match self.instantiate(path) {
                Ok(Some(handler)) => {
                    log_registry_operation(
                        "discover",
                        Some(handler.name()),
                        Some(handler.priority()),
                        "loaded",
                        None,
                    );
                    Some(handler)
                }
                Ok(None) => {
                    debug!(path = %path.display(), "Handler disabled by manifest");
                    None
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping handler");
                    None
                }
            })
            .collect()
    }

    /// Validate one manifest and build its handler. `Ok(None)` for a
    /// disabled manifest.
    fn instantiate(&self, path: &Path) -> Result<Option<HandlerDescriptor>, DiscoveryError> {
        let manifest = HandlerManifest::from_path(path)?;
        if !manifest.enabled {
            return Ok(None);
        }

        let factory = self
            .catalog
            .get(&manifest.handler)
            .ok_or_else(|| DiscoveryError::unknown_handler(path, &manifest.handler))?;

        let handler = factory(&manifest.settings)?;
        Ok(Some(match manifest.priority {
            Some(priority) => handler.with_priority(priority),
            None => handler,
        }))
    }
}
