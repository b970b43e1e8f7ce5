//! Fingerprint generation: Chromaprint first, spectral hash as fallback.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::oneshot;

use super::cache::FingerprintCache;
use super::{Fingerprint, FingerprintError, chromaprint, spectral};
use crate::sources::filesystem;

/// Generator behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintSettings {
    /// Try fpcalc before the spectral hash
    pub use_chromaprint: bool,
    /// Rate the spectral hash resamples to
    pub sample_rate: u32,
    /// Size of the CPU pool used by `generate_async`
    pub workers: usize,
    pub cache_enabled: bool,
}

impl Default for FingerprintSettings {
    fn default() -> Self {
        Self {
            use_chromaprint: true,
            sample_rate: spectral::DEFAULT_SAMPLE_RATE,
            workers: 2,
            cache_enabled: true,
        }
    }
}

/// Produces fingerprints and keeps them in a shared cache.
///
/// Cheap to clone; clones share the cache and the worker pool.
#[derive(Clone)]
pub struct FingerprintGenerator {
    settings: FingerprintSettings,
    cache: Arc<FingerprintCache>,
    pool: Arc<rayon::ThreadPool>,
}

impl std::fmt::Debug for FingerprintGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintGenerator")
            .field("settings", &self.settings)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl FingerprintGenerator {
    pub fn new(
        settings: FingerprintSettings,
        cache: Arc<FingerprintCache>,
    ) -> Result<Self, FingerprintError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers.max(1))
            .thread_name(|i| format!("fingerprint-{i}"))
            .build()
            .map_err(|e| FingerprintError::WorkerPool(e.to_string()))?;

        Ok(Self {
            settings,
            cache,
            pool: Arc::new(pool),
        })
    }

    pub fn settings(&self) -> &FingerprintSettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<FingerprintCache> {
        &self.cache
    }

    /// Fingerprint a file on the calling thread.
    ///
    /// Uses and fills the cache unless caching is disabled in the settings.
    pub fn generate(&self, path: &Path) -> Result<Arc<Fingerprint>, FingerprintError> {
        if !self.settings.cache_enabled {
            return self.generate_uncached(path).map(Arc::new);
        }

        let key = filesystem::resolve(path);
        self.cache
            .get_or_try_insert_with(&key, || self.generate_uncached(&key))
    }

    /// Fingerprint a file on the worker pool without blocking the async runtime.
    pub async fn generate_async(&self, path: &Path) -> Result<Arc<Fingerprint>, FingerprintError> {
        if self.settings.cache_enabled
            && let Some(hit) = self.cache.get(&filesystem::resolve(path))
        {
            return Ok(hit);
        }

        let (tx, rx) = oneshot::channel();
        let this = self.clone();
        let path = path.to_path_buf();

        self.pool.spawn(move || {
            // Receiver gone means the caller stopped waiting
            let _ = tx.send(this.generate(&path));
        });

        rx.await.map_err(|_| {
            FingerprintError::WorkerPool("fingerprint worker dropped its result".to_string())
        })?
    }

    /// Fingerprint a file, bypassing the cache entirely.
    pub fn generate_uncached(&self, path: &Path) -> Result<Fingerprint, FingerprintError> {
        if !path.is_file() {
            return Err(FingerprintError::NotFound(path.to_path_buf()));
        }

        if self.settings.use_chromaprint {
            match chromaprint::generate(path) {
                Ok(fp) => return Ok(fp),
                Err(e) => {
                    tracing::debug!(
                        path = %path.display(),
                        error = %e,
                        "Chromaprint unavailable, falling back to spectral hash"
                    );
                }
            }
        }

        spectral::fingerprint_file(path, self.settings.sample_rate)
    }

    pub fn is_chromaprint_available(&self) -> bool {
        chromaprint::is_available()
    }

    pub fn chromaprint_version(&self) -> Option<String> {
        chromaprint::version()
    }
}
