//! Process-lifetime fingerprint cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::Fingerprint;

/// Thread-safe fingerprint cache keyed by resolved file path.
///
/// Readers proceed concurrently. Computation through
/// [`get_or_try_insert_with`](Self::get_or_try_insert_with) takes a per-path
/// lock, so concurrent callers asking for the same file compute it once.
///
/// Entries are never checked against the file's modification time. A file
/// re-encoded in place keeps its old fingerprint until [`remove`](Self::remove)
/// or [`clear`](Self::clear) is called.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: RwLock<HashMap<PathBuf, Arc<Fingerprint>>>,
    in_flight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Arc<Fingerprint>> {
        self.entries.read().get(path).cloned()
    }

    pub fn insert(&self, path: PathBuf, fingerprint: Fingerprint) -> Arc<Fingerprint> {
        let fingerprint = Arc::new(fingerprint);
        self.entries.write().insert(path, Arc::clone(&fingerprint));
        fingerprint
    }

    /// Return the cached fingerprint, computing and inserting it on a miss.
    ///
    /// Errors are not cached; the next caller retries.
    pub fn get_or_try_insert_with<E, F>(&self, path: &Path, compute: F) -> Result<Arc<Fingerprint>, E>
    where
        F: FnOnce() -> Result<Fingerprint, E>,
    {
        if let Some(hit) = self.get(path) {
            return Ok(hit);
        }

        let flight = InFlight {
            cache: self,
            path,
            slot: Arc::clone(self.in_flight.lock().entry(path.to_path_buf()).or_default()),
        };
        let _guard = flight.slot.lock();

        // Another caller may have finished while we waited
        if let Some(hit) = self.get(path) {
            return Ok(hit);
        }

        compute().map(|fp| self.insert(path.to_path_buf(), fp))
    }

    pub fn remove(&self, path: &Path) -> Option<Arc<Fingerprint>> {
        self.entries.write().remove(path)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Releases a path's in-flight slot on every exit, panics included. A slot
/// that a later caller has since replaced is left alone.
struct InFlight<'a> {
    cache: &'a FingerprintCache,
    path: &'a Path,
    slot: Arc<Mutex<()>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.cache.in_flight.lock();
        if in_flight
            .get(self.path)
            .is_some_and(|current| Arc::ptr_eq(current, &self.slot))
        {
            in_flight.remove(self.path);
        }
    }
}
