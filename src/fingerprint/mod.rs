//! Audio content fingerprinting.
//!
//! # Architecture
//!
//! - **Chromaprint** (`chromaprint.rs`) - high-fidelity fingerprints via `fpcalc`
//! - **Spectral hash** (`spectral.rs`) - fallback: mel-spectrogram reduced to 32 time bins
//! - **Decoder / resampler** - symphonia + rubato, feeding the spectral hash
//! - **Comparator** (`compare.rs`) - similarity between two fingerprints
//! - **Cache** (`cache.rs`) - process-lifetime cache keyed by resolved path
//! - **Generator** (`generator.rs`) - ties the above together on a bounded CPU pool
//!
//! # Usage
//!
//! ```ignore
//! let cache = Arc::new(FingerprintCache::new());
//! let generator = FingerprintGenerator::new(FingerprintSettings::default(), cache)?;
//! let fp = generator.generate_async(Path::new("song.flac")).await?;
//! let score = compare(&fp, &other);
//! ```

mod cache;
pub mod chromaprint;
mod compare;
mod decoder;
mod generator;
mod resampler;
pub mod spectral;

pub use cache::FingerprintCache;
pub use compare::{DURATION_TOLERANCE_SECS, compare};
pub use generator::{FingerprintGenerator, FingerprintSettings};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which algorithm produced a fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintAlgorithm {
    Chromaprint,
    SpectralHash,
}

impl FingerprintAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            FingerprintAlgorithm::Chromaprint => "chromaprint",
            FingerprintAlgorithm::SpectralHash => "spectral_hash",
        }
    }
}

/// A content signature for one audio file.
///
/// Equality is hash equality; the signature is only consulted when hashes
/// differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Lowercase hex SHA-256 over the signature bytes
    pub hash: String,
    /// Duration in seconds
    pub duration: f64,
    pub signature: Vec<f64>,
    /// Sample rate the signature was computed at
    pub sample_rate: u32,
    pub algorithm: FingerprintAlgorithm,
}

impl PartialEq for Fingerprint {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Fingerprint {}

/// SHA-256 of `bytes` as a lowercase hex string.
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Errors that can occur while fingerprinting one asset.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FingerprintError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Chromaprint failed: {0}")]
    Chromaprint(String),

    #[error("Fingerprint worker pool error: {0}")]
    WorkerPool(String),
}
