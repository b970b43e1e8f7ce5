//! Local filesystem index.
//!
//! Not a matching source: it resolves cache keys, finds audio files, and
//! turns tagged files into candidates.

use std::path::{Path, PathBuf};

use futures::stream::Stream;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;
use tokio::sync::mpsc;
use walkdir::WalkDir;

use crate::fingerprint::FingerprintError;
use crate::model::CandidateAsset;

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "wav", "m4a"];

/// Resolve a path to the key the fingerprint cache uses.
///
/// Canonicalizes when the file exists; otherwise makes the path absolute
/// against the working directory.
pub fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Whether the path has an audio extension we fingerprint (case-insensitive).
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Scan `root` recursively for audio files.
pub fn scan(root: PathBuf) -> impl Stream<Item = PathBuf> {
    let (tx, rx) = mpsc::channel(100);

    // Walk on a blocking thread; the channel closing stops the walk
    tokio::task::spawn_blocking(move || {
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file()
                && is_audio_file(entry.path())
                && tx.blocking_send(entry.path().to_path_buf()).is_err()
            {
                break;
            }
        }
    });

    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|path| (path, rx))
    })
}

/// Build a candidate from a file's embedded tags.
///
/// Missing title falls back to the file stem. No external ID is set: file
/// tags carry MusicBrainz IDs, which no backing store indexes.
pub fn candidate_from_file(path: &Path) -> Result<CandidateAsset, FingerprintError> {
    if !path.is_file() {
        return Err(FingerprintError::NotFound(path.to_path_buf()));
    }

    let tagged_file = Probe::open(path)
        .and_then(|p| p.read())
        .map_err(|e| FingerprintError::UnsupportedFormat(e.to_string()))?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(stem);
    let artist = tag
        .and_then(|t| t.artist().map(|s| s.to_string()))
        .unwrap_or_default();

    let resolved = resolve(path);
    Ok(CandidateAsset::new(resolved.to_string_lossy(), title, artist)
        .with_duration(tagged_file.properties().duration().as_secs_f64())
        .with_file(resolved))
}
