//! Test utilities and fixtures for music-dedupe tests.
//!
//! Generated audio, temporary databases and shared adapter fixtures.
//!
//! # Example
//!
//! ```ignore
//! use crate::test_utils::{temp_db, write_ramp_wav};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (pool, _dir) = temp_db().await;
//!     write_ramp_wav(&path, 440.0, 2.0, 22050, true);
//!     // ... test logic
//! }
//! ```

use std::f32::consts::TAU;
use std::path::Path;
use std::sync::Arc;

use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;

use crate::fingerprint::{FingerprintCache, FingerprintGenerator, FingerprintSettings};
use crate::model::SourceSchema;

/// Creates a temporary database for testing.
///
/// Keep the `TempDir` alive for the duration of the test; the database is
/// deleted when it drops.
pub async fn temp_db() -> (SqlitePool, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_url = crate::db::db_url(Some(&dir.path().join("test.db")));

    let pool = crate::db::init_db(&db_url)
        .await
        .expect("Failed to initialize test database");

    (pool, dir)
}

/// A sine tone whose amplitude ramps linearly between 0.05 and 1.0.
///
/// `rising` picks the direction. The envelope gives the spectral hash
/// something to track over time; a steady tone would produce a flat
/// signature.
pub fn ramp_tone(freq: f32, secs: f32, sample_rate: u32, rising: bool) -> Vec<f32> {
    let total = (secs * sample_rate as f32) as usize;
    (0..total)
        .map(|i| {
            let progress = i as f32 / total.max(1) as f32;
            let envelope = if rising { progress } else { 1.0 - progress };
            let amplitude = 0.05 + 0.95 * envelope;
            amplitude * (TAU * freq * i as f32 / sample_rate as f32).sin()
        })
        .collect()
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).expect("Failed to write sample");
        }
    }
    writer.finalize().expect("Failed to finalize WAV");
}

/// Write a constant-amplitude sine tone as 16-bit PCM.
pub fn write_sine_wav(path: &Path, freq: f32, secs: f32, sample_rate: u32, channels: u16) {
    let total = (secs * sample_rate as f32) as usize;
    let samples: Vec<f32> = (0..total)
        .map(|i| 0.5 * (TAU * freq * i as f32 / sample_rate as f32).sin())
        .collect();
    write_wav(path, &samples, sample_rate, channels);
}

/// Write [`ramp_tone`] as mono 16-bit PCM.
pub fn write_ramp_wav(path: &Path, freq: f32, secs: f32, sample_rate: u32, rising: bool) {
    write_wav(path, &ramp_tone(freq, secs, sample_rate, rising), sample_rate, 1);
}

/// A generator that never shells out to fpcalc, so hashes are
/// deterministic whatever is installed on the machine.
pub fn spectral_generator() -> FingerprintGenerator {
    let settings = FingerprintSettings {
        use_chromaprint: false,
        ..Default::default()
    };
    FingerprintGenerator::new(settings, Arc::new(FingerprintCache::new()))
        .expect("Failed to build fingerprint generator")
}

/// Schema used by in-memory stores in tests.
pub fn store_schema() -> SourceSchema {
    SourceSchema {
        fingerprint_fields: vec!["fingerprint".into()],
        url_fields: vec!["url".into()],
        external_id_field: Some("spotify_id".into()),
        file_fields: vec!["file".into()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (pool, _dir) = temp_db().await;

        let groups = crate::db::get_groups(&pool).await.unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_ramp_tone_envelope() {
        let rising = ramp_tone(100.0, 1.0, 8000, true);
        assert_eq!(rising.len(), 8000);

        let peak = |s: &[f32]| s.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        assert!(peak(&rising[..800]) < peak(&rising[7200..]));

        let falling = ramp_tone(100.0, 1.0, 8000, false);
        assert!(peak(&falling[..800]) > peak(&falling[7200..]));
    }

    #[test]
    fn test_write_sine_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_sine_wav(&path, 440.0, 0.5, 8000, 2);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 4000);
    }
}
