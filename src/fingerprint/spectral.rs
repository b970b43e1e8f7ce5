//! Spectral-hash fingerprints.
//!
//! The fallback when Chromaprint is unavailable or fails:
//! 1. decode to mono at a fixed sample rate
//! 2. log-scaled mel spectrogram (Hann-windowed STFT)
//! 3. average every mel band of every frame into 32 time bins
//! 4. SHA-256 over the flat f32 vector
//!
//! Small encoding differences (bitrate, container, source sample rate) move
//! the 32 values only slightly, which is what the comparator relies on when
//! the hashes differ.

use std::path::Path;

use realfft::RealFftPlanner;
use rustfft::num_complex::Complex;

use super::decoder::decode_mono;
use super::resampler::resample_mono;
use super::{Fingerprint, FingerprintAlgorithm, FingerprintError, digest_hex};

/// Number of values in a spectral signature.
pub const TIME_BINS: usize = 32;
/// Rate every file is resampled to before analysis.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

const FFT_SIZE: usize = 2048;
const HOP_SIZE: usize = 512;
const MEL_BANDS: usize = 128;
/// Dynamic range kept below the loudest cell, in dB
const TOP_DB: f32 = 80.0;
const POWER_FLOOR: f32 = 1e-10;

/// Fingerprint a file with the spectral hash.
pub fn fingerprint_file(path: &Path, sample_rate: u32) -> Result<Fingerprint, FingerprintError> {
    let audio = decode_mono(path)?;
    let duration = audio.duration_secs();
    let samples = resample_mono(&audio.samples, audio.sample_rate, sample_rate)?;

    Ok(fingerprint_samples(&samples, sample_rate, duration))
}

/// Fingerprint already-decoded mono samples.
pub fn fingerprint_samples(samples: &[f32], sample_rate: u32, duration: f64) -> Fingerprint {
    let signature = spectral_signature(samples, sample_rate);
    let bytes: Vec<u8> = signature.iter().flat_map(|v| v.to_le_bytes()).collect();

    Fingerprint {
        hash: digest_hex(&bytes),
        duration,
        signature: signature.iter().map(|&v| f64::from(v)).collect(),
        sample_rate,
        algorithm: FingerprintAlgorithm::SpectralHash,
    }
}

/// Compute the 32-value signature of mono samples.
pub fn spectral_signature(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let spectrogram = mel_spectrogram_db(samples, sample_rate);
    reduce_to_time_bins(&spectrogram, TIME_BINS)
}

/// Log-power mel spectrogram, one row per frame.
///
/// Values are dB relative to the loudest cell, floored at `-TOP_DB`.
fn mel_spectrogram_db(samples: &[f32], sample_rate: u32) -> Vec<Vec<f32>> {
    let mut padded;
    let samples = if samples.len() < FFT_SIZE {
        padded = samples.to_vec();
        padded.resize(FFT_SIZE, 0.0);
        &padded[..]
    } else {
        samples
    };

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(FFT_SIZE);

    // Hann window for reduced spectral leakage
    let window: Vec<f32> = (0..FFT_SIZE)
        .map(|i| {
            let x = std::f32::consts::PI * 2.0 * i as f32 / (FFT_SIZE - 1) as f32;
            0.5 * (1.0 - x.cos())
        })
        .collect();

    let filters = MelFilterBank::new(MEL_BANDS, sample_rate, FFT_SIZE);
    let mut windowed = vec![0.0f32; FFT_SIZE];
    let mut spectrum = vec![Complex::new(0.0f32, 0.0); FFT_SIZE / 2 + 1];
    let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_scratch_len()];
    let mut power = vec![0.0f32; FFT_SIZE / 2 + 1];

    let num_frames = 1 + (samples.len() - FFT_SIZE) / HOP_SIZE;
    let mut frames = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_SIZE;
        for (dst, (s, w)) in windowed
            .iter_mut()
            .zip(samples[start..start + FFT_SIZE].iter().zip(&window))
        {
            *dst = s * w;
        }

        if fft
            .process_with_scratch(&mut windowed, &mut spectrum, &mut scratch)
            .is_err()
        {
            continue;
        }

        for (p, c) in power.iter_mut().zip(&spectrum) {
            *p = c.norm_sqr();
        }
        frames.push(filters.apply(&power));
    }

    // power -> dB relative to the loudest cell
    let max_power = frames
        .iter()
        .flatten()
        .fold(POWER_FLOOR, |acc, &p| acc.max(p));
    let ref_db = 10.0 * max_power.log10();

    for frame in &mut frames {
        for cell in frame.iter_mut() {
            let db = 10.0 * cell.max(POWER_FLOOR).log10() - ref_db;
            *cell = db.max(-TOP_DB);
        }
    }

    frames
}

/// Average all bands of all frames falling in each of `bins` time spans.
fn reduce_to_time_bins(frames: &[Vec<f32>], bins: usize) -> Vec<f32> {
    let n = frames.len();
    if n == 0 {
        return vec![-TOP_DB; bins];
    }

    (0..bins)
        .map(|bin| {
            let start = (bin * n / bins).min(n - 1);
            let end = ((bin + 1) * n / bins).clamp(start + 1, n);

            let (sum, count) = frames[start..end]
                .iter()
                .flatten()
                .fold((0.0f64, 0usize), |(s, c), &v| (s + f64::from(v), c + 1));

            if count == 0 {
                -TOP_DB
            } else {
                (sum / count as f64) as f32
            }
        })
        .collect()
}

/// Triangular mel filterbank over an FFT power spectrum (HTK mel scale).
struct MelFilterBank {
    /// Sparse weights per band: (fft bin, weight)
    filters: Vec<Vec<(usize, f32)>>,
}

impl MelFilterBank {
    fn new(bands: usize, sample_rate: u32, fft_size: usize) -> Self {
        let nyquist = sample_rate as f32 / 2.0;
        let num_bins = fft_size / 2 + 1;
        let bin_hz = sample_rate as f32 / fft_size as f32;

        let mel_max = hz_to_mel(nyquist);
        let edges: Vec<f32> = (0..bands + 2)
            .map(|i| mel_to_hz(mel_max * i as f32 / (bands + 1) as f32))
            .collect();

        let filters = (0..bands)
            .map(|band| {
                let (lower, center, upper) = (edges[band], edges[band + 1], edges[band + 2]);
                (0..num_bins)
                    .filter_map(|bin| {
                        let freq = bin as f32 * bin_hz;
                        let weight = if freq > lower && freq <= center {
                            (freq - lower) / (center - lower)
                        } else if freq > center && freq < upper {
                            (upper - freq) / (upper - center)
                        } else {
                            0.0
                        };
                        (weight > 0.0).then_some((bin, weight))
                    })
                    .collect()
            })
            .collect();

        Self { filters }
    }

    fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.filters
            .iter()
            .map(|weights| {
                weights
                    .iter()
                    .map(|&(bin, w)| power.get(bin).copied().unwrap_or(0.0) * w)
                    .sum()
            })
            .collect()
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}
