//! Mono sample rate conversion using rubato.
//!
//! The spectral hash must see every file at the same rate, otherwise a
//! 44.1kHz and a 48kHz encode of the same recording land in different mel
//! bands.

use rubato::{FftFixedIn, Resampler as RubatoResampler};

use super::FingerprintError;

/// Input frames handed to rubato per call.
const CHUNK_SIZE: usize = 1024;

/// Resample mono audio from `input_rate` to `output_rate`.
///
/// Returns the input unchanged when the rates already match. The output is
/// trimmed for the resampler's delay, so its length is the input length
/// scaled by the rate ratio.
pub fn resample_mono(
    input: &[f32],
    input_rate: u32,
    output_rate: u32,
) -> Result<Vec<f32>, FingerprintError> {
    if input_rate == output_rate || input.is_empty() {
        return Ok(input.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        input_rate as usize,
        output_rate as usize,
        CHUNK_SIZE,
        2, // Sub-chunks
        1,
    )
    .map_err(|e| FingerprintError::Decode(format!("Failed to create resampler: {}", e)))?;

    let ratio = output_rate as f64 / input_rate as f64;
    let expected = (input.len() as f64 * ratio).round() as usize;
    let delay = resampler.output_delay();

    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);
    let mut pos = 0;
    // Padding budget: enough zero chunks to flush the delay, with headroom
    let flush_limit = input.len() + (delay as f64 / ratio) as usize + 4 * CHUNK_SIZE;

    // Keep feeding (zero padded past the end) until the delayed tail is flushed
    while output.len() < expected + delay && pos <= flush_limit {
        let frames = resampler.input_frames_next();
        let mut chunk = vec![0.0f32; frames];
        if pos < input.len() {
            let end = (pos + frames).min(input.len());
            chunk[..end - pos].copy_from_slice(&input[pos..end]);
        }
        pos += frames;

        let resampled = resampler
            .process(std::slice::from_ref(&chunk), None)
            .map_err(|e| FingerprintError::Decode(format!("Resampling error: {}", e)))?;

        if let Some(channel) = resampled.into_iter().next() {
            output.extend(channel);
        }
    }

    let end = (delay + expected).min(output.len());
    Ok(output.get(delay..end).map(<[f32]>::to_vec).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_passthrough() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_mono(&input, 22050, 22050).unwrap(), input);
    }

    #[test]
    fn test_downsample_length() {
        let input: Vec<f32> = (0..44100).map(|i| (i as f32 * 0.01).sin()).collect();
        let output = resample_mono(&input, 44100, 22050).unwrap();
        assert_eq!(output.len(), 22050);
    }

    #[test]
    fn test_upsample_length() {
        let input: Vec<f32> = (0..8000).map(|i| (i as f32 * 0.05).sin()).collect();
        let output = resample_mono(&input, 8000, 22050).unwrap();
        assert_eq!(output.len(), 22050);
    }
}
