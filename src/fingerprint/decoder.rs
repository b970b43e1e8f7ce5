//! Whole-file audio decoding using symphonia.
//!
//! Supported formats:
//! - MP3
//! - FLAC
//! - OGG Vorbis
//! - WAV/PCM
//! - AAC (in MP4 container)

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::FingerprintError;

/// Decoded audio, downmixed to mono.
#[derive(Debug, Clone)]
pub struct MonoAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl MonoAudio {
    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode the first audio track of a file to mono f32 samples.
pub fn decode_mono(path: &Path) -> Result<MonoAudio, FingerprintError> {
    let file = File::open(path).map_err(|_| FingerprintError::NotFound(path.to_path_buf()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Probe the format
    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| FingerprintError::UnsupportedFormat(e.to_string()))?;

    let mut reader = probed.format;

    // Find the first audio track
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| FingerprintError::UnsupportedFormat("No audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| FingerprintError::Decode("Unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| FingerprintError::UnsupportedFormat(e.to_string()))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break; // End of stream
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(FingerprintError::Decode(e.to_string())),
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(_)) => continue, // Skip bad frame
            Err(e) => return Err(FingerprintError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);

        let needed = decoded.capacity() * channels;
        if sample_buf.as_ref().is_none_or(|b| b.capacity() < needed) {
            sample_buf = Some(SampleBuffer::<f32>::new(decoded.capacity() as u64, spec));
        }
        let Some(buf) = sample_buf.as_mut() else {
            continue;
        };
        buf.copy_interleaved_ref(decoded);

        downmix_into(buf.samples(), channels, &mut samples);
    }

    if samples.is_empty() {
        return Err(FingerprintError::Decode(format!(
            "no audio samples decoded from {}",
            path.display()
        )));
    }

    Ok(MonoAudio {
        samples,
        sample_rate,
    })
}

/// Average interleaved frames down to one channel.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}
