//! High-fidelity fingerprints using Chromaprint/fpcalc
//!
//! This module shells out to the `fpcalc` command-line tool (part of Chromaprint)
//! and asks for the raw sub-fingerprint vector. This approach is more reliable
//! than Rust bindings and works on all platforms where fpcalc is installed.
//!
//! Install fpcalc:
//! - Windows: `winget install AcoustID.Chromaprint` or download from https://acoustid.org/chromaprint
//! - macOS: `brew install chromaprint`
//! - Linux: `apt install libchromaprint-tools` or equivalent

use std::path::Path;
use std::process::Command;

use super::{Fingerprint, FingerprintAlgorithm, FingerprintError, digest_hex};

/// Chromaprint analyses audio at this rate internally.
pub const CHROMAPRINT_SAMPLE_RATE: u32 = 11025;

/// Common installation paths for fpcalc on Windows
#[cfg(windows)]
const FPCALC_PATHS: &[&str] = &[
    "fpcalc", // In PATH
    r"C:\Program Files\Chromaprint\fpcalc.exe",
    r"C:\Program Files\MusicBrainz Picard\fpcalc.exe",
    r"C:\Program Files (x86)\Chromaprint\fpcalc.exe",
];

#[cfg(not(windows))]
const FPCALC_PATHS: &[&str] = &[
    "fpcalc", // In PATH
    "/usr/bin/fpcalc",
    "/usr/local/bin/fpcalc",
    "/opt/homebrew/bin/fpcalc",
];

/// Find the fpcalc executable, checking common installation paths
fn find_fpcalc() -> Option<&'static str> {
    FPCALC_PATHS
        .iter()
        .find(|&path| {
            Command::new(path)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
        .copied()
}

/// Generate a raw Chromaprint fingerprint for the given file
pub fn generate(path: &Path) -> Result<Fingerprint, FingerprintError> {
    let fpcalc = find_fpcalc().ok_or_else(|| {
        FingerprintError::Chromaprint("fpcalc not found on this system".to_string())
    })?;

    let output = Command::new(fpcalc)
        .arg("-raw")
        .arg("-json")
        .arg(path)
        .output()
        .map_err(|e| FingerprintError::Chromaprint(format!("Failed to run fpcalc: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(FingerprintError::Chromaprint(format!(
            "fpcalc failed: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_fpcalc_json(&stdout)
}

/// Parse the JSON output from `fpcalc -raw -json`
fn parse_fpcalc_json(json: &str) -> Result<Fingerprint, FingerprintError> {
    let parsed: FpcalcRawOutput = serde_json::from_str(json).map_err(|e| {
        FingerprintError::Chromaprint(format!("Failed to parse fpcalc output: {}", e))
    })?;

    if parsed.fingerprint.is_empty() {
        return Err(FingerprintError::Chromaprint(
            "fpcalc returned an empty fingerprint".to_string(),
        ));
    }

    let bytes: Vec<u8> = parsed
        .fingerprint
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();

    Ok(Fingerprint {
        hash: digest_hex(&bytes),
        duration: parsed.duration,
        signature: parsed.fingerprint.iter().map(|&v| f64::from(v)).collect(),
        sample_rate: CHROMAPRINT_SAMPLE_RATE,
        algorithm: FingerprintAlgorithm::Chromaprint,
    })
}

/// fpcalc raw JSON output structure
#[derive(serde::Deserialize)]
struct FpcalcRawOutput {
    fingerprint: Vec<u32>,
    duration: f64,
}

/// Check if fpcalc is available on the system
pub fn is_available() -> bool {
    find_fpcalc().is_some()
}

/// Get fpcalc version string (for diagnostics)
pub fn version() -> Option<String> {
    let fpcalc = find_fpcalc()?;
    Command::new(fpcalc)
        .arg("-version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fpcalc_raw_json() {
        let json = r#"{"duration": 180.5, "fingerprint": [1, 2, 4294967295]}"#;

        let result = parse_fpcalc_json(json).unwrap();

        assert_eq!(result.duration, 180.5);
        assert_eq!(result.signature, vec![1.0, 2.0, 4294967295.0]);
        assert_eq!(result.sample_rate, CHROMAPRINT_SAMPLE_RATE);
        assert_eq!(result.algorithm, FingerprintAlgorithm::Chromaprint);
        assert_eq!(result.hash.len(), 64);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let json = r#"{"duration": 10.0, "fingerprint": [7, 8, 9]}"#;
        let a = parse_fpcalc_json(json).unwrap();
        let b = parse_fpcalc_json(json).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn test_parse_fpcalc_json_error() {
        assert!(parse_fpcalc_json(r#"{"error": "invalid"}"#).is_err());
        assert!(parse_fpcalc_json(r#"{"duration": 1.0, "fingerprint": []}"#).is_err());
    }

    #[test]
    fn test_is_available() {
        // This test just ensures the function doesn't panic
        let _ = is_available();
    }

    #[test]
    fn test_generate_nonexistent_file() {
        let result = generate(Path::new("/nonexistent/file.mp3"));

        // Should fail (either fpcalc not found or file not found)
        assert!(result.is_err());
    }
}
