//! # Audio Wire Marshalling
//!
//! Converts between the protocol's base64 audio payloads and in-memory f32
//! sample vectors, and applies the two sample-level adjustments the
//! denoising pipeline needs.
//!
//! ## Key Functions:
//! - **Decoding**: base64 -> little-endian f32 samples, with layout checks
//! - **Encoding**: f32 samples -> base64, bit-exact round-trip
//! - **Peak renormalization**: scale down out-of-range input
//! - **Length forcing**: pin model output to the input sample count

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Decode a base64 payload into f32 samples.
///
/// ## Validation Checks:
/// 1. **Base64**: Must decode under the standard alphabet
/// 2. **Byte layout**: Length must be a multiple of 4 (one f32 per 4 bytes)
///
/// ## Returns:
/// - **Ok(Vec<f32>)**: Decoded samples (empty payloads decode to an empty vector)
/// - **Err(String)**: Description of the decode failure
pub fn decode_samples(audio_b64: &str) -> Result<Vec<f32>, String> {
    let bytes = STANDARD
        .decode(audio_b64)
        .map_err(|e| format!("Invalid base64 audio: {}", e))?;

    if bytes.len() % 4 != 0 {
        return Err(format!(
            "Audio byte length must be a multiple of 4 for f32 samples, got {}",
            bytes.len()
        ));
    }

    let mut cursor = Cursor::new(bytes.as_slice());
    let mut samples = Vec::with_capacity(bytes.len() / 4);
    while let Ok(sample) = cursor.read_f32::<LittleEndian>() {
        samples.push(sample);
    }

    Ok(samples)
}

/// Encode f32 samples into a base64 payload.
///
/// The byte image is little-endian, so `decode_samples` recovers every
/// sample bit-for-bit, non-finite values included.
pub fn encode_samples(samples: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 4);
    for &sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    STANDARD.encode(bytes)
}

/// Scale samples down when the peak magnitude exceeds 1.0.
///
/// Models are trained on [-1.0, 1.0] input; callers occasionally hand over
/// unscaled captures. Returns the peak that was divided out, or None when
/// the input was already in range.
pub fn renormalize_peak(samples: &mut [f32]) -> Option<f32> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));

    if peak > 1.0 {
        for sample in samples.iter_mut() {
            *sample /= peak;
        }
        Some(peak)
    } else {
        None
    }
}

/// Force a sample vector to an exact length.
///
/// Longer vectors are truncated, shorter ones zero-padded. Model output can
/// differ from the input by a few samples depending on internal framing;
/// callers rely on getting back exactly as many samples as they sent.
pub fn fit_length(mut samples: Vec<f32>, target_len: usize) -> Vec<f32> {
    if samples.len() > target_len {
        samples.truncate(target_len);
    } else if samples.len() < target_len {
        samples.resize(target_len, 0.0);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_bit_exact() {
        // Sine burst plus the awkward values: zero, negative zero, tiny, NaN
        let mut samples: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin() * 0.8).collect();
        samples.extend_from_slice(&[0.0, -0.0, f32::MIN_POSITIVE, f32::NAN, -1.0, 1.0]);

        let encoded = encode_samples(&samples);
        let decoded = decode_samples(&encoded).unwrap();

        assert_eq!(decoded.len(), samples.len());
        for (original, round_tripped) in samples.iter().zip(decoded.iter()) {
            // Bit comparison so NaN and -0.0 count as preserved
            assert_eq!(original.to_bits(), round_tripped.to_bits());
        }
    }

    #[test]
    fn test_empty_payload_decodes_empty() {
        let decoded = decode_samples("").unwrap();
        assert!(decoded.is_empty());
        assert_eq!(encode_samples(&[]), "");
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        // Not base64 at all
        assert!(decode_samples("!!! not base64 !!!").is_err());

        // Valid base64 but 3 bytes cannot hold an f32
        let three_bytes = STANDARD.encode([1u8, 2, 3]);
        let err = decode_samples(&three_bytes).unwrap_err();
        assert!(err.contains("multiple of 4"), "unexpected error: {}", err);
    }

    #[test]
    fn test_renormalize_peak() {
        let mut loud = vec![2.0f32, -4.0, 1.0];
        assert_eq!(renormalize_peak(&mut loud), Some(4.0));
        assert_eq!(loud, vec![0.5, -1.0, 0.25]);

        // Already in range: untouched
        let mut quiet = vec![0.5f32, -0.25];
        assert_eq!(renormalize_peak(&mut quiet), None);
        assert_eq!(quiet, vec![0.5, -0.25]);

        // Exactly 1.0 counts as in range
        let mut unit = vec![1.0f32, -1.0];
        assert_eq!(renormalize_peak(&mut unit), None);
    }

    #[test]
    fn test_fit_length() {
        assert_eq!(fit_length(vec![1.0, 2.0, 3.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_length(vec![1.0], 3), vec![1.0, 0.0, 0.0]);
        assert_eq!(fit_length(vec![1.0, 2.0], 2), vec![1.0, 2.0]);
        assert_eq!(fit_length(Vec::new(), 0), Vec::<f32>::new());
    }
}
