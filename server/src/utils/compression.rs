//! Compressed payload envelope
//!
//! Agent SDKs may ship large call payloads as:
//!
//! ```json
//! { "compressed": true, "data": "<base64(gzip(json))>", "original_size": 48213, "compressed_size": 6120 }
//! ```
//!
//! This module unwraps that envelope back into the plain JSON document.

use std::io::Read;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("compressed envelope is missing the 'data' field")]
    MissingData,
    #[error("invalid base64 in compressed envelope: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("gzip decode failed: {0}")]
    Gzip(#[from] std::io::Error),
    #[error("decompressed payload exceeds the {limit} byte limit")]
    TooLarge { limit: usize },
    #[error("decompressed payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returns true if the document is a `compressed: true` envelope
pub fn is_compressed_envelope(value: &JsonValue) -> bool {
    value
        .get("compressed")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

/// Unwrap a compressed envelope into its JSON document.
///
/// Inflation stops once `max_bytes` is exceeded. A mismatch between the
/// decompressed length and `original_size` is logged but not fatal; the JSON
/// parse decides whether the data is usable.
pub fn decode_envelope(
    envelope: &JsonValue,
    max_bytes: usize,
) -> Result<JsonValue, EnvelopeError> {
    let data = envelope
        .get("data")
        .and_then(|v| v.as_str())
        .ok_or(EnvelopeError::MissingData)?;

    let compressed = STANDARD.decode(data.trim())?;
    let bytes = gunzip(&compressed, max_bytes)?;

    if let Some(expected) = envelope.get("original_size").and_then(|v| v.as_u64())
        && expected != bytes.len() as u64
    {
        tracing::warn!(
            expected,
            actual = bytes.len(),
            compressed_size = envelope.get("compressed_size").and_then(|v| v.as_u64()),
            "Decompressed size does not match original_size"
        );
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// Gunzip a byte slice, reading at most `max_bytes + 1` bytes
pub fn gunzip(compressed: &[u8], max_bytes: usize) -> Result<Vec<u8>, EnvelopeError> {
    let mut out = Vec::new();
    GzDecoder::new(compressed)
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut out)?;
    if out.len() > max_bytes {
        return Err(EnvelopeError::TooLarge { limit: max_bytes });
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) fn encode_envelope(document: &JsonValue) -> JsonValue {
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    let raw = serde_json::to_vec(document).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).unwrap();
    let gz = encoder.finish().unwrap();
    serde_json::json!({
        "compressed": true,
        "data": STANDARD.encode(&gz),
        "original_size": raw.len(),
        "compressed_size": gz.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LIMIT: usize = 1024 * 1024;

    #[test]
    fn test_detects_envelope() {
        assert!(is_compressed_envelope(&json!({"compressed": true, "data": ""})));
        assert!(!is_compressed_envelope(&json!({"compressed": false})));
        assert!(!is_compressed_envelope(&json!({"call_id": "c1"})));
        assert!(!is_compressed_envelope(&json!({"compressed": "yes"})));
    }

    #[test]
    fn test_decode_envelope() {
        let doc = json!({"call_id": "c1", "agent_id": "a1", "session_traces": []});
        let envelope = encode_envelope(&doc);
        assert_eq!(decode_envelope(&envelope, LIMIT).unwrap(), doc);
    }

    #[test]
    fn test_size_mismatch_is_not_fatal() {
        let doc = json!({"call_id": "c1"});
        let mut envelope = encode_envelope(&doc);
        envelope["original_size"] = json!(1);
        assert_eq!(decode_envelope(&envelope, LIMIT).unwrap(), doc);
    }

    #[test]
    fn test_missing_data() {
        let err = decode_envelope(&json!({"compressed": true}), LIMIT).unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingData));
    }

    #[test]
    fn test_bad_base64() {
        let err = decode_envelope(&json!({"compressed": true, "data": "!!!"}), LIMIT).unwrap_err();
        assert!(matches!(err, EnvelopeError::Base64(_)));
    }

    #[test]
    fn test_not_gzip() {
        let data = STANDARD.encode(b"plain text, not gzip");
        let err = decode_envelope(&json!({"compressed": true, "data": data}), LIMIT).unwrap_err();
        assert!(matches!(err, EnvelopeError::Gzip(_)));
    }

    #[test]
    fn test_inflated_size_capped() {
        let doc = json!({"padding": "x".repeat(64 * 1024)});
        let envelope = encode_envelope(&doc);
        let compressed_len = envelope["compressed_size"].as_u64().unwrap() as usize;
        assert!(compressed_len < 4096);

        let err = decode_envelope(&envelope, 4096).unwrap_err();
        assert!(matches!(err, EnvelopeError::TooLarge { limit: 4096 }));

        let exact = envelope["original_size"].as_u64().unwrap() as usize;
        assert_eq!(decode_envelope(&envelope, exact).unwrap(), doc);
    }
}
