//! URL-embedded payload decoding: base64 → raw DEFLATE (no zlib/gzip
//! wrapper) → UTF-8, for the `GET /{linter}/{format}/{encoded}` route (§6).
//! Pure function so the HTTP boundary can unit-test it without a router.

use base64::Engine;
use flate2::read::DeflateDecoder;
use std::io::Read;

/// Errors decoding a URL-embedded payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The segment was not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The inflated stream was not valid DEFLATE, or failed mid-stream.
    #[error("invalid deflate stream: {0}")]
    Inflate(#[from] std::io::Error),
    /// The inflated bytes were not valid UTF-8.
    #[error("decoded payload is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decode a `{encoded}` URL path segment: base64-decode, DEFLATE-inflate,
/// interpret as UTF-8.
pub fn decode_url_payload(encoded: &str) -> Result<String, DecodeError> {
    let compressed = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(encoded))?;

    let mut decoder = DeflateDecoder::new(&compressed[..]);
    let mut inflated = Vec::new();
    decoder.read_to_end(&mut inflated)?;

    Ok(String::from_utf8(inflated)?)
}

/// Encode a payload the same way a client would: UTF-8 → raw DEFLATE →
/// base64 (URL-safe, unpadded). Used by tests and available to callers that
/// need to construct the GET form themselves.
pub fn encode_url_payload(content: &str) -> String {
    use flate2::write::DeflateEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(content.as_bytes())
        .expect("writing to an in-memory encoder cannot fail");
    let compressed = encoder.finish().expect("finishing an in-memory encoder cannot fail");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(compressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let original = "var unused = 42;\n";
        let encoded = encode_url_payload(original);
        let decoded = decode_url_payload(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let err = decode_url_payload("not valid base64 !!!").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn valid_base64_invalid_deflate_is_rejected() {
        let garbage = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"not deflate data");
        let err = decode_url_payload(&garbage).unwrap_err();
        assert!(matches!(err, DecodeError::Inflate(_)));
    }

    #[test]
    fn empty_input_roundtrips_to_empty_string() {
        let encoded = encode_url_payload("");
        assert_eq!(decode_url_payload(&encoded).unwrap(), "");
    }
}
