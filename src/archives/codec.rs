// Brotli codec for archive blobs.
//
// Blobs are a single brotli stream over the whole UTF-8 JSON document, no
// framing. The ingestion side sometimes writes a BOM, which is dropped here.

use serde_json::Value;
use std::io::{Read, Write};

use super::error::{ArchiveError, ArchiveResult};

const BUFFER_SIZE: usize = 4096;
const ENCODE_QUALITY: u32 = 9;
const ENCODE_LG_WINDOW: u32 = 22;

/// Decompressed archive: UTF-8 text (for downloads) and the parsed value
#[derive(Debug, Clone)]
pub struct DecodedArchive {
    pub text: String,
    pub value: Value,
}

pub fn decode(key: &str, bytes: &[u8]) -> ArchiveResult<DecodedArchive> {
    let mut raw = Vec::with_capacity(bytes.len() * 4);
    brotli::Decompressor::new(bytes, BUFFER_SIZE)
        .read_to_end(&mut raw)
        .map_err(|e| ArchiveError::corrupt(key, format!("brotli stream: {}", e)))?;

    let mut text = String::from_utf8(raw).map_err(|e| ArchiveError::corrupt(key, format!("utf-8: {}", e)))?;
    if text.starts_with('\u{feff}') {
        text.drain(..'\u{feff}'.len_utf8());
    }

    let value = serde_json::from_str(&text).map_err(|e| ArchiveError::corrupt(key, format!("json: {}", e)))?;

    Ok(DecodedArchive { text, value })
}

/// Runs [`decode`] on the blocking pool so request tasks never stall on decompression
pub async fn decode_blocking(key: String, bytes: Vec<u8>) -> ArchiveResult<DecodedArchive> {
    tokio::task::spawn_blocking(move || decode(&key, &bytes))
        .await
        .map_err(|e| ArchiveError::storage(format!("decode task failed: {}", e)))?
}

pub fn encode(value: &Value) -> ArchiveResult<Vec<u8>> {
    let text = serde_json::to_vec(value).map_err(|e| ArchiveError::storage(format!("serialize: {}", e)))?;
    encode_bytes(&text)
}

pub fn encode_bytes(raw: &[u8]) -> ArchiveResult<Vec<u8>> {
    let mut writer = brotli::CompressorWriter::new(Vec::new(), BUFFER_SIZE, ENCODE_QUALITY, ENCODE_LG_WINDOW);
    writer
        .write_all(raw)
        .and_then(|_| writer.flush())
        .map_err(|e| ArchiveError::storage(format!("brotli encode: {}", e)))?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_inverts_encode() {
        let docs = [
            json!({"m003": "2025-06-01T10:00:00Z", "m656": false, "odds": [1.85, 2.05]}),
            json!([{"player1Name": "Đoković", "player2Name": "Müller"}]),
            json!([]),
            json!("plain string"),
        ];

        for doc in docs {
            let bytes = encode(&doc).unwrap();
            let decoded = decode("roundtrip", &bytes).unwrap();
            assert_eq!(decoded.value, doc);
        }
    }

    #[test]
    fn strips_byte_order_mark() {
        let bytes = encode_bytes("\u{feff}{\"m656\":true}".as_bytes()).unwrap();
        let decoded = decode("bom", &bytes).unwrap();
        assert_eq!(decoded.text, "{\"m656\":true}");
        assert_eq!(decoded.value, json!({"m656": true}));
    }

    #[test]
    fn garbage_is_corrupt_not_missing() {
        let err = decode("garbage", b"definitely not brotli").unwrap_err();
        assert!(matches!(err, ArchiveError::CorruptArchive { .. }), "got {err:?}");
    }

    #[test]
    fn truncated_stream_is_corrupt() {
        let doc = json!({"rows": (0..500).collect::<Vec<_>>()});
        let bytes = encode(&doc).unwrap();
        let err = decode("truncated", &bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ArchiveError::CorruptArchive { .. }), "got {err:?}");
    }

    #[test]
    fn valid_brotli_with_invalid_json_is_corrupt() {
        let bytes = encode_bytes(b"{not json").unwrap();
        let err = decode("badjson", &bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::CorruptArchive { .. }));
    }

    #[tokio::test]
    async fn blocking_decode_matches_inline() {
        let doc = json!({"a": 1});
        let bytes = encode(&doc).unwrap();
        let decoded = decode_blocking("blocking".to_string(), bytes).await.unwrap();
        assert_eq!(decoded.value, doc);
    }
}
