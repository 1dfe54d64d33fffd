//! Block payload decompression
//!
//! Brokers may emit LZ4 and ZSTD either self-framed or as a raw block behind
//! a 4-byte big-endian length prefix. The framed form is tried first.

use std::io::{Cursor, Read};

use flate2::read::{GzDecoder, ZlibDecoder};
use lz4_flex::frame::FrameDecoder as Lz4FrameDecoder;
use pinot_core::{PinotError, Result};

/// Decompress `payload` with the named algorithm (case-insensitive)
pub fn decompress(payload: &[u8], compression: &str) -> Result<Vec<u8>> {
    match compression.to_ascii_uppercase().as_str() {
        "" | "NONE" | "PASS_THROUGH" => Ok(payload.to_vec()),
        "ZSTD" | "ZSTANDARD" => decompress_zstd(payload),
        "LZ4" | "LZ4_FAST" | "LZ4_HIGH" => decompress_lz4(payload),
        "DEFLATE" => read_all(ZlibDecoder::new(payload))
            .map_err(|e| PinotError::Protocol(format!("deflate decompress failed: {}", e))),
        "GZIP" => read_all(GzDecoder::new(payload))
            .map_err(|e| PinotError::Protocol(format!("gzip decompress failed: {}", e))),
        "SNAPPY" => snap::raw::Decoder::new()
            .decompress_vec(payload)
            .map_err(|e| PinotError::Protocol(format!("snappy decompress failed: {}", e))),
        _ => Err(PinotError::Protocol(format!(
            "unsupported grpc compression: {}",
            compression
        ))),
    }
}

fn read_all<R: Read>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::new();
    reader.read_to_end(&mut output)?;
    Ok(output)
}

/// Split a 4-byte big-endian length prefix from the payload
fn split_length_prefix(payload: &[u8]) -> Option<(usize, &[u8])> {
    if payload.len() < 4 {
        return None;
    }
    let (prefix, rest) = payload.split_at(4);
    let length = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
    Some((length as usize, rest))
}

fn decompress_zstd(payload: &[u8]) -> Result<Vec<u8>> {
    let frame_err = match zstd::stream::decode_all(Cursor::new(payload)) {
        Ok(output) => return Ok(output),
        Err(e) => e,
    };
    let Some((expected, compressed)) = split_length_prefix(payload) else {
        return Err(PinotError::Protocol(format!(
            "zstd decompress failed: {}",
            frame_err
        )));
    };

    let output = zstd::stream::decode_all(Cursor::new(compressed)).map_err(|e| {
        PinotError::Protocol(format!(
            "zstd decompress failed: frame={}, length-prefixed={}",
            frame_err, e
        ))
    })?;
    if output.len() != expected {
        return Err(PinotError::Protocol(format!(
            "zstd length prefix mismatch: expected {}, got {}",
            expected,
            output.len()
        )));
    }
    Ok(output)
}

fn decompress_lz4(payload: &[u8]) -> Result<Vec<u8>> {
    let frame_err = match read_all(Lz4FrameDecoder::new(payload)) {
        Ok(output) => return Ok(output),
        Err(e) => e,
    };
    let Some((expected, compressed)) = split_length_prefix(payload) else {
        return Err(PinotError::Protocol(format!(
            "lz4 decompress failed: {}",
            frame_err
        )));
    };
    if expected == 0 {
        return Ok(Vec::new());
    }

    let output = lz4_flex::block::decompress(compressed, expected).map_err(|e| {
        PinotError::Protocol(format!(
            "lz4 decompress failed: frame={}, length-prefixed={}",
            frame_err, e
        ))
    })?;
    if output.len() != expected {
        return Err(PinotError::Protocol(format!(
            "lz4 length prefix mismatch: expected {}, got {}",
            expected,
            output.len()
        )));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DATA: &[u8] = b"[\"hello\",1][\"world\",2] repeated repeated repeated repeated";

    fn with_prefix(len: usize, body: Vec<u8>) -> Vec<u8> {
        let mut out = (len as u32).to_be_bytes().to_vec();
        out.extend(body);
        out
    }

    #[test]
    fn test_passthrough() {
        for name in ["", "none", "PASS_THROUGH"] {
            assert_eq!(decompress(DATA, name).unwrap(), DATA);
        }
    }

    #[test]
    fn test_gzip_and_deflate() {
        let mut gz = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        gz.write_all(DATA).unwrap();
        let gz = gz.finish().unwrap();
        assert_eq!(decompress(&gz, "GZIP").unwrap(), DATA);
        assert_eq!(decompress(&gz, "gzip").unwrap(), DATA);

        let mut zlib = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        zlib.write_all(DATA).unwrap();
        let zlib = zlib.finish().unwrap();
        assert_eq!(decompress(&zlib, "Deflate").unwrap(), DATA);
    }

    #[test]
    fn test_snappy() {
        let compressed = snap::raw::Encoder::new().compress_vec(DATA).unwrap();
        assert_eq!(decompress(&compressed, "snappy").unwrap(), DATA);
    }

    #[test]
    fn test_zstd_frame_and_prefixed() {
        let frame = zstd::stream::encode_all(Cursor::new(DATA), 3).unwrap();
        assert_eq!(decompress(&frame, "ZSTD").unwrap(), DATA);
        assert_eq!(decompress(&frame, "zstandard").unwrap(), DATA);

        let prefixed = with_prefix(DATA.len(), frame.clone());
        assert_eq!(decompress(&prefixed, "zstd").unwrap(), DATA);

        let wrong_length = with_prefix(DATA.len() + 1, frame);
        let err = decompress(&wrong_length, "ZSTD").unwrap_err();
        assert!(err.to_string().contains("length prefix mismatch"));
    }

    #[test]
    fn test_lz4_frame_and_prefixed() {
        let mut encoder = lz4_flex::frame::FrameEncoder::new(Vec::new());
        encoder.write_all(DATA).unwrap();
        let frame = encoder.finish().unwrap();
        for name in ["LZ4", "lz4_fast", "LZ4_HIGH"] {
            assert_eq!(decompress(&frame, name).unwrap(), DATA);
        }

        let block = lz4_flex::block::compress(DATA);
        let prefixed = with_prefix(DATA.len(), block);
        assert_eq!(decompress(&prefixed, "lz4").unwrap(), DATA);

        assert!(decompress(&[0, 0, 0, 0], "LZ4").unwrap().is_empty());
    }

    #[test]
    fn test_short_payload_keeps_frame_error() {
        let err = decompress(b"ab", "ZSTD").unwrap_err();
        assert!(!err.to_string().contains("length-prefixed"));
        let err = decompress(b"ab", "LZ4").unwrap_err();
        assert!(!err.to_string().contains("length-prefixed"));
    }

    #[test]
    fn test_unsupported() {
        let err = decompress(DATA, "BROTLI").unwrap_err();
        assert!(matches!(err, PinotError::Protocol(_)));
        assert!(err.to_string().contains("unsupported grpc compression: BROTLI"));
    }
}
