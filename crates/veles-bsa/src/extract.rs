//! Payload extraction and version-selected decompression.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::{debug, trace};
use lzzzz::lz4f;
use veles_common::BinaryReader;

use crate::fallback::FallbackTool;
use crate::header::{VERSION_LZ4, VERSION_ZLIB};
use crate::record::{name_matches_bytes, FileRecord};
use crate::{Error, Result};

/// Extract one file record's payload from the archive bytes.
///
/// Takes a fresh cursor over the archive for every call; nothing is shared
/// or mutated, so concurrent extractions are safe.
pub(crate) fn read_payload(
    data: &[u8],
    record: &FileRecord,
    version: u32,
    fallback: Option<&FallbackTool>,
) -> Result<Vec<u8>> {
    let offset = record.offset as usize;
    let mut reader = BinaryReader::new_at(data, offset);

    // Payloads may be prefixed with a length-prefixed copy of the file name.
    // A mismatched or absent prefix is tolerated: reset and treat the bytes
    // at the offset as payload. Worth fuzzing against real archives; it is
    // unclear whether mismatches occur legitimately or mask corruption.
    let name_bytes_consumed = match reader.read_bstring_bytes() {
        Ok(prefix)
            if !record.name.is_empty() && name_matches_bytes(&record.name, prefix) =>
        {
            prefix.len() + 1
        }
        _ => {
            trace!(
                "no embedded name prefix at offset {offset} for {:?}",
                record.name
            );
            reader.seek(offset);
            0
        }
    };

    if !record.compressed {
        return Ok(reader.read_bytes(record.size as usize)?.to_vec());
    }

    let original_size = reader.read_u32()? as usize;
    let compressed_len = (record.size as usize)
        .checked_sub(4 + name_bytes_consumed)
        .ok_or_else(|| {
            Error::Decompression(format!(
                "record size {} too small for size prefix and embedded name",
                record.size
            ))
        })?;
    let compressed = reader.read_bytes(compressed_len)?;

    match decompress(version, compressed, original_size) {
        Ok(bytes) => Ok(bytes),
        Err(err @ Error::UnsupportedVersion(_)) => Err(err),
        Err(primary) => match fallback {
            Some(tool) => {
                debug!(
                    "in-process decompression failed for {:?} ({primary}), trying fallback tool",
                    record.name
                );
                tool.decompress(compressed, original_size)
            }
            None => Err(primary),
        },
    }
}

/// Decompress a payload with the codec selected by the archive version.
fn decompress(version: u32, compressed: &[u8], original_size: usize) -> Result<Vec<u8>> {
    match version {
        VERSION_ZLIB => inflate_zlib(compressed, original_size),
        VERSION_LZ4 => decompress_lz4(compressed, original_size),
        other => Err(Error::UnsupportedVersion(other)),
    }
}

/// zlib-inflate into a buffer of exactly `original_size` bytes.
fn inflate_zlib(compressed: &[u8], original_size: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; original_size];
    let mut decoder = ZlibDecoder::new(compressed);
    decoder
        .read_exact(&mut out)
        .map_err(|e| Error::Decompression(format!("zlib inflate failed: {e}")))?;
    Ok(out)
}

/// Decode a framed LZ4 stream, accumulating until the input is exhausted.
fn decompress_lz4(compressed: &[u8], original_size: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(original_size);
    lz4f::decompress_to_vec(compressed, &mut out)
        .map_err(|e| Error::Decompression(format!("lz4 frame decode failed: {e}")))?;
    if out.len() != original_size {
        return Err(Error::Decompression(format!(
            "lz4 produced {} bytes, expected {original_size}",
            out.len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn lz4_compress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        lz4f::compress_to_vec(data, &mut out, &lz4f::Preferences::default()).unwrap();
        out
    }

    #[test]
    fn test_zlib_roundtrip() {
        let original = b"the quick brown fox jumps over the lazy dog";
        let compressed = zlib_compress(original);

        let decompressed = inflate_zlib(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_lz4_roundtrip() {
        let original = vec![0x5A; 4096];
        let compressed = lz4_compress(&original);

        let decompressed = decompress_lz4(&compressed, original.len()).unwrap();
        assert_eq!(decompressed, original);
    }

    #[test]
    fn test_garbage_input_fails() {
        assert!(matches!(
            inflate_zlib(b"not zlib data", 10),
            Err(Error::Decompression(_))
        ));
        assert!(matches!(
            decompress_lz4(b"not lz4 data", 10),
            Err(Error::Decompression(_))
        ));
    }

    #[test]
    fn test_unknown_version_is_not_a_codec() {
        assert!(matches!(
            decompress(103, b"anything", 4),
            Err(Error::UnsupportedVersion(103))
        ));
    }

    /// Payload region layout: optional name prefix, size prefix, stream.
    fn build_region(name: Option<&str>, body: &[u8]) -> Vec<u8> {
        let mut region = Vec::new();
        if let Some(name) = name {
            region.push(name.len() as u8);
            region.extend_from_slice(name.as_bytes());
        }
        region.extend_from_slice(body);
        region
    }

    #[test]
    fn test_uncompressed_payload_with_name_prefix() {
        let region = build_region(Some("chair.nif"), b"payload bytes");
        let record = FileRecord {
            name: "chair.nif".to_string(),
            size: 13,
            offset: 0,
            compressed: false,
        };

        let bytes = read_payload(&region, &record, VERSION_ZLIB, None).unwrap();
        assert_eq!(bytes, b"payload bytes");
    }

    #[test]
    fn test_uncompressed_payload_without_name_prefix() {
        let region = build_region(None, b"payload bytes");
        let record = FileRecord {
            name: "chair.nif".to_string(),
            size: 13,
            offset: 0,
            compressed: false,
        };

        // Absent prefix: cursor resets and the raw bytes are returned.
        let bytes = read_payload(&region, &record, VERSION_ZLIB, None).unwrap();
        assert_eq!(bytes, b"payload bytes");
    }

    #[test]
    fn test_compressed_payload_v104() {
        let original = b"some mesh data, repeated: some mesh data";
        let stream = zlib_compress(original);

        let mut body = (original.len() as u32).to_le_bytes().to_vec();
        body.extend_from_slice(&stream);
        let name = "chair.nif";
        let region = build_region(Some(name), &body);

        let record = FileRecord {
            name: name.to_string(),
            // On-disk size covers name prefix, size prefix and stream.
            size: (name.len() + 1 + 4 + stream.len()) as u32,
            offset: 0,
            compressed: true,
        };

        let bytes = read_payload(&region, &record, VERSION_ZLIB, None).unwrap();
        assert_eq!(bytes, original);
    }

    #[test]
    fn test_compressed_payload_v105_no_name() {
        let original = vec![7u8; 2000];
        let stream = lz4_compress(&original);

        let mut region = (original.len() as u32).to_le_bytes().to_vec();
        region.extend_from_slice(&stream);

        let record = FileRecord {
            name: "cloud.dds".to_string(),
            size: (4 + stream.len()) as u32,
            offset: 0,
            compressed: true,
        };

        let bytes = read_payload(&region, &record, VERSION_LZ4, None).unwrap();
        assert_eq!(bytes, original);
    }

    #[test]
    fn test_corrupt_stream_without_fallback() {
        let mut region = 8u32.to_le_bytes().to_vec();
        region.extend_from_slice(b"garbage!");

        let record = FileRecord {
            name: String::new(),
            size: (4 + 8) as u32,
            offset: 0,
            compressed: true,
        };

        assert!(matches!(
            read_payload(&region, &record, VERSION_ZLIB, None),
            Err(Error::Decompression(_))
        ));
    }
}
