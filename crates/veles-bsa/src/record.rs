//! On-disk folder and file descriptors and their parsed forms.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Bit 30 of a file record's size field: flip the archive's default
/// compression state for this one payload.
pub const SIZE_COMPRESSION_OVERRIDE: u32 = 1 << 30;

/// On-disk folder descriptor (24 bytes).
///
/// The hash is a precomputed name hash used by the game's own lookups; it is
/// carried but never validated here. The offset is 64 bits wide; archive
/// versions that only define a 32-bit offset leave the upper bytes zero,
/// which reads back identically.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawFolderRecord {
    /// Precomputed folder name hash (ignored).
    pub hash: u64,
    /// Number of file records in this folder's sub-block.
    pub file_count: u32,
    /// Padding (ignored).
    pub padding: u32,
    /// Absolute position of this folder's file record sub-block.
    pub offset: u64,
}

/// On-disk file descriptor (16 bytes).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RawFileRecord {
    /// Precomputed file name hash (ignored).
    pub hash: u64,
    /// Raw payload length with the compression override packed into bit 30.
    pub size: u32,
    /// Absolute position of the payload in the archive.
    pub offset: u32,
}

impl RawFileRecord {
    /// Unpack the size field into (payload length, compressed).
    ///
    /// If bit 30 is set, the record flips the archive-wide default and the
    /// bit is cleared to recover the true length; otherwise the default
    /// applies and the length is used as-is.
    pub fn unpack_size(&self, default_compressed: bool) -> (u32, bool) {
        let size = self.size;
        if size & SIZE_COMPRESSION_OVERRIDE != 0 {
            (size & !SIZE_COMPRESSION_OVERRIDE, !default_compressed)
        } else {
            (size, default_compressed)
        }
    }
}

/// A parsed folder with its name and file records.
#[derive(Debug, Clone)]
pub struct FolderRecord {
    /// Folder name as stored in the archive (original case).
    pub name: String,
    /// Declared file count; always equals `files.len()` after a
    /// successful parse.
    pub file_count: u32,
    /// Absolute position of this folder's file record sub-block.
    pub offset: u64,
    /// File records in archive order.
    pub files: Vec<FileRecord>,
}

/// A parsed file record.
#[derive(Debug, Clone)]
pub struct FileRecord {
    /// Leaf file name; empty when the archive carries no file-name block.
    pub name: String,
    /// True payload length on disk (compression bit cleared).
    pub size: u32,
    /// Absolute position of the payload in the archive.
    pub offset: u32,
    /// Whether the payload is compressed.
    pub compressed: bool,
}

/// Decode archive name bytes.
///
/// BSA strings are single-byte Windows codepage text; every byte maps to the
/// Unicode char of the same value, so decoding never fails. Matches the
/// original tooling's byte-to-char treatment.
pub(crate) fn decode_name(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Re-encode a name produced by [`decode_name`] for byte-wise comparison.
pub(crate) fn name_matches_bytes(name: &str, bytes: &[u8]) -> bool {
    name.chars().map(|c| c as u32).eq(bytes.iter().map(|&b| b as u32))
}
