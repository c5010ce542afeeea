//! Error types for the BSA crate.

use thiserror::Error;

/// Errors that can occur when working with BSA archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error (truncated tables, malformed strings).
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// Invalid archive magic bytes.
    #[error("invalid BSA magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    /// The archive version has no known payload codec.
    #[error("unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    /// In-process decompression failed.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// The external decompression fallback failed or timed out.
    #[error("fallback decompression error: {0}")]
    Fallback(String),

    /// Path not present in the archive index.
    #[error("file not in archive: {0}")]
    NotFound(String),
}

/// Result type for BSA operations.
pub type Result<T> = std::result::Result<T, Error>;
