//! BSA archive reader for Bethesda game files.
//!
//! The BSA format is a flat container holding a virtual directory tree of
//! game assets. On disk it is, in order: a fixed 36-byte header, a folder
//! record table, per-folder file record tables (each preceded by the folder
//! name), an optional flat block of file names, and the payload region.
//! Payloads may be individually compressed; the codec is selected by the
//! archive version:
//!
//! - version 104 (Oblivion through Skyrim LE) - zlib
//! - version 105 (Skyrim Special Edition) - framed LZ4
//!
//! Archives are immutable once opened. Lookups key on the lowercased
//! composite `folder\file` path, and extraction returns the complete
//! decompressed payload per call.
//!
//! # Example
//!
//! ```no_run
//! use veles_bsa::Bsa;
//!
//! let archive = Bsa::open("Skyrim - Meshes.bsa")?;
//!
//! for path in archive.paths() {
//!     println!("{path}");
//! }
//!
//! let data = archive.load("meshes\\furniture\\chair01.nif")?;
//! # Ok::<(), veles_bsa::Error>(())
//! ```

mod archive;
mod error;
mod extract;
mod fallback;
mod header;
mod index;
mod record;

pub use archive::Bsa;
pub use error::{Error, Result};
pub use fallback::FallbackTool;
pub use header::{archive_flags, FileCategory, Header, MAGIC, VERSION_LZ4, VERSION_ZLIB};
pub use index::{ArchiveIndex, FileKey};
pub use record::{FileRecord, FolderRecord, RawFileRecord, RawFolderRecord};
