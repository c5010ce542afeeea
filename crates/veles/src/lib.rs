//! Veles - Bethesda BSA archive reading library.
//!
//! This crate provides a unified interface to the Veles library ecosystem
//! for working with BSA game archives.
//!
//! # Crates
//!
//! - [`veles_common`] - Common utilities (binary reading, shared errors)
//! - [`veles_bsa`] - BSA archive parsing and payload extraction
//!
//! On top of those this crate adds [`BsaRepository`], a registry over all
//! archives of a game installation.
//!
//! # Example
//!
//! ```no_run
//! use veles::prelude::*;
//!
//! // Open a single archive
//! let archive = Bsa::open("Skyrim - Meshes.bsa")?;
//! let data = archive.load("meshes\\furniture\\chair01.nif")?;
//!
//! // Or scan a data directory and resolve paths across archives
//! let mut repo = BsaRepository::new();
//! repo.open_dir("Data")?;
//! let data = repo.load("meshes\\furniture\\chair01.nif")?;
//! # Ok::<(), veles::Error>(())
//! ```

// Re-export sub-crates
pub use veles_bsa as bsa;
pub use veles_common as common;

mod repository;

pub use repository::BsaRepository;
pub use veles_bsa::{Bsa, Error, FileCategory, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::repository::BsaRepository;
    pub use veles_bsa::{Bsa, FallbackTool, FileCategory, FileRecord, FolderRecord};
    pub use veles_common::BinaryReader;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
