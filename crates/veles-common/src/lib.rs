//! Common utilities for Veles.
//!
//! This crate provides the foundational pieces shared by all Veles crates:
//!
//! - [`BinaryReader`] - Zero-copy binary reading from byte slices
//! - [`Error`] / [`Result`] - Shared error type for low-level reads

mod error;
mod reader;

pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
