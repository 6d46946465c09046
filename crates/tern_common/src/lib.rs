//! Shared foundational types used across the Tern incremental build engine.
//!
//! This crate provides content and structural hashes, helpers for working with
//! dotted type names and their on-disk paths, and the internal error type.

#![warn(missing_docs)]

pub mod hash;
pub mod names;
pub mod result;

pub use hash::{ContentHash, StructuralHash};
pub use names::{package_name, path_to_type, type_to_path, TYPE_FILE_EXTENSION};
pub use result::InternalError;
