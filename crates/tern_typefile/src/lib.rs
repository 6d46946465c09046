//! Compiled type files and their structural digest.
//!
//! A type file is the binary artifact a compiler backend produces for each
//! type it compiles. This crate defines the [`TypeFile`] model, its on-disk
//! [`codec`], and the [`digest`] that reduces a type to the part of its shape
//! other units can observe.

#![warn(missing_docs)]

pub mod codec;
pub mod digest;
pub mod error;
pub mod model;

pub use codec::{decode, encode};
pub use digest::{digest, digest_bytes};
pub use error::TypeFileError;
pub use model::{
    Annotation, Constant, ElementValue, ElementValuePair, Field, MemberType, Method, Modifiers,
    Nesting, TagBits, TypeAnnotation, TypeFile,
};
