//! A compiler backend for `decl`, a small declaration language.
//!
//! A `.decl` file declares types with fields, method signatures and member
//! types. Method bodies are kept as opaque text; only the names mentioned
//! in them are reported as references.
//!
//! ```text
//! package app.model;
//! import lib.Base;
//!
//! public class Order extends Base {
//!     public static final int LIMIT = 10;
//!     private String name;
//!     public method int size() { return name.length(); }
//! }
//! ```
//!
//! Register the backend with [`register`] to make it available to the
//! scheduler under the name `decl`.

#![warn(missing_docs)]

pub mod ast;
pub mod backend;
mod batch;
mod codegen;
pub mod lexer;
pub mod parser;
mod resolve;
pub mod token;

pub use backend::{register, DeclBackend, BACKEND_NAME, SOURCE_EXTENSION};
pub use parser::parse;
