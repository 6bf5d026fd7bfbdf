//! Shared value, kind, and error types for vehicle signal distribution.
//!
//! This crate carries the pieces of the signal model that have no notion of
//! "tree": the POSIX-style error taxonomy ([`error`]), the enums that classify
//! a node's role and payload type ([`kind`]), and the tagged value cell a leaf
//! stores its current reading in ([`value`]). [`vsd-tree`](https://docs.rs/vsd-tree)
//! builds the arena, codec, and subscription bus on top of these.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod kind;
pub mod value;

pub use error::{VsdError, VsdErrorKind};
pub use kind::{DataKind, ElementKind};
pub use value::{StringCell, Value};

pub use smol_str::SmolStr;
