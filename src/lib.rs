// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A lazy, declarative interpreter for binary data described by a schema.
//!
//! ##### About
//!
//! A schema is a tree of filters -- structs, arrays, fixed-width integers,
//! booleans, byte windows, boundary-terminated strings, and filter chains --
//! describing how to read a region of bytes without reading it eagerly.
//! Applying a schema to a [`DataSource`] produces a [`Container`] (a "box"):
//! a lazily resolved node of the interpretation graph, binding one filter to
//! one byte range. Navigating into a box's fields or array items only ever
//! resolves the offsets and reads the bytes actually requested.
//!
//! Every box tracks six concentric offset bounds per side -- `parent`
//! (given by its creator) down through `slack`, `max_span`, `span`,
//! `min_span` to `used` -- so a filter's size computation can never escape
//! the region its parent allotted it, and a caller always gets a detailed,
//! context-carrying error rather than a silent out-of-bounds read.
//!
//! # Example usage
//!
//! ```
//! use schemascope::ast::build::{self, StructBuilder};
//! use schemascope::{Board, DataSource, View};
//!
//! let schema = StructBuilder::new()
//!     .field("magic", build::u32_be())
//!     .field("count", build::u8_())
//!     .build();
//!
//! let board = Board::with_root(schema);
//! let view = View::open(board, DataSource::from_memory(vec![0, 0, 0, 1, 42])).unwrap();
//!
//! assert_eq!(view.field("magic").unwrap().value().unwrap().as_integer(), Some(1));
//! assert_eq!(view.field("count").unwrap().value().unwrap().as_integer(), Some(42));
//! ```

mod api;
pub mod ast;
mod board;
mod browse_state;
mod container;
mod data_source;
mod dpath;
mod error;
mod eval;
#[doc(hidden)]
pub mod filter;
mod offsets;
mod scope;
mod slice;
mod track_path;
mod tracker;
mod value;

pub mod expr;

pub use api::{eval_expr, View};
pub use board::Board;
pub use browse_state::BrowseState;
pub use container::Container;
pub use data_source::DataSource;
pub use dpath::Dpath;
pub use error::{
    BResult, BoundKind, BrowseError, ContextFrame, Error, ErrorInfo, ErrorSubject, OutOfBoundsInfo, Result, Status,
};
pub use slice::Slice;
pub use track_path::{FieldFlags, TrackPath};
pub use tracker::Tracker;
pub use value::{Value, ValueKind};
