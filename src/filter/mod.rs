// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Filter classes: the implementations behind each [`crate::ast::FilterKind`]
//! variant.

pub mod vtable;

#[doc(hidden)]
pub mod builtin;

use crate::ast::FilterKind;
use vtable::FilterOps;

/// Picks the [`FilterOps`] implementation for `kind`.
///
/// A plain match, not a field stored on [`crate::ast::FilterNode`] itself --
/// adding a filter class touches only this function and its own
/// `builtin/*.rs` module, never `ast.rs`.
#[must_use]
pub fn ops_for(kind: &FilterKind) -> &'static dyn FilterOps {
    match kind {
        FilterKind::Struct(_) => &builtin::struct_filter::StructOps,
        FilterKind::Array(_) => &builtin::array::ArrayOps,
        FilterKind::Integer(_) => &builtin::integer::IntegerOps,
        FilterKind::Boolean => &builtin::boolean::BooleanOps,
        FilterKind::Bytes(_) => &builtin::bytes::BytesOps,
        FilterKind::StringBoundary(_) => &builtin::string_boundary::StringBoundaryOps,
        FilterKind::Chain(_) => &builtin::chain::ChainOps,
        FilterKind::Base64 => &builtin::base64::Base64Ops,
    }
}
