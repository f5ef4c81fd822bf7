// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`TrackPath`]: the discriminated identifier of one child within a
//! container.

use crate::ast::FieldDef;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Field-statement flags that affect how a field is entered and how its
    /// box is aligned relative to its parent.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct FieldFlags: u8 {
        /// Anchor this field's box to the parent's right (end) boundary
        /// regardless of ambient tracker direction.
        const HEADER = 0b0001;
        /// Anchor this field's box to the parent's right boundary, entered
        /// from the trailing side (mirror of `HEADER`).
        const TRAILER = 0b0010;
        /// Not reachable through ordinary scope iteration (still reachable
        /// by name).
        const HIDDEN = 0b0100;
    }
}

/// Identifies one child within a container: how a box was reached from its
/// parent. Used to re-derive left- or right-aligned boundaries, and as the
/// tracker's "current position" marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrackPath {
    /// No current item (tracker freshly created or past either end).
    None,
    /// Reached via a named (or anonymous-pass-through) field statement.
    Field(Arc<FieldDef>, FieldFlags),
    /// Reached via a numeric array index.
    Array(usize),
    /// Reached via an array slice `[start, end)`.
    ArraySlice(usize, usize),
}

impl TrackPath {
    /// Returns `true` if this path denotes no current item.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// The field flags of this path, if it is a `Field`.
    #[must_use]
    pub fn field_flags(&self) -> FieldFlags {
        match self {
            Self::Field(_, flags) => *flags,
            _ => FieldFlags::empty(),
        }
    }

    /// The field's name, if this path is a named `Field`.
    #[must_use]
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field(field, _) => field.name.as_deref(),
            _ => None,
        }
    }
}

impl Default for TrackPath {
    fn default() -> Self {
        Self::None
    }
}
