// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The tagged [`Value`] type produced by `read_value` and the expression
//! evaluator.

use crate::container::Container;
use crate::data_source::DataSource;
use crate::slice::Slice;
use std::sync::Arc;

/// A typed value read out of the binary data, or synthesized by an
/// expression.
#[derive(Clone, Debug)]
pub enum ValueKind {
    /// No value (e.g. a scope-only filter with nothing to read).
    Unset,
    /// A signed 64-bit integer; narrower integer filters are widened into
    /// this on read.
    Integer(i64),
    /// A boolean.
    Boolean(bool),
    /// Decoded text.
    String(Slice),
    /// Raw bytes.
    Bytes(Slice),
    /// An entire data source (e.g. the result of `get_data_source`).
    Data(DataSource),
    /// A sub-range `[start, end)` of a data source.
    DataRange(DataSource, u64, u64),
}

/// A value, tagged by [`ValueKind`], optionally keeping a box alive so the
/// bytes it borrows from remain valid for as long as the value exists.
#[derive(Clone, Debug)]
pub struct Value {
    kind: ValueKind,
    keepalive: Option<Arc<Container>>,
}

impl Value {
    /// Wraps a `ValueKind` with no keep-alive reference.
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            keepalive: None,
        }
    }

    /// Attaches a box whose data must stay alive for as long as this value
    /// is held (used when the value borrows from an `Overlay` box's
    /// `ds_out`).
    #[must_use]
    pub fn with_keepalive(mut self, container: Arc<Container>) -> Self {
        self.keepalive = Some(container);
        self
    }

    /// The unset value.
    #[must_use]
    pub fn unset() -> Self {
        Self::new(ValueKind::Unset)
    }

    /// Borrows the tagged payload.
    #[must_use]
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Returns the integer payload, if this value is an `Integer`.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match &self.kind {
            ValueKind::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean payload, if this value is a `Boolean`.
    #[must_use]
    pub fn as_boolean(&self) -> Option<bool> {
        match &self.kind {
            ValueKind::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the string payload, if this value is a `String`.
    #[must_use]
    pub fn as_str_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            ValueKind::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Returns the byte payload, if this value is `Bytes`.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.kind {
            ValueKind::Bytes(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Returns `true` if this is `Unset`.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self.kind, ValueKind::Unset)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use ValueKind::{Boolean, Bytes, Data, DataRange, Integer, String, Unset};
        match (&self.kind, &other.kind) {
            (Unset, Unset) => true,
            (Integer(a), Integer(b)) => a == b,
            (Boolean(a), Boolean(b)) => a == b,
            (String(a), Bytes(b)) | (Bytes(a), String(b)) => a.as_ref() == b.as_ref(),
            (String(a), String(b)) | (Bytes(a), Bytes(b)) => a.as_ref() == b.as_ref(),
            (Data(a), Data(b)) => a.same_origin(b),
            (DataRange(a, s1, e1), DataRange(b, s2, e2)) => {
                a.same_origin(b) && s1 == s2 && e1 == e2
            }
            _ => false,
        }
    }
}
