// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The offset-resolution algebra: six concentric offset bounds per side
//! and the checked setters that keep them consistently nested.

use crate::error::{BoundKind, BrowseError, OutOfBoundsInfo, Status};

/// Which end of a bound pair an offset belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    /// The start (left) offset.
    Start,
    /// The end (right) offset.
    End,
}

/// Outermost-to-innermost ordering of the six concentric bounds.
const ORDER: [BoundKind; 6] = [
    BoundKind::Parent,
    BoundKind::Slack,
    BoundKind::MaxSpan,
    BoundKind::Span,
    BoundKind::MinSpan,
    BoundKind::Used,
];

fn rank(kind: BoundKind) -> usize {
    ORDER
        .iter()
        .position(|k| *k == kind)
        .expect("ORDER lists every BoundKind variant")
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Pair {
    start: Option<u64>,
    end: Option<u64>,
}

/// The six concentric offset pairs of a single box, one side each.
#[derive(Clone, Debug, Default)]
pub struct OffsetTable {
    pairs: [Pair; 6],
}

impl OffsetTable {
    /// The resolved start offset for `kind`, if any.
    #[must_use]
    pub fn start(&self, kind: BoundKind) -> Option<u64> {
        self.pairs[rank(kind)].start
    }

    /// The resolved end offset for `kind`, if any.
    #[must_use]
    pub fn end(&self, kind: BoundKind) -> Option<u64> {
        self.pairs[rank(kind)].end
    }

    /// The resolved size (`end - start`) for `kind`, if both ends are
    /// known.
    #[must_use]
    pub fn size(&self, kind: BoundKind) -> Option<u64> {
        match (self.start(kind), self.end(kind)) {
            (Some(s), Some(e)) => Some(e.saturating_sub(s)),
            _ => None,
        }
    }

    fn bound(&self, kind: BoundKind, side: Side) -> Option<u64> {
        match side {
            Side::Start => self.start(kind),
            Side::End => self.end(kind),
        }
    }

    /// Checks that `value` on `side` for `kind` stays within every
    /// already-resolved concentrically-outer bound, and outside every
    /// already-resolved concentrically-inner one.
    ///
    /// # Errors
    ///
    /// Returns `Status::OutOfBounds` on the first violated bound found,
    /// scanning outer-to-inner.
    pub fn check(&self, side: Side, kind: BoundKind, value: u64) -> Result<(), BrowseError> {
        let r = rank(kind);

        for outer in ORDER.iter().copied().take(r) {
            if let Some(bound) = self.bound(outer, side) {
                let violates = match side {
                    Side::Start => value < bound,
                    Side::End => value > bound,
                };
                if violates {
                    return Err(Self::violation(side, outer, bound, kind, value));
                }
            }
        }

        for inner in ORDER.iter().copied().skip(r + 1) {
            if let Some(bound) = self.bound(inner, side) {
                let violates = match side {
                    Side::Start => value > bound,
                    Side::End => value < bound,
                };
                if violates {
                    return Err(Self::violation(side, inner, bound, kind, value));
                }
            }
        }

        Ok(())
    }

    fn violation(
        side: Side,
        registered_type: BoundKind,
        registered_offset: u64,
        requested_type: BoundKind,
        requested_offset: u64,
    ) -> BrowseError {
        BrowseError::out_of_bounds(
            format!(
                "{side:?} offset {requested_offset} for {requested_type} escapes {registered_type} bound {registered_offset}"
            ),
            OutOfBoundsInfo {
                registered_type,
                registered_offset,
                requested_type,
                requested_offset,
            },
        )
    }

    /// Sets `kind`'s `side` offset to `value`, after validating it against
    /// every already-resolved bound.
    ///
    /// # Errors
    ///
    /// See [`Self::check`].
    pub fn set(&mut self, side: Side, kind: BoundKind, value: u64) -> Result<(), BrowseError> {
        self.check(side, kind, value)?;
        let pair = &mut self.pairs[rank(kind)];
        match side {
            Side::Start => pair.start = Some(value),
            Side::End => pair.end = Some(value),
        }
        Ok(())
    }

    /// Translates a size-set into a start- or end-set, depending on whether
    /// the box is right-aligned. `min_span` sizes are clamped so that
    /// `min_span >= static_min_span`.
    ///
    /// # Errors
    ///
    /// Returns `Status::InvalidState` if the anchor offset this size is
    /// relative to is not yet resolved, or propagates a [`Self::check`]
    /// failure.
    pub fn set_size(
        &mut self,
        kind: BoundKind,
        size: u64,
        r_align: bool,
        static_min_span: u64,
    ) -> Result<(), BrowseError> {
        let size = if kind == BoundKind::MinSpan {
            size.max(static_min_span)
        } else {
            size
        };

        if r_align {
            let end = self.end(kind).ok_or_else(|| {
                BrowseError::new(
                    Status::InvalidState,
                    format!("cannot set {kind} size: end offset unresolved on a right-aligned box"),
                )
            })?;
            let start = end.checked_sub(size).ok_or_else(|| {
                BrowseError::new(
                    Status::DataError,
                    format!("{kind} size {size} exceeds end offset {end}"),
                )
            })?;
            self.set(Side::Start, kind, start)
        } else {
            let start = self.start(kind).ok_or_else(|| {
                BrowseError::new(
                    Status::InvalidState,
                    format!("cannot set {kind} size: start offset unresolved"),
                )
            })?;
            self.set(Side::End, kind, start + size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn concentric_bounds_validate_against_outer() {
        let mut t = OffsetTable::default();
        t.set(Side::Start, BoundKind::Parent, 0).unwrap();
        t.set(Side::End, BoundKind::Parent, 10).unwrap();
        t.set(Side::Start, BoundKind::Slack, 2).unwrap();
        t.set(Side::End, BoundKind::Slack, 10).unwrap();

        // Span start before slack start must fail.
        let err = t.set(Side::Start, BoundKind::Span, 1).unwrap_err();
        assert_eq!(err.status, Status::OutOfBounds);
    }

    #[test]
    fn inner_bound_must_not_escape_outward() {
        let mut t = OffsetTable::default();
        t.set(Side::Start, BoundKind::Span, 3).unwrap();
        t.set(Side::End, BoundKind::Span, 8).unwrap();

        // A later-resolved outer `max_span` bound narrower than span must
        // be rejected (span already escapes it).
        let err = t.set(Side::Start, BoundKind::MaxSpan, 4).unwrap_err();
        assert_eq!(err.status, Status::OutOfBounds);
    }

    #[test]
    fn set_size_right_aligned_sets_start() {
        let mut t = OffsetTable::default();
        t.set(Side::End, BoundKind::Span, 10).unwrap();
        t.set_size(BoundKind::Span, 4, true, 0).unwrap();
        assert_eq!(t.start(BoundKind::Span), Some(6));
    }

    #[test]
    fn set_size_clamps_min_span() {
        let mut t = OffsetTable::default();
        t.set(Side::Start, BoundKind::MinSpan, 0).unwrap();
        t.set_size(BoundKind::MinSpan, 1, false, 4).unwrap();
        assert_eq!(t.end(BoundKind::MinSpan), Some(4));
    }
}
