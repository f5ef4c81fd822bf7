// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Container`]: one "box" of the interpretation graph -- a schema node
//! applied to one region of one data source.
//!
//! Named `Container` rather than the more evocative "box" purely to avoid
//! shadowing [`std::boxed::Box`] throughout this crate; every doc comment
//! below still calls the concept a box, matching the navigation-state
//! terminology used across this module family.

use crate::ast::{FieldDef, FilterRef};
use crate::browse_state::BrowseState;
use crate::data_source::DataSource;
use crate::error::{BResult, BoundKind, BrowseError, ErrorSubject, Status};
use crate::filter::ops_for;
use crate::offsets::{OffsetTable, Side};
use crate::track_path::TrackPath;
use crate::value::Value;
use bitflags::bitflags;
use std::cell::RefCell;
use std::sync::Arc;

bitflags! {
    /// Per-box state flags.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    struct BoxFlags: u8 {
        /// This box is anchored to its slack's end offset (a `HEADER` or
        /// `TRAILER` field), rather than its start.
        const R_ALIGN = 0b0001;
        /// The filter pipeline (span resolution + `ds_out` production) has
        /// already run for this box.
        const FILTER_APPLIED = 0b0010;
        /// A size computation is in progress; used to detect a filter whose
        /// size callback recurses into itself.
        const COMPUTING_SIZE = 0b0100;
    }
}

/// Deepest nesting level a schema is allowed to reach before a box
/// construction is refused with [`Status::DataError`]. Guards against
/// unbounded recursive schemas (e.g. a struct that, directly or indirectly,
/// contains itself).
pub const MAX_DEPTH_LEVEL: u32 = 256;

/// One node of the interpretation graph: a filter bound to a region of a
/// data source.
pub struct Container {
    /// The schema node this box interprets.
    pub filter: FilterRef,
    /// The box that created this one, if any (`None` for a root box).
    pub parent: Option<Arc<Container>>,
    /// The nearest enclosing struct box that name lookups against this
    /// box's siblings resolve through. `None` means this box *is* that
    /// struct box (true exactly when `filter` is scope-only).
    scope: Option<Arc<Container>>,
    /// How this box was reached from its parent.
    pub track_path: TrackPath,
    /// Nesting depth from the root box (`0` for the root).
    pub depth_level: u32,
    flags: RefCell<BoxFlags>,
    offsets: RefCell<OffsetTable>,
    ds_in: RefCell<Option<DataSource>>,
    ds_out: RefCell<Option<DataSource>>,
    cached_value: RefCell<Option<Value>>,
    /// Memoized `scope::present_fields` result for a struct box.
    fields_cache: RefCell<Option<Vec<(Arc<FieldDef>, Arc<Container>)>>>,
    /// Memoized array-item materialization for an array box.
    items_cache: RefCell<Option<Vec<Arc<Container>>>>,
}

/// Seeds the anchor side (the side opposite the one a `set_size` call will
/// resolve) of `MaxSpan`/`Span`/`MinSpan`/`Used` from the box's own slack
/// bound. Every box's concentric bounds grow inward from its slack on the
/// fixed side -- the start, for a left-aligned box growing forward; the
/// end, for a right-aligned one resolved backward from its slack end --
/// so without this seed a filter's first `compute_*_size` call would have
/// no anchor to measure a size from.
fn seed_size_anchors(offsets: &mut OffsetTable, r_align: bool, slack_start: u64, slack_end: u64) -> BResult<()> {
    let (side, value) = if r_align { (Side::End, slack_end) } else { (Side::Start, slack_start) };
    for kind in [BoundKind::MaxSpan, BoundKind::Span, BoundKind::MinSpan, BoundKind::Used] {
        offsets.set(side, kind, value)?;
    }
    Ok(())
}

impl Container {
    /// Creates the root box: the whole schema applied to the whole data
    /// source.
    #[must_use]
    pub fn new_root(filter: FilterRef, data_source: DataSource) -> Arc<Self> {
        let len = data_source.len() as u64;
        let mut offsets = OffsetTable::default();
        offsets.set(Side::Start, BoundKind::Parent, 0).expect("empty table accepts any bound");
        offsets.set(Side::End, BoundKind::Parent, len).expect("empty table accepts any bound");
        offsets.set(Side::Start, BoundKind::Slack, 0).expect("empty table accepts any bound");
        offsets.set(Side::End, BoundKind::Slack, len).expect("empty table accepts any bound");
        seed_size_anchors(&mut offsets, false, 0, len).expect("empty table accepts any bound");

        Arc::new(Self {
            filter,
            parent: None,
            scope: None,
            track_path: TrackPath::None,
            depth_level: 0,
            flags: RefCell::new(BoxFlags::empty()),
            offsets: RefCell::new(offsets),
            ds_in: RefCell::new(Some(data_source)),
            ds_out: RefCell::new(None),
            cached_value: RefCell::new(None),
            fields_cache: RefCell::new(None),
            items_cache: RefCell::new(None),
        })
    }

    /// Creates a child box reached via `track_path`, constrained to the
    /// half-open byte range `[slack_start, slack_end)` of `ds_in`.
    ///
    /// # Errors
    ///
    /// Returns `Status::DataError` if the nesting depth limit is exceeded.
    pub fn new_child(
        parent: &Arc<Container>,
        filter: FilterRef,
        track_path: TrackPath,
        ds_in: DataSource,
        slack_start: u64,
        slack_end: u64,
        r_align: bool,
    ) -> BResult<Arc<Self>> {
        let depth_level = parent.depth_level + 1;
        if depth_level > MAX_DEPTH_LEVEL {
            return Err(BrowseError::new(
                Status::DataError,
                format!("schema nesting exceeds the depth limit of {MAX_DEPTH_LEVEL}"),
            )
            .with_subject(ErrorSubject::Container(parent.clone())));
        }

        let mut offsets = OffsetTable::default();
        offsets.set(Side::Start, BoundKind::Parent, slack_start)?;
        offsets.set(Side::End, BoundKind::Parent, slack_end)?;
        offsets.set(Side::Start, BoundKind::Slack, slack_start)?;
        offsets.set(Side::End, BoundKind::Slack, slack_end)?;
        seed_size_anchors(&mut offsets, r_align, slack_start, slack_end)?;

        let scope = if filter.is_scope_only() {
            None
        } else {
            Some(parent.effective_scope())
        };

        let mut flags = BoxFlags::empty();
        flags.set(BoxFlags::R_ALIGN, r_align);

        Ok(Arc::new(Self {
            filter,
            parent: Some(parent.clone()),
            scope,
            track_path,
            depth_level,
            flags: RefCell::new(flags),
            offsets: RefCell::new(offsets),
            ds_in: RefCell::new(Some(ds_in)),
            ds_out: RefCell::new(None),
            cached_value: RefCell::new(None),
            fields_cache: RefCell::new(None),
            items_cache: RefCell::new(None),
        }))
    }

    /// The nearest enclosing struct box, or `self` if this box is one.
    #[must_use]
    pub fn effective_scope(self: &Arc<Self>) -> Arc<Self> {
        self.scope.clone().unwrap_or_else(|| self.clone())
    }

    /// The data this box's own offsets are expressed against.
    ///
    /// # Errors
    ///
    /// Returns `Status::InvalidState` if no input data source was ever
    /// attached (never true for a box produced through [`Self::new_root`] or
    /// [`Self::new_child`]).
    pub fn ds_in_or_err(&self) -> BResult<DataSource> {
        self.ds_in
            .borrow()
            .clone()
            .ok_or_else(|| BrowseError::new(Status::InvalidState, "box has no input data source"))
    }

    /// The resolved size of `kind`, if already known.
    #[must_use]
    pub fn offsets_size(&self, kind: BoundKind) -> Option<u64> {
        self.offsets.borrow().size(kind)
    }

    /// The resolved start offset of `kind`, if already known.
    #[must_use]
    pub fn offsets_start(&self, kind: BoundKind) -> Option<u64> {
        self.offsets.borrow().start(kind)
    }

    /// The resolved end offset of `kind`, if already known.
    #[must_use]
    pub fn offsets_end(&self, kind: BoundKind) -> Option<u64> {
        self.offsets.borrow().end(kind)
    }

    /// The available slack (`BoundKind::Slack`) size.
    ///
    /// # Errors
    ///
    /// Returns `Status::InvalidState` if the slack bound is unresolved
    /// (never true once the box has been constructed via [`Self::new_root`]
    /// or [`Self::new_child`]).
    pub fn slack_size(&self) -> BResult<u64> {
        self.offsets_size(BoundKind::Slack).ok_or_else(|| {
            BrowseError::new(Status::InvalidState, "slack bound unresolved")
        })
    }

    /// `true` if this box is anchored to the end of its slack.
    #[must_use]
    pub fn is_right_aligned(&self) -> bool {
        self.flags.borrow().contains(BoxFlags::R_ALIGN)
    }

    /// The minimum valid span size for this box's filter, memoized.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::compute_min_span_size` error.
    pub fn compute_min_span_size(self: &Arc<Self>, state: &mut BrowseState) -> BResult<u64> {
        if let Some(size) = self.offsets_size(BoundKind::MinSpan) {
            return Ok(size);
        }
        let size = ops_for(&self.filter.kind).compute_min_span_size(self, state)?;
        let r_align = self.is_right_aligned();
        self.offsets
            .borrow_mut()
            .set_size(BoundKind::MinSpan, size, r_align, self.filter.static_min_span())?;
        Ok(size)
    }

    /// The upper bound on this box's span, memoized.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::compute_max_span_size` error.
    pub fn compute_max_span_size(self: &Arc<Self>, state: &mut BrowseState) -> BResult<u64> {
        if let Some(size) = self.offsets_size(BoundKind::MaxSpan) {
            return Ok(size);
        }
        if self.flags.borrow().contains(BoxFlags::COMPUTING_SIZE) {
            return Err(BrowseError::new(Status::DataError, "recursive max_span computation"));
        }
        self.flags.borrow_mut().insert(BoxFlags::COMPUTING_SIZE);
        let size = ops_for(&self.filter.kind).compute_max_span_size(self, state);
        self.flags.borrow_mut().remove(BoxFlags::COMPUTING_SIZE);
        let size = size?;
        self.offsets
            .borrow_mut()
            .set_size(BoundKind::MaxSpan, size, self.is_right_aligned(), 0)?;
        Ok(size)
    }

    /// The box's chosen span size, memoized.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::compute_span_size` error, or
    /// `Status::DataError` if the filter's own size callback recurses.
    pub fn compute_span_size(self: &Arc<Self>, state: &mut BrowseState) -> BResult<u64> {
        if let Some(size) = self.offsets_size(BoundKind::Span) {
            return Ok(size);
        }
        if self.flags.borrow().contains(BoxFlags::COMPUTING_SIZE) {
            return Err(BrowseError::new(Status::DataError, "recursive span size computation"));
        }
        self.flags.borrow_mut().insert(BoxFlags::COMPUTING_SIZE);
        let size = ops_for(&self.filter.kind).compute_span_size(self, state);
        self.flags.borrow_mut().remove(BoxFlags::COMPUTING_SIZE);
        let size = size?;
        self.offsets
            .borrow_mut()
            .set_size(BoundKind::Span, size, self.is_right_aligned(), 0)?;
        Ok(size)
    }

    /// The number of bytes of this box's span actually consumed by data,
    /// memoized.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::compute_used_size` error.
    pub fn compute_used_size(self: &Arc<Self>, state: &mut BrowseState) -> BResult<u64> {
        if let Some(size) = self.offsets_size(BoundKind::Used) {
            return Ok(size);
        }
        let size = ops_for(&self.filter.kind).compute_used_size(self, state)?;
        self.offsets
            .borrow_mut()
            .set_size(BoundKind::Used, size, self.is_right_aligned(), 0)?;
        Ok(size)
    }

    /// Ensures the span is resolved and `ds_out` is populated, running the
    /// filter pipeline exactly once.
    ///
    /// # Errors
    ///
    /// Propagates any error from span resolution or from
    /// `FilterOps::get_data_source`.
    pub fn apply_filter(self: &Arc<Self>, state: &mut BrowseState) -> BResult<()> {
        if self.flags.borrow().contains(BoxFlags::FILTER_APPLIED) {
            return Ok(());
        }
        self.compute_span_size(state)?;
        let ds_out = ops_for(&self.filter.kind).get_data_source(self, state)?;
        *self.ds_out.borrow_mut() = Some(ds_out);
        self.flags.borrow_mut().insert(BoxFlags::FILTER_APPLIED);
        log::trace!("filter applied for box at depth {}", self.depth_level);
        Ok(())
    }

    /// The data source this box presents downstream (to children, or to its
    /// own `read_value`).
    ///
    /// # Errors
    ///
    /// Propagates [`Self::apply_filter`]'s error.
    pub fn get_data_source(self: &Arc<Self>, state: &mut BrowseState) -> BResult<DataSource> {
        self.apply_filter(state)?;
        Ok(self
            .ds_out
            .borrow()
            .clone()
            .expect("apply_filter populates ds_out on success"))
    }

    /// This box's own absolute byte range within `ds_in`.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::compute_span_size`]'s error.
    pub fn byte_range(self: &Arc<Self>, state: &mut BrowseState) -> BResult<(u64, u64)> {
        self.compute_span_size(state)?;
        let start = self
            .offsets_start(BoundKind::Span)
            .expect("compute_span_size resolves both ends");
        let end = self
            .offsets_end(BoundKind::Span)
            .expect("compute_span_size resolves both ends");
        Ok((start, end))
    }

    /// Decodes this box's own scalar value, memoized.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::read_value` error.
    pub fn read_value(self: &Arc<Self>, state: &mut BrowseState) -> BResult<Value> {
        if let Some(value) = self.cached_value.borrow().clone() {
            return Ok(value);
        }
        self.apply_filter(state)?;
        let value = ops_for(&self.filter.kind).read_value(self, state)?;
        *self.cached_value.borrow_mut() = Some(value.clone());
        Ok(value)
    }

    /// The number of items this box (a container filter) holds.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::get_n_items` error.
    pub fn get_n_items(self: &Arc<Self>, state: &mut BrowseState) -> BResult<u64> {
        self.apply_filter(state)?;
        ops_for(&self.filter.kind).get_n_items(self, state)
    }

    /// The memoized field list from a prior `scope::present_fields` call
    /// against this box, if any.
    ///
    /// The underlying data never changes once a box is constructed, so a
    /// struct's resolved field list is stable for the box's whole lifetime;
    /// caching it turns repeated lookups (`lookup_statement`, `iter_fields`,
    /// `struct_span`) from an O(n) re-walk each into a single materialization.
    #[must_use]
    pub(crate) fn cached_fields(&self) -> Option<Vec<(Arc<FieldDef>, Arc<Container>)>> {
        self.fields_cache.borrow().clone()
    }

    /// Stores the result of a `scope::present_fields` materialization for
    /// later [`Self::cached_fields`] calls.
    pub(crate) fn set_cached_fields(&self, fields: Vec<(Arc<FieldDef>, Arc<Container>)>) {
        *self.fields_cache.borrow_mut() = Some(fields);
    }

    /// The memoized item list from a prior array-item materialization
    /// against this box, if any. See [`Self::cached_fields`] for why this is
    /// sound to cache unconditionally.
    #[must_use]
    pub(crate) fn cached_items(&self) -> Option<Vec<Arc<Container>>> {
        self.items_cache.borrow().clone()
    }

    /// Stores the result of an array-item materialization for later
    /// [`Self::cached_items`] calls.
    pub(crate) fn set_cached_items(&self, items: Vec<Arc<Container>>) {
        *self.items_cache.borrow_mut() = Some(items);
    }

    /// Builds a child box for a struct field, anchoring it to the parent's
    /// end boundary if `field.flags` marks it `HEADER`/`TRAILER`, otherwise
    /// growing it forward from `cursor` (the byte offset immediately past
    /// the previous sibling).
    ///
    /// Bounds the child against `self`'s own *slack* end, not its resolved
    /// span end: this is called while `self`'s span is still being computed
    /// (struct span is the max reach of its own fields), so reading `self`'s
    /// span here would recurse into the computation in progress. A struct
    /// never transforms bytes of its own, so its `ds_in` is the data source
    /// children read from directly, without running the filter pipeline.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::ds_in_or_err`] or [`Self::new_child`]'s error.
    pub fn new_field_child(self: &Arc<Self>, field: &Arc<FieldDef>, cursor: u64) -> BResult<Arc<Self>> {
        let ds = self.ds_in_or_err()?;
        let parent_end = self
            .offsets_end(BoundKind::Slack)
            .expect("slack end is resolved at box construction");
        let r_align = !field.flags.is_empty();
        let slack_start = cursor;
        let slack_end = parent_end;
        Self::new_child(
            self,
            field.filter.clone(),
            TrackPath::Field(field.clone(), field.flags),
            ds,
            slack_start,
            slack_end,
            r_align,
        )
    }

    /// Builds a child box for array item `index`, growing it forward from
    /// `cursor`. See [`Self::new_field_child`] for why this bounds against
    /// `self`'s slack end rather than its resolved span.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::ds_in_or_err`] or [`Self::new_child`]'s error.
    pub fn new_array_item_child(
        self: &Arc<Self>,
        item_filter: FilterRef,
        index: usize,
        cursor: u64,
    ) -> BResult<Arc<Self>> {
        let ds = self.ds_in_or_err()?;
        let parent_end = self
            .offsets_end(BoundKind::Slack)
            .expect("slack end is resolved at box construction");
        Self::new_child(
            self,
            item_filter,
            TrackPath::Array(index),
            ds,
            cursor,
            parent_end,
            false,
        )
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("depth_level", &self.depth_level)
            .field("track_path", &self.track_path)
            .field("span", &self.offsets_size(BoundKind::Span))
            .finish()
    }
}

