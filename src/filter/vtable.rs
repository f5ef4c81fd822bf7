// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`FilterOps`]: the closed vtable every filter class implements.
//!
//! A filter class answers only the questions relevant to its own shape
//! (a struct never gets asked for `transform_bytes`, an integer never gets
//! asked `goto_named_item`); every other method falls back to its default,
//! which reports [`crate::error::not_implemented`]. `container.rs` picks the
//! right implementation for a node with [`crate::filter::ops_for`] -- a
//! plain match on [`crate::ast::FilterKind`], not a field stored on the AST
//! node itself, so adding a filter class never touches `ast.rs`.

use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::data_source::DataSource;
use crate::error::{not_implemented, BResult};
use crate::tracker::Tracker;
use crate::value::Value;
use std::sync::Arc;

/// The operations a filter class may implement. All methods default to
/// `NotImplemented`; a class overrides only the ones relevant to its shape.
pub trait FilterOps: Send + Sync {
    /// The filter's minimum possible span size, given the box's current
    /// state. Defaults to the filter's statically known minimum.
    fn compute_min_span_size(&self, container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        Ok(container.filter.static_min_span())
    }

    /// The filter's chosen span size -- the logical number of bytes it
    /// claims from its slack. Every data-producing filter must implement
    /// this.
    fn compute_span_size(&self, _container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        Err(not_implemented("compute_span_size"))
    }

    /// An upper bound on the span size, before the span itself is known.
    /// Defaults to the full slack available.
    fn compute_max_span_size(&self, container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        container.slack_size()
    }

    /// Bytes actually consumed by data, which may be less than the span
    /// (e.g. padding). Defaults to the span size.
    fn compute_used_size(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<u64> {
        self.compute_span_size(container, state)
    }

    /// The number of items a container filter holds. Scalar filters never
    /// override this.
    fn get_n_items(&self, _container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        Err(not_implemented("get_n_items"))
    }

    /// Decodes the box's own scalar value. Container filters never override
    /// this (their "value" is the aggregate of their children, reached via
    /// scope/tracker navigation instead).
    fn read_value(&self, _container: &Arc<Container>, _state: &mut BrowseState) -> BResult<Value> {
        Err(not_implemented("read_value"))
    }

    /// The data source this box presents to its children or to a `read_value`
    /// call. Defaults to passing the box's input data source through
    /// unchanged (an identity overlay).
    fn get_data_source(&self, container: &Arc<Container>, _state: &mut BrowseState) -> BResult<DataSource> {
        container.ds_in_or_err()
    }

    /// Positions `tracker` on its first child item.
    ///
    /// Returns `Ok(false)` if the container has no items.
    fn goto_first_item(&self, _tracker: &mut Tracker, _state: &mut BrowseState) -> BResult<bool> {
        Err(not_implemented("goto_first_item"))
    }

    /// Advances `tracker` to the next item after its current one.
    ///
    /// Returns `Ok(false)` at end of iteration.
    fn goto_next_item(&self, _tracker: &mut Tracker, _state: &mut BrowseState) -> BResult<bool> {
        Err(not_implemented("goto_next_item"))
    }

    /// Positions `tracker` directly on item `index`.
    fn goto_nth_item(&self, _tracker: &mut Tracker, _index: u64, _state: &mut BrowseState) -> BResult<bool> {
        Err(not_implemented("goto_nth_item"))
    }

    /// Positions `tracker` on the field named `name`.
    fn goto_named_item(&self, _tracker: &mut Tracker, _name: &str, _state: &mut BrowseState) -> BResult<bool> {
        Err(not_implemented("goto_named_item"))
    }

    /// Positions `tracker` on the `twin`-th item (0-based) whose key equals
    /// `key`.
    fn goto_nth_item_with_key(
        &self,
        _tracker: &mut Tracker,
        _key: &[u8],
        _twin: u64,
        _state: &mut BrowseState,
    ) -> BResult<bool> {
        Err(not_implemented("goto_nth_item_with_key"))
    }

    /// The lookup key of `container` within its parent array, if the array
    /// is keyed.
    fn get_item_key(&self, _container: &Arc<Container>, _state: &mut BrowseState) -> BResult<Option<Value>> {
        Ok(None)
    }

    /// Transforms raw input bytes into this filter's output bytes, as a
    /// non-first stage of a filter chain. `kind` is the stage's own
    /// [`crate::ast::FilterKind`], carrying whatever configuration the
    /// transform needs (a boundary sequence, an encoding, ...), since a
    /// chain stage has no box of its own to read offsets from. Only
    /// implemented by pure byte-to-byte stages (e.g. `base64`, a boundary
    /// truncation); every other filter class reports `NotImplemented`.
    fn transform_bytes(&self, _input: &[u8], _kind: &crate::ast::FilterKind) -> BResult<Vec<u8>> {
        Err(not_implemented("transform_bytes"))
    }
}
