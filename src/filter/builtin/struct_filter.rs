// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The struct filter class: a named-field container and scope-only filter.

use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::{not_implemented, BResult};
use crate::filter::vtable::FilterOps;
use crate::scope;
use crate::tracker::Tracker;
use std::sync::Arc;

pub struct StructOps;

impl FilterOps for StructOps {
    fn compute_span_size(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<u64> {
        scope::struct_span(container, state)
    }

    fn get_n_items(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<u64> {
        #[allow(clippy::cast_possible_truncation)]
        Ok(scope::iter_fields(container, state)?.len() as u64)
    }

    fn goto_first_item(&self, tracker: &mut Tracker, state: &mut BrowseState) -> BResult<bool> {
        let container = tracker.container().clone();
        let fields = scope::iter_fields(&container, state)?;
        if let Some(first) = fields.into_iter().next() {
            let end = first.byte_range(state)?.1;
            tracker.set_item(first, 0, end);
            Ok(true)
        } else {
            tracker.set_end();
            Ok(false)
        }
    }

    fn goto_next_item(&self, tracker: &mut Tracker, state: &mut BrowseState) -> BResult<bool> {
        let container = tracker.container().clone();
        let fields = scope::iter_fields(&container, state)?;
        let next_index = tracker.current_index().map_or(0, |i| i + 1);
        #[allow(clippy::cast_possible_truncation)]
        if let Some(next) = fields.get(next_index as usize) {
            let end = next.byte_range(state)?.1;
            tracker.set_item(next.clone(), next_index, end);
            Ok(true)
        } else {
            tracker.set_end();
            Ok(false)
        }
    }

    fn goto_nth_item(&self, tracker: &mut Tracker, index: u64, state: &mut BrowseState) -> BResult<bool> {
        let container = tracker.container().clone();
        let fields = scope::iter_fields(&container, state)?;
        #[allow(clippy::cast_possible_truncation)]
        if let Some(item) = fields.get(index as usize) {
            let end = item.byte_range(state)?.1;
            tracker.set_item(item.clone(), index, end);
            Ok(true)
        } else {
            tracker.set_end();
            Ok(false)
        }
    }

    fn goto_named_item(&self, tracker: &mut Tracker, name: &str, state: &mut BrowseState) -> BResult<bool> {
        let container = tracker.container().clone();
        let fields = scope::iter_fields(&container, state)?;
        for (index, item) in fields.iter().enumerate() {
            if item.track_path.field_name() == Some(name) {
                let end = item.byte_range(state)?.1;
                #[allow(clippy::cast_possible_truncation)]
                tracker.set_item(item.clone(), index as u64, end);
                return Ok(true);
            }
        }
        tracker.set_end();
        Ok(false)
    }

    fn goto_nth_item_with_key(
        &self,
        _tracker: &mut Tracker,
        _key: &[u8],
        _twin: u64,
        _state: &mut BrowseState,
    ) -> BResult<bool> {
        Err(not_implemented("goto_nth_item_with_key on a struct: fields are looked up by name, not by key"))
    }
}

impl std::fmt::Debug for StructOps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StructOps")
    }
}
