// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Tracker`]: the cursor a caller moves across the items of one container.

use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::{BResult, BrowseError, Status};
use crate::filter::ops_for;
use crate::track_path::TrackPath;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    /// Tracker navigation state flags.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct TrackerFlags: u8 {
        /// Iteration has run past the last item; `current_item` is `None`.
        const AT_END = 0b0001;
        /// Iteration is proceeding from the last item towards the first.
        const REVERSED = 0b0010;
    }
}

/// A cursor over the items of one container box (a struct's fields, or an
/// array's elements). Cheap to clone: cloning duplicates only the cursor
/// state, never the underlying container graph, which stays shared via
/// `Arc`.
#[derive(Clone)]
pub struct Tracker {
    container: Arc<Container>,
    item: Option<Arc<Container>>,
    item_index: Option<u64>,
    cursor: u64,
    flags: TrackerFlags,
    /// The tracker state `enter_item` was called from, restored by `return`.
    parent: Option<Box<Tracker>>,
}

impl Tracker {
    /// Creates a tracker over `container`'s items, positioned before the
    /// first one.
    #[must_use]
    pub fn new(container: Arc<Container>) -> Self {
        Self {
            container,
            item: None,
            item_index: None,
            cursor: 0,
            flags: TrackerFlags::empty(),
            parent: None,
        }
    }

    /// The container this tracker iterates.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// The item currently under the cursor, if any.
    #[must_use]
    pub fn current_item(&self) -> Option<&Arc<Container>> {
        self.item.as_ref()
    }

    /// The 0-based index of the current item, if any.
    #[must_use]
    pub fn current_index(&self) -> Option<u64> {
        self.item_index
    }

    /// `true` once iteration has run past the last item.
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.flags.contains(TrackerFlags::AT_END)
    }

    /// `true` if this tracker walks from the last item towards the first.
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.flags.contains(TrackerFlags::REVERSED)
    }

    /// Flips iteration direction. Does not itself move the cursor; the next
    /// `goto_next_item` call will step the other way.
    pub fn reverse_direction(&mut self) {
        self.flags.toggle(TrackerFlags::REVERSED);
    }

    /// The next unclaimed byte offset within the container's span, grown
    /// forward as items are visited left to right.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Positions the current item, clearing `AT_END`.
    pub fn set_item(&mut self, item: Arc<Container>, index: u64, cursor_after: u64) {
        self.item = Some(item);
        self.item_index = Some(index);
        self.cursor = cursor_after;
        self.flags.remove(TrackerFlags::AT_END);
    }

    /// Marks iteration as having run past the last item.
    pub fn set_end(&mut self) {
        self.item = None;
        self.flags.insert(TrackerFlags::AT_END);
    }

    /// Positions the tracker on the first item.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::goto_first_item` error.
    pub fn goto_first_item(&mut self, state: &mut BrowseState) -> BResult<bool> {
        let container = self.container.clone();
        ops_for(&container.filter.kind).goto_first_item(self, state)
    }

    /// Advances to the item after the current one.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::goto_next_item` error.
    pub fn goto_next_item(&mut self, state: &mut BrowseState) -> BResult<bool> {
        let container = self.container.clone();
        ops_for(&container.filter.kind).goto_next_item(self, state)
    }

    /// Positions the tracker directly on item `index`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::goto_nth_item` error.
    pub fn goto_nth_item(&mut self, index: u64, state: &mut BrowseState) -> BResult<bool> {
        let container = self.container.clone();
        ops_for(&container.filter.kind).goto_nth_item(self, index, state)
    }

    /// Positions the tracker on the field named `name`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::goto_named_item` error.
    pub fn goto_named_item(&mut self, name: &str, state: &mut BrowseState) -> BResult<bool> {
        let container = self.container.clone();
        ops_for(&container.filter.kind).goto_named_item(self, name, state)
    }

    /// Positions the tracker on the `twin`-th item keyed `key`.
    ///
    /// # Errors
    ///
    /// Propagates the underlying `FilterOps::goto_nth_item_with_key` error.
    pub fn goto_nth_item_with_key(
        &mut self,
        key: &[u8],
        twin: u64,
        state: &mut BrowseState,
    ) -> BResult<bool> {
        let container = self.container.clone();
        ops_for(&container.filter.kind).goto_nth_item_with_key(self, key, twin, state)
    }

    /// Replaces `tk.box` with a new item box built from the current item's
    /// filter: `tk` now tracks inside that item, starting positioned before
    /// its own first child. The tracker's prior state is saved so [`Self::return`]
    /// can restore it.
    ///
    /// # Errors
    ///
    /// Returns `Status::InvalidState` if no current item is selected.
    pub fn enter_item(&mut self) -> BResult<()> {
        let Some(item) = self.item.clone() else {
            return Err(BrowseError::new(Status::InvalidState, "no current item to enter"));
        };
        let parent = std::mem::replace(self, Self::new(item));
        self.parent = Some(Box::new(parent));
        Ok(())
    }

    /// The inverse of [`Self::enter_item`]: restores the parent box, with
    /// the child's track path as the new `cur`.
    ///
    /// # Errors
    ///
    /// Returns `Status::InvalidState` if this tracker never entered an item.
    pub fn r#return(&mut self) -> BResult<()> {
        let Some(parent) = self.parent.take() else {
            return Err(BrowseError::new(Status::InvalidState, "tracker has no parent to return to"));
        };
        *self = *parent;
        Ok(())
    }

    /// How the current item was reached from this tracker's own container.
    #[must_use]
    pub fn current_track_path(&self) -> TrackPath {
        self.item
            .as_ref()
            .map_or(TrackPath::None, |item| item.track_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::{self, StructBuilder};
    use crate::board::Board;
    use crate::data_source::DataSource;
    use test_log::test;

    #[test]
    fn enter_item_then_return_restores_cur() {
        let schema = StructBuilder::new()
            .field("a", build::u8_())
            .field("b", build::u8_())
            .build();
        let ds = DataSource::from_memory(vec![1, 2]);
        let root = Container::new_root(schema, ds);
        let mut state = BrowseState::new(Board::new());

        let mut tracker = Tracker::new(root);
        assert!(tracker.goto_first_item(&mut state).unwrap());
        let cur_before = tracker.current_track_path();
        let item_offset_before = tracker.cursor();

        tracker.enter_item().unwrap();
        assert!(tracker.current_item().is_none());

        tracker.r#return().unwrap();
        assert_eq!(tracker.current_track_path(), cur_before);
        assert_eq!(tracker.cursor(), item_offset_before);
    }

    #[test]
    fn enter_item_without_current_item_fails() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let ds = DataSource::from_memory(vec![1]);
        let root = Container::new_root(schema, ds);

        let mut tracker = Tracker::new(root);
        let err = tracker.enter_item().unwrap_err();
        assert_eq!(err.status, Status::InvalidState);
    }
}
