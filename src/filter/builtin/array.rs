// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The homogeneous array filter class, including keyed lookup with twins
//! (repeated keys disambiguated by 0-based occurrence count).

use crate::ast::{ArrayDef, ArrayLength, FilterKind};
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::{BResult, BoundKind, BrowseError, Status};
use crate::filter::vtable::FilterOps;
use crate::value::Value;
use crate::tracker::Tracker;
use std::sync::Arc;

pub struct ArrayOps;

fn def(container: &Arc<Container>) -> &ArrayDef {
    match &container.filter.kind {
        FilterKind::Array(def) => def,
        _ => unreachable!("ArrayOps only ever dispatched for FilterKind::Array"),
    }
}

/// Materializes every item of `container` in order, growing forward from
/// its slack start.
///
/// A `FillsSlack` array probes each next item rather than trusting the
/// cursor alone: a variable-size trailing item that doesn't actually fit in
/// what's left is an expected, silently-recovered `OutOfBounds` (the array
/// just ends there), not a hard failure of the whole lookup.
///
/// Memoized on `container`: the underlying data never changes, so repeated
/// calls (from every `goto_*`/`get_n_items`/keyed lookup) reuse the first
/// materialization instead of re-walking every item from scratch.
fn items(container: &Arc<Container>, state: &mut BrowseState) -> BResult<Vec<Arc<Container>>> {
    if let Some(cached) = container.cached_items() {
        return Ok(cached);
    }

    let def = def(container);
    let mut cursor = container
        .offsets_start(BoundKind::Slack)
        .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack start unresolved"))?;
    let slack_end = container
        .offsets_end(BoundKind::Slack)
        .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack end unresolved"))?;

    let mut out = Vec::new();
    let mut index = 0usize;
    loop {
        if let ArrayLength::Fixed(n) = def.length {
            if index >= n {
                break;
            }
        } else if cursor >= slack_end {
            break;
        }

        let fills_slack = matches!(def.length, ArrayLength::FillsSlack);
        let probed = state.with_expected(Status::OutOfBounds, |state| {
            let item = container.new_array_item_child(def.item_filter.clone(), index, cursor)?;
            let outcome = item.byte_range(state).and_then(|(_, end)| {
                if end > slack_end {
                    Err(BrowseError::new(Status::OutOfBounds, "array item overruns its slack"))
                } else {
                    Ok((item, end))
                }
            });
            match outcome {
                Err(err) if fills_slack && state.is_expected(err.status) => Ok(None),
                other => other.map(Some),
            }
        })?;

        let Some((item, end)) = probed else { break };
        cursor = end;
        out.push(item);
        index += 1;
    }

    container.set_cached_items(out.clone());
    Ok(out)
}

fn key_matches(value: &Value, key: &[u8]) -> bool {
    value.as_bytes().is_some_and(|b| b == key) || value.as_str_bytes().is_some_and(|b| b == key)
}

impl FilterOps for ArrayOps {
    fn compute_span_size(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<u64> {
        let slack_start = container
            .offsets_start(BoundKind::Slack)
            .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack start unresolved"))?;
        match def(container).length {
            ArrayLength::FillsSlack => container.slack_size(),
            ArrayLength::Fixed(_) => {
                let materialized = items(container, state)?;
                let end = materialized
                    .last()
                    .map(|last| last.byte_range(state))
                    .transpose()?
                    .map_or(slack_start, |(_, end)| end);
                Ok(end - slack_start)
            }
        }
    }

    fn get_n_items(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<u64> {
        #[allow(clippy::cast_possible_truncation)]
        Ok(items(container, state)?.len() as u64)
    }

    fn get_item_key(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<Option<Value>> {
        let Some(parent) = &container.parent else {
            return Ok(None);
        };
        let FilterKind::Array(def) = &parent.filter.kind else {
            return Ok(None);
        };
        let Some(key_field) = &def.key_field else {
            return Ok(None);
        };
        match crate::scope::lookup_statement(container, key_field, state)? {
            Some(crate::scope::Resolved::Field(field)) => Ok(Some(field.read_value(state)?)),
            _ => Ok(None),
        }
    }

    fn goto_first_item(&self, tracker: &mut Tracker, state: &mut BrowseState) -> BResult<bool> {
        let container = tracker.container().clone();
        let all = items(&container, state)?;
        if let Some(first) = all.into_iter().next() {
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
        let all = items(&container, state)?;
        let next_index = tracker.current_index().map_or(0, |i| i + 1);
        #[allow(clippy::cast_possible_truncation)]
        if let Some(next) = all.get(next_index as usize) {
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
        let all = items(&container, state)?;
        #[allow(clippy::cast_possible_truncation)]
        if let Some(item) = all.get(index as usize) {
            let end = item.byte_range(state)?.1;
            tracker.set_item(item.clone(), index, end);
            Ok(true)
        } else {
            tracker.set_end();
            Ok(false)
        }
    }

    fn goto_nth_item_with_key(
        &self,
        tracker: &mut Tracker,
        key: &[u8],
        twin: u64,
        state: &mut BrowseState,
    ) -> BResult<bool> {
        let container = tracker.container().clone();
        let all = items(&container, state)?;
        let mut seen = 0u64;
        for (index, item) in all.iter().enumerate() {
            let Some(item_key) = self.get_item_key(item, state)? else {
                continue;
            };
            if key_matches(&item_key, key) {
                if seen == twin {
                    let end = item.byte_range(state)?.1;
                    #[allow(clippy::cast_possible_truncation)]
                    tracker.set_item(item.clone(), index as u64, end);
                    return Ok(true);
                }
                seen += 1;
            }
        }
        tracker.set_end();
        Ok(false)
    }
}
