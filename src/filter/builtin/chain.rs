// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The filter chain class: a raw-byte-producing first stage followed by
//! zero or more pure byte-to-byte transform stages (e.g. `base64`).
//!
//! Each stage's output becomes the next stage's input; the chain box's own
//! span is the first stage's span over the chain box's own slack, and its
//! data source is the final stage's transformed bytes. A chain stage after
//! the first is restricted to a pure byte transform -- it cannot itself
//! introduce a nested named scope, since the chain box is not struct-kind.
//! A schema that needs a struct over transformed bytes nests a separate
//! field of that struct type over the chain's own produced bytes instead.

use crate::ast::FilterKind;
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::data_source::DataSource;
use crate::error::{BResult, BoundKind};
use crate::filter::{ops_for, vtable::FilterOps};
use crate::track_path::TrackPath;
use crate::value::{Value, ValueKind};
use std::sync::Arc;

pub struct ChainOps;

fn stages(container: &Arc<Container>) -> &[crate::ast::FilterRef] {
    match &container.filter.kind {
        FilterKind::Chain(stages) => stages,
        _ => unreachable!("ChainOps only ever dispatched for FilterKind::Chain"),
    }
}

/// A stage's own `FilterOps` methods pattern-match `container.filter.kind`
/// against their own kind, so the first stage can't be driven directly
/// against the chain box itself (whose kind is `Chain`). Wraps it in a
/// throwaway child box over the same slack instead.
fn first_stage_box(container: &Arc<Container>, first: crate::ast::FilterRef) -> BResult<Arc<Container>> {
    let slack_start = container.offsets_start(BoundKind::Slack).unwrap_or(0);
    let slack_end = container.offsets_end(BoundKind::Slack).unwrap_or(slack_start);
    let ds = container.ds_in_or_err()?;
    Container::new_child(
        container,
        first,
        TrackPath::None,
        ds,
        slack_start,
        slack_end,
        container.is_right_aligned(),
    )
}

impl FilterOps for ChainOps {
    fn compute_span_size(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<u64> {
        let Some(first) = stages(container).first().cloned() else {
            return Ok(0);
        };
        first_stage_box(container, first)?.compute_span_size(state)
    }

    fn get_data_source(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<DataSource> {
        let (start, end) = container.byte_range(state)?;
        let ds = container.ds_in_or_err()?;
        let mut bytes = ds.slice(start, end).to_vec();

        for stage in stages(container).iter().skip(1) {
            bytes = ops_for(&stage.kind).transform_bytes(&bytes, &stage.kind)?;
        }

        Ok(DataSource::from_memory(bytes))
    }

    fn read_value(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<Value> {
        let ds = container.get_data_source(state)?;
        let bytes = ds.as_bytes();
        let kind = match stages(container).last().map(|stage| &stage.kind) {
            Some(FilterKind::StringBoundary(_)) => ValueKind::String(bytes.into()),
            _ => ValueKind::Bytes(bytes.into()),
        };
        Ok(Value::new(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build;
    use crate::board::Board;
    use test_log::test;

    #[test]
    fn decodes_base64_stage() {
        let chain = build::chain(vec![build::bytes(8), build::base64()]);
        let ds = DataSource::from_memory(b"aGVsbG8=".to_vec());
        let root = Container::new_root(chain, ds);
        let mut state = BrowseState::new(Board::new());
        let value = root.read_value(&mut state).unwrap();
        assert_eq!(value.as_bytes(), Some(b"hello".as_slice()));
    }

    #[test]
    fn chain_ending_in_string_boundary_reads_as_string() {
        let chain = build::chain(vec![build::bytes(8), build::string_boundary(b"\0".to_vec())]);
        let ds = DataSource::from_memory(b"HI\0\0\0\0\0\0".to_vec());
        let root = Container::new_root(chain, ds);
        let mut state = BrowseState::new(Board::new());
        let value = root.read_value(&mut state).unwrap();
        assert_eq!(value.as_str_bytes(), Some(b"HI".as_slice()));
        assert_eq!(value.as_bytes(), None);
    }
}
