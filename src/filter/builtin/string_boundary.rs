// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The boundary-terminated string filter class (e.g. NUL-terminated C
//! strings).

use crate::ast::{FilterKind, StringBoundaryDef};
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::{BResult, BoundKind, BrowseError, Status};
use crate::filter::vtable::FilterOps;
use crate::value::{Value, ValueKind};
use std::sync::Arc;

pub struct StringBoundaryOps;

fn def(container: &Arc<Container>) -> &StringBoundaryDef {
    match &container.filter.kind {
        FilterKind::StringBoundary(def) => def,
        _ => unreachable!("StringBoundaryOps only ever dispatched for FilterKind::StringBoundary"),
    }
}

fn find_boundary(container: &Arc<Container>) -> BResult<(u64, u64)> {
    let def = def(container);
    let ds = container.ds_in_or_err()?;
    let start = container
        .offsets_start(BoundKind::Slack)
        .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack start unresolved"))?;
    let slack_end = container
        .offsets_end(BoundKind::Slack)
        .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack end unresolved"))?;
    let haystack = ds.slice(start, slack_end);

    if def.boundary.is_empty() {
        return Ok((start, slack_end));
    }

    haystack
        .windows(def.boundary.len())
        .position(|w| w == def.boundary.as_slice())
        .map(|offset| {
            #[allow(clippy::cast_possible_truncation)]
            let content_end = start + offset as u64;
            (content_end, content_end + def.boundary.len() as u64)
        })
        .ok_or_else(|| BrowseError::new(Status::DataError, "string boundary not found within slack"))
}

impl FilterOps for StringBoundaryOps {
    fn compute_span_size(&self, container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        let start = container
            .offsets_start(BoundKind::Slack)
            .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack start unresolved"))?;
        let (_, span_end) = find_boundary(container)?;
        Ok(span_end - start)
    }

    fn compute_used_size(&self, container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        let start = container
            .offsets_start(BoundKind::Slack)
            .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack start unresolved"))?;
        let (content_end, _) = find_boundary(container)?;
        Ok(content_end - start)
    }

    fn read_value(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<Value> {
        container.compute_span_size(state)?;
        let start = container
            .offsets_start(BoundKind::Slack)
            .ok_or_else(|| BrowseError::new(Status::InvalidState, "slack start unresolved"))?;
        let (content_end, _) = find_boundary(container)?;
        let ds = container.get_data_source(state)?;
        Ok(Value::new(ValueKind::String(ds.slice(start, content_end).into())))
    }

    /// As a non-first chain stage, truncates its input at the first
    /// occurrence of the boundary rather than reading from a box's own
    /// slack (there is none; the input is whatever the previous stage
    /// produced).
    fn transform_bytes(&self, input: &[u8], kind: &crate::ast::FilterKind) -> BResult<Vec<u8>> {
        let FilterKind::StringBoundary(def) = kind else {
            unreachable!("StringBoundaryOps::transform_bytes only ever dispatched for FilterKind::StringBoundary")
        };
        if def.boundary.is_empty() {
            return Ok(input.to_vec());
        }
        let end = input
            .windows(def.boundary.len())
            .position(|w| w == def.boundary.as_slice())
            .ok_or_else(|| BrowseError::new(Status::DataError, "string boundary not found in chain stage input"))?;
        Ok(input[..end].to_vec())
    }
}
