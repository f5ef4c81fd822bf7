// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The fixed-length raw byte window filter class.

use crate::ast::{BytesDef, FilterKind};
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::BResult;
use crate::filter::vtable::FilterOps;
use crate::value::{Value, ValueKind};
use std::sync::Arc;

pub struct BytesOps;

fn def(container: &Arc<Container>) -> &BytesDef {
    match &container.filter.kind {
        FilterKind::Bytes(def) => def,
        _ => unreachable!("BytesOps only ever dispatched for FilterKind::Bytes"),
    }
}

impl FilterOps for BytesOps {
    fn compute_span_size(&self, container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        Ok(def(container).len as u64)
    }

    fn read_value(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<Value> {
        let (start, end) = container.byte_range(state)?;
        let ds = container.get_data_source(state)?;
        Ok(Value::new(ValueKind::Bytes(ds.slice(start, end).into())))
    }
}
