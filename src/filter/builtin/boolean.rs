// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The single-byte boolean filter class.

use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::{BResult, BrowseError, Status};
use crate::filter::vtable::FilterOps;
use crate::value::{Value, ValueKind};
use std::sync::Arc;

pub struct BooleanOps;

impl FilterOps for BooleanOps {
    fn compute_span_size(&self, _container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        Ok(1)
    }

    fn read_value(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<Value> {
        let (start, end) = container.byte_range(state)?;
        let ds = container.get_data_source(state)?;
        let bytes = ds.slice(start, end);
        let byte = bytes.first().ok_or_else(|| BrowseError::new(Status::DataError, "no byte to read"))?;
        Ok(Value::new(ValueKind::Boolean(*byte != 0)))
    }
}
