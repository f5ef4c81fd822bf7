// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The fixed-width integer filter class.

use crate::ast::{Endianness, FilterKind, IntegerDef};
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::{BResult, BrowseError, Status};
use crate::filter::vtable::FilterOps;
use crate::value::{Value, ValueKind};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::sync::Arc;

pub struct IntegerOps;

fn def(container: &Arc<Container>) -> &IntegerDef {
    match &container.filter.kind {
        FilterKind::Integer(def) => def,
        _ => unreachable!("IntegerOps only ever dispatched for FilterKind::Integer"),
    }
}

fn read_integer(bytes: &[u8], def: &IntegerDef) -> BResult<i64> {
    if bytes.len() < usize::from(def.width) {
        return Err(BrowseError::new(Status::DataError, "not enough bytes for integer read"));
    }
    let raw: u64 = match def.width {
        1 => u64::from(bytes[0]),
        2 => u64::from(if def.endianness == Endianness::Big {
            BigEndian::read_u16(bytes)
        } else {
            LittleEndian::read_u16(bytes)
        }),
        4 => u64::from(if def.endianness == Endianness::Big {
            BigEndian::read_u32(bytes)
        } else {
            LittleEndian::read_u32(bytes)
        }),
        8 => {
            if def.endianness == Endianness::Big {
                BigEndian::read_u64(bytes)
            } else {
                LittleEndian::read_u64(bytes)
            }
        }
        other => {
            return Err(BrowseError::new(
                Status::DataError,
                format!("unsupported integer width: {other} bytes"),
            ))
        }
    };

    if def.signed {
        let shift = 64 - u32::from(def.width) * 8;
        #[allow(clippy::cast_possible_wrap)]
        Ok(((raw << shift) as i64) >> shift)
    } else {
        #[allow(clippy::cast_possible_wrap)]
        Ok(raw as i64)
    }
}

impl FilterOps for IntegerOps {
    fn compute_span_size(&self, container: &Arc<Container>, _state: &mut BrowseState) -> BResult<u64> {
        Ok(u64::from(def(container).width))
    }

    fn read_value(&self, container: &Arc<Container>, state: &mut BrowseState) -> BResult<Value> {
        let (start, end) = container.byte_range(state)?;
        let ds = container.get_data_source(state)?;
        let value = read_integer(ds.slice(start, end), def(container))?;
        Ok(Value::new(ValueKind::Integer(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::data_source::DataSource;
    use test_log::test;

    #[test]
    fn reads_big_endian_u32() {
        let filter = crate::ast::build::u32_be();
        let ds = DataSource::from_memory(vec![0x00, 0x00, 0x01, 0x00]);
        let root = Container::new_root(filter, ds);
        let mut state = BrowseState::new(Board::new());
        let value = root.read_value(&mut state).unwrap();
        assert_eq!(value.as_integer(), Some(256));
    }

    #[test]
    fn reads_little_endian_u32() {
        let filter = crate::ast::build::u32_le();
        let ds = DataSource::from_memory(vec![0x00, 0x01, 0x00, 0x00]);
        let root = Container::new_root(filter, ds);
        let mut state = BrowseState::new(Board::new());
        let value = root.read_value(&mut state).unwrap();
        assert_eq!(value.as_integer(), Some(256));
    }
}
