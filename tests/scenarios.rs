// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Black-box navigation scenarios, each driving a schema built with
//! [`schemascope::ast::build`] through [`View`] the way a caller would.

use schemascope::ast::build::{self, StructBuilder};
use schemascope::{Board, DataSource, Status, View};
use test_log::test;

#[test]
fn null_terminated_string_field() {
    // A fixed 8-byte window, truncated at its NUL terminator on read: the
    // window's own width (not the terminator position) is the field's span.
    let schema = StructBuilder::new()
        .field(
            "s",
            build::chain(vec![build::bytes(8), build::string_boundary(b"\0".to_vec())]),
        )
        .build();
    let board = Board::with_root(schema);
    let data = DataSource::from_memory(b"HI\0\0\0\0\0\0".to_vec());
    let view = View::open(board, data).unwrap();

    assert_eq!(view.eval("s").unwrap().as_str_bytes(), Some(b"HI".as_slice()));
    assert_eq!(view.eval("sizeof(s)").unwrap().as_integer(), Some(8));
}

#[test]
fn anonymous_field_name_pass_through() {
    let inner = StructBuilder::new().field("x", build::u32_le()).build();
    let schema = StructBuilder::new()
        .anonymous_field(inner)
        .field("y", build::u8_())
        .build();
    let board = Board::with_root(schema);
    let data = DataSource::from_memory(vec![0x01, 0x00, 0x00, 0x00, 0xFF]);
    let view = View::open(board, data).unwrap();

    assert_eq!(view.eval("x").unwrap().as_integer(), Some(1));
    assert_eq!(view.eval("y").unwrap().as_integer(), Some(255));
}

#[test]
fn conditional_field_skipped() {
    let schema = StructBuilder::new()
        .field("flag", build::u8_())
        .field_if("body", build::u8_(), schemascope::expr::compile("flag == 1").unwrap())
        .build();
    let board = Board::with_root(schema);

    let absent = View::open(board.clone(), DataSource::from_memory(vec![0x00, 0xAA])).unwrap();
    let err = absent.eval("body").unwrap_err();
    assert_eq!(err.status, Status::NoItem);

    let present = View::open(board, DataSource::from_memory(vec![0x01, 0xAA])).unwrap();
    assert_eq!(present.eval("body").unwrap().as_integer(), Some(0xAA));
}

#[test]
fn array_keyed_lookup_with_twins() {
    let item = StructBuilder::new()
        .field(
            "name",
            build::chain(vec![build::bytes(4), build::string_boundary(b"\0".to_vec())]),
        )
        .field("v", build::u8_())
        .build();
    let schema = StructBuilder::new()
        .field("items", build::array_fixed_keyed(item, 3, "name"))
        .build();
    let board = Board::with_root(schema);

    let mut data = Vec::new();
    data.extend_from_slice(b"a\0\0\0");
    data.push(10);
    data.extend_from_slice(b"b\0\0\0");
    data.push(20);
    data.extend_from_slice(b"a\0\0\0");
    data.push(30);
    let view = View::open(board, DataSource::from_memory(data)).unwrap();

    assert_eq!(view.eval("items['a'{1}].v").unwrap().as_integer(), Some(30));
    let err = view.eval("items['a'{2}].v").unwrap_err();
    assert_eq!(err.status, Status::NoItem);
}

#[test]
fn out_of_bounds_reported_with_context() {
    let schema = StructBuilder::new()
        .field("a", build::u32_be())
        .field("b", build::u32_be())
        .build();
    let board = Board::with_root(schema);
    // `a` fits in [0..4); `b` would need [4..8) but only 2 bytes of slack remain.
    let data = DataSource::from_memory(vec![0x00, 0x01, 0x02, 0x03, 0x04, 0x05]);
    let view = View::open(board, data).unwrap();

    assert_eq!(view.eval("a").unwrap().as_integer(), Some(0x0001_0203));

    let err = view.eval("b").unwrap_err();
    assert_eq!(err.status, Status::OutOfBounds);
    let rendered = err.dump_to_string();
    assert!(rendered.contains("computing item size for field `b`"), "{rendered}");
    assert!(rendered.contains("box parent space is [0..6]"), "{rendered}");
}

#[test]
fn filter_chain_decodes_base64_then_truncates_at_boundary() {
    let schema = StructBuilder::new()
        .field(
            "payload",
            build::chain(vec![
                build::bytes(12),
                build::base64(),
                build::string_boundary(b"\n".to_vec()),
            ]),
        )
        .build();
    let board = Board::with_root(schema);
    // base64("hi\nhello") == "aGkKaGVsbG8="
    let data = DataSource::from_memory(b"aGkKaGVsbG8=".to_vec());
    let view = View::open(board, data).unwrap();

    let value = view.eval("payload").unwrap();
    assert_eq!(value.as_str_bytes(), Some(b"hi".as_slice()));
}
