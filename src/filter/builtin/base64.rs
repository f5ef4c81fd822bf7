// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The `base64` chain-stage transform.

use crate::ast::FilterKind;
use crate::error::{BResult, BrowseError, Status};
use crate::filter::vtable::FilterOps;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

pub struct Base64Ops;

impl FilterOps for Base64Ops {
    fn transform_bytes(&self, input: &[u8], _kind: &FilterKind) -> BResult<Vec<u8>> {
        STANDARD
            .decode(input)
            .map_err(|e| BrowseError::new(Status::DataError, format!("invalid base64: {e}")))
    }
}
