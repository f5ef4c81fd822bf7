// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Dpath`]: the intermediate result of navigating an expression's path
//! portion (everything before a final scalar read).

use crate::container::Container;
use std::sync::Arc;

/// A resolved path expression: always a box, in this crate's model --
/// array-item and field navigation both bottom out at a child
/// [`Container`], whether or not that box turns out to hold a scalar or a
/// nested container filter.
#[derive(Clone)]
pub enum Dpath {
    /// The box an expression's path portion resolved to.
    Container(Arc<Container>),
}

impl Dpath {
    /// Unwraps to the underlying box.
    #[must_use]
    pub fn into_container(self) -> Arc<Container> {
        match self {
            Self::Container(c) => c,
        }
    }

    /// Borrows the underlying box.
    #[must_use]
    pub fn as_container(&self) -> &Arc<Container> {
        match self {
            Self::Container(c) => c,
        }
    }
}
