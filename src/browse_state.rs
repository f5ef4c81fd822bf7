// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`BrowseState`]: the per-call context threaded through every navigation
//! operation.

use crate::board::Board;
use crate::error::Status;
use std::sync::Arc;

/// Per-call expected-error stack and current board. Every operation that may
/// allocate, read data or report an error takes a `BrowseState` by mutable
/// reference.
///
/// Deliberately holds no `Send`/`Sync` bound: a browse session is
/// single-threaded and its state is plain interior-mutation, never shared
/// across threads.
pub struct BrowseState {
    expected_errors: Vec<Status>,
    board: Arc<Board>,
}

impl BrowseState {
    /// Creates a fresh state bound to `board`.
    #[must_use]
    pub fn new(board: Arc<Board>) -> Self {
        Self {
            expected_errors: Vec::new(),
            board,
        }
    }

    /// The board this state is bound to.
    #[must_use]
    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    /// Pushes an error kind a caller plans to silently recover from (e.g.
    /// `OutOfBounds` while probing a variable-size array's trailing item).
    fn push_expected(&mut self, status: Status) {
        self.expected_errors.push(status);
    }

    /// Pops the most recently pushed expected-error kind. Must be paired
    /// with [`Self::push_expected`].
    fn pop_expected(&mut self) {
        self.expected_errors.pop();
    }

    /// Whether `status` is currently on the expected-error stack.
    #[must_use]
    pub fn is_expected(&self, status: Status) -> bool {
        self.expected_errors.contains(&status)
    }

    /// Runs `f` while `status` is considered expected/recoverable,
    /// restoring the expected-error stack afterwards regardless of outcome.
    /// `f` still reports a matching error through its own `Result` -- this
    /// only marks the zone so `f` (or whatever it calls into) can consult
    /// [`Self::is_expected`] to tell a probed, anticipated failure apart
    /// from a genuine one.
    pub fn with_expected<T>(
        &mut self,
        status: Status,
        f: impl FnOnce(&mut Self) -> crate::error::BResult<T>,
    ) -> crate::error::BResult<T> {
        self.push_expected(status);
        let result = f(self);
        self.pop_expected();
        result
    }
}
