// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The crate's public navigation surface: [`View`], a handle bundling a box
//! with the board it was opened against, and the standalone [`eval_expr`]
//! entry point.
//!
//! A single expression-evaluation entry point, `eval_expr(board, scope,
//! text)`, covers both top-level and in-view evaluation rather than
//! exposing two overlapping constructors.

use crate::ast::FilterRef;
use crate::board::Board;
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::data_source::DataSource;
use crate::error::{BResult, BrowseError, Error, Status};
use crate::eval;
use crate::expr;
use crate::scope::{self, Resolved};
use crate::tracker::Tracker;
use crate::value::Value;
use std::sync::Arc;

/// A box, paired with the board it resolves named expressions against.
///
/// Each method opens its own short-lived [`BrowseState`] -- a `View` itself
/// carries no per-call error slot or expected-error stack, since that state
/// is scoped to a single navigation call rather than to a session.
#[derive(Clone)]
pub struct View {
    container: Arc<Container>,
    board: Arc<Board>,
}

impl View {
    /// Opens a view at the board's root schema, over `data_source`.
    ///
    /// # Errors
    ///
    /// Returns `Err(Error::InvalidExpr)` if `board` has no root schema
    /// attached.
    pub fn open(board: Arc<Board>, data_source: DataSource) -> crate::error::Result<Self> {
        let schema = board
            .root()
            .cloned()
            .ok_or_else(|| Error::InvalidExpr("board has no root schema attached".into()))?;
        Ok(Self {
            container: Container::new_root(schema, data_source),
            board,
        })
    }

    /// Opens a view directly at an already-resolved schema and data source,
    /// independent of any board's own root.
    #[must_use]
    pub fn open_with_schema(schema: FilterRef, data_source: DataSource, board: Arc<Board>) -> Self {
        Self {
            container: Container::new_root(schema, data_source),
            board,
        }
    }

    fn from_container(container: Arc<Container>, board: Arc<Board>) -> Self {
        Self { container, board }
    }

    fn new_state(&self) -> BrowseState {
        BrowseState::new(self.board.clone())
    }

    /// The underlying box.
    #[must_use]
    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Reads this box's own scalar value.
    ///
    /// # Errors
    ///
    /// Propagates the underlying filter class's `read_value` error.
    pub fn value(&self) -> BResult<Value> {
        let mut state = self.new_state();
        self.container.read_value(&mut state)
    }

    /// The number of items this box (a struct or array) holds.
    ///
    /// # Errors
    ///
    /// Propagates the underlying filter class's `get_n_items` error.
    pub fn len(&self) -> BResult<u64> {
        let mut state = self.new_state();
        self.container.get_n_items(&mut state)
    }

    /// Resolves a field or named expression by name.
    ///
    /// # Errors
    ///
    /// Returns `Status::NoItem` if nothing by that name exists in scope.
    pub fn field(&self, name: &str) -> BResult<Self> {
        let mut state = self.new_state();
        match scope::lookup_statement(&self.container, name, &mut state)? {
            Some(Resolved::Field(container)) => Ok(Self::from_container(container, self.board.clone())),
            Some(Resolved::NamedExpr(expr) | Resolved::Attribute(expr)) => {
                let dpath = eval::resolve_dpath(&expr, &self.container, &mut state)?;
                Ok(Self::from_container(dpath.into_container(), self.board.clone()))
            }
            None => Err(BrowseError::new(Status::NoItem, format!("no field named `{name}`"))),
        }
    }

    /// Resolves array item `index`.
    ///
    /// # Errors
    ///
    /// Returns `Status::NoItem` if the index is out of range.
    pub fn item(&self, index: u64) -> BResult<Self> {
        let mut state = self.new_state();
        let mut tracker = Tracker::new(self.container.clone());
        if tracker.goto_nth_item(index, &mut state)? {
            let item = tracker.current_item().expect("goto_nth_item returned true").clone();
            Ok(Self::from_container(item, self.board.clone()))
        } else {
            Err(BrowseError::new(Status::NoItem, format!("no item at index {index}")))
        }
    }

    /// Resolves the `twin`-th array item (0-based) whose key equals `key`.
    ///
    /// # Errors
    ///
    /// Returns `Status::NoItem` if no matching item exists.
    pub fn item_by_key(&self, key: &[u8], twin: u64) -> BResult<Self> {
        let mut state = self.new_state();
        let mut tracker = Tracker::new(self.container.clone());
        if tracker.goto_nth_item_with_key(key, twin, &mut state)? {
            let item = tracker.current_item().expect("goto_nth_item_with_key returned true").clone();
            Ok(Self::from_container(item, self.board.clone()))
        } else {
            Err(BrowseError::new(Status::NoItem, format!("no item with key {key:?} (twin {twin})")))
        }
    }

    /// Compiles and evaluates `text` against this view as the lookup scope.
    ///
    /// # Errors
    ///
    /// Returns `Status::InvalidParam` if `text` does not compile, or
    /// propagates evaluation errors.
    pub fn eval(&self, text: &str) -> BResult<Value> {
        let expr = expr::compile(text).map_err(|e| BrowseError::new(Status::InvalidParam, e.to_string()))?;
        let mut state = self.new_state();
        eval::evaluate_value(&expr, &self.container, &mut state)
    }
}

/// Compiles and evaluates `text` against `scope`, sharing `board`'s named
/// items and expressions.
///
/// # Errors
///
/// Returns `Status::InvalidParam` if `text` does not compile, or propagates
/// evaluation errors.
pub fn eval_expr(board: &Arc<Board>, scope: &Arc<Container>, text: &str) -> BResult<Value> {
    let expr = expr::compile(text).map_err(|e| BrowseError::new(Status::InvalidParam, e.to_string()))?;
    let mut state = BrowseState::new(board.clone());
    eval::evaluate_value(&expr, scope, &mut state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::{self, StructBuilder};
    use test_log::test;

    #[test]
    fn navigates_struct_field_by_name() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let board = Board::with_root(schema);
        let view = View::open(board, DataSource::from_memory(vec![42])).unwrap();
        assert_eq!(view.field("a").unwrap().value().unwrap().as_integer(), Some(42));
    }

    #[test]
    fn top_level_eval_expr_reads_condition() {
        let schema = StructBuilder::new().field("flag", build::u8_()).build();
        let board = Board::with_root(schema);
        let view = View::open(board.clone(), DataSource::from_memory(vec![1])).unwrap();
        let value = eval_expr(&board, view.container(), "flag == 1").unwrap();
        assert_eq!(value.as_boolean(), Some(true));
    }
}
