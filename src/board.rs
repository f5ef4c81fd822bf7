// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! [`Board`]: the environment binding user-added named items/expressions
//! onto a root schema.

use crate::ast::FilterRef;
use crate::error::{Error, Result};
use crate::expr;
use crate::expr::Expr;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};

/// A name -> AST-node/expression environment, plus the root schema it is
/// attached to.
///
/// Mutation (`add_item`/`add_expr`/`compile_expr`) happens during setup;
/// once browsing starts a board is treated as read-only and shared freely
/// across sessions. Name lookup happens on every field and named-expression
/// access, so it is backed by `FxHashMap` rather than a linear scan; a
/// parallel insertion-order ledger (`item_order`/`expr_order`) sits
/// alongside each map so enumeration (`items_in_order`/`exprs_in_order`)
/// still reflects the order names were added in, since `FxHashMap` itself
/// gives no such guarantee.
pub struct Board {
    root: Option<FilterRef>,
    items: Mutex<FxHashMap<String, FilterRef>>,
    exprs: Mutex<FxHashMap<String, Arc<Expr>>>,
    item_order: Mutex<Vec<String>>,
    expr_order: Mutex<Vec<String>>,
}

impl Board {
    /// Creates an empty board with no root schema attached yet.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            root: None,
            items: Mutex::new(FxHashMap::default()),
            exprs: Mutex::new(FxHashMap::default()),
            item_order: Mutex::new(Vec::new()),
            expr_order: Mutex::new(Vec::new()),
        })
    }

    /// Creates a board already bound to a root schema.
    #[must_use]
    pub fn with_root(root: FilterRef) -> Arc<Self> {
        Arc::new(Self {
            root: Some(root),
            items: Mutex::new(FxHashMap::default()),
            exprs: Mutex::new(FxHashMap::default()),
            item_order: Mutex::new(Vec::new()),
            expr_order: Mutex::new(Vec::new()),
        })
    }

    /// The board's root schema, if one has been attached.
    #[must_use]
    pub fn root(&self) -> Option<&FilterRef> {
        self.root.as_ref()
    }

    /// Binds `name` to an already-compiled AST node.
    ///
    /// # Errors
    ///
    /// Returns `Err(Error::DuplicateName)` if `name` is already bound on
    /// this board (as either an item or an expression).
    pub fn add_item(&self, name: &str, node: FilterRef) -> Result<()> {
        self.check_unused(name)?;
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name.to_string(), node);
        self.item_order
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(name.to_string());
        Ok(())
    }

    /// Compiles `text` and binds `name` to the resulting expression.
    ///
    /// # Errors
    ///
    /// Returns `Err(Error::DuplicateName)` if `name` is already bound, or
    /// `Err(Error::InvalidExpr)` if `text` does not parse.
    pub fn add_expr(&self, name: &str, text: &str) -> Result<()> {
        self.check_unused(name)?;
        let expr = expr::compile(text)?;
        self.exprs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name.to_string(), Arc::new(expr));
        self.expr_order
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(name.to_string());
        Ok(())
    }

    /// Compiles `text` without binding it to a name. The board owns the
    /// returned expression's lifetime (it is arena-appended here) so
    /// repeated compiles of ad-hoc text don't need a release call -- see
    /// the "`TODO free expr_node`" Open Question resolution in
    /// `DESIGN.md`.
    ///
    /// # Errors
    ///
    /// Returns `Err(Error::InvalidExpr)` if `text` does not parse.
    pub fn compile_expr(&self, text: &str) -> Result<Arc<Expr>> {
        let expr = Arc::new(expr::compile(text)?);
        self.exprs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(format!("<anon:{text}>#{:p}", Arc::as_ptr(&expr)), expr.clone());
        Ok(expr)
    }

    /// Looks up a board-level named item by name.
    #[must_use]
    pub fn lookup_item(&self, name: &str) -> Option<FilterRef> {
        self.items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Looks up a board-level named expression by name.
    #[must_use]
    pub fn lookup_expr(&self, name: &str) -> Option<Arc<Expr>> {
        self.exprs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Lists board-level named items in the order they were added.
    #[must_use]
    pub fn items_in_order(&self) -> Vec<(String, FilterRef)> {
        let order = self
            .item_order
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let items = self
            .items
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        order
            .iter()
            .filter_map(|name| items.get(name).map(|node| (name.clone(), node.clone())))
            .collect()
    }

    /// Lists board-level named expressions in the order they were added.
    ///
    /// Anonymous expressions compiled via [`Self::compile_expr`] are not
    /// user-named and so never appear here.
    #[must_use]
    pub fn exprs_in_order(&self) -> Vec<(String, Arc<Expr>)> {
        let order = self
            .expr_order
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let exprs = self
            .exprs
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        order
            .iter()
            .filter_map(|name| exprs.get(name).map(|expr| (name.clone(), expr.clone())))
            .collect()
    }

    fn check_unused(&self, name: &str) -> Result<()> {
        if self.lookup_item(name).is_some() || self.lookup_expr(name).is_some() {
            return Err(Error::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn rejects_duplicate_names() {
        let board = Board::new();
        board.add_expr("x", "1").unwrap();
        let err = board.add_expr("x", "2").unwrap_err();
        assert!(matches!(err, Error::DuplicateName(n) if n == "x"));
    }

    #[test]
    fn looks_up_bound_expr() {
        let board = Board::new();
        board.add_expr("flag", "1").unwrap();
        assert!(board.lookup_expr("flag").is_some());
        assert!(board.lookup_expr("missing").is_none());
    }

    #[test]
    fn exprs_enumerate_in_insertion_order() {
        let board = Board::new();
        board.add_expr("third", "3").unwrap();
        board.add_expr("first", "1").unwrap();
        board.add_expr("second", "2").unwrap();

        let names: Vec<_> = board.exprs_in_order().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["third", "first", "second"]);
    }

    #[test]
    fn compile_expr_does_not_appear_in_named_enumeration() {
        let board = Board::new();
        board.add_expr("kept", "1").unwrap();
        board.compile_expr("2").unwrap();

        assert_eq!(board.exprs_in_order().len(), 1);
    }
}
