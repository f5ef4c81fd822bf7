// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Expression evaluation: walks a compiled [`Expr`] against a scope box,
//! bottoming out either at a navigated box's own value or at a computed
//! scalar (`sizeof`, arithmetic, comparisons).

use crate::ast::{FilterKind, FilterRef};
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::dpath::Dpath;
use crate::error::{BResult, BrowseError, Status};
use crate::expr::{BinOp, Expr, IndexKey};
use crate::scope::Resolved;
use crate::tracker::Tracker;
use crate::value::{Value, ValueKind};
use std::sync::Arc;

/// Evaluates `expr` against `scope`, producing its scalar [`Value`].
///
/// Path expressions (`Ident`, `Field`, `Index`) resolve to a box and read
/// that box's own value; everything else is computed directly.
///
/// # Errors
///
/// Returns `Status::NoItem` if a name or key does not resolve, or
/// `Status::InvalidParam` if an operator is applied to a value of the wrong
/// kind.
pub fn evaluate_value(expr: &Expr, scope: &Arc<Container>, state: &mut BrowseState) -> BResult<Value> {
    match expr {
        Expr::IntLit(n) => Ok(Value::new(ValueKind::Integer(*n))),
        Expr::StrLit(s) => Ok(Value::new(ValueKind::Bytes(s.clone().into()))),
        Expr::BoolLit(b) => Ok(Value::new(ValueKind::Boolean(*b))),
        Expr::SizeOf(inner) => {
            let dpath = resolve_dpath(inner, scope, state)?;
            let size = dpath.as_container().clone().compute_span_size(state)?;
            #[allow(clippy::cast_possible_wrap)]
            Ok(Value::new(ValueKind::Integer(size as i64)))
        }
        Expr::BinOp(lhs, op, rhs) => {
            let lhs = evaluate_value(lhs, scope, state)?;
            let rhs = evaluate_value(rhs, scope, state)?;
            apply_binop(*op, lhs, rhs)
        }
        Expr::Ident(_) | Expr::Field(_, _) | Expr::Index(_, _) => {
            let dpath = resolve_dpath(expr, scope, state)?;
            dpath.into_container().read_value(state)
        }
    }
}

/// Resolves the path portion of `expr` against `scope` to the box it names,
/// without reading a scalar value out of it.
///
/// # Errors
///
/// Returns `Status::NoItem` if a name or key does not resolve, or
/// `Status::InvalidParam` if `expr` is not a path expression (a literal,
/// `sizeof`, or a binary operation).
pub fn resolve_dpath(expr: &Expr, scope: &Arc<Container>, state: &mut BrowseState) -> BResult<Dpath> {
    match expr {
        Expr::Ident(name) => resolve_named(scope, name, state),
        Expr::Field(base, name) => {
            let base_container = resolve_dpath(base, scope, state)?.into_container();
            if !matches!(base_container.filter.kind, FilterKind::Struct(_)) {
                return Err(BrowseError::new(
                    Status::NotContainer,
                    format!("`.{name}` requires a struct box"),
                ));
            }
            resolve_named(&base_container, name, state)
        }
        Expr::Index(base, key) => {
            let base_container = resolve_dpath(base, scope, state)?.into_container();
            let mut tracker = Tracker::new(base_container);
            let found = match key {
                IndexKey::Numeric(idx_expr) => {
                    let idx = evaluate_value(idx_expr, scope, state)?
                        .as_integer()
                        .ok_or_else(|| BrowseError::new(Status::InvalidParam, "index must be an integer"))?;
                    #[allow(clippy::cast_sign_loss)]
                    tracker.goto_nth_item(idx as u64, state)?
                }
                IndexKey::Keyed(key, twin) => tracker.goto_nth_item_with_key(key, *twin, state)?,
            };
            if !found {
                return Err(BrowseError::new(Status::NoItem, "array index out of range"));
            }
            Ok(Dpath::Container(
                tracker.current_item().expect("goto_* returned true").clone(),
            ))
        }
        Expr::IntLit(_) | Expr::StrLit(_) | Expr::BoolLit(_) | Expr::SizeOf(_) | Expr::BinOp(_, _, _) => {
            Err(BrowseError::new(Status::InvalidParam, "expression is not a path"))
        }
    }
}

/// Falls back to a board-bound named expression (`Board::add_expr`) once the
/// local scope has nothing by that name, so a schema's fields can reference
/// names the caller bound before opening a view.
fn resolve_named(scope: &Arc<Container>, name: &str, state: &mut BrowseState) -> BResult<Dpath> {
    match crate::scope::lookup_statement(scope, name, state)? {
        Some(Resolved::Field(container)) => Ok(Dpath::Container(container)),
        Some(Resolved::NamedExpr(expr) | Resolved::Attribute(expr)) => resolve_dpath(&expr, scope, state),
        None => match state.board().lookup_expr(name) {
            Some(expr) => resolve_dpath(&expr, scope, state),
            None => Err(BrowseError::new(Status::NoItem, format!("no field or expression named `{name}`"))),
        },
    }
}

/// Which of the two filter-type readings [`evaluate_filter_type`] resolves
/// an expression to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FilterTypeKind {
    /// The concrete item filter a data-producing expression names.
    Item,
    /// The concrete filter node a filter-valued expression names.
    Filter,
}

/// Resolves an expression referring to a filter to the concrete filter AST
/// node it names.
///
/// This crate's filter AST is always statically concrete: a field, chain
/// stage or array item filter is fixed at schema-build time, and nothing in
/// the `Expr` grammar computes a filter choice at browse time. So there is
/// no dynamic filter-type expression to resolve against `scope`, and this is
/// the identity function over `filter_node` -- kept as a named operation so
/// a caller doesn't need to know in advance whether a filter reference is
/// static.
#[must_use]
pub fn evaluate_filter_type(filter_node: &FilterRef, _scope: &Arc<Container>, _kind: FilterTypeKind) -> FilterRef {
    filter_node.clone()
}

/// Folds `expr` as a filter chain onto `scope`, replacing `dpath` with the
/// box `expr` resolves to.
///
/// # Errors
///
/// Propagates [`resolve_dpath`]'s error.
pub fn transform_dpath(expr: &Expr, scope: &Arc<Container>, dpath: &mut Dpath, state: &mut BrowseState) -> BResult<()> {
    *dpath = resolve_dpath(expr, scope, state)?;
    Ok(())
}

fn apply_binop(op: BinOp, lhs: Value, rhs: Value) -> BResult<Value> {
    let invalid = |msg: &str| BrowseError::new(Status::InvalidParam, msg.to_string());

    match op {
        BinOp::Eq => Ok(Value::new(ValueKind::Boolean(lhs == rhs))),
        BinOp::Ne => Ok(Value::new(ValueKind::Boolean(lhs != rhs))),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let a = lhs.as_integer().ok_or_else(|| invalid("comparison requires integer operands"))?;
            let b = rhs.as_integer().ok_or_else(|| invalid("comparison requires integer operands"))?;
            let result = match op {
                BinOp::Lt => a < b,
                BinOp::Le => a <= b,
                BinOp::Gt => a > b,
                BinOp::Ge => a >= b,
                _ => unreachable!(),
            };
            Ok(Value::new(ValueKind::Boolean(result)))
        }
        BinOp::And | BinOp::Or => {
            let a = lhs.as_boolean().ok_or_else(|| invalid("`&&`/`||` require boolean operands"))?;
            let b = rhs.as_boolean().ok_or_else(|| invalid("`&&`/`||` require boolean operands"))?;
            let result = if op == BinOp::And { a && b } else { a || b };
            Ok(Value::new(ValueKind::Boolean(result)))
        }
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
            let a = lhs.as_integer().ok_or_else(|| invalid("arithmetic requires integer operands"))?;
            let b = rhs.as_integer().ok_or_else(|| invalid("arithmetic requires integer operands"))?;
            let result = match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Sub => a.checked_sub(b),
                BinOp::Mul => a.checked_mul(b),
                BinOp::Div => {
                    if b == 0 {
                        return Err(BrowseError::new(Status::DataError, "division by zero"));
                    }
                    a.checked_div(b)
                }
                _ => unreachable!(),
            };
            let result = result.ok_or_else(|| BrowseError::new(Status::DataError, "integer overflow"))?;
            Ok(Value::new(ValueKind::Integer(result)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::{self, StructBuilder};
    use crate::board::Board;
    use crate::data_source::DataSource;
    use crate::expr;
    use test_log::test;

    fn root_of(schema: crate::ast::FilterRef, bytes: &[u8]) -> (Arc<Container>, BrowseState) {
        let ds = DataSource::from_memory(bytes.to_vec());
        let root = Container::new_root(schema, ds);
        let state = BrowseState::new(Board::new());
        (root, state)
    }

    #[test]
    fn reads_field_value_by_name() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let (root, mut state) = root_of(schema, &[42]);
        let expr = expr::compile("a").unwrap();
        let value = evaluate_value(&expr, &root, &mut state).unwrap();
        assert_eq!(value.as_integer(), Some(42));
    }

    #[test]
    fn sizeof_reports_static_width() {
        let schema = StructBuilder::new().field("a", build::u32_be()).build();
        let (root, mut state) = root_of(schema, &[0, 0, 0, 7]);
        let expr = expr::compile("sizeof(a)").unwrap();
        let value = evaluate_value(&expr, &root, &mut state).unwrap();
        assert_eq!(value.as_integer(), Some(4));
    }

    #[test]
    fn comparison_against_literal() {
        let schema = StructBuilder::new().field("flag", build::u8_()).build();
        let (root, mut state) = root_of(schema, &[1]);
        let expr = expr::compile("flag == 1").unwrap();
        let value = evaluate_value(&expr, &root, &mut state).unwrap();
        assert_eq!(value.as_boolean(), Some(true));
    }

    #[test]
    fn missing_name_is_no_item() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let (root, mut state) = root_of(schema, &[1]);
        let expr = expr::compile("missing").unwrap();
        let err = evaluate_value(&expr, &root, &mut state).unwrap_err();
        assert_eq!(err.status, Status::NoItem);
    }

    #[test]
    fn transform_dpath_resolves_expr_onto_existing_dpath() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let (root, mut state) = root_of(schema, &[9]);
        let expr = expr::compile("a").unwrap();
        let mut dpath = Dpath::Container(root.clone());
        transform_dpath(&expr, &root, &mut dpath, &mut state).unwrap();
        assert_eq!(dpath.into_container().read_value(&mut state).unwrap().as_integer(), Some(9));
    }

    #[test]
    fn evaluate_filter_type_is_identity_over_a_static_filter() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let (root, _state) = root_of(schema.clone(), &[1]);
        let resolved = evaluate_filter_type(&schema, &root, FilterTypeKind::Item);
        assert!(Arc::ptr_eq(&resolved, &schema));
    }

    #[test]
    fn falls_back_to_board_bound_expression() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let board = Board::new();
        board.add_expr("other", "a").unwrap();
        let ds = DataSource::from_memory(vec![7]);
        let root = Container::new_root(schema, ds);
        let mut state = BrowseState::new(board);

        let expr = expr::compile("other").unwrap();
        let value = evaluate_value(&expr, &root, &mut state).unwrap();
        assert_eq!(value.as_integer(), Some(7));
    }
}
