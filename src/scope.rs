// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Name resolution against a struct box's statement list: named
//! expressions, attributes, and fields -- including anonymous-field
//! pass-through, where an unnamed field's own members are looked up as if
//! declared directly in the enclosing scope.

use crate::ast::{FieldDef, FilterKind, StructDef};
use crate::browse_state::BrowseState;
use crate::container::Container;
use crate::error::{BResult, BoundKind, BrowseError, ContextFrame, ErrorSubject, Status};
use crate::expr::Expr;
use crate::track_path::FieldFlags;
use std::sync::Arc;

/// What a name resolved to.
pub enum Resolved {
    /// A `name := expr` statement.
    NamedExpr(Arc<Expr>),
    /// An `@name: expr` attribute statement.
    Attribute(Arc<Expr>),
    /// A field, already materialized as a child box.
    Field(Arc<Container>),
}

fn struct_def(scope: &Arc<Container>) -> BResult<&StructDef> {
    match &scope.filter.kind {
        FilterKind::Struct(def) => Ok(def),
        _ => Err(BrowseError::new(Status::NotContainer, "box is not a struct scope")),
    }
}

/// Materializes every field of `scope` whose `if` guard (if any) currently
/// evaluates true, paired with its child box, in declaration order.
///
/// Starts the cursor at `scope`'s own slack start (not its span start) so
/// this can be called from within `scope`'s own `compute_span_size`
/// without recursing into it. Memoized on `scope` itself: the underlying
/// data never changes, so repeated calls (from `lookup_statement`,
/// `iter_fields`, `struct_span`) reuse the first materialization instead of
/// re-walking every field from scratch.
pub(crate) fn present_fields(
    scope: &Arc<Container>,
    state: &mut BrowseState,
) -> BResult<Vec<(Arc<FieldDef>, Arc<Container>)>> {
    if let Some(cached) = scope.cached_fields() {
        return Ok(cached);
    }

    let def = struct_def(scope)?;
    let mut cursor = scope.offsets_start(BoundKind::Slack).unwrap_or(0);
    let mut out = Vec::with_capacity(def.scope.fields.len());

    for field in &def.scope.fields {
        if let Some(cond) = &field.cond {
            let value = crate::eval::evaluate_value(cond, scope, state)?;
            if !value.as_boolean().unwrap_or(false) {
                continue;
            }
        }

        let field_name = field.name.as_deref().unwrap_or("<anonymous>");
        let attach_frame = |mut err: BrowseError| {
            err.push_context(ContextFrame {
                subject: Some(ErrorSubject::Container(scope.clone())),
                node: Some(field.filter.clone()),
                message: format!("computing item size for field `{field_name}`"),
            });
            err
        };
        let child = scope.new_field_child(field, cursor).map_err(attach_frame)?;
        let (_, end) = child.byte_range(state).map_err(attach_frame)?;
        if field.flags.is_empty() {
            cursor = end;
        }
        out.push((field.clone(), child));
    }

    scope.set_cached_fields(out.clone());
    Ok(out)
}

/// The total span a struct box occupies: the end of the furthest-reaching
/// left-aligned present field, relative to `scope`'s own slack start.
/// `HEADER`/`TRAILER` fields are anchored to the parent's end boundary and
/// never grow this cursor.
///
/// # Errors
///
/// Propagates [`present_fields`]'s error.
pub(crate) fn struct_span(scope: &Arc<Container>, state: &mut BrowseState) -> BResult<u64> {
    let slack_start = scope.offsets_start(BoundKind::Slack).unwrap_or(0);
    let slack_end = scope.offsets_end(BoundKind::Slack).unwrap_or(slack_start);
    let mut end = slack_start;
    let fields = present_fields(scope, state).map_err(|mut err| {
        err.push_context(ContextFrame {
            subject: Some(ErrorSubject::Container(scope.clone())),
            node: None,
            message: format!("box parent space is [{slack_start}..{slack_end}]"),
        });
        err
    })?;
    for (field, child) in fields {
        if field.flags.is_empty() {
            let (_, child_end) = child.byte_range(state)?;
            end = end.max(child_end);
        }
    }
    Ok(end - slack_start)
}

/// Resolves `name` against `scope`, trying its statement lists in priority
/// order -- named expressions, then fields, then attributes -- before
/// descending into any anonymous field's own scope.
///
/// An attribute is only ever matched by an `@`-prefixed `name` (stripped of
/// the `@` for the comparison); a plain name never resolves to an attribute,
/// and conversely attributes do not cross anonymous-field boundaries -- an
/// `@`-prefixed lookup never recurses into an anonymous child.
///
/// # Errors
///
/// Propagates errors from field-guard evaluation or child box construction.
pub fn lookup_statement(
    scope: &Arc<Container>,
    name: &str,
    state: &mut BrowseState,
) -> BResult<Option<Resolved>> {
    let def = struct_def(scope)?;

    if let Some(named_expr) = def.scope.named_exprs.iter().find(|n| n.name == name) {
        return Ok(Some(Resolved::NamedExpr(named_expr.expr.clone())));
    }

    let fields = present_fields(scope, state)?;
    for (field, child) in &fields {
        if field.name.as_deref() == Some(name) {
            return Ok(Some(Resolved::Field(child.clone())));
        }
    }

    if let Some(attr_name) = name.strip_prefix('@') {
        if let Some(attr) = def.scope.attributes.iter().find(|a| a.name == attr_name) {
            return Ok(Some(Resolved::Attribute(attr.expr.clone())));
        }
        return Ok(None);
    }

    for (field, child) in &fields {
        if field.is_anonymous() {
            if let Some(found) = lookup_statement(child, name, state)? {
                return Ok(Some(found));
            }
        }
    }

    Ok(None)
}

/// Lists `scope`'s fields in iteration order: present, non-`HIDDEN` fields,
/// with anonymous fields flattened into their own present, non-hidden
/// children.
///
/// # Errors
///
/// Propagates errors from field-guard evaluation or child box construction.
pub fn iter_fields(scope: &Arc<Container>, state: &mut BrowseState) -> BResult<Vec<Arc<Container>>> {
    let mut out = Vec::new();
    for (field, child) in present_fields(scope, state)? {
        if field.flags.contains(FieldFlags::HIDDEN) {
            continue;
        }
        if field.is_anonymous() {
            out.extend(iter_fields(&child, state)?);
        } else {
            out.push(child);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::{self, StructBuilder};
    use crate::board::Board;
    use crate::container::Container;
    use crate::data_source::DataSource;
    use test_log::test;

    fn scope_of(schema: crate::ast::FilterRef, bytes: &[u8]) -> (Arc<Container>, BrowseState) {
        let ds = DataSource::from_memory(bytes.to_vec());
        let root = Container::new_root(schema, ds);
        let state = BrowseState::new(Board::new());
        (root, state)
    }

    #[test]
    fn anonymous_field_members_pass_through() {
        let inner = StructBuilder::new().field("b", build::u8_()).build();
        let schema = StructBuilder::new()
            .field("a", build::u8_())
            .anonymous_field(inner)
            .build();
        let (root, mut state) = scope_of(schema, &[1, 2]);

        let found = lookup_statement(&root, "b", &mut state).unwrap();
        assert!(matches!(found, Some(Resolved::Field(_))));
    }

    #[test]
    fn attribute_resolved_by_at_prefixed_name() {
        let schema = StructBuilder::new()
            .attribute("endian", crate::expr::compile("1").unwrap())
            .field("a", build::u8_())
            .build();
        let (root, mut state) = scope_of(schema, &[1]);

        let found = lookup_statement(&root, "@endian", &mut state).unwrap();
        assert!(matches!(found, Some(Resolved::Attribute(_))));
        assert!(lookup_statement(&root, "endian", &mut state).unwrap().is_none());
    }

    #[test]
    fn attribute_lookup_does_not_cross_anonymous_boundary() {
        let inner = StructBuilder::new()
            .attribute("endian", crate::expr::compile("1").unwrap())
            .field("b", build::u8_())
            .build();
        let schema = StructBuilder::new().anonymous_field(inner).build();
        let (root, mut state) = scope_of(schema, &[2]);

        assert!(lookup_statement(&root, "@endian", &mut state).unwrap().is_none());
        assert!(matches!(
            lookup_statement(&root, "b", &mut state).unwrap(),
            Some(Resolved::Field(_))
        ));
    }

    #[test]
    fn iterates_present_fields_in_order() {
        let schema = StructBuilder::new()
            .field("a", build::u8_())
            .field("b", build::u8_())
            .build();
        let (root, mut state) = scope_of(schema, &[9, 10]);
        let fields = iter_fields(&root, &mut state).unwrap();
        assert_eq!(fields.len(), 2);
    }
}
