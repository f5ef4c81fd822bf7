// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Compiled schema AST.
//!
//! A schema *text* compiler (lexer/parser producing these nodes) is an
//! external collaborator out of scope for this crate; schemas are built
//! programmatically by calling the constructors below, the same way a
//! compiler would hand a finished AST to the engine.

use crate::expr::Expr;
use crate::track_path::FieldFlags;
use std::sync::Arc;

/// A reference-counted handle to a compiled filter node.
pub type FilterRef = Arc<FilterNode>;

/// A schema AST node: the "type" of a region of binary data.
#[derive(Debug)]
pub struct FilterNode {
    /// What this filter does.
    pub kind: FilterKind,
}

impl FilterNode {
    /// Wraps a [`FilterKind`] into a shareable node.
    #[must_use]
    pub fn new(kind: FilterKind) -> FilterRef {
        Arc::new(Self { kind })
    }

    /// The filter's statically known minimum span size
    /// (`ast_min_span_size`), used to clamp `min_span` setters.
    #[must_use]
    pub fn static_min_span(&self) -> u64 {
        self.kind.static_min_span()
    }

    /// `true` if this filter produces no data of its own (a pure scope that
    /// only hosts fields).
    #[must_use]
    pub fn is_scope_only(&self) -> bool {
        matches!(self.kind, FilterKind::Struct(_))
    }
}

/// The concrete kind of a filter node.
#[derive(Debug)]
pub enum FilterKind {
    /// A named-field container.
    Struct(StructDef),
    /// A homogeneous array of a single item filter.
    Array(ArrayDef),
    /// A fixed-width integer.
    Integer(IntegerDef),
    /// A single-byte boolean (`0` = false, nonzero = true).
    Boolean,
    /// A fixed-length raw byte window.
    Bytes(BytesDef),
    /// A boundary-terminated string.
    StringBoundary(StringBoundaryDef),
    /// A filter chain (`a <> b <> c`): each stage's output becomes the next
    /// stage's input data source.
    Chain(Vec<FilterRef>),
    /// A base64 decode transform. Only meaningful as a non-first stage of a
    /// [`FilterKind::Chain`]; never used as a standalone field filter.
    Base64,
}

impl FilterKind {
    fn static_min_span(&self) -> u64 {
        match self {
            Self::Struct(_) => 0,
            Self::Array(a) => match a.length {
                ArrayLength::Fixed(0) => 0,
                ArrayLength::Fixed(_) | ArrayLength::FillsSlack => 0,
            },
            Self::Integer(i) => u64::from(i.width),
            Self::Boolean => 1,
            Self::Bytes(b) => b.len as u64,
            Self::StringBoundary(_) => 0,
            Self::Chain(stages) => stages.first().map_or(0, |s| s.static_min_span()),
            Self::Base64 => 0,
        }
    }
}

/// A field, named expression or attribute statement list (the body of a
/// [`FilterKind::Struct`]).
#[derive(Debug, Default)]
pub struct ScopeDef {
    /// `name := expr` statements, resolved before fields of the same name.
    pub named_exprs: Vec<NamedExprDef>,
    /// Field (storage item) statements, in declaration order.
    pub fields: Vec<Arc<FieldDef>>,
    /// `@name: expr` attribute statements.
    pub attributes: Vec<AttributeDef>,
}

/// A struct filter's definition: just a scope.
#[derive(Debug, Default)]
pub struct StructDef {
    /// The struct's statement lists.
    pub scope: ScopeDef,
}

/// One field statement.
#[derive(Debug)]
pub struct FieldDef {
    /// `None` for an anonymous field (its members are looked up as if
    /// declared in the enclosing scope).
    pub name: Option<String>,
    /// The field's filter.
    pub filter: FilterRef,
    /// `if <cond>` guard; `None` means always present.
    pub cond: Option<Arc<Expr>>,
    /// Header/trailer/hidden flags.
    pub flags: FieldFlags,
}

impl FieldDef {
    /// `true` if this is a nameless, non-hidden field whose members are
    /// looked up as if declared in the enclosing scope.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none() && !self.flags.contains(FieldFlags::HIDDEN)
    }
}

/// A `name := expr` statement.
#[derive(Debug)]
pub struct NamedExprDef {
    /// The bound name.
    pub name: String,
    /// The bound expression.
    pub expr: Arc<Expr>,
}

/// An `@name: expr` attribute statement.
#[derive(Debug)]
pub struct AttributeDef {
    /// The attribute name (without the leading `@`).
    pub name: String,
    /// The attribute's expression.
    pub expr: Arc<Expr>,
}

/// How many items an array filter admits.
#[derive(Debug, Clone)]
pub enum ArrayLength {
    /// A statically known item count.
    Fixed(usize),
    /// As many items as fit in the available slack.
    FillsSlack,
}

/// An array filter's definition.
#[derive(Debug)]
pub struct ArrayDef {
    /// The homogeneous item filter.
    pub item_filter: FilterRef,
    /// How many items the array admits.
    pub length: ArrayLength,
    /// If `Some`, the name of a field within `item_filter`'s scope used as
    /// the array's lookup key (enables `items['a'{1}]` syntax).
    pub key_field: Option<String>,
}

/// Byte order for [`IntegerDef`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Endianness {
    /// Most-significant byte first.
    Big,
    /// Least-significant byte first.
    Little,
}

/// A fixed-width integer filter's definition.
#[derive(Debug)]
pub struct IntegerDef {
    /// Width in bytes (1, 2, 4 or 8).
    pub width: u8,
    /// `true` for a two's-complement signed read.
    pub signed: bool,
    /// Byte order.
    pub endianness: Endianness,
}

/// A fixed-length raw byte window filter's definition.
#[derive(Debug)]
pub struct BytesDef {
    /// Length in bytes.
    pub len: usize,
}

/// A boundary-terminated string filter's definition.
#[derive(Debug)]
pub struct StringBoundaryDef {
    /// The terminating byte sequence (e.g. `b"\0"`).
    pub boundary: Vec<u8>,
}

/// Convenience constructors assembling common filter shapes, used by
/// callers building a schema AST by hand (and by this crate's own tests).
pub mod build {
    use super::{
        ArrayDef, ArrayLength, AttributeDef, BytesDef, Endianness, FieldDef, FilterKind, FilterNode,
        FilterRef, IntegerDef, NamedExprDef, ScopeDef, StringBoundaryDef, StructDef,
    };
    use crate::expr::Expr;
    use crate::track_path::FieldFlags;
    use std::sync::Arc;

    /// Builds a fixed-width integer filter.
    #[must_use]
    pub fn integer(width: u8, signed: bool, endianness: Endianness) -> FilterRef {
        FilterNode::new(FilterKind::Integer(IntegerDef {
            width,
            signed,
            endianness,
        }))
    }

    /// `u8`
    #[must_use]
    pub fn u8_() -> FilterRef {
        integer(1, false, Endianness::Big)
    }

    /// `u32`, big-endian.
    #[must_use]
    pub fn u32_be() -> FilterRef {
        integer(4, false, Endianness::Big)
    }

    /// `u32`, little-endian.
    #[must_use]
    pub fn u32_le() -> FilterRef {
        integer(4, false, Endianness::Little)
    }

    /// A single-byte boolean.
    #[must_use]
    pub fn boolean() -> FilterRef {
        FilterNode::new(FilterKind::Boolean)
    }

    /// A fixed-length raw byte window.
    #[must_use]
    pub fn bytes(len: usize) -> FilterRef {
        FilterNode::new(FilterKind::Bytes(BytesDef { len }))
    }

    /// A boundary-terminated string.
    #[must_use]
    pub fn string_boundary(boundary: impl Into<Vec<u8>>) -> FilterRef {
        FilterNode::new(FilterKind::StringBoundary(StringBoundaryDef {
            boundary: boundary.into(),
        }))
    }

    /// A fixed-length array of a homogeneous item filter.
    #[must_use]
    pub fn array_fixed(item_filter: FilterRef, count: usize) -> FilterRef {
        FilterNode::new(FilterKind::Array(ArrayDef {
            item_filter,
            length: ArrayLength::Fixed(count),
            key_field: None,
        }))
    }

    /// A fixed-length array of a homogeneous item filter, keyed by a named
    /// field within each item.
    #[must_use]
    pub fn array_fixed_keyed(item_filter: FilterRef, count: usize, key_field: &str) -> FilterRef {
        FilterNode::new(FilterKind::Array(ArrayDef {
            item_filter,
            length: ArrayLength::Fixed(count),
            key_field: Some(key_field.to_string()),
        }))
    }

    /// A filter chain: each stage's output feeds the next stage's input.
    #[must_use]
    pub fn chain(stages: Vec<FilterRef>) -> FilterRef {
        FilterNode::new(FilterKind::Chain(stages))
    }

    /// A base64 decode transform, for use as a non-first chain stage.
    #[must_use]
    pub fn base64() -> FilterRef {
        FilterNode::new(FilterKind::Base64)
    }

    /// A struct builder, for fluent assembly of field lists.
    #[derive(Default)]
    pub struct StructBuilder {
        scope: ScopeDef,
    }

    impl StructBuilder {
        /// Starts an empty struct.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Appends a named field with no condition.
        #[must_use]
        pub fn field(mut self, name: &str, filter: FilterRef) -> Self {
            self.scope.fields.push(Arc::new(FieldDef {
                name: Some(name.to_string()),
                filter,
                cond: None,
                flags: FieldFlags::empty(),
            }));
            self
        }

        /// Appends a named field guarded by `if cond`.
        #[must_use]
        pub fn field_if(mut self, name: &str, filter: FilterRef, cond: Expr) -> Self {
            self.scope.fields.push(Arc::new(FieldDef {
                name: Some(name.to_string()),
                filter,
                cond: Some(Arc::new(cond)),
                flags: FieldFlags::empty(),
            }));
            self
        }

        /// Appends an anonymous field whose members pass through to the
        /// enclosing scope.
        #[must_use]
        pub fn anonymous_field(mut self, filter: FilterRef) -> Self {
            self.scope.fields.push(Arc::new(FieldDef {
                name: None,
                filter,
                cond: None,
                flags: FieldFlags::empty(),
            }));
            self
        }

        /// Appends a `name := expr` named expression.
        #[must_use]
        pub fn named_expr(mut self, name: &str, expr: Expr) -> Self {
            self.scope.named_exprs.push(NamedExprDef {
                name: name.to_string(),
                expr: Arc::new(expr),
            });
            self
        }

        /// Appends an `@name: expr` attribute statement. `name` is given
        /// without its leading `@`.
        #[must_use]
        pub fn attribute(mut self, name: &str, expr: Expr) -> Self {
            self.scope.attributes.push(AttributeDef {
                name: name.to_string(),
                expr: Arc::new(expr),
            });
            self
        }

        /// Finishes the struct.
        #[must_use]
        pub fn build(self) -> FilterRef {
            FilterNode::new(FilterKind::Struct(StructDef { scope: self.scope }))
        }
    }
}
