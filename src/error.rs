// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Setup-time errors (schema/data-source/board construction) and the
//! per-operation browse error model of [`crate::browse_state::BrowseState`].

use crate::ast::FilterNode;
use crate::container::Container;
use crate::tracker::Tracker;
use std::fmt::{self, Write as _};
use std::sync::Arc;

/// Errors raised while acquiring schemas, data sources or boards, i.e.
/// before any navigation has started.
#[derive(Debug)]
pub enum Error {
    /// I/O error opening a file-backed resource.
    Io(std::io::Error),

    /// A named item or expression was already registered on a board.
    DuplicateName(String),

    /// An expression could not be compiled.
    InvalidExpr(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::DuplicateName(name) => write!(f, "name already bound on board: {name}"),
            Self::InvalidExpr(msg) => write!(f, "invalid expression: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Setup-time result.
pub type Result<T> = std::result::Result<T, Error>;

/// Status of a browse operation. `Ok` is never actually carried by a
/// [`BrowseError`] (it would mean "no error"); it exists so the enum mirrors
/// the full status space a caller can switch over.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Status {
    /// No error.
    Ok,
    /// Unspecified error.
    Error,
    /// A caller-supplied argument was invalid.
    InvalidParam,
    /// The tracker or box was not in a state that supports the requested
    /// operation.
    InvalidState,
    /// End of iteration, or a keyed/named lookup found nothing.
    NoItem,
    /// The box targeted by a container operation does not contain children.
    NotContainer,
    /// The schema or data is internally inconsistent (depth limit,
    /// invariant violation, unparsable filter chain output, ...).
    DataError,
    /// An offset violated the concentric bound ordering of a box.
    OutOfBounds,
    /// The filter class does not implement the requested vtable operation.
    NotImplemented,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Error => "error",
            Self::InvalidParam => "invalid parameter",
            Self::InvalidState => "invalid state",
            Self::NoItem => "no item",
            Self::NotContainer => "not a container",
            Self::DataError => "data error",
            Self::OutOfBounds => "out of bounds",
            Self::NotImplemented => "not implemented",
        };
        f.write_str(s)
    }
}

/// One of the six concentric offset bounds a box tracks per side. Kept here
/// (rather than in `offsets.rs`) so [`OutOfBoundsInfo`] doesn't need a
/// dependency cycle back into the offset-resolution module.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BoundKind {
    /// Bounds set by the parent container.
    Parent,
    /// Maximum space the parent is willing to allocate.
    Slack,
    /// Upper bound on the box's own span, derived from the filter.
    MaxSpan,
    /// Chosen span -- the logical size the filter claims.
    Span,
    /// Minimum span still valid per the filter's contract.
    MinSpan,
    /// Bytes actually consumed by data.
    Used,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parent => "parent",
            Self::Slack => "slack",
            Self::MaxSpan => "max_span",
            Self::Span => "span",
            Self::MinSpan => "min_span",
            Self::Used => "used",
        };
        f.write_str(s)
    }
}

/// Kind-specific payload attached to an `OutOfBounds` error.
#[derive(Copy, Clone, Debug)]
pub struct OutOfBoundsInfo {
    /// Which already-resolved bound rejected the request.
    pub registered_type: BoundKind,
    /// The offset that bound was registered at.
    pub registered_offset: u64,
    /// Which bound the caller was trying to set.
    pub requested_type: BoundKind,
    /// The offset that was requested.
    pub requested_offset: u64,
}

/// Kind-specific error payload.
#[derive(Clone, Debug)]
pub enum ErrorInfo {
    /// See [`OutOfBoundsInfo`].
    OutOfBounds(OutOfBoundsInfo),
}

/// A snapshot of the tracker or box a [`BrowseError`] (or one of its context
/// frames) was raised against. Trackers are duplicated rather than
/// referenced live, so raising an error never observably mutates the
/// tracker that triggered it.
#[derive(Clone)]
pub enum ErrorSubject {
    /// A duplicated tracker, frozen at the moment of the error.
    Tracker(Tracker),
    /// The container the error was raised against.
    Container(Arc<Container>),
}

/// One frame of context accumulated as a [`BrowseError`] unwinds through
/// nested operations ("when computing span size", "when evaluating
/// condition", ...).
#[derive(Clone)]
pub struct ContextFrame {
    /// The subject this frame concerns, if any.
    pub subject: Option<ErrorSubject>,
    /// The schema node this frame concerns, if any.
    pub node: Option<Arc<FilterNode>>,
    /// Human-readable description of what was happening.
    pub message: String,
}

/// The underlying container's identity, used to tell whether two frames'
/// subjects refer to the same box -- a `Tracker` subject is duplicated at
/// the moment an error is raised, so its own address is never stable, but
/// the box it tracks is the real identity a dedup check cares about.
fn subject_identity(subject: &ErrorSubject) -> usize {
    let container = match subject {
        ErrorSubject::Container(c) => c,
        ErrorSubject::Tracker(t) => t.container(),
    };
    Arc::as_ptr(container) as usize
}

/// Maximum number of context frames rendered by [`BrowseError::dump_full`].
/// Additional frames are still recorded but truncated at render time.
pub const N_CONTEXT: usize = 16;

/// A detailed, renderable browse-time error.
#[derive(Clone)]
pub struct BrowseError {
    /// The error kind.
    pub status: Status,
    /// Short formatted message for the innermost failure.
    pub message: String,
    /// The tracker or box the error concerns, if any.
    pub subject: Option<ErrorSubject>,
    /// The schema node where the error was raised, if any.
    pub node: Option<Arc<FilterNode>>,
    /// Kind-specific extra info.
    pub info: Option<ErrorInfo>,
    /// Context frames, most-specific first.
    pub context: Vec<ContextFrame>,
}

impl BrowseError {
    /// Creates a new error with no context yet attached.
    #[must_use]
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            subject: None,
            node: None,
            info: None,
            context: Vec::new(),
        }
    }

    /// Builder: attach a subject snapshot.
    #[must_use]
    pub fn with_subject(mut self, subject: ErrorSubject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Builder: attach the schema node the error concerns.
    #[must_use]
    pub fn with_node(mut self, node: Arc<FilterNode>) -> Self {
        self.node = Some(node);
        self
    }

    /// Builder: attach kind-specific info.
    #[must_use]
    pub fn with_info(mut self, info: ErrorInfo) -> Self {
        self.info = Some(info);
        self
    }

    /// Convenience constructor for the most common runtime failure: a
    /// concentric-offset bound violation.
    #[must_use]
    pub fn out_of_bounds(message: impl Into<String>, info: OutOfBoundsInfo) -> Self {
        Self::new(Status::OutOfBounds, message).with_info(ErrorInfo::OutOfBounds(info))
    }

    /// Appends one context frame as the error unwinds through a layer.
    /// Frames are pushed most-specific-first, i.e. each caller pushes
    /// *after* a callee has already pushed its own frame.
    pub fn push_context(&mut self, frame: ContextFrame) {
        self.context.push(frame);
    }

    /// Renders the full error: the innermost message, then up to
    /// [`N_CONTEXT`] parent frames, deduplicating consecutive frames that
    /// share the same subject/node (only the message differs) with a
    /// `^^^` marker.
    ///
    /// # Errors
    ///
    /// Propagates any formatting error from `out`.
    pub fn dump_full(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(out, "{}: {}", self.status, self.message)?;

        let mut last_key: Option<(Option<usize>, usize)> = None;
        for frame in self.context.iter().take(N_CONTEXT) {
            let key = (
                frame.subject.as_ref().map(subject_identity),
                frame.node.as_ref().map_or(0, |n| Arc::as_ptr(n) as usize),
            );
            if Some(key) == last_key {
                writeln!(out, "  ^^^ {}", frame.message)?;
            } else {
                writeln!(out, "  when {}", frame.message)?;
            }
            last_key = Some(key);
        }

        if self.context.len() > N_CONTEXT {
            writeln!(out, "  ... {} more frames elided", self.context.len() - N_CONTEXT)?;
        }

        Ok(())
    }

    /// Same as [`Self::dump_full`] but returns an owned `String`.
    #[must_use]
    pub fn dump_to_string(&self) -> String {
        let mut s = String::new();
        // A `String`'s `Write` impl cannot fail.
        let _ = self.dump_full(&mut s);
        s
    }
}

impl fmt::Debug for BrowseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowseError")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("context_frames", &self.context.len())
            .finish()
    }
}

impl fmt::Display for BrowseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = String::new();
        self.dump_full(&mut s).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

impl std::error::Error for BrowseError {}

/// Result alias used throughout the navigation engine.
pub type BResult<T> = std::result::Result<T, BrowseError>;

/// Shorthand for constructing a `NotImplemented` error from within a
/// [`crate::filter::vtable::FilterOps`] default method.
#[must_use]
pub fn not_implemented(op: &str) -> BrowseError {
    BrowseError::new(Status::NotImplemented, format!("operation `{op}` is not implemented by this filter class"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::{self, StructBuilder};
    use crate::data_source::DataSource;
    use test_log::test;

    #[test]
    fn dump_full_dedups_consecutive_frames_sharing_a_subject() {
        let schema = StructBuilder::new().field("a", build::u8_()).build();
        let ds = DataSource::from_memory(vec![1]);
        let root = Container::new_root(schema, ds);

        let mut err = BrowseError::new(Status::DataError, "broke");
        err.push_context(ContextFrame {
            subject: Some(ErrorSubject::Container(root.clone())),
            node: None,
            message: "first".to_string(),
        });
        err.push_context(ContextFrame {
            subject: Some(ErrorSubject::Container(root.clone())),
            node: None,
            message: "second".to_string(),
        });

        let rendered = err.dump_to_string();
        assert!(rendered.contains("when first"), "{rendered}");
        assert!(rendered.contains("^^^ second"), "{rendered}");
    }

    #[test]
    fn dump_full_does_not_dedup_different_subjects() {
        let schema_a = StructBuilder::new().field("a", build::u8_()).build();
        let schema_b = StructBuilder::new().field("b", build::u8_()).build();
        let root_a = Container::new_root(schema_a, DataSource::from_memory(vec![1]));
        let root_b = Container::new_root(schema_b, DataSource::from_memory(vec![2]));

        let mut err = BrowseError::new(Status::DataError, "broke");
        err.push_context(ContextFrame {
            subject: Some(ErrorSubject::Container(root_a)),
            node: None,
            message: "first".to_string(),
        });
        err.push_context(ContextFrame {
            subject: Some(ErrorSubject::Container(root_b)),
            node: None,
            message: "second".to_string(),
        });

        let rendered = err.dump_to_string();
        assert!(rendered.contains("when first"), "{rendered}");
        assert!(rendered.contains("when second"), "{rendered}");
        assert!(!rendered.contains("^^^"), "{rendered}");
    }
}
