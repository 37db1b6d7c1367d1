//! The status/error taxonomy shared across the whole crate.

use crate::caret::Caret;
use std::ops::Range;

/// The single status enumeration returned by every fallible operation in this crate.
///
/// Mirrors the taxonomy a streaming RDF toolkit needs: most operations only ever
/// produce a handful of these variants, but callers match on one type everywhere.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Status {
    /// An informational no-op: an empty pattern, a chunk boundary, an idempotent drop.
    #[error("no-op")]
    Failure,
    /// A caller-side contract violation (invalid literal, bad page size, null argument).
    #[error("bad argument: {0}")]
    BadArg(String),
    /// A structurally valid call made in the wrong state (e.g. dropping the default index).
    #[error("bad call: {0}")]
    BadCall(String),
    /// The allocator returned null; the object is left in its pre-call state.
    #[error("allocation failure")]
    BadAlloc,
    /// The byte source failed.
    #[error("read failure: {0}")]
    BadRead(String),
    /// The byte sink failed (e.g. a short write).
    #[error("write failure: {0}")]
    BadWrite(String),
    /// The parser's bounded working-memory budget was exceeded.
    #[error("parser stack budget exceeded")]
    BadStack,
    /// A cursor was used after the model it iterates mutated.
    #[error("cursor used after invalidation")]
    BadCursor,
    /// Malformed Turtle/N-Triples syntax.
    #[error("syntax error at {0:?}: {1}")]
    BadSyntax(Range<Caret>, String),
    /// Malformed literal lexical text for its declared datatype.
    #[error("bad literal text: {0}")]
    BadText(String),
    /// A literal specification violates the language/datatype exclusivity invariant.
    #[error("bad literal: {0}")]
    BadLiteral(String),
    /// An IRI failed to parse or resolve.
    #[error("bad IRI: {0}")]
    BadUri(String),
}

impl Status {
    /// `true` for [`Status::Failure`], the informational "nothing happened" case.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

/// `SUCCESS` is modeled as `Ok(())`; every other code is a [`Status`] variant.
pub type Result<T> = std::result::Result<T, Status>;
