//! Source positions attached to statements and syntax errors.

use std::fmt;
use std::rc::Rc;

/// A document node plus a 1-based (line, column) position.
///
/// Grounded on `oxttl::toolkit::error::TextPosition`, but 1-based per this crate's
/// contract (`Caret`'s invariant is `(line, column) >= (1, 0)`) rather than 0-based,
/// and carrying the document identifier inline instead of leaving it to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Caret {
    /// The document this position is within, e.g. a file name or URL.
    pub document: Rc<str>,
    /// 1-based line number.
    pub line: u64,
    /// 1-based column number, counted in Unicode scalar values.
    pub column: u64,
}

impl Caret {
    #[must_use]
    pub fn new(document: impl Into<Rc<str>>, line: u64, column: u64) -> Self {
        Self {
            document: document.into(),
            line,
            column,
        }
    }

    #[must_use]
    pub fn start_of(document: impl Into<Rc<str>>) -> Self {
        Self::new(document, 1, 0)
    }
}

impl fmt::Display for Caret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.document, self.line, self.column)
    }
}
