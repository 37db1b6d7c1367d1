//! The RDF term model: IRIs, blank nodes, and literals.
//!
//! Grounded on `oxrdf::{NamedNode, BlankNode, Literal}`, collapsed into a single
//! [`Term`] enum rather than oxrdf's family of owned/borrowed/ref types, because
//! every term in this crate ultimately lives behind a [`crate::nodes::NodeId`]
//! handle — there is no separate borrowed-term API to keep in sync.

use crate::error::{Result, Status};
use crate::xsd;
use rand::random;
use std::fmt;
use std::rc::Rc;

/// Which of the three RDF term kinds a [`Term`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Iri,
    Blank,
    Literal,
}

/// The lexical hint a literal carries for Turtle abbreviation: whether its value,
/// combined with its datatype, can be written as a bare numeric/boolean token
/// instead of a quoted, `^^`-suffixed literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericForm {
    Integer,
    Decimal,
    Double,
    Boolean,
}

/// Either a language tag or a datatype IRI, never both (see [`Literal`]'s invariant).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LiteralSuffix {
    Plain,
    Language(Rc<str>),
    Datatype(Rc<str>),
}

/// An RDF literal: a lexical value plus an optional language tag or datatype.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal {
    value: Rc<str>,
    suffix: LiteralSuffix,
    numeric_form: Option<NumericForm>,
}

pub mod xsd_iri {
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const FLOAT: &str = "http://www.w3.org/2001/XMLSchema#float";
    pub const BASE64_BINARY: &str = "http://www.w3.org/2001/XMLSchema#base64Binary";
    pub const HEX_BINARY: &str = "http://www.w3.org/2001/XMLSchema#hexBinary";
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

pub mod rdf_iri {
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
}

impl Literal {
    #[must_use]
    pub fn new_simple(value: impl Into<Rc<str>>) -> Self {
        Self {
            value: value.into(),
            suffix: LiteralSuffix::Plain,
            numeric_form: None,
        }
    }

    pub fn new_language_tagged(value: impl Into<Rc<str>>, language: impl Into<Rc<str>>) -> Result<Self> {
        let language = language.into();
        if language.is_empty() {
            return Err(Status::BadLiteral("empty language tag".to_owned()));
        }
        Ok(Self {
            value: value.into(),
            suffix: LiteralSuffix::Language(language),
            numeric_form: None,
        })
    }

    pub fn new_typed(value: impl Into<Rc<str>>, datatype: impl Into<Rc<str>>) -> Result<Self> {
        let datatype = datatype.into();
        if datatype.is_empty() {
            return Err(Status::BadLiteral("empty datatype IRI".to_owned()));
        }
        let numeric_form = match &*datatype {
            xsd_iri::INTEGER => Some(NumericForm::Integer),
            xsd_iri::DECIMAL => Some(NumericForm::Decimal),
            xsd_iri::DOUBLE | xsd_iri::FLOAT => Some(NumericForm::Double),
            xsd_iri::BOOLEAN => Some(NumericForm::Boolean),
            _ => None,
        };
        if &*datatype == xsd_iri::STRING {
            return Ok(Self::new_simple(value));
        }
        Ok(Self {
            value: value.into(),
            suffix: LiteralSuffix::Datatype(datatype),
            numeric_form,
        })
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        match &self.suffix {
            LiteralSuffix::Language(lang) => Some(lang),
            _ => None,
        }
    }

    #[must_use]
    pub fn datatype(&self) -> &str {
        match &self.suffix {
            LiteralSuffix::Datatype(dt) => dt,
            LiteralSuffix::Language(_) => xsd_iri::LANG_STRING,
            LiteralSuffix::Plain => xsd_iri::STRING,
        }
    }

    #[must_use]
    pub fn is_plain(&self) -> bool {
        matches!(self.suffix, LiteralSuffix::Plain)
    }

    /// The numeric/boolean lexical-form hint, if any, used by the Turtle writer
    /// to decide whether this literal may be abbreviated as a bare token.
    #[must_use]
    pub fn numeric_form(&self) -> Option<NumericForm> {
        self.numeric_form
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", escape_string(&self.value))?;
        match &self.suffix {
            LiteralSuffix::Plain => Ok(()),
            LiteralSuffix::Language(lang) => write!(f, "@{lang}"),
            LiteralSuffix::Datatype(dt) => write!(f, "^^<{dt}>"),
        }
    }
}

pub(crate) fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// An RDF term: an IRI, a blank node, or a literal.
///
/// Two terms compare equal iff their (kind, string, datatype-or-language)
/// tuples match, which falls directly out of deriving `PartialEq`: that's
/// exactly what `Literal`'s field-wise `PartialEq` already gives us.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(Rc<str>),
    Blank(Rc<str>),
    Literal(Literal),
}

impl Term {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Iri(_) => NodeKind::Iri,
            Self::Blank(_) => NodeKind::Blank,
            Self::Literal(_) => NodeKind::Literal,
        }
    }

    #[must_use]
    pub fn is_named_or_blank(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }

    #[must_use]
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blank(&self) -> Option<&str> {
        match self {
            Self::Blank(id) => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    /// A fresh, never-before-used blank node identifier, the way
    /// `oxrdf::BlankNode::default()` mints a random 128-bit id rather than an
    /// incrementing counter (so it stays collision-free across documents).
    #[must_use]
    pub fn fresh_blank() -> Self {
        let id: u128 = random();
        Self::Blank(format!("g{id:032x}").into())
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "<{iri}>"),
            Self::Blank(id) => write!(f, "_:{id}"),
            Self::Literal(lit) => lit.fmt(f),
        }
    }
}

/// The caller-facing specification for [`crate::nodes::Nodes::intern`]: every way
/// a new term value can be built, including the numeric/binary convenience forms
/// that get canonicalized at intern time.
#[derive(Debug, Clone)]
pub enum NodeSpec {
    Blank(Rc<str>),
    Iri(Rc<str>),
    SimpleLiteral(Rc<str>),
    LanguageLiteral(Rc<str>, Rc<str>),
    TypedLiteral(Rc<str>, Rc<str>),
    Integer(i128),
    Decimal(Rc<str>),
    Double(f64),
    Float(f32),
    Boolean(bool),
    Base64Binary(Vec<u8>),
    HexBinary(Vec<u8>),
}

impl NodeSpec {
    /// Turns this spec into the [`Term`] it denotes, applying numeric
    /// canonicalization (§6) for the primitive variants.
    pub(crate) fn into_term(self) -> Result<Term> {
        Ok(match self {
            Self::Blank(id) => Term::Blank(id),
            Self::Iri(iri) => Term::Iri(iri),
            Self::SimpleLiteral(value) => Term::Literal(Literal::new_simple(value)),
            Self::LanguageLiteral(value, lang) => {
                Term::Literal(Literal::new_language_tagged(value, lang)?)
            }
            Self::TypedLiteral(value, datatype) => {
                Term::Literal(Literal::new_typed(value, datatype)?)
            }
            Self::Integer(n) => Term::Literal(Literal::new_typed(
                xsd::canonical_integer(&n.to_string())?,
                xsd_iri::INTEGER,
            )?),
            Self::Decimal(text) => Term::Literal(Literal::new_typed(
                xsd::canonical_decimal(&text)?,
                xsd_iri::DECIMAL,
            )?),
            Self::Double(value) => Term::Literal(Literal::new_typed(
                xsd::canonical_double(value),
                xsd_iri::DOUBLE,
            )?),
            Self::Float(value) => Term::Literal(Literal::new_typed(
                xsd::canonical_float(value),
                xsd_iri::FLOAT,
            )?),
            Self::Boolean(value) => Term::Literal(Literal::new_typed(
                xsd::canonical_boolean(value),
                xsd_iri::BOOLEAN,
            )?),
            Self::Base64Binary(bytes) => Term::Literal(Literal::new_typed(
                xsd::canonical_base64(&bytes),
                xsd_iri::BASE64_BINARY,
            )?),
            Self::HexBinary(bytes) => Term::Literal(Literal::new_typed(
                xsd::canonical_hex(&bytes),
                xsd_iri::HEX_BINARY,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_rejects_empty_language_and_datatype() {
        assert!(Literal::new_language_tagged("x", "").is_err());
        assert!(Literal::new_typed("x", "").is_err());
    }

    #[test]
    fn typed_string_literal_collapses_to_plain() {
        let lit = Literal::new_typed("hi", xsd_iri::STRING).unwrap();
        assert!(lit.is_plain());
    }

    #[test]
    fn display_matches_ntriples_forms() {
        assert_eq!(Term::Iri("http://example.org/s".into()).to_string(), "<http://example.org/s>");
        assert_eq!(Term::Blank("b0".into()).to_string(), "_:b0");
        assert_eq!(
            Term::Literal(Literal::new_simple("foo")).to_string(),
            "\"foo\""
        );
        assert_eq!(
            Term::Literal(Literal::new_language_tagged("foo", "en").unwrap()).to_string(),
            "\"foo\"@en"
        );
    }

    #[test]
    fn numeric_spec_canonicalizes_at_construction() {
        let term = NodeSpec::Integer(7).into_term().unwrap();
        let lit = term.as_literal().unwrap();
        assert_eq!(lit.value(), "7");
        assert_eq!(lit.numeric_form(), Some(NumericForm::Integer));
    }
}
