//! A canonicalizing sink: rewrites numeric/boolean literal objects to their
//! canonical XSD lexical form before forwarding to an inner [`Sink`].
//!
//! Statements built through [`crate::node::NodeSpec::TypedLiteral`] (rather
//! than the dedicated numeric `NodeSpec` variants, or a reader, both of which
//! already canonicalize at construction) can carry a numeric datatype with a
//! non-canonical lexical form, e.g. `"007"^^xsd:integer`. This sink exists to
//! normalize that input on the way out.

use crate::alloc::Allocator;
use crate::error::{Result, Status};
use crate::node::{xsd_iri, Literal, NumericForm, Term};
use crate::sink::{Sink, Statement, StatementFlags};
use crate::xsd;

/// Wraps an inner sink, canonicalizing any numeric/boolean literal object
/// before forwarding. Subjects, predicates, and graphs are never literals in
/// valid RDF and pass through untouched.
pub struct CanonSink<'a> {
    inner: &'a mut dyn Sink,
}

impl<'a> CanonSink<'a> {
    /// Builds a canonicalizing sink over `inner`. Reserves through `allocator`
    /// up front so a fault-injecting allocator can fail construction itself
    /// rather than only a later statement.
    pub fn new(inner: &'a mut dyn Sink, allocator: &mut dyn Allocator) -> Result<Self> {
        allocator.reserve(1)?;
        Ok(Self { inner })
    }
}

impl<'a> Sink for CanonSink<'a> {
    fn base(&mut self, iri: &Term) -> Result<()> {
        self.inner.base(iri)
    }

    fn prefix(&mut self, label: &str, namespace: &str) -> Result<()> {
        self.inner.prefix(label, namespace)
    }

    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<()> {
        let Term::Literal(lit) = &statement.object else {
            return self.inner.statement(flags, statement);
        };
        let canonical = canonicalize_literal(lit)?;
        if canonical == *lit {
            return self.inner.statement(flags, statement);
        }
        let mut rewritten = statement.clone();
        rewritten.object = Term::Literal(canonical);
        self.inner.statement(flags, &rewritten)
    }

    fn end(&mut self, node: &Term) -> Result<()> {
        self.inner.end(node)
    }
}

fn canonicalize_literal(lit: &Literal) -> Result<Literal> {
    match lit.numeric_form() {
        Some(NumericForm::Integer) => Literal::new_typed(xsd::canonical_integer(lit.value())?, xsd_iri::INTEGER),
        Some(NumericForm::Decimal) => Literal::new_typed(xsd::canonical_decimal(lit.value())?, xsd_iri::DECIMAL),
        Some(NumericForm::Boolean) => {
            Literal::new_typed(xsd::canonical_boolean(xsd::parse_boolean(lit.value())?), xsd_iri::BOOLEAN)
        }
        Some(NumericForm::Double) if lit.datatype() == xsd_iri::FLOAT => {
            let value: f32 = lit
                .value()
                .parse()
                .map_err(|_| Status::BadText(format!("invalid xsd:float lexical form {:?}", lit.value())))?;
            Literal::new_typed(xsd::canonical_float(value), xsd_iri::FLOAT)
        }
        Some(NumericForm::Double) => {
            let value: f64 = lit
                .value()
                .parse()
                .map_err(|_| Status::BadText(format!("invalid xsd:double lexical form {:?}", lit.value())))?;
            Literal::new_typed(xsd::canonical_double(value), xsd_iri::DOUBLE)
        }
        None => Ok(lit.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::{FaultingAllocator, SystemAllocator};

    struct CollectingSink(Vec<Statement>);

    impl Sink for CollectingSink {
        fn statement(&mut self, _flags: StatementFlags, statement: &Statement) -> Result<()> {
            self.0.push(statement.clone());
            Ok(())
        }
    }

    #[test]
    fn non_canonical_integer_literal_is_rewritten() {
        let mut out = CollectingSink(Vec::new());
        let mut allocator = SystemAllocator;
        let mut canon = CanonSink::new(&mut out, &mut allocator).unwrap();
        let statement = Statement::new(
            Term::Iri("http://example.org/s".into()),
            Term::Iri("http://example.org/p".into()),
            Term::Literal(Literal::new_typed("007", xsd_iri::INTEGER).unwrap()),
            None,
        );
        canon.statement(StatementFlags::none(), &statement).unwrap();
        let object = out.0[0].object.as_literal().unwrap();
        assert_eq!(object.value(), "7");
    }

    #[test]
    fn non_numeric_literal_passes_through_unchanged() {
        let mut out = CollectingSink(Vec::new());
        let mut allocator = SystemAllocator;
        let mut canon = CanonSink::new(&mut out, &mut allocator).unwrap();
        let statement = Statement::new(
            Term::Iri("http://example.org/s".into()),
            Term::Iri("http://example.org/p".into()),
            Term::Literal(Literal::new_simple("hello")),
            None,
        );
        canon.statement(StatementFlags::none(), &statement).unwrap();
        assert_eq!(out.0[0], statement);
    }

    #[test]
    fn fault_injected_allocator_fails_canon_sink_construction() {
        let mut out = CollectingSink(Vec::new());
        let mut allocator = FaultingAllocator::new(Some(0));
        let result = CanonSink::new(&mut out, &mut allocator);
        assert_eq!(result.err(), Some(Status::BadAlloc));
    }
}
