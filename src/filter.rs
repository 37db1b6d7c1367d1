//! A filtering sink: forwards only statements matching a supplied
//! `(S, P, O, G)` pattern. A slot left unset matches anything, the same
//! wildcard-by-omission convention [`crate::model::Model`] uses for its own
//! pattern queries.

use crate::error::Result;
use crate::node::Term;
use crate::sink::{Sink, Statement, StatementFlags};

/// Wraps an inner sink, forwarding only statements whose subject, predicate,
/// object, and graph each match a bound slot (an unbound slot always matches).
/// `@base`/`@prefix` directives and `End` events always pass through unfiltered.
pub struct FilterSink<'a> {
    inner: &'a mut dyn Sink,
    subject: Option<Term>,
    predicate: Option<Term>,
    object: Option<Term>,
    graph: Option<Term>,
}

impl<'a> FilterSink<'a> {
    #[must_use]
    pub fn new(inner: &'a mut dyn Sink) -> Self {
        Self {
            inner,
            subject: None,
            predicate: None,
            object: None,
            graph: None,
        }
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Term) -> Self {
        self.subject = Some(subject);
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: Term) -> Self {
        self.predicate = Some(predicate);
        self
    }

    #[must_use]
    pub fn with_object(mut self, object: Term) -> Self {
        self.object = Some(object);
        self
    }

    #[must_use]
    pub fn with_graph(mut self, graph: Term) -> Self {
        self.graph = Some(graph);
        self
    }

    fn matches(&self, statement: &Statement) -> bool {
        self.subject.as_ref().map_or(true, |t| *t == statement.subject)
            && self.predicate.as_ref().map_or(true, |t| *t == statement.predicate)
            && self.object.as_ref().map_or(true, |t| *t == statement.object)
            && self.graph.as_ref().map_or(true, |t| Some(t) == statement.graph.as_ref())
    }
}

impl<'a> Sink for FilterSink<'a> {
    fn base(&mut self, iri: &Term) -> Result<()> {
        self.inner.base(iri)
    }

    fn prefix(&mut self, label: &str, namespace: &str) -> Result<()> {
        self.inner.prefix(label, namespace)
    }

    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<()> {
        if self.matches(statement) {
            self.inner.statement(flags, statement)
        } else {
            Ok(())
        }
    }

    fn end(&mut self, node: &Term) -> Result<()> {
        self.inner.end(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CollectingSink(Vec<Statement>);

    impl Sink for CollectingSink {
        fn statement(&mut self, _flags: StatementFlags, statement: &Statement) -> Result<()> {
            self.0.push(statement.clone());
            Ok(())
        }
    }

    fn iri(value: &str) -> Term {
        Term::Iri(value.into())
    }

    #[test]
    fn unbound_slots_match_anything() {
        let mut out = CollectingSink(Vec::new());
        let mut filter = FilterSink::new(&mut out).with_predicate(iri("http://example.org/p"));
        filter
            .statement(
                StatementFlags::none(),
                &Statement::new(iri("http://example.org/s1"), iri("http://example.org/p"), iri("http://example.org/o1"), None),
            )
            .unwrap();
        filter
            .statement(
                StatementFlags::none(),
                &Statement::new(iri("http://example.org/s2"), iri("http://example.org/other"), iri("http://example.org/o2"), None),
            )
            .unwrap();
        assert_eq!(out.0.len(), 1);
        assert_eq!(out.0[0].subject, iri("http://example.org/s1"));
    }

    #[test]
    fn unbound_graph_slot_matches_default_and_named_graphs() {
        let mut out = CollectingSink(Vec::new());
        let mut filter = FilterSink::new(&mut out).with_subject(iri("http://example.org/s"));
        filter
            .statement(
                StatementFlags::none(),
                &Statement::new(
                    iri("http://example.org/s"),
                    iri("http://example.org/p"),
                    iri("http://example.org/o"),
                    Some(iri("http://example.org/g")),
                ),
            )
            .unwrap();
        assert_eq!(out.0.len(), 1);
    }

    #[test]
    fn bound_graph_slot_rejects_mismatched_graph() {
        let mut out = CollectingSink(Vec::new());
        let mut filter = FilterSink::new(&mut out).with_graph(iri("http://example.org/g"));
        filter
            .statement(
                StatementFlags::none(),
                &Statement::new(iri("http://example.org/s"), iri("http://example.org/p"), iri("http://example.org/o"), None),
            )
            .unwrap();
        assert!(out.0.is_empty());
    }
}
