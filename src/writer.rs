//! A structured writer: consumes [`Sink`] events and emits Turtle or
//! N-Triples text, reconstructing Turtle's `;`/`,`/`[...]`/`(...)` sugar.
//!
//! The flat-statement path with `;`/`,` subject-predicate continuation is
//! grounded on `oxttl::trig::LowLevelTriGSerializer::write_quad`'s
//! `current_subject_predicate` state (this crate has no named graphs to track
//! alongside it, so a single current-subject/current-predicate pair
//! suffices). `[...]`/`(...)` reconstruction has no teacher counterpart —
//! oxigraph's serializer always writes flat triples — so it is built fresh
//! against the `StatementFlags` wire contract.

use crate::env::Environment;
use crate::error::{Result, Status};
use crate::log::{null_logger, LogLevel, LogRecord, LoggerHandle};
use crate::node::{rdf_iri, Literal, Term};
use crate::reader::Syntax;
use crate::sink::{Sink, Statement, StatementFlags};
use std::collections::{HashMap, HashSet};
use std::io::Write;

#[derive(Debug, Clone, Default)]
struct ListLink {
    first: Option<Term>,
    rest: Option<Term>,
}

/// Builds a [`Writer`] over a concrete [`Write`] destination.
#[derive(Debug, Clone)]
pub struct WriterBuilder {
    syntax: Syntax,
    env: Environment,
    indent: usize,
    logger: LoggerHandle,
}

impl WriterBuilder {
    #[must_use]
    pub fn new(syntax: Syntax) -> Self {
        Self {
            syntax,
            env: Environment::new(),
            indent: 2,
            logger: null_logger(),
        }
    }

    #[must_use]
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: LoggerHandle) -> Self {
        self.logger = logger;
        self
    }

    pub fn for_writer<W: Write>(self, out: W) -> Writer<W> {
        Writer {
            out,
            syntax: self.syntax,
            env: self.env,
            indent: self.indent,
            logger: self.logger,
            current: None,
            anon_groups: HashMap::new(),
            list_chains: HashMap::new(),
            failed: false,
        }
    }
}

/// A streaming structured writer, built via [`WriterBuilder`]. Holds pending
/// subject/predicate continuation state plus any buffered anonymous-node or
/// list content that hasn't yet been claimed by a referencing statement.
pub struct Writer<W: Write> {
    out: W,
    syntax: Syntax,
    env: Environment,
    indent: usize,
    logger: LoggerHandle,
    current: Option<(Term, Term)>,
    anon_groups: HashMap<Term, Vec<(Term, String)>>,
    list_chains: HashMap<Term, ListLink>,
    failed: bool,
}

impl<W: Write> Writer<W> {
    fn poisoned_guard(&self) -> Result<()> {
        if self.failed {
            return Err(Status::BadWrite(
                "writer is unusable after a previous write failure".to_owned(),
            ));
        }
        Ok(())
    }

    fn io<T>(&mut self, result: std::io::Result<T>) -> Result<T> {
        result.map_err(|e| {
            self.failed = true;
            Status::BadWrite(e.to_string())
        })
    }

    fn close_current_if_open(&mut self) -> Result<()> {
        if self.current.take().is_some() {
            let r = writeln!(self.out, " .");
            self.io(r)?;
        }
        Ok(())
    }

    fn indent_str(&self) -> String {
        " ".repeat(self.indent)
    }

    fn render_predicate(&self, term: &Term) -> String {
        if self.syntax == Syntax::Turtle && term.as_iri() == Some(rdf_iri::TYPE) {
            return "a".to_owned();
        }
        self.render_term(term)
    }

    fn render_term(&self, term: &Term) -> String {
        match term {
            Term::Iri(iri) => self.render_iri(iri),
            Term::Blank(id) => format!("_:{id}"),
            Term::Literal(lit) => self.render_literal(lit),
        }
    }

    fn render_iri(&self, iri: &str) -> String {
        if self.syntax == Syntax::Turtle {
            if let Some((prefix, local)) = self.env.abbreviate(iri) {
                if is_valid_pn_local(&local) {
                    return format!("{prefix}:{local}");
                }
            }
        }
        format!("<{iri}>")
    }

    fn render_literal(&self, lit: &Literal) -> String {
        if self.syntax == Syntax::Turtle && lit.numeric_form().is_some() {
            return lit.value().to_owned();
        }
        let mut text = format!("\"{}\"", crate::node::escape_string(lit.value()));
        if let Some(lang) = lit.language() {
            text.push('@');
            text.push_str(lang);
        } else if !lit.is_plain() {
            text.push_str("^^");
            text.push_str(&self.render_iri(lit.datatype()));
        }
        text
    }

    fn render_group(&self, pairs: Vec<(Term, String)>) -> String {
        let body = pairs
            .iter()
            .map(|(predicate, object_text)| {
                format!("{} {object_text}", self.render_predicate(predicate))
            })
            .collect::<Vec<_>>()
            .join(" ; ");
        format!("[ {body} ]")
    }

    /// Walks a well-formed collection chain starting at `head` until
    /// `rdf:nil`, consuming its buffered links as it goes.
    ///
    /// Two distinct failure shapes can stop the walk short of `rdf:nil`:
    /// a tail that is simply missing from `list_chains` (malformed input)
    /// truncates the list with a warning, exactly as a missing `rdf:first`
    /// or `rdf:rest` does. A tail that *was* already walked earlier in this
    /// same call is a genuine `rdf:rest` cycle rather than missing data —
    /// walking it again would never terminate, so instead the last element
    /// is rewritten as a nested anonymous node whose own `rdf:rest` names
    /// the revisited node directly, making the back-reference explicit in
    /// the output instead of looping.
    fn render_list(&mut self, head: &Term) -> String {
        let mut items = Vec::new();
        let mut current = head.clone();
        let mut visited: HashSet<Term> = HashSet::new();
        let nil = Term::Iri(rdf_iri::NIL.into());
        while current != nil {
            if visited.contains(&current) {
                let back_ref = self.render_term(&current);
                if let Some(last) = items.pop() {
                    let first_pred = self.render_predicate(&Term::Iri(rdf_iri::FIRST.into()));
                    let rest_pred = self.render_predicate(&Term::Iri(rdf_iri::REST.into()));
                    items.push(format!("[ {first_pred} {last} ; {rest_pred} {back_ref} ]"));
                }
                return format!("( {} )", items.join(" "));
            }
            visited.insert(current.clone());
            let Some(link) = self.list_chains.remove(&current) else {
                self.logger.log(&LogRecord::new(
                    LogLevel::Warning,
                    "list tail missing rdf:first/rdf:rest, truncating collection",
                ));
                break;
            };
            let Some(first) = link.first else {
                self.logger.log(&LogRecord::new(
                    LogLevel::Warning,
                    "list node missing rdf:first, truncating collection",
                ));
                break;
            };
            items.push(self.render_term(&first));
            match link.rest {
                Some(rest) => current = rest,
                None => {
                    self.logger.log(&LogRecord::new(
                        LogLevel::Warning,
                        "list node missing rdf:rest, truncating collection",
                    ));
                    break;
                }
            }
        }
        format!("( {} )", items.join(" "))
    }

    fn render_subject(&mut self, flags: StatementFlags, term: &Term) -> String {
        if flags.contains(StatementFlags::EMPTY_S) {
            self.anon_groups.remove(term);
            return "[]".to_owned();
        }
        if flags.contains(StatementFlags::LIST_S) {
            return self.render_list(term);
        }
        if flags.contains(StatementFlags::ANON_S) {
            let pairs = self.anon_groups.remove(term).unwrap_or_default();
            return self.render_group(pairs);
        }
        self.render_term(term)
    }

    fn render_object(&mut self, flags: StatementFlags, term: &Term) -> String {
        if flags.contains(StatementFlags::LIST_O) {
            return self.render_list(term);
        }
        if flags.contains(StatementFlags::ANON_O) {
            let pairs = self.anon_groups.remove(term).unwrap_or_default();
            return self.render_group(pairs);
        }
        self.render_term(term)
    }

    fn write_statement_line(
        &mut self,
        subject_text: &str,
        predicate: &Term,
        object_text: &str,
        subject_key: Term,
        predicate_key: Term,
    ) -> Result<()> {
        if let Some((cur_subject, cur_predicate)) = self.current.clone() {
            if cur_subject == subject_key && cur_predicate == predicate_key {
                let r = write!(self.out, " , {object_text}");
                return self.io(r);
            }
            if cur_subject == subject_key {
                let pad = self.indent_str();
                let pred_text = self.render_predicate(predicate);
                let r = write!(self.out, " ;\n{pad}{pred_text} {object_text}");
                self.io(r)?;
                self.current = Some((subject_key, predicate_key));
                return Ok(());
            }
            let r = writeln!(self.out, " .");
            self.io(r)?;
        }
        let pred_text = self.render_predicate(predicate);
        let r = write!(self.out, "{subject_text} {pred_text} {object_text}");
        self.io(r)?;
        self.current = Some((subject_key, predicate_key));
        Ok(())
    }

    /// Writes a raw, unsugared triple, used to flush anonymous/list buffers
    /// that were never claimed by a referencing statement before [`Self::finish`].
    fn write_flat(&mut self, subject: &Term, predicate: &Term, object_text: &str) -> Result<()> {
        let subject_text = self.render_term(subject);
        self.write_statement_line(
            &subject_text,
            predicate,
            object_text,
            subject.clone(),
            predicate.clone(),
        )
    }

    /// Consumes the writer, closing any still-open statement group and
    /// flushing any anonymous-node or list content that was buffered but
    /// never claimed by a referencing statement, then returns the underlying
    /// writer.
    pub fn finish(mut self) -> Result<W> {
        self.poisoned_guard()?;
        self.close_current_if_open()?;
        let leftover_lists = std::mem::take(&mut self.list_chains);
        for (node, link) in leftover_lists {
            if let Some(first) = link.first {
                let object_text = self.render_term(&first);
                self.write_flat(&node, &Term::Iri(rdf_iri::FIRST.into()), &object_text)?;
            }
            if let Some(rest) = link.rest {
                let object_text = self.render_term(&rest);
                self.write_flat(&node, &Term::Iri(rdf_iri::REST.into()), &object_text)?;
            }
        }
        let leftover_groups = std::mem::take(&mut self.anon_groups);
        for (subject, pairs) in leftover_groups {
            for (predicate, object_text) in pairs {
                self.write_flat(&subject, &predicate, &object_text)?;
            }
        }
        self.close_current_if_open()?;
        Ok(self.out)
    }
}

fn is_valid_pn_local(local: &str) -> bool {
    !local.is_empty()
        && local
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

impl<W: Write> Sink for Writer<W> {
    fn base(&mut self, iri: &Term) -> Result<()> {
        self.poisoned_guard()?;
        self.close_current_if_open()?;
        let Term::Iri(iri) = iri else {
            return Err(Status::BadArg("@base requires an IRI".to_owned()));
        };
        let r = writeln!(self.out, "@base <{iri}> .");
        self.io(r)
    }

    fn prefix(&mut self, label: &str, namespace: &str) -> Result<()> {
        self.poisoned_guard()?;
        self.close_current_if_open()?;
        let r = writeln!(self.out, "@prefix {label}: <{namespace}> .");
        self.io(r)
    }

    fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> Result<()> {
        self.poisoned_guard()?;

        let is_list_link = matches!(statement.subject, Term::Blank(_))
            && matches!(statement.predicate.as_iri(), Some(rdf_iri::FIRST | rdf_iri::REST));
        if is_list_link {
            let link = self.list_chains.entry(statement.subject.clone()).or_default();
            if statement.predicate.as_iri() == Some(rdf_iri::FIRST) {
                link.first = Some(statement.object.clone());
            } else {
                link.rest = Some(statement.object.clone());
            }
            return Ok(());
        }

        let subject_referenced = flags.contains(StatementFlags::EMPTY_S)
            || flags.contains(StatementFlags::ANON_S)
            || flags.contains(StatementFlags::LIST_S);
        if !subject_referenced && matches!(statement.subject, Term::Blank(_)) {
            let object_text = self.render_object(flags, &statement.object);
            self.anon_groups
                .entry(statement.subject.clone())
                .or_default()
                .push((statement.predicate.clone(), object_text));
            return Ok(());
        }

        let subject_text = self.render_subject(flags, &statement.subject);
        let object_text = self.render_object(flags, &statement.object);
        self.write_statement_line(
            &subject_text,
            &statement.predicate,
            &object_text,
            statement.subject.clone(),
            statement.predicate.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;

    fn term(spec: NodeSpec) -> Term {
        spec.into_term().unwrap()
    }

    #[test]
    fn round_trips_a_single_triple() {
        let mut writer = WriterBuilder::new(Syntax::Ntriples).for_writer(Vec::new());
        let statement = Statement::new(
            term(NodeSpec::Iri("http://example.org/s".into())),
            term(NodeSpec::Iri("http://example.org/p".into())),
            term(NodeSpec::Iri("http://example.org/o".into())),
            None,
        );
        writer.statement(StatementFlags::none(), &statement).unwrap();
        let out = writer.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<http://example.org/s> <http://example.org/p> <http://example.org/o> .\n"
        );
    }

    #[test]
    fn same_subject_and_predicate_continues_with_comma() {
        let mut writer = WriterBuilder::new(Syntax::Ntriples).for_writer(Vec::new());
        let s = term(NodeSpec::Iri("http://example.org/s".into()));
        let p = term(NodeSpec::Iri("http://example.org/p".into()));
        writer
            .statement(
                StatementFlags::none(),
                &Statement::new(s.clone(), p.clone(), term(NodeSpec::Iri("http://example.org/o1".into())), None),
            )
            .unwrap();
        writer
            .statement(
                StatementFlags::none(),
                &Statement::new(s, p, term(NodeSpec::Iri("http://example.org/o2".into())), None),
            )
            .unwrap();
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(out.contains(" , <http://example.org/o2>"));
    }

    #[test]
    fn flagged_collection_renders_parenthesized_list() {
        let mut writer = WriterBuilder::new(Syntax::Turtle).for_writer(Vec::new());
        let head = Term::fresh_blank();
        let tail = Term::fresh_blank();
        let s = term(NodeSpec::Iri("http://example.org/s".into()));
        let p = term(NodeSpec::Iri("http://example.org/p".into()));
        let a = term(NodeSpec::SimpleLiteral("a".into()));
        let b = term(NodeSpec::SimpleLiteral("b".into()));
        let nil = Term::Iri(rdf_iri::NIL.into());
        let first_iri = Term::Iri(rdf_iri::FIRST.into());
        let rest_iri = Term::Iri(rdf_iri::REST.into());

        writer
            .statement(StatementFlags::none(), &Statement::new(head.clone(), first_iri.clone(), a, None))
            .unwrap();
        writer
            .statement(StatementFlags::none(), &Statement::new(head.clone(), rest_iri.clone(), tail.clone(), None))
            .unwrap();
        writer
            .statement(StatementFlags::none(), &Statement::new(tail.clone(), first_iri, b, None))
            .unwrap();
        writer
            .statement(StatementFlags::none(), &Statement::new(tail, rest_iri, nil, None))
            .unwrap();
        writer
            .statement(StatementFlags::LIST_O, &Statement::new(s, p, head, None))
            .unwrap();

        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(out.contains("( \"a\" \"b\" )"));
    }

    #[test]
    fn flagged_collection_with_a_rest_cycle_emits_a_back_reference_instead_of_looping() {
        let mut writer = WriterBuilder::new(Syntax::Turtle).for_writer(Vec::new());
        let l1 = Term::fresh_blank();
        let l2 = Term::fresh_blank();
        let s = term(NodeSpec::Iri("http://example.org/s".into()));
        let p = term(NodeSpec::Iri("http://example.org/p".into()));
        let a = term(NodeSpec::SimpleLiteral("a".into()));
        let b = term(NodeSpec::SimpleLiteral("b".into()));
        let first_iri = Term::Iri(rdf_iri::FIRST.into());
        let rest_iri = Term::Iri(rdf_iri::REST.into());

        writer
            .statement(StatementFlags::none(), &Statement::new(l1.clone(), first_iri.clone(), a, None))
            .unwrap();
        writer
            .statement(StatementFlags::none(), &Statement::new(l1.clone(), rest_iri.clone(), l2.clone(), None))
            .unwrap();
        writer
            .statement(StatementFlags::none(), &Statement::new(l2.clone(), first_iri, b, None))
            .unwrap();
        writer
            .statement(StatementFlags::none(), &Statement::new(l2, rest_iri, l1.clone(), None))
            .unwrap();
        writer
            .statement(StatementFlags::LIST_O, &Statement::new(s, p, l1, None))
            .unwrap();

        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(out.contains("\"a\""));
        assert!(out.contains("\"b\""));
        assert!(out.contains("rdf-syntax-ns#rest"));
        assert!(out.trim_end().ends_with(" )"));
    }

    #[test]
    fn an_unclaimed_list_chain_flushes_flat_at_finish() {
        let mut writer = WriterBuilder::new(Syntax::Ntriples).for_writer(Vec::new());
        let head = Term::fresh_blank();
        let a = term(NodeSpec::SimpleLiteral("a".into()));
        writer
            .statement(
                StatementFlags::none(),
                &Statement::new(head.clone(), Term::Iri(rdf_iri::FIRST.into()), a, None),
            )
            .unwrap();
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert!(out.contains("rdf-syntax-ns#first"));
        assert!(out.contains("\"a\""));
    }

    #[test]
    fn short_write_poisons_the_writer() {
        struct FailingWriter(usize);
        impl Write for FailingWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if self.0 == 0 {
                    return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
                }
                self.0 -= 1;
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut writer = WriterBuilder::new(Syntax::Ntriples).for_writer(FailingWriter(0));
        let statement = Statement::new(
            term(NodeSpec::Iri("http://example.org/s".into())),
            term(NodeSpec::Iri("http://example.org/p".into())),
            term(NodeSpec::Iri("http://example.org/o".into())),
            None,
        );
        let result = writer.statement(StatementFlags::none(), &statement);
        assert!(matches!(result, Err(Status::BadWrite(_))));
        let second = writer.statement(StatementFlags::none(), &statement);
        assert!(matches!(second, Err(Status::BadWrite(_))));
    }

    #[test]
    fn turtle_abbreviates_prefixed_names_and_numeric_literals() {
        let mut env = Environment::new();
        env.set_prefix("eg", "http://example.org/");
        let mut writer = WriterBuilder::new(Syntax::Turtle).with_environment(env).for_writer(Vec::new());
        let statement = Statement::new(
            term(NodeSpec::Iri("http://example.org/s".into())),
            term(NodeSpec::Iri("http://example.org/p".into())),
            term(NodeSpec::Integer(7)),
            None,
        );
        writer.statement(StatementFlags::none(), &statement).unwrap();
        let out = String::from_utf8(writer.finish().unwrap()).unwrap();
        assert_eq!(out, "eg:s eg:p 7 .\n");
    }
}
