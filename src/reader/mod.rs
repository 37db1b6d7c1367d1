//! A resumable, streaming Turtle/N-Triples reader.
//!
//! Grounded on `oxttl::{TurtleParser, NTriplesParser}` and their shared
//! `oxttl::toolkit::Parser`: a byte buffer filled from a caller-driven source,
//! parsed incrementally. Unlike `oxttl`'s per-byte incremental lexer, this
//! reader re-parses one whole top-level production (a directive, or a
//! complete subject/predicateObjectList group) from the start of the buffer
//! on every `read_chunk` call, buffering the events it would emit locally and
//! only handing them to the real [`Sink`] once that production parses to
//! completion. A `NeedMoreData` retry after fetching more bytes can therefore
//! never emit a duplicate event, at the cost of re-scanning the still-pending
//! element's bytes on every retry.

mod lexer;

use crate::caret::Caret;
use crate::env::Environment;
use crate::error::{Result, Status};
use crate::log::{null_logger, LoggerHandle};
use crate::node::{rdf_iri, xsd_iri, Literal, NodeKind, Term};
use crate::sink::{Sink, Statement, StatementFlags};
use crate::xsd;
use lexer::{is_name_char, is_name_start, read_escape, read_quoted, skip_trivia, LexError, Position};
use std::rc::Rc;

/// Which grammar a [`Reader`] parses. `Empty` accepts no bytes at all and
/// always fails, the degenerate syntax for callers who only want the
/// resumability plumbing (tests, placeholders).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Ntriples,
    Turtle,
    Empty,
}

/// A byte source a [`Reader`] pulls from. A `read` returning `Ok(0)` means
/// "nothing available right now", not necessarily end of stream: a reader
/// treats it as a momentary, resumable gap.
pub trait ByteSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// A source that serves an in-memory byte slice in one shot.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for SliceSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = (self.data.len() - self.pos).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// A test double that releases `chunk` bytes at a time, reporting a momentary
/// empty read between chunks, to exercise a reader's resumable retry path
/// against a source that looks like a non-blocking socket.
pub struct ChunkedSource<'a> {
    data: &'a [u8],
    pos: usize,
    chunk: usize,
    starved: bool,
}

impl<'a> ChunkedSource<'a> {
    #[must_use]
    pub fn new(data: &'a [u8], chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk,
            starved: false,
        }
    }
}

impl ByteSource for ChunkedSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.starved {
            self.starved = false;
            return Ok(0);
        }
        let n = (self.data.len() - self.pos).min(buf.len()).min(self.chunk);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        if n > 0 {
            self.starved = true;
        }
        Ok(n)
    }
}

/// One blank-node shape a parsed subject/object can have, carried forward to
/// pick the [`StatementFlags`] sugar hint for its position: a dedicated
/// `EMPTY_S` bit for an empty `[]` subject, `ANON_S`/`ANON_O` for a
/// non-empty one, `LIST_S`/`LIST_O` for a collection. There is no `EMPTY_O`:
/// an empty `[]` in object position is indistinguishable, on the wire, from
/// any other anonymous object.
#[derive(Debug, Clone, Copy)]
enum Shape {
    Plain,
    AnonEmpty,
    AnonNonEmpty,
    List,
}

impl Shape {
    fn subject_flags(self) -> StatementFlags {
        match self {
            Self::Plain => StatementFlags::none(),
            Self::AnonEmpty => StatementFlags::EMPTY_S,
            Self::AnonNonEmpty => StatementFlags::ANON_S,
            Self::List => StatementFlags::LIST_S,
        }
    }

    fn object_flags(self) -> StatementFlags {
        match self {
            Self::Plain => StatementFlags::none(),
            Self::AnonEmpty | Self::AnonNonEmpty => StatementFlags::ANON_O,
            Self::List => StatementFlags::LIST_O,
        }
    }
}

/// An event queued while a top-level production is still being parsed; flushed
/// to the real sink only once the whole production succeeds.
enum PendingEvent {
    Base(String),
    Prefix(String, String),
    Statement(StatementFlags, Term, Term, Term, Option<Caret>),
    End(Term),
}

struct Parsed {
    consumed: usize,
    events: Vec<PendingEvent>,
}

/// Why a parse attempt over the buffer's current contents did not produce a
/// complete top-level production.
enum ElementError {
    /// The buffer ran out mid-token; fetch more bytes and retry from scratch.
    NeedMoreData,
    /// Nesting depth exceeded the reader's configured budget.
    StackExceeded,
    /// A genuine grammar violation.
    Syntax(String),
}

impl From<LexError> for ElementError {
    fn from(e: LexError) -> Self {
        match e {
            LexError::Incomplete => Self::NeedMoreData,
            LexError::Invalid(msg) => Self::Syntax(msg),
        }
    }
}

impl From<Status> for ElementError {
    fn from(status: Status) -> Self {
        Self::Syntax(status.to_string())
    }
}

/// A streaming Turtle/N-Triples reader.
///
/// A `Reader` owns its working buffer, tracked position, and `@base`/`@prefix`
/// environment; it is driven by repeated [`Reader::read_chunk`] calls (or the
/// [`Reader::read_document`] convenience loop) against a caller-supplied
/// [`ByteSource`].
pub struct Reader {
    syntax: Syntax,
    env: Environment,
    document: Rc<str>,
    buffer: Vec<u8>,
    pos: Position,
    source: Option<Box<dyn ByteSource>>,
    page_size: usize,
    stack_budget: usize,
    exhausted: bool,
    logger: LoggerHandle,
}

impl Reader {
    #[must_use]
    pub fn new(syntax: Syntax, document: impl Into<Rc<str>>) -> Self {
        Self {
            syntax,
            env: Environment::new(),
            document: document.into(),
            buffer: Vec::new(),
            pos: Position::start(),
            source: None,
            page_size: 4096,
            stack_budget: 128,
            exhausted: false,
            logger: null_logger(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: LoggerHandle) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn with_stack_budget(mut self, budget: usize) -> Self {
        self.stack_budget = budget;
        self
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Attaches `source` and resets the reader's buffer/position, ready for
    /// `read_chunk`/`read_document`. `page_size` bounds how many bytes a
    /// single internal `fill` pulls from the source at a time.
    pub fn start(&mut self, source: Box<dyn ByteSource>, page_size: usize) -> Result<()> {
        if page_size == 0 {
            return Err(Status::BadArg("page size must be at least 1".to_owned()));
        }
        self.source = Some(source);
        self.page_size = page_size;
        self.buffer.clear();
        self.pos = Position::start();
        self.exhausted = false;
        Ok(())
    }

    /// Detaches the source and discards any buffered, not-yet-parsed bytes.
    pub fn finish(&mut self) {
        self.source = None;
        self.buffer.clear();
        self.pos = Position::start();
        self.exhausted = false;
    }

    fn fill(&mut self) -> Result<bool> {
        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        let mut chunk = vec![0u8; self.page_size];
        let n = source.read(&mut chunk)?;
        if n == 0 {
            self.exhausted = true;
            return Ok(false);
        }
        self.exhausted = false;
        self.buffer.extend_from_slice(&chunk[..n]);
        Ok(true)
    }

    fn caret_at(&self, offset: usize) -> Caret {
        self.pos.advanced_by(&self.buffer[..offset]).caret(&self.document)
    }

    fn commit(&mut self, consumed: usize) {
        self.pos = self.pos.advanced_by(&self.buffer[..consumed]);
        self.buffer.drain(..consumed);
    }

    fn apply(&mut self, sink: &mut dyn Sink, event: PendingEvent) -> Result<()> {
        match event {
            PendingEvent::Base(iri) => {
                self.env.set_base(&iri)?;
                sink.base(&Term::Iri(iri.into()))
            }
            PendingEvent::Prefix(label, namespace) => {
                self.env.set_prefix(label.clone(), namespace.clone());
                sink.prefix(&label, &namespace)
            }
            PendingEvent::Statement(flags, subject, predicate, object, caret) => {
                let mut statement = Statement::new(subject, predicate, object, None);
                if let Some(caret) = caret {
                    statement = statement.with_caret(caret);
                }
                sink.statement(flags, &statement)
            }
            PendingEvent::End(node) => sink.end(&node),
        }
    }

    /// Parses and emits exactly one top-level production (a `@base`/`@prefix`
    /// directive, or a complete subject/predicateObjectList group, which may
    /// produce several [`Statement`](crate::sink::Event::Statement) events).
    ///
    /// Returns `Err(Status::Failure)` at a resumable break: a literal `\0`
    /// byte in the stream (consumed as its own minimal element), or a
    /// momentary empty read from the source. Callers drive a socket-like
    /// source by calling this repeatedly; [`Reader::read_document`] does that
    /// until the source reports a settled end of stream.
    pub fn read_chunk(&mut self, sink: &mut dyn Sink) -> Result<()> {
        if matches!(self.syntax, Syntax::Empty) {
            return Err(Status::Failure);
        }
        loop {
            let start = skip_trivia(&self.buffer, 0, true);
            if start >= self.buffer.len() {
                if !self.fill()? {
                    return Err(Status::Failure);
                }
                continue;
            }
            if self.buffer[start] == 0 {
                self.commit(start + 1);
                return Err(Status::Failure);
            }
            match self.try_parse_element(start) {
                Ok(Parsed { consumed, events }) => {
                    self.commit(consumed);
                    for event in events {
                        self.apply(sink, event)?;
                    }
                    return Ok(());
                }
                Err(ElementError::NeedMoreData) => {
                    if !self.fill()? {
                        return Err(Status::Failure);
                    }
                }
                Err(ElementError::StackExceeded) => return Err(Status::BadStack),
                Err(ElementError::Syntax(msg)) => {
                    let range = self.caret_at(start)..self.caret_at(self.buffer.len());
                    return Err(Status::BadSyntax(range, msg));
                }
            }
        }
    }

    /// Drives [`Reader::read_chunk`] until the attached source settles at end
    /// of stream. Resumable breaks (`\0` markers, momentary empty reads) are
    /// absorbed transparently; only a real parse error propagates.
    pub fn read_document(&mut self, sink: &mut dyn Sink) -> Result<()> {
        let mut last_len = None;
        loop {
            match self.read_chunk(sink) {
                Ok(()) => last_len = None,
                Err(Status::Failure) => {
                    if self.exhausted && last_len == Some(self.buffer.len()) {
                        return Ok(());
                    }
                    last_len = Some(self.buffer.len());
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_parse_element(&self, start: usize) -> std::result::Result<Parsed, ElementError> {
        let caret = self.caret_at(start);
        let buf = &self.buffer;
        if matches!(self.syntax, Syntax::Turtle) && buf.get(start) == Some(&b'@') {
            if buf.len() - start < 8 {
                return Err(ElementError::NeedMoreData);
            }
            if &buf[start..start + 5] == b"@base" && !buf.get(start + 5).is_some_and(|&b| is_name_char(b)) {
                let mut events = Vec::new();
                let end = self.parse_base_directive(buf, start + 5, &mut events)?;
                return Ok(Parsed { consumed: end - start, events });
            }
            if &buf[start..start + 7] == b"@prefix" && !buf.get(start + 7).is_some_and(|&b| is_name_char(b)) {
                let mut events = Vec::new();
                let end = self.parse_prefix_directive(buf, start + 7, &mut events)?;
                return Ok(Parsed { consumed: end - start, events });
            }
            return Err(ElementError::Syntax("unknown directive".to_owned()));
        }
        let mut events = Vec::new();
        let end = self.parse_triples(buf, start, 0, &caret, &mut events)?;
        Ok(Parsed { consumed: end - start, events })
    }

    fn parse_base_directive(
        &self,
        buf: &[u8],
        mut i: usize,
        events: &mut Vec<PendingEvent>,
    ) -> std::result::Result<usize, ElementError> {
        i = skip_trivia(buf, i, true);
        if buf.get(i) != Some(&b'<') {
            return Err(self.expect(buf, i, "expected '<' after @base"));
        }
        let (consumed, text) = read_iriref(buf, i)?;
        i += consumed;
        let absolute = self.env.resolve(&text)?;
        i = skip_trivia(buf, i, true);
        if buf.get(i) != Some(&b'.') {
            return Err(self.expect(buf, i, "expected '.' to close @base directive"));
        }
        events.push(PendingEvent::Base(absolute));
        Ok(i + 1)
    }

    fn parse_prefix_directive(
        &self,
        buf: &[u8],
        mut i: usize,
        events: &mut Vec<PendingEvent>,
    ) -> std::result::Result<usize, ElementError> {
        i = skip_trivia(buf, i, true);
        let label_start = i;
        while buf.get(i).is_some_and(|&b| is_name_char(b) && b != b':') {
            i += 1;
        }
        if i >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        if buf[i] != b':' {
            return Err(self.expect(buf, i, "expected ':' in @prefix label"));
        }
        let label = String::from_utf8_lossy(&buf[label_start..i]).into_owned();
        i = skip_trivia(buf, i + 1, true);
        if buf.get(i) != Some(&b'<') {
            return Err(self.expect(buf, i, "expected '<' after @prefix label"));
        }
        let (consumed, text) = read_iriref(buf, i)?;
        i += consumed;
        let namespace = self.env.resolve(&text)?;
        i = skip_trivia(buf, i, true);
        if buf.get(i) != Some(&b'.') {
            return Err(self.expect(buf, i, "expected '.' to close @prefix directive"));
        }
        events.push(PendingEvent::Prefix(label, namespace));
        Ok(i + 1)
    }

    fn expect(&self, buf: &[u8], pos: usize, msg: &str) -> ElementError {
        if pos >= buf.len() {
            ElementError::NeedMoreData
        } else {
            ElementError::Syntax(msg.to_owned())
        }
    }

    /// `subject predicateObjectList? '.'`, or just `subject '.'` when the
    /// subject is itself a blank-node property list that already asserted
    /// everything it needs to. A bare `'.'` after any other subject shape
    /// (a plain IRI/blank node, or a collection) is not a valid production:
    /// the Turtle grammar only lets a `blankNodePropertyList` stand alone as
    /// `triples` without a `predicateObjectList`.
    fn parse_triples(
        &self,
        buf: &[u8],
        start: usize,
        depth: usize,
        caret: &Caret,
        events: &mut Vec<PendingEvent>,
    ) -> std::result::Result<usize, ElementError> {
        let (n, subject, subj_shape) = self.parse_node(buf, start, depth, events, caret)?;
        if subject.kind() == NodeKind::Literal {
            return Err(ElementError::Syntax("subject must be an IRI or blank node".to_owned()));
        }
        let i = skip_trivia(buf, start + n, true);
        if buf.get(i) == Some(&b'.') && matches!(subj_shape, Shape::AnonEmpty | Shape::AnonNonEmpty) {
            return Ok(i + 1);
        }
        if i >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        self.parse_predicate_object_list(buf, i, depth, &subject, subj_shape, caret, events, &[b'.'])
    }

    fn parse_predicate_object_list(
        &self,
        buf: &[u8],
        mut i: usize,
        depth: usize,
        subject: &Term,
        subj_shape: Shape,
        caret: &Caret,
        events: &mut Vec<PendingEvent>,
        terminators: &[u8],
    ) -> std::result::Result<usize, ElementError> {
        let turtle = matches!(self.syntax, Syntax::Turtle);
        loop {
            let (n, predicate) = self.parse_verb(buf, i)?;
            i = skip_trivia(buf, i + n, true);
            loop {
                let (n, object, obj_shape) = self.parse_node(buf, i, depth, events, caret)?;
                i = skip_trivia(buf, i + n, true);
                let flags = subj_shape.subject_flags() | obj_shape.object_flags();
                events.push(PendingEvent::Statement(
                    flags,
                    subject.clone(),
                    predicate.clone(),
                    object,
                    Some(caret.clone()),
                ));
                if turtle && buf.get(i) == Some(&b',') {
                    i = skip_trivia(buf, i + 1, true);
                    continue;
                }
                break;
            }
            match buf.get(i) {
                Some(&b) if terminators.contains(&b) => return Ok(i + 1),
                Some(b';') if turtle => {
                    i = skip_trivia(buf, i + 1, true);
                    if let Some(&b) = buf.get(i) {
                        if terminators.contains(&b) {
                            return Ok(i + 1);
                        }
                    } else {
                        return Err(ElementError::NeedMoreData);
                    }
                }
                None => return Err(ElementError::NeedMoreData),
                Some(_) => return Err(ElementError::Syntax("expected ';' or end of statement".to_owned())),
            }
        }
    }

    fn parse_node(
        &self,
        buf: &[u8],
        pos: usize,
        depth: usize,
        events: &mut Vec<PendingEvent>,
        caret: &Caret,
    ) -> std::result::Result<(usize, Term, Shape), ElementError> {
        let turtle = matches!(self.syntax, Syntax::Turtle);
        match buf.get(pos) {
            None => Err(ElementError::NeedMoreData),
            Some(b'<') => {
                let (n, term) = self.parse_iri(buf, pos)?;
                Ok((n, term, Shape::Plain))
            }
            Some(b'_') if buf.get(pos + 1) == Some(&b':') => {
                let (n, term) = parse_blank_label(buf, pos)?;
                Ok((n, term, Shape::Plain))
            }
            Some(b'"' | b'\'') => {
                let (n, term) = self.parse_literal(buf, pos)?;
                Ok((n, term, Shape::Plain))
            }
            Some(b'[') if turtle => self.parse_anon(buf, pos, depth, events, caret),
            Some(b'(') if turtle => self.parse_collection(buf, pos, depth, events, caret),
            Some(&b) if turtle && (b.is_ascii_digit() || b == b'+' || b == b'-') => {
                let (n, term) = self.parse_numeric_literal(buf, pos)?;
                Ok((n, term, Shape::Plain))
            }
            Some(&b) if turtle && (is_name_start(b) || b == b':') => {
                let (n, term) = self.parse_prefixed_name_or_boolean(buf, pos)?;
                Ok((n, term, Shape::Plain))
            }
            Some(_) => Err(ElementError::Syntax("expected a subject or object term".to_owned())),
        }
    }

    fn parse_verb(&self, buf: &[u8], pos: usize) -> std::result::Result<(usize, Term), ElementError> {
        if matches!(self.syntax, Syntax::Turtle)
            && buf.get(pos) == Some(&b'a')
            && !buf.get(pos + 1).is_some_and(|&b| is_name_char(b))
        {
            if buf.get(pos + 1).is_none() {
                return Err(ElementError::NeedMoreData);
            }
            return Ok((1, Term::Iri(rdf_iri::TYPE.into())));
        }
        match buf.get(pos) {
            None => Err(ElementError::NeedMoreData),
            Some(b'<') => self.parse_iri(buf, pos),
            Some(&b) if matches!(self.syntax, Syntax::Turtle) && (is_name_start(b) || b == b':') => {
                self.parse_prefixed_name(buf, pos)
            }
            Some(_) => Err(ElementError::Syntax("expected a predicate IRI".to_owned())),
        }
    }

    fn parse_iri(&self, buf: &[u8], pos: usize) -> std::result::Result<(usize, Term), ElementError> {
        let (consumed, text) = read_iriref(buf, pos)?;
        let absolute = self.env.resolve(&text)?;
        Ok((consumed, Term::Iri(absolute.into())))
    }

    fn parse_prefixed_name(&self, buf: &[u8], pos: usize) -> std::result::Result<(usize, Term), ElementError> {
        let mut i = pos;
        while buf.get(i).is_some_and(|&b| is_name_char(b) && b != b':') {
            i += 1;
        }
        if i >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        if buf[i] != b':' {
            return Err(ElementError::Syntax("expected ':' in prefixed name".to_owned()));
        }
        let prefix = std::str::from_utf8(&buf[pos..i]).unwrap_or_default();
        let local_start = i + 1;
        let mut j = local_start;
        while buf.get(j).is_some_and(|&b| is_name_char(b)) {
            j += 1;
        }
        if j >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        let local = std::str::from_utf8(&buf[local_start..j]).unwrap_or_default();
        let iri = self.env.expand_prefixed_name(prefix, local)?;
        Ok((j - pos, Term::Iri(iri.into())))
    }

    fn parse_prefixed_name_or_boolean(&self, buf: &[u8], pos: usize) -> std::result::Result<(usize, Term), ElementError> {
        let mut i = pos;
        while buf.get(i).is_some_and(|&b| is_name_char(b) && b != b':') {
            i += 1;
        }
        if i >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        if buf[i] != b':' {
            return match &buf[pos..i] {
                b"true" => Ok((i - pos, boolean_literal(true))),
                b"false" => Ok((i - pos, boolean_literal(false))),
                _ => Err(ElementError::Syntax("expected ':' in prefixed name".to_owned())),
            };
        }
        self.parse_prefixed_name(buf, pos)
    }

    fn parse_literal(&self, buf: &[u8], pos: usize) -> std::result::Result<(usize, Term), ElementError> {
        let quote = buf[pos];
        let (consumed, value) = read_quoted(buf, pos, quote)?;
        let i = pos + consumed;
        if buf.get(i) == Some(&b'@') {
            let mut j = i + 1;
            while buf.get(j).is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'-') {
                j += 1;
            }
            if j >= buf.len() {
                return Err(ElementError::NeedMoreData);
            }
            if j == i + 1 {
                return Err(ElementError::Syntax("empty language tag".to_owned()));
            }
            let raw = std::str::from_utf8(&buf[i + 1..j]).unwrap_or_default();
            let tag = oxilangtag::LanguageTag::parse(raw.to_owned())
                .map_err(|e| ElementError::Syntax(format!("invalid language tag {raw:?}: {e}")))?;
            return Ok((j - pos, Term::Literal(Literal::new_language_tagged(value, tag.as_str())?)));
        }
        if buf.get(i) == Some(&b'^') {
            match buf.get(i + 1) {
                None => return Err(ElementError::NeedMoreData),
                Some(b'^') => {}
                Some(_) => return Err(ElementError::Syntax("expected '^^' before a datatype".to_owned())),
            }
            let dt_start = i + 2;
            let (dt_consumed, datatype_term) = match buf.get(dt_start) {
                Some(b'<') => self.parse_iri(buf, dt_start)?,
                Some(&b) if is_name_start(b) || b == b':' => self.parse_prefixed_name(buf, dt_start)?,
                None => return Err(ElementError::NeedMoreData),
                Some(_) => return Err(ElementError::Syntax("expected a datatype IRI".to_owned())),
            };
            let datatype = datatype_term
                .as_iri()
                .expect("datatype parse always yields an IRI term")
                .to_owned();
            return Ok((dt_start + dt_consumed - pos, Term::Literal(Literal::new_typed(value, datatype)?)));
        }
        Ok((consumed, Term::Literal(Literal::new_simple(value))))
    }

    fn parse_numeric_literal(&self, buf: &[u8], pos: usize) -> std::result::Result<(usize, Term), ElementError> {
        let mut i = pos;
        if matches!(buf.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let int_start = i;
        while buf.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        let mut is_decimal = false;
        if buf.get(i) == Some(&b'.') && buf.get(i + 1).is_some_and(u8::is_ascii_digit) {
            is_decimal = true;
            i += 1;
            while buf.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        let mut is_double = false;
        if matches!(buf.get(i), Some(b'e' | b'E')) {
            let mut j = i + 1;
            if matches!(buf.get(j), Some(b'+' | b'-')) {
                j += 1;
            }
            let exp_start = j;
            while buf.get(j).is_some_and(u8::is_ascii_digit) {
                j += 1;
            }
            if j > exp_start {
                is_double = true;
                i = j;
            }
        }
        if i == int_start && !is_decimal {
            return Err(ElementError::Syntax("malformed numeric literal".to_owned()));
        }
        if i >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        let text = std::str::from_utf8(&buf[pos..i]).unwrap_or_default();
        let term = if is_double {
            let value: f64 = text
                .parse()
                .map_err(|_| ElementError::Syntax("malformed double literal".to_owned()))?;
            Term::Literal(Literal::new_typed(xsd::canonical_double(value), xsd_iri::DOUBLE)?)
        } else if is_decimal {
            Term::Literal(Literal::new_typed(xsd::canonical_decimal(text)?, xsd_iri::DECIMAL)?)
        } else {
            Term::Literal(Literal::new_typed(xsd::canonical_integer(text)?, xsd_iri::INTEGER)?)
        };
        Ok((i - pos, term))
    }

    fn parse_anon(
        &self,
        buf: &[u8],
        pos: usize,
        depth: usize,
        events: &mut Vec<PendingEvent>,
        caret: &Caret,
    ) -> std::result::Result<(usize, Term, Shape), ElementError> {
        if depth >= self.stack_budget {
            return Err(ElementError::StackExceeded);
        }
        let i = skip_trivia(buf, pos + 1, true);
        if buf.get(i) == Some(&b']') {
            return Ok((i + 1 - pos, Term::fresh_blank(), Shape::AnonEmpty));
        }
        if i >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        let blank = Term::fresh_blank();
        let end = self.parse_predicate_object_list(buf, i, depth + 1, &blank, Shape::Plain, caret, events, &[b']'])?;
        events.push(PendingEvent::End(blank.clone()));
        Ok((end - pos, blank, Shape::AnonNonEmpty))
    }

    fn parse_collection(
        &self,
        buf: &[u8],
        pos: usize,
        depth: usize,
        events: &mut Vec<PendingEvent>,
        caret: &Caret,
    ) -> std::result::Result<(usize, Term, Shape), ElementError> {
        if depth >= self.stack_budget {
            return Err(ElementError::StackExceeded);
        }
        let mut i = skip_trivia(buf, pos + 1, true);
        if buf.get(i) == Some(&b')') {
            return Ok((i + 1 - pos, Term::Iri(rdf_iri::NIL.into()), Shape::Plain));
        }
        if i >= buf.len() {
            return Err(ElementError::NeedMoreData);
        }
        let head = Term::fresh_blank();
        let mut current = head.clone();
        loop {
            let (n, item, _shape) = self.parse_node(buf, i, depth + 1, events, caret)?;
            i = skip_trivia(buf, i + n, true);
            let rest = if buf.get(i) == Some(&b')') {
                i += 1;
                Term::Iri(rdf_iri::NIL.into())
            } else if i >= buf.len() {
                return Err(ElementError::NeedMoreData);
            } else {
                Term::fresh_blank()
            };
            events.push(PendingEvent::Statement(
                StatementFlags::none(),
                current.clone(),
                Term::Iri(rdf_iri::FIRST.into()),
                item,
                Some(caret.clone()),
            ));
            events.push(PendingEvent::Statement(
                StatementFlags::none(),
                current,
                Term::Iri(rdf_iri::REST.into()),
                rest.clone(),
                Some(caret.clone()),
            ));
            if rest == Term::Iri(rdf_iri::NIL.into()) {
                break;
            }
            current = rest;
            i = skip_trivia(buf, i, true);
        }
        events.push(PendingEvent::End(head.clone()));
        Ok((i - pos, head, Shape::List))
    }
}

fn boolean_literal(value: bool) -> Term {
    Term::Literal(Literal::new_typed(xsd::canonical_boolean(value), xsd_iri::BOOLEAN).expect("boolean datatype is never empty"))
}

fn parse_blank_label(buf: &[u8], pos: usize) -> std::result::Result<(usize, Term), ElementError> {
    let label_start = pos + 2;
    let mut i = label_start;
    while buf.get(i).is_some_and(|&b| is_name_char(b)) {
        i += 1;
    }
    if i >= buf.len() {
        return Err(ElementError::NeedMoreData);
    }
    if i == label_start {
        return Err(ElementError::Syntax("empty blank node label".to_owned()));
    }
    let label = std::str::from_utf8(&buf[label_start..i]).unwrap_or_default();
    Ok((i - pos, Term::Blank(label.into())))
}

/// An `IRIREF`: `<...>` with `\uXXXX`/`\UXXXXXXXX` escapes but no raw control
/// characters or `<>"{}|^\``.
fn read_iriref(buf: &[u8], start: usize) -> std::result::Result<(usize, String), ElementError> {
    let mut i = start + 1;
    let mut out = String::new();
    loop {
        match buf.get(i) {
            None => return Err(ElementError::NeedMoreData),
            Some(b'>') => {
                i += 1;
                break;
            }
            Some(b'\\') => {
                let (consumed, ch) = read_escape(buf, i)?;
                out.push(ch);
                i += consumed;
            }
            Some(&b) if b <= 0x20 || matches!(b, b'<' | b'"' | b'{' | b'}' | b'|' | b'^' | b'`') => {
                return Err(ElementError::Syntax("invalid character in IRI reference".to_owned()));
            }
            Some(_) => {
                let rest = std::str::from_utf8(&buf[i..]).map_err(|e| {
                    if e.valid_up_to() == 0 {
                        ElementError::NeedMoreData
                    } else {
                        ElementError::Syntax("invalid UTF-8 in IRI reference".to_owned())
                    }
                })?;
                let Some(ch) = rest.chars().next() else {
                    return Err(ElementError::NeedMoreData);
                };
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    Ok((i - start, out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result as CrateResult;

    #[derive(Default)]
    struct CollectingSink {
        bases: Vec<String>,
        prefixes: Vec<(String, String)>,
        statements: Vec<(StatementFlags, Statement)>,
        ends: Vec<String>,
    }

    impl Sink for CollectingSink {
        fn base(&mut self, iri: &Term) -> CrateResult<()> {
            self.bases.push(iri.to_string());
            Ok(())
        }
        fn prefix(&mut self, label: &str, namespace: &str) -> CrateResult<()> {
            self.prefixes.push((label.to_owned(), namespace.to_owned()));
            Ok(())
        }
        fn statement(&mut self, flags: StatementFlags, statement: &Statement) -> CrateResult<()> {
            self.statements.push((flags, statement.clone()));
            Ok(())
        }
        fn end(&mut self, node: &Term) -> CrateResult<()> {
            self.ends.push(node.to_string());
            Ok(())
        }
    }

    fn read_all(syntax: Syntax, input: &[u8]) -> (Reader, CollectingSink) {
        let mut reader = Reader::new(syntax, "test.ttl");
        let mut sink = CollectingSink::default();
        reader.start(Box::new(SliceSource::new(input)), 4096).unwrap();
        reader.read_document(&mut sink).unwrap();
        (reader, sink)
    }

    #[test]
    fn turtle_directives_and_semicolon_comma_continuation() {
        let input = b"@base <http://example.org/base/> .\n\
                       @prefix eg: <http://example.org/> .\n\
                       eg:s eg:p1 eg:o1 , eg:o2 ;\n\
                       \t eg:p2 \"v\" .\n";
        let (_reader, sink) = read_all(Syntax::Turtle, input);
        assert_eq!(sink.bases, ["http://example.org/base/"]);
        assert_eq!(
            sink.prefixes,
            [("eg".to_owned(), "http://example.org/".to_owned())]
        );
        assert_eq!(sink.statements.len(), 3);
        assert!(sink.statements.iter().all(|(_, s)| s.subject.as_iri() == Some("http://example.org/s")));
    }

    #[test]
    fn ntriples_rejects_turtle_sugar() {
        let mut reader = Reader::new(Syntax::Ntriples, "test.nt");
        let mut sink = CollectingSink::default();
        reader
            .start(Box::new(SliceSource::new(b"<http://example.org/s> <http://example.org/p> \"o\" .\n")), 4096)
            .unwrap();
        reader.read_document(&mut sink).unwrap();
        assert_eq!(sink.statements.len(), 1);

        let mut reader = Reader::new(Syntax::Ntriples, "test.nt");
        let mut sink = CollectingSink::default();
        reader
            .start(Box::new(SliceSource::new(b"_:a eg:p _:b .\n")), 4096)
            .unwrap();
        assert!(reader.read_document(&mut sink).is_err());
    }

    #[test]
    fn anonymous_object_emits_nested_statements_and_end() {
        let input = b"@prefix eg: <http://example.org/> .\n\
                       eg:s eg:p [ eg:sp eg:so ] .\n";
        let (_reader, sink) = read_all(Syntax::Turtle, input);
        assert_eq!(sink.statements.len(), 2);
        assert_eq!(sink.ends.len(), 1);
        let (outer_flags, outer) = sink.statements.last().unwrap();
        assert!(outer_flags.contains(StatementFlags::ANON_O));
        assert!(matches!(outer.object, Term::Blank(_)));
    }

    #[test]
    fn collection_expands_to_rdf_first_rest_nil() {
        let input = b"@prefix eg: <http://example.org/> .\n\
                       eg:s eg:p ( eg:a eg:b ) .\n";
        let (_reader, sink) = read_all(Syntax::Turtle, input);
        // one rdf:first + one rdf:rest per item, plus the outer statement.
        assert_eq!(sink.statements.len(), 5);
        assert_eq!(sink.ends.len(), 1);
        let rests: Vec<_> = sink
            .statements
            .iter()
            .filter(|(_, s)| s.predicate.as_iri() == Some(rdf_iri::REST))
            .collect();
        assert_eq!(rests.len(), 2);
        assert_eq!(rests[1].1.object.as_iri(), Some(rdf_iri::NIL));
    }

    #[test]
    fn null_byte_is_a_resumable_break_between_chunks() {
        let input = b"@prefix eg: <http://example.org/> .\n\
                       eg:s eg:p1 eg:o1 .\n\0\
                       eg:s eg:p2 eg:o2 .\n\0";
        let mut reader = Reader::new(Syntax::Turtle, "test.ttl");
        let mut sink = CollectingSink::default();
        reader.start(Box::new(SliceSource::new(input)), 4096).unwrap();

        assert!(reader.read_chunk(&mut sink).is_ok()); // @prefix
        assert!(reader.read_chunk(&mut sink).is_ok()); // first statement
        assert_eq!(reader.read_chunk(&mut sink), Err(Status::Failure)); // '\0'
        assert!(reader.read_chunk(&mut sink).is_ok()); // second statement
        assert_eq!(reader.read_chunk(&mut sink), Err(Status::Failure)); // '\0'
        assert_eq!(reader.read_chunk(&mut sink), Err(Status::Failure)); // true EOF
        assert_eq!(sink.statements.len(), 2);
    }

    #[test]
    fn chunked_source_reassembles_a_split_token() {
        let input = b"@prefix eg: <http://example.org/> .\neg:s eg:p eg:o .\n";
        let mut reader = Reader::new(Syntax::Turtle, "test.ttl");
        let mut sink = CollectingSink::default();
        reader.start(Box::new(ChunkedSource::new(input, 3)), 3).unwrap();
        reader.read_document(&mut sink).unwrap();
        assert_eq!(sink.statements.len(), 1);
        assert_eq!(sink.prefixes.len(), 1);
    }

    #[test]
    fn deep_nesting_beyond_the_stack_budget_fails() {
        let mut input = String::from("@prefix eg: <http://example.org/> .\neg:s eg:p ");
        for _ in 0..10 {
            input.push_str("[ eg:p ");
        }
        input.push_str("eg:o");
        for _ in 0..10 {
            input.push(']');
        }
        input.push_str(" .\n");
        let mut reader = Reader::new(Syntax::Turtle, "test.ttl").with_stack_budget(4);
        let mut sink = CollectingSink::default();
        reader.start(Box::new(SliceSource::new(input.as_bytes())), 4096).unwrap();
        assert_eq!(reader.read_chunk(&mut sink), Err(Status::BadStack));
    }

    #[test]
    fn numeric_and_boolean_shorthand_canonicalize() {
        let input = b"@prefix eg: <http://example.org/> .\neg:s eg:p 007, true, 1.50, 1.5e2 .\n";
        let (_reader, sink) = read_all(Syntax::Turtle, input);
        let values: Vec<_> = sink
            .statements
            .iter()
            .map(|(_, s)| s.object.as_literal().unwrap().value().to_owned())
            .collect();
        assert_eq!(values, ["7", "true", "1.5", "1.5E2"]);
    }

    #[test]
    fn bare_dot_after_a_plain_subject_is_a_syntax_error() {
        let mut reader = Reader::new(Syntax::Turtle, "test.ttl");
        let mut sink = CollectingSink::default();
        reader
            .start(Box::new(SliceSource::new(b"<http://example.org/s> .\n")), 4096)
            .unwrap();
        assert!(matches!(reader.read_document(&mut sink), Err(Status::BadSyntax(_, _))));
        assert!(sink.statements.is_empty());
    }

    #[test]
    fn bare_dot_after_a_collection_subject_is_a_syntax_error() {
        let mut reader = Reader::new(Syntax::Turtle, "test.ttl");
        let mut sink = CollectingSink::default();
        reader
            .start(Box::new(SliceSource::new(b"@prefix eg: <http://example.org/> .\n( eg:a eg:b ) .\n")), 4096)
            .unwrap();
        assert!(reader.read_document(&mut sink).is_err());
    }

    #[test]
    fn bare_dot_after_an_anon_property_list_subject_is_accepted() {
        let input = b"@prefix eg: <http://example.org/> .\n[ eg:p eg:o ] .\n";
        let (_reader, sink) = read_all(Syntax::Turtle, input);
        assert_eq!(sink.statements.len(), 1);
    }

    #[test]
    fn literal_subject_is_a_syntax_error() {
        let mut reader = Reader::new(Syntax::Turtle, "test.ttl");
        let mut sink = CollectingSink::default();
        reader
            .start(Box::new(SliceSource::new(b"\"abc\" <http://example.org/p> <http://example.org/o> .\n")), 4096)
            .unwrap();
        assert!(matches!(reader.read_document(&mut sink), Err(Status::BadSyntax(_, _))));
        assert!(sink.statements.is_empty());
    }
}
