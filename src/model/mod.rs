//! The indexed quad store: multiple sorted statement orders over a shared node
//! pool, with pattern-driven index selection and generation-stamped cursors.
//!
//! Grounded on `oxigraph::storage::StorageReader`/`MemoryStorage`: several sorted
//! quad orderings over one encoded representation, picked per query by how much
//! of the pattern they cover as a contiguous prefix. This crate keeps the
//! B-tree-of-permuted-keys shape but drops the on-disk column families, since
//! persistence is explicitly out of scope here.

mod cursor;
mod order;

pub use cursor::Cursor;
pub use order::Order;

use crate::alloc::{Allocator, SystemAllocator};
use crate::caret::Caret;
use crate::error::{Result, Status};
use crate::log::{null_logger, LogLevel, LogRecord, LoggerHandle};
use crate::node::{NodeKind, Term};
use crate::nodes::{NodeId, Nodes};
use crate::sink::{Sink, Statement, StatementFlags};
use order::{IdPattern, IndexKey, QuadKey};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Bit flags governing what a model retains about each stored statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelFlags(u8);

impl ModelFlags {
    /// Retain the graph component; without it, G is dropped on insert and
    /// statements that only differ by graph coalesce.
    pub const STORE_GRAPHS: Self = Self(0x1);
    /// Retain the caret an `add_with_caret` call supplied.
    pub const STORE_CARETS: Self = Self(0x2);

    #[must_use]
    pub fn none() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 == flag.0
    }
}

impl std::ops::BitOr for ModelFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// An in-memory RDF model: a node pool plus one or more sorted statement indexes.
pub struct Model {
    nodes: Nodes,
    default_order: Order,
    indexes: HashMap<Order, BTreeSet<IndexKey>>,
    live: HashSet<QuadKey>,
    carets: HashMap<QuadKey, Caret>,
    flags: ModelFlags,
    generation: u64,
    logger: LoggerHandle,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// A model with the default `SPO` index, graphs and carets retained.
    #[must_use]
    pub fn new() -> Self {
        Self::with_order(Order::Spo)
    }

    #[must_use]
    pub fn with_order(default_order: Order) -> Self {
        Self::with_order_and_allocator(default_order, Box::new(SystemAllocator))
    }

    /// A model whose node pool grows through `allocator` instead of the
    /// default [`SystemAllocator`], so a fault-injecting allocator can be
    /// exercised through [`Model::add`] and not just through [`Nodes`]
    /// directly.
    #[must_use]
    pub fn with_allocator(allocator: Box<dyn Allocator>) -> Self {
        Self::with_order_and_allocator(Order::Spo, allocator)
    }

    #[must_use]
    pub fn with_order_and_allocator(default_order: Order, allocator: Box<dyn Allocator>) -> Self {
        let mut indexes = HashMap::new();
        indexes.insert(default_order, BTreeSet::new());
        Self {
            nodes: Nodes::new(allocator),
            default_order,
            indexes,
            live: HashSet::new(),
            carets: HashMap::new(),
            flags: ModelFlags::STORE_GRAPHS | ModelFlags::STORE_CARETS,
            generation: 0,
            logger: null_logger(),
        }
    }

    #[must_use]
    pub fn with_flags(mut self, flags: ModelFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: LoggerHandle) -> Self {
        self.logger = logger;
        self
    }

    #[must_use]
    pub fn default_order(&self) -> Order {
        self.default_order
    }

    /// Number of distinct live statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Number of distinct nodes currently owned by this model's pool.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.size()
    }

    fn validate(subject: &Term, predicate: &Term, object: &Term, graph: Option<&Term>) -> Result<()> {
        let _ = object;
        if subject.kind() == NodeKind::Literal {
            return Err(Status::BadArg("subject must be an IRI or blank node".to_owned()));
        }
        if predicate.kind() != NodeKind::Iri {
            return Err(Status::BadArg("predicate must be an IRI".to_owned()));
        }
        if let Some(graph) = graph {
            if graph.kind() == NodeKind::Literal {
                return Err(Status::BadArg("graph must be an IRI or blank node".to_owned()));
            }
        }
        Ok(())
    }

    /// Inserts `(subject, predicate, object, graph)`, interning each node into
    /// this model's pool. Returns `Status::Failure` if the statement already
    /// exists (an informational no-op), after undoing the reference-count
    /// bump the duplicate lookup required. A failure partway through
    /// interning the four terms rolls back every successful intern that
    /// preceded it, so a rejected add leaves the pool exactly as it was.
    pub fn add(&mut self, subject: Term, predicate: Term, object: Term, graph: Option<Term>) -> Result<()> {
        self.add_with_optional_caret(subject, predicate, object, graph, None)
    }

    pub fn add_with_caret(
        &mut self,
        subject: Term,
        predicate: Term,
        object: Term,
        graph: Option<Term>,
        caret: Caret,
    ) -> Result<()> {
        self.add_with_optional_caret(subject, predicate, object, graph, Some(caret))
    }

    fn add_with_optional_caret(
        &mut self,
        subject: Term,
        predicate: Term,
        object: Term,
        graph: Option<Term>,
        caret: Option<Caret>,
    ) -> Result<()> {
        Self::validate(&subject, &predicate, &object, graph.as_ref())?;
        let graph = if self.flags.contains(ModelFlags::STORE_GRAPHS) {
            graph
        } else {
            None
        };
        let sid = self.nodes.intern_term(subject)?;
        let pid = match self.nodes.intern_term(predicate) {
            Ok(pid) => pid,
            Err(e) => {
                self.nodes.deref(sid);
                return Err(e);
            }
        };
        let oid = match self.nodes.intern_term(object) {
            Ok(oid) => oid,
            Err(e) => {
                self.nodes.deref(sid);
                self.nodes.deref(pid);
                return Err(e);
            }
        };
        let gid = match graph.map(|g| self.nodes.intern_term(g)).transpose() {
            Ok(gid) => gid,
            Err(e) => {
                self.nodes.deref(sid);
                self.nodes.deref(pid);
                self.nodes.deref(oid);
                return Err(e);
            }
        };
        let quad: QuadKey = (sid, pid, oid, gid);
        if !self.live.insert(quad) {
            self.nodes.deref(sid);
            self.nodes.deref(pid);
            self.nodes.deref(oid);
            if let Some(gid) = gid {
                self.nodes.deref(gid);
            }
            return Err(Status::Failure);
        }
        for (&order, index) in &mut self.indexes {
            index.insert(order.compose(quad));
        }
        if self.flags.contains(ModelFlags::STORE_CARETS) {
            if let Some(caret) = caret {
                self.carets.insert(quad, caret);
            }
        }
        self.generation += 1;
        Ok(())
    }

    fn erase_quad(&mut self, quad: QuadKey) -> Result<()> {
        if !self.live.remove(&quad) {
            return Err(Status::Failure);
        }
        for (&order, index) in &mut self.indexes {
            index.remove(&order.compose(quad));
        }
        self.carets.remove(&quad);
        let (s, p, o, g) = quad;
        self.nodes.deref(s);
        self.nodes.deref(p);
        self.nodes.deref(o);
        if let Some(g) = g {
            self.nodes.deref(g);
        }
        self.generation += 1;
        Ok(())
    }

    /// Removes the statement `cursor` points at and re-points it at the logical
    /// successor, leaving `cursor` itself still usable. Every other outstanding
    /// cursor is invalidated by the generation bump.
    pub fn erase(&mut self, cursor: &mut Cursor) -> Result<()> {
        let Some(key) = cursor.position else {
            return Err(Status::Failure);
        };
        let quad = cursor.order.decompose(key);
        self.erase_quad(quad)?;
        cursor.position = self.next_match(cursor.order, cursor.pattern, cursor.upper, key);
        cursor.generation = self.generation;
        Ok(())
    }

    /// Erases `cursor` and everything after it in its scan.
    pub fn erase_statements(&mut self, cursor: &mut Cursor) -> Result<()> {
        while cursor.position.is_some() {
            self.erase(cursor)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        for quad in std::mem::take(&mut self.live) {
            let (s, p, o, g) = quad;
            self.nodes.deref(s);
            self.nodes.deref(p);
            self.nodes.deref(o);
            if let Some(g) = g {
                self.nodes.deref(g);
            }
        }
        for index in self.indexes.values_mut() {
            index.clear();
        }
        self.carets.clear();
        self.generation += 1;
    }

    pub fn add_index(&mut self, order: Order) -> Result<()> {
        if self.indexes.contains_key(&order) {
            return Err(Status::Failure);
        }
        let built = self.live.iter().map(|&quad| order.compose(quad)).collect();
        self.indexes.insert(order, built);
        self.generation += 1;
        self.logger.log(&LogRecord::new(LogLevel::Debug, "added model index"));
        Ok(())
    }

    pub fn drop_index(&mut self, order: Order) -> Result<()> {
        if order == self.default_order {
            return Err(Status::BadCall("cannot drop the default index".to_owned()));
        }
        if self.indexes.remove(&order).is_none() {
            return Err(Status::Failure);
        }
        self.generation += 1;
        Ok(())
    }

    /// Translates a caller pattern into interned ids, or `None` ("fast-path for
    /// unknown nodes") if any bound term isn't present in this model's pool.
    fn id_pattern(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&Term>,
    ) -> Option<IdPattern> {
        let lookup = |t: Option<&Term>| -> Option<Option<NodeId>> {
            match t {
                None => Some(None),
                Some(term) => self.nodes.existing(term).map(Some),
            }
        };
        Some((lookup(subject)?, lookup(predicate)?, lookup(object)?, lookup(graph)?))
    }

    fn choose_index(&self, pattern: IdPattern) -> Order {
        Order::ALL
            .into_iter()
            .filter(|order| self.indexes.contains_key(order))
            .max_by_key(|&order| {
                // Ties favor the default index: give it a tiny edge by comparing
                // (prefix_len, is_default) lexicographically.
                (order.bound_prefix_len(pattern), order == self.default_order)
            })
            .unwrap_or(self.default_order)
    }

    fn first_match(&self, order: Order, pattern: IdPattern) -> Option<IndexKey> {
        let (lower, upper) = order.range_bounds(pattern);
        self.indexes
            .get(&order)?
            .range(lower..=upper)
            .copied()
            .find(|&key| order.matches(key, pattern))
    }

    fn next_match(&self, order: Order, pattern: IdPattern, upper: IndexKey, after: IndexKey) -> Option<IndexKey> {
        self.indexes
            .get(&order)?
            .range((std::ops::Bound::Excluded(after), std::ops::Bound::Included(upper)))
            .copied()
            .find(|&key| order.matches(key, pattern))
    }

    fn statement_at(&self, order: Order, key: IndexKey) -> Statement {
        let (s, p, o, g) = order.decompose(key);
        Statement {
            subject: self.nodes.get(s).clone(),
            predicate: self.nodes.get(p).clone(),
            object: self.nodes.get(o).clone(),
            graph: g.map(|g| self.nodes.get(g).clone()),
            caret: self.carets.get(&(s, p, o, g)).cloned(),
        }
    }

    pub fn ask(&self, subject: Option<&Term>, predicate: Option<&Term>, object: Option<&Term>, graph: Option<&Term>) -> bool {
        let Some(pattern) = self.id_pattern(subject, predicate, object, graph) else {
            return false;
        };
        let order = self.choose_index(pattern);
        self.first_match(order, pattern).is_some()
    }

    pub fn count(&self, subject: Option<&Term>, predicate: Option<&Term>, object: Option<&Term>, graph: Option<&Term>) -> usize {
        let Some(pattern) = self.id_pattern(subject, predicate, object, graph) else {
            return 0;
        };
        let order = self.choose_index(pattern);
        let (lower, upper) = order.range_bounds(pattern);
        self.indexes
            .get(&order)
            .into_iter()
            .flat_map(|index| index.range(lower..=upper))
            .filter(|&&key| order.matches(key, pattern))
            .count()
    }

    /// Returns the single unbound slot's value when exactly one of the four
    /// slots is `None` and the match is unique; `None` otherwise.
    pub fn get(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&Term>,
    ) -> Option<Term> {
        let unbound_count = [subject, predicate, object, graph].iter().filter(|t| t.is_none()).count();
        if unbound_count != 1 {
            return None;
        }
        let pattern = self.id_pattern(subject, predicate, object, graph)?;
        let order = self.choose_index(pattern);
        let (lower, upper) = order.range_bounds(pattern);
        let mut matches = self
            .indexes
            .get(&order)
            .into_iter()
            .flat_map(|index| index.range(lower..=upper))
            .filter(|&&key| order.matches(key, pattern));
        let first = *matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        let (s, p, o, g) = order.decompose(first);
        Some(if subject.is_none() {
            self.nodes.get(s).clone()
        } else if predicate.is_none() {
            self.nodes.get(p).clone()
        } else if object.is_none() {
            self.nodes.get(o).clone()
        } else {
            g.map(|g| self.nodes.get(g).clone())?
        })
    }

    /// Scans matches in the index best covering `pattern`.
    #[must_use]
    pub fn find(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&Term>,
    ) -> Cursor {
        let Some(pattern) = self.id_pattern(subject, predicate, object, graph) else {
            return Cursor::at_end(self.default_order, (None, None, None, None));
        };
        let order = self.choose_index(pattern);
        let (_, upper) = order.range_bounds(pattern);
        let position = self.first_match(order, pattern);
        Cursor {
            order,
            pattern,
            upper,
            position,
            generation: self.generation,
        }
    }

    #[must_use]
    pub fn begin(&self) -> Cursor {
        self.begin_ordered(self.default_order)
    }

    #[must_use]
    pub fn end(&self) -> Cursor {
        Cursor::at_end(self.default_order, (None, None, None, None))
    }

    /// Full scan in `order`, or an at-end cursor if that order has no active
    /// index.
    #[must_use]
    pub fn begin_ordered(&self, order: Order) -> Cursor {
        let pattern: IdPattern = (None, None, None, None);
        if !self.indexes.contains_key(&order) {
            return Cursor::at_end(order, pattern);
        }
        let (_, upper) = order.range_bounds(pattern);
        Cursor {
            order,
            pattern,
            upper,
            position: self.first_match(order, pattern),
            generation: self.generation,
        }
    }

    /// Feeds every live statement, in `order`, to `sink` (a "describer" over
    /// the whole model).
    pub fn describe(&self, order: Order, sink: &mut dyn Sink) -> Result<()> {
        let Some(index) = self.indexes.get(&order) else {
            return Ok(());
        };
        for &key in index {
            let statement = self.statement_at(order, key);
            sink.statement(StatementFlags::none(), &statement)?;
        }
        Ok(())
    }
}

/// A [`Sink`] that inserts every statement event it receives into a [`Model`].
pub struct Inserter<'a> {
    model: &'a mut Model,
}

impl<'a> Inserter<'a> {
    pub fn new(model: &'a mut Model) -> Self {
        Self { model }
    }
}

impl Sink for Inserter<'_> {
    fn statement(&mut self, _flags: StatementFlags, statement: &Statement) -> Result<()> {
        match self.model.add_with_optional_caret(
            statement.subject.clone(),
            statement.predicate.clone(),
            statement.object.clone(),
            statement.graph.clone(),
            statement.caret.clone(),
        ) {
            Ok(()) | Err(Status::Failure) => Ok(()),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> Term {
        Term::Iri(s.into())
    }

    #[test]
    fn add_is_idempotent_and_tracks_node_count() {
        let mut model = Model::new();
        model.add(iri("s"), iri("p"), iri("o"), None).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.node_count(), 3);
        assert_eq!(model.add(iri("s"), iri("p"), iri("o"), None), Err(Status::Failure));
        assert_eq!(model.len(), 1);
        assert_eq!(model.node_count(), 3);
    }

    #[test]
    fn add_rolls_back_earlier_interns_when_a_later_one_faults() {
        use crate::alloc::FaultingAllocator;

        let mut model = Model::with_allocator(Box::new(FaultingAllocator::new(Some(1))));
        let result = model.add(iri("s"), iri("p"), iri("o"), None);
        assert_eq!(result, Err(Status::BadAlloc));
        assert_eq!(model.len(), 0);
        assert_eq!(model.node_count(), 0);
    }

    #[test]
    fn ask_and_get_single_unbound_slot() {
        let mut model = Model::new();
        model.add(iri("s"), iri("p"), iri("o"), None).unwrap();
        assert!(model.ask(Some(&iri("s")), None, None, None));
        assert!(!model.ask(Some(&iri("nope")), None, None, None));
        assert_eq!(model.get(Some(&iri("s")), Some(&iri("p")), None, None), Some(iri("o")));
        assert_eq!(model.get(None, None, None, None), None);
    }

    #[test]
    fn find_across_multiple_indexes_yields_unequal_cursors_until_end() {
        let mut model = Model::new();
        model.add_index(Order::Ops).unwrap();
        model.add(iri("a"), iri("b"), iri("c"), None).unwrap();

        let mut c1 = model.find(Some(&iri("a")), None, None, None);
        let mut c2 = model.find(Some(&iri("a")), Some(&iri("b")), None, None);
        let mut c3 = model.find(None, None, Some(&iri("c")), None);
        assert_eq!(c1.get(&model), c2.get(&model));
        assert_eq!(c2.get(&model), c3.get(&model));
        assert_ne!(c1, c2);

        c1.advance(&model).unwrap();
        c2.advance(&model).unwrap();
        c3.advance(&model).unwrap();
        assert!(c1.is_at_end());
        assert_eq!(c1, model.end());
        assert_eq!(c1, c2);
        assert_eq!(c2, c3);
    }

    #[test]
    fn erase_repoints_cursor_and_invalidates_others() {
        let mut model = Model::new();
        model.add(iri("s"), iri("p"), iri("o1"), None).unwrap();
        model.add(iri("s"), iri("p"), iri("o2"), None).unwrap();

        let stale = model.find(Some(&iri("s")), None, None, None);
        let mut cursor = model.find(Some(&iri("s")), None, None, None);
        let first = cursor.get(&model).unwrap();
        model.erase(&mut cursor).unwrap();
        assert_eq!(model.len(), 1);
        let second = cursor.get(&model).unwrap();
        assert_ne!(first, second);

        assert_eq!(stale.get(&model), None);
        let mut stale = stale;
        assert_eq!(stale.advance(&model), Err(Status::BadCursor));
    }

    #[test]
    fn erase_preserves_node_refcounts() {
        let mut model = Model::new();
        model.add(iri("s"), iri("p"), iri("o"), None).unwrap();
        model.add(iri("s"), iri("p2"), iri("o"), None).unwrap();
        let mut cursor = model.find(Some(&iri("s")), Some(&iri("p")), None, None);
        model.erase(&mut cursor).unwrap();
        // `s` and `o` are still referenced by the second statement; `p` is not.
        assert_eq!(model.node_count(), 3);
    }

    #[test]
    fn drop_index_rejects_default_and_missing() {
        let mut model = Model::new();
        assert_eq!(
            model.drop_index(Order::Spo),
            Err(Status::BadCall("cannot drop the default index".to_owned()))
        );
        assert_eq!(model.drop_index(Order::Gpos), Err(Status::Failure));
    }

    #[test]
    fn store_graphs_false_collapses_graph_duplicates() {
        let mut model = Model::new().with_flags(ModelFlags::STORE_CARETS);
        model.add(iri("s"), iri("p"), iri("o"), Some(iri("g1"))).unwrap();
        assert_eq!(
            model.add(iri("s"), iri("p"), iri("o"), Some(iri("g2"))),
            Err(Status::Failure)
        );
        assert_eq!(model.len(), 1);
    }
}
