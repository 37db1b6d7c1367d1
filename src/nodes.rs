//! The node store: a hash-consed pool of [`Term`]s with per-entry reference counts.
//!
//! Grounded on `oxrdf::interning::Interner`, which hash-conses terms into `Spur`
//! handles via a `lasso::Rodeo`. `Rodeo` never frees an entry, so it cannot carry
//! a live reference count; this store keeps its own slab (`slots`) so that
//! [`Nodes::deref`] can free an entry once its count hits zero.

use crate::alloc::{Allocator, SystemAllocator};
use crate::error::{Result, Status};
use crate::node::{NodeSpec, Term};
use rustc_hash::FxHashMap;

/// A stable handle into a [`Nodes`] pool. Two handles are equal iff they name the
/// same slot; because interning is canonical, handle equality is value equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// The largest representable handle, used by the model as an inclusive upper
    /// sentinel when building index range-scan bounds.
    pub(crate) const MAX: Self = Self(u32::MAX);

    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

struct Slot {
    term: Term,
    refcount: u32,
}

/// A hash-consed pool of RDF terms. Each distinct term is stored once; `intern`
/// returns a stable [`NodeId`] and bumps the entry's reference count, `deref`
/// drops it and frees the slot once the count reaches zero.
pub struct Nodes {
    slots: Vec<Option<Slot>>,
    free: Vec<u32>,
    index: FxHashMap<Term, NodeId>,
    allocator: Box<dyn Allocator>,
}

impl Default for Nodes {
    fn default() -> Self {
        Self::new(Box::new(SystemAllocator))
    }
}

impl Nodes {
    #[must_use]
    pub fn new(allocator: Box<dyn Allocator>) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: FxHashMap::default(),
            allocator,
        }
    }

    /// Interns `spec`'s denoted term, returning its handle. Idempotent on value:
    /// two calls with an equal logical value return the same [`NodeId`], and
    /// `size()` only grows on the first of them.
    pub fn intern(&mut self, spec: NodeSpec) -> Result<NodeId> {
        let term = spec.into_term()?;
        if let Some(&id) = self.index.get(&term) {
            let slot = self.slots[id.index()]
                .as_mut()
                .expect("indexed id always has a live slot");
            slot.refcount += 1;
            return Ok(id);
        }
        self.allocator.reserve(1)?;
        let id = if let Some(reused) = self.free.pop() {
            NodeId(reused)
        } else {
            let id = NodeId(u32::try_from(self.slots.len()).map_err(|_| Status::BadAlloc)?);
            self.slots.push(None);
            id
        };
        self.slots[id.index()] = Some(Slot {
            term: term.clone(),
            refcount: 1,
        });
        self.index.insert(term, id);
        Ok(id)
    }

    /// Interns an already-built term directly (used by the model when re-interning
    /// a term into its own pool, and by tests).
    pub fn intern_term(&mut self, term: Term) -> Result<NodeId> {
        if let Some(&id) = self.index.get(&term) {
            self.slots[id.index()]
                .as_mut()
                .expect("indexed id always has a live slot")
                .refcount += 1;
            return Ok(id);
        }
        self.allocator.reserve(1)?;
        let id = if let Some(reused) = self.free.pop() {
            NodeId(reused)
        } else {
            let id = NodeId(u32::try_from(self.slots.len()).map_err(|_| Status::BadAlloc)?);
            self.slots.push(None);
            id
        };
        self.slots[id.index()] = Some(Slot {
            term: term.clone(),
            refcount: 1,
        });
        self.index.insert(term, id);
        Ok(id)
    }

    /// Looks up a term's handle without interning it.
    #[must_use]
    pub fn existing(&self, term: &Term) -> Option<NodeId> {
        self.index.get(term).copied()
    }

    /// Resolves a handle back to its term. Panics on a stale/foreign id, the same
    /// contract as indexing a `Vec` out of bounds: handles are only ever handed out
    /// by this pool and are never valid after [`Nodes::deref`] frees them.
    #[must_use]
    pub fn get(&self, id: NodeId) -> &Term {
        &self.slots[id.index()]
            .as_ref()
            .expect("dereferencing a freed or foreign NodeId")
            .term
    }

    /// Decrements `id`'s reference count, freeing the slot at zero.
    pub fn deref(&mut self, id: NodeId) {
        let Some(slot) = self.slots[id.index()].as_mut() else {
            return;
        };
        slot.refcount -= 1;
        if slot.refcount == 0 {
            let term = self.slots[id.index()].take().expect("just matched Some").term;
            self.index.remove(&term);
            self.free.push(id.0);
        }
    }

    /// Current reference count of `id`, or 0 if freed/unknown.
    #[must_use]
    pub fn refcount(&self, id: NodeId) -> u32 {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .map_or(0, |slot| slot.refcount)
    }

    /// Number of live distinct terms in the pool.
    #[must_use]
    pub fn size(&self) -> usize {
        self.index.len()
    }
}
