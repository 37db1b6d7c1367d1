//! The 12 statement orderings and the key shape shared by every index.
//!
//! Grounded on `oxigraph::storage::numeric_encoder`'s family of quad orderings
//! (`SPOG`, `POSG`, `OSPG`, `GSPO`, `GPOS`, `GOSP`): each index stores the *same*
//! quads, just sorted by a different component priority, so a pattern query can
//! pick whichever index covers the longest bound prefix.

use crate::nodes::NodeId;

/// One of the four statement slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    S,
    P,
    O,
    G,
}

/// A statement order: the component priority a sorted index is keyed by.
///
/// The six non-`G`-prefixed orders sort by a permutation of subject/predicate/
/// object with the graph as a trailing tiebreaker; the six `G`-prefixed orders
/// sort by graph first, then a permutation of the other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Spo,
    Sop,
    Ops,
    Osp,
    Pso,
    Pos,
    Gspo,
    Gsop,
    Gops,
    Gosp,
    Gpso,
    Gpos,
}

/// The key a sorted index actually stores: four optional node handles in the
/// order's component priority. The three subject/predicate/object positions are
/// always `Some`; the graph position is `None` for the default graph.
pub type IndexKey = [Option<NodeId>; 4];

/// The canonical, order-independent identity of a statement.
pub type QuadKey = (NodeId, NodeId, NodeId, Option<NodeId>);

/// A caller's bound/unbound query over the four slots, as interned handles.
pub type IdPattern = (Option<NodeId>, Option<NodeId>, Option<NodeId>, Option<NodeId>);

impl Order {
    pub const ALL: [Self; 12] = [
        Self::Spo,
        Self::Sop,
        Self::Ops,
        Self::Osp,
        Self::Pso,
        Self::Pos,
        Self::Gspo,
        Self::Gsop,
        Self::Gops,
        Self::Gosp,
        Self::Gpso,
        Self::Gpos,
    ];

    fn components(self) -> [Component; 4] {
        use Component::{G, O, P, S};
        match self {
            Self::Spo => [S, P, O, G],
            Self::Sop => [S, O, P, G],
            Self::Ops => [O, P, S, G],
            Self::Osp => [O, S, P, G],
            Self::Pso => [P, S, O, G],
            Self::Pos => [P, O, S, G],
            Self::Gspo => [G, S, P, O],
            Self::Gsop => [G, S, O, P],
            Self::Gops => [G, O, P, S],
            Self::Gosp => [G, O, S, P],
            Self::Gpso => [G, P, S, O],
            Self::Gpos => [G, P, O, S],
        }
    }

    /// Builds the key this order stores for `quad`.
    #[must_use]
    pub fn compose(self, quad: QuadKey) -> IndexKey {
        let (s, p, o, g) = quad;
        self.components().map(|c| match c {
            Component::S => Some(s),
            Component::P => Some(p),
            Component::O => Some(o),
            Component::G => g,
        })
    }

    /// Recovers the canonical `(s, p, o, g)` a stored `key` denotes.
    #[must_use]
    pub fn decompose(self, key: IndexKey) -> QuadKey {
        let comps = self.components();
        let mut s = None;
        let mut p = None;
        let mut o = None;
        let mut g = None;
        for (component, value) in comps.iter().zip(key.iter()) {
            match component {
                Component::S => s = *value,
                Component::P => p = *value,
                Component::O => o = *value,
                Component::G => g = *value,
            }
        }
        (
            s.expect("subject slot always populated"),
            p.expect("predicate slot always populated"),
            o.expect("object slot always populated"),
            g,
        )
    }

    /// Number of leading components this order has in common with `pattern`'s
    /// bound slots, stopping at the first unbound one. Used to pick the index
    /// that covers the longest bound prefix of a query.
    #[must_use]
    pub fn bound_prefix_len(self, pattern: IdPattern) -> usize {
        let (s, p, o, g) = pattern;
        let mut len = 0;
        for component in self.components() {
            let bound = match component {
                Component::S => s.is_some(),
                Component::P => p.is_some(),
                Component::O => o.is_some(),
                Component::G => g.is_some(),
            };
            if !bound {
                break;
            }
            len += 1;
        }
        len
    }

    /// Does `key` satisfy every bound slot of `pattern`, not just the leading
    /// prefix a range scan already guarantees?
    #[must_use]
    pub fn matches(self, key: IndexKey, pattern: IdPattern) -> bool {
        let (s, p, o, g) = self.decompose(key);
        let (ps, pp, po, pg) = pattern;
        ps.map_or(true, |v| v == s)
            && pp.map_or(true, |v| v == p)
            && po.map_or(true, |v| v == o)
            && pg.map_or(true, |v| v == g)
    }

    /// Inclusive `(lower, upper)` range bounds covering every key whose leading
    /// `bound_prefix_len(pattern)` components equal `pattern`'s bound values.
    #[must_use]
    pub fn range_bounds(self, pattern: IdPattern) -> (IndexKey, IndexKey) {
        let len = self.bound_prefix_len(pattern);
        let (s, p, o, g) = pattern;
        let bound_value = |component: Component| -> Option<NodeId> {
            match component {
                Component::S => s,
                Component::P => p,
                Component::O => o,
                Component::G => g,
            }
        };
        let comps = self.components();
        let mut lower = [None; 4];
        let mut upper = [Some(NodeId::MAX); 4];
        for (i, component) in comps.iter().enumerate() {
            if i < len {
                let value = bound_value(*component);
                lower[i] = value;
                upper[i] = value;
            }
        }
        (lower, upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;
    use crate::nodes::Nodes;

    fn ids() -> (NodeId, NodeId, NodeId) {
        let mut nodes = Nodes::default();
        let a = nodes.intern(NodeSpec::Iri("http://example.org/1".into())).unwrap();
        let b = nodes.intern(NodeSpec::Iri("http://example.org/2".into())).unwrap();
        let c = nodes.intern(NodeSpec::Iri("http://example.org/3".into())).unwrap();
        (a, b, c)
    }

    #[test]
    fn compose_decompose_round_trips() {
        let (a, b, c) = ids();
        let quad: QuadKey = (a, b, c, None);
        for order in Order::ALL {
            assert_eq!(order.decompose(order.compose(quad)), quad);
        }
    }

    #[test]
    fn bound_prefix_len_stops_at_first_gap() {
        let (a, b, c) = ids();
        let pattern: IdPattern = (Some(a), None, Some(c), None);
        assert_eq!(Order::Spo.bound_prefix_len(pattern), 1);
        assert_eq!(Order::Pso.bound_prefix_len((None, Some(a), None, None)), 1);
        assert_eq!(Order::Spo.bound_prefix_len((Some(a), Some(b), None, None)), 2);
    }
}
