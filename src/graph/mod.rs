//! The reply graph behind a conversation.
//!
//! [`ConvoGraph`] materializes a [`Conversation`] into a petgraph
//! structure so graph algorithms run over indices instead of uids.
//! Edges point from a reply toward the post it replies to, restricted
//! to posts that are present; dangling targets and self-references are
//! dropped at build time. Two views are kept:
//!
//! - the **directed** graph, used for in/out degrees, reciprocity, and
//!   the longest reply chain
//! - the **undirected simple** view (reciprocal edges collapsed), used
//!   for distances, centrality, clustering, and density
//!
//! Depths are computed eagerly at build time. A post's depth is one
//! more than the smallest depth among its chosen parents: parents
//! whose timestamp strictly precedes the post's when any exist,
//! otherwise all in-conversation parents. Reply data scraped from the
//! wild occasionally contains cycles; the traversal skips parents
//! still being resolved and raises an anomaly flag instead of looping.

mod metrics;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::BTreeMap;

use crate::convo::Conversation;
use crate::message::Uid;

/// A materialized reply graph with eagerly computed depths.
pub struct ConvoGraph {
    graph: DiGraph<Uid, ()>,
    nodes: BTreeMap<Uid, NodeIndex>,
    /// Sorted, deduplicated neighbor lists over the undirected view,
    /// indexed by node index.
    undirected: Vec<Vec<usize>>,
    depths: BTreeMap<Uid, usize>,
    has_cycle: bool,
}

impl ConvoGraph {
    /// Materializes the reply graph of a conversation.
    pub fn build(convo: &Conversation) -> Self {
        let mut graph: DiGraph<Uid, ()> = DiGraph::new();
        let mut nodes: BTreeMap<Uid, NodeIndex> = BTreeMap::new();

        for uid in convo.posts().keys() {
            let ix = graph.add_node(uid.clone());
            nodes.insert(uid.clone(), ix);
        }
        for uid in convo.posts().keys() {
            for parent in convo.parents_of(uid) {
                graph.add_edge(nodes[uid], nodes[parent], ());
            }
        }

        let n = graph.node_count();
        let mut undirected: Vec<std::collections::BTreeSet<usize>> = vec![Default::default(); n];
        for edge in graph.edge_indices() {
            if let Some((a, b)) = graph.edge_endpoints(edge) {
                undirected[a.index()].insert(b.index());
                undirected[b.index()].insert(a.index());
            }
        }
        let undirected: Vec<Vec<usize>> =
            undirected.into_iter().map(|s| s.into_iter().collect()).collect();

        let (depth_by_ix, has_cycle) = Self::compute_depths(convo, &graph, &nodes);
        let depths = nodes
            .iter()
            .map(|(uid, ix)| (uid.clone(), depth_by_ix[ix.index()]))
            .collect();

        Self {
            graph,
            nodes,
            undirected,
            depths,
            has_cycle,
        }
    }

    /// Resolves every post's depth with an explicit stack so deep
    /// chains cannot overflow and cycles cannot loop.
    fn compute_depths(
        convo: &Conversation,
        graph: &DiGraph<Uid, ()>,
        nodes: &BTreeMap<Uid, NodeIndex>,
    ) -> (Vec<usize>, bool) {
        const NEW: u8 = 0;
        const OPEN: u8 = 1;
        const DONE: u8 = 2;

        let n = graph.node_count();
        let mut stamps: Vec<Option<f64>> = vec![None; n];
        for (uid, ix) in nodes {
            stamps[ix.index()] = convo.posts()[uid].created_at();
        }

        // parents considered for depth: the temporally preceding ones
        // when any exist, otherwise every in-conversation parent
        let mut chosen: Vec<Vec<usize>> = vec![Vec::new(); n];
        for ix in graph.node_indices() {
            let parents: Vec<usize> = graph
                .neighbors_directed(ix, Direction::Outgoing)
                .map(NodeIndex::index)
                .collect();
            let preceding: Vec<usize> = match stamps[ix.index()] {
                Some(child_stamp) => parents
                    .iter()
                    .copied()
                    .filter(|&p| matches!(stamps[p], Some(s) if s < child_stamp))
                    .collect(),
                None => Vec::new(),
            };
            chosen[ix.index()] = if preceding.is_empty() { parents } else { preceding };
        }

        let mut mark = vec![NEW; n];
        let mut depth = vec![0usize; n];
        let mut has_cycle = false;

        for start in 0..n {
            if mark[start] == DONE {
                continue;
            }
            let mut stack: Vec<(usize, bool)> = vec![(start, false)];
            while let Some((current, expanded)) = stack.pop() {
                if expanded {
                    depth[current] = chosen[current]
                        .iter()
                        .filter(|&&p| mark[p] == DONE)
                        .map(|&p| depth[p] + 1)
                        .min()
                        .unwrap_or(0);
                    mark[current] = DONE;
                } else {
                    if mark[current] != NEW {
                        continue;
                    }
                    mark[current] = OPEN;
                    stack.push((current, true));
                    for &parent in &chosen[current] {
                        match mark[parent] {
                            NEW => stack.push((parent, false)),
                            OPEN => has_cycle = true,
                            _ => {}
                        }
                    }
                }
            }
        }
        (depth, has_cycle)
    }

    /// Number of posts in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed reply edges between present posts.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the reply data contained a cycle. Depths are still
    /// defined; the in-cycle posts closest to a source got depth 0.
    pub fn has_cycle(&self) -> bool {
        self.has_cycle
    }

    /// Replies received by this post from inside the conversation.
    pub fn in_degree(&self, uid: &Uid) -> Option<usize> {
        let ix = self.nodes.get(uid)?;
        Some(self.graph.neighbors_directed(*ix, Direction::Incoming).count())
    }

    /// In-conversation posts this post replies to.
    pub fn out_degree(&self, uid: &Uid) -> Option<usize> {
        let ix = self.nodes.get(uid)?;
        Some(self.graph.neighbors_directed(*ix, Direction::Outgoing).count())
    }

    /// Total directed degree inside the conversation.
    pub fn degree(&self, uid: &Uid) -> Option<usize> {
        Some(self.in_degree(uid)? + self.out_degree(uid)?)
    }

    /// Depth of every post.
    pub fn depths(&self) -> &BTreeMap<Uid, usize> {
        &self.depths
    }

    /// Depth of one post.
    pub fn depth(&self, uid: &Uid) -> Option<usize> {
        self.depths.get(uid).copied()
    }

    /// Post count per depth level.
    pub fn depth_distribution(&self) -> BTreeMap<usize, usize> {
        let mut dist = BTreeMap::new();
        for d in self.depths.values() {
            *dist.entry(*d).or_insert(0) += 1;
        }
        dist
    }

    /// Deepest depth present, 0 for an empty graph.
    pub fn tree_depth(&self) -> usize {
        self.depths.values().copied().max().unwrap_or(0)
    }

    /// Largest number of posts sharing one depth, 0 for an empty graph.
    pub fn tree_width(&self) -> usize {
        self.depth_distribution().values().copied().max().unwrap_or(0)
    }

    pub(crate) fn inner(&self) -> &DiGraph<Uid, ()> {
        &self.graph
    }

    pub(crate) fn undirected_neighbors(&self) -> &[Vec<usize>] {
        &self.undirected
    }

    pub(crate) fn uid_at(&self, ix: usize) -> &Uid {
        &self.graph[NodeIndex::new(ix)]
    }
}
