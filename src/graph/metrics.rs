//! Graph-theoretic statistics over the reply graph.
//!
//! Every metric degrades to a documented sentinel instead of raising
//! when its precondition is unmet: `None` for metrics undefined on
//! disconnected or too-small graphs, `0.0` for averages over nothing.
//! Callers never have to guard a call with a connectivity check.

use petgraph::algo::toposort;
use petgraph::Direction;
use std::collections::{BTreeMap, HashSet, VecDeque};

use crate::message::Uid;

use super::ConvoGraph;

impl ConvoGraph {
    /// Density of the undirected simple view: `2m / (n(n-1))`.
    /// Graphs with fewer than two posts have density 0.
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n < 2 {
            return 0.0;
        }
        let m = self.simple_edge_count();
        2.0 * m as f64 / (n as f64 * (n as f64 - 1.0))
    }

    /// Node counts indexed by undirected degree, trailing zeros
    /// trimmed to the largest degree present. Empty for an empty graph.
    pub fn degree_histogram(&self) -> Vec<usize> {
        let adjacency = self.undirected_neighbors();
        let max = adjacency.iter().map(Vec::len).max();
        let Some(max) = max else { return Vec::new() };
        let mut hist = vec![0usize; max + 1];
        for neighbors in adjacency {
            hist[neighbors.len()] += 1;
        }
        hist
    }

    /// Node counts per in-degree (replies received).
    pub fn in_degree_histogram(&self) -> BTreeMap<usize, usize> {
        self.directed_degree_histogram(Direction::Incoming)
    }

    /// Node counts per out-degree (posts replied to).
    pub fn out_degree_histogram(&self) -> BTreeMap<usize, usize> {
        self.directed_degree_histogram(Direction::Outgoing)
    }

    fn directed_degree_histogram(&self, direction: Direction) -> BTreeMap<usize, usize> {
        let mut hist = BTreeMap::new();
        for ix in self.inner().node_indices() {
            let degree = self.inner().neighbors_directed(ix, direction).count();
            *hist.entry(degree).or_insert(0) += 1;
        }
        hist
    }

    /// Eccentricity of every post over the undirected view. `None`
    /// when the graph is empty or disconnected.
    pub fn eccentricity(&self) -> Option<BTreeMap<Uid, usize>> {
        let n = self.node_count();
        if n == 0 {
            return None;
        }
        let mut out = BTreeMap::new();
        for ix in 0..n {
            let mut ecc = 0usize;
            for d in self.bfs_distances(ix) {
                ecc = ecc.max(d?);
            }
            out.insert(self.uid_at(ix).clone(), ecc);
        }
        Some(out)
    }

    /// Largest eccentricity. `None` below two posts or when
    /// disconnected.
    pub fn diameter(&self) -> Option<usize> {
        if self.node_count() < 2 {
            return None;
        }
        let ecc = self.eccentricity()?;
        ecc.values().copied().max()
    }

    /// Smallest eccentricity. `None` below two posts or when
    /// disconnected.
    pub fn radius(&self) -> Option<usize> {
        if self.node_count() < 2 {
            return None;
        }
        let ecc = self.eccentricity()?;
        ecc.values().copied().min()
    }

    /// Sum of distances over all unordered post pairs. `None` when the
    /// graph is empty or disconnected; a single post scores 0.
    pub fn wiener_index(&self) -> Option<f64> {
        let n = self.node_count();
        if n == 0 {
            return None;
        }
        let mut total = 0u64;
        for ix in 0..n {
            for d in self.bfs_distances(ix) {
                total += d? as u64;
            }
        }
        Some(total as f64 / 2.0)
    }

    /// Pearson correlation between the undirected degrees at the two
    /// ends of each edge. `None` when there are no edges or the degree
    /// sequence is degenerate (zero variance on either side).
    pub fn assortativity(&self) -> Option<f64> {
        let adjacency = self.undirected_neighbors();
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        // adjacency lists hold each edge in both orientations, which
        // is exactly the symmetrization the coefficient needs
        for (v, neighbors) in adjacency.iter().enumerate() {
            for &w in neighbors {
                xs.push(adjacency[v].len() as f64);
                ys.push(adjacency[w].len() as f64);
            }
        }
        pearson(&xs, &ys)
    }

    /// Mean local clustering coefficient over the undirected view.
    /// Posts with fewer than two neighbors contribute 0; an empty
    /// graph scores 0.
    pub fn average_clustering(&self) -> f64 {
        let adjacency = self.undirected_neighbors();
        let n = adjacency.len();
        if n == 0 {
            return 0.0;
        }
        let mut total = 0.0;
        for neighbors in adjacency {
            let k = neighbors.len();
            if k < 2 {
                continue;
            }
            let mut closed = 0usize;
            for (offset, &a) in neighbors.iter().enumerate() {
                for &b in &neighbors[offset + 1..] {
                    if adjacency[a].binary_search(&b).is_ok() {
                        closed += 1;
                    }
                }
            }
            total += 2.0 * closed as f64 / (k as f64 * (k as f64 - 1.0));
        }
        total / n as f64
    }

    /// Undirected degree scaled by `n - 1`. Graphs with a single post
    /// score 1 by convention.
    pub fn degree_centrality(&self) -> BTreeMap<Uid, f64> {
        let n = self.node_count();
        let adjacency = self.undirected_neighbors();
        (0..n)
            .map(|ix| {
                let score = if n <= 1 {
                    1.0
                } else {
                    adjacency[ix].len() as f64 / (n as f64 - 1.0)
                };
                (self.uid_at(ix).clone(), score)
            })
            .collect()
    }

    /// Closeness centrality with the Wasserman-Faust correction for
    /// disconnected graphs: `((r-1)/(n-1)) * ((r-1)/total)` where `r`
    /// counts reachable posts. Unreachable-from-everything posts
    /// score 0.
    pub fn closeness_centrality(&self) -> BTreeMap<Uid, f64> {
        let n = self.node_count();
        let mut out = BTreeMap::new();
        for ix in 0..n {
            let mut reachable = 0u64;
            let mut total = 0u64;
            for d in self.bfs_distances(ix).into_iter().flatten() {
                reachable += 1;
                total += d as u64;
            }
            let score = if total > 0 && n > 1 {
                let r = reachable as f64 - 1.0;
                (r / total as f64) * (r / (n as f64 - 1.0))
            } else {
                0.0
            };
            out.insert(self.uid_at(ix).clone(), score);
        }
        out
    }

    /// Betweenness centrality via Brandes' algorithm over the
    /// undirected view, normalized by `(n-1)(n-2)`. Every post scores
    /// 0 below three posts.
    pub fn betweenness_centrality(&self) -> BTreeMap<Uid, f64> {
        let n = self.node_count();
        let adjacency = self.undirected_neighbors();
        let mut score = vec![0.0f64; n];

        if n >= 3 {
            for s in 0..n {
                let mut order: Vec<usize> = Vec::with_capacity(n);
                let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
                let mut sigma = vec![0.0f64; n];
                let mut dist: Vec<i64> = vec![-1; n];
                let mut queue = VecDeque::new();

                sigma[s] = 1.0;
                dist[s] = 0;
                queue.push_back(s);
                while let Some(v) = queue.pop_front() {
                    order.push(v);
                    for &w in &adjacency[v] {
                        if dist[w] < 0 {
                            dist[w] = dist[v] + 1;
                            queue.push_back(w);
                        }
                        if dist[w] == dist[v] + 1 {
                            sigma[w] += sigma[v];
                            preds[w].push(v);
                        }
                    }
                }

                let mut delta = vec![0.0f64; n];
                for &w in order.iter().rev() {
                    for &v in &preds[w] {
                        delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                    }
                    if w != s {
                        score[w] += delta[w];
                    }
                }
            }
            let scale = 1.0 / ((n as f64 - 1.0) * (n as f64 - 2.0));
            for v in &mut score {
                *v *= scale;
            }
        }

        score
            .into_iter()
            .enumerate()
            .map(|(ix, s)| (self.uid_at(ix).clone(), s))
            .collect()
    }

    /// Rich-club coefficient per degree threshold `k`: the density of
    /// the subgraph induced by posts of degree greater than `k`.
    /// `None` below three posts or without edges; thresholds stop once
    /// fewer than two posts qualify.
    pub fn rich_club(&self) -> Option<BTreeMap<usize, f64>> {
        let n = self.node_count();
        let adjacency = self.undirected_neighbors();
        let edges: Vec<(usize, usize)> = adjacency
            .iter()
            .enumerate()
            .flat_map(|(v, neighbors)| {
                neighbors.iter().filter(move |&&w| v < w).map(move |&w| (v, w))
            })
            .collect();
        if n < 3 || edges.is_empty() {
            return None;
        }

        let max_degree = adjacency.iter().map(Vec::len).max().unwrap_or(0);
        let mut out = BTreeMap::new();
        for k in 0..max_degree {
            let members: HashSet<usize> = (0..n).filter(|&v| adjacency[v].len() > k).collect();
            if members.len() < 2 {
                break;
            }
            let within = edges
                .iter()
                .filter(|(a, b)| members.contains(a) && members.contains(b))
                .count();
            let size = members.len() as f64;
            out.insert(k, 2.0 * within as f64 / (size * (size - 1.0)));
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }

    /// Fraction of directed reply edges whose reverse edge also
    /// exists. 0 when there are no edges.
    pub fn reciprocity(&self) -> f64 {
        let mut edges: HashSet<(usize, usize)> = HashSet::new();
        for edge in self.inner().edge_indices() {
            if let Some((a, b)) = self.inner().edge_endpoints(edge) {
                edges.insert((a.index(), b.index()));
            }
        }
        if edges.is_empty() {
            return 0.0;
        }
        let mutual = edges
            .iter()
            .filter(|(a, b)| edges.contains(&(*b, *a)))
            .count();
        mutual as f64 / edges.len() as f64
    }

    /// Number of posts on the longest directed reply chain. Falls back
    /// to `tree_depth + 1` when cyclic data defeats the topological
    /// order.
    pub fn longest_path(&self) -> usize {
        if self.node_count() == 0 {
            return 0;
        }
        match toposort(self.inner(), None) {
            Ok(order) => {
                let mut best = vec![1usize; self.node_count()];
                for v in order {
                    for w in self.inner().neighbors_directed(v, Direction::Outgoing) {
                        best[w.index()] = best[w.index()].max(best[v.index()] + 1);
                    }
                }
                best.into_iter().max().unwrap_or(1)
            }
            Err(_) => self.tree_depth() + 1,
        }
    }

    /// Unweighted shortest-path lengths from `start` over the
    /// undirected view; `None` for unreachable posts.
    fn bfs_distances(&self, start: usize) -> Vec<Option<usize>> {
        let adjacency = self.undirected_neighbors();
        let mut dist: Vec<Option<usize>> = vec![None; adjacency.len()];
        let mut queue = VecDeque::new();
        dist[start] = Some(0);
        queue.push_back(start);
        while let Some(v) = queue.pop_front() {
            let next = match dist[v] {
                Some(d) => d + 1,
                None => continue,
            };
            for &w in &adjacency[v] {
                if dist[w].is_none() {
                    dist[w] = Some(next);
                    queue.push_back(w);
                }
            }
        }
        dist
    }

    fn simple_edge_count(&self) -> usize {
        self.undirected_neighbors().iter().map(Vec::len).sum::<usize>() / 2
    }
}

/// Pearson correlation, `None` on empty input or zero variance.
fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx) * (x - mx);
        vy += (y - my) * (y - my);
    }
    let denom = (vx * vy).sqrt();
    if denom == 0.0 {
        None
    } else {
        Some(cov / denom)
    }
}
