//! Splitting a conversation into its connected threads.
//!
//! A conversation built from a raw post dump frequently holds several
//! unrelated reply trees. [`Conversation::segment`] separates them by
//! computing weakly connected components over the in-conversation
//! reply edges, treating each edge as undirected.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::message::Uid;

use super::conversation::Conversation;

impl Conversation {
    /// Splits into weakly connected components.
    ///
    /// Each component becomes its own conversation carrying clones of
    /// its posts. Components are ordered by their smallest uid, so
    /// segmenting the same conversation twice yields the same output.
    /// Dangling reply targets do not join components; a post whose
    /// only replies point outside the conversation forms a singleton.
    pub fn segment(&self) -> Vec<Conversation> {
        // adjacency over present posts only, both edge directions
        let mut adjacency: HashMap<&Uid, Vec<&Uid>> = HashMap::new();
        for uid in self.posts().keys() {
            adjacency.entry(uid).or_default();
            for parent in self.parents_of(uid) {
                adjacency.entry(uid).or_default().push(parent);
                adjacency.entry(parent).or_default().push(uid);
            }
        }

        let mut visited: HashSet<&Uid> = HashSet::new();
        let mut segments = Vec::new();

        // posts() iterates in uid order, so components come out
        // ordered by their smallest member
        for start in self.posts().keys() {
            if !visited.insert(start) {
                continue;
            }
            let mut queue: VecDeque<&Uid> = VecDeque::new();
            queue.push_back(start);
            let mut segment = Conversation::new();
            while let Some(current) = queue.pop_front() {
                segment.add_post(self.posts()[current].clone());
                for neighbor in &adjacency[current] {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
            segments.push(segment);
        }
        segments
    }
}
