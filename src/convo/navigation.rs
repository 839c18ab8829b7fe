//! Relative views of a conversation, anchored on a single post.
//!
//! Each accessor returns the selected posts as a fresh [`Conversation`]
//! so the result can be fed back into any statistic or feature
//! extractor. Selections come in three families:
//!
//! - **Structural, direct**: `get_parents`, `get_children`,
//!   `get_siblings` follow one hop of reply edges.
//! - **Structural, transitive**: `get_ancestors`, `get_descendants`
//!   follow reply edges to closure via breadth-first search.
//! - **Temporal**: `get_before`, `get_after` compare creation
//!   timestamps and ignore reply structure entirely.
//!
//! Only edges between posts that are both present count; dangling
//! reply targets are invisible here. The `include_post` flag adds the
//! anchor post itself to the selection.

use std::collections::{HashSet, VecDeque};

use crate::error::{ConvoError, Result};
use crate::message::Uid;

use super::conversation::Conversation;

impl Conversation {
    fn check_anchor(&self, uid: &Uid) -> Result<()> {
        if self.contains(uid) {
            Ok(())
        } else {
            Err(ConvoError::not_found(format!(
                "no post {uid} in conversation"
            )))
        }
    }

    fn collect(&self, uid: &Uid, selected: impl IntoIterator<Item = Uid>, include_post: bool) -> Conversation {
        let mut out = Conversation::new();
        for picked in selected {
            out.add_post(self.posts()[&picked].clone());
        }
        if include_post {
            out.add_post(self.posts()[uid].clone());
        }
        out
    }

    fn children_of<'a>(&'a self, uid: &'a Uid) -> impl Iterator<Item = &'a Uid> + 'a {
        self.posts()
            .keys()
            .filter(move |other| self.parents_of(other).any(|parent| parent == uid))
    }

    /// The posts `uid` replies to, restricted to posts present in the
    /// conversation.
    pub fn get_parents(&self, uid: &Uid, include_post: bool) -> Result<Conversation> {
        self.check_anchor(uid)?;
        let picked: Vec<Uid> = self.parents_of(uid).cloned().collect();
        Ok(self.collect(uid, picked, include_post))
    }

    /// The posts that reply directly to `uid`.
    pub fn get_children(&self, uid: &Uid, include_post: bool) -> Result<Conversation> {
        self.check_anchor(uid)?;
        let picked: Vec<Uid> = self.children_of(uid).cloned().collect();
        Ok(self.collect(uid, picked, include_post))
    }

    /// Posts other than `uid` that share at least one in-conversation
    /// parent with it.
    pub fn get_siblings(&self, uid: &Uid, include_post: bool) -> Result<Conversation> {
        self.check_anchor(uid)?;
        let mut picked: HashSet<Uid> = HashSet::new();
        for parent in self.parents_of(uid) {
            for child in self.children_of(parent) {
                if child != uid {
                    picked.insert(child.clone());
                }
            }
        }
        Ok(self.collect(uid, picked, include_post))
    }

    /// Every post reachable from `uid` by repeatedly following reply
    /// edges toward parents.
    pub fn get_ancestors(&self, uid: &Uid, include_post: bool) -> Result<Conversation> {
        self.check_anchor(uid)?;
        Ok(self.collect(uid, self.expand(uid, Direction::Up), include_post))
    }

    /// Every post from which `uid` is reachable by following reply
    /// edges, i.e. the full reply subtree below it.
    pub fn get_descendants(&self, uid: &Uid, include_post: bool) -> Result<Conversation> {
        self.check_anchor(uid)?;
        Ok(self.collect(uid, self.expand(uid, Direction::Down), include_post))
    }

    /// Posts created strictly before `uid`. Posts without a timestamp
    /// are skipped; an anchor without a timestamp selects nothing.
    pub fn get_before(&self, uid: &Uid, include_post: bool) -> Result<Conversation> {
        self.check_anchor(uid)?;
        let picked = self.temporal_side(uid, |other, anchor| other < anchor);
        Ok(self.collect(uid, picked, include_post))
    }

    /// Posts created strictly after `uid`. Posts without a timestamp
    /// are skipped; an anchor without a timestamp selects nothing.
    pub fn get_after(&self, uid: &Uid, include_post: bool) -> Result<Conversation> {
        self.check_anchor(uid)?;
        let picked = self.temporal_side(uid, |other, anchor| other > anchor);
        Ok(self.collect(uid, picked, include_post))
    }

    fn temporal_side(&self, uid: &Uid, keep: impl Fn(f64, f64) -> bool) -> Vec<Uid> {
        let Some(anchor) = self.posts()[uid].created_at() else {
            return Vec::new();
        };
        self.posts()
            .iter()
            .filter(|(other, _)| *other != uid)
            .filter_map(|(other, post)| {
                post.created_at()
                    .filter(|stamp| keep(*stamp, anchor))
                    .map(|_| other.clone())
            })
            .collect()
    }

    /// Breadth-first closure from `uid` along reply edges, excluding
    /// the anchor itself. Cycles are handled by the visited set.
    fn expand(&self, uid: &Uid, direction: Direction) -> Vec<Uid> {
        let mut visited: HashSet<Uid> = HashSet::new();
        let mut queue: VecDeque<Uid> = VecDeque::new();
        let mut picked = Vec::new();

        visited.insert(uid.clone());
        queue.push_back(uid.clone());

        while let Some(current) = queue.pop_front() {
            let next: Vec<Uid> = match direction {
                Direction::Up => self.parents_of(&current).cloned().collect(),
                Direction::Down => self.children_of(&current).cloned().collect(),
            };
            for hop in next {
                if visited.insert(hop.clone()) {
                    picked.push(hop.clone());
                    queue.push_back(hop);
                }
            }
        }
        picked
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, MessageFields, Tweet};

    /// 0 <- 1 <- {2, 3}, 3 <- 4, timestamps equal to uids.
    fn create_test_tree() -> Conversation {
        let mut convo = Conversation::new();
        let spec: [(i64, Option<i64>); 5] =
            [(0, None), (1, Some(0)), (2, Some(1)), (3, Some(1)), (4, Some(3))];
        for (ix, parent) in spec {
            let mut fields = MessageFields::new(ix)
                .with_text(format!("Text {ix}"))
                .with_created_at(ix as f64);
            if let Some(parent) = parent {
                fields = fields.with_reply_to([parent]);
            }
            convo.add_post(Message::Twitter(Tweet::new(fields)));
        }
        convo
    }

    fn uids(convo: &Conversation) -> Vec<i64> {
        convo
            .posts()
            .keys()
            .filter_map(Uid::as_num)
            .collect()
    }

    #[test]
    fn test_missing_anchor_is_an_error() {
        let convo = create_test_tree();
        assert!(matches!(
            convo.get_parents(&Uid::from(99), false),
            Err(ConvoError::NotFound(_))
        ));
    }

    #[test]
    fn test_parents_and_children() {
        let convo = create_test_tree();

        assert_eq!(uids(&convo.get_parents(&Uid::from(2), false).unwrap()), [1]);
        assert_eq!(uids(&convo.get_parents(&Uid::from(0), false).unwrap()), [] as [i64; 0]);
        assert_eq!(uids(&convo.get_parents(&Uid::from(2), true).unwrap()), [1, 2]);

        assert_eq!(uids(&convo.get_children(&Uid::from(1), false).unwrap()), [2, 3]);
        assert_eq!(uids(&convo.get_children(&Uid::from(4), false).unwrap()), [] as [i64; 0]);
    }

    #[test]
    fn test_siblings() {
        let convo = create_test_tree();

        assert_eq!(uids(&convo.get_siblings(&Uid::from(2), false).unwrap()), [3]);
        assert_eq!(uids(&convo.get_siblings(&Uid::from(2), true).unwrap()), [2, 3]);
        // the root has no in-conversation parent, hence no siblings
        assert_eq!(uids(&convo.get_siblings(&Uid::from(0), false).unwrap()), [] as [i64; 0]);
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let convo = create_test_tree();

        assert_eq!(uids(&convo.get_ancestors(&Uid::from(4), false).unwrap()), [0, 1, 3]);
        assert_eq!(uids(&convo.get_ancestors(&Uid::from(0), false).unwrap()), [] as [i64; 0]);

        assert_eq!(uids(&convo.get_descendants(&Uid::from(1), false).unwrap()), [2, 3, 4]);
        assert_eq!(uids(&convo.get_descendants(&Uid::from(1), true).unwrap()), [1, 2, 3, 4]);
        assert_eq!(uids(&convo.get_descendants(&Uid::from(2), false).unwrap()), [] as [i64; 0]);
    }

    #[test]
    fn test_before_and_after_are_temporal() {
        let convo = create_test_tree();

        assert_eq!(uids(&convo.get_before(&Uid::from(2), false).unwrap()), [0, 1]);
        assert_eq!(uids(&convo.get_before(&Uid::from(2), true).unwrap()), [0, 1, 2]);
        assert_eq!(uids(&convo.get_after(&Uid::from(2), false).unwrap()), [3, 4]);
        assert_eq!(uids(&convo.get_after(&Uid::from(4), false).unwrap()), [] as [i64; 0]);
    }

    #[test]
    fn test_before_with_unstamped_posts() {
        let mut convo = create_test_tree();
        convo.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(9).with_text("no stamp"),
        )));

        // the unstamped post is skipped, not treated as earliest
        assert_eq!(uids(&convo.get_before(&Uid::from(2), false).unwrap()), [0, 1]);
        // an unstamped anchor selects nothing
        assert_eq!(uids(&convo.get_before(&Uid::from(9), false).unwrap()), [] as [i64; 0]);
        assert_eq!(uids(&convo.get_before(&Uid::from(9), true).unwrap()), [9]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut convo = Conversation::new();
        for (ix, parent) in [(0i64, 1i64), (1, 0)] {
            convo.add_post(Message::Twitter(Tweet::new(
                MessageFields::new(ix)
                    .with_text(format!("Text {ix}"))
                    .with_reply_to([parent]),
            )));
        }

        assert_eq!(uids(&convo.get_ancestors(&Uid::from(0), false).unwrap()), [1]);
        assert_eq!(uids(&convo.get_descendants(&Uid::from(0), false).unwrap()), [1]);
    }
}
