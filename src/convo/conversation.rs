//! The conversation container.
//!
//! A [`Conversation`] is an identity-indexed collection of [`Message`]s
//! plus the reply edges derived from them. Posts may arrive in any
//! order, reference posts that never arrive, or arrive twice with
//! partially different field values; the container absorbs all of that:
//!
//! - **Merge on collision**: adding a post whose uid is already present
//!   merges the two sightings field by field instead of overwriting.
//! - **Dangling edges**: a reply target that is not (yet) in the
//!   conversation is remembered but treated as absent by every graph
//!   statistic until the post shows up.
//! - **Generation counter**: every mutation bumps a generation number
//!   so that externally cached derived statistics can tell whether they
//!   are still valid.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Add;

use crate::error::{ConvoError, Result};
use crate::message::{Message, Platform, Uid};

/// An identity-indexed collection of messages joined by reply edges.
///
/// The post map and the edge map always hold the same key set; edges
/// are re-derived from each post's `reply_to` on every mutation rather
/// than stored independently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    /// Optional explicit identifier for this conversation.
    convo_id: Option<String>,

    /// All posts, keyed by uid.
    posts: BTreeMap<Uid, Message>,

    /// Reply targets per post, copied from each post's `reply_to`.
    /// Rebuilt after deserialization.
    #[serde(skip)]
    edges: BTreeMap<Uid, BTreeSet<Uid>>,

    /// Bumped on every mutation. Not persisted; a freshly loaded
    /// conversation starts a new cache lineage.
    #[serde(skip)]
    generation: u64,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty conversation with an explicit identifier.
    pub fn with_id(convo_id: impl Into<String>) -> Self {
        Self {
            convo_id: Some(convo_id.into()),
            ..Self::default()
        }
    }

    /// The conversation identifier: the explicit id when one was set,
    /// otherwise the sorted source uids joined with `-`, or `"empty"`
    /// for a conversation with no posts.
    pub fn convo_id(&self) -> String {
        if let Some(id) = &self.convo_id {
            return id.clone();
        }
        if self.posts.is_empty() {
            return "empty".to_string();
        }
        let sources = self.sources();
        let keys = if sources.is_empty() {
            self.posts.keys().cloned().collect()
        } else {
            sources
        };
        keys.iter().map(|uid| uid.to_string()).join("-")
    }

    /// Replaces the explicit conversation identifier.
    pub fn set_convo_id(&mut self, convo_id: impl Into<String>) {
        self.convo_id = Some(convo_id.into());
    }

    /// Mutation counter for cache invalidation. Any two observations
    /// with equal generation saw an identical conversation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Adds a post. If the uid is already present the two sightings are
    /// merged per [`Message::merge`]; otherwise the post is inserted.
    pub fn add_post(&mut self, post: Message) {
        let uid = post.uid().clone();
        match self.posts.get_mut(&uid) {
            Some(existing) => existing.merge(post),
            None => {
                self.posts.insert(uid.clone(), post);
            }
        }
        let reply_to = self.posts[&uid].reply_to().clone();
        self.edges.insert(uid, reply_to);
        self.generation += 1;
    }

    /// Removes a post, returning it.
    ///
    /// Edges pointing at the removed uid stay in the remaining posts'
    /// reply sets and become dangling, exactly as if the post had never
    /// arrived.
    pub fn remove_post(&mut self, uid: &Uid) -> Result<Message> {
        let removed = self
            .posts
            .remove(uid)
            .ok_or_else(|| ConvoError::not_found(format!("no post {uid} in conversation")))?;
        self.edges.remove(uid);
        self.generation += 1;
        Ok(removed)
    }

    /// All posts, keyed by uid.
    pub fn posts(&self) -> &BTreeMap<Uid, Message> {
        &self.posts
    }

    /// Reply targets per post, including targets not present in the
    /// conversation.
    pub fn edges(&self) -> &BTreeMap<Uid, BTreeSet<Uid>> {
        &self.edges
    }

    /// Looks up a post by uid.
    pub fn get(&self, uid: &Uid) -> Option<&Message> {
        self.posts.get(uid)
    }

    /// Mutable post access for in-place rewrites that do not touch
    /// reply targets. Mutations that change `reply_to` must go through
    /// [`Conversation::add_post`] so the edge map stays in sync.
    pub(crate) fn post_mut(&mut self, uid: &Uid) -> Option<&mut Message> {
        self.posts.get_mut(uid)
    }

    pub(crate) fn bump_generation(&mut self) {
        self.generation += 1;
    }

    /// Whether a post with this uid is present.
    pub fn contains(&self, uid: &Uid) -> bool {
        self.posts.contains_key(uid)
    }

    /// Number of posts.
    pub fn messages(&self) -> usize {
        self.posts.len()
    }

    /// Whether the conversation holds no posts.
    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// The reply targets of `uid` that are present in the conversation.
    /// Self-references are treated as data noise and skipped.
    pub fn parents_of<'a>(&'a self, uid: &'a Uid) -> impl Iterator<Item = &'a Uid> + 'a {
        self.edges
            .get(uid)
            .into_iter()
            .flatten()
            .filter(move |target| *target != uid && self.posts.contains_key(target))
    }

    /// Number of reply edges between posts that are both present.
    pub fn connections(&self) -> usize {
        self.posts
            .keys()
            .map(|uid| self.parents_of(uid).count())
            .sum()
    }

    /// Number of reply edges including those pointing outside the
    /// conversation.
    pub fn connections_unrestricted(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Posts with no reply target present in the conversation.
    pub fn sources(&self) -> BTreeSet<Uid> {
        self.posts
            .keys()
            .filter(|uid| self.parents_of(uid).next().is_none())
            .cloned()
            .collect()
    }

    /// Distinct named authors.
    pub fn authors(&self) -> BTreeSet<String> {
        self.posts
            .values()
            .filter_map(|p| p.author().map(str::to_string))
            .collect()
    }

    /// Number of distinct named authors. Posts without an author are
    /// not counted as a user.
    pub fn users(&self) -> usize {
        self.authors().len()
    }

    /// Post count per named author.
    pub fn messages_per_user(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for post in self.posts.values() {
            if let Some(author) = post.author() {
                *counts.entry(author.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Total text length in characters across all posts.
    pub fn chars(&self) -> usize {
        self.posts.values().map(Message::chars).sum()
    }

    /// Total partition-token count across all posts, space tokens
    /// included.
    pub fn tokens(&self) -> usize {
        self.posts.values().map(|p| p.tokens().len()).sum()
    }

    /// Distinct partition tokens across all posts.
    pub fn token_types(&self) -> BTreeSet<String> {
        self.posts.values().flat_map(Message::tokens).collect()
    }

    /// Distinct partition tokens, lowercased.
    pub fn token_types_lower(&self) -> BTreeSet<String> {
        self.posts
            .values()
            .flat_map(Message::tokens)
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Platforms present in this conversation.
    pub fn platforms(&self) -> BTreeSet<Platform> {
        self.posts.values().map(Message::platform).collect()
    }

    /// Uids sorted by creation time, ties broken by uid. `None` when
    /// the conversation is empty or any post lacks a timestamp.
    pub fn time_order(&self) -> Option<Vec<Uid>> {
        if self.posts.is_empty() {
            return None;
        }
        let mut stamped = Vec::with_capacity(self.posts.len());
        for (uid, post) in &self.posts {
            stamped.push((post.created_at()?, uid.clone()));
        }
        stamped.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Some(stamped.into_iter().map(|(_, uid)| uid).collect())
    }

    /// Creation timestamps in time order; empty when unavailable.
    pub fn time_series(&self) -> Vec<f64> {
        match self.time_order() {
            Some(order) => order
                .iter()
                .filter_map(|uid| self.posts[uid].created_at())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Post texts in time order, falling back to uid order when
    /// timestamps are unavailable.
    pub fn text_stream(&self) -> Vec<String> {
        let order = self
            .time_order()
            .unwrap_or_else(|| self.posts.keys().cloned().collect());
        order
            .iter()
            .map(|uid| self.posts[uid].text().to_string())
            .collect()
    }

    /// Earliest available creation timestamp.
    pub fn start_time(&self) -> Option<f64> {
        self.posts
            .values()
            .filter_map(Message::created_at)
            .min_by(f64::total_cmp)
    }

    /// Latest available creation timestamp.
    pub fn end_time(&self) -> Option<f64> {
        self.posts
            .values()
            .filter_map(Message::created_at)
            .max_by(f64::total_cmp)
    }

    /// Seconds between the earliest and latest post.
    pub fn duration(&self) -> Option<f64> {
        Some(self.end_time()? - self.start_time()?)
    }

    /// Absorbs all posts of `other`, merging on uid collisions.
    pub fn merge(&mut self, other: Conversation) {
        for (_, post) in other.posts {
            self.add_post(post);
        }
    }

    /// Returns the posts matching `filter` as a new conversation. The
    /// receiver is left untouched; the explicit convo id carries over.
    pub fn filter(&self, filter: &ConvoFilter) -> Conversation {
        let mut out = Conversation {
            convo_id: self.convo_id.clone(),
            ..Conversation::default()
        };
        for post in self.posts.values() {
            if filter.matches(post) {
                out.add_post(post.clone());
            }
        }
        out
    }

    /// Serializes to the canonical JSON shape: a flat array of post
    /// objects. Edges are not written; they are re-derived from each
    /// post's `reply_to` on load.
    pub fn to_json(&self) -> Value {
        Value::Array(self.posts.values().map(Message::to_json).collect())
    }

    /// Reads a conversation from the canonical flat-array shape.
    pub fn from_json(value: &Value) -> Result<Conversation> {
        let items = value
            .as_array()
            .ok_or_else(|| ConvoError::serialization("conversation JSON is not an array"))?;
        let mut convo = Conversation::new();
        for item in items {
            convo.add_post(Message::from_json(item)?);
        }
        Ok(convo)
    }

    /// Serializes to bytes for compact storage.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| ConvoError::serialization(format!("conversation encode: {e}")))
    }

    /// Deserializes from bytes produced by [`Conversation::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut convo: Conversation = bincode::deserialize(bytes)
            .map_err(|e| ConvoError::serialization(format!("conversation decode: {e}")))?;
        convo.rebuild_edges();
        Ok(convo)
    }

    fn rebuild_edges(&mut self) {
        self.edges = self
            .posts
            .iter()
            .map(|(uid, post)| (uid.clone(), post.reply_to().clone()))
            .collect();
    }
}

impl Add for Conversation {
    type Output = Conversation;

    fn add(mut self, other: Conversation) -> Conversation {
        self.merge(other);
        self
    }
}

/// Post predicate for [`Conversation::filter`]. All configured
/// criteria must hold for a post to be kept.
#[derive(Debug, Clone)]
pub struct ConvoFilter {
    min_chars: usize,
    by_langs: Option<BTreeSet<String>>,
    by_tags: Option<BTreeSet<String>>,
    by_platforms: Option<BTreeSet<Platform>>,
    by_authors: Option<BTreeSet<String>>,
    before: Option<f64>,
    after: Option<f64>,
}

impl Default for ConvoFilter {
    fn default() -> Self {
        Self {
            min_chars: 1,
            by_langs: None,
            by_tags: None,
            by_platforms: None,
            by_authors: None,
            before: None,
            after: None,
        }
    }
}

impl ConvoFilter {
    /// A filter that only drops empty-text posts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum text length in characters (default 1).
    pub fn min_chars(mut self, n: usize) -> Self {
        self.min_chars = n;
        self
    }

    /// Keep only posts whose language is in this set. Posts without a
    /// resolved language never match.
    pub fn langs<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_langs = Some(langs.into_iter().map(Into::into).collect());
        self
    }

    /// Keep only posts carrying every one of these tags.
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Keep only posts from these platforms.
    pub fn platforms<I>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = Platform>,
    {
        self.by_platforms = Some(platforms.into_iter().collect());
        self
    }

    /// Keep only posts by these authors. Authorless posts never match.
    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.by_authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    /// Keep only posts created strictly before this timestamp. Posts
    /// without a timestamp never match.
    pub fn before(mut self, stamp: f64) -> Self {
        self.before = Some(stamp);
        self
    }

    /// Keep only posts created strictly after this timestamp. Posts
    /// without a timestamp never match.
    pub fn after(mut self, stamp: f64) -> Self {
        self.after = Some(stamp);
        self
    }

    /// Whether a post passes every configured criterion.
    pub fn matches(&self, post: &Message) -> bool {
        if post.chars() < self.min_chars {
            return false;
        }
        if let Some(langs) = &self.by_langs {
            match post.lang() {
                Some(lang) if langs.contains(lang) => {}
                _ => return false,
            }
        }
        if let Some(tags) = &self.by_tags {
            if !tags.iter().all(|t| post.tags().contains(t)) {
                return false;
            }
        }
        if let Some(platforms) = &self.by_platforms {
            if !platforms.contains(&post.platform()) {
                return false;
            }
        }
        if let Some(authors) = &self.by_authors {
            match post.author() {
                Some(author) if authors.contains(author) => {}
                _ => return false,
            }
        }
        if let Some(cutoff) = self.before {
            match post.created_at() {
                Some(stamp) if stamp < cutoff => {}
                _ => return false,
            }
        }
        if let Some(cutoff) = self.after {
            match post.created_at() {
                Some(stamp) if stamp > cutoff => {}
                _ => return false,
            }
        }
        true
    }
}
