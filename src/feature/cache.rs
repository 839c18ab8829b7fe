//! Memoization for derived feature values.
//!
//! Feature extraction recomputes the same intermediate quantities
//! (graph builds, token distributions, aggregate folds) when driven
//! naively. [`FeatureCache`] stores finished values keyed by scope and
//! feature name, tagged with the conversation's generation counter at
//! compute time. A cached entry whose generation no longer matches the
//! conversation is treated as absent, so mutating a conversation
//! invalidates every derived value without the cache ever observing
//! the mutation itself.
//!
//! The cache is single-owner by contract: one logical thread drives an
//! analysis and owns its cache. Parallel pipelines give each worker
//! its own conversation and cache and exchange results by value.

use std::collections::{BTreeMap, HashMap};

use crate::convo::Conversation;
use crate::message::Uid;

/// A finished feature value of any supported shape.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Texts(Vec<String>),
    /// An ordered numeric sequence such as a timestamp series.
    Series(Vec<f64>),
    Counter(BTreeMap<String, usize>),
    /// A whole float-feature map, cached as one unit.
    Map(BTreeMap<String, f64>),
}

impl CachedValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CachedValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            CachedValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            CachedValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CachedValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_texts(&self) -> Option<&[String]> {
        match self {
            CachedValue::Texts(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            CachedValue::Series(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_counter(&self) -> Option<&BTreeMap<String, usize>> {
        match self {
            CachedValue::Counter(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, f64>> {
        match self {
            CachedValue::Map(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for CachedValue {
    fn from(v: bool) -> Self {
        CachedValue::Bool(v)
    }
}

impl From<i64> for CachedValue {
    fn from(v: i64) -> Self {
        CachedValue::Int(v)
    }
}

impl From<f64> for CachedValue {
    fn from(v: f64) -> Self {
        CachedValue::Float(v)
    }
}

impl From<String> for CachedValue {
    fn from(v: String) -> Self {
        CachedValue::Text(v)
    }
}

impl From<&str> for CachedValue {
    fn from(v: &str) -> Self {
        CachedValue::Text(v.to_string())
    }
}

impl From<Vec<String>> for CachedValue {
    fn from(v: Vec<String>) -> Self {
        CachedValue::Texts(v)
    }
}

impl From<Vec<f64>> for CachedValue {
    fn from(v: Vec<f64>) -> Self {
        CachedValue::Series(v)
    }
}

impl From<BTreeMap<String, usize>> for CachedValue {
    fn from(v: BTreeMap<String, usize>) -> Self {
        CachedValue::Counter(v)
    }
}

impl From<BTreeMap<String, f64>> for CachedValue {
    fn from(v: BTreeMap<String, f64>) -> Self {
        CachedValue::Map(v)
    }
}

/// What a cached value was computed over.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheScope {
    /// A single post in isolation.
    Post(Uid),
    /// A post bound to one conversation, for positional values. The
    /// plain `Post` scope would collide when one cache serves several
    /// conversations with overlapping uid ranges.
    PostInConversation(Uid, String),
    /// A whole conversation, by conversation id.
    Conversation(String),
    /// One user, by name.
    User(String),
}

#[derive(Debug, Clone)]
struct Entry {
    generation: u64,
    value: CachedValue,
}

/// Generation-checked feature store.
#[derive(Debug, Clone, Default)]
pub struct FeatureCache {
    entries: HashMap<(CacheScope, String), Entry>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cached value, or `None` when absent or computed against an
    /// older generation of the conversation.
    pub fn get(&self, scope: &CacheScope, key: &str, generation: u64) -> Option<&CachedValue> {
        let entry = self.entries.get(&(scope.clone(), key.to_string()))?;
        if entry.generation == generation {
            Some(&entry.value)
        } else {
            None
        }
    }

    /// Stores a value, replacing any previous entry for this scope and
    /// key regardless of its generation.
    pub fn insert(
        &mut self,
        scope: CacheScope,
        key: impl Into<String>,
        generation: u64,
        value: impl Into<CachedValue>,
    ) {
        self.entries.insert(
            (scope, key.into()),
            Entry {
                generation,
                value: value.into(),
            },
        );
    }

    /// Returns the cached value or computes, stores, and returns it.
    pub fn wrap<F>(&mut self, scope: CacheScope, key: &str, generation: u64, compute: F) -> CachedValue
    where
        F: FnOnce() -> CachedValue,
    {
        if let Some(hit) = self.get(&scope, key, generation) {
            return hit.clone();
        }
        let value = compute();
        self.insert(scope, key, generation, value.clone());
        value
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache-backed temporal summaries over conversations.
///
/// One instance can serve many conversations; entries are keyed by
/// conversation id and validated against the generation at compute
/// time. Missing time data degrades to a `-1.0` sentinel for the
/// endpoints, `0.0` for the duration, and an empty series, never an
/// error.
#[derive(Debug, Clone, Default)]
pub struct TemporalStats {
    cache: FeatureCache,
}

impl TemporalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Earliest timestamp, `-1.0` without a complete time order.
    pub fn start_time(&mut self, convo: &Conversation) -> f64 {
        self.wrap_float(convo, "start_time", |c| {
            c.time_series().first().copied().unwrap_or(-1.0)
        })
    }

    /// Latest timestamp, `-1.0` without a complete time order.
    pub fn end_time(&mut self, convo: &Conversation) -> f64 {
        self.wrap_float(convo, "end_time", |c| {
            c.time_series().last().copied().unwrap_or(-1.0)
        })
    }

    /// Seconds between the first and last post, `0.0` without a
    /// complete time order.
    pub fn duration(&mut self, convo: &Conversation) -> f64 {
        self.end_time(convo) - self.start_time(convo)
    }

    /// Creation timestamps in time order, empty when unavailable.
    pub fn timeseries(&mut self, convo: &Conversation) -> Vec<f64> {
        let scope = CacheScope::Conversation(convo.convo_id());
        let value = self.cache.wrap(scope, "timeseries", convo.generation(), || {
            convo.time_series().into()
        });
        value.as_series().map(<[f64]>::to_vec).unwrap_or_default()
    }

    /// Drops every cached summary.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn wrap_float<F>(&mut self, convo: &Conversation, key: &str, compute: F) -> f64
    where
        F: FnOnce(&Conversation) -> f64,
    {
        let scope = CacheScope::Conversation(convo.convo_id());
        let value = self.cache.wrap(scope, key, convo.generation(), || {
            compute(convo).into()
        });
        value.as_float().unwrap_or(-1.0)
    }
}
