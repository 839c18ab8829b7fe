//! Assembling feature bundles into numeric matrices.
//!
//! Vectorization is a two-phase contract. `fit` walks the input once,
//! fixes the feature-to-column map, and learns per-column
//! normalization parameters; `transform` re-walks an input of the
//! same shape and applies them, so matrices built from different
//! corpora line up column for column. Numeric columns come first in
//! sorted key order, then boolean columns, appended as raw `0/1` and
//! never normalized.
//!
//! A feature key seen at transform time but not at fit time is a
//! configuration error: the caller fit on the wrong corpus. The
//! reverse direction is allowed, and absent values read as zero. A
//! column with zero range or zero spread falls back to the identity
//! transform instead of dividing by zero.

use std::collections::{BTreeMap, BTreeSet};

use crate::convo::Conversation;
use crate::error::{ConvoError, Result};
use crate::graph::ConvoGraph;
use crate::message::{Message, Uid};

use super::{conv, post, post_in_conv, user, SummaryStats};

/// One row per item, columns in fit order.
pub type Matrix = Vec<Vec<f64>>;

/// Normalization applied to numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    None,
    MinMax,
    Mean,
    Standard,
}

impl std::str::FromStr for Normalization {
    type Err = ConvoError;

    fn from_str(s: &str) -> std::result::Result<Self, ConvoError> {
        match s {
            "none" => Ok(Normalization::None),
            "minmax" => Ok(Normalization::MinMax),
            "mean" => Ok(Normalization::Mean),
            "standard" => Ok(Normalization::Standard),
            other => Err(ConvoError::config(format!(
                "unknown normalization mode `{other}`, expected none, minmax, mean, or standard"
            ))),
        }
    }
}

/// Learned parameters for one numeric column. `range` and `std` are
/// stored with zero already replaced by one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ColumnStats {
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub mean: f64,
    pub std: f64,
}

/// Input accepted by the vectorizers.
#[derive(Debug, Clone, Copy)]
pub enum VectorInput<'a> {
    Posts(&'a [Message]),
    Convo(&'a Conversation),
    Convos(&'a [Conversation]),
}

/// Identifies one row of a post matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRowId {
    pub convo_id: Option<String>,
    pub uid: Uid,
}

type NumBoolRow = (BTreeMap<String, f64>, BTreeMap<String, bool>);

/// Column map and per-column parameters established at fit time.
#[derive(Debug, Clone, Default)]
struct FitState {
    stats: BTreeMap<String, ColumnStats>,
    bool_columns: Vec<String>,
}

impl FitState {
    fn fit(rows: &[NumBoolRow]) -> Result<FitState> {
        if rows.is_empty() {
            return Err(ConvoError::config("vectorizer fit requires at least one row"));
        }

        let mut keys: BTreeSet<&String> = BTreeSet::new();
        let mut bool_keys: BTreeSet<&String> = BTreeSet::new();
        for (nums, bools) in rows {
            keys.extend(nums.keys());
            bool_keys.extend(bools.keys());
        }

        let mut stats = BTreeMap::new();
        for key in keys {
            let values: Vec<f64> = rows
                .iter()
                .map(|(nums, _)| nums.get(key).copied().unwrap_or(0.0))
                .collect();
            // rows is non-empty, so the fold always yields a summary
            if let Some(s) = SummaryStats::from_samples(&values) {
                let range = s.max - s.min;
                stats.insert(
                    key.clone(),
                    ColumnStats {
                        min: s.min,
                        max: s.max,
                        range: if range == 0.0 { 1.0 } else { range },
                        mean: s.mean,
                        std: if s.std == 0.0 { 1.0 } else { s.std },
                    },
                );
            }
        }
        Ok(FitState {
            stats,
            bool_columns: bool_keys.into_iter().cloned().collect(),
        })
    }

    fn columns(&self) -> Vec<String> {
        self.stats
            .keys()
            .cloned()
            .chain(self.bool_columns.iter().cloned())
            .collect()
    }

    fn transform_rows(&self, rows: &[NumBoolRow], norm: Normalization) -> Result<Matrix> {
        let mut out = Vec::with_capacity(rows.len());
        for (nums, bools) in rows {
            for key in nums.keys() {
                if !self.stats.contains_key(key) {
                    return Err(ConvoError::config(format!(
                        "feature `{key}` was not present at fit time"
                    )));
                }
            }
            for key in bools.keys() {
                if !self.bool_columns.contains(key) {
                    return Err(ConvoError::config(format!(
                        "boolean feature `{key}` was not present at fit time"
                    )));
                }
            }

            let mut row = Vec::with_capacity(self.stats.len() + self.bool_columns.len());
            for (key, s) in &self.stats {
                let x = nums.get(key).copied().unwrap_or(0.0);
                row.push(match norm {
                    Normalization::None => x,
                    Normalization::MinMax => (x - s.min) / s.range,
                    Normalization::Mean => (x - s.mean) / s.range,
                    Normalization::Standard => (x - s.mean) / s.std,
                });
            }
            for key in &self.bool_columns {
                let set = bools.get(key).copied().unwrap_or(false);
                row.push(if set { 1.0 } else { 0.0 });
            }
            out.push(row);
        }
        Ok(out)
    }
}

/// Vectorizes posts, one row per post.
///
/// Rows are built from post-in-conversation features when the input
/// carries conversations, and from the isolated post features when it
/// is a bare post list. The optional wideners pull in the surrounding
/// conversation's features (prefixed `convo_`) and the author's
/// features (prefixed `author_`).
#[derive(Debug, Default)]
pub struct PostVectorizer {
    normalization: Normalization,
    include_conversation: bool,
    include_user: bool,
    state: Option<FitState>,
}

impl PostVectorizer {
    pub fn new(normalization: Normalization) -> Self {
        PostVectorizer {
            normalization,
            ..Default::default()
        }
    }

    /// Widen every row with its conversation's features.
    pub fn with_conversation(mut self) -> Self {
        self.include_conversation = true;
        self
    }

    /// Widen every row with its author's in-conversation features.
    pub fn with_user(mut self) -> Self {
        self.include_user = true;
        self
    }

    /// Column names established at fit, numeric then boolean.
    pub fn columns(&self) -> Option<Vec<String>> {
        self.state.as_ref().map(|s| s.columns())
    }

    pub fn fit(&mut self, input: VectorInput<'_>) -> Result<&mut Self> {
        let rows = self.rows(input)?;
        let rows: Vec<NumBoolRow> = rows.into_iter().map(|(_, row)| row).collect();
        self.state = Some(FitState::fit(&rows)?);
        Ok(self)
    }

    pub fn transform(&self, input: VectorInput<'_>) -> Result<Matrix> {
        Ok(self.transform_with_ids(input)?.0)
    }

    /// Like [`transform`](Self::transform), also returning the
    /// conversation and post identity of every row, in row order.
    pub fn transform_with_ids(&self, input: VectorInput<'_>) -> Result<(Matrix, Vec<PostRowId>)> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| ConvoError::config("transform called before fit"))?;
        let rows = self.rows(input)?;
        let ids: Vec<PostRowId> = rows.iter().map(|(id, _)| id.clone()).collect();
        let rows: Vec<NumBoolRow> = rows.into_iter().map(|(_, row)| row).collect();
        Ok((state.transform_rows(&rows, self.normalization)?, ids))
    }

    pub fn fit_transform(&mut self, input: VectorInput<'_>) -> Result<Matrix> {
        self.fit(input)?;
        self.transform(input)
    }

    fn rows(&self, input: VectorInput<'_>) -> Result<Vec<(PostRowId, NumBoolRow)>> {
        match input {
            VectorInput::Posts(posts) => posts
                .iter()
                .map(|p| {
                    let mut nums = post::floats(p);
                    for (k, v) in post::ints(p) {
                        nums.insert(k, v as f64);
                    }
                    let id = PostRowId {
                        convo_id: None,
                        uid: p.uid().clone(),
                    };
                    Ok((id, (nums, post::bools(p))))
                })
                .collect(),
            VectorInput::Convo(convo) => self.convo_rows(std::slice::from_ref(convo)),
            VectorInput::Convos(convos) => self.convo_rows(convos),
        }
    }

    fn convo_rows(&self, convos: &[Conversation]) -> Result<Vec<(PostRowId, NumBoolRow)>> {
        let mut out = Vec::new();
        for convo in convos {
            let graph = ConvoGraph::build(convo);

            let conv_extra = if self.include_conversation {
                let mut extra = BTreeMap::new();
                for (k, v) in conv::floats(convo, &graph)? {
                    extra.insert(format!("convo_{k}"), v);
                }
                for (k, v) in conv::ints(convo, &graph)? {
                    extra.insert(format!("convo_{k}"), v as f64);
                }
                Some(extra)
            } else {
                None
            };

            let mut author_extra: BTreeMap<String, (BTreeMap<String, f64>, bool)> =
                BTreeMap::new();
            if self.include_user {
                for u in user::unique_users(convo) {
                    let mut extra = BTreeMap::new();
                    for (k, v) in user::floats(&u, convo, &graph)? {
                        extra.insert(format!("author_{k}"), v);
                    }
                    for (k, v) in user::ints(&u, convo)? {
                        extra.insert(format!("author_{k}"), v as f64);
                    }
                    let is_src = user::is_source_author(&u, convo);
                    author_extra.insert(u, (extra, is_src));
                }
            }

            for (uid, message) in convo.posts() {
                let mut nums = post_in_conv::floats(convo, uid)?;
                for (k, v) in post_in_conv::ints(convo, &graph, uid)? {
                    nums.insert(k, v as f64);
                }
                let mut bools = post_in_conv::bools(convo, &graph, uid)?;

                if let Some(extra) = &conv_extra {
                    nums.extend(extra.clone());
                }
                if let Some((extra, is_src)) =
                    message.author().and_then(|a| author_extra.get(a))
                {
                    nums.extend(extra.clone());
                    bools.insert("author_is_source_author".to_string(), *is_src);
                }

                let id = PostRowId {
                    convo_id: Some(convo.convo_id()),
                    uid: uid.clone(),
                };
                out.push((id, (nums, bools)));
            }
        }
        Ok(out)
    }
}

/// Vectorizes conversations, one row per conversation. No boolean
/// columns exist at this scale.
#[derive(Debug, Default)]
pub struct ConversationVectorizer {
    normalization: Normalization,
    state: Option<FitState>,
}

impl ConversationVectorizer {
    pub fn new(normalization: Normalization) -> Self {
        ConversationVectorizer {
            normalization,
            state: None,
        }
    }

    /// Column names established at fit.
    pub fn columns(&self) -> Option<Vec<String>> {
        self.state.as_ref().map(|s| s.columns())
    }

    pub fn fit(&mut self, input: VectorInput<'_>) -> Result<&mut Self> {
        let rows = Self::rows(input)?;
        let rows: Vec<NumBoolRow> = rows.into_iter().map(|(_, row)| row).collect();
        self.state = Some(FitState::fit(&rows)?);
        Ok(self)
    }

    pub fn transform(&self, input: VectorInput<'_>) -> Result<Matrix> {
        Ok(self.transform_with_ids(input)?.0)
    }

    /// Like [`transform`](Self::transform), also returning each row's
    /// conversation id.
    pub fn transform_with_ids(&self, input: VectorInput<'_>) -> Result<(Matrix, Vec<String>)> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| ConvoError::config("transform called before fit"))?;
        let rows = Self::rows(input)?;
        let ids: Vec<String> = rows.iter().map(|(id, _)| id.clone()).collect();
        let rows: Vec<NumBoolRow> = rows.into_iter().map(|(_, row)| row).collect();
        Ok((state.transform_rows(&rows, self.normalization)?, ids))
    }

    pub fn fit_transform(&mut self, input: VectorInput<'_>) -> Result<Matrix> {
        self.fit(input)?;
        self.transform(input)
    }

    fn rows(input: VectorInput<'_>) -> Result<Vec<(String, NumBoolRow)>> {
        let convos = match input {
            VectorInput::Convo(convo) => std::slice::from_ref(convo),
            VectorInput::Convos(convos) => convos,
            VectorInput::Posts(_) => {
                return Err(ConvoError::config(
                    "conversation vectorizer requires conversations, not bare posts",
                ))
            }
        };
        let mut out = Vec::with_capacity(convos.len());
        for convo in convos {
            let graph = ConvoGraph::build(convo);
            let mut nums = conv::floats(convo, &graph)?;
            for (k, v) in conv::ints(convo, &graph)? {
                nums.insert(k, v as f64);
            }
            out.push((convo.convo_id(), (nums, BTreeMap::new())));
        }
        Ok(out)
    }
}

/// Vectorizes users, one row per distinct author.
///
/// A single conversation yields in-conversation user features plus
/// the source-author boolean column; a conversation list yields the
/// across-conversation features, where authors are enumerated in
/// first-seen order over the whole collection.
#[derive(Debug, Default)]
pub struct UserVectorizer {
    normalization: Normalization,
    state: Option<FitState>,
}

impl UserVectorizer {
    pub fn new(normalization: Normalization) -> Self {
        UserVectorizer {
            normalization,
            state: None,
        }
    }

    /// Column names established at fit, numeric then boolean.
    pub fn columns(&self) -> Option<Vec<String>> {
        self.state.as_ref().map(|s| s.columns())
    }

    pub fn fit(&mut self, input: VectorInput<'_>) -> Result<&mut Self> {
        let rows = Self::rows(input)?;
        let rows: Vec<NumBoolRow> = rows.into_iter().map(|(_, row)| row).collect();
        self.state = Some(FitState::fit(&rows)?);
        Ok(self)
    }

    pub fn transform(&self, input: VectorInput<'_>) -> Result<Matrix> {
        Ok(self.transform_with_ids(input)?.0)
    }

    /// Like [`transform`](Self::transform), also returning each row's
    /// author name.
    pub fn transform_with_ids(&self, input: VectorInput<'_>) -> Result<(Matrix, Vec<String>)> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| ConvoError::config("transform called before fit"))?;
        let rows = Self::rows(input)?;
        let ids: Vec<String> = rows.iter().map(|(id, _)| id.clone()).collect();
        let rows: Vec<NumBoolRow> = rows.into_iter().map(|(_, row)| row).collect();
        Ok((state.transform_rows(&rows, self.normalization)?, ids))
    }

    pub fn fit_transform(&mut self, input: VectorInput<'_>) -> Result<Matrix> {
        self.fit(input)?;
        self.transform(input)
    }

    fn rows(input: VectorInput<'_>) -> Result<Vec<(String, NumBoolRow)>> {
        match input {
            VectorInput::Posts(posts) => {
                let mut pooled = Conversation::new();
                for post in posts {
                    pooled.add_post(post.clone());
                }
                Self::single_convo_rows(&pooled)
            }
            VectorInput::Convo(convo) => Self::single_convo_rows(convo),
            VectorInput::Convos(convos) => {
                let mut seen = BTreeSet::new();
                let mut out = Vec::new();
                for convo in convos {
                    for u in user::unique_users(convo) {
                        if !seen.insert(u.clone()) {
                            continue;
                        }
                        let mut nums = user::floats_across(&u, convos)?;
                        for (k, v) in user::ints_across(&u, convos)? {
                            nums.insert(k, v as f64);
                        }
                        out.push((u, (nums, BTreeMap::new())));
                    }
                }
                Ok(out)
            }
        }
    }

    fn single_convo_rows(convo: &Conversation) -> Result<Vec<(String, NumBoolRow)>> {
        let graph = ConvoGraph::build(convo);
        let mut out = Vec::new();
        for u in user::unique_users(convo) {
            let mut nums = user::floats(&u, convo, &graph)?;
            for (k, v) in user::ints(&u, convo)? {
                nums.insert(k, v as f64);
            }
            let bools = user::bools(&u, convo);
            out.push((u, (nums, bools)));
        }
        Ok(out)
    }
}
