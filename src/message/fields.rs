//! Shared message record and the merge rules that reconcile duplicate
//! sightings of the same post.

use crate::lang::{resolve_lang, DetectorConfig, LangDetect};
use crate::tokenize;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Message identifier.
///
/// Platforms disagree on id shape: Twitter and 4chan use numeric ids,
/// Reddit fullnames (`t3_...`) and Facebook object ids are strings. Both
/// forms sort and hash, so either works as a conversation key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Uid {
    /// Numeric identifier (Twitter status ids, 4chan post numbers).
    Num(i64),
    /// Opaque string identifier (Reddit fullnames, Facebook object ids).
    Text(String),
}

impl Serialize for Uid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            // JSON carries the platform's native shape: a bare number or string
            match self {
                Uid::Num(n) => serializer.serialize_i64(*n),
                Uid::Text(s) => serializer.serialize_str(s),
            }
        } else {
            match self {
                Uid::Num(n) => serializer.serialize_newtype_variant("Uid", 0, "Num", n),
                Uid::Text(s) => serializer.serialize_newtype_variant("Uid", 1, "Text", s),
            }
        }
    }
}

impl<'de> Deserialize<'de> for Uid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct UidVisitor;

        impl<'de> serde::de::Visitor<'de> for UidVisitor {
            type Value = Uid;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an integer or string message identifier")
            }

            fn visit_i64<E>(self, v: i64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Uid::Num(v))
            }

            fn visit_u64<E>(self, v: u64) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                i64::try_from(v)
                    .map(Uid::Num)
                    .map_err(|_| E::custom(format!("uid {} out of range", v)))
            }

            fn visit_str<E>(self, v: &str) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Uid::Text(v.to_string()))
            }

            fn visit_string<E>(self, v: String) -> std::result::Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Uid::Text(v))
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_any(UidVisitor)
        } else {
            #[derive(Deserialize)]
            enum Tagged {
                Num(i64),
                Text(String),
            }
            Tagged::deserialize(deserializer).map(|t| match t {
                Tagged::Num(n) => Uid::Num(n),
                Tagged::Text(s) => Uid::Text(s),
            })
        }
    }
}

impl Uid {
    /// Returns the numeric form, if this is a numeric id.
    pub fn as_num(&self) -> Option<i64> {
        match self {
            Uid::Num(n) => Some(*n),
            Uid::Text(_) => None,
        }
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Uid::Num(n) => write!(f, "{}", n),
            Uid::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Uid {
    fn from(n: i64) -> Self {
        Uid::Num(n)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Uid::Text(s.to_string())
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Uid::Text(s)
    }
}

/// Platform discriminator for the closed set of supported sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    Twitter,
    Reddit,
    Facebook,
    Chan,
}

impl Platform {
    /// Canonical corpus name, as written in the `platform` JSON field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter",
            Platform::Reddit => "Reddit",
            Platform::Facebook => "Facebook",
            Platform::Chan => "4Chan",
        }
    }

    /// Parses the canonical corpus name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Twitter" => Some(Platform::Twitter),
            "Reddit" => Some(Platform::Reddit),
            "Facebook" => Some(Platform::Facebook),
            "4Chan" => Some(Platform::Chan),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The shared record every platform variant carries.
///
/// Only `uid` is mandatory; every optional field has a documented sentinel
/// behavior downstream (missing timestamps degrade temporal statistics,
/// missing authors are skipped by user counts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFields {
    /// Unique identifier, stable across merges.
    pub uid: Uid,
    /// Post body.
    pub text: String,
    /// Username or display name of the author.
    pub author: Option<String>,
    /// Creation time in unix seconds.
    pub created_at: Option<f64>,
    /// Identifiers this post replies to (multi-parent DAGs allowed).
    pub reply_to: BTreeSet<Uid>,
    /// Free-form labels attached at ingestion or analysis time.
    pub tags: BTreeSet<String>,
    /// Resolved language code, `"und"` when detection was inconclusive.
    pub lang: Option<String>,
}

impl MessageFields {
    /// Creates a minimal record with the given identifier.
    pub fn new(uid: impl Into<Uid>) -> Self {
        Self {
            uid: uid.into(),
            text: String::new(),
            author: None,
            created_at: None,
            reply_to: BTreeSet::new(),
            tags: BTreeSet::new(),
            lang: None,
        }
    }

    /// Sets the post body.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Sets the creation time (unix seconds).
    pub fn with_created_at(mut self, stamp: f64) -> Self {
        self.created_at = Some(stamp);
        self
    }

    /// Adds reply targets.
    pub fn with_reply_to<I, U>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<Uid>,
    {
        self.reply_to.extend(targets.into_iter().map(Into::into));
        self
    }

    /// Sets the language code.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Adds tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Replaces the post body, re-resolving the language when a detector
    /// is supplied.
    pub fn set_text(
        &mut self,
        text: impl Into<String>,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) {
        self.text = text.into();
        if let Some(lang) = resolve_lang(detector, config, &self.text) {
            self.lang = Some(lang);
        }
    }

    /// Reconciles a second sighting of the same logical post.
    ///
    /// Rules: the longer text wins; `author`/`lang` fill in only when
    /// missing; two present timestamps keep the earlier one; `reply_to`
    /// and `tags` are unioned. Repeated merges of the same input are
    /// idempotent, and the governed fields are order-independent.
    pub fn merge(&mut self, other: MessageFields) {
        if other.text.chars().count() > self.text.chars().count() {
            self.text = other.text;
        }
        if self.author.is_none() {
            self.author = other.author;
        }
        if self.lang.is_none() {
            self.lang = other.lang;
        }
        self.created_at = match (self.created_at, other.created_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.reply_to.extend(other.reply_to);
        self.tags.extend(other.tags);
    }

    /// Character count of the post body.
    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }

    /// Partition tokens of the post body.
    pub fn tokens(&self) -> Vec<String> {
        tokenize::partition(&self.text)
    }

    /// Unigram frequency distribution over the partition tokens.
    pub fn token_distribution(&self) -> BTreeMap<String, usize> {
        tokenize::token_distribution(self.tokens())
    }

    /// Unique partition tokens.
    pub fn types(&self) -> BTreeSet<String> {
        self.tokens().into_iter().collect()
    }

    /// Rewrites the body and author through an anonymization map.
    ///
    /// Longer names are substituted first so a name that is a prefix of
    /// another (`sam` / `samuel`) cannot corrupt the longer one; ties are
    /// broken lexicographically, keeping the rewrite deterministic.
    pub fn redact(&mut self, map: &BTreeMap<String, String>) {
        let mut terms: Vec<&String> = map.keys().filter(|t| !t.is_empty()).collect();
        terms.sort_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        for term in terms {
            if self.text.contains(term.as_str()) {
                self.text = self.text.replace(term.as_str(), &map[term.as_str()]);
            }
        }
        if let Some(author) = &self.author {
            if let Some(replacement) = map.get(author) {
                self.author = Some(replacement.clone());
            }
        }
    }
}
