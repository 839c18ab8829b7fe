//! Platform message union.
//!
//! Every post in a conversation is a [`Message`]: a closed tagged union over
//! the supported platforms, each variant wrapping the shared
//! [`MessageFields`] record. The union keeps serialization exhaustive — a
//! new platform is a new variant, and every `match` below fails to compile
//! until it is handled.
//!
//! Two encodings exist:
//! - **canonical corpus JSON** ([`Message::to_json`] / [`Message::from_json`]):
//!   a flat object with a `platform` discriminator, the shape written to and
//!   read from disk;
//! - **snapshot bytes** ([`Message::to_bytes`] / [`Message::from_bytes`]):
//!   compact bincode for in-process round-trips.

mod chan;
mod facebook;
mod fields;
mod reddit;
mod twitter;

pub use chan::ChanPost;
pub use facebook::FacebookPost;
pub use fields::{MessageFields, Platform, Uid};
pub use reddit::RedditPost;
pub use twitter::Tweet;

use crate::error::{ConvoError, Result};
use crate::lang::{DetectorConfig, LangDetect};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Wire shape of a message in the canonical corpus JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageRecord {
    uid: Uid,
    #[serde(default)]
    text: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    created_at: Option<f64>,
    #[serde(default)]
    reply_to: Vec<Uid>,
    platform: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    lang: Option<String>,
}

/// A social-media post from any supported platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    Twitter(Tweet),
    Reddit(RedditPost),
    Facebook(FacebookPost),
    Chan(ChanPost),
}

impl Message {
    /// Returns the shared record.
    pub fn fields(&self) -> &MessageFields {
        match self {
            Message::Twitter(m) => &m.fields,
            Message::Reddit(m) => &m.fields,
            Message::Facebook(m) => &m.fields,
            Message::Chan(m) => &m.fields,
        }
    }

    /// Returns the shared record mutably.
    pub fn fields_mut(&mut self) -> &mut MessageFields {
        match self {
            Message::Twitter(m) => &mut m.fields,
            Message::Reddit(m) => &mut m.fields,
            Message::Facebook(m) => &mut m.fields,
            Message::Chan(m) => &mut m.fields,
        }
    }

    /// Consumes the message, returning the shared record.
    pub fn into_fields(self) -> MessageFields {
        match self {
            Message::Twitter(m) => m.fields,
            Message::Reddit(m) => m.fields,
            Message::Facebook(m) => m.fields,
            Message::Chan(m) => m.fields,
        }
    }

    /// Returns the platform discriminator.
    pub fn platform(&self) -> Platform {
        match self {
            Message::Twitter(_) => Platform::Twitter,
            Message::Reddit(_) => Platform::Reddit,
            Message::Facebook(_) => Platform::Facebook,
            Message::Chan(_) => Platform::Chan,
        }
    }

    /// Returns the message identifier.
    pub fn uid(&self) -> &Uid {
        &self.fields().uid
    }

    /// Returns the post body.
    pub fn text(&self) -> &str {
        &self.fields().text
    }

    /// Returns the author, if known.
    pub fn author(&self) -> Option<&str> {
        self.fields().author.as_deref()
    }

    /// Returns the creation time in unix seconds, if known.
    pub fn created_at(&self) -> Option<f64> {
        self.fields().created_at
    }

    /// Returns the reply targets.
    pub fn reply_to(&self) -> &BTreeSet<Uid> {
        &self.fields().reply_to
    }

    /// Returns the resolved language code, if any.
    pub fn lang(&self) -> Option<&str> {
        self.fields().lang.as_deref()
    }

    /// Returns the attached tags.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.fields().tags
    }

    /// Attaches a tag.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.fields_mut().tags.insert(tag.into());
    }

    /// Adds a reply target.
    pub fn add_reply_to(&mut self, target: impl Into<Uid>) {
        self.fields_mut().reply_to.insert(target.into());
    }

    /// Removes a reply target, returning whether it was present.
    pub fn remove_reply_to(&mut self, target: &Uid) -> bool {
        self.fields_mut().reply_to.remove(target)
    }

    /// Replaces the post body, re-resolving the language when a detector
    /// is supplied.
    pub fn set_text(
        &mut self,
        text: impl Into<String>,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) {
        self.fields_mut().set_text(text, detector, config);
    }

    /// Character count of the post body.
    pub fn chars(&self) -> usize {
        self.fields().chars()
    }

    /// Partition tokens of the post body.
    pub fn tokens(&self) -> Vec<String> {
        self.fields().tokens()
    }

    /// Unigram frequency distribution over the partition tokens.
    pub fn token_distribution(&self) -> BTreeMap<String, usize> {
        self.fields().token_distribution()
    }

    /// Unique partition tokens.
    pub fn types(&self) -> BTreeSet<String> {
        self.fields().types()
    }

    /// Mention strings found in the text, by the platform's convention
    /// and with the platform prefix kept. Facebook and 4chan have none.
    pub fn mentions(&self) -> Vec<String> {
        match self {
            Message::Twitter(m) => m.mentions(),
            Message::Reddit(m) => m.mentions(),
            Message::Facebook(_) | Message::Chan(_) => Vec::new(),
        }
    }

    /// User names mentioned in the text, stripped of the platform prefix
    /// so that a mention of the author and the author field compare equal.
    pub fn mention_names(&self) -> Vec<String> {
        match self {
            Message::Twitter(m) => m.mention_names(),
            Message::Reddit(m) => m.mention_names(),
            Message::Facebook(_) | Message::Chan(_) => Vec::new(),
        }
    }

    /// Every user this post names: the author first, then in-text mentions
    /// in order of appearance, deduplicated. The ordering feeds redaction,
    /// which assigns anonymous ids in first-seen order.
    pub fn user_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut names = Vec::new();
        if let Some(author) = self.author() {
            seen.insert(author.to_string());
            names.push(author.to_string());
        }
        for mention in self.mention_names() {
            if seen.insert(mention.clone()) {
                names.push(mention);
            }
        }
        names
    }

    /// Rewrites the body and author through an anonymization map.
    pub fn redact(&mut self, map: &BTreeMap<String, String>) {
        self.fields_mut().redact(map);
    }

    /// Reconciles another sighting of the same logical post into this one.
    ///
    /// The caller guarantees matching uids; the receiving variant's
    /// platform is kept. Field rules are those of
    /// [`MessageFields::merge`].
    pub fn merge(&mut self, other: Message) {
        self.fields_mut().merge(other.into_fields());
    }

    /// Downcast to the Twitter variant.
    pub fn as_tweet(&self) -> Option<&Tweet> {
        match self {
            Message::Twitter(m) => Some(m),
            _ => None,
        }
    }

    /// Downcast to the Reddit variant.
    pub fn as_reddit(&self) -> Option<&RedditPost> {
        match self {
            Message::Reddit(m) => Some(m),
            _ => None,
        }
    }

    /// Downcast to the Facebook variant.
    pub fn as_facebook(&self) -> Option<&FacebookPost> {
        match self {
            Message::Facebook(m) => Some(m),
            _ => None,
        }
    }

    /// Downcast to the 4chan variant.
    pub fn as_chan(&self) -> Option<&ChanPost> {
        match self {
            Message::Chan(m) => Some(m),
            _ => None,
        }
    }

    /// Encodes the canonical corpus JSON object.
    pub fn to_json(&self) -> Value {
        let fields = self.fields();
        serde_json::json!({
            "uid": fields.uid,
            "text": fields.text,
            "author": fields.author,
            "created_at": fields.created_at,
            "reply_to": fields.reply_to,
            "platform": self.platform().as_str(),
            "tags": fields.tags,
            "lang": fields.lang,
        })
    }

    /// Decodes the canonical corpus JSON object. The `platform` field
    /// selects the variant; an unknown platform is a serialization error.
    pub fn from_json(value: &Value) -> Result<Message> {
        let record: MessageRecord = serde_json::from_value(value.clone())?;
        let platform = Platform::parse(&record.platform).ok_or_else(|| {
            ConvoError::serialization(format!("unknown platform {:?}", record.platform))
        })?;

        let mut fields = MessageFields::new(record.uid);
        fields.text = record.text;
        fields.author = record.author;
        fields.created_at = record.created_at;
        fields.reply_to = record.reply_to.into_iter().collect();
        fields.tags = record.tags.into_iter().collect();
        fields.lang = record.lang;

        Ok(match platform {
            Platform::Twitter => Message::Twitter(Tweet::new(fields)),
            Platform::Reddit => Message::Reddit(RedditPost::new(fields)),
            Platform::Facebook => Message::Facebook(FacebookPost::new(fields)),
            Platform::Chan => Message::Chan(ChanPost::new(fields)),
        })
    }

    /// Serializes to compact snapshot bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| ConvoError::serialization(format!("failed to serialize message: {}", e)))
    }

    /// Deserializes from snapshot bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| ConvoError::serialization(format!("failed to deserialize message: {}", e)))
    }
}

impl From<Tweet> for Message {
    fn from(m: Tweet) -> Self {
        Message::Twitter(m)
    }
}

impl From<RedditPost> for Message {
    fn from(m: RedditPost) -> Self {
        Message::Reddit(m)
    }
}

impl From<FacebookPost> for Message {
    fn from(m: FacebookPost) -> Self {
        Message::Facebook(m)
    }
}

impl From<ChanPost> for Message {
    fn from(m: ChanPost) -> Self {
        Message::Chan(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_message(uid: i64) -> Message {
        Message::Twitter(Tweet::new(
            MessageFields::new(uid)
                .with_text(format!("Post number {}", uid))
                .with_author("tester")
                .with_created_at(1_600_000_000.0 + uid as f64),
        ))
    }

    #[test]
    fn test_accessors_dispatch() {
        let msg = create_test_message(7);
        assert_eq!(msg.uid(), &Uid::Num(7));
        assert_eq!(msg.text(), "Post number 7");
        assert_eq!(msg.author(), Some("tester"));
        assert_eq!(msg.platform(), Platform::Twitter);
        assert!(msg.as_tweet().is_some());
        assert!(msg.as_reddit().is_none());
    }

    #[test]
    fn test_to_json_canonical_shape() {
        let json = create_test_message(1).to_json();
        let obj = json.as_object().unwrap();
        for key in [
            "uid",
            "text",
            "author",
            "created_at",
            "reply_to",
            "platform",
            "tags",
            "lang",
        ] {
            assert!(obj.contains_key(key), "missing {}", key);
        }
        assert_eq!(obj["platform"], "Twitter");
        assert_eq!(obj["uid"], 1);
        assert!(obj["lang"].is_null());
    }

    #[test]
    fn test_json_round_trip_all_platforms() {
        let fields = MessageFields::new("x1")
            .with_text("body")
            .with_reply_to(["x0"])
            .with_tags(["t"]);
        let messages = [
            Message::Twitter(Tweet::new(MessageFields::new(1).with_text("a"))),
            Message::Reddit(RedditPost::new(fields.clone())),
            Message::Facebook(FacebookPost::new(fields.clone())),
            Message::Chan(ChanPost::new(MessageFields::new(2).with_text("b"))),
        ];
        for msg in messages {
            let restored = Message::from_json(&msg.to_json()).unwrap();
            assert_eq!(msg, restored);
        }
    }

    #[test]
    fn test_from_json_rejects_unknown_platform() {
        let raw = serde_json::json!({"uid": 1, "platform": "MySpace"});
        assert!(Message::from_json(&raw).is_err());
    }

    #[test]
    fn test_bincode_round_trip() {
        let msg = create_test_message(3);
        let restored = Message::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(msg, restored);
    }

    #[test]
    fn test_merge_keeps_receiver_variant() {
        let mut a = create_test_message(5);
        let b = Message::Reddit(RedditPost::new(
            MessageFields::new(5)
                .with_text("a much longer text that should win the merge")
                .with_lang("en"),
        ));
        a.merge(b);
        assert_eq!(a.platform(), Platform::Twitter);
        assert_eq!(a.text(), "a much longer text that should win the merge");
        assert_eq!(a.lang(), Some("en"));
    }

    #[test]
    fn test_user_names_order() {
        let msg = Message::Twitter(Tweet::new(
            MessageFields::new(1)
                .with_text("@zara and @adam")
                .with_author("mid"),
        ));
        assert_eq!(msg.user_names(), vec!["mid", "zara", "adam"]);
    }

    #[test]
    fn test_user_names_dedups_author_mention() {
        let msg = Message::Twitter(Tweet::new(
            MessageFields::new(1)
                .with_text("replying to @mid again")
                .with_author("mid"),
        ));
        assert_eq!(msg.user_names(), vec!["mid"]);
    }
}
