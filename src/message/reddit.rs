//! Reddit message variant.
//!
//! Raw records use fullname ids (`t3_...` submissions, `t1_...` comments),
//! unix-float timestamps in `created`/`created_utc`, and a `parent_id`
//! link. Submissions carry `title` + `selftext`/`body`; the title is
//! prepended to the body so every message has a single text field.

use super::fields::MessageFields;
use crate::error::{ConvoError, Result};
use crate::lang::{resolve_lang, DetectorConfig, LangDetect};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// `/u/name` or `u/name` mentions.
static MENTION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/?u/([A-Za-z0-9_-]+)").unwrap());

/// A post or comment from Reddit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditPost {
    pub fields: MessageFields,
}

impl RedditPost {
    /// Wraps an already-populated record.
    pub fn new(fields: MessageFields) -> Self {
        Self { fields }
    }

    /// Reads a unix timestamp that may arrive as a number or a numeric
    /// string (both occur in the wild).
    pub fn parse_timestamp(value: &Value) -> Option<f64> {
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
    }

    /// Mention strings found in the text, `u/` prefix included.
    pub fn mentions(&self) -> Vec<String> {
        MENTION_PATTERN
            .find_iter(&self.fields.text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// User names mentioned in the text, without the `u/` prefix.
    pub fn mention_names(&self) -> Vec<String> {
        MENTION_PATTERN
            .captures_iter(&self.fields.text)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Converts one raw record into a message.
    ///
    /// Records without a `name` id are skipped. Unknown keys are ignored.
    pub fn parse_raw(
        data: &Value,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) -> Result<Option<RedditPost>> {
        let obj = data
            .as_object()
            .ok_or_else(|| ConvoError::parse("reddit record is not a JSON object"))?;

        let uid = match obj.get("name").and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                debug!("skipping reddit record without a fullname id");
                return Ok(None);
            }
        };

        let mut text = String::new();
        if let Some(title) = obj.get("title").and_then(Value::as_str) {
            text.push_str(title);
        }
        for body_key in ["selftext", "body"] {
            if let Some(body) = obj.get(body_key).and_then(Value::as_str) {
                if !text.is_empty() && !body.is_empty() {
                    text.push(' ');
                }
                text.push_str(body);
            }
        }

        let mut fields = MessageFields::new(uid).with_text(text);
        if let Some(author) = obj.get("author_name").and_then(Value::as_str) {
            fields.author = Some(author.to_string());
        }
        for stamp_key in ["created", "created_utc"] {
            if fields.created_at.is_none() {
                fields.created_at = obj.get(stamp_key).and_then(Self::parse_timestamp);
            }
        }
        if let Some(parent) = obj.get("parent_id").and_then(Value::as_str) {
            fields.reply_to.insert(parent.into());
        }
        fields.lang = resolve_lang(detector, config, &fields.text);

        Ok(Some(RedditPost::new(fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::fields::Uid;
    use serde_json::json;

    #[test]
    fn test_mentions() {
        let post = RedditPost::new(
            MessageFields::new("t1_a").with_text("ask /u/spez or u/alice-b about it"),
        );
        let mentions = post.mentions();
        assert_eq!(mentions, vec!["/u/spez".to_string(), "u/alice-b".to_string()]);

        let names = post.mention_names();
        assert_eq!(names, vec!["spez".to_string(), "alice-b".to_string()]);
    }

    #[test]
    fn test_parse_raw_comment() {
        let raw = json!({
            "name": "t1_abc",
            "author_name": "alice",
            "body": "I agree",
            "created_utc": 1_600_000_000.0,
            "parent_id": "t3_root",
            "score": 12
        });
        let post = RedditPost::parse_raw(&raw, None, DetectorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(post.fields.uid, Uid::Text("t1_abc".to_string()));
        assert_eq!(post.fields.text, "I agree");
        assert_eq!(post.fields.created_at, Some(1_600_000_000.0));
        assert!(post.fields.reply_to.contains(&Uid::Text("t3_root".to_string())));
    }

    #[test]
    fn test_parse_raw_submission_prepends_title() {
        let raw = json!({
            "name": "t3_root",
            "title": "Big question",
            "selftext": "What do you all think?",
            "created": "1600000100"
        });
        let post = RedditPost::parse_raw(&raw, None, DetectorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(post.fields.text, "Big question What do you all think?");
        assert_eq!(post.fields.created_at, Some(1_600_000_100.0));
        assert!(post.fields.reply_to.is_empty());
    }

    #[test]
    fn test_parse_raw_skips_unnamed_record() {
        let raw = json!({"body": "orphan"});
        let post = RedditPost::parse_raw(&raw, None, DetectorConfig::default()).unwrap();
        assert!(post.is_none());
    }
}
