//! Facebook message variant.
//!
//! Page exports arrive in three shapes: the top-level post, a page of
//! comments on it, and nested replies (which recurse). Comments and
//! replies may be wrapped in a `{"data": [...]}` envelope or be a bare
//! array; both are accepted.

use super::fields::{MessageFields, Uid};
use crate::error::{ConvoError, Result};
use crate::lang::{resolve_lang, DetectorConfig, LangDetect};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A post or comment from Facebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacebookPost {
    pub fields: MessageFields,
}

impl FacebookPost {
    /// Wraps an already-populated record.
    pub fn new(fields: MessageFields) -> Self {
        Self { fields }
    }

    /// Parses Facebook's `created_time` format into unix seconds.
    pub fn parse_datestr(raw: &str) -> Result<f64> {
        DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z")
            .map(|dt| dt.timestamp() as f64)
            .map_err(|e| ConvoError::parse(format!("facebook created_time {:?}: {}", raw, e)))
    }

    /// Converts a raw top-level page post into a message.
    ///
    /// The text is the concatenation of `description` and `message` (either
    /// may be absent). Records without an id are skipped.
    pub fn parse_raw_post(
        data: &Value,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) -> Result<Option<FacebookPost>> {
        let obj = data
            .as_object()
            .ok_or_else(|| ConvoError::parse("facebook record is not a JSON object"))?;

        let uid = match obj.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                debug!("skipping facebook post without an id");
                return Ok(None);
            }
        };

        let mut text = String::new();
        for text_key in ["description", "message"] {
            if let Some(part) = obj.get(text_key).and_then(Value::as_str) {
                text.push_str(part);
            }
        }

        let mut fields = MessageFields::new(uid).with_text(text);
        if let Some(stamp) = obj.get("created_time").and_then(Value::as_str) {
            fields.created_at = Some(Self::parse_datestr(stamp)?);
        }
        if let Some(author) = obj.get("name").and_then(Value::as_str) {
            fields.author = Some(author.to_string());
        }
        fields.lang = resolve_lang(detector, config, &fields.text);

        Ok(Some(FacebookPost::new(fields)))
    }

    /// Converts a page of comments into messages, linking each to
    /// `in_reply_to` when given.
    pub fn parse_raw_comments(
        data: &Value,
        in_reply_to: Option<&Uid>,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) -> Result<Vec<FacebookPost>> {
        let mut out = Vec::new();
        for comment in Self::comment_list(data) {
            if let Some(post) = Self::parse_comment(comment, in_reply_to, detector, config)? {
                out.push(post);
            }
        }
        Ok(out)
    }

    /// Converts nested replies into messages, recursing through deeper
    /// `replies` blocks with the surrounding comment as the parent.
    pub fn parse_raw_replies(
        data: &Value,
        in_reply_to: Option<&Uid>,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) -> Result<Vec<FacebookPost>> {
        let mut out = Vec::new();
        for comment in Self::comment_list(data) {
            let parsed = Self::parse_comment(comment, in_reply_to, detector, config)?;
            if let Some(post) = parsed {
                if let Some(nested) = comment.get("replies") {
                    out.extend(Self::parse_raw_replies(
                        nested,
                        Some(&post.fields.uid),
                        detector,
                        config,
                    )?);
                }
                out.push(post);
            }
        }
        Ok(out)
    }

    /// Unwraps the `{"data": [...]}` envelope, accepting a bare array too.
    fn comment_list(data: &Value) -> impl Iterator<Item = &Value> {
        data.get("data")
            .and_then(Value::as_array)
            .or_else(|| data.as_array())
            .into_iter()
            .flatten()
    }

    fn parse_comment(
        comment: &Value,
        in_reply_to: Option<&Uid>,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) -> Result<Option<FacebookPost>> {
        let obj = match comment.as_object() {
            Some(obj) => obj,
            None => return Ok(None),
        };
        let uid = match obj.get("id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => {
                debug!("skipping facebook comment without an id");
                return Ok(None);
            }
        };

        let mut fields = MessageFields::new(uid);
        if let Some(message) = obj.get("message").and_then(Value::as_str) {
            fields.text = message.to_string();
        }
        if let Some(stamp) = obj.get("created_time").and_then(Value::as_str) {
            fields.created_at = Some(Self::parse_datestr(stamp)?);
        }
        if let Some(author) = obj.get("userID").and_then(Value::as_str) {
            fields.author = Some(author.to_string());
        }
        if let Some(parent) = in_reply_to {
            fields.reply_to.insert(parent.clone());
        }
        fields.lang = resolve_lang(detector, config, &fields.text);

        Ok(Some(FacebookPost::new(fields)))
    }
}
