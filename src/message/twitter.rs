//! Twitter message variant.
//!
//! Handles the raw API export shape: `full_text`/`text` bodies, the
//! `%a %b %d %H:%M:%S +0000 %Y` timestamp format, reply and quote links,
//! and t.co URL expansion from the `entities` block. A quoted status is
//! itself a post, so parsing one raw record can yield two messages.

use super::fields::{MessageFields, Uid};
use crate::error::{ConvoError, Result};
use crate::lang::{resolve_lang, DetectorConfig, LangDetect};
use chrono::DateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// `@name` mentions; the capture runs to the next whitespace or colon.
static MENTION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([^\s:]+)").unwrap());

/// A post from Twitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub fields: MessageFields,
}

impl Tweet {
    /// Wraps an already-populated record.
    pub fn new(fields: MessageFields) -> Self {
        Self { fields }
    }

    /// Parses Twitter's `created_at` string into unix seconds.
    pub fn parse_datestr(raw: &str) -> Result<f64> {
        DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y")
            .map(|dt| dt.timestamp() as f64)
            .map_err(|e| ConvoError::parse(format!("tweet created_at {:?}: {}", raw, e)))
    }

    /// Mention strings found in the text, `@` prefix included.
    pub fn mentions(&self) -> Vec<String> {
        MENTION_PATTERN
            .find_iter(&self.fields.text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// User names mentioned in the text, without the `@` prefix.
    pub fn mention_names(&self) -> Vec<String> {
        MENTION_PATTERN
            .captures_iter(&self.fields.text)
            .map(|c| c[1].to_string())
            .collect()
    }

    /// Converts one raw API record into messages.
    ///
    /// A `quoted_status` expands recursively into an additional message
    /// (ordered before the quoting tweet). Records without an id or text
    /// body are skipped. Unknown keys are ignored.
    pub fn parse_raw(
        data: &Value,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) -> Result<Vec<Tweet>> {
        let obj = data
            .as_object()
            .ok_or_else(|| ConvoError::parse("tweet record is not a JSON object"))?;

        let mut out = Vec::new();
        if let Some(quoted) = obj.get("quoted_status") {
            out.extend(Tweet::parse_raw(quoted, detector, config)?);
        }

        let uid = match obj.get("id").and_then(Value::as_i64) {
            Some(id) => id,
            None => {
                debug!("skipping tweet record without an id");
                return Ok(out);
            }
        };

        let mut text = obj
            .get("full_text")
            .and_then(Value::as_str)
            .or_else(|| obj.get("text").and_then(Value::as_str))
            .map(|s| s.to_string());

        // Expand t.co links in place before any tokenization downstream
        if let Some(entities) = obj.get("entities").and_then(Value::as_object) {
            if let Some(body) = text.as_mut() {
                for item in entities
                    .get("media")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    if let (Some(url), Some(display)) = (
                        item.get("url").and_then(Value::as_str),
                        item.get("display_url").and_then(Value::as_str),
                    ) {
                        *body = body.replace(url, display);
                    }
                }
                for item in entities
                    .get("urls")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                {
                    if let (Some(url), Some(expanded)) = (
                        item.get("url").and_then(Value::as_str),
                        item.get("expanded_url").and_then(Value::as_str),
                    ) {
                        *body = body.replace(url, expanded);
                    }
                }
            }
        }

        let text = match text {
            Some(t) => t,
            None => {
                debug!(uid, "skipping tweet record without a text body");
                return Ok(out);
            }
        };

        let mut fields = MessageFields::new(uid).with_text(text);
        for key in ["in_reply_to_status_id", "quoted_status_id"] {
            if let Some(target) = obj.get(key).and_then(Value::as_i64) {
                fields.reply_to.insert(Uid::Num(target));
            }
        }
        if let Some(stamp) = obj.get("created_at").and_then(Value::as_str) {
            fields.created_at = Some(Tweet::parse_datestr(stamp)?);
        }
        if let Some(author) = obj
            .get("user")
            .and_then(|u| u.get("screen_name"))
            .and_then(Value::as_str)
        {
            fields.author = Some(author.to_string());
        }
        fields.lang = obj
            .get("lang")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .or_else(|| resolve_lang(detector, config, &fields.text));

        out.push(Tweet::new(fields));
        Ok(out)
    }
}
