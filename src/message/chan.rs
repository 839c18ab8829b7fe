//! 4chan message variant.
//!
//! Cached 4chan posts carry their comment as HTML. Cleaning unescapes
//! entities, strips the markup 4chan emits (`<br>`, quote links, spans,
//! code blocks), lifts `>>12345` quote references out as reply targets,
//! and squeezes the leftover whitespace down to single spaces.

use super::fields::{MessageFields, Uid};
use crate::error::{ConvoError, Result};
use crate::lang::{resolve_lang, DetectorConfig, LangDetect};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

static BR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<w?br/?>").unwrap());
static ANCHOR_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<a href=".+" class="(\w+)">"#).unwrap());
static SPAN_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<span class="(\w+)">"#).unwrap());
static PRE_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<pre class="(\w+)">"#).unwrap());
static QUOTE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r">>(\d+)").unwrap());
static QUOTE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>>\d+").unwrap());
static NON_ASCII: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\x00-\x7F]").unwrap());
static ENTITY_REMNANT: Lazy<Regex> = Lazy::new(|| Regex::new(r"&(amp|lt|gt|ge|le);?").unwrap());
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s\s+").unwrap());

/// A post from 4chan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChanPost {
    pub fields: MessageFields,
}

impl ChanPost {
    /// Wraps an already-populated record.
    pub fn new(fields: MessageFields) -> Self {
        Self { fields }
    }

    /// Removes quote references from a comment, returning the cleaned
    /// comment and the referenced post numbers.
    ///
    /// Lines that are nothing but a quote link are dropped entirely;
    /// inline references are erased in place.
    pub fn exclude_replies(comment: &str) -> (String, Vec<i64>) {
        let refs: Vec<i64> = QUOTE_REF
            .captures_iter(comment)
            .filter_map(|c| c[1].parse().ok())
            .collect();

        let kept: Vec<&str> = comment
            .split('\n')
            .filter(|line| !QUOTE_LINE.is_match(line.trim()))
            .collect();
        let cleaned = QUOTE_REF.replace_all(&kept.join("\n"), "").into_owned();

        (cleaned, refs)
    }

    /// Cleans the raw HTML of a cached 4chan comment, returning the plain
    /// text and the quote references found along the way.
    pub fn clean_text(comment: &str) -> (String, Vec<i64>) {
        let text = html_escape::decode_html_entities(comment).into_owned();
        let text = BR_TAG.replace_all(&text, "\n");
        let text = ANCHOR_OPEN.replace_all(&text, " ");
        let text = text.replace("</a>", " ");
        let text = SPAN_OPEN.replace_all(&text, " ");
        let text = text.replace("</span>", " ");
        let text = PRE_OPEN.replace_all(&text, " ");
        let text = text.replace("</pre>", " ");

        let (text, refs) = Self::exclude_replies(&text);

        let text = NON_ASCII.replace_all(&text, " ");
        let text = ENTITY_REMNANT.replace_all(&text, " ");
        let text = MULTI_SPACE.replace_all(&text, " ");
        let text = text.replace('\n', " ");

        (text.trim().to_string(), refs)
    }

    /// Converts one raw record into a message.
    ///
    /// Records without a comment body (`com`) or post number (`no`) are
    /// skipped; a zero `resto` marks a thread root. A post quoting itself
    /// drops the self-reference.
    pub fn parse_raw(
        data: &Value,
        detector: Option<&dyn LangDetect>,
        config: DetectorConfig,
    ) -> Result<Option<ChanPost>> {
        let obj = data
            .as_object()
            .ok_or_else(|| ConvoError::parse("4chan record is not a JSON object"))?;

        let com = match obj.get("com").and_then(Value::as_str) {
            Some(com) => com,
            None => return Ok(None),
        };
        let uid = match obj.get("no").and_then(Value::as_i64) {
            Some(no) => no,
            None => {
                debug!("skipping 4chan record without a post number");
                return Ok(None);
            }
        };

        let (text, refs) = Self::clean_text(com);

        let mut fields = MessageFields::new(uid).with_text(text);
        if let Some(resto) = obj.get("resto").and_then(Value::as_i64) {
            if resto != 0 {
                fields.reply_to.insert(Uid::Num(resto));
            }
        }
        for target in refs {
            fields.reply_to.insert(Uid::Num(target));
        }
        fields.reply_to.remove(&Uid::Num(uid));

        fields.created_at = obj.get("time").and_then(Value::as_f64);
        if let Some(name) = obj.get("name").and_then(Value::as_str) {
            fields.author = Some(name.to_string());
        }
        fields.lang = resolve_lang(detector, config, &fields.text);

        Ok(Some(ChanPost::new(fields)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_text_strips_markup() {
        let raw = "Look at this<br><span class=\"quote\">&gt;implying</span> it works";
        let (text, refs) = ChanPost::clean_text(raw);
        assert!(refs.is_empty());
        assert_eq!(text, "Look at this >implying it works");
    }

    #[test]
    fn test_clean_text_extracts_quote_refs() {
        let raw = ">>100<br>I disagree with >>101 completely";
        let (text, refs) = ChanPost::clean_text(raw);
        assert_eq!(refs, vec![100, 101]);
        assert_eq!(text, "I disagree with completely");
    }

    #[test]
    fn test_exclude_replies_drops_pure_quote_lines() {
        let (text, refs) = ChanPost::exclude_replies(">>55\nactual content here");
        assert_eq!(refs, vec![55]);
        assert_eq!(text, "actual content here");
    }

    #[test]
    fn test_parse_raw_thread_reply() {
        let raw = json!({
            "no": 102,
            "resto": 100,
            "time": 1_600_000_000,
            "name": "Anonymous",
            "com": "&gt;&gt;101<br>this"
        });
        let post = ChanPost::parse_raw(&raw, None, DetectorConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(post.fields.uid, Uid::Num(102));
        assert!(post.fields.reply_to.contains(&Uid::Num(100)));
        assert!(post.fields.reply_to.contains(&Uid::Num(101)));
        assert_eq!(post.fields.text, "this");
        assert_eq!(post.fields.created_at, Some(1_600_000_000.0));
    }

    #[test]
    fn test_parse_raw_removes_self_reference() {
        let raw = json!({
            "no": 102,
            "resto": 0,
            "time": 1_600_000_000,
            "com": "replying to myself &gt;&gt;102"
        });
        let post = ChanPost::parse_raw(&raw, None, DetectorConfig::default())
            .unwrap()
            .unwrap();
        assert!(post.fields.reply_to.is_empty());
    }

    #[test]
    fn test_parse_raw_skips_commentless_record() {
        let raw = json!({"no": 103, "time": 1_600_000_000});
        assert!(ChanPost::parse_raw(&raw, None, DetectorConfig::default())
            .unwrap()
            .is_none());
    }
}
