//! Corpus readers and writers.
//!
//! Conversations move through files in the canonical shape produced by
//! [`Conversation::to_json`]: a flat JSON array of post objects, with
//! reply edges re-derived on load. [`ConvoReader`] streams that shape
//! back out of a batch of files, splitting each file into its
//! reply-connected conversations. [`RawReader`] does the same for
//! unprocessed platform exports, funneling every record through the
//! owning platform's `parse_raw` before segmentation.
//!
//! Batch runs keep going: an unreadable or structurally broken file
//! surfaces as one `Err` item in the stream, while a malformed record
//! inside an otherwise healthy file is dropped with a `debug!` log.

use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::convo::Conversation;
use crate::error::Result;
use crate::lang::{DetectorConfig, LangDetect};
use crate::message::{ChanPost, FacebookPost, Message, Platform, RedditPost, Tweet};

/// Reads corpus files in the canonical flat-array (or line-delimited)
/// shape.
pub struct ConvoReader;

impl ConvoReader {
    /// Reads every conversation from `paths` eagerly, failing on the
    /// first broken file.
    pub fn read<P>(paths: impl IntoIterator<Item = P>) -> Result<Vec<Conversation>>
    where
        P: AsRef<Path>,
    {
        Self::iter_read(paths).collect()
    }

    /// Streams conversations lazily, one item per reply-connected
    /// segment of each file. A broken file becomes a single `Err` item
    /// and the stream moves on to the next path.
    pub fn iter_read<P>(
        paths: impl IntoIterator<Item = P>,
    ) -> impl Iterator<Item = Result<Conversation>>
    where
        P: AsRef<Path>,
    {
        paths
            .into_iter()
            .flat_map(|path| match Self::read_file(path.as_ref()) {
                Ok(segments) => segments.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
    }

    fn read_file(path: &Path) -> Result<Vec<Conversation>> {
        let text = fs::read_to_string(path)?;
        let mut convo = Conversation::new();
        if text.trim_start().starts_with('[') {
            let items: Vec<Value> = serde_json::from_str(&text)?;
            for item in &items {
                Self::ingest(&mut convo, item);
            }
        } else {
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                match serde_json::from_str::<Value>(line) {
                    Ok(item) => Self::ingest(&mut convo, &item),
                    Err(e) => debug!(error = %e, "skipping unparseable corpus line"),
                }
            }
        }
        Ok(convo.segment())
    }

    fn ingest(convo: &mut Conversation, item: &Value) {
        match Message::from_json(item) {
            Ok(post) => convo.add_post(post),
            Err(e) => debug!(error = %e, "skipping malformed corpus record"),
        }
    }
}

/// Streams conversations out of raw platform exports.
///
/// One reader handles one platform. Each file's records run through the
/// platform's `parse_raw`, accumulate into a single [`Conversation`],
/// and come out segmented.
pub struct RawReader<'d> {
    platform: Platform,
    detector: Option<&'d dyn LangDetect>,
    config: DetectorConfig,
}

impl<'d> RawReader<'d> {
    /// Creates a reader with language detection disabled.
    pub fn new(platform: Platform) -> RawReader<'static> {
        RawReader {
            platform,
            detector: None,
            config: DetectorConfig::default(),
        }
    }

    /// Creates a reader that runs `detector` over every parsed record.
    pub fn with_detector(
        platform: Platform,
        detector: &'d dyn LangDetect,
        config: DetectorConfig,
    ) -> RawReader<'d> {
        RawReader {
            platform,
            detector: Some(detector),
            config,
        }
    }

    /// Streams conversations out of `paths`, one item per
    /// reply-connected segment. File-level failures become `Err` items;
    /// the stream continues with the next file.
    pub fn iter_read<'a, P>(
        &'a self,
        paths: impl IntoIterator<Item = P> + 'a,
    ) -> impl Iterator<Item = Result<Conversation>> + 'a
    where
        P: AsRef<Path> + 'a,
    {
        paths
            .into_iter()
            .flat_map(move |path| match self.read_file(path.as_ref()) {
                Ok(segments) => segments.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            })
    }

    fn read_file(&self, path: &Path) -> Result<Vec<Conversation>> {
        let text = fs::read_to_string(path)?;
        let mut convo = Conversation::new();
        match serde_json::from_str::<Value>(&text) {
            Ok(document) => {
                for record in Self::records(&document) {
                    self.ingest(&mut convo, record);
                }
            }
            Err(document_err) => {
                // Line-delimited export. Unparseable lines are dropped,
                // but a file that yields nothing at all is reported as
                // broken rather than silently empty.
                let mut parsed_any = false;
                let mut saw_line = false;
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    saw_line = true;
                    match serde_json::from_str::<Value>(line) {
                        Ok(record) => {
                            parsed_any = true;
                            self.ingest(&mut convo, &record);
                        }
                        Err(e) => debug!(error = %e, "skipping unparseable raw line"),
                    }
                }
                if saw_line && !parsed_any {
                    return Err(document_err.into());
                }
            }
        }
        Ok(convo.segment())
    }

    /// Splits a parsed document into raw records. Exports arrive as a
    /// top-level array, a `{"posts": [...]}` thread envelope, a dump
    /// keyed by post id, or a single record.
    fn records(document: &Value) -> Vec<&Value> {
        match document {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => {
                if let Some(posts) = map.get("posts").and_then(Value::as_array) {
                    posts.iter().collect()
                } else if !map.is_empty() && map.values().all(Value::is_object) {
                    map.values().collect()
                } else {
                    vec![document]
                }
            }
            _ => Vec::new(),
        }
    }

    fn ingest(&self, convo: &mut Conversation, record: &Value) {
        if let Err(e) = self.parse_record(convo, record) {
            debug!(error = %e, "skipping malformed raw record");
        }
    }

    fn parse_record(&self, convo: &mut Conversation, record: &Value) -> Result<()> {
        match self.platform {
            Platform::Twitter => {
                for tweet in Tweet::parse_raw(record, self.detector, self.config)? {
                    convo.add_post(tweet.into());
                }
            }
            Platform::Reddit => {
                if let Some(post) = RedditPost::parse_raw(record, self.detector, self.config)? {
                    convo.add_post(post.into());
                }
            }
            Platform::Chan => {
                if let Some(post) = ChanPost::parse_raw(record, self.detector, self.config)? {
                    convo.add_post(post.into());
                }
            }
            Platform::Facebook => {
                let parsed = FacebookPost::parse_raw_post(record, self.detector, self.config)?;
                if let Some(post) = parsed {
                    let parent = post.fields.uid.clone();
                    convo.add_post(post.into());
                    if let Some(block) = record.get("comments") {
                        for comment in FacebookPost::parse_raw_replies(
                            block,
                            Some(&parent),
                            self.detector,
                            self.config,
                        )? {
                            convo.add_post(comment.into());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Writes a conversation to `path` in the canonical flat-array shape
/// read back by [`ConvoReader`].
pub fn write_json(convo: &Conversation, path: impl AsRef<Path>) -> Result<()> {
    let text = serde_json::to_string(&convo.to_json())?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageFields, Uid};
    use serde_json::json;
    use tempfile::TempDir;

    fn tweet(uid: i64, reply_to: Option<i64>) -> Message {
        let mut fields = MessageFields::new(uid).with_text(format!("Post {uid}"));
        fields.author = Some(format!("USER{}", uid % 2));
        fields.created_at = Some(uid as f64);
        if let Some(parent) = reply_to {
            fields.reply_to.insert(Uid::Num(parent));
        }
        Tweet::new(fields).into()
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("convo.json");

        let mut convo = Conversation::new();
        convo.add_post(tweet(1, None));
        convo.add_post(tweet(2, Some(1)));
        write_json(&convo, &path).unwrap();

        let read: Vec<Conversation> = ConvoReader::iter_read([&path])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].messages(), 2);
        assert_eq!(read[0].posts(), convo.posts());
    }

    #[test]
    fn test_read_splits_file_into_segments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mixed.json");

        let mut convo = Conversation::new();
        convo.add_post(tweet(1, None));
        convo.add_post(tweet(2, Some(1)));
        convo.add_post(tweet(10, None));
        write_json(&convo, &path).unwrap();

        let read = ConvoReader::read([&path]).unwrap();
        let mut sizes: Vec<usize> = read.iter().map(Conversation::messages).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2]);
    }

    #[test]
    fn test_line_delimited_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("posts.jsonl");

        let a = serde_json::to_string(&tweet(1, None).to_json()).unwrap();
        let b = serde_json::to_string(&tweet(2, Some(1)).to_json()).unwrap();
        fs::write(&path, format!("{a}\n{{broken\n{b}\n")).unwrap();

        let read: Vec<Conversation> = ConvoReader::iter_read([&path])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].messages(), 2);
    }

    #[test]
    fn test_missing_file_yields_err_item() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.json");
        let mut convo = Conversation::new();
        convo.add_post(tweet(1, None));
        write_json(&convo, &good).unwrap();

        let missing = dir.path().join("missing.json");
        let items: Vec<_> = ConvoReader::iter_read([&missing, &good]).collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap().messages(), 1);
    }

    #[test]
    fn test_raw_twitter_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tweets.jsonl");

        let first = json!({
            "id": 1,
            "text": "First post",
            "user": {"screen_name": "alice"},
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
        })
        .to_string();
        let second = json!({
            "id": 2,
            "text": "Replying to @alice",
            "in_reply_to_status_id": 1,
            "user": {"screen_name": "bob"},
        })
        .to_string();
        fs::write(&path, format!("{first}\nnot-a-record\n{second}\n")).unwrap();

        let reader = RawReader::new(Platform::Twitter);
        let read: Vec<Conversation> = reader
            .iter_read([&path])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].messages(), 2);
        let reply = read[0].posts().get(&Uid::Num(2)).unwrap();
        assert!(reply.reply_to().contains(&Uid::Num(1)));
    }

    #[test]
    fn test_raw_chan_thread_envelope() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("thread.json");

        let doc = json!({
            "posts": [
                {"no": 100, "com": "Opening post", "time": 100, "name": "Anonymous"},
                {
                    "no": 101,
                    "com": "<a href=\"#p100\" class=\"quotelink\">&gt;&gt;100</a> agreed",
                    "resto": 100,
                    "time": 160,
                },
            ]
        });
        fs::write(&path, doc.to_string()).unwrap();

        let reader = RawReader::new(Platform::Chan);
        let read: Vec<Conversation> = reader
            .iter_read([&path])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].messages(), 2);
        let reply = read[0].posts().get(&Uid::Num(101)).unwrap();
        assert!(reply.reply_to().contains(&Uid::Num(100)));
    }

    #[test]
    fn test_raw_facebook_nested_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.json");

        let doc = json!({
            "id": "post_1",
            "message": "Announcement",
            "name": "SomePage",
            "comments": {"data": [
                {"id": "c_1", "message": "Nice", "userID": "u9"},
            ]}
        });
        fs::write(&path, doc.to_string()).unwrap();

        let reader = RawReader::new(Platform::Facebook);
        let read: Vec<Conversation> = reader
            .iter_read([&path])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].messages(), 2);
        let comment = read[0]
            .posts()
            .get(&Uid::Text("c_1".to_string()))
            .unwrap();
        assert!(comment
            .reply_to()
            .contains(&Uid::Text("post_1".to_string())));
    }

    #[test]
    fn test_raw_garbage_file_is_err() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.txt");
        fs::write(&path, "complete garbage\nmore garbage\n").unwrap();

        let reader = RawReader::new(Platform::Reddit);
        let items: Vec<_> = reader.iter_read([&path]).collect();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
