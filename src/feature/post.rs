//! Features measured from a single post in isolation.
//!
//! Everything here reads one [`Message`] and nothing else; features
//! that need the surrounding conversation live in
//! [`post_in_conv`](super::post_in_conv). Extractors are grouped by
//! value shape (bools, ints, floats, categoricals, substring lists,
//! counters) so downstream aggregation can fold each shape uniformly.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::message::Message;

use super::harmonic::{self, MixingParams};

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\b(https?|ftp|file)://)[-A-Za-z0-9+&@#/%?=~_|!:,.;]+[-A-Za-z0-9+&@#/%=~_|]")
        .unwrap()
});

static HASHTAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").unwrap());

/// Code points in the common emoji blocks. Multi-code-point sequences
/// (skin tones, ZWJ families) extract as one entry per component.
static EMOJI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{1F1E6}-\u{1FAFF}\u{2600}-\u{27BF}\u{2B00}-\u{2BFF}]").unwrap()
});

/// URLs appearing in `text`.
pub fn urls(text: &str) -> Vec<String> {
    URL_PATTERN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Hashtags appearing in `text`, `#` included.
pub fn hashtags(text: &str) -> Vec<String> {
    HASHTAG_PATTERN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Emoji code points appearing in `text`.
pub fn emojis(text: &str) -> Vec<String> {
    EMOJI_PATTERN.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Boolean features of a post.
pub fn bools(post: &Message) -> BTreeMap<String, bool> {
    [("is_source".to_string(), is_source(post))].into_iter().collect()
}

/// Whether this post replies to nothing at all, by its own metadata.
/// Unlike the in-conversation source notion, targets absent from any
/// conversation still count here.
pub fn is_source(post: &Message) -> bool {
    post.reply_to().is_empty()
}

/// Identifier of a post-level integer feature. Keeping the set as an
/// enum makes it statically enumerable: a variant without a key or a
/// measurement is a compile error, and no string-keyed registry
/// decides at runtime what can be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostIntFeature {
    QuestionCount,
    ExclamationCount,
    CharCount,
    EmojiCount,
    HashtagCount,
    MentionCount,
    DegreeOut,
    PunctCount,
    TokenCount,
    TypeCount,
    UppercaseCount,
    UrlCount,
}

impl PostIntFeature {
    pub const ALL: [PostIntFeature; 12] = [
        PostIntFeature::QuestionCount,
        PostIntFeature::ExclamationCount,
        PostIntFeature::CharCount,
        PostIntFeature::EmojiCount,
        PostIntFeature::HashtagCount,
        PostIntFeature::MentionCount,
        PostIntFeature::DegreeOut,
        PostIntFeature::PunctCount,
        PostIntFeature::TokenCount,
        PostIntFeature::TypeCount,
        PostIntFeature::UppercaseCount,
        PostIntFeature::UrlCount,
    ];

    /// Output key for this feature.
    pub fn key(self) -> &'static str {
        match self {
            PostIntFeature::QuestionCount => "?_count",
            PostIntFeature::ExclamationCount => "!_count",
            PostIntFeature::CharCount => "char_count",
            PostIntFeature::EmojiCount => "emoji_count",
            PostIntFeature::HashtagCount => "hashtag_count",
            PostIntFeature::MentionCount => "mention_count",
            PostIntFeature::DegreeOut => "degree_out",
            PostIntFeature::PunctCount => "punct_count",
            PostIntFeature::TokenCount => "token_count",
            PostIntFeature::TypeCount => "type_count",
            PostIntFeature::UppercaseCount => "uppercase_count",
            PostIntFeature::UrlCount => "url_count",
        }
    }

    /// Measures this feature on a post.
    pub fn measure(self, post: &Message) -> i64 {
        let text = post.text();
        match self {
            PostIntFeature::QuestionCount => count_char(text, &['?']),
            PostIntFeature::ExclamationCount => count_char(text, &['!']),
            PostIntFeature::CharCount => post.chars() as i64,
            PostIntFeature::EmojiCount => emojis(text).len() as i64,
            PostIntFeature::HashtagCount => hashtags(text).len() as i64,
            PostIntFeature::MentionCount => post.mentions().len() as i64,
            PostIntFeature::DegreeOut => post.reply_to().len() as i64,
            PostIntFeature::PunctCount => {
                count_char(text, &[',', '.', '?', '!', ';', '\'', '"'])
            }
            PostIntFeature::TokenCount => post.tokens().len() as i64,
            PostIntFeature::TypeCount => post.token_distribution().len() as i64,
            PostIntFeature::UppercaseCount => {
                text.chars().filter(char::is_ascii_uppercase).count() as i64
            }
            PostIntFeature::UrlCount => urls(text).len() as i64,
        }
    }
}

/// Integer features of a post, one entry per [`PostIntFeature`].
pub fn ints(post: &Message) -> BTreeMap<String, i64> {
    PostIntFeature::ALL
        .into_iter()
        .map(|feature| (feature.key().to_string(), feature.measure(post)))
        .collect()
}

/// Float features of a post: the five mixing-law parameters fitted to
/// its type frequency distribution.
pub fn floats(post: &Message) -> BTreeMap<String, f64> {
    let params = mixing_features(post);
    [
        ("mixing_k1", params.k1),
        ("mixing_theta", params.theta),
        ("mixing_entropy", params.entropy),
        ("mixing_N_avg", params.n_avg),
        ("mixing_M_avg", params.m_avg),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Categorical string features of a post. A missing author maps to
/// the empty string and a missing language to `und`.
pub fn categoricals(post: &Message) -> BTreeMap<String, String> {
    [
        ("author", post.author().unwrap_or_default().to_string()),
        ("language", post.lang().unwrap_or(crate::lang::UND).to_string()),
        ("platform", post.platform().as_str().to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Substring-list features of a post.
pub fn substrings(post: &Message) -> BTreeMap<String, Vec<String>> {
    let text = post.text();
    [
        ("emojis", emojis(text)),
        ("hashtags", hashtags(text)),
        ("mentions", post.mentions()),
        ("tokens", post.tokens()),
        ("urls", urls(text)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Counter features of a post.
pub fn counters(post: &Message) -> BTreeMap<String, BTreeMap<String, usize>> {
    [("type_frequency".to_string(), post.token_distribution())]
        .into_iter()
        .collect()
}

/// Mixing-law parameters of the post's type frequency distribution.
pub fn mixing_features(post: &Message) -> MixingParams {
    harmonic::mixing(&post.token_distribution())
}

/// Per-type surprisal over the post's type frequency distribution.
pub fn novelty_vector(post: &Message) -> Vec<f64> {
    harmonic::novelty(&post.token_distribution())
}

fn count_char(text: &str, wanted: &[char]) -> i64 {
    text.chars().filter(|c| wanted.contains(c)).count() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageFields, Tweet};

    fn fixture() -> Message {
        Message::Twitter(Tweet::new(
            MessageFields::new(91242213123121i64)
                .with_text("@Twitter check out this \u{1F60F} https://www.twitter.com/ #crazy #link")
                .with_author("apnews")
                .with_reply_to([3894032234i64]),
        ))
    }

    #[test]
    fn test_text_extractors() {
        let post = fixture();
        assert_eq!(urls(post.text()), ["https://www.twitter.com/"]);
        assert_eq!(hashtags(post.text()), ["#crazy", "#link"]);
        assert_eq!(emojis(post.text()), ["\u{1F60F}"]);
    }

    #[test]
    fn test_ints() {
        let stats = ints(&fixture());
        assert_eq!(stats["?_count"], 0);
        assert_eq!(stats["!_count"], 0);
        assert_eq!(stats["char_count"], 63);
        assert_eq!(stats["emoji_count"], 1);
        assert_eq!(stats["hashtag_count"], 2);
        assert_eq!(stats["mention_count"], 1);
        assert_eq!(stats["degree_out"], 1);
        assert_eq!(stats["punct_count"], 2);
        assert_eq!(stats["token_count"], 24);
        assert_eq!(stats["type_count"], 15);
        assert_eq!(stats["uppercase_count"], 1);
        assert_eq!(stats["url_count"], 1);
    }

    #[test]
    fn test_bools_track_reply_metadata() {
        assert!(!bools(&fixture())["is_source"]);

        let root = Message::Twitter(Tweet::new(MessageFields::new(0).with_text("hi")));
        assert!(bools(&root)["is_source"]);
    }

    #[test]
    fn test_categoricals() {
        let cats = categoricals(&fixture());
        assert_eq!(cats["author"], "apnews");
        assert_eq!(cats["language"], "und");
        assert_eq!(cats["platform"], "Twitter");
    }

    #[test]
    fn test_floats_are_mixing_params() {
        let stats = floats(&fixture());
        assert_eq!(stats.len(), 5);
        let params = mixing_features(&fixture());
        assert_eq!(stats["mixing_k1"], params.k1);
        assert_eq!(stats["mixing_theta"], params.theta);
        assert_eq!(stats["mixing_entropy"], params.entropy);
        assert_eq!(stats["mixing_N_avg"], params.n_avg);
        assert_eq!(stats["mixing_M_avg"], params.m_avg);
    }

    #[test]
    fn test_substrings_and_counters() {
        let post = fixture();
        let subs = substrings(&post);
        assert_eq!(subs["mentions"], ["@Twitter"]);
        assert_eq!(subs["urls"], ["https://www.twitter.com/"]);
        assert_eq!(subs["tokens"].len(), 24);

        let freq = &counters(&post)["type_frequency"];
        assert_eq!(freq["/"], 3);
        assert_eq!(freq["#crazy"], 1);
    }

    #[test]
    fn test_punctuation_counts() {
        let post = Message::Twitter(Tweet::new(
            MessageFields::new(1).with_text("Wait... what?! \"Really\"; don't."),
        ));
        let stats = ints(&post);
        assert_eq!(stats["?_count"], 1);
        assert_eq!(stats["!_count"], 1);
        // 4 dots, 1 question mark, 1 bang, 2 quotes, 1 semicolon, 1 apostrophe
        assert_eq!(stats["punct_count"], 10);
    }

    #[test]
    fn test_int_feature_keys_are_distinct() {
        let post = fixture();
        let map = ints(&post);
        assert_eq!(map.len(), PostIntFeature::ALL.len());
        for feature in PostIntFeature::ALL {
            assert_eq!(map[feature.key()], feature.measure(&post));
        }
    }
}
