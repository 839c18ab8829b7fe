//! Conversation-wide anonymization.
//!
//! Builds one name map covering every author and mentioned user in the
//! conversation, then rewrites every post through it. Using a single
//! shared map keeps the rewrite consistent: the same person mentioned
//! in one post and authoring another collapses to the same placeholder
//! everywhere.

use std::collections::BTreeMap;

use super::conversation::Conversation;

impl Conversation {
    /// Replaces every user name with an anonymous placeholder.
    ///
    /// Names are discovered post by post in time order (uid order when
    /// timestamps are unavailable) and numbered `USER0`, `USER1`, ...
    /// in first-seen order when `with_ids` is set; otherwise every
    /// name maps to the bare `USER`. Post uids and reply edges are
    /// untouched.
    ///
    /// Returns the map so callers can persist the pseudonym key.
    pub fn redact(&mut self, with_ids: bool) -> BTreeMap<String, String> {
        let order = self
            .time_order()
            .unwrap_or_else(|| self.posts().keys().cloned().collect());

        let mut map: BTreeMap<String, String> = BTreeMap::new();
        let mut seen = 0usize;
        for uid in &order {
            for name in self.posts()[uid].user_names() {
                if !map.contains_key(&name) {
                    let placeholder = if with_ids {
                        format!("USER{seen}")
                    } else {
                        "USER".to_string()
                    };
                    map.insert(name, placeholder);
                    seen += 1;
                }
            }
        }

        self.apply_redaction(&map);
        map
    }

    fn apply_redaction(&mut self, map: &BTreeMap<String, String>) {
        for uid in self.posts().keys().cloned().collect::<Vec<_>>() {
            if let Some(post) = self.post_mut(&uid) {
                post.redact(map);
            }
        }
        self.bump_generation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, MessageFields, Tweet, Uid};

    fn mention_chain() -> Conversation {
        let mut convo = Conversation::new();
        for ix in 0..4i64 {
            let mut fields = MessageFields::new(ix)
                .with_text(format!("@tweet {ix}"))
                .with_author("tweet")
                .with_created_at(ix as f64);
            if ix > 0 {
                fields = fields.with_reply_to([ix - 1]);
            }
            convo.add_post(Message::Twitter(Tweet::new(fields)));
        }
        convo
    }

    #[test]
    fn test_redact_with_ids_unifies_author_and_mention() {
        let mut convo = mention_chain();
        let map = convo.redact(true);

        assert_eq!(map.len(), 1);
        assert_eq!(map["tweet"], "USER0");
        for ix in 0..4i64 {
            let post = convo.get(&Uid::from(ix)).unwrap();
            assert_eq!(post.author(), Some("USER0"));
            assert_eq!(post.text(), format!("@USER0 {ix}"));
        }
    }

    #[test]
    fn test_redact_without_ids() {
        let mut convo = mention_chain();
        convo.redact(false);

        let post = convo.get(&Uid::from(2)).unwrap();
        assert_eq!(post.author(), Some("USER"));
        assert_eq!(post.text(), "@USER 2");
    }

    #[test]
    fn test_redact_numbers_in_first_seen_order() {
        let mut convo = Conversation::new();
        convo.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(0)
                .with_text("hello @zara")
                .with_author("mid")
                .with_created_at(0.0),
        )));
        convo.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(1)
                .with_text("@mid sure")
                .with_author("zara")
                .with_created_at(1.0),
        )));

        let map = convo.redact(true);
        assert_eq!(map["mid"], "USER0");
        assert_eq!(map["zara"], "USER1");
        assert_eq!(convo.get(&Uid::from(1)).unwrap().text(), "@USER0 sure");
    }

    #[test]
    fn test_redact_leaves_structure_alone() {
        let mut convo = mention_chain();
        let edges_before = convo.edges().clone();
        let generation = convo.generation();
        convo.redact(true);

        assert_eq!(convo.edges(), &edges_before);
        assert!(convo.generation() > generation);
    }
}
