//! Features of a post measured against its surrounding conversation.
//!
//! These extractors combine a [`Message`] with the [`Conversation`] it
//! lives in (and the conversation's [`ConvoGraph`]) to answer
//! positional questions: where the post sits in the reply tree, how
//! fast it arrived, and how its vocabulary relates to the vocabulary
//! of every conversational split anchored on it.
//!
//! The split entropy block compares nine views of the conversation
//! pairwise: the post itself, the full conversation, and the seven
//! anchored selections (parents, children, siblings, ancestors,
//! descendants, before, after), each including the anchor post. For
//! every ordered pair except self-pairs and pairs targeting the bare
//! post, the average per-token normalized cross-entropy of the outer
//! split against the union of both splits is emitted under
//! `avg_token_entropy_{outer}-{inner}`, 64 keys in total.

use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

use crate::convo::Conversation;
use crate::error::{ConvoError, Result};
use crate::graph::ConvoGraph;
use crate::message::{Message, Uid};

use super::post;
use super::SummaryStats;

/// Boolean positional features, static post bools included.
pub fn bools(
    convo: &Conversation,
    graph: &ConvoGraph,
    uid: &Uid,
) -> Result<BTreeMap<String, bool>> {
    let message = lookup(convo, uid)?;
    let in_degree = graph.in_degree(uid).unwrap_or(0);
    let statically_source = post::is_source(message);

    let mut out = post::bools(message);
    out.insert("is_leaf".to_string(), in_degree == 0);
    out.insert(
        "is_internal".to_string(),
        in_degree != 0 && !statically_source,
    );
    out.insert(
        "is_author_source_author".to_string(),
        match message.author() {
            Some(author) => source_authors(convo).contains(author),
            None => false,
        },
    );
    Ok(out)
}

/// Integer positional features, static post ints included.
pub fn ints(
    convo: &Conversation,
    graph: &ConvoGraph,
    uid: &Uid,
) -> Result<BTreeMap<String, i64>> {
    let message = lookup(convo, uid)?;
    let in_degree = graph.in_degree(uid).unwrap_or(0) as i64;
    let depth = graph.depth(uid).unwrap_or(0);
    let width = graph.depth_distribution().get(&depth).copied().unwrap_or(0);

    let mut out = post::ints(message);
    // total degree pairs the in-conversation reply count with the
    // post's own target count, so references leaving the conversation
    // still register
    out.insert(
        "degree".to_string(),
        in_degree + message.reply_to().len() as i64,
    );
    out.insert("degree_in".to_string(), in_degree);
    out.insert("depth".to_string(), depth as i64);
    out.insert("width".to_string(), width as i64);
    Ok(out)
}

/// Float positional features: arrival timing, the full split entropy
/// block, and the static mixing parameters.
pub fn floats(convo: &Conversation, uid: &Uid) -> Result<BTreeMap<String, f64>> {
    let message = lookup(convo, uid)?;
    let mut out = post::floats(message);
    out.insert("relative_age".to_string(), relative_age(convo, uid)?);
    out.insert("response_time".to_string(), response_time(convo, uid)?);
    out.extend(avg_token_entropy_all_splits(convo, uid)?);
    Ok(out)
}

/// Authors of the conversation's source posts.
pub fn source_authors(convo: &Conversation) -> BTreeSet<String> {
    convo
        .sources()
        .iter()
        .filter_map(|uid| convo.posts()[uid].author().map(str::to_string))
        .collect()
}

/// Seconds between the post and the conversation's earliest post.
/// `-1.0` when either timestamp is unavailable.
pub fn relative_age(convo: &Conversation, uid: &Uid) -> Result<f64> {
    let message = lookup(convo, uid)?;
    let age = match (message.created_at(), convo.time_order()) {
        (Some(own), Some(order)) => match convo.posts()[&order[0]].created_at() {
            Some(first) => own - first,
            None => -1.0,
        },
        _ => -1.0,
    };
    Ok(age)
}

/// Seconds between the post and the nearest in-conversation post it
/// replies to. 0 when no timed parent exists.
pub fn response_time(convo: &Conversation, uid: &Uid) -> Result<f64> {
    let message = lookup(convo, uid)?;
    let own = message.created_at();
    let diffs = convo
        .parents_of(uid)
        .filter_map(|parent| {
            let parent_stamp = convo.posts()[parent].created_at()?;
            Some(own? - parent_stamp)
        })
        .min_by(f64::total_cmp);
    Ok(diffs.unwrap_or(0.0))
}

/// Average per-token normalized entropy of `message` against a
/// reference conversation. The post joins the reference if absent so
/// its vocabulary is always covered.
pub fn avg_token_entropy(message: &Message, convo: &Conversation) -> f64 {
    let extended;
    let reference = if convo.contains(message.uid()) {
        convo
    } else {
        let mut joined = convo.clone();
        joined.add_post(message.clone());
        extended = joined;
        &extended
    };

    let post_dist = message.token_distribution();
    let reference_dist = summed_type_frequency(reference);
    entropy_of(&post_dist, &reference_dist)
}

/// Average per-token normalized entropy of `conv_a` against the union
/// of both conversations. 0 when either side is empty.
pub fn avg_token_entropy_conv(conv_a: &Conversation, conv_b: &Conversation) -> f64 {
    if conv_a.is_empty() || conv_b.is_empty() {
        return 0.0;
    }
    let joint = conv_a.clone() + conv_b.clone();
    let joint_dist = summed_type_frequency(&joint);
    let left_dist = summed_type_frequency(conv_a);
    entropy_of(&left_dist, &joint_dist)
}

/// The 64-key split entropy block anchored on one post.
pub fn avg_token_entropy_all_splits(
    convo: &Conversation,
    uid: &Uid,
) -> Result<BTreeMap<String, f64>> {
    let message = lookup(convo, uid)?;
    let splits: BTreeMap<&str, Conversation> = [
        ("full", convo.clone()),
        ("ancestors", convo.get_ancestors(uid, true)?),
        ("after", convo.get_after(uid, true)?),
        ("before", convo.get_before(uid, true)?),
        ("children", convo.get_children(uid, true)?),
        ("descendants", convo.get_descendants(uid, true)?),
        ("parents", convo.get_parents(uid, true)?),
        ("siblings", convo.get_siblings(uid, true)?),
    ]
    .into_iter()
    .collect();

    let mut names: Vec<&str> = splits.keys().copied().collect();
    names.push("post");
    names.sort_unstable();

    let mut out = BTreeMap::new();
    for (&outer, &inner) in names.iter().cartesian_product(names.iter()) {
        // self-comparison is always 1; the bare post is only
        // meaningful on the outer side
        if outer == inner || inner == "post" {
            continue;
        }
        let e = if outer == "post" {
            avg_token_entropy(message, &splits[inner])
        } else {
            avg_token_entropy_conv(&splits[outer], &splits[inner])
        };
        out.insert(format!("avg_token_entropy_{outer}-{inner}"), e);
    }
    Ok(out)
}

/// Folds the float and integer positional features over every post,
/// yielding five-number summaries per feature.
pub fn agg_post_stats(
    convo: &Conversation,
    graph: &ConvoGraph,
) -> Result<BTreeMap<String, SummaryStats>> {
    agg_post_stats_filtered(convo, graph, |_| true)
}

/// Like [`agg_post_stats`], restricted to posts accepted by `keep`.
pub fn agg_post_stats_filtered<F>(
    convo: &Conversation,
    graph: &ConvoGraph,
    keep: F,
) -> Result<BTreeMap<String, SummaryStats>>
where
    F: Fn(&Message) -> bool,
{
    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (uid, message) in convo.posts() {
        if !keep(message) {
            continue;
        }
        for (k, v) in floats(convo, uid)? {
            samples.entry(k).or_default().push(v);
        }
        for (k, v) in ints(convo, graph, uid)? {
            samples.entry(k).or_default().push(v as f64);
        }
    }
    Ok(samples
        .into_iter()
        .filter_map(|(k, vs)| SummaryStats::from_samples(&vs).map(|s| (k, s)))
        .collect())
}

/// Counts how many posts set each boolean feature, under renamed
/// keys: `is_leaf` contributes to `leaf_count` and so on.
pub fn sum_booleans(convo: &Conversation, graph: &ConvoGraph) -> Result<BTreeMap<String, i64>> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for uid in convo.posts().keys() {
        for (k, v) in bools(convo, graph, uid)? {
            let key = format!("{}_count", k.replace("is_", ""));
            *counts.entry(key).or_insert(0) += i64::from(v);
        }
    }
    Ok(counts)
}

/// Sums the integer features over every post. Vocabulary sizes and
/// tree coordinates are skipped: types need set union rather than
/// addition, and summed depths or widths measure nothing.
pub fn sum_ints(convo: &Conversation, graph: &ConvoGraph) -> Result<BTreeMap<String, i64>> {
    let skip = ["type_count", "depth", "width"];
    let mut sums: BTreeMap<String, i64> = BTreeMap::new();
    for uid in convo.posts().keys() {
        for (k, v) in ints(convo, graph, uid)? {
            if skip.contains(&k.as_str()) {
                continue;
            }
            *sums.entry(k).or_insert(0) += v;
        }
    }
    Ok(sums)
}

/// Sums every post's type frequency distribution.
pub fn summed_type_frequency(convo: &Conversation) -> BTreeMap<String, usize> {
    let mut total: BTreeMap<String, usize> = BTreeMap::new();
    for message in convo.posts().values() {
        for (token, count) in message.token_distribution() {
            *total.entry(token).or_insert(0) += count;
        }
    }
    total
}

fn entropy_of(left: &BTreeMap<String, usize>, joint: &BTreeMap<String, usize>) -> f64 {
    let joint_n = joint.len();
    let joint_m: usize = joint.values().sum();
    let left_m: usize = left.values().sum();
    // a one-type vocabulary normalizes by ln(1); treat it as inapplicable
    if left_m == 0 || joint_m == 0 || joint_n < 2 {
        return 0.0;
    }
    let raw: f64 = left
        .keys()
        .filter_map(|w| joint.get(w))
        .map(|&c| (c as f64 / joint_m as f64).ln())
        .sum();
    -raw / ((joint_n as f64).ln() * left_m as f64)
}

fn lookup<'a>(convo: &'a Conversation, uid: &Uid) -> Result<&'a Message> {
    convo
        .get(uid)
        .ok_or_else(|| ConvoError::not_found(format!("no post {uid} in conversation")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageFields, Tweet};

    /// Linear chain `0 <- 1 <- 2 <- 3 <- 4` with `Text {ix}` bodies,
    /// timestamps equal to uids, alternating authors.
    fn chain() -> (Conversation, ConvoGraph) {
        let mut convo = Conversation::new();
        for ix in 0..5i64 {
            let mut fields = MessageFields::new(ix)
                .with_text(format!("Text {ix}"))
                .with_author(format!("USER{}", ix % 2))
                .with_created_at(ix as f64);
            if ix > 0 {
                fields = fields.with_reply_to([ix - 1]);
            }
            convo.add_post(Message::Twitter(Tweet::new(fields)));
        }
        let graph = ConvoGraph::build(&convo);
        (convo, graph)
    }

    /// Closed-form split entropy for the chain fixture: every post
    /// contributes one `Text`, one space, and one distinct digit, so
    /// an outer split of `k` posts against a joint of `j` posts gives
    /// `(2 ln 3 + k ln 3j) / (3k ln(2 + j))`.
    fn expected(outer: usize, joint: usize) -> f64 {
        let k = outer as f64;
        let j = joint as f64;
        (2.0 * 3f64.ln() + k * (3.0 * j).ln()) / (3.0 * k * (2.0 + j).ln())
    }

    #[test]
    fn test_bools_positions() {
        let (convo, graph) = chain();

        let root = bools(&convo, &graph, &Uid::from(0)).unwrap();
        assert!(root["is_source"]);
        assert!(!root["is_leaf"]);
        assert!(!root["is_internal"]);
        assert!(root["is_author_source_author"]);

        let middle = bools(&convo, &graph, &Uid::from(2)).unwrap();
        assert!(!middle["is_source"]);
        assert!(!middle["is_leaf"]);
        assert!(middle["is_internal"]);
        assert!(middle["is_author_source_author"]);

        let leaf = bools(&convo, &graph, &Uid::from(4)).unwrap();
        assert!(leaf["is_leaf"]);
        assert!(!leaf["is_internal"]);

        let odd = bools(&convo, &graph, &Uid::from(1)).unwrap();
        assert!(!odd["is_author_source_author"]);
    }

    #[test]
    fn test_ints_positions() {
        let (convo, graph) = chain();
        let stats = ints(&convo, &graph, &Uid::from(2)).unwrap();
        assert_eq!(stats["degree"], 2);
        assert_eq!(stats["degree_in"], 1);
        assert_eq!(stats["degree_out"], 1);
        assert_eq!(stats["depth"], 2);
        assert_eq!(stats["width"], 1);

        let leaf = ints(&convo, &graph, &Uid::from(4)).unwrap();
        assert_eq!(leaf["degree"], 1);
        assert_eq!(leaf["depth"], 4);
    }

    #[test]
    fn test_timing_features() {
        let mut convo = Conversation::with_id("TEST_POST_IN_CONV");
        convo.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(3894032234i64)
                .with_text("We are shutting down Twitter")
                .with_author("Twitter")
                .with_created_at(42.0),
        )));
        convo.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(91242213123121i64)
                .with_text("@Twitter check out this \u{1F60F} https://www.twitter.com/ #crazy #link")
                .with_author("apnews")
                .with_created_at(52.0)
                .with_reply_to([3894032234i64]),
        )));
        let graph = ConvoGraph::build(&convo);
        let reply = Uid::from(91242213123121i64);

        assert_eq!(response_time(&convo, &reply).unwrap(), 10.0);
        assert_eq!(relative_age(&convo, &reply).unwrap(), 10.0);
        assert_eq!(graph.depth(&reply), Some(1));
        assert_eq!(
            ints(&convo, &graph, &reply).unwrap()["width"],
            1
        );
    }

    #[test]
    fn test_relative_age_without_timestamps() {
        let mut convo = Conversation::new();
        convo.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(0).with_text("no stamp"),
        )));
        assert_eq!(relative_age(&convo, &Uid::from(0)).unwrap(), -1.0);
        assert_eq!(response_time(&convo, &Uid::from(0)).unwrap(), 0.0);
    }

    #[test]
    fn test_split_entropy_block_shape() {
        let (convo, _) = chain();
        let block = avg_token_entropy_all_splits(&convo, &Uid::from(1)).unwrap();
        assert_eq!(block.len(), 64);
        assert!(block.keys().all(|k| k.starts_with("avg_token_entropy_")));
        assert!(!block.contains_key("avg_token_entropy_full-post"));
        assert!(!block.contains_key("avg_token_entropy_post-post"));
    }

    #[test]
    fn test_split_entropy_values() {
        let (convo, _) = chain();
        let block = avg_token_entropy_all_splits(&convo, &Uid::from(1)).unwrap();

        // splits anchored on uid 1: post {1}, parents/ancestors/before
        // {0,1}, children {1,2}, descendants/after {1,2,3,4},
        // siblings {1}, full everything
        let cases = [
            ("post-full", expected(1, 5)),
            ("post-before", expected(1, 2)),
            ("children-after", expected(2, 4)),
            ("before-after", expected(2, 5)),
            ("descendants-children", expected(4, 4)),
            ("ancestors-full", expected(2, 5)),
            ("siblings-full", expected(1, 5)),
        ];
        for (pair, want) in cases {
            let got = block[&format!("avg_token_entropy_{pair}")];
            assert!(
                (got - want).abs() < 1e-12,
                "{pair}: got {got}, want {want}"
            );
        }
        // k = 2 against j = 4 collapses exactly: ln 36 = 2 ln 6
        assert!((block["avg_token_entropy_children-after"] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_entropy_degenerate_inputs() {
        let empty = Conversation::new();
        let (convo, _) = chain();
        assert_eq!(avg_token_entropy_conv(&empty, &convo), 0.0);
        assert_eq!(avg_token_entropy_conv(&convo, &empty), 0.0);

        // a single repeated type normalizes by ln(1) and is degraded
        let mut flat = Conversation::new();
        flat.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(7).with_text("word"),
        )));
        let post = flat.get(&Uid::from(7)).unwrap().clone();
        assert_eq!(avg_token_entropy(&post, &flat), 0.0);
    }

    #[test]
    fn test_agg_post_stats_depth_summary() {
        let (convo, graph) = chain();
        let agg = agg_post_stats(&convo, &graph).unwrap();

        let depth = &agg["depth"];
        assert_eq!(depth.min, 0.0);
        assert_eq!(depth.max, 4.0);
        assert_eq!(depth.mean, 2.0);
        assert_eq!(depth.median, 2.0);
        assert!((depth.std - 2f64.sqrt()).abs() < 1e-12);

        // entropy keys participate in the fold
        assert!(agg.contains_key("avg_token_entropy_post-full"));
        assert!(agg.contains_key("mixing_entropy"));
    }

    #[test]
    fn test_agg_post_stats_filtered() {
        let (convo, graph) = chain();
        let agg = agg_post_stats_filtered(&convo, &graph, |p| p.author() == Some("USER1")).unwrap();
        // USER1 wrote posts 1 and 3
        assert_eq!(agg["depth"].min, 1.0);
        assert_eq!(agg["depth"].max, 3.0);
        assert_eq!(agg["depth"].mean, 2.0);
    }

    #[test]
    fn test_sum_booleans() {
        let (convo, graph) = chain();
        let counts = sum_booleans(&convo, &graph).unwrap();
        assert_eq!(counts["source_count"], 1);
        assert_eq!(counts["leaf_count"], 1);
        assert_eq!(counts["internal_count"], 3);
        assert_eq!(counts["author_source_author_count"], 3);
    }

    #[test]
    fn test_sum_ints_skips_tree_coordinates() {
        let (convo, graph) = chain();
        let sums = sum_ints(&convo, &graph).unwrap();
        assert_eq!(sums["degree_in"], 4);
        assert_eq!(sums["degree_out"], 4);
        assert_eq!(sums["degree"], 8);
        assert_eq!(sums["char_count"], 30);
        assert!(!sums.contains_key("depth"));
        assert!(!sums.contains_key("width"));
        assert!(!sums.contains_key("type_count"));
    }

    #[test]
    fn test_missing_anchor() {
        let (convo, graph) = chain();
        assert!(ints(&convo, &graph, &Uid::from(99)).is_err());
        assert!(floats(&convo, &Uid::from(99)).is_err());
    }
}
