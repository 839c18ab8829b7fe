//! Features of a conversation taken as a whole.
//!
//! These extractors summarize an entire [`Conversation`]: how many
//! posts and people it holds, how its reply tree is shaped, how long
//! it ran, and how its pooled vocabulary mixes. Degree histograms
//! restricted to in-conversation edges live on [`ConvoGraph`]; the
//! distributions here add the unrestricted reply targets back in, so
//! a thread whose root answers a deleted post still reports that
//! outward edge.
//!
//! Scalar bundles come in two flavors: [`ints`] and [`floats`] merge
//! the conversation-scale measures with the per-post sums from
//! [`post_in_conv`], giving one flat map per value class suitable for
//! vectorization.

use std::collections::BTreeMap;

use crate::convo::Conversation;
use crate::error::Result;
use crate::graph::ConvoGraph;

use super::harmonic::{self, MixingParams};
use super::post_in_conv;

/// Integer features: headline counts, tree shape, and the summed
/// per-post booleans and integers.
pub fn ints(convo: &Conversation, graph: &ConvoGraph) -> Result<BTreeMap<String, i64>> {
    let mut out = post_in_conv::sum_booleans(convo, graph)?;
    out.extend(post_in_conv::sum_ints(convo, graph)?);
    out.insert("messages".to_string(), convo.messages() as i64);
    out.insert("connections".to_string(), convo.connections() as i64);
    out.insert("users".to_string(), convo.users() as i64);
    out.insert("chars".to_string(), convo.chars() as i64);
    out.insert("tokens".to_string(), convo.tokens() as i64);
    out.insert(
        "types".to_string(),
        post_in_conv::summed_type_frequency(convo).len() as i64,
    );
    out.insert("tree_degree".to_string(), tree_degree(convo, graph) as i64);
    out.insert("tree_depth".to_string(), graph.tree_depth() as i64);
    out.insert("tree_width".to_string(), graph.tree_width() as i64);
    Ok(out)
}

/// Float features: density, duration, reciprocity, composition
/// ratios, and the pooled mixing parameters.
pub fn floats(convo: &Conversation, graph: &ConvoGraph) -> Result<BTreeMap<String, f64>> {
    let counts = post_in_conv::sum_booleans(convo, graph)?;
    let messages = convo.messages() as f64;
    let ratio = |count: i64| {
        if messages == 0.0 {
            0.0
        } else {
            count as f64 / messages
        }
    };

    let mut out = BTreeMap::new();
    out.insert("density".to_string(), graph.density());
    out.insert("duration".to_string(), duration(convo));
    out.insert("reciprocity".to_string(), graph.reciprocity());
    out.insert(
        "source_ratio".to_string(),
        ratio(counts.get("source_count").copied().unwrap_or(0)),
    );
    out.insert(
        "leaf_ratio".to_string(),
        ratio(counts.get("leaf_count").copied().unwrap_or(0)),
    );
    out.insert(
        "internal_ratio".to_string(),
        ratio(counts.get("internal_count").copied().unwrap_or(0)),
    );
    out.insert(
        "user_post_ratio".to_string(),
        ratio(convo.users() as i64),
    );

    let mixing = mixing_features(convo);
    out.insert("mixing_k1".to_string(), mixing.k1);
    out.insert("mixing_theta".to_string(), mixing.theta);
    out.insert("mixing_entropy".to_string(), mixing.entropy);
    out.insert("mixing_N_avg".to_string(), mixing.n_avg);
    out.insert("mixing_M_avg".to_string(), mixing.m_avg);
    Ok(out)
}

/// Seconds between the first and last post. `0.0` when the
/// conversation has no complete time order or fewer than two posts.
pub fn duration(convo: &Conversation) -> f64 {
    let ts = convo.time_series();
    match (ts.first(), ts.last()) {
        (Some(first), Some(last)) if ts.len() > 1 => last - first,
        _ => 0.0,
    }
}

/// Creation timestamps in time order, optionally rebased so the
/// first post sits at zero. Empty when no complete order exists.
pub fn time_series(convo: &Conversation, normalize_by_first: bool) -> Vec<f64> {
    let mut ts = convo.time_series();
    if normalize_by_first {
        if let Some(first) = ts.first().copied() {
            for t in &mut ts {
                *t -= first;
            }
        }
    }
    ts
}

/// Largest total degree of any post, counting in-conversation replies
/// received plus all reply targets issued. `0` for an empty
/// conversation.
pub fn tree_degree(convo: &Conversation, graph: &ConvoGraph) -> usize {
    degree_distribution(convo, graph)
        .keys()
        .next_back()
        .copied()
        .unwrap_or(0)
}

/// Post count per total degree, where a post's degree is its
/// in-conversation replies received plus every reply target it
/// names, present or not.
pub fn degree_distribution(convo: &Conversation, graph: &ConvoGraph) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for (uid, message) in convo.posts() {
        let degree = graph.in_degree(uid).unwrap_or(0) + message.reply_to().len();
        *counts.entry(degree).or_insert(0) += 1;
    }
    counts
}

/// Post count per outward reply count, unrestricted.
pub fn out_degree_distribution(convo: &Conversation) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for message in convo.posts().values() {
        *counts.entry(message.reply_to().len()).or_insert(0) += 1;
    }
    counts
}

/// User count per contribution size: how many authors wrote exactly
/// `k` posts, for each observed `k`.
pub fn user_size_distribution(convo: &Conversation) -> BTreeMap<usize, usize> {
    let mut counts = BTreeMap::new();
    for size in convo.messages_per_user().values() {
        *counts.entry(*size).or_insert(0) += 1;
    }
    counts
}

/// Mixing parameters fitted to the conversation-wide type frequency.
pub fn mixing_features(convo: &Conversation) -> MixingParams {
    harmonic::mixing(&post_in_conv::summed_type_frequency(convo))
}

/// Per-type surprisal over the conversation-wide type frequency.
pub fn novelty_vector(convo: &Conversation) -> Vec<f64> {
    harmonic::novelty(&post_in_conv::summed_type_frequency(convo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, MessageFields, Tweet};

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

    #[test]
    fn test_ints_headline_counts() {
        let (convo, graph) = chain();
        let out = ints(&convo, &graph).unwrap();
        assert_eq!(out["messages"], 5);
        assert_eq!(out["connections"], 4);
        assert_eq!(out["users"], 2);
        assert_eq!(out["chars"], 30);
        assert_eq!(out["types"], 7);
        assert_eq!(out["tree_degree"], 2);
        assert_eq!(out["tree_depth"], 4);
        assert_eq!(out["tree_width"], 1);
        // merged per-post sums survive alongside the headline counts
        assert_eq!(out["source_count"], 1);
        assert_eq!(out["char_count"], 30);
        assert_eq!(out["degree"], 8);
    }

    #[test]
    fn test_floats_density_and_ratios() {
        let (convo, graph) = chain();
        let out = floats(&convo, &graph).unwrap();
        assert!((out["density"] - 0.4).abs() < 1e-12);
        assert!((out["duration"] - 4.0).abs() < 1e-12);
        assert_eq!(out["reciprocity"], 0.0);
        assert!((out["source_ratio"] - 0.2).abs() < 1e-12);
        assert!((out["leaf_ratio"] - 0.2).abs() < 1e-12);
        assert!((out["internal_ratio"] - 0.6).abs() < 1e-12);
        assert!((out["user_post_ratio"] - 0.4).abs() < 1e-12);
        assert!(out["mixing_k1"] > 0.0);
    }

    #[test]
    fn test_degree_distributions() {
        let (convo, graph) = chain();
        let degrees = degree_distribution(&convo, &graph);
        assert_eq!(degrees, BTreeMap::from([(1, 2), (2, 3)]));

        let out = out_degree_distribution(&convo);
        assert_eq!(out, BTreeMap::from([(0, 1), (1, 4)]));
    }

    #[test]
    fn test_user_size_distribution() {
        let (convo, _) = chain();
        // USER0 wrote three posts, USER1 two
        assert_eq!(
            user_size_distribution(&convo),
            BTreeMap::from([(2, 1), (3, 1)])
        );
    }

    #[test]
    fn test_time_series_normalized() {
        let (convo, _) = chain();
        assert_eq!(
            time_series(&convo, true),
            vec![0.0, 1.0, 2.0, 3.0, 4.0]
        );
        assert_eq!(time_series(&convo, false)[0], 0.0);
    }

    #[test]
    fn test_empty_conversation_degenerates() {
        let convo = Conversation::new();
        let graph = ConvoGraph::build(&convo);
        assert_eq!(duration(&convo), 0.0);
        assert_eq!(tree_degree(&convo, &graph), 0);
        assert!(time_series(&convo, true).is_empty());
        let out = ints(&convo, &graph).unwrap();
        assert_eq!(out["messages"], 0);
        assert_eq!(out["tree_depth"], 0);
        let fl = floats(&convo, &graph).unwrap();
        assert_eq!(fl["density"], 0.0);
        assert_eq!(fl["user_post_ratio"], 0.0);
    }

    #[test]
    fn test_unstamped_post_voids_duration() {
        let (mut convo, _) = chain();
        convo.add_post(Message::Twitter(Tweet::new(
            MessageFields::new(10).with_text("late".to_string()),
        )));
        assert_eq!(duration(&convo), 0.0);
        assert!(time_series(&convo, false).is_empty());
    }
}
