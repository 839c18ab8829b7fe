//! Features of a single author, inside one conversation or pooled
//! across many.
//!
//! A user's footprint in a conversation is modeled as a
//! sub-conversation: their posts filtered out of the parent, with the
//! derived id `"{convo_id}-{user}"`. Structural sums (degrees, leaf
//! counts) are measured inside that sub-conversation, so a prolific
//! author who only ever answers strangers still shows zero internal
//! edges. Vocabulary measures compare the sub-conversation against
//! the whole thread.
//!
//! Posts without an author belong to no user and are skipped
//! throughout.

use std::collections::{BTreeMap, BTreeSet};

use crate::convo::{Conversation, ConvoFilter};
use crate::error::Result;
use crate::graph::ConvoGraph;

use super::harmonic::{self, MixingParams};
use super::post_in_conv;
use super::SummaryStats;

/// Boolean user features.
pub fn bools(user: &str, convo: &Conversation) -> BTreeMap<String, bool> {
    BTreeMap::from([("is_source_author".to_string(), is_source_author(user, convo))])
}

/// Whether this user authored any of the conversation's source posts.
pub fn is_source_author(user: &str, convo: &Conversation) -> bool {
    post_in_conv::source_authors(convo).contains(user)
}

/// The user's posts as a standalone conversation, id
/// `"{convo_id}-{user}"`.
pub fn user_posts(user: &str, convo: &Conversation) -> Conversation {
    let mut sub = convo.filter(&ConvoFilter::new().authors([user]));
    sub.set_convo_id(format!("{}-{user}", convo.convo_id()));
    sub
}

/// Distinct authors in first-seen uid order.
pub fn unique_users(convo: &Conversation) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for post in convo.posts().values() {
        if let Some(author) = post.author() {
            if seen.insert(author.to_string()) {
                out.push(author.to_string());
            }
        }
    }
    out
}

/// Number of posts this user wrote in the conversation.
pub fn messages_by_user(user: &str, convo: &Conversation) -> usize {
    convo.messages_per_user().get(user).copied().unwrap_or(0)
}

/// Type frequency distribution over the user's posts.
pub fn type_frequency(user: &str, convo: &Conversation) -> BTreeMap<String, usize> {
    post_in_conv::summed_type_frequency(&user_posts(user, convo))
}

/// Mixing parameters fitted to the user's type frequency.
pub fn mixing_features(user: &str, convo: &Conversation) -> MixingParams {
    harmonic::mixing(&type_frequency(user, convo))
}

/// Per-type surprisal over the user's type frequency.
pub fn novelty_vector(user: &str, convo: &Conversation) -> Vec<f64> {
    harmonic::novelty(&type_frequency(user, convo))
}

/// Average per-token normalized cross-entropy of the user's posts
/// against the whole conversation.
pub fn avg_user_token_entropy(user: &str, convo: &Conversation) -> f64 {
    post_in_conv::avg_token_entropy_conv(&user_posts(user, convo), convo)
}

/// Float user features: mixing parameters, the entropy of the user
/// against the thread, and summary folds of every per-post scalar
/// restricted to the user's posts, keyed `user_{stat}_{feature}`.
pub fn floats(
    user: &str,
    convo: &Conversation,
    graph: &ConvoGraph,
) -> Result<BTreeMap<String, f64>> {
    let mut out = BTreeMap::new();
    let mixing = mixing_features(user, convo);
    out.insert("mixing_k1".to_string(), mixing.k1);
    out.insert("mixing_theta".to_string(), mixing.theta);
    out.insert("mixing_entropy".to_string(), mixing.entropy);
    out.insert("mixing_N_avg".to_string(), mixing.n_avg);
    out.insert("mixing_M_avg".to_string(), mixing.m_avg);
    out.insert(
        "avg_user_token_entropy".to_string(),
        avg_user_token_entropy(user, convo),
    );

    let folds = post_in_conv::agg_post_stats_filtered(convo, graph, |p| {
        p.author() == Some(user)
    })?;
    for (k, stats) in folds {
        out.insert(format!("user_min_{k}"), stats.min);
        out.insert(format!("user_max_{k}"), stats.max);
        out.insert(format!("user_mean_{k}"), stats.mean);
        out.insert(format!("user_median_{k}"), stats.median);
        out.insert(format!("user_std_{k}"), stats.std);
    }
    Ok(out)
}

/// Integer user features: message and type counts plus the summed
/// per-post booleans and integers of the user's sub-conversation.
pub fn ints(user: &str, convo: &Conversation) -> Result<BTreeMap<String, i64>> {
    let sub = user_posts(user, convo);
    let sub_graph = ConvoGraph::build(&sub);
    let mut out = post_in_conv::sum_booleans(&sub, &sub_graph)?;
    out.extend(post_in_conv::sum_ints(&sub, &sub_graph)?);
    out.insert(
        "message_count".to_string(),
        messages_by_user(user, convo) as i64,
    );
    out.insert(
        "types".to_string(),
        type_frequency(user, convo).len() as i64,
    );
    Ok(out)
}

/// All of the user's posts across a collection of conversations,
/// pooled as one conversation whose id is the user name.
pub fn pooled_posts(user: &str, convos: &[Conversation]) -> Conversation {
    let mut pooled = Conversation::with_id(user);
    for convo in convos {
        if !convo.authors().contains(user) {
            continue;
        }
        for post in user_posts(user, convo).posts().values() {
            pooled.add_post(post.clone());
        }
    }
    pooled
}

/// Float user features across conversations: mixing parameters of the
/// pooled posts plus summary folds of the per-conversation user
/// features, keyed `user_{stat}_{feature}`. A fold over a single
/// conversation reports a standard deviation of `1.0` rather than the
/// degenerate `0.0`.
pub fn floats_across(user: &str, convos: &[Conversation]) -> Result<BTreeMap<String, f64>> {
    let pooled = pooled_posts(user, convos);
    let mixing = harmonic::mixing(&post_in_conv::summed_type_frequency(&pooled));

    let mut out = BTreeMap::new();
    out.insert("mixing_k1".to_string(), mixing.k1);
    out.insert("mixing_theta".to_string(), mixing.theta);
    out.insert("mixing_entropy".to_string(), mixing.entropy);
    out.insert("mixing_N_avg".to_string(), mixing.n_avg);
    out.insert("mixing_M_avg".to_string(), mixing.m_avg);

    let mut samples: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for convo in convos {
        if !convo.authors().contains(user) {
            continue;
        }
        let graph = ConvoGraph::build(convo);
        for (k, v) in floats(user, convo, &graph)? {
            samples.entry(k).or_default().push(v);
        }
        for (k, v) in ints(user, convo)? {
            samples.entry(k).or_default().push(v as f64);
        }
    }
    for (k, vs) in samples {
        if let Some(stats) = SummaryStats::from_samples(&vs) {
            out.insert(format!("user_min_{k}"), stats.min);
            out.insert(format!("user_max_{k}"), stats.max);
            out.insert(format!("user_mean_{k}"), stats.mean);
            out.insert(format!("user_median_{k}"), stats.median);
            out.insert(
                format!("user_std_{k}"),
                if vs.len() > 1 { stats.std } else { 1.0 },
            );
        }
    }
    Ok(out)
}

/// Integer user features across conversations: boolean counts plus
/// summed per-conversation integers. Type counts need set union
/// rather than addition and are skipped.
pub fn ints_across(user: &str, convos: &[Conversation]) -> Result<BTreeMap<String, i64>> {
    let skip = ["type_count", "types"];
    let mut out: BTreeMap<String, i64> = BTreeMap::new();
    for convo in convos {
        if !convo.authors().contains(user) {
            continue;
        }
        for (k, v) in bools(user, convo) {
            let key = format!("{}_count", k.replace("is_", ""));
            *out.entry(key).or_insert(0) += i64::from(v);
        }
        for (k, v) in ints(user, convo)? {
            if skip.contains(&k.as_str()) {
                continue;
            }
            *out.entry(k).or_insert(0) += v;
        }
    }
    Ok(out)
}
