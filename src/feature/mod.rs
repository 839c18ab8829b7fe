//! Three-tier feature extraction over conversations.
//!
//! Features are measured at increasing scope, and each tier only ever
//! adds context to the one below it:
//!
//! - **[`post`]**: one message in isolation. Counts, categoricals,
//!   and the mixing-law fit of its own vocabulary.
//! - **[`post_in_conv`]**: a message against its conversation.
//!   Position in the reply tree, arrival timing, and the split
//!   entropy block.
//! - **[`conv`]** and **[`user`]**: whole conversations and single
//!   authors, built by folding the lower tiers.
//!
//! Shared machinery sits alongside: **[`harmonic`]** is the
//! mixing-law model every vocabulary feature leans on,
//! **[`cache`]** memoizes finished values against the conversation's
//! generation counter, and **[`vectorize`]** assembles any tier into
//! numeric matrices under a fit/transform normalization contract.
//!
//! Extractors return plain maps keyed by feature name. The computable
//! set is fixed at compile time inside each bundle function; nothing
//! is dispatched through runtime registries.

pub mod cache;
pub mod conv;
pub mod harmonic;
pub mod post;
pub mod post_in_conv;
pub mod user;
pub mod vectorize;

pub use cache::{CacheScope, CachedValue, FeatureCache, TemporalStats};
pub use harmonic::MixingParams;
pub use post::PostIntFeature;
pub use vectorize::{
    ConversationVectorizer, Matrix, Normalization, PostRowId, PostVectorizer, UserVectorizer,
    VectorInput,
};

/// Five-number summary of a sample: min, max, standard deviation,
/// mean, and median.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub std: f64,
    pub mean: f64,
    pub median: f64,
}

impl SummaryStats {
    /// Folds a sample into its summary, `None` when empty. The
    /// deviation is the population form: these summaries describe
    /// everything observed, not an estimate of more.
    pub fn from_samples(samples: &[f64]) -> Option<SummaryStats> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(SummaryStats {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            std: variance.sqrt(),
            mean,
            median,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::SummaryStats;

    #[test]
    fn test_summary_folds() {
        let s = SummaryStats::from_samples(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.median, 2.5);
        // population deviation of 1..4
        assert!((s.std - 1.118033988749895).abs() < 1e-12);

        let odd = SummaryStats::from_samples(&[5.0, 1.0, 3.0]).unwrap();
        assert_eq!(odd.median, 3.0);

        assert!(SummaryStats::from_samples(&[]).is_none());
    }

    #[test]
    fn test_single_sample_summary() {
        let s = SummaryStats::from_samples(&[7.0]).unwrap();
        assert_eq!(s.min, 7.0);
        assert_eq!(s.max, 7.0);
        assert_eq!(s.mean, 7.0);
        assert_eq!(s.median, 7.0);
        assert_eq!(s.std, 0.0);
    }
}
