//! Language-detection interface.
//!
//! The engine never bundles a detection model. Callers that want per-message
//! language codes construct a detector once and pass it by reference into the
//! parsing pipeline; everything downstream only sees the resolved code.
//!
//! A detection is accepted when its confidence clears
//! [`DetectorConfig::threshold`]; anything weaker resolves to [`UND`].

use serde::{Deserialize, Serialize};

/// ISO 639-3 code used when no detection clears the confidence threshold.
pub const UND: &str = "und";

/// A language detector: maps text to a `(language_code, confidence)` pair.
///
/// Implementations are expected to be cheap to call repeatedly; the engine
/// invokes `get` once per message text mutation.
pub trait LangDetect {
    /// Returns the detected language code and the detector's confidence
    /// in `[0.0, 1.0]`.
    fn get(&self, text: &str) -> (String, f64);
}

/// Confidence policy for accepting a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum confidence for a detection to be kept; below it the
    /// language resolves to [`UND`].
    pub threshold: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl DetectorConfig {
    /// Creates a config with an explicit acceptance threshold.
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Applies the acceptance rule to a raw detection.
    pub fn accept(&self, code: String, confidence: f64) -> String {
        if confidence >= self.threshold {
            code
        } else {
            UND.to_string()
        }
    }
}

/// Resolves a language code for `text`, or `None` when no detector is given.
pub fn resolve_lang(
    detector: Option<&dyn LangDetect>,
    config: DetectorConfig,
    text: &str,
) -> Option<String> {
    detector.map(|d| {
        let (code, confidence) = d.get(text);
        config.accept(code, confidence)
    })
}
