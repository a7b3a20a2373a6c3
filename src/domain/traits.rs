// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits so the
// concrete data source and classifier can be swapped:
//   - CsvSource / BuiltinSource implement SampleSource
//   - Inferencer implements TextClassifier

use anyhow::Result;

use crate::domain::{prediction::Prediction, sample::Sample};

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Any provider of labelled training samples.
///
/// Implementations:
///   - CsvSource     → a `text,label` CSV file
///   - BuiltinSource → the fixed 10-row table
pub trait SampleSource {
    /// Short human-readable description used in logs.
    fn describe(&self) -> String;

    /// Load every sample this source provides.
    fn load(&self) -> Result<Vec<Sample>>;
}

// ─── TextClassifier ───────────────────────────────────────────────────────────
/// Anything that can label a single string.
pub trait TextClassifier {
    fn classify(&self, text: &str) -> Result<Prediction>;
}
