// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Classifies one string with a saved model. Everything is
// reloaded from `model_dir` on each call; nothing is cached.

use anyhow::Result;
use std::path::Path;

use crate::domain::{prediction::Prediction, traits::TextClassifier};
use crate::ml::{inferencer::Inferencer, InferBackend};

pub fn predict(text: &str, model_dir: &Path) -> Result<Prediction> {
    let inferencer = Inferencer::<InferBackend>::from_dir(model_dir, Default::default())?;
    inferencer.classify(text)
}
