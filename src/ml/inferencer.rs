// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads a saved model directory (see infra/checkpoint.rs) and
// classifies single strings on a non-autodiff backend.
//
// Loading refuses a directory whose metadata.json label map
// differs from this build's Label enum.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::Path;

use crate::domain::{prediction::Prediction, traits::TextClassifier};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::tokenizer_store::{TextEncoder, TokenizerStore};
use crate::ml::bert::BertClassifier;
use crate::domain::label::Label;

pub struct Inferencer<B: Backend> {
    model:   BertClassifier<B>,
    encoder: TextEncoder,
    device:  B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_dir(dir: &Path, device: B::Device) -> Result<Self> {
        let ckpt = CheckpointManager::new(dir);

        ckpt.load_metadata()
            .with_context(|| format!("'{}' is not a trained model directory", dir.display()))?
            .ensure_label_map()?;

        let model_cfg  = ckpt.load_model_config()?;
        let max_length = ckpt.load_config()?.max_length;

        let model = model_cfg.init_classifier::<B>(Label::COUNT, &device);
        let model = ckpt.load_model(model, &device)?;

        let tokenizer = TokenizerStore::new(dir).load()?;
        let encoder   = TextEncoder::new(tokenizer, max_length, model_cfg.pad_token_id)?;

        tracing::info!("Model loaded from '{}'", dir.display());
        Ok(Self { model, encoder, device })
    }

    pub fn predict(&self, text: &str) -> Result<Prediction> {
        let (ids, mask) = self.encoder.encode(text)?;
        let seq_len     = ids.len();

        let to_tensor = |v: Vec<u32>| {
            let flat: Vec<i32> = v.into_iter().map(|x| x as i32).collect();
            Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
                .reshape([1, seq_len])
        };

        let probs: Vec<f32> = self.model
            .probabilities(to_tensor(ids), to_tensor(mask))
            .into_data()
            .iter::<f32>()
            .collect();

        let prediction = Prediction::from_probabilities(&probs)?;
        tracing::debug!("'{}' → {} ({:.4})", text, prediction.label, prediction.confidence);
        Ok(prediction)
    }
}

impl<B: Backend> TextClassifier for Inferencer<B> {
    fn classify(&self, text: &str) -> Result<Prediction> {
        self.predict(text)
    }
}
