// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load labelled samples     (Layer 4 - data)
//   Step 2: Stratified split          (Layer 4 - data)
//   Step 3: Resolve base model        (Layer 6 - infra)
//   Step 4: Build classifier          (Layer 5 - ml)
//   Step 5: Load tokenizer            (Layer 6 - infra)
//   Step 6: Build datasets            (Layer 4 - data)
//   Step 7: Save run config           (Layer 6 - infra)
//   Step 8: Run training loop         (Layer 5 - ml)
//   Step 9: Save latest/ + metadata   (Layer 6 - infra)

use anyhow::Result;
use burn::tensor::backend::{AutodiffBackend, Backend};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{dataset::ScamDataset, loader::SourceConfig, splitter::{stratified_split, SplitError}};
use crate::domain::label::Label;
use crate::infra::{
    checkpoint::{CheckpointManager, RunLayout, TrainingMetadata},
    model_store::BaseModel,
    tokenizer_store::{load_tokenizer, TextEncoder, TokenizerStore},
};
use crate::ml::{bert::BertClassifier, trainer::run_training, TrainBackend};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved as train_config.json; inference reads `max_length` back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// CSV with `text,label` columns; None uses the builtin table
    pub data:          Option<String>,
    pub output_dir:    String,
    /// HF Hub id or local model directory
    pub model_name:    String,
    pub epochs:        usize,
    pub batch_size:    usize,
    pub lr:            f64,
    pub max_length:    usize,
    pub warmup_steps:  usize,
    pub weight_decay:  f64,
    pub patience:      usize,
    pub seed:          u64,
    pub val_fraction:  f64,
    pub logging_steps: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data:          None,
            output_dir:    "models".to_string(),
            model_name:    "bert-base-multilingual-cased".to_string(),
            epochs:        3,
            batch_size:    16,
            lr:            2e-5,
            max_length:    256,
            warmup_steps:  100,
            weight_decay:  0.01,
            patience:      2,
            seed:          42,
            val_fraction:  0.2,
            logging_steps: 10,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            anyhow::bail!("epochs must be at least 1");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.max_length == 0 {
            anyhow::bail!("max_length must be at least 1");
        }
        if self.lr <= 0.0 {
            anyhow::bail!("learning rate must be positive, got {}", self.lr);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run on the backend selected at build time.
    pub fn execute(&self) -> Result<TrainingMetadata> {
        let device: <TrainBackend as Backend>::Device = Default::default();
        tracing::info!("Using device: {:?}", device);
        self.execute_on::<TrainBackend>(&device)
    }

    pub fn execute_on<B: AutodiffBackend>(&self, device: &B::Device) -> Result<TrainingMetadata> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Load samples ──────────────────────────────────────────────
        let source  = SourceConfig::from_data_arg(cfg.data.as_deref().map(Path::new)).into_source();
        tracing::info!("Loading samples from {}", source.describe());
        let samples = source.load()?;
        let total   = samples.len();
        tracing::info!("Loaded {} samples", total);

        // ── Step 2: Stratified train / validation split ───────────────────────
        let (train_samples, val_samples) =
            stratified_split(samples, |s| s.label.id(), cfg.val_fraction, cfg.seed)
                .map_err(|e| {
                    let label = match &e {
                        SplitError::ClassTooSmall { class, .. } => Label::from_id(*class).ok(),
                        _ => None,
                    };
                    match label {
                        Some(l) => anyhow::Error::new(e).context(format!("Label {l} has too few samples")),
                        None    => anyhow::Error::new(e),
                    }
                })?;
        tracing::info!("Split: {} train, {} validation", train_samples.len(), val_samples.len());

        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let run       = RunLayout::new(&cfg.output_dir, timestamp);

        // ── Step 3: Resolve base model ────────────────────────────────────────
        let base = BaseModel::resolve(&cfg.model_name)?;

        // ── Step 4: Classifier ────────────────────────────────────────────────
        let (bert_cfg, model) = BertClassifier::<B>::from_base(&base, device)?;
        if cfg.max_length > bert_cfg.max_position_embeddings {
            anyhow::bail!(
                "max_length {} exceeds the model's max_position_embeddings {}",
                cfg.max_length,
                bert_cfg.max_position_embeddings
            );
        }

        // ── Step 5: Tokenizer ─────────────────────────────────────────────────
        let encoder = TextEncoder::new(
            load_tokenizer(&base.tokenizer_path)?,
            cfg.max_length,
            bert_cfg.pad_token_id,
        )?;
        tracing::info!("Tokenizer ready, sequences padded to {}", encoder.max_length());

        // ── Step 6: Burn datasets (every text encoded here) ───────────────────
        let train_dataset = ScamDataset::new(train_samples, &encoder)?;
        let val_dataset   = ScamDataset::new(val_samples, &encoder)?;

        // ── Step 7: Save config with the run ──────────────────────────────────
        CheckpointManager::new(run.run_dir()).save_config(cfg)?;
        tracing::info!("Run directory: '{}'", run.run_dir().display());

        // ── Step 8: Training loop (Layer 5) ───────────────────────────────────
        let outcome = run_training(cfg, model, train_dataset, val_dataset, &run, device)?;
        tracing::info!(
            "Trained {} epoch(s); keeping epoch {}",
            outcome.history.len(),
            outcome.report.epoch
        );

        // ── Step 9: Persist latest/ ───────────────────────────────────────────
        let latest = CheckpointManager::new(run.latest_dir());
        latest.save_model(&outcome.model)?;
        latest.save_model_config(&bert_cfg)?;
        latest.save_config(cfg)?;
        TokenizerStore::new(run.latest_dir()).save(encoder.tokenizer())?;

        let metadata = TrainingMetadata {
            model_name: cfg.model_name.clone(),
            trained_at: run.timestamp().to_string(),
            samples:    total,
            metrics:    outcome.report,
            label_map:  Label::label_map(),
        };
        latest.save_metadata(&metadata)?;

        tracing::info!("Model saved to '{}'", latest.dir().display());
        Ok(metadata)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures;
    use burn::backend::{Autodiff, NdArray};

    #[test]
    fn test_default_config_matches_cli_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.batch_size, 16);
        assert_eq!(cfg.lr, 2e-5);
        assert_eq!(cfg.model_name, "bert-base-multilingual-cased");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cfg = TrainConfig { batch_size: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_end_to_end_on_builtin_data() {
        let base = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        test_fixtures::write_base_model_dir(base.path());

        let cfg = TrainConfig {
            data:          Some(out.path().join("missing.csv").display().to_string()),
            output_dir:    out.path().display().to_string(),
            model_name:    base.path().display().to_string(),
            epochs:        1,
            batch_size:    2,
            max_length:    16,
            logging_steps: 1,
            ..Default::default()
        };

        let metadata = TrainUseCase::new(cfg)
            .execute_on::<Autodiff<NdArray>>(&Default::default())
            .unwrap();
        assert_eq!(metadata.samples, 10);
        assert_eq!(metadata.metrics.epoch, 1);

        let latest = out.path().join("latest");
        let json   = std::fs::read_to_string(latest.join("metadata.json")).unwrap();
        for label in Label::ALL {
            assert!(json.contains(label.name()), "missing {label}");
        }

        let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        let acc = raw["metrics"]["eval_accuracy"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&acc));

        for f in ["model.mpk", "config.json", "tokenizer.json", "train_config.json"] {
            assert!(latest.join(f).exists(), "missing {f}");
        }

        let run_dir = std::fs::read_dir(out.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .find(|p| p.file_name().unwrap().to_string_lossy().starts_with("run_"))
            .unwrap();
        assert!(run_dir.join("checkpoint-1/model.mpk").exists());
        assert!(run_dir.join("train_config.json").exists());
        let csv = std::fs::read_to_string(run_dir.join("logs/metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[test]
    fn test_untokenisable_row_aborts_the_run() {
        let base = tempfile::tempdir().unwrap();
        let out  = tempfile::tempdir().unwrap();
        test_fixtures::write_base_model_dir(base.path());
        // Replace tokenizer.json with one that has no unknown token
        test_fixtures::strict_text_encoder(base.path(), 16);

        let csv = out.path().join("data.csv");
        std::fs::write(&csv, "text,label\n\
            Google - Tìm kiếm thông tin,SAFE\n\
            Shopee Việt Nam - Mua sắm trực tuyến,SAFE\n\
            Nhấp vào liên kết lạ,PHISHING\n\
            Nhập OTP để xác minh danh tính,PHISHING\n").unwrap();

        let cfg = TrainConfig {
            data:       Some(csv.display().to_string()),
            output_dir: out.path().display().to_string(),
            model_name: base.path().display().to_string(),
            epochs:     1,
            batch_size: 1,
            max_length: 16,
            ..Default::default()
        };

        let err = TrainUseCase::new(cfg)
            .execute_on::<Autodiff<NdArray>>(&Default::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("Cannot tokenise"));
        assert!(!out.path().join("latest").exists());
    }
}
