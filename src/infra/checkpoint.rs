// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything a trained classifier needs,
// one directory per model:
//
//   model.mpk           ← weights (Burn DefaultRecorder, f32)
//   config.json         ← BERT config + label tables
//   tokenizer.json      ← written by TokenizerStore
//   train_config.json   ← hyperparameters, incl. max_length
//   metadata.json       ← model_name, trained_at, samples,
//                         metrics, label_map
//
// A training run lays its directories out as:
//
//   {output}/run_{YYYYMMDD_HHMMSS}/
//       train_config.json
//       checkpoint-1/model.mpk
//       checkpoint-2/model.mpk
//       logs/metrics.csv
//   {output}/latest/            ← final model, last writer wins

use anyhow::{Context, Result};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::{DefaultRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::domain::label::Label;
use crate::infra::metrics::EvalReport;
use crate::ml::bert::{BertClassifier, BertConfig, ClassifierConfig};

const MODEL_STEM:   &str = "model";
/// What the recorder writes for MODEL_STEM
pub const MODEL_FILE: &str = "model.mpk";
const CONFIG_FILE:  &str = "config.json";
const TRAIN_CONFIG: &str = "train_config.json";
const METADATA:     &str = "metadata.json";

// ─── TrainingMetadata ─────────────────────────────────────────────────────────
/// The metadata.json sidecar next to every saved model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub model_name: String,
    pub trained_at: String,
    pub samples:    usize,
    pub metrics:    EvalReport,
    pub label_map:  BTreeMap<String, usize>,
}

impl TrainingMetadata {
    /// Fails unless the saved label map is exactly the compiled-in one,
    /// so class indices can never be silently reinterpreted.
    pub fn ensure_label_map(&self) -> Result<()> {
        let expected = Label::label_map();
        if self.label_map != expected {
            anyhow::bail!(
                "Saved label map {:?} does not match this build's label map {:?}",
                self.label_map,
                expected
            );
        }
        Ok(())
    }
}

// ─── RunLayout ────────────────────────────────────────────────────────────────
/// Directory layout for one training run.
#[derive(Debug, Clone)]
pub struct RunLayout {
    output_dir: PathBuf,
    timestamp:  String,
}

impl RunLayout {
    pub fn new(output_dir: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self { output_dir: output_dir.into(), timestamp: timestamp.into() }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn run_dir(&self) -> PathBuf {
        self.output_dir.join(format!("run_{}", self.timestamp))
    }

    pub fn checkpoint_dir(&self, epoch: usize) -> PathBuf {
        self.run_dir().join(format!("checkpoint-{epoch}"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.run_dir().join("logs")
    }

    pub fn latest_dir(&self) -> PathBuf {
        self.output_dir.join("latest")
    }
}

// ─── CheckpointManager ────────────────────────────────────────────────────────
/// Reads and writes the files of one model directory.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Point at a directory. Nothing is created until the first save.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether this directory holds Burn-format weights.
    pub fn has_model(&self) -> bool {
        self.dir.join(MODEL_FILE).exists()
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create directory '{}'", self.dir.display()))
    }

    /// Save model weights at full precision to {dir}/model.mpk
    pub fn save_model<B: Backend>(&self, model: &BertClassifier<B>) -> Result<()> {
        self.ensure_dir()?;
        // Recorder adds the extension
        let path = self.dir.join(MODEL_STEM);

        DefaultRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        tracing::debug!("Saved model weights to '{}'", self.dir.display());
        Ok(())
    }

    /// Restore weights into `model`, which must have the
    /// architecture the weights were saved from.
    pub fn load_model<B: Backend>(
        &self,
        model:  BertClassifier<B>,
        device: &B::Device,
    ) -> Result<BertClassifier<B>> {
        let path = self.dir.join(MODEL_STEM);

        let record = DefaultRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load model weights '{}'. Has this model been trained?",
                    path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn save_model_config(&self, cfg: &BertConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, &ClassifierConfig::new(cfg.clone()))
    }

    pub fn load_model_config(&self) -> Result<BertConfig> {
        BertConfig::from_file(&self.dir.join(CONFIG_FILE))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_CONFIG, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(TRAIN_CONFIG)
    }

    pub fn save_metadata(&self, metadata: &TrainingMetadata) -> Result<()> {
        self.write_json(METADATA, metadata)
    }

    pub fn load_metadata(&self) -> Result<TrainingMetadata> {
        self.read_json(METADATA)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid JSON in '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::metrics::ClassificationMetrics;
    use crate::test_fixtures;
    use burn::backend::NdArray;

    fn metadata(label_map: BTreeMap<String, usize>) -> TrainingMetadata {
        TrainingMetadata {
            model_name: "bert-base-multilingual-cased".to_string(),
            trained_at: "20260101_120000".to_string(),
            samples:    10,
            metrics:    EvalReport::new(1, 1.5, ClassificationMetrics::default()),
            label_map,
        }
    }

    #[test]
    fn test_run_layout_paths() {
        let run = RunLayout::new("models", "20260314_091500");
        assert_eq!(run.run_dir(), PathBuf::from("models/run_20260314_091500"));
        assert_eq!(run.checkpoint_dir(2), PathBuf::from("models/run_20260314_091500/checkpoint-2"));
        assert_eq!(run.logs_dir(), PathBuf::from("models/run_20260314_091500/logs"));
        assert_eq!(run.latest_dir(), PathBuf::from("models/latest"));
    }

    #[test]
    fn test_metadata_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path().join("latest"));
        let meta = metadata(Label::label_map());
        ckpt.save_metadata(&meta).unwrap();
        assert_eq!(ckpt.load_metadata().unwrap(), meta);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("latest/metadata.json")).unwrap()).unwrap();
        assert_eq!(raw["label_map"]["SCAM"], 2);
        assert!(raw["metrics"]["eval_accuracy"].is_number());
    }

    #[test]
    fn test_mismatched_label_map_is_rejected() {
        let mut map = Label::label_map();
        map.insert("SAFE".to_string(), 4);
        map.insert("MALWARE".to_string(), 0);
        assert!(metadata(map).ensure_label_map().is_err());
        assert!(metadata(Label::label_map()).ensure_label_map().is_ok());
    }

    #[test]
    fn test_model_save_and_load() {
        let device = Default::default();
        let dir    = tempfile::tempdir().unwrap();
        let cfg    = test_fixtures::tiny_bert_config(32);
        let model  = cfg.init_classifier::<NdArray>(Label::COUNT, &device);

        let ckpt = CheckpointManager::new(dir.path());
        assert!(!ckpt.has_model());
        ckpt.save_model(&model).unwrap();
        ckpt.save_model_config(&cfg).unwrap();
        assert!(dir.path().join(MODEL_FILE).exists());
        assert!(ckpt.has_model());
        assert_eq!(ckpt.load_model_config().unwrap(), cfg);

        let fresh  = cfg.init_classifier::<NdArray>(Label::COUNT, &device);
        let loaded = ckpt.load_model(fresh, &device).unwrap();

        let ids  = Tensor::<NdArray, 2, Int>::from_ints([[2, 5, 3]], &device);
        let mask = Tensor::<NdArray, 2, Int>::from_ints([[1, 1, 1]], &device);
        let a: Vec<f32> = model.probabilities(ids.clone(), mask.clone()).into_data().iter::<f32>().collect();
        let b: Vec<f32> = loaded.probabilities(ids, mask).into_data().iter::<f32>().collect();
        // Full precision: weights come back unchanged
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_files_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert!(ckpt.load_metadata().is_err());
        assert!(ckpt.load_config().is_err());
    }
}
