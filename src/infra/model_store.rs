// ============================================================
// Layer 6 — Base Model Store
// ============================================================
// Resolves the `--model` argument to files on disk:
//
//   local directory with model.mpk         → Burn weights
//       (a previous run's `latest/`, fine-tuned further)
//   local directory with pytorch_model.bin → pretrained encoder
//   anything else                          → Hugging Face Hub id,
//       downloaded (and cached) with hf-hub
//
// Every source must also provide config.json and tokenizer.json.

use anyhow::{Context, Result};
use hf_hub::{api::sync::Api, Repo, RepoType};
use std::path::{Path, PathBuf};

use crate::infra::checkpoint::{CheckpointManager, MODEL_FILE};
use crate::infra::tokenizer_store::TOKENIZER_FILE;

const PYTORCH_WEIGHTS: &str = "pytorch_model.bin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WeightsFormat {
    /// Directory holding a saved classifier
    Burn(PathBuf),
    /// A `pytorch_model.bin` file holding encoder weights
    PyTorch(PathBuf),
}

/// The files making up a base model.
#[derive(Debug, Clone)]
pub struct BaseModel {
    pub id:             String,
    pub config_path:    PathBuf,
    pub tokenizer_path: PathBuf,
    pub weights:        WeightsFormat,
}

impl BaseModel {
    pub fn resolve(model: &str) -> Result<Self> {
        let dir = Path::new(model);
        if dir.is_dir() {
            Self::from_dir(model, dir)
        } else {
            Self::download(model)
        }
    }

    fn from_dir(id: &str, dir: &Path) -> Result<Self> {
        let config_path    = dir.join("config.json");
        let tokenizer_path = dir.join(TOKENIZER_FILE);

        for required in [&config_path, &tokenizer_path] {
            if !required.exists() {
                anyhow::bail!("Model directory '{}' has no '{}'", dir.display(), required.display());
            }
        }

        let weights = if CheckpointManager::new(dir).has_model() {
            WeightsFormat::Burn(dir.to_path_buf())
        } else if dir.join(PYTORCH_WEIGHTS).exists() {
            WeightsFormat::PyTorch(dir.join(PYTORCH_WEIGHTS))
        } else {
            anyhow::bail!(
                "Model directory '{}' has neither {} nor {}",
                dir.display(),
                MODEL_FILE,
                PYTORCH_WEIGHTS
            );
        };

        tracing::info!("Using local base model '{}' ({:?})", dir.display(), weights);
        Ok(Self { id: id.to_string(), config_path, tokenizer_path, weights })
    }

    fn download(id: &str) -> Result<Self> {
        tracing::info!("Fetching '{}' from the Hugging Face Hub", id);

        let api  = Api::new().context("Cannot initialise Hugging Face Hub client")?;
        let repo = api.repo(Repo::with_revision(id.to_string(), RepoType::Model, "main".to_string()));

        let fetch = |file: &str| {
            repo.get(file)
                .with_context(|| format!("Cannot download '{file}' for model '{id}'"))
        };

        let config_path    = fetch("config.json")?;
        let tokenizer_path = fetch(TOKENIZER_FILE)?;
        let weights        = WeightsFormat::PyTorch(fetch(PYTORCH_WEIGHTS)?);

        tracing::debug!("Hub files cached under '{}'", config_path.display());
        Ok(Self { id: id.to_string(), config_path, tokenizer_path, weights })
    }
}
