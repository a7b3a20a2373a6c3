// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Loads and saves the HF `tokenizer.json`, and wraps a loaded
// tokenizer in a TextEncoder that always yields exactly
// `max_length` token ids plus a matching attention mask.
//
// Truncation is delegated to the tokenizer (so [CLS]/[SEP]
// survive); padding is applied here with the model's
// `pad_token_id`.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokenizers::{Tokenizer, TruncationParams};

pub const TOKENIZER_FILE: &str = "tokenizer.json";

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load a previously saved tokenizer from JSON file
    pub fn load(&self) -> Result<Tokenizer> {
        load_tokenizer(&self.path())
    }

    pub fn save(&self, tokenizer: &Tokenizer) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;
        let path = self.path();
        tokenizer
            .save(&path, true)
            .map_err(|e| anyhow::anyhow!("Cannot write tokenizer to '{}': {}", path.display(), e))?;
        tracing::debug!("Saved tokenizer to '{}'", path.display());
        Ok(())
    }
}

/// Load any `tokenizer.json`, e.g. one from the HF Hub cache.
pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| anyhow::anyhow!(
            "Cannot load tokenizer from '{}': {}", path.display(), e
        ))
}

/// Fixed-length text → (input_ids, attention_mask).
pub struct TextEncoder {
    tokenizer:  Tokenizer,
    max_length: usize,
    pad_id:     u32,
}

impl TextEncoder {
    pub fn new(mut tokenizer: Tokenizer, max_length: usize, pad_id: u32) -> Result<Self> {
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Invalid truncation length {max_length}: {e}"))?;
        tokenizer.with_padding(None);

        Ok(Self { tokenizer, max_length, pad_id })
    }

    pub fn encode(&self, text: &str) -> Result<(Vec<u32>, Vec<u32>)> {
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;

        let mut input_ids: Vec<u32> = enc.get_ids().to_vec();
        input_ids.truncate(self.max_length);
        let mut attention_mask = vec![1u32; input_ids.len()];

        // Pad both sequences to max_length
        input_ids.resize(self.max_length, self.pad_id);
        attention_mask.resize(self.max_length, 0);

        Ok((input_ids, attention_mask))
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }
}
