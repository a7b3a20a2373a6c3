// Offline stand-ins for a pretrained base model: a WordLevel
// tokenizer over the builtin texts and a 2-layer BERT small
// enough to train on CPU in a test.

use std::{collections::BTreeMap, path::Path, str::FromStr};

use burn::backend::NdArray;
use tokenizers::Tokenizer;

use crate::application::train_use_case::TrainConfig;
use crate::data::loader::BuiltinSource;
use crate::domain::{label::Label, traits::SampleSource};
use crate::infra::checkpoint::{CheckpointManager, TrainingMetadata};
use crate::infra::metrics::{ClassificationMetrics, EvalReport};
use crate::infra::tokenizer_store::{TextEncoder, TokenizerStore};
use crate::ml::bert::BertConfig;

pub const PAD_ID: u32 = 0;
const SPECIALS: [&str; 4] = ["[PAD]", "[UNK]", "[CLS]", "[SEP]"];

/// Mirrors the `Whitespace` pre-tokenizer: runs of word characters
/// and runs of punctuation.
fn words(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for chunk in text.split_whitespace() {
        let mut current = String::new();
        let mut is_word = None;
        for c in chunk.chars() {
            let w = c.is_alphanumeric() || c == '_';
            if is_word.is_some_and(|prev| prev != w) {
                out.push(std::mem::take(&mut current));
            }
            is_word = Some(w);
            current.push(c);
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

pub fn tokenizer() -> Tokenizer {
    tokenizer_with_unk("[UNK]")
}

/// `unk` missing from the vocabulary makes unknown words an
/// encoding error.
fn tokenizer_with_unk(unk: &str) -> Tokenizer {
    let mut vocab: BTreeMap<String, u32> = BTreeMap::new();
    for s in SPECIALS {
        let id = vocab.len() as u32;
        vocab.insert(s.to_string(), id);
    }
    for sample in BuiltinSource.load().unwrap() {
        for w in words(&sample.text) {
            let id = vocab.len() as u32;
            vocab.entry(w).or_insert(id);
        }
    }

    let json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": unk }
    });
    Tokenizer::from_str(&json.to_string()).unwrap()
}

pub fn vocab_size() -> usize {
    tokenizer().get_vocab_size(true)
}

/// Saves the fixture tokenizer under `dir` and returns an encoder
/// loaded back from disk.
pub fn text_encoder(dir: &Path, max_len: usize) -> TextEncoder {
    let store = TokenizerStore::new(dir);
    store.save(&tokenizer()).unwrap();
    TextEncoder::new(store.load().unwrap(), max_len, PAD_ID).unwrap()
}

/// An encoder that fails on any word outside the builtin texts.
pub fn strict_text_encoder(dir: &Path, max_len: usize) -> TextEncoder {
    let store = TokenizerStore::new(dir);
    store.save(&tokenizer_with_unk("<unk>")).unwrap();
    TextEncoder::new(store.load().unwrap(), max_len, PAD_ID).unwrap()
}

pub fn tiny_bert_config(vocab_size: usize) -> BertConfig {
    BertConfig {
        vocab_size,
        hidden_size:                  16,
        num_hidden_layers:            2,
        num_attention_heads:          2,
        intermediate_size:            32,
        max_position_embeddings:      64,
        type_vocab_size:              2,
        layer_norm_eps:               1e-12,
        hidden_dropout_prob:          0.1,
        attention_probs_dropout_prob: 0.1,
        pad_token_id:                 0,
    }
}

/// A Burn-format base model directory: config.json, tokenizer.json,
/// model.mpk and metadata.json.
pub fn write_base_model_dir(dir: &Path) {
    let cfg   = tiny_bert_config(vocab_size());
    let model = cfg.init_classifier::<NdArray>(Label::COUNT, &Default::default());

    let ckpt = CheckpointManager::new(dir);
    ckpt.save_model(&model).unwrap();
    ckpt.save_model_config(&cfg).unwrap();
    ckpt.save_metadata(&TrainingMetadata {
        model_name: "tiny-bert".to_string(),
        trained_at: "20260101_000000".to_string(),
        samples:    0,
        metrics:    EvalReport::new(0, 0.0, ClassificationMetrics::default()),
        label_map:  Label::label_map(),
    }).unwrap();
    TokenizerStore::new(dir).save(&tokenizer()).unwrap();
}

/// A base model directory plus the train_config.json that
/// inference reads `max_length` from.
pub fn write_trained_model_dir(dir: &Path) {
    write_base_model_dir(dir);
    let cfg = TrainConfig { max_length: 16, ..Default::default() };
    CheckpointManager::new(dir).save_config(&cfg).unwrap();
}

#[test]
fn fixture_tokenizer_covers_builtin_texts() {
    let tok = tokenizer();
    let enc = tok.encode("Google - Tìm kiếm thông tin", false).unwrap();
    assert_eq!(enc.get_ids().len(), 6);
    assert!(enc.get_ids().iter().all(|&id| id != 1));
    assert_eq!(tok.token_to_id("[PAD]"), Some(PAD_ID));
}
