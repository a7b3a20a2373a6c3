// ============================================================
// Layer 5 — BERT Sequence Classifier
// ============================================================
// A BERT encoder with a linear classification head:
//
//   input_ids ─► embeddings (word + position + token type)
//             ─► N × [self-attention ─► add & norm ─► GELU FFN ─► add & norm]
//             ─► pooler: tanh(dense([CLS] hidden state))
//             ─► dropout ─► classifier ─► logits [batch, num_labels]
//
// Field names follow the Hugging Face checkpoint layout
// (`embeddings.word_embeddings`, `encoder.layer.3.attention...`)
// so pretrained weights load with a handful of key remaps.
//
// Reference: Devlin et al. (2019) BERT
//            Burn Book §3 (Building Blocks), §6 (Importing Models)

use anyhow::{Context, Result};
use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        Initializer,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    record::{FullPrecisionSettings, Recorder},
    tensor::activation::{gelu, softmax, tanh},
};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

use crate::domain::label::Label;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::model_store::{BaseModel, WeightsFormat};

// ─── Configuration ────────────────────────────────────────────────────────────
/// The subset of a Hugging Face BERT `config.json` the model needs.
/// Unknown keys in the file are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BertConfig {
    pub vocab_size:              usize,
    pub hidden_size:             usize,
    pub num_hidden_layers:       usize,
    pub num_attention_heads:     usize,
    pub intermediate_size:       usize,
    pub max_position_embeddings: usize,
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size:         usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps:          f64,
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob:     f64,
    #[serde(default = "default_dropout")]
    pub attention_probs_dropout_prob: f64,
    #[serde(default)]
    pub pad_token_id:            u32,
}

fn default_type_vocab_size() -> usize { 2 }
fn default_layer_norm_eps() -> f64 { 1e-12 }
fn default_dropout() -> f64 { 0.1 }

/// What a saved classifier writes as `config.json`: the encoder
/// config plus the HF-style label tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(flatten)]
    pub bert:       BertConfig,
    pub num_labels: usize,
    pub id2label:   BTreeMap<String, String>,
    pub label2id:   BTreeMap<String, usize>,
}

impl ClassifierConfig {
    pub fn new(bert: BertConfig) -> Self {
        Self {
            bert,
            num_labels: Label::COUNT,
            id2label:   Label::id2label(),
            label2id:   Label::label_map(),
        }
    }
}

impl BertConfig {
    /// Read the encoder config from a `config.json` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read model config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid BERT config in '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            anyhow::bail!(
                "hidden_size {} is not divisible by num_attention_heads {}",
                self.hidden_size,
                self.num_attention_heads
            );
        }
        Ok(())
    }

    pub fn init_model<B: Backend>(&self, device: &B::Device) -> BertModel<B> {
        let embeddings = BertEmbeddings {
            word_embeddings:       EmbeddingConfig::new(self.vocab_size, self.hidden_size).init(device),
            position_embeddings:   EmbeddingConfig::new(self.max_position_embeddings, self.hidden_size).init(device),
            token_type_embeddings: EmbeddingConfig::new(self.type_vocab_size, self.hidden_size).init(device),
            layer_norm:            self.layer_norm(device),
            dropout:               DropoutConfig::new(self.hidden_dropout_prob).init(),
        };
        let layer = (0..self.num_hidden_layers)
            .map(|_| self.build_layer(device))
            .collect();
        let pooler = BertPooler {
            dense: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
        };
        BertModel { embeddings, encoder: BertEncoder { layer }, pooler }
    }

    /// Encoder plus a freshly initialised head with `num_labels` outputs.
    pub fn init_classifier<B: Backend>(&self, num_labels: usize, device: &B::Device) -> BertClassifier<B> {
        BertClassifier {
            bert:       self.init_model(device),
            dropout:    DropoutConfig::new(self.hidden_dropout_prob).init(),
            classifier: LinearConfig::new(self.hidden_size, num_labels)
                .with_initializer(Initializer::Normal { mean: 0.0, std: 0.02 })
                .init(device),
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.hidden_size)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_layer<B: Backend>(&self, device: &B::Device) -> BertLayer<B> {
        let h = self.hidden_size;
        let self_attention = BertSelfAttention {
            query:     LinearConfig::new(h, h).init(device),
            key:       LinearConfig::new(h, h).init(device),
            value:     LinearConfig::new(h, h).init(device),
            dropout:   DropoutConfig::new(self.attention_probs_dropout_prob).init(),
            num_heads: self.num_attention_heads,
            head_dim:  h / self.num_attention_heads,
        };
        let residual = |d_in: usize| BertOutput {
            dense:      LinearConfig::new(d_in, h).init(device),
            layer_norm: self.layer_norm(device),
            dropout:    DropoutConfig::new(self.hidden_dropout_prob).init(),
        };
        BertLayer {
            attention:    BertAttention { self_attention, output: residual(h) },
            intermediate: BertIntermediate {
                dense: LinearConfig::new(h, self.intermediate_size).init(device),
            },
            output:       residual(self.intermediate_size),
        }
    }
}

// ─── Modules ──────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct BertEmbeddings<B: Backend> {
    pub word_embeddings:       Embedding<B>,
    pub position_embeddings:   Embedding<B>,
    pub token_type_embeddings: Embedding<B>,
    pub layer_norm:            LayerNorm<B>,
    pub dropout:               Dropout,
}

impl<B: Backend> BertEmbeddings<B> {
    /// input_ids: [batch, seq_len] → [batch, seq_len, hidden]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        // Single-segment input: every token type is 0
        let token_types = Tensor::<B, 2, Int>::zeros([batch_size, seq_len], &device);

        let x = self.word_embeddings.forward(input_ids)
            + self.position_embeddings.forward(positions)
            + self.token_type_embeddings.forward(token_types);
        self.dropout.forward(self.layer_norm.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct BertSelfAttention<B: Backend> {
    pub query:     Linear<B>,
    pub key:       Linear<B>,
    pub value:     Linear<B>,
    pub dropout:   Dropout,
    pub num_heads: usize,
    pub head_dim:  usize,
}

impl<B: Backend> BertSelfAttention<B> {
    /// `mask` is additive, shape [batch, 1, 1, seq_len].
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch_size, seq_len, hidden] = x.dims();

        let heads = |t: Tensor<B, 3>| {
            t.reshape([batch_size, seq_len, self.num_heads, self.head_dim])
                .swap_dims(1, 2)
        };
        let q = heads(self.query.forward(x.clone()));
        let k = heads(self.key.forward(x.clone()));
        let v = heads(self.value.forward(x));

        let scores = q
            .matmul(k.swap_dims(2, 3))
            .div_scalar((self.head_dim as f64).sqrt())
            + mask.expand([batch_size, self.num_heads, seq_len, seq_len]);
        let probs = self.dropout.forward(softmax(scores, 3));

        probs
            .matmul(v)
            .swap_dims(1, 2)
            .reshape([batch_size, seq_len, hidden])
    }
}

/// dense → dropout → residual add → layer norm.
/// Used for both the attention output and the FFN output.
#[derive(Module, Debug)]
pub struct BertOutput<B: Backend> {
    pub dense:      Linear<B>,
    pub layer_norm: LayerNorm<B>,
    pub dropout:    Dropout,
}

impl<B: Backend> BertOutput<B> {
    pub fn forward(&self, hidden: Tensor<B, 3>, residual: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.dropout.forward(self.dense.forward(hidden));
        self.layer_norm.forward(x + residual)
    }
}

#[derive(Module, Debug)]
pub struct BertAttention<B: Backend> {
    pub self_attention: BertSelfAttention<B>,
    pub output:         BertOutput<B>,
}

#[derive(Module, Debug)]
pub struct BertIntermediate<B: Backend> {
    pub dense: Linear<B>,
}

#[derive(Module, Debug)]
pub struct BertLayer<B: Backend> {
    pub attention:    BertAttention<B>,
    pub intermediate: BertIntermediate<B>,
    pub output:       BertOutput<B>,
}

impl<B: Backend> BertLayer<B> {
    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 4>) -> Tensor<B, 3> {
        let attn = self.attention.self_attention.forward(x.clone(), mask);
        let x    = self.attention.output.forward(attn, x);
        let ffn  = gelu(self.intermediate.dense.forward(x.clone()));
        self.output.forward(ffn, x)
    }
}

#[derive(Module, Debug)]
pub struct BertEncoder<B: Backend> {
    pub layer: Vec<BertLayer<B>>,
}

#[derive(Module, Debug)]
pub struct BertPooler<B: Backend> {
    pub dense: Linear<B>,
}

#[derive(Module, Debug)]
pub struct BertModel<B: Backend> {
    pub embeddings: BertEmbeddings<B>,
    pub encoder:    BertEncoder<B>,
    pub pooler:     BertPooler<B>,
}

impl<B: Backend> BertModel<B> {
    /// Returns the pooled [CLS] representation: [batch, hidden].
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let [batch_size, seq_len] = input_ids.dims();

        // 1 → 0.0, 0 → -10000.0 so padded keys vanish under softmax
        let mask = attention_mask
            .float()
            .neg()
            .add_scalar(1.0)
            .mul_scalar(-10000.0)
            .reshape([batch_size, 1, 1, seq_len]);

        let mut x = self.embeddings.forward(input_ids);
        for layer in &self.encoder.layer {
            x = layer.forward(x, mask.clone());
        }

        let [_, _, hidden] = x.dims();
        let cls = x
            .slice([0..batch_size, 0..1, 0..hidden])
            .reshape([batch_size, hidden]);
        tanh(self.pooler.dense.forward(cls))
    }
}

#[derive(Module, Debug)]
pub struct BertClassifier<B: Backend> {
    pub bert:       BertModel<B>,
    pub dropout:    Dropout,
    pub classifier: Linear<B>,
}

impl<B: Backend> BertClassifier<B> {
    /// input_ids, attention_mask: [batch, seq_len] → logits [batch, num_labels]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let pooled = self.bert.forward(input_ids, attention_mask);
        self.classifier.forward(self.dropout.forward(pooled))
    }

    /// Mean cross-entropy over the batch, plus the logits.
    pub fn forward_loss(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        labels:         Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(input_ids, attention_mask);
        let loss   = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), labels);
        (loss, logits)
    }

    /// Class probabilities: [batch, num_labels], rows sum to 1.
    pub fn probabilities(&self, input_ids: Tensor<B, 2, Int>, attention_mask: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        softmax(self.forward(input_ids, attention_mask), 1)
    }

    /// Build the starting point for fine-tuning from a resolved base model.
    ///
    /// Burn-format bases (a previous run's `latest/`) load whole,
    /// after checking their label map. PyTorch bases load the
    /// encoder and get a new head.
    pub fn from_base(base: &BaseModel, device: &B::Device) -> Result<(BertConfig, Self)> {
        let cfg = BertConfig::from_file(&base.config_path)?;

        let model = match &base.weights {
            WeightsFormat::Burn(dir) => {
                let ckpt = CheckpointManager::new(dir);
                ckpt.load_metadata()?.ensure_label_map()?;
                ckpt.load_model(cfg.init_classifier(Label::COUNT, device), device)?
            }
            WeightsFormat::PyTorch(path) => {
                let encoder = load_pretrained_encoder(&cfg, path, device)?;
                let mut model = cfg.init_classifier(Label::COUNT, device);
                model.bert = encoder;
                model
            }
        };

        tracing::info!(
            "Model '{}' ready: {} layers, hidden={}, vocab={}",
            base.id, cfg.num_hidden_layers, cfg.hidden_size, cfg.vocab_size
        );
        Ok((cfg, model))
    }
}

// ─── Pretrained Import ────────────────────────────────────────────────────────
/// Load encoder weights from a Hugging Face `pytorch_model.bin`.
///
/// Key remaps, applied in order:
///   bert.X                 → X
///   *.LayerNorm.gamma|beta → *.LayerNorm.weight|bias   (older checkpoints)
///   *.self.*               → *.self_attention.*
///   *.LayerNorm.*          → *.layer_norm.*
///
/// The PyTorch adapter transposes Linear weights and renames
/// LayerNorm weight/bias to gamma/beta. Keys with no matching
/// field (MLM head, position_ids buffer) are ignored.
pub fn load_pretrained_encoder<B: Backend>(
    cfg:    &BertConfig,
    path:   &Path,
    device: &B::Device,
) -> Result<BertModel<B>> {
    tracing::info!("Importing pretrained encoder weights from '{}'", path.display());

    let args = LoadArgs::new(path.to_path_buf())
        .with_key_remap(r"^bert\.(.*)", "$1")
        .with_key_remap(r"(.*)LayerNorm\.gamma$", "${1}LayerNorm.weight")
        .with_key_remap(r"(.*)LayerNorm\.beta$", "${1}LayerNorm.bias")
        .with_key_remap(r"(.*)\.self\.(.*)", "$1.self_attention.$2")
        .with_key_remap(r"(.*)LayerNorm\.(.*)", "${1}layer_norm.$2");

    let record: BertModelRecord<B> = PyTorchFileRecorder::<FullPrecisionSettings>::default()
        .load(args, device)
        .map_err(|e| anyhow::anyhow!(
            "Cannot import pretrained weights from '{}': {:?}", path.display(), e
        ))?;

    Ok(cfg.init_model(device).load_record(record))
}
