// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here:
//
//   bert.rs       — BERT encoder + classification head, config
//                   parsing, pretrained weight import
//
//   trainer.rs    — The fine-tuning loop: AdamW, warmup
//                   schedule, per-epoch evaluation, best-F1
//                   checkpoint selection, early stopping
//
//   inferencer.rs — Loads a saved model directory and
//                   classifies one string
//
// The compute backend is chosen at build time: WGPU with the
// default `wgpu` feature, the CPU NdArray backend otherwise.

/// BERT sequence classifier
pub mod bert;

/// Fine-tuning loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads a saved model and predicts labels
pub mod inferencer;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

/// Autodiff wrapper used for training
pub type TrainBackend = burn::backend::Autodiff<InferBackend>;
