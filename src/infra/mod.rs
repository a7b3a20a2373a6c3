// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by several other layers:
//
//   checkpoint.rs      — Model directories: weights, model
//                        config, training config, metadata;
//                        and the run_{timestamp}/latest layout
//
//   tokenizer_store.rs — tokenizer.json persistence and the
//                        fixed-length TextEncoder
//
//   model_store.rs     — Resolves a base model id to local
//                        files, downloading from the HF Hub
//
//   metrics.rs         — Accuracy / weighted P/R/F1 and the
//                        per-epoch CSV logger

/// Model directory saving and loading
pub mod checkpoint;

/// Tokenizer loading, saving, and fixed-length encoding
pub mod tokenizer_store;

/// Base model resolution (local directory or HF Hub)
pub mod model_store;

/// Classification metrics and CSV logging
pub mod metrics;
