// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw rows to GPU-ready tensor batches:
//
//   CSV file / builtin table
//       │
//       ▼
//   SampleSource       → Vec<Sample> with typed labels
//       │
//       ▼
//   stratified_split   → (train, validation)
//       │
//       ▼
//   ScamDataset        → every sample tokenized up front
//       │
//       ▼
//   ClassificationBatcher → stacks encodings into tensors
//       │
//       ▼
//   DataLoader         → feeds batches to the training loop

/// CSV and builtin sample sources, and source selection
pub mod loader;

/// Implements Burn's Dataset trait over (text, label) pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Seeded stratified train/validation split
pub mod splitter;
