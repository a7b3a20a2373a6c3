// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that define the core concepts of the
// classifier: the fixed label set, labelled samples, and
// prediction results.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

/// The closed five-way label set and its id mapping
pub mod label;

/// A labelled text sample
pub mod sample;

/// The output of a single-text prediction
pub mod prediction;

/// Core abstractions (traits) that other layers implement
pub mod traits;
