// ============================================================
// Layer 4 — Stratified Train/Validation Splitter
// ============================================================
// Splits samples into training and validation sets so that
// each class keeps (roughly) its share in both sets.
//
// Per class with n members:
//   n_val = round(n * val_fraction), clamped to [1, n - 1]
//
// so every class appears on both sides. A class with a single
// member cannot be split and is rejected.
//
// The RNG is ChaCha8 seeded from `seed`: the same seed and
// input always produce the same partition, on every platform.

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("cannot split an empty dataset")]
    Empty,

    #[error(
        "class {class} has only {count} member(s); a stratified split needs at least 2 per class"
    )]
    ClassTooSmall { class: usize, count: usize },

    #[error("validation fraction must be in (0, 1), got {0}")]
    BadFraction(f64),
}

/// Split `items` into (train, validation), stratified on `class_of`.
pub fn stratified_split<T>(
    items:        Vec<T>,
    class_of:     impl Fn(&T) -> usize,
    val_fraction: f64,
    seed:         u64,
) -> Result<(Vec<T>, Vec<T>), SplitError> {
    if !(val_fraction > 0.0 && val_fraction < 1.0) {
        return Err(SplitError::BadFraction(val_fraction));
    }
    if items.is_empty() {
        return Err(SplitError::Empty);
    }

    // BTreeMap keeps class iteration order stable for the RNG
    let mut by_class: BTreeMap<usize, Vec<T>> = BTreeMap::new();
    for item in items {
        by_class.entry(class_of(&item)).or_default().push(item);
    }

    if let Some((&class, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
        return Err(SplitError::ClassTooSmall { class, count: members.len() });
    }

    let mut rng   = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut val   = Vec::new();

    for (_, mut members) in by_class {
        members.shuffle(&mut rng);
        let n     = members.len();
        let n_val = ((n as f64) * val_fraction).round() as usize;
        let n_val = n_val.clamp(1, n - 1);

        let rest = members.split_off(n_val);
        val.extend(members);
        train.extend(rest);
    }

    // Mix classes so batches are not grouped by label
    train.shuffle(&mut rng);
    val.shuffle(&mut rng);

    tracing::debug!("Stratified split: {} training, {} validation", train.len(), val.len());

    Ok((train, val))
}
