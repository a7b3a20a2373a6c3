use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

use crate::domain::sample::Sample;
use crate::infra::tokenizer_store::TextEncoder;

/// One tokenised and padded example.
/// `input_ids` and `attention_mask` are both exactly `max_length` long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedExample {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
    pub label:          usize,
}

/// Samples tokenised up front, so a text the tokenizer rejects
/// fails construction instead of cutting an epoch short.
pub struct ScamDataset {
    items: Vec<EncodedExample>,
}

impl ScamDataset {
    pub fn new(samples: Vec<Sample>, encoder: &TextEncoder) -> Result<Self> {
        let items = samples
            .into_iter()
            .enumerate()
            .map(|(index, sample)| {
                let (input_ids, attention_mask) = encoder
                    .encode(&sample.text)
                    .with_context(|| format!("Cannot tokenise sample {index}: '{}'", sample.text))?;
                Ok(EncodedExample { input_ids, attention_mask, label: sample.label.id() })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Encoded {} samples", items.len());
        Ok(Self { items })
    }
}

impl Dataset<EncodedExample> for ScamDataset {
    fn get(&self, index: usize) -> Option<EncodedExample> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
