// ============================================================
// Layer 3 — Prediction Domain Type
// ============================================================
// The result of classifying one string:
//
//   {
//     "label": "PHISHING",
//     "confidence": 0.91,
//     "probabilities": { "SAFE": 0.02, "PHISHING": 0.91, ... }
//   }
//
// `probabilities` always holds all five labels and sums to 1;
// `confidence` is the probability of `label`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::label::{Label, LabelError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label:         Label,
    pub confidence:    f32,
    pub probabilities: BTreeMap<Label, f32>,
}

impl Prediction {
    /// Build a prediction from softmax output indexed by label id.
    /// Ties resolve to the lowest id.
    pub fn from_probabilities(probs: &[f32]) -> Result<Self, LabelError> {
        if probs.len() != Label::COUNT {
            return Err(LabelError::ClassCount {
                expected: Label::COUNT,
                actual:   probs.len(),
            });
        }

        let mut best_id = 0usize;
        for (id, &p) in probs.iter().enumerate() {
            if p > probs[best_id] {
                best_id = id;
            }
        }

        let probabilities = Label::ALL
            .iter()
            .map(|&l| (l, probs[l.id()]))
            .collect();

        Ok(Self {
            label:      Label::from_id(best_id)?,
            confidence: probs[best_id],
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_and_confidence() {
        let p = Prediction::from_probabilities(&[0.1, 0.6, 0.2, 0.05, 0.05]).unwrap();
        assert_eq!(p.label, Label::Phishing);
        assert_eq!(p.confidence, 0.6);
        assert_eq!(p.probabilities.len(), 5);
        assert_eq!(p.probabilities[&Label::Scam], 0.2);
    }

    #[test]
    fn test_tie_picks_lowest_id() {
        let p = Prediction::from_probabilities(&[0.2; 5]).unwrap();
        assert_eq!(p.label, Label::Safe);
    }

    #[test]
    fn test_wrong_class_count() {
        let err = Prediction::from_probabilities(&[0.5, 0.5]).unwrap_err();
        assert_eq!(err, LabelError::ClassCount { expected: 5, actual: 2 });
    }

    #[test]
    fn test_serializes_label_names_as_keys() {
        let p    = Prediction::from_probabilities(&[0.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["label"], "MALWARE");
        assert_eq!(json["probabilities"]["MALWARE"], 1.0);
    }
}
