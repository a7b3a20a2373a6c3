// ============================================================
// Layer 3 — Label Domain Type
// ============================================================
// The five classification outcomes. The integer id of each
// label is its declaration order and never changes:
//
//   SAFE=0  PHISHING=1  SCAM=2  SPAM=3  MALWARE=4
//
// The same mapping is written into every saved model's
// metadata.json and checked again at inference time.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Safe,
    Phishing,
    Scam,
    Spam,
    Malware,
}

#[derive(Debug, Error, PartialEq)]
pub enum LabelError {
    #[error("unknown label '{0}' (expected one of SAFE, PHISHING, SCAM, SPAM, MALWARE)")]
    UnknownName(String),

    #[error("label id {0} is out of range (0..{count})", count = Label::COUNT)]
    UnknownId(usize),

    #[error("expected {expected} class scores, got {actual}")]
    ClassCount { expected: usize, actual: usize },
}

impl Label {
    /// Every label in id order.
    pub const ALL: [Label; 5] = [
        Label::Safe,
        Label::Phishing,
        Label::Scam,
        Label::Spam,
        Label::Malware,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Integer class index used by the model head.
    pub fn id(self) -> usize {
        self as usize
    }

    pub fn from_id(id: usize) -> Result<Self, LabelError> {
        Self::ALL.get(id).copied().ok_or(LabelError::UnknownId(id))
    }

    pub fn name(self) -> &'static str {
        match self {
            Label::Safe     => "SAFE",
            Label::Phishing => "PHISHING",
            Label::Scam     => "SCAM",
            Label::Spam     => "SPAM",
            Label::Malware  => "MALWARE",
        }
    }

    /// name → id, the shape persisted as `label_map` in metadata.json.
    pub fn label_map() -> BTreeMap<String, usize> {
        Self::ALL
            .iter()
            .map(|l| (l.name().to_string(), l.id()))
            .collect()
    }

    /// id → name, the HF `id2label` shape (keys are stringified ids).
    pub fn id2label() -> BTreeMap<String, String> {
        Self::ALL
            .iter()
            .map(|l| (l.id().to_string(), l.name().to_string()))
            .collect()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Label {
    type Err = LabelError;

    /// Exact match on the upper-case name; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.name() == s)
            .ok_or_else(|| LabelError::UnknownName(s.to_string()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_id_round_trip() {
        for label in Label::ALL {
            let id   = label.id();
            let back = Label::from_id(id).unwrap();
            assert_eq!(back.name(), label.name());
            assert_eq!(label.name().parse::<Label>().unwrap(), label);
        }
    }

    #[test]
    fn test_ids_are_declaration_order() {
        assert_eq!(Label::Safe.id(), 0);
        assert_eq!(Label::Phishing.id(), 1);
        assert_eq!(Label::Scam.id(), 2);
        assert_eq!(Label::Spam.id(), 3);
        assert_eq!(Label::Malware.id(), 4);
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "CAUTION".parse::<Label>().unwrap_err();
        assert_eq!(err, LabelError::UnknownName("CAUTION".to_string()));
        // Names are case sensitive
        assert!("safe".parse::<Label>().is_err());
    }

    #[test]
    fn test_out_of_range_id() {
        assert_eq!(Label::from_id(5), Err(LabelError::UnknownId(5)));
    }

    #[test]
    fn test_label_map_has_all_five() {
        let map = Label::label_map();
        assert_eq!(map.len(), 5);
        assert_eq!(map["SAFE"], 0);
        assert_eq!(map["MALWARE"], 4);
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&Label::Phishing).unwrap();
        assert_eq!(json, "\"PHISHING\"");
        let back: Label = serde_json::from_str("\"SPAM\"").unwrap();
        assert_eq!(back, Label::Spam);
    }
}
