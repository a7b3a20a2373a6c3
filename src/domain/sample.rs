// ============================================================
// Layer 3 — Sample Domain Type
// ============================================================
// One row of training data: a short string (site name, SMS,
// message text) and the label it should receive.

use serde::{Deserialize, Serialize};

use crate::domain::label::Label;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub text:  String,
    pub label: Label,
}

impl Sample {
    /// Uses impl Into<String> so callers can pass &str or String.
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self { text: text.into(), label }
    }
}
