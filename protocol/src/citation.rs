use serde::Deserialize;
use serde::Serialize;

/// A timestamp reference extracted from a model answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Offset into the video in whole seconds.
    pub time: u32,
    /// Zero-padded `MM:SS` label as it should be displayed.
    pub label: String,
    /// Free text following the timestamp; empty when the model gave none.
    #[serde(default)]
    pub description: String,
}

impl Citation {
    pub fn new(minutes: u32, seconds: u32, description: impl Into<String>) -> Self {
        Self {
            time: minutes * 60 + seconds,
            label: format!("{minutes:02}:{seconds:02}"),
            description: description.into(),
        }
    }
}

/// Answer text with citation lines stripped, plus the citations in the order
/// they appeared in the raw text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAnswer {
    pub answer: String,
    #[serde(default)]
    pub timestamps: Vec<Citation>,
}
