use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::Citation;
use crate::ParsedAnswer;

/// Opaque browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Messages exchanged between the popup, the background runtime and the
/// per-tab content script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExtensionMessage {
    /// Liveness probe; answered with `{ status: "pong" }`.
    Ping,
    /// Unsolicited announcement sent once by a freshly loaded content script.
    ContentScriptReady,
    ShowOverlay {
        question: String,
    },
    HideOverlay,
    UpdateOverlay {
        response: ResponsePayload,
    },
    ProcessManualTranscript {
        question: String,
        #[serde(rename = "videoData")]
        video_data: VideoData,
    },
}

impl ExtensionMessage {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtensionMessage::Ping => "ping",
            ExtensionMessage::ContentScriptReady => "contentScriptReady",
            ExtensionMessage::ShowOverlay { .. } => "showOverlay",
            ExtensionMessage::HideOverlay => "hideOverlay",
            ExtensionMessage::UpdateOverlay { .. } => "updateOverlay",
            ExtensionMessage::ProcessManualTranscript { .. } => "processManualTranscript",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoData {
    pub video_title: String,
    pub video_description: String,
    pub video_transcript: String,
}

/// Payload of `updateOverlay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    Loading(LoadingPayload),
    Answered(AnswerPayload),
    Failed(ErrorPayload),
}

impl ResponsePayload {
    pub fn loading(message: Option<String>) -> Self {
        ResponsePayload::Loading(LoadingPayload {
            kind: LoadingKind::Loading,
            message,
        })
    }

    pub fn answered(parsed: ParsedAnswer) -> Self {
        ResponsePayload::Answered(AnswerPayload {
            success: true,
            answer: parsed.answer,
            timestamps: parsed.timestamps,
        })
    }

    pub fn failed(error: impl Into<String>) -> Self {
        ResponsePayload::Failed(ErrorPayload {
            success: false,
            error: error.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadingKind {
    #[serde(rename = "loading")]
    Loading,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingPayload {
    #[serde(rename = "type")]
    pub kind: LoadingKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    pub success: bool,
    pub answer: String,
    pub timestamps: Vec<Citation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub success: bool,
    pub error: String,
}

/// Replies carried back over a request's response channel. Messages that are
/// acknowledged implicitly (by closing the channel) have no reply at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionReply {
    Pong(PongReply),
    Ack(AckReply),
    Transcript(TranscriptReply),
}

impl ExtensionReply {
    pub fn pong() -> Self {
        ExtensionReply::Pong(PongReply {
            status: PongStatus::Pong,
        })
    }

    pub fn ack() -> Self {
        ExtensionReply::Ack(AckReply { success: true })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PongStatus {
    #[serde(rename = "pong")]
    Pong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongReply {
    pub status: PongStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AckReply {
    pub success: bool,
}

/// Reply to `processManualTranscript`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub timestamps: Vec<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptReply {
    pub fn answered(parsed: ParsedAnswer) -> Self {
        Self {
            success: true,
            answer: Some(parsed.answer),
            timestamps: parsed.timestamps,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: None,
            timestamps: Vec::new(),
            error: Some(error.into()),
        }
    }

    /// Converts the wire shape back into a parsed answer or an error message.
    pub fn into_result(self) -> Result<ParsedAnswer, String> {
        match (self.success, self.answer) {
            (true, Some(answer)) => Ok(ParsedAnswer {
                answer,
                timestamps: self.timestamps,
            }),
            (true, None) => Err("reply reported success without an answer".to_string()),
            (false, _) => Err(self
                .error
                .unwrap_or_else(|| "transcript processing failed".to_string())),
        }
    }
}
