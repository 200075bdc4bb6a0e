//! Client for the generative-language endpoint that answers transcript
//! questions, plus the parsing of `[MM:SS]` citations out of its replies.

mod citations;
mod client;
mod error;
mod prompt;

pub use citations::parse_answer;
pub use client::AnswerEngine;
pub use client::DEFAULT_BASE_URL;
pub use client::DEFAULT_MODEL;
pub use client::GeminiClient;
pub use client::GeminiSettings;
pub use error::ApiError;
pub use prompt::MANUAL_TRANSCRIPT_DESCRIPTION;
pub use prompt::UNKNOWN_VIDEO_TITLE;
pub use prompt::compose_grounding_prompt;
