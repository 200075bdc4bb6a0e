//! Wire types shared by every context of the overlay: the popup coordinator,
//! the per-tab content script, and the page-level player bridge.

mod citation;
mod events;
mod messages;

pub use citation::Citation;
pub use citation::ParsedAnswer;
pub use events::PageEvent;
pub use events::SEEK_EVENT_NAME;
pub use events::SeekDetail;
pub use messages::AckReply;
pub use messages::AnswerPayload;
pub use messages::ErrorPayload;
pub use messages::ExtensionMessage;
pub use messages::ExtensionReply;
pub use messages::LoadingKind;
pub use messages::LoadingPayload;
pub use messages::PongReply;
pub use messages::PongStatus;
pub use messages::ResponsePayload;
pub use messages::TabId;
pub use messages::TranscriptReply;
pub use messages::VideoData;
