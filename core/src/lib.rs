//! Coordination core of the overlay: the popup-side session coordinator, the
//! per-tab overlay controller, and the page-side player bridge, connected only
//! by message channels.

mod channel;
pub mod config;
pub mod coordinator;
mod error;
pub mod host;
pub mod overlay;
mod page;
pub mod player_bridge;
mod tabs;

pub use channel::MessageError;
pub use channel::RuntimeEnvelope;
pub use channel::RuntimeSender;
pub use channel::TabEnvelope;
pub use error::HandshakeError;
pub use error::QtubeErr;
pub use error::Result;
pub use error::ValidationError;
pub use page::PageContext;
pub use page::PageMetadata;
pub use tabs::TabInfo;
pub use tabs::TabsApi;

pub use qtube_gemini as gemini;
pub use qtube_protocol as protocol;
