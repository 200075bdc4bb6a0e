//! Chrome DevTools adapter: attaches to a running Chrome, opens a YouTube
//! watch page, and exposes its player and metadata to the overlay core.

mod config;
mod error;
mod manager;
mod page;

pub use config::BrowserConfig;
pub use error::BrowserError;
pub use error::Result;
pub use manager::BrowserManager;
pub use page::WatchPage;
