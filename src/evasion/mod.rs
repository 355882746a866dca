//! Browser fallback for sites that answer plain requests with verification pages.
//!
//! A [`PageRenderer`] loads a URL in a real browser, waits until one of the
//! configured success selectors is present and no challenge marker is
//! visible, and hands back the rendered HTML. It never parses content; the
//! source adapters do that.
//!
//! ```text
//! HTTP fetch → challenge detected → PageRenderer → HTML → Source adapter
//! ```

mod challenge;
mod chrome;
mod config;
mod script;

pub use challenge::ChallengeDetector;
pub use chrome::ChromeRenderer;
pub use config::EvasionConfig;
pub use script::{ProbeReport, ProbeScript};

use crate::app::Result;
use async_trait::async_trait;

/// Loads a page in a browser and returns its HTML once verification has cleared.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String>;
}
