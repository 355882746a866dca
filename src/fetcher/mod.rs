//! Page acquisition.
//!
//! [`HttpFetcher`] issues plain requests and recognizes verification pages;
//! [`EvasiveFetcher`] layers the browser fallback on top and is what the
//! source adapters talk to through the [`Fetcher`] trait.

pub mod evasive;
pub mod http_fetcher;

pub use evasive::EvasiveFetcher;
pub use http_fetcher::HttpFetcher;

use async_trait::async_trait;

use crate::app::Result;

pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) \
     AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";

/// How a page should be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Plain desktop request, browser only if a challenge comes back
    Direct,
    /// Plain request with a mobile user agent and a same-origin referer
    Mobile,
    /// Always rendered in the browser
    Browser,
}

#[derive(Debug)]
pub enum FetchResult {
    /// Page body
    Document(String),
    /// A verification page was served instead of content
    Challenged { status: u16 },
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a page and return its HTML.
    async fn fetch(&self, url: &str, route: Route) -> Result<String>;
}
