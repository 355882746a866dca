//! Download orchestration settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Attempts per catalog, chapter list, and chapter fetch (default: 3)
    pub retries: u32,

    /// Pause between attempts in milliseconds (default: 500)
    pub retry_delay_ms: u64,

    /// Pause between consecutive chapter fetches in milliseconds (default: 200)
    pub chapter_delay_ms: u64,

    /// Chapter fetches in flight for one novel (default: 1)
    pub chapter_concurrency: usize,

    /// Novel jobs in flight during a rank scan (default: 2)
    pub rank_concurrency: usize,

    /// Plain HTTP request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,

    /// User agent for plain HTTP requests
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_ms: 500,
            chapter_delay_ms: 200,
            chapter_concurrency: 1,
            rank_concurrency: 2,
            request_timeout_secs: 30,
            user_agent: DESKTOP_USER_AGENT.to_string(),
        }
    }
}

impl DownloadConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn chapter_delay(&self) -> Duration {
        Duration::from_millis(self.chapter_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
