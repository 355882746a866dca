use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::download::DESKTOP_USER_AGENT;

/// Configuration for the browser fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvasionConfig {
    /// Fall back to a browser when a plain fetch hits a challenge page (default: true)
    pub enabled: bool,

    /// Show the browser window so a person can solve challenges (default: false)
    pub visible: bool,

    /// Upper bound on waiting for a page to pass verification, in seconds (default: 45)
    pub timeout_secs: u64,

    /// How often the page is probed while waiting, in milliseconds (default: 500)
    pub poll_interval_ms: u64,

    /// Extra wait after the page looks ready, for late rendering, in milliseconds (default: 2000)
    pub settle_ms: u64,

    /// User agent string to use
    pub user_agent: Option<String>,

    /// CSS selectors whose presence means the real page has rendered
    pub success_selectors: Vec<String>,

    /// Case-insensitive text fragments that identify a verification page
    pub challenge_markers: Vec<String>,
}

impl Default for EvasionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            visible: false,
            timeout_secs: 45,
            poll_interval_ms: 500,
            settle_ms: 2000,
            user_agent: Some(DESKTOP_USER_AGENT.to_string()),
            success_selectors: vec![
                // Qidian catalog, chapter and book pages
                ".y-list__item".to_string(),
                ".chapter-li-a".to_string(),
                ".j_chapterName".to_string(),
                ".book-intro".to_string(),
                "#book-intro-detail".to_string(),
                "main.content".to_string(),
                // Qidian rank pages
                "#rank-view-list".to_string(),
                ".book-img-text".to_string(),
                ".rank-list".to_string(),
                // Fanqie
                ".chapter-item-title".to_string(),
                ".muye-reader-content".to_string(),
                ".page-header-info".to_string(),
                ".rank-book-item".to_string(),
            ],
            challenge_markers: vec![
                "just a moment".to_string(),
                "security checking".to_string(),
                "attention required".to_string(),
                "cf-challenge".to_string(),
                "captcha".to_string(),
                "are you human".to_string(),
                "安全验证".to_string(),
                "访问验证".to_string(),
            ],
        }
    }
}

impl EvasionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(50))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Visible window with a long timeout, for solving challenges by hand
    pub fn manual() -> Self {
        Self {
            visible: true,
            timeout_secs: 300,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = EvasionConfig::default();
        assert!(config.enabled);
        assert!(!config.visible);
        assert_eq!(config.timeout(), Duration::from_secs(45));
        assert_eq!(config.settle(), Duration::from_millis(2000));
        assert!(!config.success_selectors.is_empty());
        assert!(!config.challenge_markers.is_empty());
    }

    #[test]
    fn test_manual_config() {
        let config = EvasionConfig::manual();
        assert!(config.visible);
        assert_eq!(config.timeout_secs, 300);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn test_poll_interval_has_floor() {
        let config = EvasionConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }
}
