//! Settings for the OpenAI-compatible completion endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,

    /// Prompt for whole-novel analysis. Empty means the built-in default.
    pub auto_prompt: String,

    /// Prompt for single-chapter outline analysis. Empty means the built-in default.
    pub chapter_prompt: String,

    /// Leading chapters fed to the whole-novel analysis (default: 5)
    pub auto_chapters: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            auto_prompt: String::new(),
            chapter_prompt: String::new(),
            auto_chapters: 5,
        }
    }
}

impl AiConfig {
    pub fn configured_auto_prompt(&self) -> Option<&str> {
        non_blank(&self.auto_prompt)
    }

    pub fn configured_chapter_prompt(&self) -> Option<&str> {
        non_blank(&self.chapter_prompt)
    }
}

fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
