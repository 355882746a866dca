use std::path::PathBuf;

use url::Url;

use crate::app::{Result, ScoutError};
use crate::domain::Platform;
use crate::store::Workspace;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTarget {
    /// One novel, its first `chapters` chapters
    Single { url: String, chapters: usize },
    /// The top `max_novels` of a ranking page, `chapters_per_novel` each
    Rank {
        url: String,
        max_novels: usize,
        chapters_per_novel: usize,
    },
}

#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub platform: Platform,
    pub target: JobTarget,
    pub workspace_root: PathBuf,
    /// Route every page through a visible browser window
    pub evasion_visible: bool,
}

impl DownloadJob {
    pub fn single(platform: Platform, url: impl Into<String>, chapters: usize) -> Self {
        Self {
            platform,
            target: JobTarget::Single {
                url: url.into(),
                chapters,
            },
            workspace_root: PathBuf::from("."),
            evasion_visible: false,
        }
    }

    pub fn rank(
        platform: Platform,
        url: impl Into<String>,
        max_novels: usize,
        chapters_per_novel: usize,
    ) -> Self {
        Self {
            platform,
            target: JobTarget::Rank {
                url: url.into(),
                max_novels,
                chapters_per_novel,
            },
            workspace_root: PathBuf::from("."),
            evasion_visible: false,
        }
    }

    pub fn in_workspace(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.evasion_visible = visible;
        self
    }

    pub fn url(&self) -> &str {
        match &self.target {
            JobTarget::Single { url, .. } | JobTarget::Rank { url, .. } => url,
        }
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(&self.workspace_root)
    }

    /// Checks that must pass before anything is spawned.
    pub fn validate(&self) -> Result<()> {
        self.workspace().require_ready()?;

        let url = self.url().trim();
        if url.is_empty() {
            return Err(ScoutError::Configuration("download URL is empty".into()));
        }
        let parsed = Url::parse(url)
            .map_err(|e| ScoutError::Configuration(format!("invalid URL {:?}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScoutError::Configuration(format!(
                "unsupported URL scheme {:?}",
                parsed.scheme()
            )));
        }
        Ok(())
    }
}
