use std::fs;
use std::path::{Path, PathBuf};

use crate::app::{Result, ScoutError};
use crate::store::fs::{sanitize_title, FsStore};

pub const LOG_PLACEHOLDER: &str = "暂无日志";

/// A workspace root and the directories derived from it.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.root.join("downloads")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join("result")
    }

    pub fn log_path(&self) -> PathBuf {
        self.logs_dir().join("app.log")
    }

    pub fn store(&self) -> FsStore {
        FsStore::new(self.downloads_dir())
    }

    /// Create `downloads/` and `logs/`.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.downloads_dir())?;
        fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.downloads_dir().is_dir() && self.logs_dir().is_dir()
    }

    /// Jobs refuse to start in a workspace that was never initialized.
    pub fn require_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ScoutError::Configuration(format!(
                "workspace {} is not initialized (missing downloads/ or logs/); run `novelscout init`",
                self.root.display()
            )))
        }
    }

    pub fn read_log(&self) -> Result<String> {
        let path = self.log_path();
        if !path.exists() {
            return Ok(LOG_PLACEHOLDER.to_string());
        }
        Ok(fs::read_to_string(path)?)
    }

    pub fn clear_log(&self) -> Result<()> {
        fs::create_dir_all(self.logs_dir())?;
        fs::write(self.log_path(), "")?;
        Ok(())
    }

    /// Write `result/<title>/<index>.md` and return its path.
    pub fn export_chapter(&self, novel_title: &str, index: usize, content: &str) -> Result<PathBuf> {
        let dir = self.results_dir().join(sanitize_title(novel_title));
        fs::create_dir_all(&dir)?;

        let path = dir.join(format!("{}.md", index));
        fs::write(&path, content)?;
        tracing::info!(path = %path.display(), "exported chapter");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dirs_makes_workspace_ready() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());

        let err = ws.require_ready().unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));

        ws.ensure_dirs().unwrap();
        assert!(ws.downloads_dir().is_dir());
        assert!(ws.logs_dir().is_dir());
        ws.require_ready().unwrap();

        // idempotent
        ws.ensure_dirs().unwrap();
    }

    #[test]
    fn test_log_read_and_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());
        assert_eq!(ws.read_log().unwrap(), LOG_PLACEHOLDER);

        ws.ensure_dirs().unwrap();
        fs::write(ws.log_path(), "line one\n").unwrap();
        assert_eq!(ws.read_log().unwrap(), "line one\n");

        ws.clear_log().unwrap();
        assert_eq!(ws.read_log().unwrap(), "");
    }

    #[test]
    fn test_export_chapter() {
        let tmp = tempfile::tempdir().unwrap();
        let ws = Workspace::new(tmp.path());

        let path = ws.export_chapter("雪中/悍刀行", 3, "【剧情概括】...").unwrap();
        assert_eq!(path, tmp.path().join("result").join("雪中_悍刀行").join("3.md"));
        assert_eq!(fs::read_to_string(path).unwrap(), "【剧情概括】...");
    }
}
