pub mod fs;
pub mod workspace;

use std::path::PathBuf;

use serde::Serialize;

use crate::app::Result;
use crate::domain::{ChapterContent, MetadataPatch, NovelMetadata};

pub use fs::{sanitize_title, FsStore};
pub use workspace::Workspace;

/// One entry of the downloads listing. `path` is relative to `downloads/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNode {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub children: Vec<FileNode>,
}

/// Novels are addressed by their directory name, the sanitized title.
pub trait Store: Send + Sync {
    // Novel operations
    fn save_catalog(&self, metadata: &NovelMetadata) -> Result<String>;
    fn read_metadata(&self, novel: &str) -> Result<NovelMetadata>;
    fn merge_metadata(&self, novel: &str, patch: MetadataPatch) -> Result<()>;
    fn delete_novel(&self, novel: &str) -> Result<()>;

    // Chapter operations
    fn chapter_exists(&self, novel: &str, index: usize) -> bool;
    fn write_chapter(&self, novel: &str, content: &ChapterContent) -> Result<PathBuf>;
    fn list_chapters(&self, novel: &str) -> Result<Vec<String>>;
    fn delete_chapter(&self, novel: &str, file_name: &str) -> Result<()>;

    // Browsing
    fn file_tree(&self) -> Result<Vec<FileNode>>;
    fn read_file(&self, relative: &str) -> Result<String>;
}
