//! Directory-per-novel storage under `<workspace>/downloads`.
//!
//! ```text
//! downloads/
//!   <sanitized title>/
//!     info.json
//!     01.txt
//!     02.txt
//! ```

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::app::{Result, ScoutError};
use crate::domain::{chapter_file_name, ChapterContent, MetadataPatch, NovelMetadata};
use crate::store::{FileNode, Store};

pub const METADATA_FILE: &str = "info.json";
const MAX_TITLE_CHARS: usize = 80;

/// Directory name for a novel title.
pub fn sanitize_title(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let capped: String = replaced.trim().chars().take(MAX_TITLE_CHARS).collect();
    let name = capped.trim_end().to_string();

    if name.is_empty() || name.chars().all(|c| c == '.') {
        "untitled".to_string()
    } else {
        name
    }
}

pub struct FsStore {
    root: PathBuf,
    // info.json is read-merge-write; one writer at a time
    metadata_lock: Mutex<()>,
}

impl FsStore {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: downloads_dir.into(),
            metadata_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a novel directory, rejecting names that would escape the root.
    pub fn novel_dir(&self, novel: &str) -> Result<PathBuf> {
        let mut components = Path::new(novel).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(novel)),
            _ => Err(ScoutError::InvalidPath(format!("not a novel name: {:?}", novel))),
        }
    }

    fn existing_novel_dir(&self, novel: &str) -> Result<PathBuf> {
        let dir = self.novel_dir(novel)?;
        if !dir.is_dir() {
            return Err(ScoutError::NotFound(format!("novel directory {}", dir.display())));
        }
        Ok(dir)
    }

    fn merge_fields(&self, dir: &Path, fields: Map<String, Value>, create: bool) -> Result<()> {
        let _guard = self
            .metadata_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let path = dir.join(METADATA_FILE);
        let mut current = if path.exists() {
            match serde_json::from_str::<Value>(&std::fs::read_to_string(&path)?)? {
                Value::Object(map) => map,
                other => {
                    tracing::warn!(path = %path.display(), kind = ?other, "metadata is not an object, replacing");
                    Map::new()
                }
            }
        } else if create {
            Map::new()
        } else {
            return Err(ScoutError::NotFound(format!("{}", path.display())));
        };

        for (key, value) in fields {
            current.insert(key, value);
        }

        let data = serde_json::to_vec_pretty(&Value::Object(current))?;
        write_atomic(&path, &data)
    }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ScoutError::InvalidPath(format!("no parent: {}", path.display())))?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// `01.txt` sorts before `10.txt` and `100.txt`.
fn chapter_sort_key(name: &str) -> (usize, String) {
    let ordinal = name
        .strip_suffix(".txt")
        .and_then(|stem| stem.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    (ordinal, name.to_string())
}

fn read_tree(base: &Path, relative: &Path) -> Result<Vec<FileNode>> {
    let mut nodes = Vec::new();

    for entry in std::fs::read_dir(base.join(relative))? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        let is_dir = path.is_dir();

        if !is_dir {
            let keep = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("json")
            );
            if !keep {
                continue;
            }
        }

        let rel = relative.join(&name);
        let children = if is_dir {
            read_tree(base, &rel)?
        } else {
            Vec::new()
        };

        nodes.push(FileNode {
            name,
            path: rel.to_string_lossy().to_string(),
            is_dir,
            children,
        });
    }

    nodes.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
    Ok(nodes)
}

impl Store for FsStore {
    fn save_catalog(&self, metadata: &NovelMetadata) -> Result<String> {
        let novel = sanitize_title(&metadata.title);
        let dir = self.novel_dir(&novel)?;
        std::fs::create_dir_all(&dir)?;

        self.merge_fields(&dir, metadata.catalog_patch().into_fields(), true)?;
        tracing::debug!(novel, "catalog metadata saved");
        Ok(novel)
    }

    fn read_metadata(&self, novel: &str) -> Result<NovelMetadata> {
        let path = self.existing_novel_dir(novel)?.join(METADATA_FILE);
        if !path.exists() {
            return Err(ScoutError::NotFound(format!("{}", path.display())));
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    fn merge_metadata(&self, novel: &str, patch: MetadataPatch) -> Result<()> {
        let dir = self.existing_novel_dir(novel)?;
        self.merge_fields(&dir, patch.into_fields(), false)
    }

    fn delete_novel(&self, novel: &str) -> Result<()> {
        let dir = self.existing_novel_dir(novel)?;
        std::fs::remove_dir_all(&dir)?;
        tracing::info!(novel, "deleted novel");
        Ok(())
    }

    fn chapter_exists(&self, novel: &str, index: usize) -> bool {
        self.novel_dir(novel)
            .map(|dir| dir.join(chapter_file_name(index)).is_file())
            .unwrap_or(false)
    }

    fn write_chapter(&self, novel: &str, content: &ChapterContent) -> Result<PathBuf> {
        let dir = self.novel_dir(novel)?;
        std::fs::create_dir_all(&dir)?;

        let path = dir.join(content.chapter.file_name());
        write_atomic(&path, content.render().as_bytes())?;
        Ok(path)
    }

    fn list_chapters(&self, novel: &str) -> Result<Vec<String>> {
        let dir = self.existing_novel_dir(novel)?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".txt") && entry.path().is_file() {
                names.push(name);
            }
        }
        names.sort_by_key(|n| chapter_sort_key(n));
        Ok(names)
    }

    fn delete_chapter(&self, novel: &str, file_name: &str) -> Result<()> {
        let dir = self.existing_novel_dir(novel)?;
        let mut components = Path::new(file_name).components();
        if !matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        ) {
            return Err(ScoutError::InvalidPath(format!(
                "not a chapter file name: {:?}",
                file_name
            )));
        }

        let path = dir.join(file_name);
        if !path.exists() {
            return Err(ScoutError::NotFound(format!(
                "chapter file {} does not exist",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(ScoutError::InvalidPath(format!("{} is not a file", path.display())));
        }

        // word_count in info.json is left as is
        std::fs::remove_file(&path)?;
        tracing::info!(novel, file_name, "deleted chapter");
        Ok(())
    }

    fn file_tree(&self) -> Result<Vec<FileNode>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        read_tree(&self.root, Path::new(""))
    }

    fn read_file(&self, relative: &str) -> Result<String> {
        let rel = Path::new(relative);
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ScoutError::InvalidPath(format!(
                "{:?} is outside the downloads directory",
                relative
            )));
        }

        let path = self.root.join(rel);
        if !path.is_file() {
            return Err(ScoutError::NotFound(format!("{}", path.display())));
        }
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisResult, ChapterRef};

    fn store() -> (tempfile::TempDir, FsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("downloads"));
        std::fs::create_dir_all(store.root()).unwrap();
        (dir, store)
    }

    fn metadata(title: &str) -> NovelMetadata {
        let mut meta = NovelMetadata::new(title, "https://example.com/book/1");
        meta.tags = vec!["玄幻".into()];
        meta.word_count = "10万".into();
        meta.description = "简介".into();
        meta
    }

    fn analysis(genre: &str) -> AnalysisResult {
        AnalysisResult {
            genre: genre.into(),
            style: "轻松".into(),
            goldfinger: "系统".into(),
            opening: "穿越".into(),
            highlights: "节奏快".into(),
        }
    }

    fn chapter(index: usize) -> ChapterContent {
        ChapterContent {
            chapter: ChapterRef::new(index, format!("第{}章", index), "https://example.com/c"),
            body: "正文".into(),
        }
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("a/b\\c:d*e?f\"g<h>i|j"), "a_b_c_d_e_f_g_h_i_j");
        assert_eq!(sanitize_title("  斗破苍穹 \n"), "斗破苍穹");
        assert_eq!(sanitize_title("tab\there"), "tab_here");
        assert_eq!(sanitize_title("   "), "untitled");
        assert_eq!(sanitize_title(".."), "untitled");
        assert_eq!(sanitize_title(&"长".repeat(100)).chars().count(), 80);

        let once = sanitize_title(" x/y ");
        assert_eq!(sanitize_title(&once), once);
    }

    #[test]
    fn test_save_catalog_creates_directory_and_metadata() {
        let (_tmp, store) = store();
        let novel = store.save_catalog(&metadata("凡人/修仙")).unwrap();
        assert_eq!(novel, "凡人_修仙");

        let read = store.read_metadata(&novel).unwrap();
        assert_eq!(read.title, "凡人/修仙");
        assert_eq!(read.tags, vec!["玄幻"]);
        assert!(read.ai_analysis.is_none());
    }

    #[test]
    fn test_catalog_refresh_keeps_analysis_and_unknown_fields() {
        let (_tmp, store) = store();
        let novel = store.save_catalog(&metadata("书")).unwrap();
        store
            .merge_metadata(&novel, MetadataPatch::analysis(analysis("玄幻")))
            .unwrap();

        // a field written by some other tool
        let path = store.root().join(&novel).join(METADATA_FILE);
        let mut raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        raw["rating"] = Value::from(5);
        std::fs::write(&path, raw.to_string()).unwrap();

        let mut refreshed = metadata("书");
        refreshed.description = "新简介".into();
        store.save_catalog(&refreshed).unwrap();

        let read = store.read_metadata(&novel).unwrap();
        assert_eq!(read.description, "新简介");
        assert_eq!(read.ai_analysis, Some(analysis("玄幻")));

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["rating"], 5);
    }

    #[test]
    fn test_disjoint_merges_commute() {
        let (_tmp, store) = store();
        let a = store.save_catalog(&metadata("甲")).unwrap();
        let b = store.save_catalog(&metadata("乙")).unwrap();

        let tags = MetadataPatch {
            tags: Some(vec!["新标签".into()]),
            ..Default::default()
        };

        store.merge_metadata(&a, MetadataPatch::analysis(analysis("x"))).unwrap();
        store.merge_metadata(&a, tags.clone()).unwrap();

        store.merge_metadata(&b, tags).unwrap();
        store.merge_metadata(&b, MetadataPatch::analysis(analysis("x"))).unwrap();

        let mut ma = store.read_metadata(&a).unwrap();
        let mut mb = store.read_metadata(&b).unwrap();
        ma.title.clear();
        mb.title.clear();
        assert_eq!(ma, mb);
    }

    #[test]
    fn test_merge_into_missing_novel_is_not_found() {
        let (_tmp, store) = store();
        let err = store
            .merge_metadata("nope", MetadataPatch::analysis(analysis("x")))
            .unwrap_err();
        assert!(matches!(err, ScoutError::NotFound(_)));
    }

    #[test]
    fn test_chapters_write_list_and_exist() {
        let (_tmp, store) = store();
        let novel = store.save_catalog(&metadata("书")).unwrap();

        for i in [10, 2, 1] {
            store.write_chapter(&novel, &chapter(i)).unwrap();
        }
        assert!(store.chapter_exists(&novel, 2));
        assert!(!store.chapter_exists(&novel, 3));
        assert_eq!(
            store.list_chapters(&novel).unwrap(),
            vec!["01.txt", "02.txt", "10.txt"]
        );

        let text = store.read_file(&format!("{}/01.txt", novel)).unwrap();
        assert!(text.starts_with("标题: 第1章\n链接: https://example.com/c\n"));
        assert!(text.ends_with("\n\n正文"));
    }

    #[test]
    fn test_delete_missing_chapter_leaves_directory_unchanged() {
        let (_tmp, store) = store();
        let novel = store.save_catalog(&metadata("书")).unwrap();
        store.write_chapter(&novel, &chapter(1)).unwrap();

        let err = store.delete_chapter(&novel, "02.txt").unwrap_err();
        assert!(matches!(err, ScoutError::NotFound(_)));
        assert!(err.to_string().contains("02.txt"));
        assert_eq!(store.list_chapters(&novel).unwrap(), vec!["01.txt"]);

        store.delete_chapter(&novel, "01.txt").unwrap();
        assert!(store.list_chapters(&novel).unwrap().is_empty());
        // metadata untouched
        assert_eq!(store.read_metadata(&novel).unwrap().word_count, "10万");
    }

    #[test]
    fn test_delete_novel() {
        let (_tmp, store) = store();
        let novel = store.save_catalog(&metadata("书")).unwrap();
        store.delete_novel(&novel).unwrap();
        assert!(!store.root().join(&novel).exists());
        assert!(matches!(store.delete_novel(&novel), Err(ScoutError::NotFound(_))));
    }

    #[test]
    fn test_paths_cannot_escape_downloads() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.read_file("../secret.txt"),
            Err(ScoutError::InvalidPath(_))
        ));
        assert!(matches!(
            store.delete_novel(".."),
            Err(ScoutError::InvalidPath(_))
        ));
        assert!(matches!(
            store.read_file("/etc/passwd"),
            Err(ScoutError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_file_tree_orders_and_filters() {
        let (_tmp, store) = store();
        let novel = store.save_catalog(&metadata("书")).unwrap();
        store.write_chapter(&novel, &chapter(1)).unwrap();
        std::fs::write(store.root().join(&novel).join("cover.jpg"), b"x").unwrap();
        std::fs::write(store.root().join("notes.txt"), b"x").unwrap();

        let tree = store.file_tree().unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree[0].is_dir);
        assert_eq!(tree[0].name, "书");
        assert_eq!(tree[1].name, "notes.txt");

        let children: Vec<_> = tree[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(children, vec!["01.txt", "info.json"]);
        assert_eq!(tree[0].children[0].path, "书/01.txt");
    }

    #[test]
    fn test_file_tree_without_downloads_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FsStore::new(tmp.path().join("missing"));
        assert!(store.file_tree().unwrap().is_empty());
    }
}
