use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    /// 1-based position in the platform's published order.
    pub index: usize,
    pub title: String,
    pub source_url: String,
}

impl ChapterRef {
    pub fn new(index: usize, title: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            index,
            title: title.into(),
            source_url: source_url.into(),
        }
    }

    pub fn file_name(&self) -> String {
        chapter_file_name(self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterContent {
    pub chapter: ChapterRef,
    pub body: String,
}

impl ChapterContent {
    /// File contents as stored on disk: a short header, then the body.
    pub fn render(&self) -> String {
        format!(
            "标题: {}\n链接: {}\n{}\n\n{}",
            self.chapter.title,
            self.chapter.source_url,
            "=".repeat(50),
            self.body
        )
    }
}

/// `1` -> `01.txt`, `123` -> `123.txt`.
pub fn chapter_file_name(index: usize) -> String {
    format!("{:02}.txt", index)
}

/// Orders refs by ordinal. A repeated ordinal keeps the later occurrence.
pub fn normalize_chapter_list(refs: Vec<ChapterRef>) -> Vec<ChapterRef> {
    let mut by_index = BTreeMap::new();
    for chapter in refs {
        by_index.insert(chapter.index, chapter);
    }
    by_index.into_values().collect()
}

/// Numbers `(title, url)` pairs in list order starting at 1.
pub fn number_chapters(entries: Vec<(String, String)>) -> Vec<ChapterRef> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, (title, url))| ChapterRef::new(i + 1, title, url))
        .collect()
}
