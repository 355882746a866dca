//! fanqienovel.com
//!
//! Served as plain HTML. Book pages live at `/page/<id>`, chapters at
//! `/reader/<id>`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;
use url::Url;

use crate::app::{Result, ScoutError};
use crate::domain::chapter::number_chapters;
use crate::domain::{ChapterContent, ChapterRef, NovelMetadata, Platform, RankEntry};
use crate::fetcher::{Fetcher, Route};
use crate::source::html;
use crate::source::SourceAdapter;

const TITLE_SELECTORS: &str = ".info-name h1, .page-header-info h1, h1";
const DESCRIPTION_SELECTORS: &str = ".page-abstract-content, .info-abstract, .book-abstract";
const TAG_SELECTORS: &str = ".info-label span, .info-label a";
const WORD_COUNT_SELECTORS: &str = ".info-count-word";
const CHAPTER_SELECTORS: &str = ".chapter-item-title";
const BODY_SELECTORS: &str = ".muye-reader-content, .muye-reader-box, #reader-content, article";
const RANK_SELECTORS: &str =
    ".rank-book-item .title a, .rank-book-item a[href*='/page/'], a.rank-book-title";

pub struct FanqieAdapter {
    fetcher: Arc<dyn Fetcher>,
}

impl FanqieAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl SourceAdapter for FanqieAdapter {
    fn platform(&self) -> Platform {
        Platform::Fanqie
    }

    async fn fetch_catalog_metadata(&self, url: &str) -> Result<NovelMetadata> {
        let page = self.fetcher.fetch(url, Route::Direct).await?;
        parse_metadata(&page, url)
    }

    async fn fetch_chapter_list(&self, url: &str) -> Result<Vec<ChapterRef>> {
        let page = self.fetcher.fetch(url, Route::Direct).await?;
        parse_chapter_list(&page, url)
    }

    async fn fetch_chapter_body(&self, chapter: &ChapterRef) -> Result<ChapterContent> {
        let page = self.fetcher.fetch(&chapter.source_url, Route::Direct).await?;
        let body = parse_chapter_body(&page, &chapter.source_url)?;
        Ok(ChapterContent {
            chapter: chapter.clone(),
            body,
        })
    }

    async fn fetch_rank_list(&self, url: &str, max_novels: usize) -> Result<Vec<RankEntry>> {
        let page = self.fetcher.fetch(url, Route::Direct).await?;
        parse_rank_list(&page, url, max_novels)
    }
}

pub fn parse_metadata(page: &str, url: &str) -> Result<NovelMetadata> {
    let document = Html::parse_document(page);

    let title = html::first_text(&document, TITLE_SELECTORS)
        .or_else(|| {
            html::first_text(&document, "title")
                .and_then(|t| t.split(['_', '-']).next().map(|s| s.trim().to_string()))
                .filter(|t| !t.is_empty())
        })
        .ok_or_else(|| ScoutError::source_format(url, "no book title"))?;

    let description = html::first_text(&document, DESCRIPTION_SELECTORS)
        .or_else(|| html::first_attr(&document, "meta[name='description']", "content"))
        .unwrap_or_default();

    let mut seen = HashSet::new();
    let tags = html::all_texts(&document, TAG_SELECTORS)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect();

    let word_count = html::first_text(&document, WORD_COUNT_SELECTORS)
        .map(|w| w.split_whitespace().collect::<String>())
        .unwrap_or_else(|| "未知".to_string());

    let mut metadata = NovelMetadata::new(title, url);
    metadata.description = description;
    metadata.tags = tags;
    metadata.word_count = word_count;
    Ok(metadata)
}

/// The first catalog entry is the "latest chapter" banner and is dropped.
pub fn parse_chapter_list(page: &str, url: &str) -> Result<Vec<ChapterRef>> {
    let base = Url::parse(url)?;
    let document = Html::parse_document(page);

    let entries: Vec<(String, String)> = html::anchors(&document, CHAPTER_SELECTORS)
        .into_iter()
        .skip(1)
        .filter_map(|(title, href)| {
            let full = html::resolve(&base, &href)?;
            Some((title, full.to_string()))
        })
        .collect();

    if entries.is_empty() {
        return Err(ScoutError::source_format(url, "no chapter links in catalog"));
    }

    Ok(number_chapters(entries))
}

pub fn parse_chapter_body(page: &str, url: &str) -> Result<String> {
    let document = Html::parse_document(page);
    html::paragraphs(&document, BODY_SELECTORS)
        .ok_or_else(|| ScoutError::source_format(url, "chapter body container not found"))
}

pub fn parse_rank_list(page: &str, url: &str, max_novels: usize) -> Result<Vec<RankEntry>> {
    let base = Url::parse(url)?;
    let document = Html::parse_document(page);
    let mut seen = HashSet::new();

    let entries: Vec<RankEntry> = html::anchors(&document, RANK_SELECTORS)
        .into_iter()
        .filter_map(|(title, href)| {
            let full = html::resolve(&base, &href)?.to_string();
            (full.contains("/page/") && seen.insert(full.clone())).then(|| RankEntry {
                title,
                url: full,
            })
        })
        .take(max_novels)
        .collect();

    if entries.is_empty() && max_novels > 0 {
        return Err(ScoutError::source_format(url, "no novels on rank page"));
    }
    Ok(entries)
}
