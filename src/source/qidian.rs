//! qidian.com
//!
//! The desktop site sits behind a WAF, so book, chapter and rank pages go
//! through the browser route. The chapter catalog is read from the mobile
//! site, and the mobile book page over plain HTTP backs up metadata when
//! the browser fails.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::app::{Result, ScoutError};
use crate::domain::chapter::number_chapters;
use crate::domain::{ChapterContent, ChapterRef, NovelMetadata, Platform, RankEntry};
use crate::fetcher::{Fetcher, Route};
use crate::source::html;
use crate::source::SourceAdapter;

static RE_BOOK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:book|info)/([0-9]+)").expect("valid book id pattern"));

const MOBILE_BASE: &str = "https://m.qidian.com";
const MOBILE_HOST: &str = "m.qidian.com";
const DESKTOP_HOST: &str = "www.qidian.com";

const UNKNOWN_WORD_COUNT: &str = "未知";

const CATALOG_SELECTORS: &str = ".y-list__item a, a[class*='chapterItem']";
const BODY_SELECTORS: &str =
    "main.content, .read-content, .main-text-wrap, .j_readContent, #reader-content";
const RANK_SELECTORS: &str = "#rank-view-list .book-mid-info h2 a, \
     .book-img-text .book-mid-info h2 a, \
     .rank-list a.book-layout";

pub struct QidianAdapter {
    fetcher: Arc<dyn Fetcher>,
    mobile_base: String,
}

impl QidianAdapter {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            mobile_base: MOBILE_BASE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_mobile_base(mut self, base: &str) -> Self {
        self.mobile_base = base.to_string();
        self
    }

    fn mobile_url(&self, path: &str) -> String {
        format!("{}{}", self.mobile_base.trim_end_matches('/'), path)
    }

    async fn fetch_mobile_metadata(&self, url: &str) -> Result<NovelMetadata> {
        let mobile_url = self.mobile_url(&format!("/book/{}", book_id(url)?));
        let page = self.fetcher.fetch(&mobile_url, Route::Mobile).await?;
        parse_mobile_metadata(&page, &mobile_url)
    }
}

#[async_trait]
impl SourceAdapter for QidianAdapter {
    fn platform(&self) -> Platform {
        Platform::Qidian
    }

    async fn fetch_catalog_metadata(&self, url: &str) -> Result<NovelMetadata> {
        let desktop = self
            .fetcher
            .fetch(url, Route::Browser)
            .await
            .and_then(|page| parse_metadata(&page, url));

        match desktop {
            Ok(metadata) => Ok(metadata),
            Err(e) => {
                tracing::warn!(url, error = %e, "desktop book page failed, trying mobile site");
                self.fetch_mobile_metadata(url).await
            }
        }
    }

    async fn fetch_chapter_list(&self, url: &str) -> Result<Vec<ChapterRef>> {
        let catalog_url = self.mobile_url(&format!("/book/{}/catalog", book_id(url)?));
        tracing::debug!(url, catalog_url, "fetching mobile catalog");

        let page = self.fetcher.fetch(&catalog_url, Route::Browser).await?;
        parse_chapter_list(&page, &catalog_url)
    }

    async fn fetch_chapter_body(&self, chapter: &ChapterRef) -> Result<ChapterContent> {
        let target = desktop_url(&chapter.source_url);
        let page = self.fetcher.fetch(&target, Route::Browser).await?;
        let body = parse_chapter_body(&page, &target)?;
        Ok(ChapterContent {
            chapter: chapter.clone(),
            body,
        })
    }

    async fn fetch_rank_list(&self, url: &str, max_novels: usize) -> Result<Vec<RankEntry>> {
        let page = self.fetcher.fetch(url, Route::Browser).await?;
        parse_rank_list(&page, url, max_novels)
    }
}

/// Numeric book id from `/book/<id>` or `/info/<id>`.
pub fn book_id(url: &str) -> Result<String> {
    RE_BOOK_ID
        .captures(url)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ScoutError::source_format(url, "no book id in URL"))
}

/// Chapter pages are read on the desktop host.
pub fn desktop_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.host_str() == Some(MOBILE_HOST) => {
            if parsed.set_host(Some(DESKTOP_HOST)).is_ok() {
                parsed.to_string()
            } else {
                url.to_string()
            }
        }
        _ => url.to_string(),
    }
}

fn is_verification_title(title: &str) -> bool {
    title.contains("Just a moment") || title.contains("Security checking")
}

pub fn parse_metadata(page: &str, url: &str) -> Result<NovelMetadata> {
    let document = Html::parse_document(page);

    let title = html::first_text(&document, "h1, #bookName")
        .or_else(|| {
            // "<name>_<author>_..." in the document title
            html::first_text(&document, "title")
                .and_then(|t| t.split('_').next().map(|s| s.trim().to_string()))
                .filter(|t| !t.is_empty())
        })
        .ok_or_else(|| ScoutError::source_format(url, "no book title"))?;

    if is_verification_title(&title) {
        return Err(ScoutError::source_format(url, "still on the verification page"));
    }

    let description = html::first_text(&document, "#book-intro-detail")
        .or_else(|| html::first_text(&document, ".book-intro, .intro"))
        .or_else(|| html::first_attr(&document, "meta[name='description']", "content"))
        .unwrap_or_default();

    let mut tags = html::all_texts(&document, ".book-attribute a");
    tags.extend(html::all_texts(&document, ".all-label a"));
    tags.sort();
    tags.dedup();

    let word_count = html::first_text(&document, ".count em")
        .unwrap_or_else(|| UNKNOWN_WORD_COUNT.to_string());

    let mut metadata = NovelMetadata::new(title, url);
    metadata.description = description;
    metadata.tags = tags;
    metadata.word_count = word_count;
    Ok(metadata)
}

pub fn parse_mobile_metadata(page: &str, mobile_url: &str) -> Result<NovelMetadata> {
    let document = Html::parse_document(page);

    let title = html::first_text(&document, "h1, .book-title, .detail h2")
        .ok_or_else(|| ScoutError::source_format(mobile_url, "no book title on mobile page"))?;

    if is_verification_title(&title) {
        return Err(ScoutError::source_format(mobile_url, "still on the verification page"));
    }

    let description = html::first_text(&document, ".book-intro, .intro")
        .or_else(|| html::first_attr(&document, "meta[name='description']", "content"))
        .unwrap_or_default();

    let mut metadata = NovelMetadata::new(title, mobile_url);
    metadata.description = description;
    metadata.word_count = UNKNOWN_WORD_COUNT.to_string();
    Ok(metadata)
}

pub fn parse_chapter_list(page: &str, catalog_url: &str) -> Result<Vec<ChapterRef>> {
    let base = Url::parse(catalog_url)?;
    let document = Html::parse_document(page);

    let entries: Vec<(String, String)> = html::anchors(&document, CATALOG_SELECTORS)
        .into_iter()
        .filter(|(title, _)| !title.is_empty())
        .filter_map(|(title, href)| {
            let full = html::resolve(&base, &href)?.to_string();
            (full.contains("/chapter/") || full.contains("/read/")).then_some((title, full))
        })
        .collect();

    if entries.is_empty() {
        return Err(ScoutError::source_format(catalog_url, "no chapters in catalog"));
    }

    Ok(number_chapters(entries))
}

pub fn parse_chapter_body(page: &str, url: &str) -> Result<String> {
    let document = Html::parse_document(page);
    html::paragraphs(&document, BODY_SELECTORS)
        .ok_or_else(|| ScoutError::source_format(url, "chapter content not found"))
}

/// Rank order is preserved; duplicates keep their first position.
pub fn parse_rank_list(page: &str, url: &str, max_novels: usize) -> Result<Vec<RankEntry>> {
    let base = Url::parse(url)?;
    let document = Html::parse_document(page);
    let mut seen = HashSet::new();

    let entries: Vec<RankEntry> = html::anchors(&document, RANK_SELECTORS)
        .into_iter()
        .filter_map(|(title, href)| {
            let full = html::resolve(&base, &href)?.to_string();
            (full.contains("/book/") && seen.insert(full.clone())).then(|| RankEntry {
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
