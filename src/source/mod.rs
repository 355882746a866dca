//! Platform adapters.
//!
//! Each supported site gets one [`SourceAdapter`] that turns its pages into
//! normalized records. [`adapter_for`] is the only place a [`Platform`] is
//! mapped to an implementation.

pub mod fanqie;
pub mod html;
pub mod qidian;

pub use fanqie::FanqieAdapter;
pub use qidian::QidianAdapter;

use std::sync::Arc;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{ChapterContent, ChapterRef, NovelMetadata, Platform, RankEntry};
use crate::fetcher::Fetcher;

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Book page metadata. `ai_analysis` is always `None`.
    async fn fetch_catalog_metadata(&self, url: &str) -> Result<NovelMetadata>;

    /// Chapters in published order, numbered from 1.
    async fn fetch_chapter_list(&self, url: &str) -> Result<Vec<ChapterRef>>;

    async fn fetch_chapter_body(&self, chapter: &ChapterRef) -> Result<ChapterContent>;

    /// Novels on a ranking page in rank order, at most `max_novels`.
    async fn fetch_rank_list(&self, url: &str, max_novels: usize) -> Result<Vec<RankEntry>>;
}

pub fn adapter_for(platform: Platform, fetcher: Arc<dyn Fetcher>) -> Arc<dyn SourceAdapter> {
    match platform {
        Platform::Fanqie => Arc::new(FanqieAdapter::new(fetcher)),
        Platform::Qidian => Arc::new(QidianAdapter::new(fetcher)),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use testing::StaticFetcher;

    #[test]
    fn test_factory_dispatches_by_platform() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(StaticFetcher::default());
        for platform in Platform::ALL {
            assert_eq!(adapter_for(platform, fetcher.clone()).platform(), platform);
        }
    }
}
