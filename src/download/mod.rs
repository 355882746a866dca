//! Download orchestration.
//!
//! A single-novel job fetches catalog metadata, the chapter list and then the
//! requested chapter bodies, skipping chapters already on disk. A rank scan
//! discovers novels on a ranking page and runs a bounded single-novel job
//! for each of them.
//!
//! ```text
//! DownloadJob → Downloader → SourceAdapter → Store
//!                   └──────→ ProgressSink → consumer
//! ```

pub mod job;
pub mod progress;
pub mod retry;

pub use job::{DownloadJob, JobTarget};
pub use progress::ProgressSink;
pub use retry::RetryPolicy;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::app::{Result, ScoutError};
use crate::config::DownloadConfig;
use crate::domain::chapter::normalize_chapter_list;
use crate::domain::ChapterRef;
use crate::source::SourceAdapter;
use crate::store::Store;

/// What a single-novel job left on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NovelOutcome {
    /// Directory name under `downloads/`
    pub novel: String,
    pub downloaded: usize,
    pub existing: usize,
    pub skipped: usize,
}

impl NovelOutcome {
    /// Chapters present after the job, new or from an earlier run.
    pub fn present(&self) -> usize {
        self.downloaded + self.existing
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankSummary {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub novels: Vec<NovelOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Novel(NovelOutcome),
    Rank(RankSummary),
}

pub struct Downloader {
    store: Arc<dyn Store>,
    config: DownloadConfig,
    retry: RetryPolicy,
}

impl Downloader {
    pub fn new(store: Arc<dyn Store>, config: DownloadConfig) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            store,
            config,
            retry,
        }
    }

    /// Validate the job, then run it in the background.
    ///
    /// Errors that prevent the job from starting are returned here; everything
    /// after that is reported through `sink` and the task's result.
    pub fn start(
        self: &Arc<Self>,
        job: DownloadJob,
        adapter: Arc<dyn SourceAdapter>,
        sink: ProgressSink,
    ) -> Result<JoinHandle<Result<JobOutcome>>> {
        job.validate()?;
        if adapter.platform() != job.platform {
            return Err(ScoutError::Configuration(format!(
                "adapter for {} cannot run a {} job",
                adapter.platform(),
                job.platform
            )));
        }

        tracing::info!(platform = %job.platform, url = job.url(), "starting download job");
        let this = Arc::clone(self);

        let handle = match job.target {
            JobTarget::Single { url, chapters } => tokio::spawn(async move {
                this.run_single(adapter.as_ref(), &url, chapters, &sink)
                    .await
                    .map(JobOutcome::Novel)
            }),
            JobTarget::Rank {
                url,
                max_novels,
                chapters_per_novel,
            } => tokio::spawn(async move {
                this.run_rank(adapter, &url, max_novels, chapters_per_novel, &sink)
                    .await
                    .map(JobOutcome::Rank)
            }),
        };
        Ok(handle)
    }

    /// One novel with a terminal event for the whole job.
    pub async fn run_single(
        &self,
        adapter: &dyn SourceAdapter,
        url: &str,
        chapters: usize,
        sink: &ProgressSink,
    ) -> Result<NovelOutcome> {
        match self.run_novel(adapter, url, chapters, sink).await {
            Ok(outcome) if chapters == 0 || outcome.present() > 0 => {
                sink.completed(finished_message(&outcome));
                Ok(outcome)
            }
            Ok(outcome) => {
                let message = format!("No chapters could be downloaded for 《{}》", outcome.novel);
                sink.error(message.clone());
                Err(ScoutError::Fetch(message))
            }
            Err(e) => {
                sink.error(format!("Download failed: {}", e));
                Err(e)
            }
        }
    }

    /// Discover novels on a ranking page and download each with bounded concurrency.
    pub async fn run_rank(
        self: &Arc<Self>,
        adapter: Arc<dyn SourceAdapter>,
        url: &str,
        max_novels: usize,
        chapters_per_novel: usize,
        sink: &ProgressSink,
    ) -> Result<RankSummary> {
        sink.running(format!("Fetching rank list: {}", url));

        let source = adapter.as_ref();
        let entries = match self
            .retry
            .run("rank list", move || source.fetch_rank_list(url, max_novels))
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                sink.error(format!("Failed to fetch rank list: {}", e));
                return Err(e);
            }
        };

        sink.running(format!(
            "Found {} novels, downloading {} chapters each",
            entries.len(),
            chapters_per_novel
        ));

        let semaphore = Arc::new(Semaphore::new(self.config.rank_concurrency.max(1)));
        let mut handles = Vec::new();

        for entry in entries.iter().cloned() {
            let this = Arc::clone(self);
            let adapter = Arc::clone(&adapter);
            let semaphore = Arc::clone(&semaphore);
            let sink = sink.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = this
                    .run_novel(adapter.as_ref(), &entry.url, chapters_per_novel, &sink)
                    .await;
                (entry, result)
            }));
        }

        let mut summary = RankSummary {
            discovered: entries.len(),
            ..Default::default()
        };

        for handle in handles {
            match handle.await {
                Ok((_, Ok(outcome))) if chapters_per_novel == 0 || outcome.present() > 0 => {
                    sink.completed(finished_message(&outcome));
                    summary.succeeded += 1;
                    summary.novels.push(outcome);
                }
                Ok((entry, Ok(outcome))) => {
                    sink.error(format!(
                        "No chapters could be downloaded for 《{}》 ({})",
                        outcome.novel, entry.url
                    ));
                    summary.failed += 1;
                    summary.novels.push(outcome);
                }
                Ok((entry, Err(e))) => {
                    sink.error(format!("Failed to download {}: {}", entry.url, e));
                    summary.failed += 1;
                }
                Err(e) => {
                    tracing::error!("Task join error: {}", e);
                    summary.failed += 1;
                }
            }
        }

        let message = format!(
            "Rank scan finished: {}/{} novels downloaded",
            summary.succeeded, summary.discovered
        );
        if summary.failed > 0 && summary.succeeded == 0 {
            sink.error(message);
        } else {
            sink.completed(message);
        }
        Ok(summary)
    }

    /// Metadata, chapter list, then chapter bodies. Emits per-step events only.
    pub async fn run_novel(
        &self,
        adapter: &dyn SourceAdapter,
        url: &str,
        chapters: usize,
        sink: &ProgressSink,
    ) -> Result<NovelOutcome> {
        sink.running(format!("Fetching metadata: {}", url));
        let metadata = self
            .retry
            .run("catalog", move || adapter.fetch_catalog_metadata(url))
            .await?;

        let novel = self.store.save_catalog(&metadata)?;
        let mut outcome = NovelOutcome {
            novel: novel.clone(),
            ..Default::default()
        };

        if chapters == 0 {
            tracing::info!(novel, "no chapters requested, metadata only");
            return Ok(outcome);
        }

        sink.running(format!("Fetching chapter list [{}]", novel));
        let list = self
            .retry
            .run("chapter list", move || adapter.fetch_chapter_list(url))
            .await?;

        let selected: Vec<ChapterRef> = normalize_chapter_list(list)
            .into_iter()
            .take(chapters)
            .collect();
        sink.running(format!(
            "Downloading {} of {} requested chapters [{}]",
            selected.len(),
            chapters,
            novel
        ));

        let mut pending = Vec::new();
        for chapter in selected {
            if self.store.chapter_exists(&novel, chapter.index) {
                sink.skipped(format!("Already downloaded [{}] - {}", novel, chapter.title));
                outcome.existing += 1;
            } else {
                pending.push(chapter);
            }
        }

        // Fetches may overlap; `buffered` yields results in chapter order so
        // files are written one at a time, in order.
        let concurrency = self.config.chapter_concurrency.max(1);
        let mut results = stream::iter(pending)
            .map(|chapter| {
                let novel = novel.as_str();
                async move {
                    sink.running(format!("Downloading [{}] - {}", novel, chapter.title));
                    let target = &chapter;
                    let result = self
                        .retry
                        .run("chapter", move || adapter.fetch_chapter_body(target))
                        .await;
                    tokio::time::sleep(self.config.chapter_delay()).await;
                    (chapter, result)
                }
            })
            .buffered(concurrency);

        while let Some((chapter, result)) = results.next().await {
            match result {
                Ok(content) => match self.store.write_chapter(&novel, &content) {
                    Ok(_) => {
                        sink.completed(format!("Saved [{}] - {}", novel, chapter.title));
                        outcome.downloaded += 1;
                    }
                    Err(e) => {
                        sink.error(format!(
                            "Failed to save [{}] - {}: {}",
                            novel, chapter.title, e
                        ));
                        outcome.skipped += 1;
                    }
                },
                Err(e) => {
                    sink.skipped(format!(
                        "Giving up on [{}] - {}: {}",
                        novel, chapter.title, e
                    ));
                    outcome.skipped += 1;
                }
            }
        }

        Ok(outcome)
    }
}

fn finished_message(outcome: &NovelOutcome) -> String {
    format!(
        "Finished 《{}》: {} new, {} already present, {} skipped",
        outcome.novel, outcome.downloaded, outcome.existing, outcome.skipped
    )
}
