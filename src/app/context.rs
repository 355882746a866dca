use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

use crate::analysis::{self, AnalysisEngine, AnalysisKind, AnalysisRequest};
use crate::app::error::Result;
use crate::config::Config;
use crate::domain::{AnalysisEvent, AnalysisResult, ProgressEvent};
use crate::download::{DownloadJob, Downloader, JobOutcome, ProgressSink};
use crate::evasion::{ChallengeDetector, ChromeRenderer, EvasionConfig, PageRenderer};
use crate::fetcher::{EvasiveFetcher, Fetcher, HttpFetcher};
use crate::source::{adapter_for, SourceAdapter};
use crate::store::{FsStore, Workspace};

pub struct AppContext {
    pub config: Config,
    pub workspace: Workspace,
    pub store: Arc<FsStore>,
    pub engine: Arc<AnalysisEngine>,
}

impl AppContext {
    pub fn new(config: Config, workspace_override: Option<&Path>) -> Result<Self> {
        let workspace = Workspace::new(config.workspace_root(workspace_override));
        let store = Arc::new(workspace.store());
        let engine = Arc::new(AnalysisEngine::new()?);

        Ok(Self {
            config,
            workspace,
            store,
            engine,
        })
    }

    /// A download job for this workspace, visible if the config asks for it.
    pub fn prepare(&self, job: DownloadJob) -> DownloadJob {
        let visible = job.evasion_visible || self.config.evasion.visible;
        job.in_workspace(self.workspace.root()).visible(visible)
    }

    /// HTTP fetcher with the browser fallback wired in as configured.
    pub fn fetcher_for(&self, job: &DownloadJob) -> Result<Arc<dyn Fetcher>> {
        let mut evasion = self.config.evasion.clone();
        let detector = ChallengeDetector::new(&evasion.challenge_markers);
        let http = HttpFetcher::new(&self.config.download, detector)?;

        let renderer: Option<Arc<dyn PageRenderer>> = if evasion.enabled || job.evasion_visible {
            if job.evasion_visible {
                evasion.visible = true;
                evasion.timeout_secs = evasion.timeout_secs.max(EvasionConfig::manual().timeout_secs);
            }
            Some(Arc::new(ChromeRenderer::new(evasion)))
        } else {
            None
        };

        Ok(Arc::new(
            EvasiveFetcher::new(http, renderer).browser_always(job.evasion_visible),
        ))
    }

    pub fn adapter_for(&self, job: &DownloadJob) -> Result<Arc<dyn SourceAdapter>> {
        Ok(adapter_for(job.platform, self.fetcher_for(job)?))
    }

    /// Validate and spawn a download job. Progress arrives on the receiver.
    pub fn start_download(
        &self,
        job: DownloadJob,
    ) -> Result<(JoinHandle<Result<JobOutcome>>, UnboundedReceiver<ProgressEvent>)> {
        job.validate()?;

        let adapter = self.adapter_for(&job)?;
        let store = Arc::new(job.workspace().store());
        let downloader = Arc::new(Downloader::new(store, self.config.download.clone()));

        let (sink, rx) = ProgressSink::channel();
        let handle = downloader.start(job, adapter, sink)?;
        Ok((handle, rx))
    }

    /// Summarize the opening chapters of `novel` and merge the result into its metadata.
    pub fn start_analysis(
        &self,
        novel: &str,
    ) -> Result<(JoinHandle<Result<AnalysisResult>>, UnboundedReceiver<AnalysisEvent>)> {
        self.workspace.require_ready()?;
        AnalysisRequest::from_config(&self.config.ai, AnalysisKind::Auto, String::new())
            .validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        let ai = self.config.ai.clone();
        let novel = novel.to_string();

        let handle = tokio::spawn(async move {
            analysis::analyze_novel(&engine, store.as_ref(), &novel, &ai, &tx).await
        });
        Ok((handle, rx))
    }

    /// Outline one chapter file; the Markdown answer is the task result.
    pub fn start_chapter_analysis(
        &self,
        novel: &str,
        file_name: &str,
    ) -> Result<(JoinHandle<Result<String>>, UnboundedReceiver<AnalysisEvent>)> {
        self.workspace.require_ready()?;
        AnalysisRequest::from_config(&self.config.ai, AnalysisKind::Chapter, String::new())
            .validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(&self.engine);
        let store = Arc::clone(&self.store);
        let ai = self.config.ai.clone();
        let novel = novel.to_string();
        let file_name = file_name.to_string();

        let handle = tokio::spawn(async move {
            analysis::analyze_chapter(&engine, store.as_ref(), &novel, &file_name, &ai, &tx).await
        });
        Ok((handle, rx))
    }

    pub async fn fetch_models(&self) -> Result<Vec<String>> {
        analysis::fetch_models(
            self.engine.client(),
            &self.config.ai.api_base,
            &self.config.ai.api_key,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ScoutError;
    use crate::domain::Platform;

    fn context(root: &Path) -> AppContext {
        let mut config = Config::default();
        config.evasion.enabled = false;
        AppContext::new(config, Some(root)).unwrap()
    }

    #[test]
    fn test_workspace_override() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        assert_eq!(ctx.workspace.root(), tmp.path());
        assert_eq!(ctx.store.root(), tmp.path().join("downloads"));
    }

    #[test]
    fn test_prepare_binds_job_to_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let job = ctx.prepare(DownloadJob::single(Platform::Fanqie, "https://fanqienovel.com/page/1", 3));
        assert_eq!(job.workspace_root, tmp.path());
        assert!(!job.evasion_visible);
    }

    #[tokio::test]
    async fn test_start_download_requires_initialized_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        let job = ctx.prepare(DownloadJob::single(Platform::Qidian, "https://www.qidian.com/book/1/", 1));

        let err = ctx.start_download(job).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_start_analysis_requires_api_key() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = context(tmp.path());
        ctx.workspace.ensure_dirs().unwrap();

        let err = ctx.start_analysis("whatever").unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));
    }
}
