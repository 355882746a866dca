//! Analyses driven from the local store: whole-novel summaries merged into
//! `info.json`, and per-chapter outlines.

use tokio::sync::mpsc::UnboundedSender;

use crate::analysis::{extract_analysis, AnalysisEngine, AnalysisKind, AnalysisRequest};
use crate::app::{Result, ScoutError};
use crate::config::AiConfig;
use crate::domain::{AnalysisEvent, AnalysisPhase, AnalysisResult, MetadataPatch};
use crate::store::Store;

/// The first `chapters` chapter files of `novel`, in file order.
pub fn opening_excerpt(store: &dyn Store, novel: &str, chapters: usize) -> Result<String> {
    let files = store.list_chapters(novel)?;
    if files.is_empty() || chapters == 0 {
        return Err(ScoutError::NotFound(format!(
            "no chapters of {} to analyze",
            novel
        )));
    }

    let parts = files
        .iter()
        .take(chapters)
        .map(|file| store.read_file(&format!("{}/{}", novel, file)))
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join("\n\n"))
}

/// Summarize the opening of `novel` and store the result as `aiAnalysis`.
///
/// Metadata is only written when a complete result is extracted. An
/// extraction failure is reported on `tx` and leaves `info.json` as it was.
pub async fn analyze_novel(
    engine: &AnalysisEngine,
    store: &dyn Store,
    novel: &str,
    config: &AiConfig,
    tx: &UnboundedSender<AnalysisEvent>,
) -> Result<AnalysisResult> {
    let excerpt = opening_excerpt(store, novel, config.auto_chapters)?;
    let request = AnalysisRequest::from_config(config, AnalysisKind::Auto, excerpt);

    let text = engine.run(&request, tx).await?;

    match extract_analysis(&text) {
        Ok(result) => {
            store.merge_metadata(novel, MetadataPatch::analysis(result.clone()))?;
            tracing::info!(novel, genre = %result.genre, "analysis saved");
            Ok(result)
        }
        Err(e) => {
            tracing::warn!(novel, error = %e, "analysis not saved");
            let _ = tx.send(AnalysisEvent::status(
                AnalysisPhase::Error,
                format!("Error: {}", e),
            ));
            Err(e)
        }
    }
}

/// Outline a single chapter file. The Markdown answer is returned as is.
pub async fn analyze_chapter(
    engine: &AnalysisEngine,
    store: &dyn Store,
    novel: &str,
    file_name: &str,
    config: &AiConfig,
    tx: &UnboundedSender<AnalysisEvent>,
) -> Result<String> {
    let content = store.read_file(&format!("{}/{}", novel, file_name))?;
    let request = AnalysisRequest::from_config(config, AnalysisKind::Chapter, content);
    engine.run(&request, tx).await
}
