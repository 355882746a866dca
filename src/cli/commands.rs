use std::io::Write;
use std::path::Path;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::analysis::{resolve_prompt, AnalysisKind};
use crate::app::{AppContext, Result, ScoutError};
use crate::domain::{AnalysisEvent, AnalysisPhase, MetadataPatch, ProgressEvent, ProgressStatus};
use crate::download::{DownloadJob, JobOutcome};
use crate::store::{FileNode, Store};

pub fn init(ctx: &AppContext) -> Result<()> {
    ctx.workspace.ensure_dirs()?;
    println!("Workspace ready: {}", ctx.workspace.root().display());
    println!("  downloads: {}", ctx.workspace.downloads_dir().display());
    println!("  logs:      {}", ctx.workspace.logs_dir().display());
    Ok(())
}

pub async fn download(ctx: &AppContext, job: DownloadJob) -> Result<()> {
    let (handle, rx) = ctx.start_download(ctx.prepare(job))?;
    print_progress(rx).await;

    match handle.await?? {
        JobOutcome::Novel(outcome) => {
            println!(
                "{}: {} downloaded, {} already present, {} skipped",
                outcome.novel, outcome.downloaded, outcome.existing, outcome.skipped
            );
        }
        JobOutcome::Rank(summary) => {
            println!(
                "{}/{} novels downloaded, {} failed",
                summary.succeeded, summary.discovered, summary.failed
            );
            for novel in summary.novels {
                println!("  {} ({} chapters)", novel.novel, novel.present());
            }
        }
    }
    Ok(())
}

async fn print_progress(mut rx: UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        let label = match event.status {
            ProgressStatus::Running => "..",
            ProgressStatus::Completed => "ok",
            ProgressStatus::Skipped => "--",
            ProgressStatus::Error => "!!",
        };
        println!("[{}] {}", label, event.message);
    }
}

/// Chunks go to stdout as they arrive, lifecycle messages to stderr.
async fn print_analysis(mut rx: UnboundedReceiver<AnalysisEvent>) {
    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        match event {
            AnalysisEvent::Chunk { chunk } => {
                print!("{}", chunk);
                let _ = stdout.flush();
            }
            AnalysisEvent::Status(status) => {
                if status.status != AnalysisPhase::Start {
                    println!();
                }
                eprintln!("{}", status.message);
            }
        }
    }
}

pub async fn analyze(ctx: &AppContext, novel: &str) -> Result<()> {
    let (handle, rx) = ctx.start_analysis(novel)?;
    print_analysis(rx).await;

    let result = handle.await??;
    println!("Saved analysis for {}:", novel);
    println!("  题材: {}", result.genre);
    println!("  风格: {}", result.style);
    println!("  金手指: {}", result.goldfinger);
    println!("  开篇: {}", result.opening);
    println!("  看点: {}", result.highlights);
    Ok(())
}

pub async fn analyze_chapter(ctx: &AppContext, novel: &str, chapter: &str, export: bool) -> Result<()> {
    let (handle, rx) = ctx.start_chapter_analysis(novel, chapter)?;
    print_analysis(rx).await;
    let outline = handle.await??;

    if export {
        let index = chapter_index(chapter)?;
        let title = ctx
            .store
            .read_metadata(novel)
            .map(|meta| meta.title)
            .unwrap_or_else(|_| novel.to_string());
        let path = ctx.workspace.export_chapter(&title, index, &outline)?;
        println!("Exported to {}", path.display());
    }
    Ok(())
}

fn chapter_index(file_name: &str) -> Result<usize> {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ScoutError::InvalidPath(format!("{:?} is not a chapter file", file_name)))
}

pub fn tree(ctx: &AppContext) -> Result<()> {
    let nodes = ctx.store.file_tree()?;
    if nodes.is_empty() {
        println!("No downloads");
        return Ok(());
    }
    print_nodes(&nodes, 0);
    Ok(())
}

fn print_nodes(nodes: &[FileNode], depth: usize) {
    for node in nodes {
        let suffix = if node.is_dir { "/" } else { "" };
        println!("{}{}{}", "  ".repeat(depth), node.name, suffix);
        print_nodes(&node.children, depth + 1);
    }
}

pub fn show(ctx: &AppContext, path: &str) -> Result<()> {
    print!("{}", ctx.store.read_file(path)?);
    Ok(())
}

pub fn export(ctx: &AppContext, title: &str, index: usize, file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)?;
    let path = ctx.workspace.export_chapter(title, index, &content)?;
    println!("Exported to {}", path.display());
    Ok(())
}

pub fn set_meta(ctx: &AppContext, novel: &str, patch: MetadataPatch) -> Result<()> {
    if patch == MetadataPatch::default() {
        return Err(ScoutError::Configuration("nothing to update".into()));
    }
    ctx.store.merge_metadata(novel, patch)?;
    println!("Updated {}", novel);
    Ok(())
}

/// `"a, b,,c"` → `["a", "b", "c"]`
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split([',', '，'])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn delete_novel(ctx: &AppContext, novel: &str) -> Result<()> {
    ctx.store.delete_novel(novel)?;
    println!("Deleted {}", novel);
    Ok(())
}

pub fn delete_chapter(ctx: &AppContext, novel: &str, chapter: &str) -> Result<()> {
    ctx.store.delete_chapter(novel, chapter)?;
    println!("Deleted {}/{}", novel, chapter);
    Ok(())
}

pub async fn models(ctx: &AppContext) -> Result<()> {
    let models = ctx.fetch_models().await?;
    if models.is_empty() {
        println!("No models");
    }
    for model in models {
        println!("{}", model);
    }
    Ok(())
}

pub fn prompt(ctx: &AppContext, chapter: bool) {
    let kind = if chapter {
        AnalysisKind::Chapter
    } else {
        AnalysisKind::Auto
    };
    println!("{}", resolve_prompt(kind, &ctx.config.ai));
}

pub fn show_log(ctx: &AppContext) -> Result<()> {
    print!("{}", ctx.workspace.read_log()?);
    Ok(())
}

pub fn clear_log(ctx: &AppContext) -> Result<()> {
    ctx.workspace.clear_log()?;
    println!("Log cleared");
    Ok(())
}
