use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use novelscout::app::AppContext;
use novelscout::cli::{commands, Cli, Commands, LogAction};
use novelscout::config::Config;
use novelscout::domain::MetadataPatch;
use novelscout::download::DownloadJob;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let ctx = AppContext::new(config, cli.workspace.as_deref())?;

    init_tracing(&ctx.workspace.log_path());

    match cli.command {
        Commands::Init => commands::init(&ctx)?,
        Commands::Download {
            platform,
            url,
            chapters,
            visible,
        } => {
            let job = DownloadJob::single(platform, url, chapters).visible(visible);
            commands::download(&ctx, job).await?;
        }
        Commands::Rank {
            platform,
            url,
            max_novels,
            chapters,
            visible,
        } => {
            let job = DownloadJob::rank(platform, url, max_novels, chapters).visible(visible);
            commands::download(&ctx, job).await?;
        }
        Commands::Analyze { novel } => commands::analyze(&ctx, &novel).await?,
        Commands::AnalyzeChapter {
            novel,
            chapter,
            export,
        } => commands::analyze_chapter(&ctx, &novel, &chapter, export).await?,
        Commands::Tree => commands::tree(&ctx)?,
        Commands::Show { path } => commands::show(&ctx, &path)?,
        Commands::Export { title, index, file } => commands::export(&ctx, &title, index, &file)?,
        Commands::SetMeta {
            novel,
            title,
            url,
            tags,
            word_count,
            description,
        } => {
            let patch = MetadataPatch {
                title,
                url,
                tags: tags.as_deref().map(commands::split_tags),
                word_count,
                description,
                ai_analysis: None,
            };
            commands::set_meta(&ctx, &novel, patch)?;
        }
        Commands::DeleteNovel { novel } => commands::delete_novel(&ctx, &novel)?,
        Commands::DeleteChapter { novel, chapter } => {
            commands::delete_chapter(&ctx, &novel, &chapter)?
        }
        Commands::Models => commands::models(&ctx).await?,
        Commands::Prompt { chapter } => commands::prompt(&ctx, chapter),
        Commands::Log { action } => match action {
            LogAction::Show => commands::show_log(&ctx)?,
            LogAction::Clear => commands::clear_log(&ctx)?,
        },
    }

    Ok(())
}

/// Stderr always; `logs/app.log` too once the workspace has a logs directory.
fn init_tracing(log_path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let log_file = log_path
        .parent()
        .filter(|dir| dir.is_dir())
        .and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)
                .ok()
        });
    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
}
