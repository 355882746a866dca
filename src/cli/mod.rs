pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::Platform;

#[derive(Parser)]
#[command(name = "novelscout")]
#[command(about = "Download web novels and analyze them with an LLM", long_about = None)]
pub struct Cli {
    /// Workspace root (overrides `workspace` in the config file)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Config file (default: ~/.config/novelscout/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the downloads/ and logs/ directories of the workspace
    Init,
    /// Download one novel
    Download {
        /// fanqie or qidian
        platform: Platform,
        /// Book page URL
        url: String,
        /// Number of chapters to fetch
        #[arg(short = 'n', long, default_value_t = 5)]
        chapters: usize,
        /// Show the browser window and route pages through it
        #[arg(long)]
        visible: bool,
    },
    /// Download the top novels of a ranking page
    Rank {
        /// fanqie or qidian
        platform: Platform,
        /// Ranking page URL
        url: String,
        /// Novels to take from the top of the ranking
        #[arg(short = 'm', long, default_value_t = 10)]
        max_novels: usize,
        /// Chapters per novel
        #[arg(short = 'n', long, default_value_t = 5)]
        chapters: usize,
        /// Show the browser window and route pages through it
        #[arg(long)]
        visible: bool,
    },
    /// Analyze the opening chapters of a downloaded novel and save the result
    Analyze {
        /// Novel directory name under downloads/
        novel: String,
    },
    /// Outline a single chapter
    AnalyzeChapter {
        /// Novel directory name under downloads/
        novel: String,
        /// Chapter file, e.g. 01.txt
        chapter: String,
        /// Also write the outline to result/<title>/<index>.md
        #[arg(long)]
        export: bool,
    },
    /// Show the downloads tree
    Tree,
    /// Print a file from downloads/
    Show {
        /// Path relative to downloads/, e.g. 斗破苍穹/01.txt
        path: String,
    },
    /// Save Markdown as result/<title>/<index>.md
    Export {
        title: String,
        index: usize,
        /// File holding the content
        file: PathBuf,
    },
    /// Update fields of a novel's info.json
    SetMeta {
        /// Novel directory name under downloads/
        novel: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Comma-separated
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        word_count: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a novel directory
    DeleteNovel { novel: String },
    /// Delete one chapter file
    DeleteChapter { novel: String, chapter: String },
    /// List models offered by the configured API
    Models,
    /// Print the analysis prompt in effect
    Prompt {
        /// The chapter outline prompt instead of the novel summary prompt
        #[arg(long)]
        chapter: bool,
    },
    /// Workspace log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(Subcommand)]
pub enum LogAction {
    /// Print logs/app.log
    Show,
    /// Truncate logs/app.log
    Clear,
}
