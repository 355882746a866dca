//! # novelscout
//!
//! Downloads serialized web novels from Fanqie and Qidian into a local
//! workspace and streams LLM analyses of them back into their metadata.
//!
//! ## Architecture
//!
//! ```text
//! DownloadJob → Downloader → SourceAdapter → Fetcher (HTTP, browser fallback)
//!                   └──→ Store (downloads/<title>/NN.txt, info.json)
//!
//! Store → excerpt → AnalysisEngine (SSE stream) → JSON extraction → Store
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! novelscout --workspace ~/novels init
//! novelscout --workspace ~/novels download fanqie https://fanqienovel.com/page/7001 -n 5
//! novelscout --workspace ~/novels analyze 星海归途
//! ```

/// Application context and error types.
///
/// [`AppContext`](app::AppContext) wires the config, workspace, store and
/// analysis engine together and builds a fetcher per download job.
pub mod app;

/// Streaming chat-completions client, prompt selection and JSON recovery.
pub mod analysis;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/novelscout/config.toml`.
pub mod config;

/// Core records: platforms, chapters, metadata and progress events.
pub mod domain;

/// Single-novel and rank-scan download jobs.
pub mod download;

/// Headless Chromium fallback for verification pages.
///
/// - [`ChromeRenderer`](evasion::ChromeRenderer): chromiumoxide-backed renderer
/// - [`ChallengeDetector`](evasion::ChallengeDetector): recognizes challenge responses
pub mod evasion;

/// Plain HTTP fetching with challenge detection.
pub mod fetcher;

/// Per-platform page parsing.
pub mod source;

/// Workspace layout and file-backed novel storage.
pub mod store;
