pub mod chapter;
pub mod event;
pub mod novel;
pub mod platform;

pub use chapter::{chapter_file_name, ChapterContent, ChapterRef};
pub use event::{AnalysisEvent, AnalysisPhase, AnalysisStatus, ProgressEvent, ProgressStatus};
pub use novel::{AnalysisResult, MetadataPatch, NovelMetadata, RankEntry};
pub use platform::Platform;
