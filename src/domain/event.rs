use serde::Serialize;

pub const DOWNLOAD_PROGRESS_TOPIC: &str = "download-progress";
pub const AI_ANALYSIS_TOPIC: &str = "ai-analysis";
pub const AI_ANALYSIS_STATUS_TOPIC: &str = "ai-analysis-status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Running,
    Completed,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub message: String,
    pub status: ProgressStatus,
}

impl ProgressEvent {
    pub fn new(status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    pub fn topic(&self) -> &'static str {
        DOWNLOAD_PROGRESS_TOPIC
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPhase {
    Start,
    Done,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisStatus {
    pub message: String,
    pub status: AnalysisPhase,
}

/// Everything one analysis request emits, on a single ordered channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AnalysisEvent {
    Chunk { chunk: String },
    Status(AnalysisStatus),
}

impl AnalysisEvent {
    pub fn chunk(text: impl Into<String>) -> Self {
        Self::Chunk { chunk: text.into() }
    }

    pub fn status(status: AnalysisPhase, message: impl Into<String>) -> Self {
        Self::Status(AnalysisStatus {
            message: message.into(),
            status,
        })
    }

    pub fn topic(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => AI_ANALYSIS_TOPIC,
            Self::Status(_) => AI_ANALYSIS_STATUS_TOPIC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_payload_shape() {
        let event = ProgressEvent::new(ProgressStatus::Skipped, "exists");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["message"], "exists");
        assert_eq!(event.topic(), "download-progress");
    }

    #[test]
    fn test_analysis_events_route_to_their_topics() {
        let chunk = AnalysisEvent::chunk("hi");
        assert_eq!(chunk.topic(), AI_ANALYSIS_TOPIC);
        assert_eq!(serde_json::to_value(&chunk).unwrap()["chunk"], "hi");

        let done = AnalysisEvent::status(AnalysisPhase::Done, "Analysis Complete");
        assert_eq!(done.topic(), AI_ANALYSIS_STATUS_TOPIC);
        assert_eq!(serde_json::to_value(&done).unwrap()["status"], "done");
    }
}
