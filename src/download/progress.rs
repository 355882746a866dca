use tokio::sync::mpsc;

use crate::domain::{ProgressEvent, ProgressStatus};

/// Sends progress events to whoever started the job and mirrors them to the log.
///
/// A consumer that went away does not stop the job.
#[derive(Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Log-only sink.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, status: ProgressStatus, message: impl Into<String>) {
        let event = ProgressEvent::new(status, message);
        match status {
            ProgressStatus::Running | ProgressStatus::Completed => {
                tracing::info!(status = ?status, "{}", event.message)
            }
            ProgressStatus::Skipped => tracing::warn!(status = ?status, "{}", event.message),
            ProgressStatus::Error => tracing::error!(status = ?status, "{}", event.message),
        }

        if let Some(ref tx) = self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn running(&self, message: impl Into<String>) {
        self.emit(ProgressStatus::Running, message)
    }

    pub fn completed(&self, message: impl Into<String>) {
        self.emit(ProgressStatus::Completed, message)
    }

    pub fn skipped(&self, message: impl Into<String>) {
        self.emit(ProgressStatus::Skipped, message)
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(ProgressStatus::Error, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, mut rx) = ProgressSink::channel();
        sink.running("a");
        sink.skipped("b");
        sink.completed("c");

        let statuses: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                ProgressStatus::Running,
                ProgressStatus::Skipped,
                ProgressStatus::Completed
            ]
        );
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.error("nobody listening");
        ProgressSink::detached().completed("log only");
    }
}
