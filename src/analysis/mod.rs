//! Streaming analysis against an OpenAI-compatible chat-completions API.
//!
//! A request moves through `Idle -> Started -> Streaming -> Done | Failed`.
//! Every transition that matters to a consumer is sent on one ordered
//! channel of [`AnalysisEvent`]s, chunks and lifecycle statuses alike. A
//! consumer that drops its receiver does not stop the request; the stream is
//! read to the end regardless.

pub mod extract;
pub mod models;
pub mod prompt;
pub mod sse;
pub mod workflow;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::app::{Result, ScoutError};
use crate::config::AiConfig;
use crate::domain::{AnalysisEvent, AnalysisPhase};

pub use extract::{extract_analysis, extract_json};
pub use models::{chat_completions_endpoint, fetch_models, models_endpoint};
pub use prompt::{resolve_prompt, AnalysisKind, DEFAULT_AUTO_PROMPT, DEFAULT_CHAPTER_PROMPT};
pub use sse::{SseDecoder, SseEvent};
pub use workflow::{analyze_chapter, analyze_novel, opening_excerpt};

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
    pub content: String,
    pub wants_json: bool,
    pub temperature: f32,
}

impl AnalysisRequest {
    pub fn from_config(config: &AiConfig, kind: AnalysisKind, content: String) -> Self {
        Self {
            api_base: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            prompt: resolve_prompt(kind, config),
            content,
            wants_json: kind.wants_json(),
            temperature: config.temperature,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(ScoutError::Configuration(
                "no API key configured; set [ai].api_key".to_string(),
            ));
        }
        if self.api_base.trim().is_empty() {
            return Err(ScoutError::Configuration(
                "no API base URL configured; set [ai].api_base".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ScoutError::Configuration(
                "no model configured; set [ai].model".to_string(),
            ));
        }
        Ok(())
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": self.prompt},
                {"role": "user", "content": self.content},
            ],
            "stream": true,
            "temperature": self.temperature,
        });
        if self.wants_json {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Started,
    Streaming,
    Done,
    Failed,
}

/// Per-request bookkeeping: current state, accumulated text, outgoing events.
struct Session<'a> {
    state: AnalysisState,
    text: String,
    tx: &'a mpsc::UnboundedSender<AnalysisEvent>,
}

impl<'a> Session<'a> {
    fn new(tx: &'a mpsc::UnboundedSender<AnalysisEvent>) -> Self {
        Self {
            state: AnalysisState::Idle,
            text: String::new(),
            tx,
        }
    }

    fn transition(&mut self, next: AnalysisState) {
        tracing::debug!(from = ?self.state, to = ?next, "analysis state");
        self.state = next;
    }

    fn emit(&self, event: AnalysisEvent) {
        // a closed receiver only means nobody is watching
        let _ = self.tx.send(event);
    }

    fn start(&mut self, url: &str) {
        self.transition(AnalysisState::Started);
        self.emit(AnalysisEvent::status(
            AnalysisPhase::Start,
            format!("Connecting to AI at {}...", url),
        ));
    }

    fn push(&mut self, fragment: String) {
        if self.state == AnalysisState::Started {
            self.transition(AnalysisState::Streaming);
        }
        self.text.push_str(&fragment);
        self.emit(AnalysisEvent::chunk(fragment));
    }

    fn finish(&mut self) {
        self.transition(AnalysisState::Done);
        self.emit(AnalysisEvent::status(AnalysisPhase::Done, "Analysis Complete"));
    }

    fn fail(&mut self, error: &ScoutError) {
        self.transition(AnalysisState::Failed);
        let message = match error {
            ScoutError::UpstreamAnalysis(message) => message.clone(),
            other => other.to_string(),
        };
        tracing::error!(error = %message, "analysis failed");
        self.emit(AnalysisEvent::status(
            AnalysisPhase::Error,
            format!("Error: {}", message),
        ));
    }
}

pub struct AnalysisEngine {
    client: Client,
}

impl AnalysisEngine {
    pub fn new() -> Result<Self> {
        // no overall timeout: completions stream for as long as the model writes
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Validate, then run the request on a background task.
    pub fn start(
        self: &Arc<Self>,
        request: AnalysisRequest,
    ) -> Result<(
        JoinHandle<Result<String>>,
        mpsc::UnboundedReceiver<AnalysisEvent>,
    )> {
        request.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Arc::clone(self);
        let handle = tokio::spawn(async move { engine.run(&request, &tx).await });
        Ok((handle, rx))
    }

    /// Stream one completion to `tx` and return the full text.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        tx: &mpsc::UnboundedSender<AnalysisEvent>,
    ) -> Result<String> {
        request.validate()?;

        let url = chat_completions_endpoint(&request.api_base);
        let mut session = Session::new(tx);
        session.start(&url);
        tracing::info!(%url, model = %request.model, json = request.wants_json, "analysis started");

        match self.stream(request, &url, &mut session).await {
            Ok(()) => {
                session.finish();
                tracing::info!(chars = session.text.chars().count(), "analysis complete");
                Ok(session.text)
            }
            Err(e) => {
                session.fail(&e);
                Err(e)
            }
        }
    }

    async fn stream(&self, request: &AnalysisRequest, url: &str, session: &mut Session<'_>) -> Result<()> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&request.api_key)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| ScoutError::UpstreamAnalysis(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ScoutError::UpstreamAnalysis(format!(
                "API Error {}: {}",
                status,
                models::parse_error_message(&text).unwrap_or(text)
            )));
        }

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk
                .map_err(|e| ScoutError::UpstreamAnalysis(format!("stream interrupted: {}", e)))?;
            for event in decoder.feed(&chunk) {
                if apply(session, event)? {
                    return Ok(());
                }
            }
        }
        for event in decoder.finish() {
            apply(session, event)?;
        }
        Ok(())
    }
}

/// Returns `true` once the stream signals its end.
fn apply(session: &mut Session<'_>, event: SseEvent) -> Result<bool> {
    match event {
        SseEvent::Delta(fragment) => {
            session.push(fragment);
            Ok(false)
        }
        SseEvent::Done => Ok(true),
        SseEvent::Error(message) => Err(ScoutError::UpstreamAnalysis(message)),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use serde_json::json;

    /// An SSE body streaming `parts` as deltas, then `[DONE]`.
    pub fn sse_body(parts: &[&str]) -> String {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!(
                "data: {}\n\n",
                json!({"choices": [{"index": 0, "delta": {"content": part}}]})
            ));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }
}

#[cfg(test)]
mod tests {
    use super::testing::sse_body;
    use super::*;
    use crate::domain::AnalysisStatus;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(base: &str, wants_json: bool) -> AnalysisRequest {
        AnalysisRequest {
            api_base: base.to_string(),
            api_key: "sk-test".into(),
            model: "test-model".into(),
            prompt: "summarize".into(),
            content: "第一章".into(),
            wants_json,
            temperature: 0.7,
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<AnalysisEvent>) -> Vec<AnalysisEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_request_body_shape() {
        let body = request("https://x", true).body();
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "summarize");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["response_format"]["type"], "json_object");

        let body = request("https://x", false).body();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let mut req = request("https://x", false);
        req.api_key = "  ".into();
        assert!(matches!(req.validate(), Err(ScoutError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_chunks_arrive_in_order_between_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "test-model", "stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&["这是", "一本", "玄幻小说"])),
            )
            .mount(&server)
            .await;

        let engine = Arc::new(AnalysisEngine::new().unwrap());
        let (handle, mut rx) = engine
            .start(request(&format!("{}/v1/", server.uri()), false))
            .unwrap();
        let text = handle.await.unwrap().unwrap();
        assert_eq!(text, "这是一本玄幻小说");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            AnalysisEvent::status(
                AnalysisPhase::Start,
                format!("Connecting to AI at {}/v1/chat/completions...", server.uri())
            )
        );
        assert_eq!(events[1], AnalysisEvent::chunk("这是"));
        assert_eq!(events[2], AnalysisEvent::chunk("一本"));
        assert_eq!(events[3], AnalysisEvent::chunk("玄幻小说"));
        assert_eq!(
            events[4],
            AnalysisEvent::status(AnalysisPhase::Done, "Analysis Complete")
        );
    }

    #[tokio::test]
    async fn test_http_error_fails_with_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"error":{"message":"Incorrect API key provided"}}"#),
            )
            .mount(&server)
            .await;

        let engine = AnalysisEngine::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = engine.run(&request(&server.uri(), false), &tx).await.unwrap_err();
        assert!(matches!(err, ScoutError::UpstreamAnalysis(_)));

        let events = drain(&mut rx);
        let Some(AnalysisEvent::Status(AnalysisStatus { status, message })) = events.last() else {
            panic!("expected a terminal status, got {:?}", events);
        };
        assert_eq!(*status, AnalysisPhase::Error);
        assert!(message.starts_with("Error: API Error 401"));
        assert!(message.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_error_object_mid_stream() {
        let server = MockServer::start().await;
        let body = format!(
            "{}data: {}\n\n",
            sse_body(&["部分"]).replace("data: [DONE]\n\n", ""),
            json!({"error": {"message": "upstream overloaded"}})
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let engine = AnalysisEngine::new().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let err = engine.run(&request(&server.uri(), true), &tx).await.unwrap_err();
        assert_eq!(err.to_string(), "AI upstream error: upstream overloaded");

        let events = drain(&mut rx);
        assert_eq!(events[1], AnalysisEvent::chunk("部分"));
        assert_eq!(
            events.last(),
            Some(&AnalysisEvent::status(
                AnalysisPhase::Error,
                "Error: upstream overloaded"
            ))
        );
    }

    #[tokio::test]
    async fn test_dropped_receiver_still_drains() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(sse_body(&["a", "b"])))
            .mount(&server)
            .await;

        let engine = AnalysisEngine::new().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let text = engine.run(&request(&server.uri(), false), &tx).await.unwrap();
        assert_eq!(text, "ab");
    }

    #[tokio::test]
    async fn test_start_validates_synchronously() {
        let engine = Arc::new(AnalysisEngine::new().unwrap());
        let mut req = request("https://unused.invalid", false);
        req.api_key.clear();
        assert!(matches!(
            engine.start(req),
            Err(ScoutError::Configuration(_))
        ));
    }
}
