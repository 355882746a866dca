//! Endpoint resolution and model listing for OpenAI-compatible services.

use reqwest::Client;
use serde_json::Value;

use crate::analysis::sse::error_message;
use crate::app::{Result, ScoutError};

const CHAT_COMPLETIONS: &str = "/chat/completions";

/// `base` with `/chat/completions` appended unless it already ends with it.
pub fn chat_completions_endpoint(api_base: &str) -> String {
    let base = api_base.trim().trim_end_matches('/');
    if base.ends_with(CHAT_COMPLETIONS) {
        base.to_string()
    } else {
        format!("{}{}", base, CHAT_COMPLETIONS)
    }
}

/// A completions URL is rewritten to its sibling `/models`.
pub fn models_endpoint(api_base: &str) -> String {
    let base = api_base.trim().trim_end_matches('/');
    match base.strip_suffix(CHAT_COMPLETIONS) {
        Some(root) => format!("{}/models", root),
        None => format!("{}/models", base),
    }
}

/// Model ids offered by the service, in the order it lists them.
pub async fn fetch_models(client: &Client, api_base: &str, api_key: &str) -> Result<Vec<String>> {
    let url = models_endpoint(api_base);
    tracing::debug!(%url, "listing models");

    let response = client.get(&url).bearer_auth(api_key).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ScoutError::UpstreamAnalysis(format!(
            "API Error {}: {}",
            status,
            parse_error_message(&body).unwrap_or(body)
        )));
    }

    let json: Value = serde_json::from_str(&body)?;
    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ScoutError::UpstreamAnalysis("Unknown response format".to_string()))?;

    Ok(data
        .iter()
        .filter_map(|m| m.get("id").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

/// `error.message` from an error body, if it has one.
pub fn parse_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("error").map(error_message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_chat_completions_endpoint() {
        assert_eq!(
            chat_completions_endpoint("https://api.example.com/v1"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_endpoint("https://api.example.com/v1/"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_endpoint("https://api.example.com/v1/chat/completions/"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_models_endpoint() {
        assert_eq!(
            models_endpoint("https://api.example.com/v1/chat/completions"),
            "https://api.example.com/v1/models"
        );
        assert_eq!(
            models_endpoint("https://api.example.com/v1/"),
            "https://api.example.com/v1/models"
        );
    }

    #[test]
    fn test_parse_error_message() {
        assert_eq!(
            parse_error_message(r#"{"error":{"message":"bad key","type":"auth"}}"#).as_deref(),
            Some("bad key")
        );
        assert_eq!(parse_error_message("<html>502</html>"), None);
    }

    #[tokio::test]
    async fn test_fetch_models_lists_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [{"id": "deepseek-chat"}, {"id": "qwen-plus"}, {"object": "model"}]
            })))
            .mount(&server)
            .await;

        let base = format!("{}/v1/chat/completions", server.uri());
        let models = fetch_models(&Client::new(), &base, "sk-test").await.unwrap();
        assert_eq!(models, vec!["deepseek-chat", "qwen-plus"]);
    }

    #[tokio::test]
    async fn test_fetch_models_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/denied/models"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_string(r#"{"error":{"message":"invalid api key"}}"#),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/odd/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
            .mount(&server)
            .await;

        let client = Client::new();
        let err = fetch_models(&client, &format!("{}/denied", server.uri()), "k")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid api key"));

        let err = fetch_models(&client, &format!("{}/odd", server.uri()), "k")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown response format"));
    }
}
