//! Chat-completion collaborator and its OpenAI-compatible HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use conceptgraph_shared::{ConceptGraphError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

/// User-Agent string for chat requests.
const USER_AGENT: &str = concat!("ConceptGraph/", env!("CARGO_PKG_VERSION"));

/// Low temperature: the prompts want stable JSON, not creativity.
const TEMPERATURE: f32 = 0.2;

/// One single-turn, non-streaming prompt.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub endpoint: &'a Url,
    pub model: &'a str,
    pub prompt: &'a str,
}

/// Sends one prompt, returns the model's free-text reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 1],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `POST <endpoint>/chat/completions` client.
#[derive(Clone)]
pub struct HttpChatModel {
    client: Client,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatModel")
            .field("api_key", &self.api_key.is_some())
            .finish()
    }
}

impl HttpChatModel {
    pub fn new(timeout_secs: u64, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConceptGraphError::Network(format!("client build: {e}")))?;
        Ok(Self { client, api_key })
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    #[instrument(skip_all, fields(model = request.model))]
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String> {
        let url = format!(
            "{}/chat/completions",
            request.endpoint.as_str().trim_end_matches('/')
        );

        let body = CompletionRequest {
            model: request.model,
            messages: [Message {
                role: "user",
                content: request.prompt,
            }],
            temperature: TEMPERATURE,
            stream: false,
        };

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ConceptGraphError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConceptGraphError::Llm(format!("{url}: HTTP {status}")));
        }

        let reply: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ConceptGraphError::Llm(format!("invalid response body: {e}")))?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ConceptGraphError::Llm("response has no message content".into()))?;

        debug!(chars = content.len(), "chat reply received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn complete(server: &MockServer, api_key: Option<String>) -> Result<String> {
        let endpoint = Url::parse(&format!("{}/v1", server.uri())).unwrap();
        let chat = HttpChatModel::new(5, api_key).unwrap();
        chat.complete(ChatRequest {
            endpoint: &endpoint,
            model: "test-model",
            prompt: "Say hi as JSON",
        })
        .await
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "stream": false,
                "messages": [{"role": "user", "content": "Say hi as JSON"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"hi\": \"there\"}"}}]
            })))
            .mount(&server)
            .await;

        let reply = complete(&server, None).await.unwrap();
        assert_eq!(reply, r#"{"hi": "there"}"#);
    }

    #[tokio::test]
    async fn sends_bearer_token_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .mount(&server)
            .await;

        assert_eq!(complete(&server, Some("sk-test".into())).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn http_error_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = complete(&server, None).await.unwrap_err();
        assert!(matches!(err, ConceptGraphError::Llm(_)));
    }

    #[tokio::test]
    async fn empty_choices_is_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let err = complete(&server, None).await.unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }
}
