//! OpenAI-compatible chat completion gateway

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{GatewayError, Result};
use crate::generation::{parse_answers, PromptBuilder};

use super::llm::{GatewayResponse, ModelGateway};
use super::retry::RetryPolicy;
use super::rotation::{KeyRotation, RotationKey};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Gateway over a `/chat/completions` endpoint with key rotation and retry
pub struct ChatGateway {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    top_p: f32,
    keys: KeyRotation,
    retry: RetryPolicy,
}

impl ChatGateway {
    /// Create a new gateway from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(16)
            .build()?;

        if config.api_keys.is_empty() {
            tracing::warn!("No LLM API keys configured, requests are sent without credentials");
        }

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            keys: KeyRotation::new(config.api_keys.clone()),
            retry: RetryPolicy::from(&config.retry),
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The credential rotation used by this gateway
    pub fn keys(&self) -> &KeyRotation {
        &self.keys
    }

    /// One HTTP round trip
    async fn send_once(
        &self,
        user_prompt: &str,
        key: RotationKey,
    ) -> std::result::Result<GatewayResponse, GatewayError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: PromptBuilder::system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            top_p: self.top_p,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(api_key) = self.keys.next(key) {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::from_reqwest(&e))?;

        if !status.is_success() {
            return Err(GatewayError::from_status(status.as_u16(), text));
        }

        let content = serde_json::from_str::<ChatResponse>(&text)
            .ok()
            .and_then(|r| r.choices.into_iter().next())
            .and_then(|c| c.message.content);

        Ok(match content {
            Some(content) => parse_answers(&content),
            None => GatewayResponse::Malformed(text),
        })
    }
}

#[async_trait]
impl ModelGateway for ChatGateway {
    async fn complete(
        &self,
        context: &str,
        questions: &[String],
        rotation_key: RotationKey,
    ) -> std::result::Result<GatewayResponse, GatewayError> {
        let user_prompt = PromptBuilder::user_prompt(context, questions);

        // Each retry moves to the next credential slot
        self.retry
            .run("Chat completion", |attempt| {
                self.send_once(&user_prompt, rotation_key.offset(attempt as usize))
            })
            .await
    }

    fn begin_request(&self) -> RotationKey {
        self.keys.begin_request()
    }

    fn name(&self) -> &str {
        "chat-completions"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{header::AUTHORIZATION, HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    const ANSWER_BODY: &str = r#"{"choices":[{"message":{"content":"{\"answers\":[\"a\"]}"}}]}"#;

    /// Completion endpoint replaying canned replies; the last one repeats
    struct StubEndpoint {
        replies: Vec<(u16, &'static str)>,
        bearers: Mutex<Vec<String>>,
    }

    async fn reply(State(stub): State<Arc<StubEndpoint>>, headers: HeaderMap) -> (StatusCode, String) {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut bearers = stub.bearers.lock();
        let (status, body) = stub.replies[bearers.len().min(stub.replies.len() - 1)];
        bearers.push(bearer);
        (StatusCode::from_u16(status).unwrap(), body.to_string())
    }

    async fn stub_gateway(replies: Vec<(u16, &'static str)>, keys: &[&str]) -> (ChatGateway, Arc<StubEndpoint>) {
        let stub = Arc::new(StubEndpoint {
            replies,
            bearers: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/v1/chat/completions", post(reply))
            .with_state(Arc::clone(&stub));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let config = LlmConfig {
            base_url: format!("http://{}/v1", addr),
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            timeout_secs: 5,
            ..Default::default()
        };
        let gateway = ChatGateway::new(&config).unwrap().with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            jitter_factor: 0.0,
        });
        (gateway, stub)
    }

    #[test]
    fn test_endpoint_from_base_url() {
        let config = LlmConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            api_keys: vec!["a".into(), "b".into()],
            ..Default::default()
        };
        let gateway = ChatGateway::new(&config).unwrap();
        assert_eq!(gateway.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(gateway.keys().len(), 2);
        assert_eq!(gateway.model(), "openai/gpt-4.1");
    }

    #[test]
    fn test_request_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.5,
            top_p: 0.9,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["model"], "m");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let gateway = ChatGateway::new(&config).unwrap().with_retry(RetryPolicy::none());

        let result = gateway
            .complete("ctx", &["q".to_string()], RotationKey(0))
            .await;
        let err = result.unwrap_err();
        assert!(err.is_transient(), "unexpected error: {:?}", err);
    }

    #[tokio::test]
    async fn test_transient_statuses_retry_with_next_credential() {
        let (gateway, stub) = stub_gateway(
            vec![(429, "slow down"), (503, "overloaded"), (200, ANSWER_BODY)],
            &["k0", "k1", "k2"],
        )
        .await;

        let base = gateway.begin_request();
        let response = gateway.complete("ctx", &["q".to_string()], base).await.unwrap();
        assert_eq!(response, GatewayResponse::ParsedAnswers(vec!["a".to_string()]));
        assert_eq!(
            *stub.bearers.lock(),
            vec!["Bearer k0", "Bearer k1", "Bearer k2"]
        );

        // The next request starts one slot further along
        let base = gateway.begin_request();
        gateway.complete("ctx", &["q".to_string()], base).await.unwrap();
        assert_eq!(stub.bearers.lock()[3], "Bearer k1");
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_last_error() {
        let (gateway, stub) = stub_gateway(vec![(500, "boom")], &["k0", "k1"]).await;

        let err = gateway
            .complete("ctx", &["q".to_string()], RotationKey(0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Server { status: 500, .. }));
        assert_eq!(
            *stub.bearers.lock(),
            vec!["Bearer k0", "Bearer k1", "Bearer k0"]
        );
    }

    #[tokio::test]
    async fn test_rejected_status_is_not_retried() {
        let (gateway, stub) = stub_gateway(vec![(401, "bad key")], &["k0", "k1"]).await;

        let err = gateway
            .complete("ctx", &["q".to_string()], RotationKey(0))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 401, .. }));
        assert_eq!(stub.bearers.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_malformed() {
        let (gateway, stub) = stub_gateway(vec![(200, "<html>upstream error</html>")], &["k0"]).await;

        let response = gateway
            .complete("ctx", &["q".to_string()], RotationKey(0))
            .await
            .unwrap();
        assert_eq!(
            response,
            GatewayResponse::Malformed("<html>upstream error</html>".to_string())
        );
        assert_eq!(stub.bearers.lock().len(), 1);
    }
}
