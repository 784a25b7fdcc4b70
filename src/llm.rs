use crate::config::ModelConfig;
use crate::error::{AskError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// One single-shot completion. Each request stands alone: no conversation
/// state is carried between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: usize,
    pub stop: Vec<String>,
}

impl GenerationRequest {
    pub fn new(prompt: String, max_tokens: usize, stop: &[String]) -> Self {
        Self {
            prompt,
            max_tokens,
            stop: stop.to_vec(),
        }
    }
}

/// Text completion capability.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Return the raw completion text. No retries at this layer.
    async fn complete(&self, request: &GenerationRequest) -> Result<String>;

    /// Make sure the model is loaded and reachable.
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: usize,
    stop: &'a [String],
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

/// Client for an OpenAI-compatible `/completions` endpoint, as served by
/// llama.cpp for a local GGUF model.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    context_window: usize,
}

impl LlmClient {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AskError::Config(format!("Failed to create HTTP client for LLM: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            context_window: config.context_window,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("Authorization", format!("Bearer {}", key)),
            None => builder,
        }
    }

    /// Rough token estimate (~4 characters per token); only used for a warning.
    fn check_context_budget(&self, request: &GenerationRequest) {
        let estimated = request.prompt.len() / 4 + request.max_tokens;
        if estimated > self.context_window {
            warn!(
                estimated_tokens = estimated,
                context_window = self.context_window,
                "Prompt plus completion may not fit the model context window"
            );
        }
    }
}

fn transport_error(action: &str, e: reqwest::Error) -> AskError {
    if e.is_timeout() {
        AskError::Generation(format!("LLM {} timed out: {}", action, e))
    } else {
        AskError::Generation(format!("LLM {} failed: {}", action, e))
    }
}

#[async_trait]
impl GenerationClient for LlmClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String> {
        self.check_context_budget(request);
        trace!(prompt = %request.prompt, "Sending completion request");

        let body = CompletionBody {
            model: &self.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            stop: &request.stop,
            temperature: 0.0,
            stream: false,
        };

        let response = self
            .authorize(self.client.post(format!("{}/completions", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("API call", e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AskError::Generation(format!(
                "LLM API returned {}: {}",
                status, detail
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| transport_error("response parsing", e))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| AskError::Generation("No choices in LLM response".to_string()))?;

        debug!(chars = text.len(), "Completion received");
        Ok(text)
    }

    async fn warm_up(&self) -> Result<()> {
        let response = self
            .authorize(self.client.get(format!("{}/models", self.base_url)))
            .send()
            .await
            .map_err(|e| transport_error("health probe", e))?;

        if !response.status().is_success() {
            return Err(AskError::Generation(format!(
                "LLM server at {} is not ready: {}",
                self.base_url,
                response.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        model: ModelConfig,
    }

    fn unreachable_client() -> LlmClient {
        let cli = TestCli::parse_from(["test", "--llm-base-url", "http://127.0.0.1:1/v1/", "--llm-timeout-secs", "5"]);
        LlmClient::new(&cli.model).unwrap()
    }

    #[test]
    fn test_base_url_is_normalized() {
        assert_eq!(unreachable_client().base_url, "http://127.0.0.1:1/v1");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_generation_failure() {
        let client = unreachable_client();
        let request = GenerationRequest::new("SELECT".to_string(), 4, &["</s>".to_string()]);

        assert!(matches!(client.complete(&request).await, Err(AskError::Generation(_))));
        assert!(matches!(client.warm_up().await, Err(AskError::Generation(_))));
    }

    #[tokio::test]
    async fn test_silent_server_times_out_as_generation_failure() {
        // Accepts the request and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let held = tokio::spawn(async move {
            let mut sockets = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                sockets.push(socket);
            }
        });

        let cli = TestCli::parse_from(["test", "--llm-base-url", base_url.as_str(), "--llm-timeout-secs", "1"]);
        let client = LlmClient::new(&cli.model).unwrap();
        let request = GenerationRequest::new("SELECT".to_string(), 4, &["</s>".to_string()]);

        match client.complete(&request).await {
            Err(AskError::Generation(message)) => assert!(message.contains("timed out"), "{}", message),
            other => panic!("expected a generation timeout, got {:?}", other),
        }
        held.abort();
    }
}
