//! Chat-completion upstream.

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::upstream::client::{send_json, UpstreamClient};

pub const SERVICE: &str = "llm";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Outbound `/chat/completions` body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text produced by a completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub model: String,
}

/// Client for an OpenAI-compatible chat-completion API.
#[derive(Debug, Clone)]
pub struct LlmClient {
    upstream: UpstreamClient,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(upstream: UpstreamClient, config: LlmConfig) -> Self {
        Self { upstream, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Model name to use for a request.
    pub fn resolve_model(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(self.config.default_model.as_str())
            .to_string()
    }

    /// Single-turn completion for `prompt`.
    ///
    /// `operation` names the call in attempt logs; `request_id` tags them.
    pub async fn complete(
        &self,
        operation: &str,
        prompt: &str,
        model: Option<&str>,
        request_id: Option<&str>,
    ) -> GatewayResult<Completion> {
        let api_key = self.config.api_key()?;
        let body = ChatCompletionRequest {
            model: self.resolve_model(model),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };
        let url = self.endpoint();
        let deadline = self.upstream.attempt_timeout();

        let response: ChatCompletionResponse = self
            .upstream
            .call(operation, request_id, |_| {
                let request = self
                    .upstream
                    .http()
                    .post(&url)
                    .bearer_auth(api_key)
                    .json(&body);
                send_json(SERVICE, request, deadline)
            })
            .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GatewayError::unknown("unexpected completion response shape", Some("no choices[0].message.content".into())))?;

        Ok(Completion {
            text,
            model: response.model.unwrap_or(body.model),
        })
    }
}
