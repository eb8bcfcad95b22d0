//! Anthropic Messages API backend.

use crate::lines::{sse_data, spawn_line_reader};
use crate::provider::{ChunkStream, Provider};
use crate::request::{CompletionRequest, CompletionResponse, StreamChunk};
use crate::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct AnthropicProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        api_key: &str,
        api_key_env: &str,
        max_tokens: u32,
    ) -> Self {
        let api_key = if api_key.is_empty() {
            std::env::var(api_key_env).unwrap_or_default()
        } else {
            api_key.to_string()
        };
        Self {
            name: name.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model: model.into(),
            max_tokens,
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("client builder with static options"),
        }
    }

    #[cfg(test)]
    fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn build_request(&self, request: &CompletionRequest, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            max_tokens: if request.max_tokens == 0 {
                self.max_tokens
            } else {
                request.max_tokens
            },
            system: if request.system.is_empty() {
                None
            } else {
                Some(request.system.clone())
            },
            messages: vec![Message {
                role: "user",
                content: request.prompt.clone(),
            }],
            stream,
        }
    }

    async fn post(&self, body: &MessagesRequest) -> Result<reqwest::Response> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NotAvailable(self.name.clone()));
        }
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: self.name.clone(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn execute(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        let body = self.build_request(&request, false);
        let response = self.post(&body).await?;
        let parsed: MessagesResponse = response.json().await?;

        let content = parsed
            .content
            .into_iter()
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            tokens: parsed
                .usage
                .map(|u| u.input_tokens + u.output_tokens)
                .unwrap_or_default(),
            duration: start.elapsed(),
        })
    }

    async fn execute_stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        let body = self.build_request(&request, true);
        let response = self.post(&body).await?;

        let mut lines = spawn_line_reader(response);
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            while let Some(line) = lines.recv().await {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        let _ = tx.send(Err(e)).await;
                        return;
                    }
                };
                let Some(data) = sse_data(&line) else {
                    continue;
                };
                let Ok(event) = serde_json::from_str::<StreamEvent>(data) else {
                    continue;
                };
                match event {
                    StreamEvent::ContentBlockDelta { delta } => {
                        if let Some(text) = delta.text {
                            if !text.is_empty()
                                && tx.send(Ok(StreamChunk::content(text))).await.is_err()
                            {
                                return;
                            }
                        }
                    }
                    StreamEvent::MessageStop => {
                        let _ = tx.send(Ok(StreamChunk::done())).await;
                        return;
                    }
                    StreamEvent::Other => {}
                }
            }
            let _ = tx.send(Ok(StreamChunk::done())).await;
        });

        Ok(ChunkStream::from_channel(rx))
    }

    async fn models(&self) -> Vec<String> {
        [
            "claude-sonnet-4-20250514",
            "claude-opus-4-20250514",
            "claude-3-5-haiku-20241022",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: TextDelta },
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct TextDelta {
    #[serde(default)]
    text: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
