//! OpenAI-shaped chat-completion backend. Also covers any API that speaks
//! the same payload (Azure, OpenRouter, local gateways) via a custom
//! endpoint.

use crate::lines::{sse_data, spawn_line_reader};
use crate::provider::{ChunkStream, Provider};
use crate::request::{CompletionRequest, CompletionResponse, StreamChunk};
use crate::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiProvider {
    name: String,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
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
            endpoint: endpoint.into(),
            api_key,
            model: model.into(),
            max_tokens,
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("client builder with static options"),
        }
    }

    fn build_request(&self, request: &CompletionRequest, stream: bool) -> ChatRequest {
        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: request.system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: request.prompt.clone(),
        });

        ChatRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            messages,
            max_tokens: if request.max_tokens == 0 {
                self.max_tokens
            } else {
                request.max_tokens
            },
            stream,
        }
    }

    async fn post(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        if !self.available() {
            return Err(ProviderError::NotAvailable(self.name.clone()));
        }
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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

    fn available(&self) -> bool {
        !self.api_key.is_empty() && !self.endpoint.is_empty()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        self.available()
    }

    async fn execute(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        let body = self.build_request(&request, false);
        let response = self.post(&body).await?;
        let parsed: ChatResponse = response.json().await?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::Api {
                provider: self.name.clone(),
                status: 200,
                message: error.message,
            });
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(CompletionResponse {
            content,
            model: parsed.model,
            tokens: parsed.usage.map(|u| u.total_tokens).unwrap_or_default(),
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
                if data == "[DONE]" {
                    let _ = tx.send(Ok(StreamChunk::done())).await;
                    return;
                }
                match serde_json::from_str::<StreamEvent>(data) {
                    // Malformed events are skipped, not fatal: SSE keepalives
                    // and vendor extensions appear on the same channel.
                    Err(_) => continue,
                    Ok(event) => {
                        let content: String = event
                            .choices
                            .into_iter()
                            .filter_map(|c| c.delta.content)
                            .collect();
                        if !content.is_empty()
                            && tx.send(Ok(StreamChunk::content(content))).await.is_err()
                        {
                            return;
                        }
                    }
                }
            }
            // Stream ended without [DONE]; still terminate cleanly.
            let _ = tx.send(Ok(StreamChunk::done())).await;
        });

        Ok(ChunkStream::from_channel(rx))
    }

    async fn models(&self) -> Vec<String> {
        ["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "is_zero")]
    max_tokens: u32,
    stream: bool,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn provider(endpoint: String) -> OpenAiProvider {
        OpenAiProvider::new("openai", endpoint, "gpt-4o-mini", "test-key", "UNUSED", 256)
    }

    #[tokio::test]
    async fn unavailable_without_api_key() {
        let p = OpenAiProvider::new(
            "openai",
            "https://example.invalid",
            "gpt-4o-mini",
            "",
            "FORGE_TEST_NO_SUCH_KEY",
            256,
        );
        assert!(!p.is_available().await);

        let err = p.execute(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn execute_parses_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(
                r#"{"model":"gpt-4o-mini","choices":[{"message":{"role":"assistant","content":"pong"}}],"usage":{"total_tokens":7}}"#,
            )
            .create_async()
            .await;

        let p = provider(format!("{}/v1/chat/completions", server.url()));
        let response = p
            .execute(CompletionRequest::new("ping").with_system("be brief"))
            .await
            .unwrap();

        assert_eq!(response.content, "pong");
        assert_eq!(response.tokens, 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_surfaces_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let p = provider(format!("{}/v1/chat/completions", server.url()));
        let err = p.execute(CompletionRequest::new("hi")).await.unwrap_err();
        match err {
            ProviderError::Api { status, message, .. } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate limited"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_forwards_deltas_until_done() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let p = provider(format!("{}/v1/chat/completions", server.url()));
        let stream = p
            .execute_stream(CompletionRequest::new("hi"))
            .await
            .unwrap();
        let chunks: Vec<_> = stream.map(|c| c.unwrap()).collect().await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::content("Hel"),
                StreamChunk::content("lo"),
                StreamChunk::done()
            ]
        );
    }
}
