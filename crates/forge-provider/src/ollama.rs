//! Ollama backend. Local server, no auth; availability is a live probe of
//! `/api/tags`. Streaming responses are JSONL rather than SSE.

use crate::lines::spawn_line_reader;
use crate::provider::{ChunkStream, Provider};
use crate::request::{CompletionRequest, CompletionResponse, StreamChunk};
use crate::{ProviderError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

// Local models can be slow to load and generate.
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct OllamaProvider {
    name: String,
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .expect("client builder with static options"),
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint.trim_end_matches('/'))
    }

    fn tags_url(&self) -> String {
        format!("{}/api/tags", self.endpoint.trim_end_matches('/'))
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
            stream,
        }
    }

    async fn post(&self, body: &ChatRequest) -> Result<reqwest::Response> {
        let response = self.client.post(self.chat_url()).json(body).send().await?;

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
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        let probe = self
            .client
            .get(self.tags_url())
            .timeout(PROBE_TIMEOUT)
            .send()
            .await;
        matches!(probe, Ok(r) if r.status().is_success())
    }

    async fn execute(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        let body = self.build_request(&request, false);
        let response = self.post(&body).await?;
        let parsed: ChatResponse = response.json().await?;

        Ok(CompletionResponse {
            content: parsed.message.map(|m| m.content).unwrap_or_default(),
            model: parsed.model,
            tokens: parsed.eval_count.unwrap_or_default(),
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
                let Ok(event) = serde_json::from_str::<ChatResponse>(&line) else {
                    continue;
                };
                let content = event.message.map(|m| m.content).unwrap_or_default();
                if !content.is_empty()
                    && tx.send(Ok(StreamChunk::content(content))).await.is_err()
                {
                    return;
                }
                if event.done {
                    let _ = tx.send(Ok(StreamChunk::done())).await;
                    return;
                }
            }
            let _ = tx.send(Ok(StreamChunk::done())).await;
        });

        Ok(ChunkStream::from_channel(rx))
    }

    async fn models(&self) -> Vec<String> {
        let Ok(response) = self.client.get(self.tags_url()).send().await else {
            return Vec::new();
        };
        let Ok(tags) = response.json::<TagsResponse>().await else {
            return Vec::new();
        };
        tags.models.into_iter().map(|m| m.name).collect()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
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
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn availability_probes_tags_endpoint() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[]}"#)
            .create_async()
            .await;

        let p = OllamaProvider::new("ollama", server.url(), "llama3.2");
        assert!(p.is_available().await);

        let down = OllamaProvider::new("ollama", "http://127.0.0.1:1", "llama3.2");
        assert!(!down.is_available().await);
    }

    #[tokio::test]
    async fn down_daemon_surfaces_as_transport_error() {
        // No pre-check here: availability is a live probe, so execute
        // reports the connection failure directly.
        let p = OllamaProvider::new("ollama", "http://127.0.0.1:1", "llama3.2");
        let err = p.execute(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
    }

    #[tokio::test]
    async fn execute_reads_message_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(
                r#"{"model":"llama3.2","message":{"role":"assistant","content":"local reply"},"done":true,"eval_count":11}"#,
            )
            .create_async()
            .await;

        let p = OllamaProvider::new("ollama", server.url(), "llama3.2");
        let response = p.execute(CompletionRequest::new("hi")).await.unwrap();

        assert_eq!(response.content, "local reply");
        assert_eq!(response.tokens, 11);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn stream_reads_jsonl_until_done() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            "{\"model\":\"llama3.2\",\"message\":{\"content\":\"a\"},\"done\":false}\n",
            "{\"model\":\"llama3.2\",\"message\":{\"content\":\"b\"},\"done\":false}\n",
            "{\"model\":\"llama3.2\",\"message\":{\"content\":\"\"},\"done\":true}\n",
        );
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let p = OllamaProvider::new("ollama", server.url(), "llama3.2");
        let stream = p
            .execute_stream(CompletionRequest::new("hi"))
            .await
            .unwrap();
        let chunks: Vec<_> = stream.map(|c| c.unwrap()).collect().await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::content("a"),
                StreamChunk::content("b"),
                StreamChunk::done()
            ]
        );
    }

    #[tokio::test]
    async fn models_lists_installed_tags() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_body(r#"{"models":[{"name":"llama3.2"},{"name":"qwen2.5-coder"}]}"#)
            .create_async()
            .await;

        let p = OllamaProvider::new("ollama", server.url(), "llama3.2");
        assert_eq!(p.models().await, vec!["llama3.2", "qwen2.5-coder"]);
    }
}
