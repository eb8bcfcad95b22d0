use crate::request::{CompletionRequest, CompletionResponse, StreamChunk};
use crate::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Uniform capability interface over heterogeneous AI backends.
///
/// `is_available` must be cheap and free of side effects beyond the probe
/// itself. Orchestrating code checks it before calling `execute`; backends
/// whose probe is a local precondition (API key configured, binary on PATH)
/// also re-check inside `execute` and fail with
/// [`crate::ProviderError::NotAvailable`]. Ollama's probe is a live HTTP
/// round trip, so a down daemon surfaces from `execute` as a transport
/// error instead.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The provider's identifier (the configured name, not the backend kind).
    fn name(&self) -> &str;

    /// Whether the backend is configured and reachable.
    async fn is_available(&self) -> bool;

    /// Send a completion request and wait for the full response.
    async fn execute(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Send a completion request and stream partial content as it arrives.
    /// The stream is finite: it ends with a done-marked chunk or an error.
    async fn execute_stream(&self, request: CompletionRequest) -> Result<ChunkStream>;

    /// Models this backend can serve.
    async fn models(&self) -> Vec<String>;
}

// ---------------------------------------------------------------------------
// ChunkStream
// ---------------------------------------------------------------------------

/// An async stream of [`StreamChunk`]s from a provider backend.
///
/// Backed by a Tokio mpsc channel: a background task owns the HTTP response
/// or subprocess and forwards chunks until the done marker or an error.
/// Dropping the stream closes the receiver, which stops the background task
/// on its next send attempt.
pub struct ChunkStream {
    rx: mpsc::Receiver<Result<StreamChunk>>,
}

impl ChunkStream {
    pub(crate) fn from_channel(rx: mpsc::Receiver<Result<StreamChunk>>) -> Self {
        Self { rx }
    }

    /// A stream that yields the given response as one content chunk followed
    /// by the done marker. Used by backends without native streaming.
    pub(crate) fn single(content: String) -> Self {
        let (tx, rx) = mpsc::channel(2);
        // Capacity covers both sends; the task completes immediately.
        tokio::spawn(async move {
            let _ = tx.send(Ok(StreamChunk::content(content))).await;
            let _ = tx.send(Ok(StreamChunk::done())).await;
        });
        Self { rx }
    }

    /// Collect the whole stream into the concatenated content.
    pub async fn collect_content(mut self) -> Result<String> {
        use futures::StreamExt;
        let mut out = String::new();
        while let Some(chunk) = self.next().await {
            let chunk = chunk?;
            out.push_str(&chunk.content);
            if chunk.done {
                break;
            }
        }
        Ok(out)
    }
}

impl Stream for ChunkStream {
    type Item = Result<StreamChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
