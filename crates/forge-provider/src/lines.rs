//! Line-buffered reading of streaming HTTP response bodies. Both the SSE
//! chat APIs and Ollama's JSONL stream are newline-delimited, so backends
//! share one scanner and interpret lines themselves.

use crate::Result;
use futures::StreamExt;
use tokio::sync::mpsc;

/// Spawn a background task that splits the response body into trimmed,
/// non-empty lines. The channel closes on EOF, error, or receiver drop.
pub(crate) fn spawn_line_reader(response: reqwest::Response) -> mpsc::Receiver<Result<String>> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    let _ = tx.send(Err(e.into())).await;
                    return;
                }
            };
            buf.extend_from_slice(&bytes);

            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if !line.is_empty() && tx.send(Ok(line)).await.is_err() {
                    return;
                }
            }
        }

        // Body ended without a trailing newline
        if !buf.is_empty() {
            let line = String::from_utf8_lossy(&buf).trim().to_string();
            if !line.is_empty() {
                let _ = tx.send(Ok(line)).await;
            }
        }
    });

    rx
}

/// Strip the SSE `data: ` prefix from a line, if present.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_data_strips_prefix() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:[DONE]"), Some("[DONE]"));
        assert_eq!(sse_data("event: ping"), None);
    }

    #[tokio::test]
    async fn line_reader_splits_and_trims() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/stream")
            .with_status(200)
            .with_body("first\n\nsecond\r\nlast-no-newline")
            .create_async()
            .await;

        let response = reqwest::get(format!("{}/stream", server.url()))
            .await
            .unwrap();
        let mut rx = spawn_line_reader(response);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line.unwrap());
        }
        assert_eq!(lines, vec!["first", "second", "last-no-newline"]);
        mock.assert_async().await;
    }
}
