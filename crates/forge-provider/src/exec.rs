//! Subprocess backend for local AI CLIs (gemini, codex, opencode, fabric).
//!
//! The prompt is piped to the child's stdin and the system prompt, when
//! present, rides in the `FORGE_SYSTEM` environment variable. Stdout is the
//! completion; a non-zero exit is an error carrying stderr.

use crate::provider::{ChunkStream, Provider};
use crate::request::{CompletionRequest, CompletionResponse};
use crate::{ProviderError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub const SYSTEM_PROMPT_ENV: &str = "FORGE_SYSTEM";

pub struct ExecutableProvider {
    name: String,
    executable: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    work_dir: Option<PathBuf>,
    timeout: Duration,
    interactive: bool,
}

impl ExecutableProvider {
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<String>,
        args: Vec<String>,
        env: BTreeMap<String, String>,
        work_dir: Option<PathBuf>,
        timeout_seconds: u64,
        interactive: bool,
    ) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            args,
            env,
            work_dir,
            timeout: Duration::from_secs(timeout_seconds),
            interactive,
        }
    }

    fn command(&self, request: &CompletionRequest) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.args(&self.args);
        cmd.envs(&self.env);
        if !request.system.is_empty() {
            cmd.env(SYSTEM_PROMPT_ENV, &request.system);
        }
        if let Some(dir) = &self.work_dir {
            cmd.current_dir(dir);
        }
        cmd.kill_on_drop(true);
        cmd
    }

    /// Interactive tools own the terminal; we hand over stdio and only
    /// report the exit status.
    async fn run_interactive(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        let mut cmd = self.command(&request);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = cmd.status().await?;
        if !status.success() {
            return match status.code() {
                Some(code) => Err(ProviderError::ExecFailed {
                    code,
                    stderr: String::new(),
                }),
                None => Err(ProviderError::ExecKilled),
            };
        }
        Ok(CompletionResponse {
            content: String::new(),
            model: self.executable.clone(),
            tokens: 0,
            duration: start.elapsed(),
        })
    }

    async fn run_captured(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let start = Instant::now();
        let mut cmd = self.command(&request);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(executable = %self.executable, "spawning provider subprocess");
        let mut child = cmd.spawn()?;
        let stdin = child.stdin.take();

        // The stdin feed must run concurrently with output collection and
        // inside the deadline: a prompt larger than the pipe buffers blocks
        // the writer until the child drains it, and the child in turn blocks
        // on stdout unless we are reading it at the same time.
        let feed = async {
            if let Some(mut stdin) = stdin {
                // A child that exits without reading breaks the pipe; the
                // exit status is the interesting error, not the write.
                let _ = stdin.write_all(request.prompt.as_bytes()).await;
                // Dropping stdin closes it so the child sees EOF.
            }
        };

        let run = async {
            let (_, output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(output) => output?,
            Err(_) => {
                // wait_with_output consumed the child; kill_on_drop already
                // reaped it when the future was dropped by the timeout.
                return Err(ProviderError::Timeout {
                    provider: self.name.clone(),
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return match output.status.code() {
                Some(code) => Err(ProviderError::ExecFailed { code, stderr }),
                None => Err(ProviderError::ExecKilled),
            };
        }

        Ok(CompletionResponse {
            content: String::from_utf8_lossy(&output.stdout).into_owned(),
            model: self.executable.clone(),
            tokens: 0,
            duration: start.elapsed(),
        })
    }
}

#[async_trait]
impl Provider for ExecutableProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn is_available(&self) -> bool {
        let path = PathBuf::from(&self.executable);
        if path.components().count() > 1 {
            return path.is_file();
        }
        which::which(&self.executable).is_ok()
    }

    async fn execute(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        if !self.is_available().await {
            return Err(ProviderError::NotAvailable(self.name.clone()));
        }
        if self.interactive {
            self.run_interactive(request).await
        } else {
            self.run_captured(request).await
        }
    }

    async fn execute_stream(&self, request: CompletionRequest) -> Result<ChunkStream> {
        // Subprocess tools have no incremental protocol; emit the whole
        // output as one chunk.
        let response = self.execute(request).await?;
        Ok(ChunkStream::single(response.content))
    }

    async fn models(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(args: &[&str], timeout_seconds: u64) -> ExecutableProvider {
        ExecutableProvider::new(
            "test-exec",
            "sh",
            args.iter().map(|s| s.to_string()).collect(),
            BTreeMap::new(),
            None,
            timeout_seconds,
            false,
        )
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let p = ExecutableProvider::new(
            "ghost",
            "forge-no-such-binary",
            vec![],
            BTreeMap::new(),
            None,
            5,
            false,
        );
        assert!(!p.is_available().await);

        let err = p.execute(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotAvailable(_)));
    }

    #[tokio::test]
    async fn prompt_is_piped_to_stdin() {
        let p = shell(&["-c", "cat"], 5);
        let response = p
            .execute(CompletionRequest::new("echo me back"))
            .await
            .unwrap();
        assert_eq!(response.content, "echo me back");
    }

    #[tokio::test]
    async fn system_prompt_arrives_via_env() {
        let p = shell(&["-c", "printf '%s' \"$FORGE_SYSTEM\""], 5);
        let response = p
            .execute(CompletionRequest::new("ignored").with_system("you are terse"))
            .await
            .unwrap();
        assert_eq!(response.content, "you are terse");
    }

    #[tokio::test]
    async fn nonzero_exit_carries_stderr() {
        let p = shell(&["-c", "echo boom >&2; exit 3"], 5);
        let err = p.execute(CompletionRequest::new("hi")).await.unwrap_err();
        match err {
            ProviderError::ExecFailed { code, stderr } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected ExecFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_child_times_out() {
        let p = shell(&["-c", "sleep 5"], 1);
        let err = p.execute(CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { seconds: 1, .. }));
    }

    #[tokio::test]
    async fn large_prompt_round_trips_through_stdin() {
        // Well past the OS pipe buffers, so the child must be drained while
        // the prompt is still being written.
        let prompt = "x".repeat(4 * 1024 * 1024);
        let p = shell(&["-c", "cat"], 30);
        let response = p.execute(CompletionRequest::new(prompt.clone())).await.unwrap();
        assert_eq!(response.content.len(), prompt.len());
    }

    #[tokio::test]
    async fn timeout_fires_while_stdin_write_is_blocked() {
        // The child never reads stdin, so the write stalls once the pipe
        // buffer fills; the deadline must still fire.
        let prompt = "x".repeat(4 * 1024 * 1024);
        let p = shell(&["-c", "sleep 5"], 1);
        let err = p.execute(CompletionRequest::new(prompt)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { seconds: 1, .. }));
    }

    #[tokio::test]
    async fn extra_env_is_forwarded() {
        let mut env = BTreeMap::new();
        env.insert("FORGE_TEST_VAR".to_string(), "forwarded".to_string());
        let p = ExecutableProvider::new(
            "test-exec",
            "sh",
            vec!["-c".into(), "printf '%s' \"$FORGE_TEST_VAR\"".into()],
            env,
            None,
            5,
            false,
        );
        let response = p.execute(CompletionRequest::new("hi")).await.unwrap();
        assert_eq!(response.content, "forwarded");
    }
}
