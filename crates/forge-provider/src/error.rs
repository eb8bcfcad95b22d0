use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend is not configured or not reachable. `execute` checks this
    /// itself, so callers that skip `is_available()` still get a clean error.
    #[error("provider {0} is not available")]
    NotAvailable(String),

    #[error("{provider} returned status {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} timed out after {seconds}s")]
    Timeout { provider: String, seconds: u64 },

    #[error("executable failed with exit code {code}: {stderr}")]
    ExecFailed { code: i32, stderr: String },

    #[error("executable terminated by signal")]
    ExecKilled,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
