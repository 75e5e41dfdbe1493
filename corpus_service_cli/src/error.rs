use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("{url} is larger than {limit} bytes")]
    TooLarge { url: String, limit: usize },

    #[error("{0} answered with a bot protection page")]
    Blocked(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("no processable content found for {0}")]
    NoContent(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Whether running the same work again could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::Http(err) => {
                err.is_timeout()
                    || err.is_connect()
                    || err
                        .status()
                        .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
            }
            PipelineError::Fetch { .. } | PipelineError::Generation(_) => true,
            PipelineError::InvalidUrl { .. }
            | PipelineError::TooLarge { .. }
            | PipelineError::Blocked(_)
            | PipelineError::NoContent(_)
            | PipelineError::Io(_)
            | PipelineError::Json(_) => false,
        }
    }
}
