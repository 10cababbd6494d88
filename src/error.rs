use std::path::PathBuf;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    /// JSON payload could not be serialized.
    #[error("serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),
    /// A form field holds a value outside the supported shapes.
    #[error("unsupported value type for key {key}")]
    UnsupportedType { key: String },
    /// A file referenced by a multipart field could not be read.
    #[error("read form file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Target URL could not be parsed.
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// Header name or value rejected by the transport.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The per-attempt timeout elapsed before the response was read.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(reqwest::Error),
    /// The caller cancelled the request through its cancellation token.
    #[error("request cancelled")]
    Cancelled,
    /// Non-success HTTP status code with raw response body.
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
}

impl HttpClientError {
    /// Returns the HTTP status code for [`HttpClientError::Status`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure was caused by the per-attempt deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded(_))
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::DeadlineExceeded(err)
        } else {
            Self::Transport(err)
        }
    }
}
