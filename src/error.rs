use thiserror::Error;

/// Coarse classification of an [`Error`], used by callers to decide whether a
/// call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Network,
    Upstream,
    Decode,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("the field '{field}' is required")]
    MissingField { field: &'static str },

    #[error("invalid value for '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("HTTP request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("X API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("failed to decode user timeline: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingField { .. } | Error::InvalidField { .. } => ErrorKind::Config,
            Error::Network(_) => ErrorKind::Network,
            Error::Upstream { .. } => ErrorKind::Upstream,
            Error::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Whether repeating the same call could succeed. Authentication and
    /// bad-request responses are fatal until the caller changes something.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Upstream { status, .. } => !matches!(status, 400 | 401 | 403 | 404),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Network(e) if e.is_timeout())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
