use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single backend call. The facade never retries; whatever
/// went wrong is handed back to the caller as one of these.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid backend configuration: {0}")]
    InvalidConfig(String),

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("backend returned {status} for {url}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not encode request body: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout(),
            _ => false,
        }
    }

    /// Short text for a toast. FastAPI wraps errors as `{"detail": "..."}`,
    /// so that is unwrapped when present.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status, body, .. } => {
                let detail = serde_json::from_str::<serde_json::Value>(body)
                    .ok()
                    .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string));
                match detail {
                    Some(detail) => format!("{} ({})", detail, status.as_u16()),
                    None => format!("Backend error {}", status.as_u16()),
                }
            }
            Self::Transport { .. } if self.is_timeout() => "Request timed out".to_string(),
            Self::Transport { .. } => "Backend unreachable".to_string(),
            Self::Decode { .. } => "Unexpected response from backend".to_string(),
            Self::Encode(_) | Self::InvalidConfig(_) => self.to_string(),
        }
    }
}
