use std::fmt;

use thiserror::Error;

/// Failure of a single REST call, as seen at the HTTP boundary.
///
/// Variants only carry strings so that errors can live inside view state
/// snapshots, which are cloned on every read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("session is no longer valid")]
    Unauthorized,

    #[error("not allowed to reach this resource")]
    Forbidden,

    #[error("resource not found")]
    NotFound,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("invalid API url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden,
            404 => ApiError::NotFound,
            other => ApiError::Status(other),
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::from_status(status.as_u16())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::InvalidUrl(e.to_string())
    }
}

/// Which list a failed fetch was trying to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTarget {
    Conversation,
    Inbox,
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchTarget::Conversation => f.write_str("messages"),
            FetchTarget::Inbox => f.write_str("conversations"),
        }
    }
}

/// Where a failed send was started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOrigin {
    Composer,
    NewConversation,
}

impl SendOrigin {
    fn failure_text(&self) -> &'static str {
        match self {
            SendOrigin::Composer => "Failed to send message",
            SendOrigin::NewConversation => "User not found or you cannot message this user",
        }
    }
}

/// Errors surfaced to the user by the messaging views. They are never fatal:
/// views keep their previous state and show the error text as a banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("Failed to load {target}")]
    FetchFailed {
        target: FetchTarget,
        #[source]
        source: ApiError,
    },

    #[error("{}", .origin.failure_text())]
    SendFailed {
        origin: SendOrigin,
        #[source]
        source: ApiError,
    },
}

impl ViewError {
    pub fn fetch(target: FetchTarget, source: ApiError) -> Self {
        ViewError::FetchFailed { target, source }
    }

    pub fn send(origin: SendOrigin, source: ApiError) -> Self {
        ViewError::SendFailed { origin, source }
    }

    pub fn api_error(&self) -> &ApiError {
        match self {
            ViewError::FetchFailed { source, .. } | ViewError::SendFailed { source, .. } => source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available")]
    NoConfigDir,

    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not write config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid legacy config: {0}")]
    Legacy(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(ApiError::from_status(401), ApiError::Unauthorized);
        assert_eq!(ApiError::from_status(403), ApiError::Forbidden);
        assert_eq!(ApiError::from_status(404), ApiError::NotFound);
        assert_eq!(ApiError::from_status(502), ApiError::Status(502));
        assert!(ApiError::from_status(503).is_transient());
        assert!(!ApiError::NotFound.is_transient());
    }

    #[test]
    fn view_errors_keep_coarse_banner_text() {
        let fetch = ViewError::fetch(FetchTarget::Conversation, ApiError::Status(500));
        assert_eq!(fetch.to_string(), "Failed to load messages");

        let inbox = ViewError::fetch(FetchTarget::Inbox, ApiError::Transport("reset".into()));
        assert_eq!(inbox.to_string(), "Failed to load conversations");

        let send = ViewError::send(SendOrigin::Composer, ApiError::Forbidden);
        assert_eq!(send.to_string(), "Failed to send message");
        assert_eq!(send.api_error(), &ApiError::Forbidden);

        let start = ViewError::send(SendOrigin::NewConversation, ApiError::NotFound);
        assert_eq!(start.to_string(), "User not found or you cannot message this user");
    }
}
