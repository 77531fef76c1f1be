use thiserror::Error;

/// Chat and token endpoint failures.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(u16),

    #[error("chat endpoint returned an empty reply")]
    EmptyReply,

    #[error("token endpoint returned an empty token")]
    EmptyToken,
}

/// Avatar SDK failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AvatarError {
    #[error("no active avatar session")]
    NoSession,

    #[error("avatar SDK error: {0}")]
    Sdk(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognizerError {
    #[error("speech recognition is not supported")]
    Unsupported,

    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("recognizer error: {0}")]
    Device(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("host bus closed")]
    Closed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Why an avatar session could not be brought up.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("token fetch failed: {0}")]
    Token(#[from] ServiceError),

    #[error("session start failed: {0}")]
    Avatar(#[from] AvatarError),
}
