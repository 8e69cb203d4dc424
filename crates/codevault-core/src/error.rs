//! Error types for Code Vault

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("team not found: {0}")]
    TeamNotFound(String),

    #[error("team already exists: {0}")]
    TeamExists(String),

    #[error("no level {level} for variant {variant}")]
    LevelNotFound { level: u32, variant: u32 },

    #[error("team locked: {0}")]
    TeamLocked(String),

    #[error("game is not active")]
    GameNotActive,

    #[error("event closed")]
    EventClosed,

    #[error("level {level}: attempt limit reached after {attempts} attempts")]
    AttemptsExhausted { level: u32, attempts: u32 },

    #[error("stale request: answered level {expected}, team is on level {current}")]
    StaleLevel { expected: u32, current: u32 },

    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    pub fn team_not_found(team: impl Into<String>) -> Self {
        Self::TeamNotFound(team.into())
    }

    pub fn storage(message: impl std::fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    pub fn invalid_catalog(message: impl Into<String>) -> Self {
        Self::InvalidCatalog(message.into())
    }

    /// Whether the error is a rejection of the request rather than a fault.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::TeamNotFound(_)
                | Self::TeamExists(_)
                | Self::TeamLocked(_)
                | Self::GameNotActive
                | Self::EventClosed
                | Self::AttemptsExhausted { .. }
                | Self::StaleLevel { .. }
                | Self::AuthFailed { .. }
        )
    }
}
