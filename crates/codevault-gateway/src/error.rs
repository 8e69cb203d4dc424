//! Mapping from engine errors to HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codevault_core::Error;
use serde_json::json;
use tracing::{debug, error};

pub enum ApiError {
    Engine(Error),
    /// Admin route called without a matching admin id.
    AdminRequired,
    BadRequest(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Engine(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AdminRequired => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Engine(e) => match e {
                Error::TeamNotFound(_) | Error::LevelNotFound { .. } => StatusCode::NOT_FOUND,
                Error::TeamLocked(_)
                | Error::GameNotActive
                | Error::EventClosed
                | Error::AttemptsExhausted { .. } => StatusCode::FORBIDDEN,
                Error::AuthFailed { .. } => StatusCode::UNAUTHORIZED,
                Error::StaleLevel { .. } | Error::TeamExists(_) => StatusCode::CONFLICT,
                Error::InvalidCatalog(_)
                | Error::Config(_)
                | Error::Storage(_)
                | Error::Io(_)
                | Error::Json(_)
                | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn status_label(&self) -> &'static str {
        match self {
            Self::Engine(Error::TeamLocked(_)) => "LOCKED",
            _ => "FAIL",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::AdminRequired => "ADMIN ACCESS REQUIRED".into(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Engine(e) => match e {
                Error::TeamNotFound(_) => "Team not found".into(),
                Error::TeamLocked(_) => "LOCKED OUT".into(),
                Error::GameNotActive => "GAME NOT STARTED".into(),
                Error::EventClosed => "EVENT CLOSED".into(),
                Error::AttemptsExhausted { .. } => "NO ATTEMPTS LEFT".into(),
                Error::AuthFailed { .. } => "INVALID CREDENTIALS".into(),
                Error::StaleLevel { current, .. } => {
                    format!("Level already answered. Current level is {current}.")
                }
                Error::TeamExists(id) => format!("Team {id} already exists"),
                // Internal details stay in the log.
                _ => "Internal error".into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Engine(e) = &self {
            if e.is_rejection() {
                debug!("request rejected: {}", e);
            } else {
                error!("request failed: {}", e);
            }
        }
        let body = json!({
            "status": self.status_label(),
            "message": self.message(),
        });
        (status, Json(body)).into_response()
    }
}
