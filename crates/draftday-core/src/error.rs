// Engine error taxonomy: fatal errors vs. business-rule rejections.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that abort an engine call. Business-rule violations are never
/// reported this way; they come back as a [`Rejection`] value.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed slot or pick-count input. Always a caller bug.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying store failed. The whole operation for the draft was
    /// rolled back.
    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Machine-readable reason a request was refused. Callers branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectCode {
    DraftNotFound,
    NotLive,
    NotParticipant,
    OutOfTurn,
    PickDeadlineExpired,
    PlayerUnavailable,
    InvalidStatusTransition,
}

impl RejectCode {
    /// The wire string for this code (e.g. `"OUT_OF_TURN"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectCode::DraftNotFound => "DRAFT_NOT_FOUND",
            RejectCode::NotLive => "NOT_LIVE",
            RejectCode::NotParticipant => "NOT_PARTICIPANT",
            RejectCode::OutOfTurn => "OUT_OF_TURN",
            RejectCode::PickDeadlineExpired => "PICK_DEADLINE_EXPIRED",
            RejectCode::PlayerUnavailable => "PLAYER_UNAVAILABLE",
            RejectCode::InvalidStatusTransition => "INVALID_STATUS_TRANSITION",
        }
    }

    /// Suggested HTTP status for an API layer sitting on top of the engine.
    pub fn http_status(&self) -> u16 {
        match self {
            RejectCode::DraftNotFound => 404,
            RejectCode::NotLive | RejectCode::PlayerUnavailable => 400,
            RejectCode::NotParticipant | RejectCode::OutOfTurn => 403,
            RejectCode::PickDeadlineExpired | RejectCode::InvalidStatusTransition => 409,
        }
    }
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused request: the code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: RejectCode,
    pub message: String,
}

impl Rejection {
    pub fn new(code: RejectCode, message: impl Into<String>) -> Self {
        Rejection {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
