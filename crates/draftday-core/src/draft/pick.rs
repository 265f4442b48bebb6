// Individual pick representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::DraftId;

/// Who committed a pick.
///
/// A pick is always made *for* the participant whose turn it is; the actor
/// records who actually submitted it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "lowercase")]
pub enum PickActor {
    /// A human submitted the pick.
    User(String),
    /// The automation processor picked after the deadline lapsed.
    System,
}

impl PickActor {
    /// Storage tag for the `picked_by_kind` column.
    pub fn kind_str(&self) -> &'static str {
        match self {
            PickActor::User(_) => "user",
            PickActor::System => "system",
        }
    }

    /// Rebuild an actor from its stored columns. Returns `None` for an
    /// unknown kind or a `user` row missing its id.
    pub fn from_parts(kind: &str, user_id: Option<String>) -> Option<Self> {
        match (kind, user_id) {
            ("user", Some(id)) => Some(PickActor::User(id)),
            ("system", _) => Some(PickActor::System),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            PickActor::User(id) => Some(id),
            PickActor::System => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, PickActor::System)
    }
}

impl fmt::Display for PickActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickActor::User(id) => write!(f, "user:{id}"),
            PickActor::System => f.write_str("system"),
        }
    }
}

/// A committed pick. Never updated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pick {
    pub draft_id: DraftId,
    /// 1-based position in the whole draft. Gapless and unique per draft.
    pub overall_pick: u32,
    pub round_number: u32,
    /// 1-based position within the round.
    pub round_pick: u32,
    /// The participant whose turn this was.
    pub participant_user_id: String,
    pub player_name: String,
    pub picked_by: PickActor,
    pub picked_at: DateTime<Utc>,
}

impl Pick {
    pub fn is_auto_pick(&self) -> bool {
        self.picked_by.is_system()
    }
}
