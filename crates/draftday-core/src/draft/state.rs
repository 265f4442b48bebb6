// Draft state: the draft row, its participants, pool and presence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::pick::Pick;
use super::slot;
use crate::error::EngineError;

/// Store-assigned draft identity.
pub type DraftId = i64;

/// Draft lifecycle status. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Scheduled,
    Live,
    Paused,
    Completed,
}

impl DraftStatus {
    /// Parse the lowercase storage form.
    pub fn from_str_status(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(DraftStatus::Scheduled),
            "live" => Some(DraftStatus::Live),
            "paused" => Some(DraftStatus::Paused),
            "completed" => Some(DraftStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DraftStatus::Scheduled => "scheduled",
            DraftStatus::Live => "live",
            DraftStatus::Paused => "paused",
            DraftStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub id: DraftId,
    pub name: String,
    pub status: DraftStatus,
    pub scheduled_at: DateTime<Utc>,
    /// Set the first time the draft goes live.
    pub started_at: Option<DateTime<Utc>>,
    /// Number of rounds, at least 1.
    pub round_count: u32,
    /// Seconds allowed per pick. 0 disables deadlines.
    pub pick_seconds: u32,
}

/// A drafting seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: String,
    pub label: String,
    /// 0-based seat; unique within the draft.
    pub draft_position: u32,
}

/// A claimable player in a draft's pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub name: String,
    /// Canonical ordering key supplied by the pool provider; ties broken by
    /// name. Lower comes first.
    pub rank: u32,
}

/// Heartbeat / readiness for one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub user_id: String,
    pub is_online: bool,
    pub is_ready: bool,
    pub last_seen_at: DateTime<Utc>,
}

/// Everything one engine decision needs about a draft, read in a single
/// transaction. Participants are ordered by seat, picks by overall pick,
/// pool by canonical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub draft: Draft,
    pub participants: Vec<Participant>,
    pub picks: Vec<Pick>,
    pub pool: Vec<PoolEntry>,
    pub presence: Vec<Presence>,
}

impl DraftSnapshot {
    pub fn participant_count(&self) -> u32 {
        self.participants.len() as u32
    }

    /// `round_count * participant_count`.
    pub fn total_picks(&self) -> Result<u32, EngineError> {
        slot::total_picks(self.participant_count(), self.draft.round_count)
    }

    pub fn picks_made(&self) -> u32 {
        self.picks.len() as u32
    }

    pub fn is_exhausted(&self) -> Result<bool, EngineError> {
        Ok(self.picks_made() >= self.total_picks()?)
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_picked(&self, player_name: &str) -> bool {
        self.picks.iter().any(|p| p.player_name == player_name)
    }

    /// First pool entry (in canonical order) that nobody has picked.
    pub fn first_available(&self) -> Option<&PoolEntry> {
        self.pool.iter().find(|entry| !self.is_picked(&entry.name))
    }

    /// Number of pool entries still unpicked.
    pub fn available_count(&self) -> usize {
        self.pool.iter().filter(|e| !self.is_picked(&e.name)).count()
    }
}
