// The engine's entry points. Every mutating call first lets automation catch
// the draft up to the clock, so state converges no matter which client or
// timer touched it last.

pub mod automation;
pub mod control;
pub mod submission;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::Database;
use crate::draft::deadline::resolve_current_deadline;
use crate::draft::slot::{resolve_next_pick, NextPick};
use crate::draft::state::{DraftId, DraftSnapshot};
use crate::error::{EngineError, RejectCode};

pub use automation::AutomationReport;
pub use control::{PresenceOutcome, StatusOutcome, StatusRequest};
pub use submission::{PickOutcome, PickRequest, PickResponse};

/// Settings the engine needs from its surroundings.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Heartbeats older than this count as offline for the presence gate.
    /// `None` disables the check.
    pub presence_stale_after: Option<Duration>,
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        EngineConfig {
            presence_stale_after: config.presence_stale_after(),
        }
    }
}

/// Read-only view of a draft for clients.
#[derive(Debug, Clone, Serialize)]
pub struct DraftView {
    #[serde(flatten)]
    pub snapshot: DraftSnapshot,
    pub current_deadline: Option<DateTime<Utc>>,
    pub next_pick: Option<NextPick>,
}

/// Draft turn engine over a shared store.
pub struct Engine<C: Clock = SystemClock> {
    db: Arc<Database>,
    clock: C,
    config: EngineConfig,
}

impl<C: Clock> Engine<C> {
    pub fn new(db: Arc<Database>, clock: C, config: EngineConfig) -> Self {
        Engine { db, clock, config }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Catch one draft, or every due draft, up to now. Also the entry point
    /// for the periodic trigger.
    pub fn process_due_drafts(
        &self,
        draft_id: Option<DraftId>,
    ) -> Result<AutomationReport, EngineError> {
        automation::process_due_drafts(&self.db, &self.clock, draft_id)
    }

    /// Submit a human pick. If it is refused because the deadline lapsed,
    /// automation runs again so the draft moves past the expired slot.
    pub fn submit_pick(&self, req: &PickRequest) -> Result<PickOutcome, EngineError> {
        self.process_due_drafts(Some(req.draft_id))?;
        let outcome = submission::submit_pick(&self.db, &self.clock, req)?;
        if outcome.rejection_code() == Some(RejectCode::PickDeadlineExpired) {
            debug!(
                "Pick by {} in draft {} hit an expired deadline; running automation",
                req.user_label, req.draft_id
            );
            self.process_due_drafts(Some(req.draft_id))?;
        }
        Ok(outcome)
    }

    pub fn set_status(&self, req: &StatusRequest) -> Result<StatusOutcome, EngineError> {
        self.process_due_drafts(Some(req.draft_id))?;
        control::set_status(
            &self.db,
            &self.clock,
            req,
            self.config.presence_stale_after,
        )
    }

    /// Mark a participant online and seen now.
    pub fn heartbeat(&self, draft_id: DraftId, user_id: &str) -> Result<PresenceOutcome, EngineError> {
        self.process_due_drafts(Some(draft_id))?;
        control::record_presence(&self.db, &self.clock, draft_id, user_id, None)
    }

    /// Toggle a participant's readiness (also counts as a heartbeat).
    pub fn set_ready(
        &self,
        draft_id: DraftId,
        user_id: &str,
        ready: bool,
    ) -> Result<PresenceOutcome, EngineError> {
        self.process_due_drafts(Some(draft_id))?;
        control::record_presence(&self.db, &self.clock, draft_id, user_id, Some(ready))
    }

    /// Current state of a draft with its live deadline and who is on the
    /// clock. Does not run automation.
    pub fn view(&self, draft_id: DraftId) -> Result<Option<DraftView>, EngineError> {
        let Some(snapshot) = self.db.load_snapshot(draft_id)? else {
            return Ok(None);
        };
        let current_deadline = resolve_current_deadline(
            snapshot.draft.pick_seconds,
            snapshot.draft.status,
            snapshot.draft.started_at,
            &snapshot.picks,
        );
        let next_pick = if snapshot.participants.len() >= 2 {
            resolve_next_pick(
                &snapshot.participants,
                &snapshot.picks,
                snapshot.draft.round_count,
            )?
        } else {
            None
        };
        Ok(Some(DraftView {
            snapshot,
            current_deadline,
            next_pick,
        }))
    }
}
