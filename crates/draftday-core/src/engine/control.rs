// Status changes and presence updates requested by participants or admins.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::db::Database;
use crate::draft::presence::{effective_presence, may_go_live};
use crate::draft::state::{DraftId, DraftStatus};
use crate::draft::status::plan_status_change;
use crate::error::{EngineError, RejectCode, Rejection};

/// Request to move a draft to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub draft_id: DraftId,
    pub target: DraftStatus,
    /// Skip the presence gate when going live. Only the API layer knows
    /// whether the caller is allowed to set this.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Changed { from: DraftStatus, to: DraftStatus },
    Unchanged,
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceOutcome {
    Recorded,
    Rejected(Rejection),
}

fn draft_not_found(draft_id: DraftId) -> Rejection {
    Rejection::new(
        RejectCode::DraftNotFound,
        format!("draft {draft_id} not found"),
    )
}

/// Apply a status change under the draft's transaction.
pub fn set_status(
    db: &Database,
    clock: &dyn Clock,
    req: &StatusRequest,
    stale_after: Option<Duration>,
) -> Result<StatusOutcome, EngineError> {
    db.with_draft_tx(|tx| {
        let now = clock.now();
        let Some(snap) = tx.load_snapshot(req.draft_id)? else {
            return Ok(StatusOutcome::Rejected(draft_not_found(req.draft_id)));
        };

        let presence = effective_presence(&snap.presence, now, stale_after);
        let gate_open = may_go_live(&snap.participants, &presence, req.force);

        match plan_status_change(&snap.draft, req.target, gate_open, now) {
            Ok(Some(change)) => {
                tx.apply_status(req.draft_id, &change)?;
                info!(
                    "Draft {} moved from {} to {}{}",
                    req.draft_id,
                    change.from,
                    change.to,
                    if req.force { " (forced)" } else { "" }
                );
                Ok(StatusOutcome::Changed {
                    from: change.from,
                    to: change.to,
                })
            }
            Ok(None) => Ok(StatusOutcome::Unchanged),
            Err(rejection) => Ok(StatusOutcome::Rejected(rejection)),
        }
    })
}

/// Record a heartbeat (`ready = None`) or a ready toggle for a participant.
pub fn record_presence(
    db: &Database,
    clock: &dyn Clock,
    draft_id: DraftId,
    user_id: &str,
    ready: Option<bool>,
) -> Result<PresenceOutcome, EngineError> {
    db.with_draft_tx(|tx| {
        let now = clock.now();
        let Some(snap) = tx.load_snapshot(draft_id)? else {
            return Ok(PresenceOutcome::Rejected(draft_not_found(draft_id)));
        };
        if snap.participant(user_id).is_none() {
            return Ok(PresenceOutcome::Rejected(Rejection::new(
                RejectCode::NotParticipant,
                format!("{user_id} is not a participant in this draft"),
            )));
        }

        tx.upsert_presence(draft_id, user_id, ready, now)?;
        Ok(PresenceOutcome::Recorded)
    })
}
