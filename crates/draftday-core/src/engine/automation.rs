// Automation: start drafts whose time has come and auto-pick through lapsed
// deadlines, so a draft's stored state always catches up to the clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::db::{Database, DraftTx};
use crate::draft::deadline::{is_expired, resolve_current_deadline};
use crate::draft::pick::{Pick, PickActor};
use crate::draft::presence::may_go_live;
use crate::draft::slot::resolve_next_pick;
use crate::draft::state::{DraftId, DraftSnapshot, DraftStatus};
use crate::draft::status::plan_status_change;
use crate::error::EngineError;

/// What one automation pass did. Advisory only.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationReport {
    pub started_drafts: u32,
    pub auto_picks: u32,
    pub completed_drafts: u32,
    /// Drafts skipped because their transaction failed (sweep mode only).
    pub failed_drafts: u32,
}

impl AutomationReport {
    pub fn is_empty(&self) -> bool {
        *self == AutomationReport::default()
    }

    fn absorb(&mut self, other: AutomationReport) {
        self.started_drafts += other.started_drafts;
        self.auto_picks += other.auto_picks;
        self.completed_drafts += other.completed_drafts;
        self.failed_drafts += other.failed_drafts;
    }
}

/// Catch one draft (or, with `None`, every due draft) up to the present.
///
/// With a specific `draft_id`, a store failure is returned to the caller.
/// In sweep mode each draft runs in its own transaction; a failing draft is
/// logged and counted but does not stop the rest. Unknown drafts are a no-op.
pub fn process_due_drafts(
    db: &Database,
    clock: &dyn Clock,
    draft_id: Option<DraftId>,
) -> Result<AutomationReport, EngineError> {
    if let Some(id) = draft_id {
        return process_draft(db, clock, id);
    }

    let mut report = AutomationReport::default();
    for id in db.list_due_draft_ids(clock.now())? {
        match process_draft(db, clock, id) {
            Ok(r) => report.absorb(r),
            Err(e) => {
                error!("Automation failed for draft {}: {}", id, e);
                report.failed_drafts += 1;
            }
        }
    }
    Ok(report)
}

/// One draft, one transaction.
fn process_draft(
    db: &Database,
    clock: &dyn Clock,
    draft_id: DraftId,
) -> Result<AutomationReport, EngineError> {
    db.with_draft_tx(|tx| {
        let now = clock.now();
        let mut report = AutomationReport::default();
        let Some(mut snap) = tx.load_snapshot(draft_id)? else {
            return Ok(report);
        };

        if snap.draft.status == DraftStatus::Scheduled && snap.draft.scheduled_at <= now {
            // Automated starts bypass the readiness gate.
            let gate_open = may_go_live(&snap.participants, &snap.presence, true);
            if transition(tx, &mut snap, DraftStatus::Live, gate_open, now)? {
                info!(
                    "Draft {} ({}) started automatically at {}",
                    draft_id, snap.draft.name, now
                );
                report.started_drafts += 1;
            }
        }

        if snap.draft.status != DraftStatus::Live {
            return Ok(report);
        }

        report.auto_picks = catch_up(tx, &mut snap, now)?;

        let exhausted = snap.is_exhausted()?;
        let pool_empty = !exhausted && snap.first_available().is_none();
        if pool_empty {
            warn!(
                "Draft {} has {} picks left but no available players; completing it",
                draft_id,
                snap.total_picks()? - snap.picks_made()
            );
        }
        if (exhausted || pool_empty)
            && transition(tx, &mut snap, DraftStatus::Completed, true, now)?
        {
            info!(
                "Draft {} completed after {} picks",
                draft_id,
                snap.picks_made()
            );
            report.completed_drafts += 1;
        }

        Ok(report)
    })
}

/// Auto-pick every slot whose deadline has lapsed by `now`. Each auto-pick is
/// stamped at the deadline it replaces, so the following deadline is measured
/// from that instant and a long-idle draft catches up in one pass.
fn catch_up(
    tx: &DraftTx<'_>,
    snap: &mut DraftSnapshot,
    now: DateTime<Utc>,
) -> Result<u32, EngineError> {
    let mut made = 0;
    loop {
        let deadline = resolve_current_deadline(
            snap.draft.pick_seconds,
            snap.draft.status,
            snap.draft.started_at,
            &snap.picks,
        );
        if !is_expired(deadline, now) {
            break;
        }
        let Some(deadline) = deadline else {
            break;
        };
        let Some(next) =
            resolve_next_pick(&snap.participants, &snap.picks, snap.draft.round_count)?
        else {
            break;
        };
        let Some(player) = snap.first_available().map(|e| e.name.clone()) else {
            break;
        };

        let pick = Pick {
            draft_id: snap.draft.id,
            overall_pick: next.slot.overall_pick,
            round_number: next.slot.round_number,
            round_pick: next.slot.round_pick,
            participant_user_id: next.user_id,
            player_name: player,
            picked_by: PickActor::System,
            picked_at: deadline,
        };
        tx.insert_pick(&pick)?;
        debug!(
            "Auto-picked {} for {} (draft {}, pick {})",
            pick.player_name, next.label, pick.draft_id, pick.overall_pick
        );
        snap.picks.push(pick);
        made += 1;
    }
    Ok(made)
}

/// Apply a status change to both the store and the in-memory snapshot.
/// Returns `false` for a no-op or a refused transition.
fn transition(
    tx: &DraftTx<'_>,
    snap: &mut DraftSnapshot,
    to: DraftStatus,
    gate_open: bool,
    now: DateTime<Utc>,
) -> Result<bool, EngineError> {
    match plan_status_change(&snap.draft, to, gate_open, now) {
        Ok(Some(change)) => {
            tx.apply_status(snap.draft.id, &change)?;
            snap.draft.status = change.to;
            snap.draft.started_at = change.started_at;
            Ok(true)
        }
        Ok(None) => Ok(false),
        Err(rejection) => {
            warn!(
                "Automation could not move draft {} to {}: {}",
                snap.draft.id, to, rejection
            );
            Ok(false)
        }
    }
}
