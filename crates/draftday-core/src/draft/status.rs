// Draft status lifecycle: which transitions are legal, and the one side
// effect of going live (stamping `started_at`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::{Draft, DraftStatus};
use crate::error::{RejectCode, Rejection};

/// A legal status change, ready to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: DraftStatus,
    pub to: DraftStatus,
    /// `started_at` after the change.
    pub started_at: Option<DateTime<Utc>>,
}

/// Whether `from -> to` is in the transition table. Same-state is allowed.
pub fn is_legal_transition(from: DraftStatus, to: DraftStatus) -> bool {
    use DraftStatus::*;
    from == to
        || matches!(
            (from, to),
            (Scheduled, Live)
                | (Scheduled, Completed)
                | (Live, Paused)
                | (Live, Completed)
                | (Paused, Live)
                | (Paused, Completed)
        )
}

/// Validate moving `draft` to `to`.
///
/// Returns `Ok(None)` for a same-state no-op. Entering `live` from another
/// state requires `gate_open` (see [`super::presence::may_go_live`]).
pub fn plan_status_change(
    draft: &Draft,
    to: DraftStatus,
    gate_open: bool,
    now: DateTime<Utc>,
) -> Result<Option<StatusChange>, Rejection> {
    let from = draft.status;
    if from == to {
        return Ok(None);
    }
    if !is_legal_transition(from, to) {
        return Err(Rejection::new(
            RejectCode::InvalidStatusTransition,
            format!("cannot move draft from {from} to {to}"),
        ));
    }
    if to == DraftStatus::Live && !gate_open {
        return Err(Rejection::new(
            RejectCode::InvalidStatusTransition,
            "all participants must be online and ready before the draft can go live",
        ));
    }

    let started_at = if to == DraftStatus::Live {
        draft.started_at.or(Some(now))
    } else {
        draft.started_at
    };

    Ok(Some(StatusChange {
        from,
        to,
        started_at,
    }))
}
