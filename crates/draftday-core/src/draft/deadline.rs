// Pick deadline: when the pick currently on the clock expires.

use chrono::{DateTime, Duration, Utc};

use super::pick::Pick;
use super::state::DraftStatus;

/// The instant the current pick expires, or `None` when no deadline applies
/// (draft not live, deadlines disabled, or nothing to anchor on).
///
/// The anchor is the most recent pick's timestamp, falling back to
/// `started_at` before the first pick.
pub fn resolve_current_deadline(
    pick_seconds: u32,
    status: DraftStatus,
    started_at: Option<DateTime<Utc>>,
    picks: &[Pick],
) -> Option<DateTime<Utc>> {
    if status != DraftStatus::Live || pick_seconds == 0 {
        return None;
    }
    let anchor = picks.last().map(|p| p.picked_at).or(started_at)?;
    Some(anchor + Duration::seconds(i64::from(pick_seconds)))
}

/// A deadline has passed once `now` reaches it.
pub fn is_expired(deadline: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    deadline.is_some_and(|d| now >= d)
}
