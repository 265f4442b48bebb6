// Presence gate: may a draft go live given who is online and ready?

use chrono::{DateTime, Duration, Utc};

use super::state::{Participant, Presence};

/// True when `force` is set, or when every participant is online and ready.
/// A participant with no presence row counts as absent.
pub fn may_go_live(participants: &[Participant], presence: &[Presence], force: bool) -> bool {
    if force {
        return true;
    }
    participants.iter().all(|p| {
        presence
            .iter()
            .find(|row| row.user_id == p.user_id)
            .is_some_and(|row| row.is_online && row.is_ready)
    })
}

/// Apply the stale window: rows whose last heartbeat is older than
/// `stale_after` are reported offline. `None` keeps rows as stored.
pub fn effective_presence(
    presence: &[Presence],
    now: DateTime<Utc>,
    stale_after: Option<Duration>,
) -> Vec<Presence> {
    presence
        .iter()
        .map(|row| {
            let stale = stale_after.is_some_and(|window| now - row.last_seen_at > window);
            Presence {
                is_online: row.is_online && !stale,
                ..row.clone()
            }
        })
        .collect()
}
