// Pick submission: validate and commit one human pick atomically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::db::Database;
use crate::draft::deadline::{is_expired, resolve_current_deadline};
use crate::draft::pick::{Pick, PickActor};
use crate::draft::slot::resolve_next_pick;
use crate::draft::state::{DraftId, DraftSnapshot, DraftStatus};
use crate::draft::status::plan_status_change;
use crate::error::{EngineError, RejectCode, Rejection};

/// A human's attempt to claim a player for the pick on the clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRequest {
    pub draft_id: DraftId,
    pub user_id: String,
    /// Display name used in messages and logs.
    pub user_label: String,
    pub player_name: String,
}

/// Result of a pick submission that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Accepted(Pick),
    Rejected(Rejection),
}

impl PickOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PickOutcome::Accepted(_))
    }

    pub fn rejection_code(&self) -> Option<RejectCode> {
        match self {
            PickOutcome::Accepted(_) => None,
            PickOutcome::Rejected(r) => Some(r.code),
        }
    }

    /// The `{ ok, code?, error? }` shape handed to API clients.
    pub fn to_response(&self) -> PickResponse {
        match self {
            PickOutcome::Accepted(_) => PickResponse {
                ok: true,
                code: None,
                error: None,
            },
            PickOutcome::Rejected(r) => PickResponse {
                ok: false,
                code: Some(r.code),
                error: Some(r.message.clone()),
            },
        }
    }
}

/// Wire form of a [`PickOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<RejectCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Validate and commit `req` in one immediate transaction.
///
/// Concurrent submissions for the same slot serialize on the transaction;
/// the first valid one commits and the rest re-read the advanced draft and
/// are rejected with a precondition code.
pub fn submit_pick(
    db: &Database,
    clock: &dyn Clock,
    req: &PickRequest,
) -> Result<PickOutcome, EngineError> {
    db.with_draft_tx(|tx| {
        let now = clock.now();
        let Some(snap) = tx.load_snapshot(req.draft_id)? else {
            return Ok(PickOutcome::Rejected(Rejection::new(
                RejectCode::DraftNotFound,
                format!("draft {} not found", req.draft_id),
            )));
        };

        let pick = match validate_pick(&snap, req, now)? {
            PickOutcome::Accepted(pick) => pick,
            rejected => return Ok(rejected),
        };

        tx.insert_pick(&pick)?;
        debug!(
            "{} picked {} (draft {}, pick {})",
            req.user_label, pick.player_name, pick.draft_id, pick.overall_pick
        );

        if pick.overall_pick >= snap.total_picks()? {
            if let Ok(Some(change)) =
                plan_status_change(&snap.draft, DraftStatus::Completed, true, now)
            {
                tx.apply_status(req.draft_id, &change)?;
                info!(
                    "Draft {} completed with final pick by {}",
                    req.draft_id, req.user_label
                );
            }
        }

        Ok(PickOutcome::Accepted(pick))
    })
}

/// Run the precondition checks in order. Returns the pick to insert, or the
/// first rejection.
pub fn validate_pick(
    snap: &DraftSnapshot,
    req: &PickRequest,
    now: DateTime<Utc>,
) -> Result<PickOutcome, EngineError> {
    let reject = |code, message: String| Ok(PickOutcome::Rejected(Rejection::new(code, message)));

    if snap.draft.status != DraftStatus::Live {
        return reject(
            RejectCode::NotLive,
            format!("draft is {}, not live", snap.draft.status),
        );
    }

    if snap.participant(&req.user_id).is_none() {
        return reject(
            RejectCode::NotParticipant,
            format!("{} is not a participant in this draft", req.user_label),
        );
    }

    let Some(next) = resolve_next_pick(&snap.participants, &snap.picks, snap.draft.round_count)?
    else {
        return reject(RejectCode::OutOfTurn, "all picks have been made".into());
    };
    if next.user_id != req.user_id {
        return reject(
            RejectCode::OutOfTurn,
            format!(
                "pick {} belongs to {}, not {}",
                next.slot.overall_pick, next.label, req.user_label
            ),
        );
    }

    let deadline = resolve_current_deadline(
        snap.draft.pick_seconds,
        snap.draft.status,
        snap.draft.started_at,
        &snap.picks,
    );
    if let Some(deadline) = deadline.filter(|&d| is_expired(Some(d), now)) {
        return reject(
            RejectCode::PickDeadlineExpired,
            format!(
                "the deadline for pick {} passed at {}",
                next.slot.overall_pick,
                deadline.to_rfc3339()
            ),
        );
    }

    if !snap.pool.iter().any(|e| e.name == req.player_name) {
        return reject(
            RejectCode::PlayerUnavailable,
            format!("{} is not in this draft's pool", req.player_name),
        );
    }
    if snap.is_picked(&req.player_name) {
        return reject(
            RejectCode::PlayerUnavailable,
            format!("{} has already been picked", req.player_name),
        );
    }

    Ok(PickOutcome::Accepted(Pick {
        draft_id: snap.draft.id,
        overall_pick: next.slot.overall_pick,
        round_number: next.slot.round_number,
        round_pick: next.slot.round_pick,
        participant_user_id: next.user_id,
        player_name: req.player_name.clone(),
        picked_by: PickActor::User(req.user_id.clone()),
        picked_at: now,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::db::NewDraft;
    use crate::draft::state::PoolEntry;
    use crate::engine::automation::process_due_drafts;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0).unwrap()
    }

    /// Helper: a live two-seat (alice, bob), two-round draft with a
    /// 60-second clock, started at `t0`.
    fn live_draft() -> (Database, DraftId, ManualClock) {
        let db = Database::open(":memory:").unwrap();
        let id = db
            .create_draft(&NewDraft {
                name: "Heads Up".into(),
                scheduled_at: t0(),
                round_count: 2,
                pick_seconds: 60,
                participants: vec![
                    ("alice".into(), "Alice".into()),
                    ("bob".into(), "Bob".into()),
                ],
            })
            .unwrap();
        db.import_pool(
            id,
            &["Judge", "Ohtani", "Soto", "Witt", "Skubal"]
                .iter()
                .enumerate()
                .map(|(i, n)| PoolEntry {
                    name: n.to_string(),
                    rank: i as u32,
                })
                .collect::<Vec<_>>(),
        )
        .unwrap();
        let clock = ManualClock::new(t0());
        process_due_drafts(&db, &clock, Some(id)).unwrap();
        (db, id, clock)
    }

    fn req(id: DraftId, user: &str, player: &str) -> PickRequest {
        PickRequest {
            draft_id: id,
            user_id: user.into(),
            user_label: user.to_uppercase(),
            player_name: player.into(),
        }
    }

    fn code(outcome: &PickOutcome) -> Option<RejectCode> {
        outcome.rejection_code()
    }

    // ------------------------------------------------------------------
    // Happy path
    // ------------------------------------------------------------------

    #[test]
    fn accepted_pick_is_stored_with_human_actor() {
        let (db, id, clock) = live_draft();
        clock.advance(Duration::seconds(12));

        let outcome = submit_pick(&db, &clock, &req(id, "alice", "Soto")).unwrap();
        let PickOutcome::Accepted(pick) = outcome else {
            panic!("expected acceptance, got {outcome:?}");
        };
        assert_eq!(pick.overall_pick, 1);
        assert_eq!(pick.round_number, 1);
        assert_eq!(pick.round_pick, 1);
        assert_eq!(pick.participant_user_id, "alice");
        assert_eq!(pick.picked_by, PickActor::User("alice".into()));
        assert_eq!(pick.picked_at, t0() + Duration::seconds(12));

        assert_eq!(db.load_picks(id).unwrap(), vec![pick]);
    }

    #[test]
    fn final_pick_completes_the_draft() {
        let (db, id, clock) = live_draft();
        // Snake: alice, bob, bob, alice.
        for (user, player) in [
            ("alice", "Judge"),
            ("bob", "Ohtani"),
            ("bob", "Soto"),
            ("alice", "Witt"),
        ] {
            let outcome = submit_pick(&db, &clock, &req(id, user, player)).unwrap();
            assert!(outcome.is_accepted(), "{user} {player}: {outcome:?}");
        }

        let snap = db.load_snapshot(id).unwrap().unwrap();
        assert_eq!(snap.draft.status, DraftStatus::Completed);
        assert_eq!(snap.picks.len(), 4);
    }

    // ------------------------------------------------------------------
    // Preconditions, in order
    // ------------------------------------------------------------------

    #[test]
    fn missing_draft() {
        let (db, _, clock) = live_draft();
        let outcome = submit_pick(&db, &clock, &req(404, "alice", "Judge")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::DraftNotFound));
    }

    #[test]
    fn draft_not_live() {
        let db = Database::open(":memory:").unwrap();
        let id = db
            .create_draft(&NewDraft {
                name: "Later".into(),
                scheduled_at: t0() + Duration::days(1),
                round_count: 1,
                pick_seconds: 60,
                participants: vec![("alice".into(), "A".into()), ("bob".into(), "B".into())],
            })
            .unwrap();
        let clock = ManualClock::new(t0());
        let outcome = submit_pick(&db, &clock, &req(id, "alice", "Judge")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::NotLive));
    }

    #[test]
    fn non_participant() {
        let (db, id, clock) = live_draft();
        let outcome = submit_pick(&db, &clock, &req(id, "mallory", "Judge")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::NotParticipant));
    }

    #[test]
    fn out_of_turn() {
        let (db, id, clock) = live_draft();
        let outcome = submit_pick(&db, &clock, &req(id, "bob", "Judge")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::OutOfTurn));
        assert!(db.load_picks(id).unwrap().is_empty());
    }

    #[test]
    fn deadline_expired() {
        let (db, id, clock) = live_draft();
        clock.advance(Duration::seconds(60));
        let outcome = submit_pick(&db, &clock, &req(id, "alice", "Judge")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::PickDeadlineExpired));
        assert!(db.load_picks(id).unwrap().is_empty());
    }

    #[test]
    fn out_of_turn_is_reported_before_deadline() {
        let (db, id, clock) = live_draft();
        clock.advance(Duration::seconds(90));
        let outcome = submit_pick(&db, &clock, &req(id, "bob", "Judge")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::OutOfTurn));
    }

    #[test]
    fn player_not_in_pool() {
        let (db, id, clock) = live_draft();
        let outcome = submit_pick(&db, &clock, &req(id, "alice", "Babe Ruth")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::PlayerUnavailable));
    }

    #[test]
    fn player_already_picked() {
        let (db, id, clock) = live_draft();
        assert!(submit_pick(&db, &clock, &req(id, "alice", "Judge"))
            .unwrap()
            .is_accepted());
        let outcome = submit_pick(&db, &clock, &req(id, "bob", "Judge")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::PlayerUnavailable));
    }

    #[test]
    fn resubmitting_a_committed_pick_fails_cleanly() {
        let (db, id, clock) = live_draft();
        let request = req(id, "alice", "Judge");
        assert!(submit_pick(&db, &clock, &request).unwrap().is_accepted());

        let again = submit_pick(&db, &clock, &request).unwrap();
        assert_eq!(code(&again), Some(RejectCode::OutOfTurn));
        assert_eq!(db.load_picks(id).unwrap().len(), 1);
    }

    #[test]
    fn completed_draft_is_not_live() {
        let (db, id, clock) = live_draft();
        for (user, player) in [
            ("alice", "Judge"),
            ("bob", "Ohtani"),
            ("bob", "Soto"),
            ("alice", "Witt"),
        ] {
            submit_pick(&db, &clock, &req(id, user, player)).unwrap();
        }
        let outcome = submit_pick(&db, &clock, &req(id, "bob", "Skubal")).unwrap();
        assert_eq!(code(&outcome), Some(RejectCode::NotLive));
    }

    // ------------------------------------------------------------------
    // Wire shape
    // ------------------------------------------------------------------

    #[test]
    fn response_shape() {
        let (db, id, clock) = live_draft();

        let rejected = submit_pick(&db, &clock, &req(id, "bob", "Judge")).unwrap();
        let json = serde_json::to_value(rejected.to_response()).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["code"], "OUT_OF_TURN");
        assert!(json["error"].as_str().unwrap().contains("Alice"));

        let accepted = submit_pick(&db, &clock, &req(id, "alice", "Judge")).unwrap();
        let json = serde_json::to_value(accepted.to_response()).unwrap();
        assert_eq!(json, serde_json::json!({"ok": true}));
    }
}
