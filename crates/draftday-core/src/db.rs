// SQLite persistence layer for drafts, participants, pools, picks and presence.

use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::draft::pick::{Pick, PickActor};
use crate::draft::state::{
    Draft, DraftId, DraftSnapshot, DraftStatus, Participant, PoolEntry, Presence,
};
use crate::draft::status::StatusChange;

/// Input for creating a draft together with its participants.
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub name: String,
    pub scheduled_at: DateTime<Utc>,
    pub round_count: u32,
    pub pick_seconds: u32,
    /// `(user_id, label)` in seat order; index becomes `draft_position`.
    pub participants: Vec<(String, String)>,
}

/// How long a writer waits for another connection's draft transaction before
/// giving up with `SQLITE_BUSY`. Draft transactions are a handful of
/// statements, so only a stalled writer reaches this.
pub const BUSY_TIMEOUT_MS: u32 = 30_000;

/// SQLite-backed store. All mutations of a draft go through
/// [`Database::with_draft_tx`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = {BUSY_TIMEOUT_MS};
             PRAGMA foreign_keys = ON;"
        ))
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS drafts (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                name         TEXT NOT NULL,
                status       TEXT NOT NULL DEFAULT 'scheduled'
                             CHECK (status IN ('scheduled', 'live', 'paused', 'completed')),
                scheduled_at INTEGER NOT NULL,
                started_at   INTEGER,
                round_count  INTEGER NOT NULL CHECK (round_count >= 1),
                pick_seconds INTEGER NOT NULL CHECK (pick_seconds >= 0)
            );

            CREATE TABLE IF NOT EXISTS participants (
                draft_id       INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                user_id        TEXT NOT NULL,
                label          TEXT NOT NULL,
                draft_position INTEGER NOT NULL,
                PRIMARY KEY (draft_id, user_id),
                UNIQUE (draft_id, draft_position)
            );

            CREATE TABLE IF NOT EXISTS player_pool (
                draft_id  INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                name      TEXT NOT NULL,
                pool_rank INTEGER NOT NULL,
                PRIMARY KEY (draft_id, name)
            );

            CREATE TABLE IF NOT EXISTS picks (
                draft_id            INTEGER NOT NULL REFERENCES drafts(id) ON DELETE CASCADE,
                overall_pick        INTEGER NOT NULL CHECK (overall_pick >= 1),
                round_number        INTEGER NOT NULL,
                round_pick          INTEGER NOT NULL,
                participant_user_id TEXT NOT NULL,
                player_name         TEXT NOT NULL,
                picked_by_kind      TEXT NOT NULL CHECK (picked_by_kind IN ('user', 'system')),
                picked_by_user_id   TEXT,
                picked_at           INTEGER NOT NULL,
                PRIMARY KEY (draft_id, overall_pick),
                UNIQUE (draft_id, player_name)
            );

            CREATE TABLE IF NOT EXISTS presence (
                draft_id     INTEGER NOT NULL,
                user_id      TEXT NOT NULL,
                is_online    INTEGER NOT NULL DEFAULT 0,
                is_ready     INTEGER NOT NULL DEFAULT 0,
                last_seen_at INTEGER NOT NULL,
                PRIMARY KEY (draft_id, user_id),
                FOREIGN KEY (draft_id, user_id)
                    REFERENCES participants(draft_id, user_id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_drafts_status ON drafts(status, scheduled_at);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Run `f` inside an immediate (write-locking) transaction.
    ///
    /// The write lock is taken at `BEGIN`, so reads inside `f` see the state
    /// that the writes will be applied to; no other connection can commit in
    /// between. The transaction commits only if `f` returns `Ok`.
    pub fn with_draft_tx<T, E>(
        &self,
        f: impl FnOnce(&DraftTx<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<anyhow::Error>,
    {
        let mut conn = self.conn();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin draft transaction")?;
        let dtx = DraftTx { tx };
        let out = f(&dtx)?;
        dtx.tx
            .commit()
            .context("failed to commit draft transaction")?;
        Ok(out)
    }

    /// Read a consistent snapshot of one draft. Returns `None` if the draft
    /// does not exist.
    pub fn load_snapshot(&self, draft_id: DraftId) -> Result<Option<DraftSnapshot>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin read transaction")?;
        let snapshot = DraftTx { tx }.load_snapshot(draft_id)?;
        Ok(snapshot)
    }

    /// Create a draft in `scheduled` status together with its participants.
    pub fn create_draft(&self, new: &NewDraft) -> Result<DraftId> {
        if new.round_count < 1 {
            bail!("round_count must be at least 1");
        }
        if new.participants.len() < 2 {
            bail!(
                "a draft needs at least 2 participants, got {}",
                new.participants.len()
            );
        }
        let fits = u32::try_from(new.participants.len())
            .ok()
            .and_then(|seats| seats.checked_mul(new.round_count))
            .is_some();
        if !fits {
            bail!(
                "{} rounds of {} participants overflows the pick counter",
                new.round_count,
                new.participants.len()
            );
        }

        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin create transaction")?;

        tx.execute(
            "INSERT INTO drafts (name, status, scheduled_at, round_count, pick_seconds)
             VALUES (?1, 'scheduled', ?2, ?3, ?4)",
            params![
                new.name,
                new.scheduled_at.timestamp_millis(),
                new.round_count,
                new.pick_seconds,
            ],
        )
        .context("failed to insert draft")?;
        let draft_id = tx.last_insert_rowid();

        for (position, (user_id, label)) in new.participants.iter().enumerate() {
            tx.execute(
                "INSERT INTO participants (draft_id, user_id, label, draft_position)
                 VALUES (?1, ?2, ?3, ?4)",
                params![draft_id, user_id, label, position as u32],
            )
            .with_context(|| format!("failed to insert participant {user_id}"))?;
        }

        tx.commit().context("failed to commit create_draft")?;
        Ok(draft_id)
    }

    /// Load the claimable pool for a draft in a single transaction. Entries
    /// already present (by name) get their rank replaced. Returns the number
    /// of entries written.
    pub fn import_pool(&self, draft_id: DraftId, entries: &[PoolEntry]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for entry in entries {
            tx.execute(
                "INSERT INTO player_pool (draft_id, name, pool_rank)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(draft_id, name) DO UPDATE SET pool_rank = excluded.pool_rank",
                params![draft_id, entry.name, entry.rank],
            )
            .context("failed to upsert pool entry")?;
        }

        tx.commit().context("failed to commit import")?;
        Ok(entries.len())
    }

    /// Delete a draft. Participants, pool, picks and presence go with it.
    /// Returns `false` if the draft did not exist.
    pub fn delete_draft(&self, draft_id: DraftId) -> Result<bool> {
        let conn = self.conn();
        let deleted = conn
            .execute("DELETE FROM drafts WHERE id = ?1", params![draft_id])
            .context("failed to delete draft")?;
        Ok(deleted > 0)
    }

    /// Drafts the automation sweep must look at: every live draft, and every
    /// scheduled draft whose start time has arrived.
    pub fn list_due_draft_ids(&self, now: DateTime<Utc>) -> Result<Vec<DraftId>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT id FROM drafts
                 WHERE status = 'live' OR (status = 'scheduled' AND scheduled_at <= ?1)
                 ORDER BY id",
            )
            .context("failed to prepare due drafts query")?;

        let ids = stmt
            .query_map(params![now.timestamp_millis()], |row| row.get(0))
            .context("failed to query due drafts")?
            .collect::<rusqlite::Result<Vec<DraftId>>>()
            .context("failed to map due draft rows")?;

        Ok(ids)
    }

    /// Committed picks for a draft, ordered by overall pick.
    pub fn load_picks(&self, draft_id: DraftId) -> Result<Vec<Pick>> {
        let conn = self.conn();
        query_picks(&conn, draft_id)
    }
}

/// A draft-scoped transaction handed to [`Database::with_draft_tx`] closures.
pub struct DraftTx<'c> {
    tx: Transaction<'c>,
}

impl DraftTx<'_> {
    /// Read everything about one draft. Returns `None` if it does not exist.
    pub fn load_snapshot(&self, draft_id: DraftId) -> Result<Option<DraftSnapshot>> {
        let Some(draft) = self.load_draft(draft_id)? else {
            return Ok(None);
        };

        let participants = {
            let mut stmt = self
                .tx
                .prepare(
                    "SELECT user_id, label, draft_position FROM participants
                     WHERE draft_id = ?1 ORDER BY draft_position",
                )
                .context("failed to prepare participants query")?;
            let rows = stmt
                .query_map(params![draft_id], |row| {
                    Ok(Participant {
                        user_id: row.get(0)?,
                        label: row.get(1)?,
                        draft_position: row.get(2)?,
                    })
                })
                .context("failed to query participants")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to map participant rows")?;
            rows
        };

        let picks = query_picks(&self.tx, draft_id)?;

        let pool = {
            let mut stmt = self
                .tx
                .prepare(
                    "SELECT name, pool_rank FROM player_pool
                     WHERE draft_id = ?1 ORDER BY pool_rank, name",
                )
                .context("failed to prepare pool query")?;
            let rows = stmt
                .query_map(params![draft_id], |row| {
                    Ok(PoolEntry {
                        name: row.get(0)?,
                        rank: row.get(1)?,
                    })
                })
                .context("failed to query pool")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to map pool rows")?;
            rows
        };

        let presence = {
            let mut stmt = self
                .tx
                .prepare(
                    "SELECT user_id, is_online, is_ready, last_seen_at FROM presence
                     WHERE draft_id = ?1 ORDER BY user_id",
                )
                .context("failed to prepare presence query")?;
            let rows = stmt
                .query_map(params![draft_id], |row| {
                    Ok(Presence {
                        user_id: row.get(0)?,
                        is_online: row.get(1)?,
                        is_ready: row.get(2)?,
                        last_seen_at: millis_column(row, 3)?,
                    })
                })
                .context("failed to query presence")?
                .collect::<rusqlite::Result<Vec<_>>>()
                .context("failed to map presence rows")?;
            rows
        };

        Ok(Some(DraftSnapshot {
            draft,
            participants,
            picks,
            pool,
            presence,
        }))
    }

    /// Read the draft row alone.
    pub fn load_draft(&self, draft_id: DraftId) -> Result<Option<Draft>> {
        self.tx
            .query_row(
                "SELECT id, name, status, scheduled_at, started_at, round_count, pick_seconds
                 FROM drafts WHERE id = ?1",
                params![draft_id],
                |row| {
                    let status: String = row.get(2)?;
                    let status = DraftStatus::from_str_status(&status).ok_or_else(|| {
                        rusqlite::Error::FromSqlConversionFailure(
                            2,
                            Type::Text,
                            format!("unknown draft status '{status}'").into(),
                        )
                    })?;
                    let started_at: Option<i64> = row.get(4)?;
                    Ok(Draft {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        status,
                        scheduled_at: millis_column(row, 3)?,
                        started_at: started_at
                            .map(|ms| millis_to_datetime(ms, 4))
                            .transpose()?,
                        round_count: row.get(5)?,
                        pick_seconds: row.get(6)?,
                    })
                },
            )
            .optional()
            .context("failed to load draft")
    }

    /// Append a pick. The primary key on `(draft_id, overall_pick)` and the
    /// unique `(draft_id, player_name)` back up the engine's own checks.
    pub fn insert_pick(&self, pick: &Pick) -> Result<()> {
        self.tx
            .execute(
                "INSERT INTO picks
                    (draft_id, overall_pick, round_number, round_pick, participant_user_id,
                     player_name, picked_by_kind, picked_by_user_id, picked_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    pick.draft_id,
                    pick.overall_pick,
                    pick.round_number,
                    pick.round_pick,
                    pick.participant_user_id,
                    pick.player_name,
                    pick.picked_by.kind_str(),
                    pick.picked_by.user_id(),
                    pick.picked_at.timestamp_millis(),
                ],
            )
            .with_context(|| {
                format!(
                    "failed to insert pick {} for draft {}",
                    pick.overall_pick, pick.draft_id
                )
            })?;
        Ok(())
    }

    /// Persist a validated status change.
    pub fn apply_status(&self, draft_id: DraftId, change: &StatusChange) -> Result<()> {
        self.tx
            .execute(
                "UPDATE drafts SET status = ?2, started_at = ?3 WHERE id = ?1",
                params![
                    draft_id,
                    change.to.as_str(),
                    change.started_at.map(|t| t.timestamp_millis()),
                ],
            )
            .context("failed to update draft status")?;
        Ok(())
    }

    /// Record a heartbeat or readiness change. The participant is always
    /// marked online and seen at `now`; `ready` is left as stored when
    /// `None` (new rows start not ready).
    pub fn upsert_presence(
        &self,
        draft_id: DraftId,
        user_id: &str,
        ready: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.tx
            .execute(
                "INSERT INTO presence (draft_id, user_id, is_online, is_ready, last_seen_at)
                 VALUES (?1, ?2, 1, COALESCE(?3, 0), ?4)
                 ON CONFLICT(draft_id, user_id) DO UPDATE SET
                    is_online    = 1,
                    is_ready     = COALESCE(?3, is_ready),
                    last_seen_at = excluded.last_seen_at",
                params![draft_id, user_id, ready, now.timestamp_millis()],
            )
            .context("failed to upsert presence")?;
        Ok(())
    }
}

fn query_picks(conn: &Connection, draft_id: DraftId) -> Result<Vec<Pick>> {
    let mut stmt = conn
        .prepare(
            "SELECT draft_id, overall_pick, round_number, round_pick, participant_user_id,
                    player_name, picked_by_kind, picked_by_user_id, picked_at
             FROM picks WHERE draft_id = ?1 ORDER BY overall_pick",
        )
        .context("failed to prepare picks query")?;

    let picks = stmt
        .query_map(params![draft_id], |row| {
            let kind: String = row.get(6)?;
            let user_id: Option<String> = row.get(7)?;
            let picked_by = PickActor::from_parts(&kind, user_id).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    Type::Text,
                    format!("malformed pick actor '{kind}'").into(),
                )
            })?;
            Ok(Pick {
                draft_id: row.get(0)?,
                overall_pick: row.get(1)?,
                round_number: row.get(2)?,
                round_pick: row.get(3)?,
                participant_user_id: row.get(4)?,
                player_name: row.get(5)?,
                picked_by,
                picked_at: millis_column(row, 8)?,
            })
        })
        .context("failed to query picks")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("failed to map pick rows")?;

    Ok(picks)
}

fn millis_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let ms: i64 = row.get(idx)?;
    millis_to_datetime(ms, idx)
}

fn millis_to_datetime(ms: i64, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 19, 0, 0).unwrap()
    }

    /// Helper: a three-seat, two-round draft scheduled at `t0`.
    fn new_draft() -> NewDraft {
        NewDraft {
            name: "Vorticist League".into(),
            scheduled_at: t0(),
            round_count: 2,
            pick_seconds: 60,
            participants: vec![
                ("alice".into(), "Alice".into()),
                ("bob".into(), "Bob".into()),
                ("carol".into(), "Carol".into()),
            ],
        }
    }

    fn sample_pick(draft_id: DraftId, overall: u32, player: &str) -> Pick {
        Pick {
            draft_id,
            overall_pick: overall,
            round_number: 1,
            round_pick: overall,
            participant_user_id: "alice".into(),
            player_name: player.into(),
            picked_by: PickActor::User("alice".into()),
            picked_at: t0() + Duration::seconds(overall as i64),
        }
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for table in ["drafts", "participants", "player_pool", "picks", "presence"] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    #[test]
    fn open_sets_busy_timeout() {
        let db = test_db();
        let timeout: u32 = db
            .conn()
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, BUSY_TIMEOUT_MS);
    }

    #[test]
    fn create_and_load_snapshot() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();

        let snap = db.load_snapshot(id).unwrap().unwrap();
        assert_eq!(snap.draft.name, "Vorticist League");
        assert_eq!(snap.draft.status, DraftStatus::Scheduled);
        assert_eq!(snap.draft.scheduled_at, t0());
        assert_eq!(snap.draft.started_at, None);
        assert_eq!(snap.draft.round_count, 2);
        assert_eq!(snap.draft.pick_seconds, 60);

        let seats: Vec<(&str, u32)> = snap
            .participants
            .iter()
            .map(|p| (p.user_id.as_str(), p.draft_position))
            .collect();
        assert_eq!(seats, vec![("alice", 0), ("bob", 1), ("carol", 2)]);
        assert_eq!(snap.total_picks().unwrap(), 6);
    }

    #[test]
    fn load_snapshot_missing_draft_is_none() {
        let db = test_db();
        assert!(db.load_snapshot(42).unwrap().is_none());
    }

    #[test]
    fn create_draft_rejects_single_participant() {
        let db = test_db();
        let mut draft = new_draft();
        draft.participants.truncate(1);
        assert!(db.create_draft(&draft).is_err());
    }

    #[test]
    fn create_draft_rejects_zero_rounds() {
        let db = test_db();
        let mut draft = new_draft();
        draft.round_count = 0;
        assert!(db.create_draft(&draft).is_err());
    }

    #[test]
    fn create_draft_rejects_pick_count_overflow() {
        let db = test_db();
        let mut draft = new_draft();
        draft.round_count = u32::MAX / 2;
        let err = db.create_draft(&draft).unwrap_err();
        assert!(err.to_string().contains("overflows"), "{err}");
        assert!(db.list_due_draft_ids(t0()).unwrap().is_empty());

        draft.participants.truncate(2);
        assert!(db.create_draft(&draft).is_ok());
    }

    #[test]
    fn create_draft_rejects_duplicate_user_and_rolls_back() {
        let db = test_db();
        let mut draft = new_draft();
        draft.participants.push(("alice".into(), "Alice again".into()));
        assert!(db.create_draft(&draft).is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM drafts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn delete_draft_cascades() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();
        db.import_pool(id, &[PoolEntry { name: "Soto".into(), rank: 1 }])
            .unwrap();
        db.with_draft_tx(|tx| -> Result<()> {
            tx.insert_pick(&sample_pick(id, 1, "Soto"))?;
            tx.upsert_presence(id, "alice", Some(true), t0())
        })
        .unwrap();

        assert!(db.delete_draft(id).unwrap());
        assert!(!db.delete_draft(id).unwrap());

        let conn = db.conn();
        for table in ["participants", "player_pool", "picks", "presence"] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{table} not cleared");
        }
    }

    #[test]
    fn list_due_draft_ids_filters_by_status_and_time() {
        let db = test_db();
        let due = db.create_draft(&new_draft()).unwrap();
        let later = db
            .create_draft(&NewDraft {
                scheduled_at: t0() + Duration::hours(1),
                ..new_draft()
            })
            .unwrap();
        let live = db.create_draft(&new_draft()).unwrap();
        let done = db.create_draft(&new_draft()).unwrap();

        db.with_draft_tx(|tx| -> Result<()> {
            tx.apply_status(
                live,
                &StatusChange {
                    from: DraftStatus::Scheduled,
                    to: DraftStatus::Live,
                    started_at: Some(t0()),
                },
            )?;
            tx.apply_status(
                done,
                &StatusChange {
                    from: DraftStatus::Scheduled,
                    to: DraftStatus::Completed,
                    started_at: None,
                },
            )
        })
        .unwrap();

        let ids = db.list_due_draft_ids(t0()).unwrap();
        assert_eq!(ids, vec![due, live]);
        assert!(!ids.contains(&later));
    }

    // ------------------------------------------------------------------
    // Pool
    // ------------------------------------------------------------------

    #[test]
    fn pool_is_ordered_by_rank_then_name() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();
        let written = db
            .import_pool(
                id,
                &[
                    PoolEntry { name: "Witt".into(), rank: 2 },
                    PoolEntry { name: "Judge".into(), rank: 1 },
                    PoolEntry { name: "Acuna".into(), rank: 2 },
                ],
            )
            .unwrap();
        assert_eq!(written, 3);

        let snap = db.load_snapshot(id).unwrap().unwrap();
        let names: Vec<&str> = snap.pool.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Judge", "Acuna", "Witt"]);
    }

    #[test]
    fn import_pool_updates_existing_rank() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();
        db.import_pool(id, &[PoolEntry { name: "Judge".into(), rank: 1 }])
            .unwrap();
        db.import_pool(id, &[PoolEntry { name: "Judge".into(), rank: 9 }])
            .unwrap();

        let snap = db.load_snapshot(id).unwrap().unwrap();
        assert_eq!(snap.pool, vec![PoolEntry { name: "Judge".into(), rank: 9 }]);
    }

    // ------------------------------------------------------------------
    // Picks
    // ------------------------------------------------------------------

    #[test]
    fn insert_and_load_picks_round_trip() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();

        let human = sample_pick(id, 1, "Judge");
        let auto = Pick {
            picked_by: PickActor::System,
            participant_user_id: "bob".into(),
            ..sample_pick(id, 2, "Soto")
        };
        db.with_draft_tx(|tx| -> Result<()> {
            tx.insert_pick(&human)?;
            tx.insert_pick(&auto)
        })
        .unwrap();

        let picks = db.load_picks(id).unwrap();
        assert_eq!(picks, vec![human, auto]);
        assert!(picks[1].is_auto_pick());
    }

    #[test]
    fn duplicate_overall_pick_is_rejected() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();
        db.with_draft_tx(|tx| tx.insert_pick(&sample_pick(id, 1, "Judge")))
            .unwrap();

        let result = db.with_draft_tx(|tx| tx.insert_pick(&sample_pick(id, 1, "Soto")));
        assert!(result.is_err());
        assert_eq!(db.load_picks(id).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_player_is_rejected() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();
        db.with_draft_tx(|tx| tx.insert_pick(&sample_pick(id, 1, "Judge")))
            .unwrap();

        let result = db.with_draft_tx(|tx| tx.insert_pick(&sample_pick(id, 2, "Judge")));
        assert!(result.is_err());
    }

    #[test]
    fn failed_closure_rolls_back_earlier_writes() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();

        let result = db.with_draft_tx(|tx| -> Result<()> {
            tx.insert_pick(&sample_pick(id, 1, "Judge"))?;
            bail!("simulated failure after first insert")
        });
        assert!(result.is_err());
        assert!(db.load_picks(id).unwrap().is_empty());
    }

    #[test]
    fn malformed_actor_row_is_a_load_error() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();
        db.conn()
            .execute(
                "INSERT INTO picks (draft_id, overall_pick, round_number, round_pick,
                    participant_user_id, player_name, picked_by_kind, picked_by_user_id, picked_at)
                 VALUES (?1, 1, 1, 1, 'alice', 'Judge', 'user', NULL, 0)",
                params![id],
            )
            .unwrap();

        assert!(db.load_picks(id).is_err());
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    #[test]
    fn heartbeat_then_ready_toggle() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();

        db.with_draft_tx(|tx| tx.upsert_presence(id, "bob", None, t0()))
            .unwrap();
        let snap = db.load_snapshot(id).unwrap().unwrap();
        assert_eq!(
            snap.presence,
            vec![Presence {
                user_id: "bob".into(),
                is_online: true,
                is_ready: false,
                last_seen_at: t0(),
            }]
        );

        let later = t0() + Duration::seconds(30);
        db.with_draft_tx(|tx| tx.upsert_presence(id, "bob", Some(true), later))
            .unwrap();
        // A plain heartbeat afterwards must not clear readiness.
        db.with_draft_tx(|tx| tx.upsert_presence(id, "bob", None, later))
            .unwrap();

        let snap = db.load_snapshot(id).unwrap().unwrap();
        assert!(snap.presence[0].is_ready);
        assert_eq!(snap.presence[0].last_seen_at, later);
    }

    #[test]
    fn presence_requires_participant() {
        let db = test_db();
        let id = db.create_draft(&new_draft()).unwrap();
        let result = db.with_draft_tx(|tx| tx.upsert_presence(id, "mallory", None, t0()));
        assert!(result.is_err());
    }
}
