// Turn order: maps an overall pick number to its round, seat and participant.
//
// Round 1 runs forward. Rounds 2 and 3 both run in reverse (third-round
// reversal). From round 4 on, odd rounds run in reverse and even rounds run
// forward.

use serde::{Deserialize, Serialize};

use super::pick::Pick;
use super::state::Participant;
use crate::error::EngineError;

/// Where an overall pick lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub overall_pick: u32,
    pub round_number: u32,
    /// 1-based position within the round.
    pub round_pick: u32,
    /// 0-based seat of the participant on the clock.
    pub participant_index: u32,
}

/// The undecided pick a draft is waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextPick {
    pub slot: Slot,
    pub user_id: String,
    pub label: String,
}

/// Whether a round runs in reverse seat order.
pub fn is_reversed_round(round_number: u32) -> bool {
    match round_number {
        1 => false,
        2 | 3 => true,
        n => n % 2 == 1,
    }
}

/// Resolve the slot for `overall_pick` in a draft with `participant_count`
/// seats.
pub fn resolve_pick_slot(participant_count: u32, overall_pick: u32) -> Result<Slot, EngineError> {
    if participant_count < 2 {
        return Err(EngineError::InvalidArgument(format!(
            "participant count must be at least 2, got {participant_count}"
        )));
    }
    if overall_pick < 1 {
        return Err(EngineError::InvalidArgument(
            "overall pick must be at least 1".into(),
        ));
    }

    let round_number = overall_pick.div_ceil(participant_count);
    let offset = (overall_pick - 1) % participant_count;
    let participant_index = if is_reversed_round(round_number) {
        participant_count - 1 - offset
    } else {
        offset
    };

    Ok(Slot {
        overall_pick,
        round_number,
        round_pick: offset + 1,
        participant_index,
    })
}

/// Total number of picks in a draft. Fails if the product does not fit in
/// a `u32`.
pub fn total_picks(participant_count: u32, round_count: u32) -> Result<u32, EngineError> {
    participant_count.checked_mul(round_count).ok_or_else(|| {
        EngineError::InvalidArgument(format!(
            "{round_count} rounds of {participant_count} picks overflows the pick counter"
        ))
    })
}

/// Resolve the next undecided pick given the committed ones.
///
/// `participants` must be ordered by `draft_position`. Returns `Ok(None)`
/// once every pick has been made.
pub fn resolve_next_pick(
    participants: &[Participant],
    picks: &[Pick],
    round_count: u32,
) -> Result<Option<NextPick>, EngineError> {
    let participant_count = participants.len() as u32;
    let overall_pick = picks.len() as u32 + 1;
    if overall_pick > total_picks(participant_count, round_count)? {
        return Ok(None);
    }

    let slot = resolve_pick_slot(participant_count, overall_pick)?;
    let seat = participants
        .get(slot.participant_index as usize)
        .ok_or_else(|| {
            EngineError::InvalidArgument(format!(
                "no participant at seat {}",
                slot.participant_index
            ))
        })?;

    Ok(Some(NextPick {
        slot,
        user_id: seat.user_id.clone(),
        label: seat.label.clone(),
    }))
}
