//! Reconciliation of the denormalized round-log projection.
//!
//! A round log exists iff its round held a full score set at the time of the
//! last reconciliation. The projection is eventually consistent: it is only
//! as fresh as the last [`reconcile`] call for its round.

use std::{sync::Arc, time::SystemTime};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    config::Roster,
    dao::{
        game_store::GameStore,
        models::{RoundLogEntity, RoundLogKey, RoundLogSource, ScoreEntity},
    },
    error::ServiceError,
    scoring,
};

/// Assemble the full point map of a round, in roster order.
///
/// Returns `None` unless every roster member has exactly one numeric entry.
/// Entries from players outside the roster never count towards completeness.
pub fn complete_points(roster: &Roster, scores: &[ScoreEntity]) -> Option<IndexMap<String, u8>> {
    if scores.len() != roster.len() {
        return None;
    }

    let mut points_by_player = IndexMap::with_capacity(roster.len());
    for player_id in roster.ids() {
        let entry = scores.iter().find(|score| score.player_id == player_id)?;
        points_by_player.insert(player_id.to_string(), entry.points?);
    }
    Some(points_by_player)
}

/// Re-derive the round log of one round from its live scores.
///
/// Upserts the log when the round is complete, deletes it otherwise (a no-op
/// when absent). Returns whether a log was written.
pub async fn reconcile(
    store: &Arc<dyn GameStore>,
    roster: &Roster,
    game_id: Uuid,
    round_id: &str,
    source: RoundLogSource,
) -> Result<bool, ServiceError> {
    let key = RoundLogKey {
        game_id,
        round_id: round_id.to_string(),
    };

    let scores = store.find_scores(game_id, round_id.to_string()).await?;
    let Some(points_by_player) = complete_points(roster, &scores) else {
        store.delete_round_log(key).await?;
        return Ok(false);
    };

    let Some(round) = store.find_round(game_id, round_id.to_string()).await? else {
        store.delete_round_log(key).await?;
        return Ok(false);
    };

    let Some(game) = store.find_game(game_id).await? else {
        store.delete_round_log(key).await?;
        return Ok(false);
    };

    let total_round_points = scoring::total_points(&points_by_player);
    let log = RoundLogEntity {
        game_id,
        round_id: round_id.to_string(),
        round_number: round.round_number,
        points_by_player,
        total_round_points,
        game_started_at: game.started_at,
        game_ended_at: game.ended_at,
        game_date: game.ended_at.unwrap_or(game.started_at),
        source,
        logged_at: SystemTime::now(),
    };
    store.save_round_log(log).await?;

    Ok(true)
}
