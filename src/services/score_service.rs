//! Per-cell score writes and the reconciliation they trigger.

use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::game_store::GameStore,
    dao::models::{RoundLogSource, ScoreEntity},
    dto::game::{ScoreSummary, ScoreUpdateResponse},
    error::ServiceError,
    scoring,
    services::{round_log_service, sse_events},
    state::SharedState,
};

/// Write or clear one score cell, then reconcile the round's log.
///
/// `None` clears the entry so the round is no longer complete. Concurrent
/// writes to the same cell resolve last-write-wins; the core does not refuse
/// writes on terminal games (callers stop editing once a game has ended).
pub async fn set_round_score(
    state: &SharedState,
    game_id: Uuid,
    round_id: &str,
    player_id: &str,
    points: Option<u8>,
) -> Result<ScoreUpdateResponse, ServiceError> {
    if !state.roster().contains(player_id) {
        return Err(ServiceError::InvalidArgument(format!(
            "unknown player `{player_id}`"
        )));
    }

    let store = state.require_game_store().await?;

    match points {
        Some(value) => {
            scoring::validate_points(value)?;
            store
                .save_score(
                    game_id,
                    round_id.to_string(),
                    ScoreEntity {
                        player_id: player_id.to_string(),
                        points: Some(value),
                        entered_at: SystemTime::now(),
                    },
                )
                .await?;
        }
        None => {
            store
                .delete_score(game_id, round_id.to_string(), player_id.to_string())
                .await?;
        }
    }

    let round_logged = round_log_service::reconcile(
        &store,
        state.roster(),
        game_id,
        round_id,
        RoundLogSource::Realtime,
    )
    .await?;

    let scores: Vec<ScoreSummary> = store
        .find_scores(game_id, round_id.to_string())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    sse_events::broadcast_scores_updated(state, game_id, round_id, scores.clone());

    Ok(ScoreUpdateResponse {
        scores,
        round_logged,
    })
}

/// Scores of one round, ordered by player id.
pub async fn list_scores(
    state: &SharedState,
    game_id: Uuid,
    round_id: &str,
) -> Result<Vec<ScoreSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let scores = store.find_scores(game_id, round_id.to_string()).await?;
    Ok(scores.into_iter().map(Into::into).collect())
}
