use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        game::{GameSummary, ResultSummary, RoundSummary, ScoreSummary},
        sse::{
            GameDeletedEvent, GameUpdatedEvent, ResultsReadyEvent, RoundsUpdatedEvent, ServerEvent,
            ScoresUpdatedEvent,
        },
    },
    state::SharedState,
};

const EVENT_GAME_UPDATED: &str = "game.updated";
const EVENT_ROUNDS_UPDATED: &str = "rounds.updated";
const EVENT_SCORES_UPDATED: &str = "scores.updated";
const EVENT_RESULTS_READY: &str = "results.ready";
const EVENT_GAME_DELETED: &str = "game.deleted";

/// Broadcast a fresh projection of a mutated game document.
pub fn broadcast_game_updated(state: &SharedState, game: GameSummary) {
    let payload = GameUpdatedEvent { game };
    send_public_event(state, EVENT_GAME_UPDATED, &payload);
}

/// Broadcast the full round list after the round set changed shape.
pub fn broadcast_rounds_updated(state: &SharedState, game_id: Uuid, rounds: Vec<RoundSummary>) {
    let payload = RoundsUpdatedEvent { game_id, rounds };
    send_public_event(state, EVENT_ROUNDS_UPDATED, &payload);
}

/// Broadcast the scores of one round after a cell was written or cleared.
pub fn broadcast_scores_updated(
    state: &SharedState,
    game_id: Uuid,
    round_id: &str,
    scores: Vec<ScoreSummary>,
) {
    let payload = ScoresUpdatedEvent {
        game_id,
        round_id: round_id.to_string(),
        scores,
    };
    send_public_event(state, EVENT_SCORES_UPDATED, &payload);
}

/// Broadcast ranked results once a close has committed.
pub fn broadcast_results_ready(state: &SharedState, game_id: Uuid, results: Vec<ResultSummary>) {
    let payload = ResultsReadyEvent { game_id, results };
    send_public_event(state, EVENT_RESULTS_READY, &payload);
}

/// Broadcast that a game and its children are gone.
pub fn broadcast_game_deleted(state: &SharedState, game_id: Uuid) {
    let payload = GameDeletedEvent { game_id };
    send_public_event(state, EVENT_GAME_DELETED, &payload);
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
