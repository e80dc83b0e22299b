use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::game::{GameSummary, ResultSummary, RoundSummary, ScoreSummary};

/// Dispatched payload carried across the SSE channel.
#[derive(Clone, Debug)]
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }

    /// Plain-text event without JSON encoding.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// Broadcast after any mutation of the game document.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameUpdatedEvent {
    /// Fresh projection of the mutated game.
    pub game: GameSummary,
}

/// Broadcast after the round set of a game changed shape.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundsUpdatedEvent {
    /// Game whose rounds changed.
    pub game_id: Uuid,
    /// Full round list after the change, ordered by round number.
    pub rounds: Vec<RoundSummary>,
}

/// Broadcast after a score cell was written or cleared.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoresUpdatedEvent {
    /// Game holding the affected round.
    pub game_id: Uuid,
    /// Affected round.
    pub round_id: String,
    /// Scores of that round after the write, ordered by player.
    pub scores: Vec<ScoreSummary>,
}

/// Broadcast once a close commits and ranked results exist.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResultsReadyEvent {
    /// The closed game.
    pub game_id: Uuid,
    /// Ranked results, rank ascending.
    pub results: Vec<ResultSummary>,
}

/// Broadcast after a game and its children were deleted.
#[derive(Debug, Serialize, ToSchema)]
pub struct GameDeletedEvent {
    /// The deleted game.
    pub game_id: Uuid,
}
