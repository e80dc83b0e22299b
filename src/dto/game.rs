use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, GameResultEntity, GameStatus, RoundEntity, ScoreEntity},
    dto::format_system_time,
};

/// Payload used to start a brand-new game.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct StartGameRequest {
    /// Number of rounds to play. Defaults to the configured round count.
    #[validate(range(min = 1))]
    pub total_rounds: Option<u32>,
}

/// Payload resizing the round set of a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct UpdateTotalRoundsRequest {
    /// New total; shrinking discards trailing rounds and their scores.
    #[validate(range(min = 1))]
    pub total_rounds: u32,
}

/// Payload toggling the score-masking flag.
#[derive(Debug, Deserialize, ToSchema)]
pub struct HideScoresRequest {
    /// Whether frontends should mask running totals.
    pub hide: bool,
}

/// Payload setting or clearing the game tag.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TagRequest {
    /// Tag text; empty or missing clears the tag.
    pub tag: Option<String>,
}

/// Payload writing one score cell. A missing value clears the cell.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScoreRequest {
    /// Point value in 0..=13, or null to clear the entry.
    pub points: Option<u8>,
}

/// Terminal state requested when closing a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClosingStatus {
    /// Run the finalizer and persist ranked results.
    Completed,
    /// Stamp the end without producing results.
    Abandoned,
}

/// Payload terminating a game.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CloseGameRequest {
    /// Which terminal state to transition into.
    pub status: ClosingStatus,
}

/// Query parameters for the completed-games listing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CompletedGamesQuery {
    /// Maximum number of games to return (newest first). Defaults to 50.
    pub limit: Option<usize>,
}

/// Public projection of a game document.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameSummary {
    /// Primary key of the game.
    pub id: Uuid,
    /// RFC 3339 start timestamp.
    pub started_at: String,
    /// RFC 3339 end timestamp, when the game has ended.
    pub ended_at: Option<String>,
    /// Number of rounds the session is played over.
    pub total_rounds: u32,
    /// How many rounds currently hold a full score set.
    pub rounds_played: u32,
    /// Lifecycle state.
    pub status: GameStatus,
    /// Whether frontends should mask running totals.
    pub hide_scores: bool,
    /// Optional short label attached by the players.
    pub tag: Option<String>,
    /// Optional free-form notes.
    pub notes: Option<String>,
}

impl From<GameEntity> for GameSummary {
    fn from(entity: GameEntity) -> Self {
        Self {
            id: entity.id,
            started_at: format_system_time(entity.started_at),
            ended_at: entity.ended_at.map(format_system_time),
            total_rounds: entity.total_rounds,
            rounds_played: entity.rounds_played,
            status: entity.status,
            hide_scores: entity.hide_scores,
            tag: entity.tag,
            notes: entity.notes,
        }
    }
}

/// Public projection of one round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundSummary {
    /// Zero-padded sequence id.
    pub id: String,
    /// 1-based position within the game.
    pub round_number: u32,
    /// Whether the round is locked against edits.
    pub locked: bool,
}

impl From<RoundEntity> for RoundSummary {
    fn from(entity: RoundEntity) -> Self {
        Self {
            id: entity.id,
            round_number: entity.round_number,
            locked: entity.locked,
        }
    }
}

/// Public projection of one score cell.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreSummary {
    /// Roster identifier of the scoring player.
    pub player_id: String,
    /// Entered point value, if one is set.
    pub points: Option<u8>,
    /// RFC 3339 timestamp of the last write.
    pub entered_at: String,
}

impl From<ScoreEntity> for ScoreSummary {
    fn from(entity: ScoreEntity) -> Self {
        Self {
            player_id: entity.player_id,
            points: entity.points,
            entered_at: format_system_time(entity.entered_at),
        }
    }
}

/// Public projection of one ranked result.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResultSummary {
    /// Roster identifier of the ranked player.
    pub player_id: String,
    /// Final rank, 1-based.
    pub rank: u32,
    /// Points accumulated across all complete rounds.
    pub total_points: u32,
    /// Rounds this player won.
    pub rounds_won: u32,
}

impl From<GameResultEntity> for ResultSummary {
    fn from(entity: GameResultEntity) -> Self {
        Self {
            player_id: entity.player_id,
            rank: entity.rank,
            total_points: entity.total_points,
            rounds_won: entity.rounds_won,
        }
    }
}

/// A completed game together with its ranked results.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameWithResults {
    /// The game document projection.
    pub game: GameSummary,
    /// Ranked results, rank ascending.
    pub results: Vec<ResultSummary>,
}

/// Outcome of a single score write.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreUpdateResponse {
    /// Scores of the affected round after the write, ordered by player.
    pub scores: Vec<ScoreSummary>,
    /// Whether a round log now exists for the affected round.
    pub round_logged: bool,
}

/// Outcome of a progress resync.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    /// Number of rounds holding a full score set.
    pub rounds_played: u32,
}
