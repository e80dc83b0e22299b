use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of a game document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Scores are still being entered. At most one game is active at a time.
    Active,
    /// Closed through the finalizer; ranked results exist.
    Completed,
    /// Terminated without producing results.
    Abandoned,
}

/// Root game document owning rounds and results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// When the session was started.
    #[schema(value_type = String)]
    pub started_at: SystemTime,
    /// When the session was closed or abandoned, if it was.
    #[schema(value_type = Option<String>)]
    pub ended_at: Option<SystemTime>,
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

/// One round of a game. Identity is positional: round N always maps to the
/// zero-padded sequence id `N`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundEntity {
    /// Zero-padded sequence id (`"01"`, `"02"`, ...).
    pub id: String,
    /// 1-based position within the game.
    pub round_number: u32,
    /// Whether the round is locked against edits.
    pub locked: bool,
}

impl RoundEntity {
    /// Build the round for the given 1-based position.
    pub fn new(round_number: u32) -> Self {
        Self {
            id: Self::sequence_id(round_number),
            round_number,
            locked: false,
        }
    }

    /// Deterministic document id for a round number.
    pub fn sequence_id(round_number: u32) -> String {
        format!("{round_number:02}")
    }
}

/// One player's point entry for one round, keyed by the player id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreEntity {
    /// Roster identifier; doubles as the document key within the round.
    pub player_id: String,
    /// Entered point value. Absent values never count towards completeness.
    pub points: Option<u8>,
    /// When this entry was last written.
    pub entered_at: SystemTime,
}

/// Origin of a round-log write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum RoundLogSource {
    /// Written right after an individual score mutation.
    Realtime,
    /// Staged during the close batch.
    EndGame,
    /// Written by the offline maintenance sweep.
    Backfill,
}

/// Composite key of a round log: `{game_id}_{round_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundLogKey {
    /// Game the logged round belongs to.
    pub game_id: Uuid,
    /// Zero-padded round id within that game.
    pub round_id: String,
}

impl RoundLogKey {
    /// Flat string form used as the document id of the log collection.
    pub fn composite_id(&self) -> String {
        format!("{}_{}", self.game_id, self.round_id)
    }
}

/// Denormalized projection of one completed round, queryable across games
/// independent of the game/round hierarchy.
///
/// Exists iff the round held a full score set at last reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundLogEntity {
    /// Game the logged round belongs to.
    pub game_id: Uuid,
    /// Zero-padded round id within that game.
    pub round_id: String,
    /// 1-based round position.
    pub round_number: u32,
    /// Full point map, one entry per roster member, in roster order.
    pub points_by_player: IndexMap<String, u8>,
    /// Sum of all entries in `points_by_player`.
    pub total_round_points: u32,
    /// Start timestamp copied from the parent game.
    pub game_started_at: SystemTime,
    /// End timestamp copied from the parent game, if it ended.
    pub game_ended_at: Option<SystemTime>,
    /// Date the game is filed under: `ended_at` when present, else `started_at`.
    pub game_date: SystemTime,
    /// Origin of the write.
    pub source: RoundLogSource,
    /// When this projection was last reconciled.
    pub logged_at: SystemTime,
}

impl RoundLogEntity {
    /// Key of this log within the top-level log collection.
    pub fn key(&self) -> RoundLogKey {
        RoundLogKey {
            game_id: self.game_id,
            round_id: self.round_id.clone(),
        }
    }
}

/// Immutable per-player summary produced once at game close.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct GameResultEntity {
    /// Roster identifier; doubles as the document key within the game.
    pub player_id: String,
    /// Final rank, 1-based, distinct across the roster.
    pub rank: u32,
    /// Points accumulated across all complete rounds.
    pub total_points: u32,
    /// Rounds this player won (scored 0 in).
    pub rounds_won: u32,
}

/// Snapshot captured before deletion, sufficient to undo it.
///
/// Carries the game document and its results only; rounds, scores, and round
/// logs are not part of the snapshot and stay deleted after a restore.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct GameSnapshotEntity {
    /// The deleted game document.
    pub game: GameEntity,
    /// Its ranked results, ordered rank ascending.
    pub results: Vec<GameResultEntity>,
}
