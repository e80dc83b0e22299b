//! Persistence abstraction for games, rounds, scores, round logs, and results.

#[cfg(feature = "mem-store")]
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{
    GameEntity, GameResultEntity, RoundEntity, RoundLogEntity, RoundLogKey, ScoreEntity,
};
use crate::dao::storage::StorageResult;

/// One write staged into a [`WriteBatch`].
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Upsert the game document.
    PutGame(GameEntity),
    /// Delete the game document.
    DeleteGame(Uuid),
    /// Upsert one round of a game.
    PutRound(Uuid, RoundEntity),
    /// Delete one round of a game.
    DeleteRound(Uuid, String),
    /// Upsert one score cell of a round.
    PutScore(Uuid, String, ScoreEntity),
    /// Delete one score cell of a round.
    DeleteScore(Uuid, String, String),
    /// Upsert a round log.
    PutRoundLog(RoundLogEntity),
    /// Delete a round log.
    DeleteRoundLog(RoundLogKey),
    /// Upsert one per-player result of a game.
    PutResult(Uuid, GameResultEntity),
    /// Delete one per-player result of a game.
    DeleteResult(Uuid, String),
}

/// Ordered set of writes applied all-or-nothing by [`GameStore::commit_batch`].
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Start an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a game upsert.
    pub fn put_game(&mut self, game: GameEntity) -> &mut Self {
        self.ops.push(WriteOp::PutGame(game));
        self
    }

    /// Stage a game deletion.
    pub fn delete_game(&mut self, game_id: Uuid) -> &mut Self {
        self.ops.push(WriteOp::DeleteGame(game_id));
        self
    }

    /// Stage a round upsert.
    pub fn put_round(&mut self, game_id: Uuid, round: RoundEntity) -> &mut Self {
        self.ops.push(WriteOp::PutRound(game_id, round));
        self
    }

    /// Stage a round deletion.
    pub fn delete_round(&mut self, game_id: Uuid, round_id: String) -> &mut Self {
        self.ops.push(WriteOp::DeleteRound(game_id, round_id));
        self
    }

    /// Stage a score upsert.
    pub fn put_score(&mut self, game_id: Uuid, round_id: String, score: ScoreEntity) -> &mut Self {
        self.ops.push(WriteOp::PutScore(game_id, round_id, score));
        self
    }

    /// Stage a score deletion.
    pub fn delete_score(
        &mut self,
        game_id: Uuid,
        round_id: String,
        player_id: String,
    ) -> &mut Self {
        self.ops
            .push(WriteOp::DeleteScore(game_id, round_id, player_id));
        self
    }

    /// Stage a round-log upsert.
    pub fn put_round_log(&mut self, log: RoundLogEntity) -> &mut Self {
        self.ops.push(WriteOp::PutRoundLog(log));
        self
    }

    /// Stage a round-log deletion.
    pub fn delete_round_log(&mut self, key: RoundLogKey) -> &mut Self {
        self.ops.push(WriteOp::DeleteRoundLog(key));
        self
    }

    /// Stage a result upsert.
    pub fn put_result(&mut self, game_id: Uuid, result: GameResultEntity) -> &mut Self {
        self.ops.push(WriteOp::PutResult(game_id, result));
        self
    }

    /// Stage a result deletion.
    pub fn delete_result(&mut self, game_id: Uuid, player_id: String) -> &mut Self {
        self.ops.push(WriteOp::DeleteResult(game_id, player_id));
        self
    }

    /// Staged operations in insertion order.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing has been staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Consume the batch, yielding its operations.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Abstraction over the persistence layer for score-keeping sessions.
///
/// All writes are upserts or deletes by deterministic key, so re-running a
/// failed operation is safe. [`GameStore::insert_game_if_none_active`] is the
/// one conditional write: it re-checks the single-active-game predicate and
/// creates the game plus its rounds in the same atomic unit.
pub trait GameStore: Send + Sync {
    /// Create `game` and its `rounds` unless another active game exists.
    /// Returns `false` (writing nothing) when the predicate fails.
    fn insert_game_if_none_active(
        &self,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Upsert the game document.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Fetch the single active game, if any.
    fn find_active_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Completed games ordered by end time descending, newest first.
    fn list_completed_games(
        &self,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// All rounds of a game ordered by round number.
    fn find_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>>;
    /// One round of a game.
    fn find_round(
        &self,
        game_id: Uuid,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>>;
    /// All score cells of a round ordered by player id.
    fn find_scores(
        &self,
        game_id: Uuid,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>>;
    /// Upsert one score cell.
    fn save_score(
        &self,
        game_id: Uuid,
        round_id: String,
        score: ScoreEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete one score cell. Deleting an absent cell is a no-op.
    fn delete_score(
        &self,
        game_id: Uuid,
        round_id: String,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a round log by composite key.
    fn find_round_log(
        &self,
        key: RoundLogKey,
    ) -> BoxFuture<'static, StorageResult<Option<RoundLogEntity>>>;
    /// Upsert a round log.
    fn save_round_log(&self, log: RoundLogEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a round log. Deleting an absent log is a no-op.
    fn delete_round_log(&self, key: RoundLogKey) -> BoxFuture<'static, StorageResult<()>>;
    /// All results of a game ordered by rank ascending.
    fn find_results(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameResultEntity>>>;
    /// Apply every operation of `batch`, all-or-nothing.
    fn commit_batch(&self, batch: WriteBatch) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap connectivity probe.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
