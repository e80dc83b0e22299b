//! In-memory [`GameStore`] backend.
//!
//! Backs the test suite and storage-less deployments. A single lock guards
//! every collection, which makes the conditional insert and `commit_batch`
//! genuinely atomic.

use std::{collections::BTreeMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    game_store::{GameStore, WriteBatch, WriteOp},
    models::{
        GameEntity, GameResultEntity, GameStatus, RoundEntity, RoundLogEntity, RoundLogKey,
        ScoreEntity,
    },
    storage::StorageResult,
};

#[derive(Default)]
struct MemoryState {
    games: BTreeMap<Uuid, GameEntity>,
    rounds: BTreeMap<(Uuid, String), RoundEntity>,
    scores: BTreeMap<(Uuid, String, String), ScoreEntity>,
    round_logs: BTreeMap<String, RoundLogEntity>,
    results: BTreeMap<(Uuid, String), GameResultEntity>,
}

impl MemoryState {
    fn apply(&mut self, op: WriteOp) {
        match op {
            WriteOp::PutGame(game) => {
                self.games.insert(game.id, game);
            }
            WriteOp::DeleteGame(game_id) => {
                self.games.remove(&game_id);
            }
            WriteOp::PutRound(game_id, round) => {
                self.rounds.insert((game_id, round.id.clone()), round);
            }
            WriteOp::DeleteRound(game_id, round_id) => {
                self.rounds.remove(&(game_id, round_id));
            }
            WriteOp::PutScore(game_id, round_id, score) => {
                self.scores
                    .insert((game_id, round_id, score.player_id.clone()), score);
            }
            WriteOp::DeleteScore(game_id, round_id, player_id) => {
                self.scores.remove(&(game_id, round_id, player_id));
            }
            WriteOp::PutRoundLog(log) => {
                self.round_logs.insert(log.key().composite_id(), log);
            }
            WriteOp::DeleteRoundLog(key) => {
                self.round_logs.remove(&key.composite_id());
            }
            WriteOp::PutResult(game_id, result) => {
                self.results
                    .insert((game_id, result.player_id.clone()), result);
            }
            WriteOp::DeleteResult(game_id, player_id) => {
                self.results.remove(&(game_id, player_id));
            }
        }
    }

    fn active_game(&self) -> Option<&GameEntity> {
        self.games
            .values()
            .find(|game| game.status == GameStatus::Active)
    }
}

/// Lock-guarded in-memory store.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn insert_game_if_none_active(
        &self,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut state = store.state.write().await;
            if state.active_game().is_some() {
                return Ok(false);
            }
            let game_id = game.id;
            state.games.insert(game_id, game);
            for round in rounds {
                state.rounds.insert((game_id, round.id.clone()), round);
            }
            Ok(true)
        })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.state.write().await.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.state.read().await.games.get(&id).cloned()) })
    }

    fn find_active_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.state.read().await.active_game().cloned()) })
    }

    fn list_completed_games(
        &self,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.state.read().await;
            let mut completed: Vec<GameEntity> = state
                .games
                .values()
                .filter(|game| game.status == GameStatus::Completed)
                .cloned()
                .collect();
            completed.sort_by(|a, b| b.ended_at.cmp(&a.ended_at));
            if let Some(limit) = limit {
                completed.truncate(limit);
            }
            Ok(completed)
        })
    }

    fn find_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.state.read().await;
            let mut rounds: Vec<RoundEntity> = state
                .rounds
                .iter()
                .filter(|((id, _), _)| *id == game_id)
                .map(|(_, round)| round.clone())
                .collect();
            rounds.sort_by_key(|round| round.round_number);
            Ok(rounds)
        })
    }

    fn find_round(
        &self,
        game_id: Uuid,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.state.read().await;
            Ok(state.rounds.get(&(game_id, round_id)).cloned())
        })
    }

    fn find_scores(
        &self,
        game_id: Uuid,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.state.read().await;
            // BTreeMap iteration yields player ids in ascending order already.
            Ok(state
                .scores
                .iter()
                .filter(|((id, round, _), _)| *id == game_id && *round == round_id)
                .map(|(_, score)| score.clone())
                .collect())
        })
    }

    fn save_score(
        &self,
        game_id: Uuid,
        round_id: String,
        score: ScoreEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .state
                .write()
                .await
                .scores
                .insert((game_id, round_id, score.player_id.clone()), score);
            Ok(())
        })
    }

    fn delete_score(
        &self,
        game_id: Uuid,
        round_id: String,
        player_id: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .state
                .write()
                .await
                .scores
                .remove(&(game_id, round_id, player_id));
            Ok(())
        })
    }

    fn find_round_log(
        &self,
        key: RoundLogKey,
    ) -> BoxFuture<'static, StorageResult<Option<RoundLogEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.state.read().await;
            Ok(state.round_logs.get(&key.composite_id()).cloned())
        })
    }

    fn save_round_log(&self, log: RoundLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .state
                .write()
                .await
                .round_logs
                .insert(log.key().composite_id(), log);
            Ok(())
        })
    }

    fn delete_round_log(&self, key: RoundLogKey) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .state
                .write()
                .await
                .round_logs
                .remove(&key.composite_id());
            Ok(())
        })
    }

    fn find_results(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameResultEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let state = store.state.read().await;
            let mut results: Vec<GameResultEntity> = state
                .results
                .iter()
                .filter(|((id, _), _)| *id == game_id)
                .map(|(_, result)| result.clone())
                .collect();
            results.sort_by_key(|result| result.rank);
            Ok(results)
        })
    }

    fn commit_batch(&self, batch: WriteBatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut state = store.state.write().await;
            for op in batch.into_ops() {
                state.apply(op);
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn game(status: GameStatus) -> GameEntity {
        GameEntity {
            id: Uuid::new_v4(),
            started_at: SystemTime::now(),
            ended_at: None,
            total_rounds: 4,
            rounds_played: 0,
            status,
            hide_scores: false,
            tag: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn conditional_insert_refuses_second_active_game() {
        let store = MemoryGameStore::new();
        let first = game(GameStatus::Active);
        let rounds = vec![RoundEntity::new(1), RoundEntity::new(2)];

        assert!(
            store
                .insert_game_if_none_active(first.clone(), rounds)
                .await
                .unwrap()
        );
        let second = game(GameStatus::Active);
        assert!(
            !store
                .insert_game_if_none_active(second.clone(), Vec::new())
                .await
                .unwrap()
        );

        assert!(store.find_game(first.id).await.unwrap().is_some());
        assert!(store.find_game(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rounds_come_back_ordered_by_number() {
        let store = MemoryGameStore::new();
        let entity = game(GameStatus::Active);
        let rounds = (1..=12).rev().map(RoundEntity::new).collect();
        store
            .insert_game_if_none_active(entity.clone(), rounds)
            .await
            .unwrap();

        let stored = store.find_rounds(entity.id).await.unwrap();
        let numbers: Vec<u32> = stored.iter().map(|round| round.round_number).collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
        assert_eq!(stored[9].id, "10");
    }

    #[tokio::test]
    async fn batch_applies_every_op() {
        let store = MemoryGameStore::new();
        let mut entity = game(GameStatus::Active);
        store
            .insert_game_if_none_active(entity.clone(), vec![RoundEntity::new(1)])
            .await
            .unwrap();

        entity.status = GameStatus::Completed;
        entity.ended_at = Some(SystemTime::now());
        let mut batch = WriteBatch::new();
        batch.put_game(entity.clone());
        batch.put_result(
            entity.id,
            GameResultEntity {
                player_id: "A".into(),
                rank: 1,
                total_points: 0,
                rounds_won: 1,
            },
        );
        batch.delete_round(entity.id, "01".into());
        store.commit_batch(batch).await.unwrap();

        let stored = store.find_game(entity.id).await.unwrap().unwrap();
        assert_eq!(stored.status, GameStatus::Completed);
        assert_eq!(store.find_results(entity.id).await.unwrap().len(), 1);
        assert!(store.find_rounds(entity.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn completed_games_list_newest_first() {
        let store = MemoryGameStore::new();
        let base = SystemTime::now();
        for offset in 0..3u64 {
            let mut entity = game(GameStatus::Completed);
            entity.ended_at = Some(base + std::time::Duration::from_secs(offset));
            store.save_game(entity).await.unwrap();
        }

        let listed = store.list_completed_games(Some(2)).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].ended_at >= listed[1].ended_at);
    }
}
