use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGameDocument, MongoResultDocument, MongoRoundDocument, MongoRoundLogDocument,
        MongoScoreDocument, doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    game_store::{GameStore, WriteBatch, WriteOp},
    models::{GameEntity, GameResultEntity, RoundEntity, RoundLogEntity, RoundLogKey, ScoreEntity},
    storage::StorageResult,
};

const GAME_COLLECTION: &str = "games";
const ROUND_COLLECTION: &str = "rounds";
const SCORE_COLLECTION: &str = "scores";
const ROUND_LOG_COLLECTION: &str = "round_logs";
const RESULT_COLLECTION: &str = "results";

/// MongoDB-backed [`GameStore`].
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        self.ensure_index(GAME_COLLECTION, doc! {"status": 1}, "game_status_idx", false)
            .await?;
        self.ensure_index(
            GAME_COLLECTION,
            doc! {"ended_at": -1},
            "game_ended_at_idx",
            false,
        )
        .await?;
        self.ensure_index(
            ROUND_COLLECTION,
            doc! {"game_id": 1, "round_id": 1},
            "round_game_idx",
            true,
        )
        .await?;
        self.ensure_index(
            SCORE_COLLECTION,
            doc! {"game_id": 1, "round_id": 1, "player_id": 1},
            "score_cell_idx",
            true,
        )
        .await?;
        self.ensure_index(
            RESULT_COLLECTION,
            doc! {"game_id": 1, "player_id": 1},
            "result_game_idx",
            true,
        )
        .await?;
        // Round logs are queried across games by date, independent of the
        // game/round hierarchy.
        self.ensure_index(
            ROUND_LOG_COLLECTION,
            doc! {"game_date": -1},
            "round_log_date_idx",
            false,
        )
        .await
    }

    async fn ensure_index(
        &self,
        collection: &'static str,
        keys: Document,
        name: &'static str,
        unique: bool,
    ) -> MongoResult<()> {
        let database = self.database().await;
        let target = database.collection::<Document>(collection);
        let options = IndexOptions::builder()
            .name(Some(name.to_owned()))
            .unique(unique.then_some(true))
            .build();
        let index = mongodb::IndexModel::builder()
            .keys(keys)
            .options(options)
            .build();

        target
            .create_index(index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection,
                index: name,
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn client(&self) -> Client {
        let guard = self.inner.state.read().await;
        guard.client.clone()
    }

    async fn games(&self) -> Collection<MongoGameDocument> {
        self.database().await.collection(GAME_COLLECTION)
    }

    async fn rounds(&self) -> Collection<MongoRoundDocument> {
        self.database().await.collection(ROUND_COLLECTION)
    }

    async fn scores(&self) -> Collection<MongoScoreDocument> {
        self.database().await.collection(SCORE_COLLECTION)
    }

    async fn round_logs(&self) -> Collection<MongoRoundLogDocument> {
        self.database().await.collection(ROUND_LOG_COLLECTION)
    }

    async fn results(&self) -> Collection<MongoResultDocument> {
        self.database().await.collection(RESULT_COLLECTION)
    }

    async fn start_transaction(&self) -> MongoResult<ClientSession> {
        let client = self.client().await;
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })?;
        Ok(session)
    }

    async fn insert_game_if_none_active(
        &self,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> MongoResult<bool> {
        let mut session = self.start_transaction().await?;
        match self
            .conditional_insert(&mut session, game, rounds)
            .await
        {
            Ok(true) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|source| MongoDaoError::Transaction { source })?;
                Ok(true)
            }
            Ok(false) => {
                let _ = session.abort_transaction().await;
                Ok(false)
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err)
            }
        }
    }

    async fn conditional_insert(
        &self,
        session: &mut ClientSession,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> MongoResult<bool> {
        let games = self.games().await;
        let existing = games
            .find_one(doc! {"status": "active"})
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::FindActiveGame { source })?;
        if existing.is_some() {
            return Ok(false);
        }

        let game_id = game.id;
        let document: MongoGameDocument = game.into();
        games
            .insert_one(&document)
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::SaveGame {
                id: game_id,
                source,
            })?;

        let round_collection = self.rounds().await;
        for round in rounds {
            let round_document: MongoRoundDocument = (game_id, round).into();
            round_collection
                .insert_one(&round_document)
                .session(&mut *session)
                .await
                .map_err(|source| MongoDaoError::SaveGame {
                    id: game_id,
                    source,
                })?;
        }

        Ok(true)
    }

    async fn save_game(&self, game: GameEntity) -> MongoResult<()> {
        let id = game.id;
        let document: MongoGameDocument = game.into();
        self.games()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_active_game(&self) -> MongoResult<Option<GameEntity>> {
        let document = self
            .games()
            .await
            .find_one(doc! {"status": "active"})
            .await
            .map_err(|source| MongoDaoError::FindActiveGame { source })?;
        Ok(document.map(Into::into))
    }

    async fn list_completed_games(&self, limit: Option<usize>) -> MongoResult<Vec<GameEntity>> {
        let games = self.games().await;
        let mut query = games
            .find(doc! {"status": "completed"})
            .sort(doc! {"ended_at": -1});
        if let Some(limit) = limit {
            query = query.limit(limit as i64);
        }

        let documents: Vec<MongoGameDocument> = query
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListGames { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_rounds(&self, game_id: Uuid) -> MongoResult<Vec<RoundEntity>> {
        let documents: Vec<MongoRoundDocument> = self
            .rounds()
            .await
            .find(doc! {"game_id": uuid_as_binary(game_id)})
            .sort(doc! {"round_number": 1})
            .await
            .map_err(|source| MongoDaoError::LoadRounds { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadRounds { game_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn find_round(&self, game_id: Uuid, round_id: String) -> MongoResult<Option<RoundEntity>> {
        let document = self
            .rounds()
            .await
            .find_one(doc! {"game_id": uuid_as_binary(game_id), "round_id": &round_id})
            .await
            .map_err(|source| MongoDaoError::LoadRounds { game_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_scores(&self, game_id: Uuid, round_id: String) -> MongoResult<Vec<ScoreEntity>> {
        let documents: Vec<MongoScoreDocument> = self
            .scores()
            .await
            .find(doc! {"game_id": uuid_as_binary(game_id), "round_id": &round_id})
            .sort(doc! {"player_id": 1})
            .await
            .map_err(|source| MongoDaoError::LoadScores { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadScores { game_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_score(
        &self,
        game_id: Uuid,
        round_id: String,
        score: ScoreEntity,
    ) -> MongoResult<()> {
        let document: MongoScoreDocument = (game_id, round_id, score).into();
        self.scores()
            .await
            .replace_one(
                doc! {
                    "game_id": uuid_as_binary(document.game_id),
                    "round_id": &document.round_id,
                    "player_id": &document.player_id,
                },
                &document,
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::ScoreWrite { game_id, source })?;
        Ok(())
    }

    async fn delete_score(
        &self,
        game_id: Uuid,
        round_id: String,
        player_id: String,
    ) -> MongoResult<()> {
        self.scores()
            .await
            .delete_one(doc! {
                "game_id": uuid_as_binary(game_id),
                "round_id": &round_id,
                "player_id": &player_id,
            })
            .await
            .map_err(|source| MongoDaoError::ScoreWrite { game_id, source })?;
        Ok(())
    }

    async fn find_round_log(&self, key: RoundLogKey) -> MongoResult<Option<RoundLogEntity>> {
        let composite = key.composite_id();
        let document = self
            .round_logs()
            .await
            .find_one(doc! {"_id": &composite})
            .await
            .map_err(|source| MongoDaoError::LoadRoundLog {
                key: composite,
                source,
            })?;
        Ok(document.map(Into::into))
    }

    async fn save_round_log(&self, log: RoundLogEntity) -> MongoResult<()> {
        let composite = log.key().composite_id();
        let document: MongoRoundLogDocument = log.into();
        self.round_logs()
            .await
            .replace_one(doc! {"_id": &composite}, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::RoundLogWrite {
                key: composite,
                source,
            })?;
        Ok(())
    }

    async fn delete_round_log(&self, key: RoundLogKey) -> MongoResult<()> {
        let composite = key.composite_id();
        self.round_logs()
            .await
            .delete_one(doc! {"_id": &composite})
            .await
            .map_err(|source| MongoDaoError::RoundLogWrite {
                key: composite,
                source,
            })?;
        Ok(())
    }

    async fn find_results(&self, game_id: Uuid) -> MongoResult<Vec<GameResultEntity>> {
        let documents: Vec<MongoResultDocument> = self
            .results()
            .await
            .find(doc! {"game_id": uuid_as_binary(game_id)})
            .sort(doc! {"rank": 1})
            .await
            .map_err(|source| MongoDaoError::LoadResults { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadResults { game_id, source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> MongoResult<()> {
        let mut session = self.start_transaction().await?;

        for op in batch.into_ops() {
            if let Err(err) = self.apply_op(&mut session, op).await {
                let _ = session.abort_transaction().await;
                return Err(err);
            }
        }

        session
            .commit_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })
    }

    async fn apply_op(&self, session: &mut ClientSession, op: WriteOp) -> MongoResult<()> {
        match op {
            WriteOp::PutGame(game) => {
                let id = game.id;
                let document: MongoGameDocument = game.into();
                self.games()
                    .await
                    .replace_one(doc_id(id), &document)
                    .upsert(true)
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::SaveGame { id, source })?;
            }
            WriteOp::DeleteGame(game_id) => {
                self.games()
                    .await
                    .delete_one(doc_id(game_id))
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::SaveGame {
                        id: game_id,
                        source,
                    })?;
            }
            WriteOp::PutRound(game_id, round) => {
                let document: MongoRoundDocument = (game_id, round).into();
                self.rounds()
                    .await
                    .replace_one(
                        doc! {"game_id": uuid_as_binary(game_id), "round_id": &document.round_id},
                        &document,
                    )
                    .upsert(true)
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::LoadRounds { game_id, source })?;
            }
            WriteOp::DeleteRound(game_id, round_id) => {
                self.rounds()
                    .await
                    .delete_one(doc! {"game_id": uuid_as_binary(game_id), "round_id": &round_id})
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::LoadRounds { game_id, source })?;
            }
            WriteOp::PutScore(game_id, round_id, score) => {
                let document: MongoScoreDocument = (game_id, round_id, score).into();
                self.scores()
                    .await
                    .replace_one(
                        doc! {
                            "game_id": uuid_as_binary(document.game_id),
                            "round_id": &document.round_id,
                            "player_id": &document.player_id,
                        },
                        &document,
                    )
                    .upsert(true)
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::ScoreWrite { game_id, source })?;
            }
            WriteOp::DeleteScore(game_id, round_id, player_id) => {
                self.scores()
                    .await
                    .delete_one(doc! {
                        "game_id": uuid_as_binary(game_id),
                        "round_id": &round_id,
                        "player_id": &player_id,
                    })
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::ScoreWrite { game_id, source })?;
            }
            WriteOp::PutRoundLog(log) => {
                let composite = log.key().composite_id();
                let document: MongoRoundLogDocument = log.into();
                self.round_logs()
                    .await
                    .replace_one(doc! {"_id": &composite}, &document)
                    .upsert(true)
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::RoundLogWrite {
                        key: composite,
                        source,
                    })?;
            }
            WriteOp::DeleteRoundLog(key) => {
                let composite = key.composite_id();
                self.round_logs()
                    .await
                    .delete_one(doc! {"_id": &composite})
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::RoundLogWrite {
                        key: composite,
                        source,
                    })?;
            }
            WriteOp::PutResult(game_id, result) => {
                let document: MongoResultDocument = (game_id, result).into();
                self.results()
                    .await
                    .replace_one(
                        doc! {
                            "game_id": uuid_as_binary(document.game_id),
                            "player_id": &document.player_id,
                        },
                        &document,
                    )
                    .upsert(true)
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::LoadResults { game_id, source })?;
            }
            WriteOp::DeleteResult(game_id, player_id) => {
                self.results()
                    .await
                    .delete_one(doc! {
                        "game_id": uuid_as_binary(game_id),
                        "player_id": &player_id,
                    })
                    .session(&mut *session)
                    .await
                    .map_err(|source| MongoDaoError::LoadResults { game_id, source })?;
            }
        }
        Ok(())
    }
}

impl GameStore for MongoGameStore {
    fn insert_game_if_none_active(
        &self,
        game: GameEntity,
        rounds: Vec<RoundEntity>,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_game_if_none_active(game, rounds)
                .await
                .map_err(Into::into)
        })
    }

    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn find_active_game(&self) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_active_game().await.map_err(Into::into) })
    }

    fn list_completed_games(
        &self,
        limit: Option<usize>,
    ) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_completed_games(limit).await.map_err(Into::into) })
    }

    fn find_rounds(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_rounds(game_id).await.map_err(Into::into) })
    }

    fn find_round(
        &self,
        game_id: Uuid,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoundEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_round(game_id, round_id).await.map_err(Into::into) })
    }

    fn find_scores(
        &self,
        game_id: Uuid,
        round_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<ScoreEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_scores(game_id, round_id).await.map_err(Into::into) })
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
                .save_score(game_id, round_id, score)
                .await
                .map_err(Into::into)
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
                .delete_score(game_id, round_id, player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_round_log(
        &self,
        key: RoundLogKey,
    ) -> BoxFuture<'static, StorageResult<Option<RoundLogEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_round_log(key).await.map_err(Into::into) })
    }

    fn save_round_log(&self, log: RoundLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_round_log(log).await.map_err(Into::into) })
    }

    fn delete_round_log(&self, key: RoundLogKey) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_round_log(key).await.map_err(Into::into) })
    }

    fn find_results(
        &self,
        game_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GameResultEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_results(game_id).await.map_err(Into::into) })
    }

    fn commit_batch(&self, batch: WriteBatch) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.commit_batch(batch).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
