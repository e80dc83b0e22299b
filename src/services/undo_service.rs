//! Deletion with undo: snapshot first, delete atomically, restore on demand.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{GameStore, WriteBatch},
        models::{GameSnapshotEntity, RoundLogKey},
    },
    dto::game::GameSummary,
    error::ServiceError,
    services::sse_events,
    state::SharedState,
};

/// Delete a game and every child document, returning the undo snapshot.
///
/// The snapshot captures the game document and its results. Rounds, scores,
/// and round logs are deleted but not captured, so a later restore brings
/// back the summary without the editable history.
pub async fn delete_game(
    state: &SharedState,
    game_id: Uuid,
) -> Result<GameSnapshotEntity, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    let results = store.find_results(game_id).await?;

    let snapshot = GameSnapshotEntity {
        game: game.clone(),
        results: results.clone(),
    };

    let mut batch = WriteBatch::new();
    for result in results {
        batch.delete_result(game_id, result.player_id);
    }
    for round in store.find_rounds(game_id).await? {
        let scores = store.find_scores(game_id, round.id.clone()).await?;
        for score in scores {
            batch.delete_score(game_id, round.id.clone(), score.player_id);
        }
        batch.delete_round(game_id, round.id.clone());
        batch.delete_round_log(RoundLogKey {
            game_id,
            round_id: round.id,
        });
    }
    batch.delete_game(game_id);

    store.commit_batch(batch).await?;
    info!(game_id = %game_id, "deleted game and all children");

    sse_events::broadcast_game_deleted(state, game_id);
    Ok(snapshot)
}

/// Re-create a deleted game and its results from a snapshot.
pub async fn restore_game(
    state: &SharedState,
    snapshot: GameSnapshotEntity,
) -> Result<GameSummary, ServiceError> {
    let store = state.require_game_store().await?;

    let game_id = snapshot.game.id;
    let mut batch = WriteBatch::new();
    batch.put_game(snapshot.game.clone());
    for result in snapshot.results {
        batch.put_result(game_id, result);
    }

    store.commit_batch(batch).await?;
    info!(game_id = %game_id, "restored game from snapshot");

    let summary: GameSummary = snapshot.game.into();
    sse_events::broadcast_game_updated(state, summary.clone());
    Ok(summary)
}

#[cfg(all(test, feature = "mem-store"))]
mod tests {
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryGameStore},
        dto::game::{ClosingStatus, StartGameRequest},
        services::{game_service, results_service, score_service},
        state::AppState,
    };

    use super::*;

    async fn completed_game(state: &SharedState) -> Uuid {
        let game = game_service::start_game(
            state,
            StartGameRequest {
                total_rounds: Some(3),
            },
        )
        .await
        .unwrap();
        for (player_id, points) in [("A", 0), ("Y", 3), ("D", 5), ("C", 8)] {
            score_service::set_round_score(state, game.id, "01", player_id, Some(points))
                .await
                .unwrap();
        }
        game_service::update_tag(state, game.id, Some("rainy sunday".into()))
            .await
            .unwrap();
        results_service::close_game(state, game.id, ClosingStatus::Completed)
            .await
            .unwrap();
        game.id
    }

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        state
    }

    #[tokio::test]
    async fn delete_removes_the_game_and_every_child() {
        let state = test_state().await;
        let game_id = completed_game(&state).await;

        let snapshot = delete_game(&state, game_id).await.unwrap();
        assert_eq!(snapshot.game.id, game_id);
        assert_eq!(snapshot.results.len(), 4);

        let store = state.game_store().await.unwrap();
        assert!(store.find_game(game_id).await.unwrap().is_none());
        assert!(store.find_rounds(game_id).await.unwrap().is_empty());
        assert!(
            store
                .find_scores(game_id, "01".into())
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .find_round_log(RoundLogKey {
                    game_id,
                    round_id: "01".into(),
                })
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.find_results(game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_of_a_missing_game_is_not_found() {
        let state = test_state().await;
        let err = delete_game(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn restore_round_trips_game_fields_and_results_only() {
        let state = test_state().await;
        let game_id = completed_game(&state).await;
        let before = game_service::get_game(&state, game_id).await.unwrap();
        let results_before = results_service::get_results(&state, game_id).await.unwrap();

        let snapshot = delete_game(&state, game_id).await.unwrap();
        restore_game(&state, snapshot).await.unwrap();

        let after = game_service::get_game(&state, game_id).await.unwrap();
        assert_eq!(after.tag, before.tag);
        assert_eq!(after.started_at, before.started_at);
        assert_eq!(after.ended_at, before.ended_at);
        assert_eq!(after.total_rounds, before.total_rounds);
        assert_eq!(after.rounds_played, before.rounds_played);
        assert_eq!(after.status, before.status);

        let results_after = results_service::get_results(&state, game_id).await.unwrap();
        assert_eq!(results_after.len(), results_before.len());
        for (restored, original) in results_after.iter().zip(&results_before) {
            assert_eq!(restored.player_id, original.player_id);
            assert_eq!(restored.rank, original.rank);
            assert_eq!(restored.total_points, original.total_points);
            assert_eq!(restored.rounds_won, original.rounds_won);
        }

        // Restoration is lossy on purpose: the editable history stays gone.
        let store = state.game_store().await.unwrap();
        assert!(store.find_rounds(game_id).await.unwrap().is_empty());
        assert!(
            store
                .find_scores(game_id, "01".into())
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .find_round_log(RoundLogKey {
                    game_id,
                    round_id: "01".into(),
                })
                .await
                .unwrap()
                .is_none()
        );
    }
}
