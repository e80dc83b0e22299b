//! End-to-end flow through the service layer on the in-memory store.

#![cfg(feature = "mem-store")]

use std::sync::Arc;

use scorepad_back::{
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    dao::models::GameStatus,
    dto::game::{ClosingStatus, StartGameRequest},
    services::{game_service, results_service, score_service, undo_service},
    state::{AppState, SharedState},
};

async fn fresh_state() -> SharedState {
    let state = AppState::new(AppConfig::default());
    state
        .install_game_store(Arc::new(MemoryGameStore::new()))
        .await;
    state
}

#[tokio::test]
async fn full_game_from_start_to_ranked_results() {
    let state = fresh_state().await;

    let game = game_service::start_game(
        &state,
        StartGameRequest {
            total_rounds: Some(4),
        },
    )
    .await
    .unwrap();
    assert_eq!(
        game_service::find_active_game(&state)
            .await
            .unwrap()
            .map(|active| active.id),
        Some(game.id)
    );

    for (player_id, points) in [("A", 0), ("Y", 3), ("D", 5), ("C", 8)] {
        score_service::set_round_score(&state, game.id, "01", player_id, Some(points))
            .await
            .unwrap();
    }

    let results = results_service::close_game(&state, game.id, ClosingStatus::Completed)
        .await
        .unwrap();

    assert_eq!(results[0].player_id, "A");
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[0].total_points, 0);
    assert_eq!(results[0].rounds_won, 1);

    let tail: Vec<(&str, u32)> = results[1..]
        .iter()
        .map(|entry| (entry.player_id.as_str(), entry.total_points))
        .collect();
    assert_eq!(tail, vec![("Y", 3), ("D", 5), ("C", 8)]);

    let closed = game_service::get_game(&state, game.id).await.unwrap();
    assert_eq!(closed.status, GameStatus::Completed);
    assert_eq!(closed.rounds_played, 1);
    assert!(game_service::find_active_game(&state).await.unwrap().is_none());

    let listed = game_service::list_completed_games(&state, None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].game.id, game.id);
    assert_eq!(listed[0].results.len(), 4);

    let latest = game_service::latest_completed_game(&state)
        .await
        .unwrap()
        .expect("one completed game");
    assert_eq!(latest.game.id, game.id);
}

#[tokio::test]
async fn delete_then_restore_preserves_summary_but_not_history() {
    let state = fresh_state().await;

    let game = game_service::start_game(
        &state,
        StartGameRequest {
            total_rounds: Some(2),
        },
    )
    .await
    .unwrap();
    for (player_id, points) in [("A", 2), ("Y", 0), ("D", 6), ("C", 1)] {
        score_service::set_round_score(&state, game.id, "01", player_id, Some(points))
            .await
            .unwrap();
    }
    results_service::close_game(&state, game.id, ClosingStatus::Completed)
        .await
        .unwrap();

    let snapshot = undo_service::delete_game(&state, game.id).await.unwrap();
    assert!(matches!(
        game_service::get_game(&state, game.id).await,
        Err(scorepad_back::error::ServiceError::NotFound(_))
    ));

    undo_service::restore_game(&state, snapshot).await.unwrap();

    let restored = game_service::get_game(&state, game.id).await.unwrap();
    assert_eq!(restored.status, GameStatus::Completed);
    let results = results_service::get_results(&state, game.id).await.unwrap();
    assert_eq!(results.len(), 4);
    assert_eq!(results[0].player_id, "Y");

    // History is not part of the snapshot: the round set stays empty.
    assert!(game_service::list_rounds(&state, game.id).await.unwrap().is_empty());
    assert!(
        score_service::list_scores(&state, game.id, "01")
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn a_new_game_can_start_after_the_previous_one_ends() {
    let state = fresh_state().await;

    let first = game_service::start_game(&state, StartGameRequest::default())
        .await
        .unwrap();
    results_service::close_game(&state, first.id, ClosingStatus::Abandoned)
        .await
        .unwrap();

    let second = game_service::start_game(&state, StartGameRequest::default())
        .await
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.total_rounds, 10);
}
