//! Game close: aggregation of complete rounds into immutable ranked results.

use std::time::SystemTime;

use indexmap::IndexMap;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{GameStore, WriteBatch},
        models::{GameResultEntity, GameStatus, RoundLogEntity, RoundLogSource},
    },
    dto::game::{ClosingStatus, ResultSummary},
    error::ServiceError,
    scoring::{self, RankedPlayer},
    services::{round_log_service, sse_events},
    state::SharedState,
};

/// Terminate a game.
///
/// `Completed` runs the finalizer: every complete round is validated against
/// the one-zero-winner rule, aggregated into totals and win counts, ranked,
/// and persisted together with finalized round logs in one atomic batch.
/// `Abandoned` only stamps the end; no results are produced.
pub async fn close_game(
    state: &SharedState,
    game_id: Uuid,
    status: ClosingStatus,
) -> Result<Vec<ResultSummary>, ServiceError> {
    match status {
        ClosingStatus::Abandoned => {
            abandon_game(state, game_id).await?;
            Ok(Vec::new())
        }
        ClosingStatus::Completed => finalize_game(state, game_id).await,
    }
}

/// Ranked results of a game, rank ascending. Empty until the game closes.
pub async fn get_results(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<ResultSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let results = store.find_results(game_id).await?;
    Ok(results.into_iter().map(Into::into).collect())
}

async fn abandon_game(state: &SharedState, game_id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let Some(mut game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };

    game.status = GameStatus::Abandoned;
    game.ended_at = Some(SystemTime::now());
    store.save_game(game.clone()).await?;

    info!(game_id = %game_id, "abandoned game");
    sse_events::broadcast_game_updated(state, game.into());
    Ok(())
}

async fn finalize_game(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<ResultSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };

    let roster = state.roster();
    let mut totals: IndexMap<String, u32> = roster.ids().map(|id| (id.to_string(), 0)).collect();
    let mut wins: IndexMap<String, u32> = roster.ids().map(|id| (id.to_string(), 0)).collect();
    let ended_at = SystemTime::now();
    let mut completed_rounds = 0u32;
    let mut staged_logs = Vec::new();

    for round in store.find_rounds(game_id).await? {
        let scores = store.find_scores(game_id, round.id.clone()).await?;
        // Incomplete rounds are excluded from aggregation; a complete round
        // without exactly one zero-point winner aborts the whole close.
        let Some(points_by_player) = round_log_service::complete_points(roster, &scores) else {
            continue;
        };

        let winner = scoring::round_winner(&points_by_player)
            .map_err(|err| {
                ServiceError::InvalidRoundResult(format!("round {}: {err}", round.id))
            })?
            .to_string();

        for (player_id, points) in &points_by_player {
            if let Some(total) = totals.get_mut(player_id) {
                *total += u32::from(*points);
            }
        }
        if let Some(count) = wins.get_mut(&winner) {
            *count += 1;
        }
        completed_rounds += 1;

        let total_round_points = scoring::total_points(&points_by_player);
        staged_logs.push(RoundLogEntity {
            game_id,
            round_id: round.id.clone(),
            round_number: round.round_number,
            points_by_player,
            total_round_points,
            game_started_at: game.started_at,
            game_ended_at: Some(ended_at),
            game_date: ended_at,
            source: RoundLogSource::EndGame,
            logged_at: ended_at,
        });
    }

    let ranked = rank_with_fresh_rng(&totals);

    let mut batch = WriteBatch::new();
    for log in staged_logs {
        batch.put_round_log(log);
    }

    let mut results = Vec::with_capacity(ranked.len());
    for entry in ranked {
        let rounds_won = wins.get(&entry.player_id).copied().unwrap_or(0);
        let result = GameResultEntity {
            player_id: entry.player_id,
            rank: entry.rank,
            total_points: entry.total_points,
            rounds_won,
        };
        batch.put_result(game_id, result.clone());
        results.push(result);
    }

    let mut closed = game;
    closed.status = GameStatus::Completed;
    closed.ended_at = Some(ended_at);
    closed.rounds_played = closed.total_rounds.min(completed_rounds);
    batch.put_game(closed.clone());

    store.commit_batch(batch).await?;
    info!(game_id = %game_id, completed_rounds, "closed game");

    let summaries: Vec<ResultSummary> = results.into_iter().map(Into::into).collect();
    sse_events::broadcast_game_updated(state, closed.into());
    sse_events::broadcast_results_ready(state, game_id, summaries.clone());
    Ok(summaries)
}

/// Rank with a fresh thread-local generator, kept out of any await span.
fn rank_with_fresh_rng(totals: &IndexMap<String, u32>) -> Vec<RankedPlayer> {
    let mut rng = rand::rng();
    scoring::rank_players(totals, &mut rng)
}

#[cfg(all(test, feature = "mem-store"))]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::{
            game_store::{GameStore, memory::MemoryGameStore},
            models::RoundLogKey,
        },
        dto::game::StartGameRequest,
        services::{game_service, score_service},
        state::AppState,
    };

    use super::*;

    async fn state_with_game(total_rounds: u32) -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        let game = game_service::start_game(
            &state,
            StartGameRequest {
                total_rounds: Some(total_rounds),
            },
        )
        .await
        .unwrap();
        (state, game.id)
    }

    async fn score_round(state: &SharedState, game_id: Uuid, round_id: &str, points: [u8; 4]) {
        for (player_id, value) in ["A", "Y", "D", "C"].into_iter().zip(points) {
            score_service::set_round_score(state, game_id, round_id, player_id, Some(value))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn close_ranks_players_by_ascending_total() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [0, 3, 5, 8]).await;

        let results = close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].player_id, "A");
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].total_points, 0);
        assert_eq!(results[0].rounds_won, 1);
        let order: Vec<&str> = results.iter().map(|entry| entry.player_id.as_str()).collect();
        assert_eq!(order, vec!["A", "Y", "D", "C"]);

        let game = game_service::get_game(&state, game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::Completed);
        assert!(game.ended_at.is_some());
        assert_eq!(game.rounds_played, 1);
    }

    #[tokio::test]
    async fn close_stages_end_game_logs_for_complete_rounds() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [0, 3, 5, 8]).await;
        score_round(&state, game_id, "02", [4, 0, 6, 2]).await;

        close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap();

        let store = state.game_store().await.unwrap();
        for round_id in ["01", "02"] {
            let log = store
                .find_round_log(RoundLogKey {
                    game_id,
                    round_id: round_id.into(),
                })
                .await
                .unwrap()
                .expect("finalized log should exist");
            assert_eq!(log.source, RoundLogSource::EndGame);
            assert!(log.game_ended_at.is_some());
        }
    }

    #[tokio::test]
    async fn round_without_a_zero_aborts_the_close() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [3, 3, 3, 3]).await;

        let err = close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRoundResult(_)));

        let game = game_service::get_game(&state, game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::Active);
        assert!(get_results(&state, game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn round_with_two_zeros_aborts_the_close() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [0, 0, 5, 8]).await;

        let err = close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidRoundResult(_)));
        assert!(get_results(&state, game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn incomplete_rounds_are_silently_excluded() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [0, 3, 5, 8]).await;
        // Round 2 has one missing cell and an invalid zero distribution, but
        // being incomplete it must not be validated or aggregated.
        for (player_id, value) in [("A", 0), ("Y", 0), ("D", 4)] {
            score_service::set_round_score(&state, game_id, "02", player_id, Some(value))
                .await
                .unwrap();
        }

        let results = close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap();
        assert_eq!(results[0].total_points, 0);
        let game = game_service::get_game(&state, game_id).await.unwrap();
        assert_eq!(game.rounds_played, 1);
    }

    #[tokio::test]
    async fn abandon_produces_no_results() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [0, 3, 5, 8]).await;

        let results = close_game(&state, game_id, ClosingStatus::Abandoned)
            .await
            .unwrap();
        assert!(results.is_empty());

        let game = game_service::get_game(&state, game_id).await.unwrap();
        assert_eq!(game.status, GameStatus::Abandoned);
        assert!(game.ended_at.is_some());
        assert!(get_results(&state, game_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tied_players_still_receive_distinct_ranks() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [0, 5, 5, 5]).await;

        let results = close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap();

        let ranks: HashSet<u32> = results.iter().map(|entry| entry.rank).collect();
        assert_eq!(ranks, HashSet::from([1, 2, 3, 4]));
        assert_eq!(results[0].player_id, "A");
    }

    #[tokio::test]
    async fn repeated_close_re_derives_the_same_totals() {
        let (state, game_id) = state_with_game(4).await;
        score_round(&state, game_id, "01", [0, 3, 5, 8]).await;

        let first = close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap();
        let second = close_game(&state, game_id, ClosingStatus::Completed)
            .await
            .unwrap();

        let totals = |results: &[ResultSummary]| {
            results
                .iter()
                .map(|entry| (entry.player_id.clone(), entry.total_points, entry.rounds_won))
                .collect::<HashSet<_>>()
        };
        assert_eq!(totals(&first), totals(&second));
    }

    #[tokio::test]
    async fn close_of_a_missing_game_is_not_found() {
        let (state, _) = state_with_game(4).await;
        let err = close_game(&state, Uuid::new_v4(), ClosingStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
