//! Game lifecycle operations: start, resize, tagging, progress, listings.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::{GameStore, WriteBatch},
        models::{GameEntity, GameStatus, RoundEntity, RoundLogKey},
    },
    dto::game::{GameSummary, GameWithResults, RoundSummary, StartGameRequest},
    error::ServiceError,
    services::{round_log_service, sse_events},
    state::SharedState,
};

/// Longest tag accepted after trimming.
pub const MAX_TAG_LENGTH: usize = 24;
/// Default page size of the completed-games listing.
const DEFAULT_COMPLETED_LIMIT: usize = 50;

/// Start a fresh game unless one is already active.
///
/// The active-game check and the creation of the game plus its rounds happen
/// inside one atomic store operation, so two racing starters cannot both
/// succeed.
pub async fn start_game(
    state: &SharedState,
    request: StartGameRequest,
) -> Result<GameSummary, ServiceError> {
    let total_rounds = request
        .total_rounds
        .unwrap_or_else(|| state.config().default_total_rounds());
    if total_rounds == 0 {
        return Err(ServiceError::InvalidArgument(
            "total rounds must be greater than zero".into(),
        ));
    }

    let store = state.require_game_store().await?;

    let game = GameEntity {
        id: Uuid::new_v4(),
        started_at: SystemTime::now(),
        ended_at: None,
        total_rounds,
        rounds_played: 0,
        status: GameStatus::Active,
        hide_scores: false,
        tag: None,
        notes: None,
    };
    let rounds: Vec<RoundEntity> = (1..=total_rounds).map(RoundEntity::new).collect();
    let round_summaries: Vec<RoundSummary> = rounds.iter().cloned().map(Into::into).collect();

    let created = store
        .insert_game_if_none_active(game.clone(), rounds)
        .await?;
    if !created {
        return Err(ServiceError::Conflict(
            "an active game already exists; end or discard it before starting a new one".into(),
        ));
    }

    info!(game_id = %game.id, total_rounds, "started new game");
    let summary: GameSummary = game.into();
    sse_events::broadcast_game_updated(state, summary.clone());
    sse_events::broadcast_rounds_updated(state, summary.id, round_summaries);
    Ok(summary)
}

/// The single active game, if one exists.
pub async fn find_active_game(state: &SharedState) -> Result<Option<GameSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    Ok(store.find_active_game().await?.map(Into::into))
}

/// Fetch one game by id.
pub async fn get_game(state: &SharedState, game_id: Uuid) -> Result<GameSummary, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };
    Ok(game.into())
}

/// Ordered round list of a game.
pub async fn list_rounds(
    state: &SharedState,
    game_id: Uuid,
) -> Result<Vec<RoundSummary>, ServiceError> {
    let store = state.require_game_store().await?;
    if store.find_game(game_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }
    let rounds = store.find_rounds(game_id).await?;
    Ok(rounds.into_iter().map(Into::into).collect())
}

/// Resize the round set of a game.
///
/// Growing appends fresh rounds; shrinking deletes trailing rounds together
/// with their scores and round logs in one atomic batch. `rounds_played` is
/// clamped to the new total, then re-derived from live scores.
pub async fn update_total_rounds(
    state: &SharedState,
    game_id: Uuid,
    next_total: u32,
) -> Result<GameSummary, ServiceError> {
    if next_total == 0 {
        return Err(ServiceError::InvalidArgument(
            "total rounds must be greater than zero".into(),
        ));
    }

    let store = state.require_game_store().await?;
    let Some(mut game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };

    let current_total = game.total_rounds;
    game.total_rounds = next_total;
    game.rounds_played = game.rounds_played.min(next_total);

    let mut batch = WriteBatch::new();
    batch.put_game(game);

    if next_total > current_total {
        for round_number in (current_total + 1)..=next_total {
            batch.put_round(game_id, RoundEntity::new(round_number));
        }
    } else if next_total < current_total {
        for round_number in (next_total + 1)..=current_total {
            let round_id = RoundEntity::sequence_id(round_number);
            let scores = store.find_scores(game_id, round_id.clone()).await?;
            for score in scores {
                batch.delete_score(game_id, round_id.clone(), score.player_id);
            }
            batch.delete_round(game_id, round_id.clone());
            batch.delete_round_log(RoundLogKey { game_id, round_id });
        }
    }

    store.commit_batch(batch).await?;
    info!(game_id = %game_id, from = current_total, to = next_total, "resized round set");

    // Re-derive progress now that the round set changed shape.
    sync_progress(state, game_id).await?;

    let summary = get_game(state, game_id).await?;
    let rounds = store.find_rounds(game_id).await?;
    sse_events::broadcast_rounds_updated(
        state,
        game_id,
        rounds.into_iter().map(Into::into).collect(),
    );
    Ok(summary)
}

/// Set the score-masking flag of a game.
pub async fn toggle_hide_scores(
    state: &SharedState,
    game_id: Uuid,
    hide: bool,
) -> Result<GameSummary, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(mut game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };

    game.hide_scores = hide;
    store.save_game(game.clone()).await?;

    let summary: GameSummary = game.into();
    sse_events::broadcast_game_updated(state, summary.clone());
    Ok(summary)
}

/// Set or clear the tag of a game. Whitespace-only input clears it.
pub async fn update_tag(
    state: &SharedState,
    game_id: Uuid,
    tag: Option<String>,
) -> Result<GameSummary, ServiceError> {
    let tag = normalize_tag(tag)?;

    let store = state.require_game_store().await?;
    let Some(mut game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };

    game.tag = tag;
    store.save_game(game.clone()).await?;

    let summary: GameSummary = game.into();
    sse_events::broadcast_game_updated(state, summary.clone());
    Ok(summary)
}

/// Count the rounds of a game that hold a full score set.
pub async fn count_completed_rounds(
    state: &SharedState,
    game_id: Uuid,
) -> Result<u32, ServiceError> {
    let store = state.require_game_store().await?;
    let mut completed = 0;
    for round in store.find_rounds(game_id).await? {
        let scores = store.find_scores(game_id, round.id.clone()).await?;
        if round_log_service::complete_points(state.roster(), &scores).is_some() {
            completed += 1;
        }
    }
    Ok(completed)
}

/// Recount fully-scored rounds and persist the count on the game document.
pub async fn sync_progress(state: &SharedState, game_id: Uuid) -> Result<u32, ServiceError> {
    let store = state.require_game_store().await?;
    let Some(mut game) = store.find_game(game_id).await? else {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    };

    let completed = count_completed_rounds(state, game_id).await?;
    game.rounds_played = completed;
    store.save_game(game.clone()).await?;
    sse_events::broadcast_game_updated(state, game.into());
    Ok(completed)
}

/// Completed games, newest first, each with its ranked results.
pub async fn list_completed_games(
    state: &SharedState,
    limit: Option<usize>,
) -> Result<Vec<GameWithResults>, ServiceError> {
    let store = state.require_game_store().await?;
    let games = store
        .list_completed_games(Some(limit.unwrap_or(DEFAULT_COMPLETED_LIMIT)))
        .await?;

    let mut listed = Vec::with_capacity(games.len());
    for game in games {
        let results = store.find_results(game.id).await?;
        listed.push(GameWithResults {
            game: game.into(),
            results: results.into_iter().map(Into::into).collect(),
        });
    }
    Ok(listed)
}

/// The most recently completed game, if any.
pub async fn latest_completed_game(
    state: &SharedState,
) -> Result<Option<GameWithResults>, ServiceError> {
    Ok(list_completed_games(state, Some(1)).await?.into_iter().next())
}

/// Trim a tag, clearing it when empty and rejecting it when too long.
fn normalize_tag(tag: Option<String>) -> Result<Option<String>, ServiceError> {
    let trimmed = tag.as_deref().map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let length = trimmed.chars().count();
    if length > MAX_TAG_LENGTH {
        return Err(ServiceError::TagTooLong {
            length,
            max: MAX_TAG_LENGTH,
        });
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(all(test, feature = "mem-store"))]
mod tests {
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryGameStore},
        dao::models::{RoundLogSource, ScoreEntity},
        services::{round_log_service, score_service},
        state::AppState,
    };

    use super::*;

    async fn test_state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        state
    }

    async fn score_round(state: &SharedState, game_id: Uuid, round_id: &str, points: [u8; 4]) {
        for (player_id, value) in ["A", "Y", "D", "C"].into_iter().zip(points) {
            score_service::set_round_score(state, game_id, round_id, player_id, Some(value))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn second_start_conflicts_while_a_game_is_active() {
        let state = test_state().await;
        start_game(&state, StartGameRequest::default()).await.unwrap();

        let err = start_game(&state, StartGameRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn start_creates_the_full_round_set() {
        let state = test_state().await;
        let summary = start_game(
            &state,
            StartGameRequest {
                total_rounds: Some(4),
            },
        )
        .await
        .unwrap();

        assert_eq!(summary.total_rounds, 4);
        assert_eq!(summary.rounds_played, 0);
        assert_eq!(summary.status, crate::dao::models::GameStatus::Active);

        let rounds = list_rounds(&state, summary.id).await.unwrap();
        let ids: Vec<&str> = rounds.iter().map(|round| round.id.as_str()).collect();
        assert_eq!(ids, vec!["01", "02", "03", "04"]);
    }

    #[tokio::test]
    async fn shrink_discards_trailing_rounds_scores_and_logs() {
        let state = test_state().await;
        let game = start_game(
            &state,
            StartGameRequest {
                total_rounds: Some(10),
            },
        )
        .await
        .unwrap();

        for round_id in ["01", "02", "03"] {
            score_round(&state, game.id, round_id, [0, 3, 5, 8]).await;
        }
        sync_progress(&state, game.id).await.unwrap();

        let resized = update_total_rounds(&state, game.id, 2).await.unwrap();
        assert_eq!(resized.total_rounds, 2);
        assert_eq!(resized.rounds_played, 2);

        let rounds = list_rounds(&state, game.id).await.unwrap();
        assert_eq!(rounds.len(), 2);

        let store = state.game_store().await.unwrap();
        assert!(
            store
                .find_scores(game.id, "03".into())
                .await
                .unwrap()
                .is_empty()
        );
        assert!(
            store
                .find_round_log(RoundLogKey {
                    game_id: game.id,
                    round_id: "03".into(),
                })
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn grow_appends_fresh_unlocked_rounds() {
        let state = test_state().await;
        let game = start_game(
            &state,
            StartGameRequest {
                total_rounds: Some(2),
            },
        )
        .await
        .unwrap();

        update_total_rounds(&state, game.id, 5).await.unwrap();
        let rounds = list_rounds(&state, game.id).await.unwrap();
        assert_eq!(rounds.len(), 5);
        assert!(rounds.iter().all(|round| !round.locked));
        assert_eq!(rounds[4].id, "05");
    }

    #[tokio::test]
    async fn resize_rejects_zero_and_missing_games() {
        let state = test_state().await;
        let game = start_game(&state, StartGameRequest::default()).await.unwrap();

        assert!(matches!(
            update_total_rounds(&state, game.id, 0).await.unwrap_err(),
            ServiceError::InvalidArgument(_)
        ));
        assert!(matches!(
            update_total_rounds(&state, Uuid::new_v4(), 3)
                .await
                .unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn tag_is_trimmed_cleared_and_capped() {
        let state = test_state().await;
        let game = start_game(&state, StartGameRequest::default()).await.unwrap();

        let tagged = update_tag(&state, game.id, Some("  friday night  ".into()))
            .await
            .unwrap();
        assert_eq!(tagged.tag.as_deref(), Some("friday night"));

        let cleared = update_tag(&state, game.id, Some("   ".into())).await.unwrap();
        assert_eq!(cleared.tag, None);

        let exact = "x".repeat(24);
        let kept = update_tag(&state, game.id, Some(exact.clone())).await.unwrap();
        assert_eq!(kept.tag.as_deref(), Some(exact.as_str()));

        let err = update_tag(&state, game.id, Some("y".repeat(25)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::TagTooLong {
                length: 25,
                max: 24
            }
        ));
    }

    #[tokio::test]
    async fn hide_scores_round_trips() {
        let state = test_state().await;
        let game = start_game(&state, StartGameRequest::default()).await.unwrap();

        let hidden = toggle_hide_scores(&state, game.id, true).await.unwrap();
        assert!(hidden.hide_scores);
        let shown = toggle_hide_scores(&state, game.id, false).await.unwrap();
        assert!(!shown.hide_scores);
    }

    #[tokio::test]
    async fn progress_counts_only_fully_scored_rounds() {
        let state = test_state().await;
        let game = start_game(
            &state,
            StartGameRequest {
                total_rounds: Some(3),
            },
        )
        .await
        .unwrap();

        score_round(&state, game.id, "01", [0, 3, 5, 8]).await;
        // Round 2 is only partially scored.
        score_service::set_round_score(&state, game.id, "02", "A", Some(4))
            .await
            .unwrap();

        let completed = sync_progress(&state, game.id).await.unwrap();
        assert_eq!(completed, 1);
        assert_eq!(get_game(&state, game.id).await.unwrap().rounds_played, 1);
    }

    #[tokio::test]
    async fn reconcile_keeps_logs_for_realtime_writes() {
        let state = test_state().await;
        let game = start_game(&state, StartGameRequest::default()).await.unwrap();
        score_round(&state, game.id, "01", [2, 0, 5, 8]).await;

        let store = state.game_store().await.unwrap();
        let log = store
            .find_round_log(RoundLogKey {
                game_id: game.id,
                round_id: "01".into(),
            })
            .await
            .unwrap()
            .expect("realtime log should exist");
        assert_eq!(log.source, RoundLogSource::Realtime);
        assert_eq!(log.total_round_points, 15);
    }

    #[tokio::test]
    async fn foreign_score_rows_do_not_complete_rounds() {
        let state = test_state().await;
        let game = start_game(&state, StartGameRequest::default()).await.unwrap();
        let store = state.game_store().await.unwrap();

        for player_id in ["A", "Y", "D"] {
            score_service::set_round_score(&state, game.id, "01", player_id, Some(3))
                .await
                .unwrap();
        }
        // A stray row written around the service layer must not count as C's.
        store
            .save_score(
                game.id,
                "01".into(),
                ScoreEntity {
                    player_id: "Z".into(),
                    points: Some(1),
                    entered_at: std::time::SystemTime::now(),
                },
            )
            .await
            .unwrap();

        let wrote = round_log_service::reconcile(
            &store,
            state.roster(),
            game.id,
            "01",
            RoundLogSource::Realtime,
        )
        .await
        .unwrap();
        assert!(!wrote);
        assert_eq!(sync_progress(&state, game.id).await.unwrap(), 0);
    }
}
