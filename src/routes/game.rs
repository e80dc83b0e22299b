use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dao::models::GameSnapshotEntity,
    dto::game::{
        CloseGameRequest, CompletedGamesQuery, GameSummary, GameWithResults, HideScoresRequest,
        ProgressResponse, ResultSummary, RoundSummary, ScoreRequest, ScoreSummary,
        ScoreUpdateResponse, StartGameRequest, TagRequest, UpdateTotalRoundsRequest,
    },
    error::AppError,
    services::{game_service, results_service, score_service, undo_service},
    state::SharedState,
};

/// Routes covering the game lifecycle, scoring, results, and undo.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(start_game))
        .route("/games/active", get(get_active_game))
        .route("/games/completed", get(list_completed_games))
        .route("/games/completed/latest", get(latest_completed_game))
        .route("/games/restore", post(restore_game))
        .route("/games/{id}", get(get_game).delete(delete_game))
        .route("/games/{id}/rounds", get(list_rounds))
        .route("/games/{id}/rounds/{round_id}/scores", get(list_scores))
        .route(
            "/games/{id}/rounds/{round_id}/scores/{player_id}",
            put(set_score),
        )
        .route("/games/{id}/total-rounds", put(update_total_rounds))
        .route("/games/{id}/hide-scores", put(toggle_hide_scores))
        .route("/games/{id}/tag", put(update_tag))
        .route("/games/{id}/close", post(close_game))
        .route("/games/{id}/results", get(get_results))
        .route("/games/{id}/sync-progress", post(sync_progress))
}

/// Start a fresh game unless one is already active.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = StartGameRequest,
    responses(
        (status = 200, description = "Game started", body = GameSummary),
        (status = 409, description = "An active game already exists")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartGameRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::start_game(&state, payload).await?;
    Ok(Json(summary))
}

/// Return the single active game, if any.
#[utoipa::path(
    get,
    path = "/games/active",
    tag = "game",
    responses((status = 200, description = "Active game or null", body = Option<GameSummary>))
)]
pub async fn get_active_game(
    State(state): State<SharedState>,
) -> Result<Json<Option<GameSummary>>, AppError> {
    let summary = game_service::find_active_game(&state).await?;
    Ok(Json(summary))
}

/// Fetch one game by id.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Game found", body = GameSummary),
        (status = 404, description = "Game not found")
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::get_game(&state, id).await?;
    Ok(Json(summary))
}

/// List the rounds of a game, ordered by round number.
#[utoipa::path(
    get,
    path = "/games/{id}/rounds",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Round list", body = [RoundSummary]))
)]
pub async fn list_rounds(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<RoundSummary>>, AppError> {
    let rounds = game_service::list_rounds(&state, id).await?;
    Ok(Json(rounds))
}

/// List the scores of one round, ordered by player.
#[utoipa::path(
    get,
    path = "/games/{id}/rounds/{round_id}/scores",
    tag = "game",
    params(
        ("id" = Uuid, Path, description = "Identifier of the game"),
        ("round_id" = String, Path, description = "Zero-padded round id")
    ),
    responses((status = 200, description = "Score list", body = [ScoreSummary]))
)]
pub async fn list_scores(
    State(state): State<SharedState>,
    Path((id, round_id)): Path<(Uuid, String)>,
) -> Result<Json<Vec<ScoreSummary>>, AppError> {
    let scores = score_service::list_scores(&state, id, &round_id).await?;
    Ok(Json(scores))
}

/// Write or clear one score cell.
#[utoipa::path(
    put,
    path = "/games/{id}/rounds/{round_id}/scores/{player_id}",
    tag = "game",
    params(
        ("id" = Uuid, Path, description = "Identifier of the game"),
        ("round_id" = String, Path, description = "Zero-padded round id"),
        ("player_id" = String, Path, description = "Roster identifier of the player")
    ),
    request_body = ScoreRequest,
    responses(
        (status = 200, description = "Score written", body = ScoreUpdateResponse),
        (status = 400, description = "Points out of range or unknown player")
    )
)]
pub async fn set_score(
    State(state): State<SharedState>,
    Path((id, round_id, player_id)): Path<(Uuid, String, String)>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<ScoreUpdateResponse>, AppError> {
    let response =
        score_service::set_round_score(&state, id, &round_id, &player_id, payload.points).await?;
    Ok(Json(response))
}

/// Resize the round set of a game.
#[utoipa::path(
    put,
    path = "/games/{id}/total-rounds",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = UpdateTotalRoundsRequest,
    responses(
        (status = 200, description = "Round set resized", body = GameSummary),
        (status = 404, description = "Game not found")
    )
)]
pub async fn update_total_rounds(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<UpdateTotalRoundsRequest>>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::update_total_rounds(&state, id, payload.total_rounds).await?;
    Ok(Json(summary))
}

/// Set the score-masking flag of a game.
#[utoipa::path(
    put,
    path = "/games/{id}/hide-scores",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = HideScoresRequest,
    responses((status = 200, description = "Flag updated", body = GameSummary))
)]
pub async fn toggle_hide_scores(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<HideScoresRequest>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::toggle_hide_scores(&state, id, payload.hide).await?;
    Ok(Json(summary))
}

/// Set or clear the tag of a game.
#[utoipa::path(
    put,
    path = "/games/{id}/tag",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = TagRequest,
    responses(
        (status = 200, description = "Tag updated", body = GameSummary),
        (status = 400, description = "Tag too long")
    )
)]
pub async fn update_tag(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagRequest>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = game_service::update_tag(&state, id, payload.tag).await?;
    Ok(Json(summary))
}

/// Terminate a game, producing ranked results when completing it.
#[utoipa::path(
    post,
    path = "/games/{id}/close",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    request_body = CloseGameRequest,
    responses(
        (status = 200, description = "Game closed", body = [ResultSummary]),
        (status = 404, description = "Game not found"),
        (status = 409, description = "A complete round violates the one-zero-winner rule")
    )
)]
pub async fn close_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseGameRequest>,
) -> Result<Json<Vec<ResultSummary>>, AppError> {
    let results = results_service::close_game(&state, id, payload.status).await?;
    Ok(Json(results))
}

/// Ranked results of a closed game.
#[utoipa::path(
    get,
    path = "/games/{id}/results",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Results, rank ascending", body = [ResultSummary]))
)]
pub async fn get_results(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ResultSummary>>, AppError> {
    let results = results_service::get_results(&state, id).await?;
    Ok(Json(results))
}

/// Completed games with their results, newest first.
#[utoipa::path(
    get,
    path = "/games/completed",
    tag = "game",
    params(("limit" = Option<usize>, Query, description = "Maximum games to return")),
    responses((status = 200, description = "Completed games", body = [GameWithResults]))
)]
pub async fn list_completed_games(
    State(state): State<SharedState>,
    Query(query): Query<CompletedGamesQuery>,
) -> Result<Json<Vec<GameWithResults>>, AppError> {
    let games = game_service::list_completed_games(&state, query.limit).await?;
    Ok(Json(games))
}

/// The most recently completed game, if any.
#[utoipa::path(
    get,
    path = "/games/completed/latest",
    tag = "game",
    responses((status = 200, description = "Latest completed game or null", body = Option<GameWithResults>))
)]
pub async fn latest_completed_game(
    State(state): State<SharedState>,
) -> Result<Json<Option<GameWithResults>>, AppError> {
    let game = game_service::latest_completed_game(&state).await?;
    Ok(Json(game))
}

/// Delete a game and all its children, returning an undo snapshot.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses(
        (status = 200, description = "Undo snapshot of the deleted game"),
        (status = 404, description = "Game not found")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GameSnapshotEntity>, AppError> {
    let snapshot = undo_service::delete_game(&state, id).await?;
    Ok(Json(snapshot))
}

/// Re-create a deleted game and its results from an undo snapshot.
#[utoipa::path(
    post,
    path = "/games/restore",
    tag = "game",
    responses((status = 200, description = "Game restored", body = GameSummary))
)]
pub async fn restore_game(
    State(state): State<SharedState>,
    Json(snapshot): Json<GameSnapshotEntity>,
) -> Result<Json<GameSummary>, AppError> {
    let summary = undo_service::restore_game(&state, snapshot).await?;
    Ok(Json(summary))
}

/// Recount fully-scored rounds and persist the count.
#[utoipa::path(
    post,
    path = "/games/{id}/sync-progress",
    tag = "game",
    params(("id" = Uuid, Path, description = "Identifier of the game")),
    responses((status = 200, description = "Progress resynced", body = ProgressResponse))
)]
pub async fn sync_progress(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProgressResponse>, AppError> {
    let rounds_played = game_service::sync_progress(&state, id).await?;
    Ok(Json(ProgressResponse { rounds_played }))
}
