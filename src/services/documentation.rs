use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Scorepad Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::game::start_game,
        crate::routes::game::get_active_game,
        crate::routes::game::get_game,
        crate::routes::game::list_rounds,
        crate::routes::game::list_scores,
        crate::routes::game::set_score,
        crate::routes::game::update_total_rounds,
        crate::routes::game::toggle_hide_scores,
        crate::routes::game::update_tag,
        crate::routes::game::close_game,
        crate::routes::game::get_results,
        crate::routes::game::list_completed_games,
        crate::routes::game::latest_completed_game,
        crate::routes::game::delete_game,
        crate::routes::game::restore_game,
        crate::routes::game::sync_progress,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::StartGameRequest,
            crate::dto::game::UpdateTotalRoundsRequest,
            crate::dto::game::HideScoresRequest,
            crate::dto::game::TagRequest,
            crate::dto::game::ScoreRequest,
            crate::dto::game::CloseGameRequest,
            crate::dto::game::ClosingStatus,
            crate::dto::game::GameSummary,
            crate::dto::game::RoundSummary,
            crate::dto::game::ScoreSummary,
            crate::dto::game::ScoreUpdateResponse,
            crate::dto::game::ResultSummary,
            crate::dto::game::GameWithResults,
            crate::dto::game::ProgressResponse,
            crate::dao::models::GameStatus,
            crate::dao::models::RoundLogSource,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game lifecycle and scoring operations"),
        (name = "sse", description = "Server-sent events stream"),
    )
)]
pub struct ApiDoc;
