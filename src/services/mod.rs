/// Offline round-log backfill sweep.
pub mod backfill;
/// OpenAPI documentation generation.
pub mod documentation;
/// Game lifecycle operations.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Close-time aggregation into ranked results.
pub mod results_service;
/// Denormalized round-log reconciliation.
pub mod round_log_service;
/// Per-cell score writes.
pub mod score_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage connection supervision.
pub mod storage_supervisor;
/// Deletion with undo snapshots.
pub mod undo_service;
