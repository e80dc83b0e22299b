//! Library crate for scorepad-back, exposing modules for binaries and integration tests.

/// Runtime configuration and the player roster.
pub mod config;
/// Persistence layer: entities, store trait, and backends.
pub mod dao;
/// HTTP and SSE payload types.
pub mod dto;
/// Service- and HTTP-level error types.
pub mod error;
/// Axum route trees.
pub mod routes;
/// Pure scoring rules.
pub mod scoring;
/// Business logic over the shared state.
pub mod services;
/// Shared application state.
pub mod state;
