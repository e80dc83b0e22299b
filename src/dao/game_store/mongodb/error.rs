use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for the MongoDB backend.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB backend, one variant per operation family.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection URI could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// The client could not be constructed from the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// The initial connectivity probe kept failing.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// How many pings were attempted.
        attempts: u32,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// A periodic health probe failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// A required environment variable is not set.
    #[error("environment variable `{var}` is not set")]
    MissingEnvVar {
        /// Name of the missing variable.
        var: &'static str,
    },
    /// Index creation failed during bootstrap.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Target collection.
        collection: &'static str,
        /// Index description.
        index: &'static str,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Writing a game document failed.
    #[error("failed to save game `{id}`")]
    SaveGame {
        /// Game primary key.
        id: Uuid,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Reading a game document failed.
    #[error("failed to load game `{id}`")]
    LoadGame {
        /// Game primary key.
        id: Uuid,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Querying for the active game failed.
    #[error("failed to look up the active game")]
    FindActiveGame {
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Listing completed games failed.
    #[error("failed to list completed games")]
    ListGames {
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Reading the rounds of a game failed.
    #[error("failed to load rounds of game `{game_id}`")]
    LoadRounds {
        /// Parent game.
        game_id: Uuid,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Reading the scores of a round failed.
    #[error("failed to load scores of game `{game_id}`")]
    LoadScores {
        /// Parent game.
        game_id: Uuid,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Writing or deleting a score cell failed.
    #[error("failed to write score cell of game `{game_id}`")]
    ScoreWrite {
        /// Parent game.
        game_id: Uuid,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Reading a round log failed.
    #[error("failed to load round log `{key}`")]
    LoadRoundLog {
        /// Composite log key.
        key: String,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Writing or deleting a round log failed.
    #[error("failed to write round log `{key}`")]
    RoundLogWrite {
        /// Composite log key.
        key: String,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// Reading the results of a game failed.
    #[error("failed to load results of game `{game_id}`")]
    LoadResults {
        /// Parent game.
        game_id: Uuid,
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
    /// A multi-document transaction could not be completed.
    #[error("failed to commit transactional batch")]
    Transaction {
        #[source]
        /// Driver-level cause.
        source: MongoError,
    },
}
