//! Offline maintenance sweep that fills round logs for completed games.
//!
//! Usage: `backfill-round-logs [--dry-run] [--limit-games=N]`
//!
//! Connects to MongoDB via `MONGO_URI` / `MONGO_DB` and prints a JSON summary
//! of the sweep to stdout. Safe to re-run: every write is an idempotent
//! upsert, and logs already matching the live scores are left untouched.

use std::{env, sync::Arc};

use scorepad_back::{
    config::AppConfig,
    dao::game_store::{
        GameStore,
        mongodb::{MongoConfig, MongoGameStore},
    },
    services::backfill::{self, BackfillOptions},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let options = parse_args(env::args().skip(1));
    let config = AppConfig::load();

    let uri = env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".into());
    let db_name = env::var("MONGO_DB").ok();
    let mongo_config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
    let store: Arc<dyn GameStore> = Arc::new(MongoGameStore::connect(mongo_config).await?);

    let summary = backfill::backfill_round_logs(&store, config.roster(), options).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn parse_args(args: impl Iterator<Item = String>) -> BackfillOptions {
    let mut options = BackfillOptions::default();
    for arg in args {
        if arg == "--dry-run" {
            options.dry_run = true;
        } else if let Some(value) = arg.strip_prefix("--limit-games=") {
            options.limit_games = value.parse().ok();
        }
    }
    options
}

fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
