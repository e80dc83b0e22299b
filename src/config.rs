//! Application-level configuration loading, including the player roster.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SCOREPAD_BACK_CONFIG_PATH";
/// Round count used when a game is started without an explicit total.
const DEFAULT_TOTAL_ROUNDS: u32 = 10;

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    roster: Roster,
    default_total_rounds: u32,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the baked-in roster.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        players = app_config.roster.len(),
                        "loaded player roster from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Ordered roster of players every round is scored against.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Round count used when a game is started without an explicit total.
    pub fn default_total_rounds(&self) -> u32 {
        self.default_total_rounds
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roster: Roster::new(default_players()),
            default_total_rounds: DEFAULT_TOTAL_ROUNDS,
        }
    }
}

/// One entry of the configured player roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerProfile {
    /// Short stable identifier used as the score document key.
    pub id: String,
    /// Human readable name shown by frontends.
    pub display_name: String,
}

/// Ordered, fixed set of players participating in every game.
///
/// Rounds are complete only when each roster member has a score, and final
/// results carry one ranked entry per member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    players: Vec<PlayerProfile>,
}

impl Roster {
    /// Build a roster from an ordered list of profiles.
    pub fn new(players: Vec<PlayerProfile>) -> Self {
        Self { players }
    }

    /// Number of players in the roster.
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether the roster is empty. A usable configuration never is.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Iterate player identifiers in roster order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.players.iter().map(|player| player.id.as_str())
    }

    /// Whether `id` names a roster member.
    pub fn contains(&self, id: &str) -> bool {
        self.players.iter().any(|player| player.id == id)
    }

    /// Full profiles in roster order.
    pub fn players(&self) -> &[PlayerProfile] {
        &self.players
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Deserialize)]
struct RawConfig {
    players: Vec<RawPlayer>,
    #[serde(default)]
    default_total_rounds: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let players = value.players.into_iter().map(Into::into).collect::<Vec<_>>();
        Self {
            roster: Roster::new(players),
            default_total_rounds: value
                .default_total_rounds
                .filter(|count| *count > 0)
                .unwrap_or(DEFAULT_TOTAL_ROUNDS),
        }
    }
}

/// JSON representation of a single roster entry inside the configuration file.
#[derive(Debug, Deserialize)]
struct RawPlayer {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
}

impl From<RawPlayer> for PlayerProfile {
    fn from(value: RawPlayer) -> Self {
        let display_name = value.display_name.unwrap_or_else(|| value.id.clone());
        Self {
            id: value.id,
            display_name,
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Built-in roster shipped with the binary.
fn default_players() -> Vec<PlayerProfile> {
    vec![
        PlayerProfile {
            id: "A".into(),
            display_name: "Albert".into(),
        },
        PlayerProfile {
            id: "Y".into(),
            display_name: "Yiming".into(),
        },
        PlayerProfile {
            id: "D".into(),
            display_name: "Darwin".into(),
        },
        PlayerProfile {
            id: "C".into(),
            display_name: "Curtis".into(),
        },
    ]
}
