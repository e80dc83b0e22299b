use indexmap::IndexMap;
use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    GameEntity, GameResultEntity, GameStatus, RoundEntity, RoundLogEntity, RoundLogSource,
    ScoreEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    started_at: DateTime,
    ended_at: Option<DateTime>,
    total_rounds: u32,
    rounds_played: u32,
    status: GameStatus,
    #[serde(default)]
    hide_scores: bool,
    tag: Option<String>,
    notes: Option<String>,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            started_at: DateTime::from_system_time(value.started_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
            total_rounds: value.total_rounds,
            rounds_played: value.rounds_played,
            status: value.status,
            hide_scores: value.hide_scores,
            tag: value.tag,
            notes: value.notes,
        }
    }
}

impl From<MongoGameDocument> for GameEntity {
    fn from(value: MongoGameDocument) -> Self {
        Self {
            id: value.id,
            started_at: value.started_at.to_system_time(),
            ended_at: value.ended_at.map(|at| at.to_system_time()),
            total_rounds: value.total_rounds,
            rounds_played: value.rounds_played,
            status: value.status,
            hide_scores: value.hide_scores,
            tag: value.tag,
            notes: value.notes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundDocument {
    pub game_id: Uuid,
    pub round_id: String,
    round_number: u32,
    #[serde(default)]
    locked: bool,
}

impl From<(Uuid, RoundEntity)> for MongoRoundDocument {
    fn from((game_id, round): (Uuid, RoundEntity)) -> Self {
        Self {
            game_id,
            round_id: round.id,
            round_number: round.round_number,
            locked: round.locked,
        }
    }
}

impl From<MongoRoundDocument> for RoundEntity {
    fn from(value: MongoRoundDocument) -> Self {
        Self {
            id: value.round_id,
            round_number: value.round_number,
            locked: value.locked,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    pub game_id: Uuid,
    pub round_id: String,
    pub player_id: String,
    points: Option<u8>,
    entered_at: DateTime,
}

impl From<(Uuid, String, ScoreEntity)> for MongoScoreDocument {
    fn from((game_id, round_id, score): (Uuid, String, ScoreEntity)) -> Self {
        Self {
            game_id,
            round_id,
            player_id: score.player_id,
            points: score.points,
            entered_at: DateTime::from_system_time(score.entered_at),
        }
    }
}

impl From<MongoScoreDocument> for ScoreEntity {
    fn from(value: MongoScoreDocument) -> Self {
        Self {
            player_id: value.player_id,
            points: value.points,
            entered_at: value.entered_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoundLogDocument {
    #[serde(rename = "_id")]
    id: String,
    game_id: Uuid,
    round_id: String,
    round_number: u32,
    points_by_player: IndexMap<String, u8>,
    total_round_points: u32,
    game_started_at: DateTime,
    game_ended_at: Option<DateTime>,
    game_date: DateTime,
    source: RoundLogSource,
    logged_at: DateTime,
}

impl From<RoundLogEntity> for MongoRoundLogDocument {
    fn from(value: RoundLogEntity) -> Self {
        Self {
            id: value.key().composite_id(),
            game_id: value.game_id,
            round_id: value.round_id,
            round_number: value.round_number,
            points_by_player: value.points_by_player,
            total_round_points: value.total_round_points,
            game_started_at: DateTime::from_system_time(value.game_started_at),
            game_ended_at: value.game_ended_at.map(DateTime::from_system_time),
            game_date: DateTime::from_system_time(value.game_date),
            source: value.source,
            logged_at: DateTime::from_system_time(value.logged_at),
        }
    }
}

impl From<MongoRoundLogDocument> for RoundLogEntity {
    fn from(value: MongoRoundLogDocument) -> Self {
        Self {
            game_id: value.game_id,
            round_id: value.round_id,
            round_number: value.round_number,
            points_by_player: value.points_by_player,
            total_round_points: value.total_round_points,
            game_started_at: value.game_started_at.to_system_time(),
            game_ended_at: value.game_ended_at.map(|at| at.to_system_time()),
            game_date: value.game_date.to_system_time(),
            source: value.source,
            logged_at: value.logged_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoResultDocument {
    pub game_id: Uuid,
    pub player_id: String,
    rank: u32,
    total_points: u32,
    #[serde(default)]
    rounds_won: u32,
}

impl From<(Uuid, GameResultEntity)> for MongoResultDocument {
    fn from((game_id, result): (Uuid, GameResultEntity)) -> Self {
        Self {
            game_id,
            player_id: result.player_id,
            rank: result.rank,
            total_points: result.total_points,
            rounds_won: result.rounds_won,
        }
    }
}

impl From<MongoResultDocument> for GameResultEntity {
    fn from(value: MongoResultDocument) -> Self {
        Self {
            player_id: value.player_id,
            rank: value.rank,
            total_points: value.total_points,
            rounds_won: value.rounds_won,
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
