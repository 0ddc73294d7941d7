use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{ActorRepr, Genre};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
}

/// List shape: related genres and actors collapsed to display strings.
#[derive(Debug, Clone, Serialize)]
pub struct MovieListRepr {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<String>,
    pub actors: Vec<String>,
}

/// Detail shape: related genres and actors as nested objects.
#[derive(Debug, Serialize)]
pub struct MovieDetailRepr {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub genres: Vec<Genre>,
    pub actors: Vec<ActorRepr>,
}
