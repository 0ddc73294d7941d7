use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{CinemaHallRepr, MovieListRepr};

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovieSession {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_id: i64,
    pub cinema_hall_id: i64,
}

/// A ticketed (row, seat) coordinate within a session's hall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Place {
    pub row: i32,
    pub seat: i32,
}

/// List shape: flattened movie/hall names plus remaining availability.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SessionListRepr {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie_title: String,
    pub cinema_hall_name: String,
    pub cinema_hall_capacity: i64,
    pub tickets_available: i64,
}

/// Detail shape: nested movie and hall plus taken places.
#[derive(Debug, Serialize)]
pub struct SessionDetailRepr {
    pub id: i64,
    pub show_time: NaiveDateTime,
    pub movie: MovieListRepr,
    pub cinema_hall: CinemaHallRepr,
    pub taken_places: Vec<Place>,
}
