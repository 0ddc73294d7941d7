use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::ApiError;
use crate::models::{CinemaHall, CinemaHallRepr};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cinema_halls", get(list_halls).post(create_hall))
        .route(
            "/cinema_halls/{id}",
            get(retrieve_hall).put(update_hall).delete(delete_hall),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct CinemaHallRequest {
    #[validate(length(min = 1, message = "may not be blank"))]
    name: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    rows: i32,
    #[validate(range(min = 1, message = "must be at least 1"))]
    seats_in_row: i32,
}

const HALL_COLUMNS: &str = r#"id, name, "rows", seats_in_row"#;

async fn list_halls(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let halls = sqlx::query_as::<_, CinemaHall>(&format!(
        "SELECT {HALL_COLUMNS} FROM cinema_halls ORDER BY id"
    ))
    .fetch_all(&state.db.pool)
    .await?;
    let payload: Vec<CinemaHallRepr> = halls.into_iter().map(CinemaHallRepr::from).collect();
    Ok(Json(payload))
}

async fn create_hall(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CinemaHallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let hall = sqlx::query_as::<_, CinemaHall>(&format!(
        r#"INSERT INTO cinema_halls (name, "rows", seats_in_row) VALUES ($1, $2, $3)
           RETURNING {HALL_COLUMNS}"#
    ))
    .bind(&req.name)
    .bind(req.rows)
    .bind(req.seats_in_row)
    .fetch_one(&state.db.pool)
    .await?;
    Ok((StatusCode::CREATED, Json(CinemaHallRepr::from(hall))))
}

async fn retrieve_hall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let hall = sqlx::query_as::<_, CinemaHall>(&format!(
        "SELECT {HALL_COLUMNS} FROM cinema_halls WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("cinema hall"))?;
    Ok(Json(CinemaHallRepr::from(hall)))
}

async fn update_hall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CinemaHallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let hall = sqlx::query_as::<_, CinemaHall>(&format!(
        r#"UPDATE cinema_halls SET name = $1, "rows" = $2, seats_in_row = $3 WHERE id = $4
           RETURNING {HALL_COLUMNS}"#
    ))
    .bind(&req.name)
    .bind(req.rows)
    .bind(req.seats_in_row)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("cinema hall"))?;
    Ok(Json(CinemaHallRepr::from(hall)))
}

async fn delete_hall(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM cinema_halls WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("cinema hall"));
    }
    Ok(StatusCode::NO_CONTENT)
}
