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
use crate::models::{Actor, ActorRepr};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/actors", get(list_actors).post(create_actor))
        .route(
            "/actors/{id}",
            get(retrieve_actor).put(update_actor).delete(delete_actor),
        )
}

#[derive(Debug, Deserialize, Validate)]
struct ActorRequest {
    #[validate(length(min = 1, message = "may not be blank"))]
    first_name: String,
    #[validate(length(min = 1, message = "may not be blank"))]
    last_name: String,
}

async fn list_actors(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let actors =
        sqlx::query_as::<_, Actor>("SELECT id, first_name, last_name FROM actors ORDER BY id")
            .fetch_all(&state.db.pool)
            .await?;
    let payload: Vec<ActorRepr> = actors.into_iter().map(ActorRepr::from).collect();
    Ok(Json(payload))
}

async fn create_actor(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let actor = sqlx::query_as::<_, Actor>(
        "INSERT INTO actors (first_name, last_name) VALUES ($1, $2)
         RETURNING id, first_name, last_name",
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .fetch_one(&state.db.pool)
    .await?;
    Ok((StatusCode::CREATED, Json(ActorRepr::from(actor))))
}

async fn retrieve_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let actor =
        sqlx::query_as::<_, Actor>("SELECT id, first_name, last_name FROM actors WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db.pool)
            .await?
            .ok_or(ApiError::NotFound("actor"))?;
    Ok(Json(ActorRepr::from(actor)))
}

async fn update_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ActorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let actor = sqlx::query_as::<_, Actor>(
        "UPDATE actors SET first_name = $1, last_name = $2 WHERE id = $3
         RETURNING id, first_name, last_name",
    )
    .bind(&req.first_name)
    .bind(&req.last_name)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("actor"))?;
    Ok(Json(ActorRepr::from(actor)))
}

async fn delete_actor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM actors WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("actor"));
    }
    Ok(StatusCode::NO_CONTENT)
}
