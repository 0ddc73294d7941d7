use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{is_foreign_key_violation, ApiError};
use crate::filters::parse_date;
use crate::models::{
    CinemaHall, CinemaHallRepr, Movie, MovieSession, Place, SessionDetailRepr, SessionListRepr,
};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movie_sessions", get(list_sessions).post(create_session))
        .route(
            "/movie_sessions/{id}",
            get(retrieve_session)
                .put(update_session)
                .delete(delete_session),
        )
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    date: Option<String>,
    movie: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionRequest {
    show_time: NaiveDateTime,
    movie: i64,
    cinema_hall: i64,
}

// Write shape mirrors the request: related movie and hall as ids.
#[derive(Debug, Serialize)]
struct SessionWriteRepr {
    id: i64,
    show_time: NaiveDateTime,
    movie: i64,
    cinema_hall: i64,
}

/* ---------- list ---------- */

// tickets_available is capacity minus the persisted ticket count,
// computed in SQL on every read.
const SESSION_LIST_SELECT: &str = r#"
    SELECT ms.id, ms.show_time,
           m.title AS movie_title,
           ch.name AS cinema_hall_name,
           (ch."rows"::bigint * ch.seats_in_row) AS cinema_hall_capacity,
           (ch."rows"::bigint * ch.seats_in_row) - COUNT(t.id) AS tickets_available
    FROM movie_sessions ms
    JOIN movies m ON m.id = ms.movie_id
    JOIN cinema_halls ch ON ch.id = ms.cinema_hall_id
    LEFT JOIN tickets t ON t.movie_session_id = ms.id"#;

const SESSION_LIST_TAIL: &str = r#"
    GROUP BY ms.id, ms.show_time, m.title, ch.name, ch."rows", ch.seats_in_row
    ORDER BY ms.id"#;

fn session_list_sql(has_date: bool, has_movie: bool) -> String {
    let mut sql = String::from(SESSION_LIST_SELECT);
    sql.push_str(" WHERE 1=1");
    let mut idx = 0;
    let mut next = || {
        idx += 1;
        idx
    };
    if has_date {
        sql.push_str(&format!(" AND ms.show_time::date = ${}", next()));
    }
    if has_movie {
        sql.push_str(&format!(" AND ms.movie_id = ${}", next()));
    }
    sql.push_str(SESSION_LIST_TAIL);
    sql
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let date = match params.date.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            parse_date(raw)
                .ok_or_else(|| ApiError::BadRequest("date must be in YYYY-MM-DD form".to_string()))?,
        ),
        None => None,
    };
    let movie_id = match params.movie.as_deref().filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            ApiError::BadRequest("movie must be a valid id".to_string())
        })?),
        None => None,
    };

    let sql = session_list_sql(date.is_some(), movie_id.is_some());
    let mut query = sqlx::query_as::<_, SessionListRepr>(&sql);
    if let Some(date) = date {
        query = query.bind(date);
    }
    if let Some(movie_id) = movie_id {
        query = query.bind(movie_id);
    }

    let sessions = query.fetch_all(&state.db.pool).await?;
    Ok(Json(sessions))
}

/// List representations for a set of sessions, keyed by session id.
/// Order tickets embed these as `movie_session_detail`.
pub(crate) async fn load_session_list_reprs(
    pool: &PgPool,
    ids: &[i64],
) -> Result<HashMap<i64, SessionListRepr>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let sql = format!("{SESSION_LIST_SELECT} WHERE ms.id = ANY($1) {SESSION_LIST_TAIL}");
    let reprs = sqlx::query_as::<_, SessionListRepr>(&sql)
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(reprs.into_iter().map(|r| (r.id, r)).collect())
}

/* ---------- retrieve ---------- */

async fn retrieve_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = fetch_session(&state.db.pool, id)
        .await?
        .ok_or(ApiError::NotFound("movie session"))?;

    let movies = sqlx::query_as::<_, Movie>(
        "SELECT id, title, description, duration FROM movies WHERE id = $1",
    )
    .bind(session.movie_id)
    .fetch_all(&state.db.pool)
    .await?;
    let movie = super::movies::load_movie_list_reprs(&state.db.pool, movies)
        .await?
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound("movie"))?;

    let hall = sqlx::query_as::<_, CinemaHall>(
        r#"SELECT id, name, "rows", seats_in_row FROM cinema_halls WHERE id = $1"#,
    )
    .bind(session.cinema_hall_id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(ApiError::NotFound("cinema hall"))?;

    let taken_places = sqlx::query_as::<_, Place>(
        r#"SELECT "row", seat FROM tickets WHERE movie_session_id = $1 ORDER BY "row", seat"#,
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(SessionDetailRepr {
        id: session.id,
        show_time: session.show_time,
        movie,
        cinema_hall: CinemaHallRepr::from(hall),
        taken_places,
    }))
}

async fn fetch_session(pool: &PgPool, id: i64) -> Result<Option<MovieSession>, sqlx::Error> {
    sqlx::query_as::<_, MovieSession>(
        "SELECT id, show_time, movie_id, cinema_hall_id FROM movie_sessions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/* ---------- create / update / delete ---------- */

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_movie_exists(&state.db.pool, req.movie).await?;
    ensure_hall_exists(&state.db.pool, req.cinema_hall).await?;

    let session = sqlx::query_as::<_, MovieSession>(
        "INSERT INTO movie_sessions (show_time, movie_id, cinema_hall_id)
         VALUES ($1, $2, $3)
         RETURNING id, show_time, movie_id, cinema_hall_id",
    )
    .bind(req.show_time)
    .bind(req.movie)
    .bind(req.cinema_hall)
    .fetch_one(&state.db.pool)
    .await
    .map_err(map_session_fk)?;

    Ok((StatusCode::CREATED, Json(write_repr(session))))
}

async fn update_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_movie_exists(&state.db.pool, req.movie).await?;
    ensure_hall_exists(&state.db.pool, req.cinema_hall).await?;

    let session = sqlx::query_as::<_, MovieSession>(
        "UPDATE movie_sessions SET show_time = $1, movie_id = $2, cinema_hall_id = $3
         WHERE id = $4
         RETURNING id, show_time, movie_id, cinema_hall_id",
    )
    .bind(req.show_time)
    .bind(req.movie)
    .bind(req.cinema_hall)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await
    .map_err(map_session_fk)?
    .ok_or(ApiError::NotFound("movie session"))?;

    Ok(Json(write_repr(session)))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM movie_sessions WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("movie session"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn write_repr(session: MovieSession) -> SessionWriteRepr {
    SessionWriteRepr {
        id: session.id,
        show_time: session.show_time,
        movie: session.movie_id,
        cinema_hall: session.cinema_hall_id,
    }
}

// Backstop for a movie or hall deleted between the existence check and
// the write: the FK violation is still the client's bad reference.
fn map_session_fk(e: sqlx::Error) -> ApiError {
    if is_foreign_key_violation(&e) {
        ApiError::BadRequest("movie or cinema hall does not exist".to_string())
    } else {
        e.into()
    }
}

async fn ensure_movie_exists(pool: &PgPool, id: i64) -> Result<(), ApiError> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM movies WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::BadRequest("movie does not exist".to_string()))
    }
}

async fn ensure_hall_exists(pool: &PgPool, id: i64) -> Result<(), ApiError> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM cinema_halls WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await?;
    if exists {
        Ok(())
    } else {
        Err(ApiError::BadRequest("cinema hall does not exist".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_sql_without_filters_has_no_placeholders() {
        let sql = session_list_sql(false, false);
        assert!(!sql.contains('$'));
        assert!(sql.contains("GROUP BY ms.id"));
    }

    #[test]
    fn list_sql_numbers_placeholders_in_order() {
        let sql = session_list_sql(true, true);
        assert!(sql.contains("ms.show_time::date = $1"));
        assert!(sql.contains("ms.movie_id = $2"));
    }

    #[test]
    fn list_sql_movie_filter_alone_is_first_placeholder() {
        let sql = session_list_sql(false, true);
        assert!(!sql.contains("show_time::date"));
        assert!(sql.contains("ms.movie_id = $1"));
    }

    #[test]
    fn non_fk_write_errors_stay_internal() {
        match map_session_fk(sqlx::Error::RowNotFound) {
            ApiError::Database(_) => {}
            other => panic!("expected database error, got {other:?}"),
        }
    }
}
