use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use validator::Validate;

use crate::error::{is_foreign_key_violation, ApiError};
use crate::filters::{escape_like, parse_id_list};
use crate::models::{Actor, ActorRepr, Genre, Movie, MovieDetailRepr, MovieListRepr};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies).post(create_movie))
        .route(
            "/movies/{id}",
            get(retrieve_movie).put(update_movie).delete(delete_movie),
        )
}

#[derive(Debug, Deserialize)]
struct MoviesQuery {
    title: Option<String>,
    genres: Option<String>,
    actors: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct MovieRequest {
    #[validate(length(min = 1, message = "may not be blank"))]
    title: String,
    #[serde(default)]
    description: String,
    #[validate(range(min = 1, message = "must be at least 1"))]
    duration: i32,
    #[serde(default)]
    genres: Vec<i64>,
    #[serde(default)]
    actors: Vec<i64>,
}

// Write shape mirrors the request: related genres/actors as id lists.
#[derive(Debug, Serialize)]
struct MovieWriteRepr {
    id: i64,
    title: String,
    description: String,
    duration: i32,
    genres: Vec<i64>,
    actors: Vec<i64>,
}

/* ---------- list ---------- */

// Predicates AND together; a multi-id list ORs within itself via ANY().
// EXISTS keeps each movie a single row, so no DISTINCT is needed.
fn movie_list_sql(has_genres: bool, has_actors: bool, has_title: bool) -> String {
    let mut sql = String::from(
        "SELECT m.id, m.title, m.description, m.duration FROM movies m WHERE 1=1",
    );
    let mut idx = 0;
    let mut next = || {
        idx += 1;
        idx
    };
    if has_genres {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM movie_genres mg \
             WHERE mg.movie_id = m.id AND mg.genre_id = ANY(${}))",
            next()
        ));
    }
    if has_actors {
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM movie_actors ma \
             WHERE ma.movie_id = m.id AND ma.actor_id = ANY(${}))",
            next()
        ));
    }
    if has_title {
        sql.push_str(&format!(" AND m.title ILIKE ${}", next()));
    }
    sql.push_str(" ORDER BY m.id");
    sql
}

async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MoviesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // An empty param string is ignored; a present one always filters, even
    // if every token was dropped as non-numeric (then nothing matches).
    let genre_ids = params
        .genres
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(parse_id_list);
    let actor_ids = params
        .actors
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(parse_id_list);
    let title_like = params
        .title
        .as_deref()
        .filter(|raw| !raw.is_empty())
        .map(|raw| format!("%{}%", escape_like(raw)));

    let sql = movie_list_sql(
        genre_ids.is_some(),
        actor_ids.is_some(),
        title_like.is_some(),
    );
    let mut query = sqlx::query_as::<_, Movie>(&sql);
    if let Some(ref ids) = genre_ids {
        query = query.bind(ids);
    }
    if let Some(ref ids) = actor_ids {
        query = query.bind(ids);
    }
    if let Some(ref pattern) = title_like {
        query = query.bind(pattern);
    }

    let movies = query.fetch_all(&state.db.pool).await?;
    let payload = load_movie_list_reprs(&state.db.pool, movies).await?;
    Ok(Json(payload))
}

/// Builds list representations for a set of movies, collapsing related
/// genres to names and actors to display names. Shared with the session
/// detail view.
pub(crate) async fn load_movie_list_reprs(
    pool: &PgPool,
    movies: Vec<Movie>,
) -> Result<Vec<MovieListRepr>, sqlx::Error> {
    if movies.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();

    let genre_rows = sqlx::query_as::<_, (i64, String)>(
        "SELECT mg.movie_id, g.name
         FROM movie_genres mg
         JOIN genres g ON g.id = mg.genre_id
         WHERE mg.movie_id = ANY($1)
         ORDER BY g.id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let actor_rows = sqlx::query_as::<_, (i64, String, String)>(
        "SELECT ma.movie_id, a.first_name, a.last_name
         FROM movie_actors ma
         JOIN actors a ON a.id = ma.actor_id
         WHERE ma.movie_id = ANY($1)
         ORDER BY a.id",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    Ok(assemble_movie_list(movies, genre_rows, actor_rows))
}

fn assemble_movie_list(
    movies: Vec<Movie>,
    genre_rows: Vec<(i64, String)>,
    actor_rows: Vec<(i64, String, String)>,
) -> Vec<MovieListRepr> {
    let mut genres_by_movie: HashMap<i64, Vec<String>> = HashMap::new();
    for (movie_id, name) in genre_rows {
        genres_by_movie.entry(movie_id).or_default().push(name);
    }
    let mut actors_by_movie: HashMap<i64, Vec<String>> = HashMap::new();
    for (movie_id, first_name, last_name) in actor_rows {
        actors_by_movie
            .entry(movie_id)
            .or_default()
            .push(format!("{first_name} {last_name}"));
    }

    movies
        .into_iter()
        .map(|movie| MovieListRepr {
            genres: genres_by_movie.remove(&movie.id).unwrap_or_default(),
            actors: actors_by_movie.remove(&movie.id).unwrap_or_default(),
            id: movie.id,
            title: movie.title,
            description: movie.description,
            duration: movie.duration,
        })
        .collect()
}

/* ---------- retrieve ---------- */

async fn retrieve_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let movie = fetch_movie(&state.db.pool, id)
        .await?
        .ok_or(ApiError::NotFound("movie"))?;

    let genres = sqlx::query_as::<_, Genre>(
        "SELECT g.id, g.name
         FROM movie_genres mg
         JOIN genres g ON g.id = mg.genre_id
         WHERE mg.movie_id = $1
         ORDER BY g.id",
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await?;

    let actors = sqlx::query_as::<_, Actor>(
        "SELECT a.id, a.first_name, a.last_name
         FROM movie_actors ma
         JOIN actors a ON a.id = ma.actor_id
         WHERE ma.movie_id = $1
         ORDER BY a.id",
    )
    .bind(id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(Json(MovieDetailRepr {
        id: movie.id,
        title: movie.title,
        description: movie.description,
        duration: movie.duration,
        genres,
        actors: actors.into_iter().map(ActorRepr::from).collect(),
    }))
}

async fn fetch_movie(pool: &PgPool, id: i64) -> Result<Option<Movie>, sqlx::Error> {
    sqlx::query_as::<_, Movie>(
        "SELECT id, title, description, duration FROM movies WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/* ---------- create / update / delete ---------- */

async fn create_movie(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;
    let movie = sqlx::query_as::<_, Movie>(
        "INSERT INTO movies (title, description, duration) VALUES ($1, $2, $3)
         RETURNING id, title, description, duration",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.duration)
    .fetch_one(&mut *tx)
    .await?;

    link_related(&mut tx, "movie_genres", "genre_id", movie.id, &req.genres, "genre").await?;
    link_related(&mut tx, "movie_actors", "actor_id", movie.id, &req.actors, "actor").await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(write_repr(&state.db.pool, movie).await?)))
}

async fn update_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<MovieRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let mut tx = state.db.pool.begin().await?;
    let movie = sqlx::query_as::<_, Movie>(
        "UPDATE movies SET title = $1, description = $2, duration = $3 WHERE id = $4
         RETURNING id, title, description, duration",
    )
    .bind(&req.title)
    .bind(&req.description)
    .bind(req.duration)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::NotFound("movie"))?;

    // Update replaces both link sets wholesale.
    sqlx::query("DELETE FROM movie_genres WHERE movie_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM movie_actors WHERE movie_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    link_related(&mut tx, "movie_genres", "genre_id", id, &req.genres, "genre").await?;
    link_related(&mut tx, "movie_actors", "actor_id", id, &req.actors, "actor").await?;
    tx.commit().await?;

    Ok(Json(write_repr(&state.db.pool, movie).await?))
}

async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = sqlx::query("DELETE FROM movies WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("movie"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// Inserts the m2m link rows; a dangling id surfaces as a field-style 400
// instead of a 500.
async fn link_related(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    column: &str,
    movie_id: i64,
    related_ids: &[i64],
    what: &str,
) -> Result<(), ApiError> {
    if related_ids.is_empty() {
        return Ok(());
    }
    let sql = format!(
        "INSERT INTO {table} (movie_id, {column})
         SELECT $1, unnest($2::bigint[])
         ON CONFLICT DO NOTHING"
    );
    sqlx::query(&sql)
        .bind(movie_id)
        .bind(related_ids)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::BadRequest(format!("{what} does not exist"))
            } else {
                e.into()
            }
        })?;
    Ok(())
}

async fn write_repr(pool: &PgPool, movie: Movie) -> Result<MovieWriteRepr, ApiError> {
    let genres = sqlx::query_scalar::<_, i64>(
        "SELECT genre_id FROM movie_genres WHERE movie_id = $1 ORDER BY genre_id",
    )
    .bind(movie.id)
    .fetch_all(pool)
    .await?;
    let actors = sqlx::query_scalar::<_, i64>(
        "SELECT actor_id FROM movie_actors WHERE movie_id = $1 ORDER BY actor_id",
    )
    .bind(movie.id)
    .fetch_all(pool)
    .await?;
    Ok(MovieWriteRepr {
        id: movie.id,
        title: movie.title,
        description: movie.description,
        duration: movie.duration,
        genres,
        actors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_sql_without_filters_has_no_placeholders() {
        let sql = movie_list_sql(false, false, false);
        assert!(!sql.contains('$'));
        assert!(sql.ends_with("ORDER BY m.id"));
    }

    #[test]
    fn list_sql_numbers_placeholders_in_order() {
        let sql = movie_list_sql(true, true, true);
        assert!(sql.contains("mg.genre_id = ANY($1)"));
        assert!(sql.contains("ma.actor_id = ANY($2)"));
        assert!(sql.contains("m.title ILIKE $3"));
    }

    #[test]
    fn list_sql_renumbers_when_genres_absent() {
        let sql = movie_list_sql(false, true, true);
        assert!(!sql.contains("movie_genres"));
        assert!(sql.contains("ma.actor_id = ANY($1)"));
        assert!(sql.contains("m.title ILIKE $2"));
    }

    fn movie(id: i64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            description: String::new(),
            duration: 120,
        }
    }

    #[test]
    fn assemble_groups_names_per_movie() {
        let movies = vec![movie(1, "Dune"), movie(2, "Alien")];
        let genre_rows = vec![
            (1, "Drama".to_string()),
            (1, "Sci-Fi".to_string()),
            (2, "Horror".to_string()),
        ];
        let actor_rows = vec![(1, "Timothee".to_string(), "Chalamet".to_string())];

        let reprs = assemble_movie_list(movies, genre_rows, actor_rows);
        assert_eq!(reprs.len(), 2);
        assert_eq!(reprs[0].genres, vec!["Drama", "Sci-Fi"]);
        assert_eq!(reprs[0].actors, vec!["Timothee Chalamet"]);
        assert_eq!(reprs[1].genres, vec!["Horror"]);
        assert!(reprs[1].actors.is_empty());
    }

    #[test]
    fn assemble_keeps_movie_order() {
        let movies = vec![movie(5, "B"), movie(3, "A")];
        let reprs = assemble_movie_list(movies, Vec::new(), Vec::new());
        let ids: Vec<i64> = reprs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 3]);
    }
}
