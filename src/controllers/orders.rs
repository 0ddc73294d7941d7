use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use validator::Validate;

use crate::error::{is_foreign_key_violation, is_unique_violation, ApiError};
use crate::middleware::AuthUser;
use crate::models::{OrderRepr, SessionListRepr, TicketRepr};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", get(retrieve_order).delete(delete_order))
}

#[derive(Debug, Deserialize, Validate)]
struct TicketRequest {
    movie_session: i64,
    #[validate(range(min = 1, message = "must be at least 1"))]
    row: i32,
    #[validate(range(min = 1, message = "must be at least 1"))]
    seat: i32,
}

#[derive(Debug, Deserialize, Validate)]
struct CreateOrderRequest {
    // An order with no tickets is allowed.
    #[serde(default)]
    #[validate(nested)]
    tickets: Vec<TicketRequest>,
}

/* ---------- row grouping ---------- */

// One joined row per (order, ticket); ticket columns are NULL for an
// order without tickets.
type OrderRow = (
    i64,
    DateTime<Utc>,
    Option<i64>,
    Option<i32>,
    Option<i32>,
    Option<i64>,
);

fn group_order_rows(
    rows: Vec<OrderRow>,
    sessions: &HashMap<i64, SessionListRepr>,
) -> Vec<OrderRepr> {
    let mut grouped: BTreeMap<i64, (DateTime<Utc>, Vec<TicketRepr>)> = BTreeMap::new();
    for (order_id, created_at, ticket_id, row, seat, session_id) in rows {
        let entry = grouped.entry(order_id).or_insert((created_at, Vec::new()));
        if let (Some(ticket_id), Some(row), Some(seat), Some(session_id)) =
            (ticket_id, row, seat, session_id)
        {
            if let Some(detail) = sessions.get(&session_id) {
                entry.1.push(TicketRepr {
                    id: ticket_id,
                    row,
                    seat,
                    movie_session: session_id,
                    movie_session_detail: detail.clone(),
                });
            }
        }
    }
    grouped
        .into_iter()
        .map(|(id, (created_at, tickets))| OrderRepr {
            id,
            tickets,
            created_at,
        })
        .collect()
}

async fn load_orders(
    pool: &PgPool,
    user_id: i64,
    order_id: Option<i64>,
) -> Result<Vec<OrderRepr>, ApiError> {
    let mut sql = String::from(
        r#"SELECT o.id, o.created_at, t.id, t."row", t.seat, t.movie_session_id
           FROM orders o
           LEFT JOIN tickets t ON t.order_id = o.id
           WHERE o.user_id = $1"#,
    );
    if order_id.is_some() {
        sql.push_str(" AND o.id = $2");
    }
    sql.push_str(" ORDER BY o.id, t.id");

    let mut query = sqlx::query_as::<_, OrderRow>(&sql).bind(user_id);
    if let Some(order_id) = order_id {
        query = query.bind(order_id);
    }
    let rows = query.fetch_all(pool).await?;

    let mut session_ids: Vec<i64> = rows.iter().filter_map(|r| r.5).collect();
    session_ids.sort_unstable();
    session_ids.dedup();
    let sessions = super::movie_sessions::load_session_list_reprs(pool, &session_ids).await?;

    Ok(group_order_rows(rows, &sessions))
}

/* ---------- handlers ---------- */

async fn list_orders(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let orders = load_orders(&state.db.pool, user.id, None).await?;
    Ok(Json(orders))
}

async fn retrieve_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let order = load_orders(&state.db.pool, user.id, Some(id))
        .await?
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound("order"))?;
    Ok(Json(order))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    // All-or-nothing: the order and every ticket share one transaction,
    // which rolls back on drop if any step fails.
    let mut tx = state.db.pool.begin().await?;

    let order_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO orders (user_id) VALUES ($1) RETURNING id",
    )
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await?;

    for (index, ticket) in req.tickets.iter().enumerate() {
        let hall = sqlx::query_as::<_, (i32, i32)>(
            r#"SELECT ch."rows", ch.seats_in_row
               FROM movie_sessions ms
               JOIN cinema_halls ch ON ch.id = ms.cinema_hall_id
               WHERE ms.id = $1"#,
        )
        .bind(ticket.movie_session)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((rows, seats_in_row)) = hall else {
            return Err(ticket_field_error(index, "movie session does not exist"));
        };

        // Coordinates are 1-based and bounded by the session's hall, so
        // a session can never hold more tickets than the hall's capacity.
        if let Err(message) = check_place_bounds(ticket.row, ticket.seat, rows, seats_in_row) {
            return Err(ticket_field_error(index, &message));
        }

        // Checked against persisted tickets only. Two identical seats
        // inside one request pass this check and are caught by the
        // unique constraint at insert time instead.
        let taken = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                 SELECT 1 FROM tickets
                 WHERE movie_session_id = $1 AND "row" = $2 AND seat = $3
               )"#,
        )
        .bind(ticket.movie_session)
        .bind(ticket.row)
        .bind(ticket.seat)
        .fetch_one(&mut *tx)
        .await?;
        if taken {
            return Err(ticket_field_error(
                index,
                "the fields movie_session, row, seat must make a unique set",
            ));
        }

        sqlx::query(
            r#"INSERT INTO tickets (movie_session_id, order_id, "row", seat)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(ticket.movie_session)
        .bind(order_id)
        .bind(ticket.row)
        .bind(ticket.seat)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict(
                    "seat is already taken for this movie session".to_string(),
                )
            } else if is_foreign_key_violation(&e) {
                // Session deleted between the pre-check and the insert.
                ticket_field_error(index, "movie session does not exist")
            } else {
                e.into()
            }
        })?;
    }

    tx.commit().await?;

    let order = load_orders(&state.db.pool, user.id, Some(order_id))
        .await?
        .into_iter()
        .next()
        .ok_or(ApiError::NotFound("order"))?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    // Tickets go with the order via ON DELETE CASCADE.
    let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound("order"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn check_place_bounds(row: i32, seat: i32, rows: i32, seats_in_row: i32) -> Result<(), String> {
    if row > rows {
        return Err(format!("row must be in the range 1..={rows}"));
    }
    if seat > seats_in_row {
        return Err(format!("seat must be in the range 1..={seats_in_row}"));
    }
    Ok(())
}

fn ticket_field_error(index: usize, message: &str) -> ApiError {
    let mut fields = BTreeMap::new();
    fields.insert(format!("tickets[{index}]"), vec![message.to_string()]);
    ApiError::Validation(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn session_repr(id: i64, available: i64) -> SessionListRepr {
        SessionListRepr {
            id,
            show_time: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(19, 0, 0)
                .unwrap(),
            movie_title: "Dune".to_string(),
            cinema_hall_name: "Blue".to_string(),
            cinema_hall_capacity: 10,
            tickets_available: available,
        }
    }

    #[test]
    fn groups_tickets_under_their_order() {
        let now = Utc::now();
        let sessions: HashMap<i64, SessionListRepr> =
            [(7, session_repr(7, 8))].into_iter().collect();
        let rows = vec![
            (1, now, Some(10), Some(1), Some(1), Some(7)),
            (1, now, Some(11), Some(1), Some(2), Some(7)),
            (2, now, None, None, None, None),
        ];

        let orders = group_order_rows(rows, &sessions);
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, 1);
        assert_eq!(orders[0].tickets.len(), 2);
        assert_eq!(orders[0].tickets[1].seat, 2);
        assert_eq!(orders[0].tickets[0].movie_session_detail.movie_title, "Dune");
        assert_eq!(orders[1].id, 2);
        assert!(orders[1].tickets.is_empty());
    }

    #[test]
    fn orders_come_back_oldest_first() {
        let now = Utc::now();
        let sessions = HashMap::new();
        let rows = vec![
            (9, now, None, None, None, None),
            (3, now, None, None, None, None),
        ];
        let ids: Vec<i64> = group_order_rows(rows, &sessions)
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![3, 9]);
    }

    #[test]
    fn ticket_field_error_carries_index() {
        match ticket_field_error(1, "boom") {
            ApiError::Validation(fields) => {
                assert_eq!(fields["tickets[1]"], vec!["boom".to_string()]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn empty_ticket_list_passes_validation() {
        let req = CreateOrderRequest { tickets: vec![] };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn seat_outside_hall_dimensions_is_rejected() {
        // Request validation alone accepts any positive coordinates...
        let req = CreateOrderRequest {
            tickets: vec![TicketRequest {
                movie_session: 1,
                row: 999,
                seat: 999,
            }],
        };
        assert!(req.validate().is_ok());
        // ...so the hall bounds check has to catch them for a 2x5 hall.
        assert!(check_place_bounds(999, 999, 2, 5).is_err());
    }

    #[test]
    fn place_bounds_accept_the_last_row_and_seat() {
        assert!(check_place_bounds(1, 1, 2, 5).is_ok());
        assert!(check_place_bounds(2, 5, 2, 5).is_ok());
    }

    #[test]
    fn place_bounds_name_the_offending_coordinate() {
        assert_eq!(
            check_place_bounds(3, 1, 2, 5).unwrap_err(),
            "row must be in the range 1..=2"
        );
        assert_eq!(
            check_place_bounds(1, 6, 2, 5).unwrap_err(),
            "seat must be in the range 1..=5"
        );
    }

    #[test]
    fn zero_row_or_seat_fails_validation() {
        let req = CreateOrderRequest {
            tickets: vec![TicketRequest {
                movie_session: 1,
                row: 0,
                seat: 1,
            }],
        };
        assert!(req.validate().is_err());
    }
}
