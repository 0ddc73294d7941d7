use chrono::{DateTime, Utc};
use serde::Serialize;

use super::SessionListRepr;

#[derive(Debug, Serialize)]
pub struct TicketRepr {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub movie_session: i64,
    pub movie_session_detail: SessionListRepr,
}

#[derive(Debug, Serialize)]
pub struct OrderRepr {
    pub id: i64,
    pub tickets: Vec<TicketRepr>,
    pub created_at: DateTime<Utc>,
}
