use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CinemaHall {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl CinemaHall {
    pub fn capacity(&self) -> i64 {
        self.rows as i64 * self.seats_in_row as i64
    }
}

// Read shape: capacity is derived, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct CinemaHallRepr {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
    pub capacity: i64,
}

impl From<CinemaHall> for CinemaHallRepr {
    fn from(hall: CinemaHall) -> Self {
        let capacity = hall.capacity();
        CinemaHallRepr {
            id: hall.id,
            name: hall.name,
            rows: hall.rows,
            seats_in_row: hall.seats_in_row,
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_rows_times_seats() {
        let hall = CinemaHall {
            id: 1,
            name: "Blue".to_string(),
            rows: 2,
            seats_in_row: 5,
        };
        assert_eq!(hall.capacity(), 10);
        assert_eq!(CinemaHallRepr::from(hall).capacity, 10);
    }
}
