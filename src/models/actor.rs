use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// Read shape: full_name is derived, never stored.
#[derive(Debug, Clone, Serialize)]
pub struct ActorRepr {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

impl From<Actor> for ActorRepr {
    fn from(actor: Actor) -> Self {
        let full_name = actor.full_name();
        ActorRepr {
            id: actor.id,
            first_name: actor.first_name,
            last_name: actor.last_name,
            full_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last() {
        let actor = Actor {
            id: 1,
            first_name: "Timothee".to_string(),
            last_name: "Chalamet".to_string(),
        };
        assert_eq!(actor.full_name(), "Timothee Chalamet");
        let repr = ActorRepr::from(actor);
        assert_eq!(repr.full_name, "Timothee Chalamet");
    }
}
