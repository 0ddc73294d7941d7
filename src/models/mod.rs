pub mod actor;
pub mod genre;
pub mod hall;
pub mod movie;
pub mod order;
pub mod session;
pub mod user;

pub use actor::{Actor, ActorRepr};
pub use genre::Genre;
pub use hall::{CinemaHall, CinemaHallRepr};
pub use movie::{Movie, MovieDetailRepr, MovieListRepr};
pub use order::{OrderRepr, TicketRepr};
pub use session::{MovieSession, Place, SessionDetailRepr, SessionListRepr};
pub use user::User;
