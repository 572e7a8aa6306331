pub mod manager;
pub mod models;
pub mod users;

pub use manager::{DatabaseError, DatabaseManager};
pub use users::{MemoryUserStore, PgUserStore, UserStore};
