//! Database module for the gym tracker
//!
//! Store traits define what the rest of the server needs from
//! persistence; `DbOperations` fulfils them against Postgres.

pub mod models;
pub mod operations;
pub mod store;

pub use models::{GymEntry, NewGymEntry, TelegramProfile, User, UserRole, WorkoutType};
pub use operations::DbOperations;
pub use store::{EntryStore, UserStore};
