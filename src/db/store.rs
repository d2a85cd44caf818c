use async_trait::async_trait;

use crate::db::models::{GymEntry, NewGymEntry, TelegramProfile, User, UserRole};
use crate::error::AppError;

/// Persistence boundary for user records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, AppError>;

    /// Stores the latest widget profile and stamps `last_login`.
    async fn record_login(&self, id: i64, profile: &TelegramProfile) -> Result<(), AppError>;

    async fn create_user(
        &self,
        telegram_id: &str,
        username: &str,
        role: UserRole,
    ) -> Result<User, AppError>;

    /// Returns `false` when no such user existed.
    async fn delete_by_telegram_id(&self, telegram_id: &str) -> Result<bool, AppError>;

    /// Returns `false` when no such user existed.
    async fn rename(&self, telegram_id: &str, username: &str) -> Result<bool, AppError>;

    /// Newest first.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
}

/// Persistence boundary for workout entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryStore: Send + Sync {
    async fn create_entry(&self, entry: &NewGymEntry) -> Result<GymEntry, AppError>;

    /// Oldest first.
    async fn list_entries(&self, user_id: i64) -> Result<Vec<GymEntry>, AppError>;
}
