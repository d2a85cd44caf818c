use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::db::models::{GymEntry, NewGymEntry, TelegramProfile, User, UserRole};
use crate::db::store::{EntryStore, UserStore};
use crate::error::{AppError, DatabaseError};

const USER_COLUMNS: &str =
    "id, telegram_id, username, role, first_name, last_name, photo_url, created_at, last_login";

const ENTRY_COLUMNS: &str = "id, user_id, date, points, workout_type, created_at";

pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await?;
        info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl UserStore for DbOperations {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE telegram_id = $1",
            USER_COLUMNS
        ))
        .bind(telegram_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn record_login(&self, id: i64, profile: &TelegramProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET first_name = $1, last_name = $2, photo_url = $3, last_login = $4
            WHERE id = $5
            "#,
        )
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.photo_url)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_user(
        &self,
        telegram_id: &str,
        username: &str,
        role: UserRole,
    ) -> Result<User, AppError> {
        let mut transaction = self.pool.begin().await?;

        let result = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (telegram_id, username, role, created_at) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(telegram_id)
        .bind(username)
        .bind(role.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *transaction)
        .await;

        match result {
            Ok(user) => {
                transaction.commit().await?;
                Ok(user)
            }
            Err(e) => {
                transaction.rollback().await?;
                Err(e.into())
            }
        }
    }

    async fn delete_by_telegram_id(&self, telegram_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn rename(&self, telegram_id: &str, username: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET username = $1 WHERE telegram_id = $2")
            .bind(username)
            .bind(telegram_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(users)
    }
}

#[async_trait]
impl EntryStore for DbOperations {
    async fn create_entry(&self, entry: &NewGymEntry) -> Result<GymEntry, AppError> {
        let created = sqlx::query_as::<_, GymEntry>(&format!(
            "INSERT INTO gym_entries (user_id, date, points, workout_type, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ENTRY_COLUMNS
        ))
        .bind(entry.user_id)
        .bind(entry.date)
        .bind(entry.points)
        .bind(entry.workout_type.as_str())
        .bind(Utc::now())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(created)
    }

    async fn list_entries(&self, user_id: i64) -> Result<Vec<GymEntry>, AppError> {
        let entries = sqlx::query_as::<_, GymEntry>(&format!(
            "SELECT {} FROM gym_entries WHERE user_id = $1 ORDER BY date ASC, id ASC",
            ENTRY_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(entries)
    }
}
