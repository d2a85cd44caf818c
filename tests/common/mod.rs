#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use data_encoding::HEXLOWER;
use gymtrack_server::db::{GymEntry, NewGymEntry, TelegramProfile, User, UserRole};
use gymtrack_server::{AppError, EntryStore, UserStore};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

pub const BOT_TOKEN: &str = "123456:test-bot-token";

/// In-process stand-in for Postgres.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<Vec<User>>,
    entries: RwLock<Vec<GymEntry>>,
}

impl MemoryStore {
    pub async fn insert_user(&self, telegram_id: &str, username: &str, role: UserRole) -> User {
        self.create_user(telegram_id, username, role).await.unwrap()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_telegram_id(&self, telegram_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .cloned())
    }

    async fn record_login(&self, id: i64, profile: &TelegramProfile) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if let Some(user) = users.iter_mut().find(|u| u.id == id) {
            user.first_name = profile.first_name.clone();
            user.last_name = profile.last_name.clone();
            user.photo_url = profile.photo_url.clone();
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_user(
        &self,
        telegram_id: &str,
        username: &str,
        role: UserRole,
    ) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        let user = User {
            id: users.len() as i64 + 1,
            telegram_id: telegram_id.to_string(),
            username: username.to_string(),
            role: role.as_str().to_string(),
            first_name: None,
            last_name: None,
            photo_url: None,
            created_at: Utc::now(),
            last_login: None,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn delete_by_telegram_id(&self, telegram_id: &str) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.telegram_id != telegram_id);
        Ok(users.len() != before)
    }

    async fn rename(&self, telegram_id: &str, username: &str) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|u| u.telegram_id == telegram_id) {
            Some(user) => {
                user.username = username.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users = self.users.read().await.clone();
        users.reverse();
        Ok(users)
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn create_entry(&self, entry: &NewGymEntry) -> Result<GymEntry, AppError> {
        let mut entries = self.entries.write().await;
        let created = GymEntry {
            id: entries.len() as i64 + 1,
            user_id: entry.user_id,
            date: entry.date,
            points: entry.points,
            workout_type: entry.workout_type.as_str().to_string(),
            created_at: Utc::now(),
        };
        entries.push(created.clone());
        Ok(created)
    }

    async fn list_entries(&self, user_id: i64) -> Result<Vec<GymEntry>, AppError> {
        let mut entries: Vec<GymEntry> = self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.date, e.id));
        Ok(entries)
    }
}

/// Produces the widget's query fields, signed with `bot_token`.
pub fn signed_login_fields(telegram_id: &str, auth_date: i64, bot_token: &str) -> Vec<(String, String)> {
    let mut fields = vec![
        ("auth_date".to_string(), auth_date.to_string()),
        ("first_name".to_string(), "Ada".to_string()),
        ("id".to_string(), telegram_id.to_string()),
        ("username".to_string(), "ada_l".to_string()),
    ];

    let data_check_string = fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let key = Sha256::digest(bot_token.as_bytes());
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(data_check_string.as_bytes());
    fields.push(("hash".to_string(), HEXLOWER.encode(&mac.finalize().into_bytes())));
    fields
}

pub fn query_string(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
