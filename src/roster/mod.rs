//! User roster administration over Telegram bot commands.
//!
//! Parsing and command execution live here and only talk to a
//! [`UserStore`]; [`bot`] wires them to the Telegram Bot API.

pub mod bot;

use std::sync::Arc;
use tracing::{error, info};

use crate::db::models::{User, UserRole};
use crate::db::store::UserStore;
use crate::error::AppError;

pub const HELP_TEXT: &str = "Available commands:
/adduser <telegram id> <username> - Add a new user to the database
/removeuser <telegram id> - Remove a user from the database
/changeusername <telegram id> <new username> - Change the username of a user
/listusers - List all registered users
/help - Show this help message";

pub const WELCOME_TEXT: &str =
    "Welcome to the User Management Bot! Type /help to see available commands.";

const ADMINS: &[UserRole] = &[UserRole::Admin, UserRole::Owner];
const OWNERS: &[UserRole] = &[UserRole::Owner];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterCommand {
    Start,
    Help,
    AddUser { telegram_id: String, username: String },
    RemoveUser { telegram_id: String },
    ChangeUsername { telegram_id: String, username: String },
    ListUsers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    NotACommand,
    Unknown(String),
    /// Carries the reply explaining what is missing.
    MissingArguments(&'static str),
}

impl RosterCommand {
    /// Parses `/command arg1 arg2`, tolerating a `@BotName` suffix.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parts = text.split(' ');
        let head = parts.next().unwrap_or_default();
        let name = head
            .strip_prefix('/')
            .ok_or(ParseError::NotACommand)?
            .split('@')
            .next()
            .unwrap_or_default();

        let mut arg = || parts.next().filter(|s| !s.is_empty()).map(str::to_owned);

        match name {
            "start" => Ok(RosterCommand::Start),
            "help" => Ok(RosterCommand::Help),
            "listusers" => Ok(RosterCommand::ListUsers),
            "adduser" => match (arg(), arg()) {
                (Some(telegram_id), Some(username)) => {
                    Ok(RosterCommand::AddUser { telegram_id, username })
                }
                _ => Err(ParseError::MissingArguments(
                    "Please provide both the Telegram ID and username.",
                )),
            },
            "removeuser" => arg()
                .map(|telegram_id| RosterCommand::RemoveUser { telegram_id })
                .ok_or(ParseError::MissingArguments(
                    "Please provide the Telegram ID of the user to remove.",
                )),
            "changeusername" => match (arg(), arg()) {
                (Some(telegram_id), Some(username)) => {
                    Ok(RosterCommand::ChangeUsername { telegram_id, username })
                }
                _ => Err(ParseError::MissingArguments(
                    "Please provide both the Telegram ID and the new username.",
                )),
            },
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }

    fn required_roles(&self) -> Option<&'static [UserRole]> {
        match self {
            RosterCommand::Start | RosterCommand::Help => None,
            RosterCommand::AddUser { .. }
            | RosterCommand::ChangeUsername { .. }
            | RosterCommand::ListUsers => Some(ADMINS),
            RosterCommand::RemoveUser { .. } => Some(OWNERS),
        }
    }

    fn failure_reply(&self) -> &'static str {
        match self {
            RosterCommand::AddUser { .. } => "An error occurred while adding the user.",
            RosterCommand::RemoveUser { .. } => "An error occurred while removing the user.",
            RosterCommand::ChangeUsername { .. } => "An error occurred while updating the username.",
            RosterCommand::ListUsers => "An error occurred while listing the users.",
            RosterCommand::Start | RosterCommand::Help => "An error occurred.",
        }
    }
}

pub struct RosterService {
    users: Arc<dyn UserStore>,
}

impl RosterService {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Turns an incoming message into the reply to send, if any.
    ///
    /// `caller` is the sender's Telegram id, `None` when Telegram did not
    /// include one.
    pub async fn handle_text(&self, caller: Option<&str>, text: &str) -> Option<String> {
        match RosterCommand::parse(text) {
            Ok(command) => Some(self.execute(caller, &command).await),
            Err(ParseError::MissingArguments(reply)) => Some(reply.to_string()),
            Err(ParseError::Unknown(_)) | Err(ParseError::NotACommand) => None,
        }
    }

    pub async fn execute(&self, caller: Option<&str>, command: &RosterCommand) -> String {
        if let Some(required) = command.required_roles() {
            match self.check_permission(caller, required).await {
                Ok(None) => {}
                Ok(Some(denied)) => return denied,
                Err(e) => {
                    error!("Permission check failed: {}", e);
                    return "An error occurred while checking your permissions.".to_string();
                }
            }
        }

        match self.run(command).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Roster command {:?} failed: {}", command, e);
                command.failure_reply().to_string()
            }
        }
    }

    /// `Ok(Some(reply))` means the caller may not run the command.
    async fn check_permission(
        &self,
        caller: Option<&str>,
        required: &[UserRole],
    ) -> Result<Option<String>, AppError> {
        let Some(telegram_id) = caller else {
            return Ok(Some("Unable to retrieve your Telegram ID.".to_string()));
        };

        let Some(user) = self.users.find_by_telegram_id(telegram_id).await? else {
            return Ok(Some("You are not registered in the system.".to_string()));
        };

        let role = user.user_role();
        if !required.contains(&role) {
            let required = required
                .iter()
                .map(UserRole::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            return Ok(Some(format!(
                "You do not have permission to execute this command (required: {}, yours: {}).",
                required, role
            )));
        }

        Ok(None)
    }

    async fn run(&self, command: &RosterCommand) -> Result<String, AppError> {
        match command {
            RosterCommand::Start => Ok(WELCOME_TEXT.to_string()),
            RosterCommand::Help => Ok(HELP_TEXT.to_string()),
            RosterCommand::AddUser { telegram_id, username } => {
                if self.users.find_by_telegram_id(telegram_id).await?.is_some() {
                    return Ok(format!("User with Telegram ID {} already exists.", telegram_id));
                }
                self.users
                    .create_user(telegram_id, username, UserRole::User)
                    .await?;
                info!("Added user {} ({})", username, telegram_id);
                Ok(format!(
                    "User {} with Telegram ID {} has been added.",
                    username, telegram_id
                ))
            }
            RosterCommand::RemoveUser { telegram_id } => {
                if !self.users.delete_by_telegram_id(telegram_id).await? {
                    return Ok(format!("User with Telegram ID {} does not exist.", telegram_id));
                }
                info!("Removed user {}", telegram_id);
                Ok(format!("User with Telegram ID {} has been removed.", telegram_id))
            }
            RosterCommand::ChangeUsername { telegram_id, username } => {
                if !self.users.rename(telegram_id, username).await? {
                    return Ok(format!("User with Telegram ID {} does not exist.", telegram_id));
                }
                info!("Renamed user {} to {}", telegram_id, username);
                Ok(format!(
                    "Username for user with Telegram ID {} has been updated to {}.",
                    telegram_id, username
                ))
            }
            RosterCommand::ListUsers => {
                let users = self.users.list_users().await?;
                Ok(format_user_list(&users))
            }
        }
    }
}

pub fn format_user_list(users: &[User]) -> String {
    if users.is_empty() {
        return "No users registered in the database.".to_string();
    }

    let mut message = format!("Registered Users ({}):\n", users.len());
    for user in users {
        message.push_str(&format!(
            "\nUsername: {}\nTelegram ID: {}\nRole: {}\nJoined: {}\n",
            user.username,
            user.telegram_id,
            user.role,
            user.created_at.format("%b %-d, %Y at %H:%M")
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockUserStore;
    use chrono::{TimeZone, Utc};

    fn user(telegram_id: &str, role: UserRole) -> User {
        User {
            id: 1,
            telegram_id: telegram_id.to_string(),
            username: format!("user{}", telegram_id),
            role: role.as_str().to_string(),
            first_name: None,
            last_name: None,
            photo_url: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 0).unwrap(),
            last_login: None,
        }
    }

    fn store_with_caller(role: UserRole) -> MockUserStore {
        let mut store = MockUserStore::new();
        store
            .expect_find_by_telegram_id()
            .withf(|tg| tg == "1")
            .returning(move |tg| Ok(Some(user(tg, role))));
        store
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(RosterCommand::parse("/start"), Ok(RosterCommand::Start));
        assert_eq!(RosterCommand::parse("/listusers@GymBot"), Ok(RosterCommand::ListUsers));
        assert_eq!(
            RosterCommand::parse("/adduser 123 alice"),
            Ok(RosterCommand::AddUser {
                telegram_id: "123".into(),
                username: "alice".into()
            })
        );
        assert_eq!(
            RosterCommand::parse("/removeuser 123"),
            Ok(RosterCommand::RemoveUser { telegram_id: "123".into() })
        );
        assert!(matches!(
            RosterCommand::parse("/adduser 123"),
            Err(ParseError::MissingArguments(_))
        ));
        assert!(matches!(
            RosterCommand::parse("/changeusername"),
            Err(ParseError::MissingArguments(_))
        ));
        assert_eq!(RosterCommand::parse("hello"), Err(ParseError::NotACommand));
        assert_eq!(
            RosterCommand::parse("/dance"),
            Err(ParseError::Unknown("dance".into()))
        );
    }

    #[tokio::test]
    async fn test_unregistered_caller_is_refused() {
        let mut store = MockUserStore::new();
        store.expect_find_by_telegram_id().returning(|_| Ok(None));
        store.expect_list_users().never();
        let roster = RosterService::new(Arc::new(store));

        let reply = roster.handle_text(Some("77"), "/listusers").await.unwrap();
        assert_eq!(reply, "You are not registered in the system.");
    }

    #[tokio::test]
    async fn test_admin_cannot_remove_users() {
        let mut store = store_with_caller(UserRole::Admin);
        store.expect_delete_by_telegram_id().never();
        let roster = RosterService::new(Arc::new(store));

        let reply = roster.handle_text(Some("1"), "/removeuser 2").await.unwrap();
        assert_eq!(
            reply,
            "You do not have permission to execute this command (required: OWNER, yours: ADMIN)."
        );
    }

    #[tokio::test]
    async fn test_admin_adds_user() {
        let mut store = store_with_caller(UserRole::Admin);
        store
            .expect_find_by_telegram_id()
            .withf(|tg| tg == "2")
            .returning(|_| Ok(None));
        store
            .expect_create_user()
            .withf(|tg, name, role| tg == "2" && name == "bob" && *role == UserRole::User)
            .times(1)
            .returning(|tg, _, role| Ok(user(tg, role)));
        let roster = RosterService::new(Arc::new(store));

        let reply = roster.handle_text(Some("1"), "/adduser 2 bob").await.unwrap();
        assert_eq!(reply, "User bob with Telegram ID 2 has been added.");
    }

    #[tokio::test]
    async fn test_owner_removes_missing_user() {
        let mut store = store_with_caller(UserRole::Owner);
        store.expect_delete_by_telegram_id().returning(|_| Ok(false));
        let roster = RosterService::new(Arc::new(store));

        let reply = roster.handle_text(Some("1"), "/removeuser 9").await.unwrap();
        assert_eq!(reply, "User with Telegram ID 9 does not exist.");
    }

    #[tokio::test]
    async fn test_store_failure_gives_generic_reply() {
        let mut store = store_with_caller(UserRole::Owner);
        store
            .expect_list_users()
            .returning(|| Err(AppError::InternalError("db down".into())));
        let roster = RosterService::new(Arc::new(store));

        let reply = roster.handle_text(Some("1"), "/listusers").await.unwrap();
        assert_eq!(reply, "An error occurred while listing the users.");
    }

    #[tokio::test]
    async fn test_help_needs_no_registration() {
        let store = MockUserStore::new();
        let roster = RosterService::new(Arc::new(store));

        assert_eq!(roster.handle_text(None, "/help").await.unwrap(), HELP_TEXT);
        assert_eq!(roster.handle_text(None, "just chatting").await, None);
        assert_eq!(
            roster.handle_text(None, "/listusers").await.unwrap(),
            "Unable to retrieve your Telegram ID."
        );
    }

    #[test]
    fn test_format_user_list() {
        assert_eq!(format_user_list(&[]), "No users registered in the database.");

        let listing = format_user_list(&[user("5", UserRole::Owner)]);
        assert!(listing.starts_with("Registered Users (1):"));
        assert!(listing.contains("Telegram ID: 5"));
        assert!(listing.contains("Joined: Mar 7, 2024 at 09:05"));
    }
}
