use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*, types::BotCommand};
use tracing::{error, info, warn};

use crate::roster::RosterService;

fn commands() -> Vec<BotCommand> {
    vec![
        BotCommand::new("adduser", "Add a new user to the database"),
        BotCommand::new("removeuser", "Remove a user from the database"),
        BotCommand::new("changeusername", "Change the username of a user"),
        BotCommand::new("listusers", "List all registered users"),
        BotCommand::new("help", "Show available commands"),
    ]
}

async fn handle_message(bot: Bot, msg: Message, roster: Arc<RosterService>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let caller = msg.from().map(|user| user.id.0.to_string());

    if let Some(reply) = roster.handle_text(caller.as_deref(), text).await {
        bot.send_message(msg.chat.id, reply).await?;
    }
    Ok(())
}

/// Runs the roster bot until the dispatcher stops.
pub async fn run(bot_token: String, roster: Arc<RosterService>) -> anyhow::Result<()> {
    let bot = Bot::new(bot_token);

    if let Err(e) = bot.set_my_commands(commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    let me = bot.get_me().await?;
    info!("Roster bot started as @{}", me.username());

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![roster])
        .default_handler(|_| async {})
        .error_handler(LoggingErrorHandler::with_custom_text("Roster bot handler failed"))
        .build()
        .dispatch()
        .await;

    error!("Roster bot dispatcher stopped");
    Ok(())
}
