mod commands;
mod reply;

pub use commands::{Commands, slash_commands};
pub use reply::{Reply, ReplyChannel, ReplyError, safe_reply};

use anyhow::{Context as _, Result};
use serenity::all::{Context, EventHandler, GatewayIntents, Interaction, Message, Ready};
use serenity::{Client, async_trait};

use std::sync::Arc;

use crate::config::Config;
use crate::jbdb::{self, Store};
use crate::ojcli::{Invoker, OjClient};
use crate::submission::Orchestrator;

/// Shared state every command handler works with.
pub struct JudgeBot {
    pub store: Arc<dyn Store>,
    pub orchestrator: Orchestrator,
    pub call_token: char,
}

pub async fn run_judgebot(config: Config) -> Result<()> {
    let store = jbdb::connect(&config.db).await?;

    let invoker = Invoker::from_command_line(&config.oj_command)
        .context("OJ_COMMAND must name a program.")?;
    let judge = Arc::new(OjClient::new(invoker));

    let bot = JudgeBot {
        orchestrator: Orchestrator::new(store.clone(), judge, config.poll),
        store,
        call_token: config.call_token,
    };

    let intents = GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(JudgeHandler { bot })
        .await
        .context("Error creating client.")?;

    client.start().await?;

    Ok(())
}

struct JudgeHandler {
    bot: JudgeBot,
}

#[async_trait]
impl EventHandler for JudgeHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("Logged in as {} ({})", ready.user.name, ready.user.id);

        if let Err(err) = commands::register(&ctx).await {
            log::error!("{err:?}");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            commands::run_slash_command(&self.bot, &ctx, &command).await;
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        let content = &msg.content;
        if content.starts_with(self.bot.call_token) && content.chars().count() > 1 {
            Commands::run_command(&self.bot, &ctx, &msg).await;
        }
    }
}
