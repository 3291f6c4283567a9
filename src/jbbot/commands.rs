use anyhow::{Context as _, Result, anyhow};
use itertools::Itertools;
use regex::Regex;
use serenity::all::{
    Cache, Command, CommandInteraction, CommandOptionType, Context, CreateCommand,
    CreateCommandOption, Message, UserId,
};

use std::sync::LazyLock;

use crate::jbbot::JudgeBot;
use crate::jbbot::reply::{InteractionChannel, MessageChannel, Reply, safe_reply};
use crate::models::{self, LeaderboardEntry};
use crate::submission::{SubmissionError, SubmissionRequest};

const MAX_CMD_LENGTH: usize = 12;

static COMMAND_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap());

/// Slash commands the bot answers to.
pub fn slash_commands() -> Vec<CreateCommand> {
    let required = |name: &str, description: &str| {
        CreateCommandOption::new(CommandOptionType::String, name, description).required(true)
    };

    vec![
        CreateCommand::new("vjudge_link")
            .description("Link your VJudge credentials")
            .add_option(required("username", "Your VJudge username"))
            .add_option(required("password", "Your VJudge password")),
        CreateCommand::new("submit")
            .description("Submit code via VJudge")
            .add_option(required("judge", "Judge name, e.g. 'CF'"))
            .add_option(required("problem_id", "Problem code, e.g. '123A'"))
            .add_option(required("language", "Language slug, e.g. 'GNU G++17'"))
            .add_option(required("code", "Your source code")),
        CreateCommand::new("leaderboard").description("Show solve leaderboard"),
    ]
}

pub async fn register(ctx: &Context) -> Result<()> {
    let registered = Command::set_global_commands(&ctx.http, slash_commands())
        .await
        .context("Could not register slash commands.")?;

    log::info!("Registered {} slash commands.", registered.len());
    Ok(())
}

/// Dispatches one slash command and replies to it.
pub async fn run_slash_command(bot: &JudgeBot, ctx: &Context, command: &CommandInteraction) {
    let name = command.data.name.as_str();
    log::debug!("[run_slash_command] /{name} from {}", command.user.id);

    let mut channel = InteractionChannel { ctx, command, deferred: false };
    let reply = match name {
        "vjudge_link" => link(bot, command).await,
        "submit" => {
            // Judging takes a while, so acknowledge before Discord times us out.
            match command.defer_ephemeral(ctx).await {
                Ok(()) => channel.deferred = true,
                Err(err) => log::error!("Could not defer /submit: {err:?}"),
            }
            submit(bot, command).await
        }
        "leaderboard" => leaderboard(bot, ctx).await,
        _ => {
            log::info!("User submitted unknown command: {name}");
            Err(anyhow!("No such command found: {name}"))
        }
    };

    let reply = reply.unwrap_or_else(|err| Reply::private(format!("❌ Error: {err}")));
    safe_reply(&channel, &reply).await;
}

fn string_option<'a>(command: &'a CommandInteraction, name: &str) -> Result<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_str())
        .with_context(|| format!("Expected `{name}`, got none."))
}

async fn link(bot: &JudgeBot, command: &CommandInteraction) -> Result<Reply> {
    let cred = models::UserCredential {
        user_id: command.user.id.get(),
        username: string_option(command, "username")?.to_string(),
        password: string_option(command, "password")?.to_string(),
    };

    bot.store
        .upsert_credentials(&cred)
        .await
        .inspect_err(|err| log::error!("Could not link credentials for {}: {err}", cred.user_id))?;
    log::info!("User {} linked VJudge account {}", cred.user_id, cred.username);

    Ok(Reply::private("✅ Credentials linked."))
}

async fn submit(bot: &JudgeBot, command: &CommandInteraction) -> Result<Reply> {
    let request = SubmissionRequest {
        user_id: command.user.id.get(),
        judge: string_option(command, "judge")?.to_string(),
        problem_id: string_option(command, "problem_id")?.to_string(),
        language: string_option(command, "language")?.to_string(),
        code: string_option(command, "code")?.to_string(),
    };

    Ok(match bot.orchestrator.submit(request).await {
        Ok(report) => Reply::Report(report),
        Err(SubmissionError::NotLinked) => Reply::private("⚠️ Please `/vjudge_link` first."),
        Err(err) => {
            log::warn!("Submission by {} failed: {err}", command.user.id);
            Reply::private(format!("❌ Error: {err}"))
        }
    })
}

async fn leaderboard(bot: &JudgeBot, ctx: &Context) -> Result<Reply> {
    let entries = bot.store.leaderboard().await?;
    if entries.is_empty() {
        return Ok(Reply::private("No solves yet."));
    }

    let named = entries
        .into_iter()
        .map(|LeaderboardEntry { user_id, solves }| (display_name(&ctx.cache, user_id), solves))
        .collect::<Vec<_>>();

    Ok(Reply::public(format_leaderboard(&named)))
}

/// The user's display name from the gateway cache, or their raw id if they
/// aren't cached. Never goes over HTTP: a slash command gets three seconds to
/// answer.
fn display_name(cache: &Cache, user_id: models::UserId) -> String {
    if user_id == 0 {
        return user_id.to_string();
    }

    match cache.user(UserId::new(user_id)) {
        Some(user) => user.display_name().to_string(),
        None => {
            log::debug!("[display_name] {user_id} is not cached");
            user_id.to_string()
        }
    }
}

fn format_leaderboard(entries: &[(String, u64)]) -> String {
    let lines = entries
        .iter()
        .map(|(name, solves)| {
            format!("**{name}** - {solves} solve{}", if *solves == 1 { "" } else { "s" })
        })
        .join("\n");

    format!("🏆 **Leaderboard**\n{lines}")
}

/// Text commands: `<call token><command>`.
pub struct Commands;
impl Commands {
    pub async fn run_command(bot: &JudgeBot, ctx: &Context, msg: &Message) {
        let reply = match Self::dispatch(bot, ctx, msg).await {
            Ok(reply) => reply,
            Err(err) => Reply::public(format!("Error: {err}")),
        };

        safe_reply(&MessageChannel { ctx, msg }, &reply).await;
    }

    async fn dispatch(bot: &JudgeBot, ctx: &Context, msg: &Message) -> Result<Reply> {
        // Skip the call token, the command is the first token after it
        let input = msg
            .content
            .strip_prefix(bot.call_token)
            .context("Message is not a command.")?;
        let command = input.split_whitespace().next().context("Invalid command syntax.")?;

        match command {
            "help" => Ok(Reply::public(Self::get_help(bot.call_token))),
            "leaderboard" => leaderboard(bot, ctx).await,
            _ => {
                if Commands::is_valid_cmd(command) {
                    log::info!("User submitted unknown command: {command}");
                    Err(anyhow!(
                        "No such command found: {command}, see {}help for commands.",
                        bot.call_token
                    ))
                } else {
                    log::info!("User submitted invalid command: {command}");
                    Err(anyhow!("Invalid command syntax."))
                }
            }
        }
    }

    /// Ensures that the string slice conforms to C-like identifier regex
    fn is_valid_cmd(s: &str) -> bool {
        s.len() <= MAX_CMD_LENGTH && COMMAND_NAME.is_match(s)
    }

    pub fn get_help(t: char) -> String {
        format!(
            r#"
**Command List:**
`/vjudge_link <username> <password>`:  Link your VJudge account.
`/submit <judge> <problem_id> <language> <code>`:  Submit a solution and wait for the verdict.
`/leaderboard` or `{t}leaderboard`:  Show who has solved the most problems.
`{t}help`:  Get information on supported commands
"#,
        )
    }
}
