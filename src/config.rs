use anyhow::{Context, Result, anyhow};
use dotenv::dotenv;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_FILE: &str = "bot_data.db";
const DEFAULT_OJ_COMMAND: &str = "python3 -m oj";
const DEFAULT_CALL_TOKEN: char = '$';

/// How long the orchestrator keeps asking the judge for a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { attempts: 30, interval: Duration::from_secs(2) }
    }
}

/// Where solves and credentials live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbConfig {
    Sqlite(PathBuf),
    Postgres(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub db: DbConfig,

    /// Program followed by its leading arguments, e.g. `python3 -m oj`.
    pub oj_command: Vec<String>,
    pub poll: PollConfig,
    pub call_token: char,
}

impl Config {
    /// Reads the configuration from the environment, after loading `.env`
    /// from the working directory if there is one.
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let discord_token = lookup("DISCORD_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .context("Expected 'DISCORD_TOKEN=<token>' in the environment or .env.")?;

        let db = match lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()) {
            Some(url) => DbConfig::Postgres(url),
            None => DbConfig::Sqlite(PathBuf::from(
                lookup("DB_FILE").unwrap_or_else(|| String::from(DEFAULT_DB_FILE)),
            )),
        };

        let oj_command = lookup("OJ_COMMAND")
            .unwrap_or_else(|| String::from(DEFAULT_OJ_COMMAND))
            .split_whitespace()
            .map(String::from)
            .collect::<Vec<_>>();
        if oj_command.is_empty() {
            return Err(anyhow!("OJ_COMMAND must name a program."));
        }

        let defaults = PollConfig::default();
        let poll = PollConfig {
            attempts: parse_or(&lookup, "POLL_ATTEMPTS", defaults.attempts)?,
            interval: Duration::from_secs(
                parse_or(&lookup, "POLL_INTERVAL_SECS", defaults.interval.as_secs())?,
            ),
        };
        if poll.attempts == 0 {
            return Err(anyhow!("POLL_ATTEMPTS must be at least 1."));
        }

        let call_token = match lookup("BOT_CALL_TOKEN") {
            Some(token) => {
                let first = token.chars().next().context("BOT_CALL_TOKEN is empty.")?;
                if token.chars().count() > 1 {
                    log::warn!("$BOT_CALL_TOKEN not a single character. Truncating to {first}");
                }
                first
            }
            None => DEFAULT_CALL_TOKEN,
        };

        Ok(Self { discord_token, db, oj_command, poll, call_token })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Could not parse {key}={raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn defaults_to_sqlite_and_stock_polling() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.db, DbConfig::Sqlite(PathBuf::from("bot_data.db")));
        assert_eq!(config.oj_command, vec!["python3", "-m", "oj"]);
        assert_eq!(config.poll, PollConfig::default());
        assert_eq!(config.call_token, '$');
    }

    #[test]
    fn database_url_selects_postgres() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("DATABASE_URL", "postgres://bot@localhost/bot"),
            ("DB_FILE", "ignored.db"),
        ])
        .unwrap();
        assert_eq!(config.db, DbConfig::Postgres(String::from("postgres://bot@localhost/bot")));
    }

    #[test]
    fn poll_settings_are_overridable() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("POLL_ATTEMPTS", "5"),
            ("POLL_INTERVAL_SECS", "0"),
            ("BOT_CALL_TOKEN", "!?"),
        ])
        .unwrap();
        assert_eq!(config.poll, PollConfig { attempts: 5, interval: Duration::ZERO });
        assert_eq!(config.call_token, '!');

        assert!(config_from(&[("DISCORD_TOKEN", "abc"), ("POLL_ATTEMPTS", "lots")]).is_err());
    }

    #[test]
    fn zero_poll_attempts_is_rejected() {
        let err = config_from(&[("DISCORD_TOKEN", "abc"), ("POLL_ATTEMPTS", "0")]).unwrap_err();
        assert!(err.to_string().contains("POLL_ATTEMPTS"));

        let config = config_from(&[("DISCORD_TOKEN", "abc"), ("POLL_ATTEMPTS", "1")]).unwrap();
        assert_eq!(config.poll.attempts, 1);
    }
}
