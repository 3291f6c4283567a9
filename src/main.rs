use anyhow::Result;

use judgebot::config::Config;
use judgebot::jbbot;

#[tokio::main]
async fn main() -> Result<()> {
    // Begin logger
    env_logger::init();

    // Load the bot token and everything else from the environment (.env)
    let config = Config::from_env()?;

    if let Err(why) = jbbot::run_judgebot(config).await {
        log::error!("Client error: {why:?}");
        return Err(why);
    }

    Ok(())
}
