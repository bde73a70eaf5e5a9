use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tweetdash::api::ApiClient;
use tweetdash::app::App;
use tweetdash::cli::{self, Cli, Command};
use tweetdash::config::Config;
use tweetdash::logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if let Some(Command::InitConfig) = cli.command {
        Config::write_default(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let mut config = Config::load(&config_path)?;
    config.apply_env(|key| std::env::var(key).ok());
    if let Some(base_url) = cli.base_url {
        config.backend.base_url = base_url;
    }

    let client = ApiClient::new(&config.backend).context("invalid backend settings")?;

    match cli.command {
        Some(command) => {
            logging::init_stderr()?;
            debug!(backend = client.base_url(), config = %config_path.display(), "running command");
            let mut stdout = std::io::stdout().lock();
            cli::run_command(&client, command, &mut stdout).await
        }
        None => {
            let _guard = logging::init_file(&logging::log_dir()?)?;
            info!(config = %config_path.display(), "starting dashboard");
            App::new(client, &config).run()
        }
    }
}
