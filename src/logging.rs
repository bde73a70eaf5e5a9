use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding `tracing` filter directives.
pub const LOG_ENV: &str = "TWEETDASH_LOG";

const DEFAULT_DIRECTIVES: &str = "tweetdash=info";
const LOG_FILE_PREFIX: &str = "tweetdash.log";

fn directives(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DIRECTIVES.to_string())
}

fn env_filter() -> EnvFilter {
    let directives = directives(std::env::var(LOG_ENV).ok());
    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Logs to stderr. Used by one-shot subcommands, whose stdout is JSON.
pub fn init_stderr() -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))
}

/// Logs to a daily-rolling file under `dir`. The dashboard owns the
/// terminal, so nothing may be written to stdout or stderr while it runs.
/// Keep the returned guard alive until exit or buffered lines are lost.
pub fn init_file(dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;

    Ok(guard)
}

pub fn log_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".tweetdash").join("logs"))
}
