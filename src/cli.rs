use crate::api::models::{ProcessedTweet, SentimentLabel, TweetFilters};
use crate::api::{ApiClient, ScraperSettings};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Concurrent requests when fetching several tweets by id.
const TWEET_FETCH_CONCURRENCY: usize = 3;

#[derive(Debug, Parser)]
#[command(name = "tweetdash")]
#[command(version, about = "Terminal dashboard for the bookmark scraper backend", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.tweetdash/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend root URL, overriding the config file and TWEETDASH_BACKEND_URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Run a single command and print JSON instead of opening the dashboard
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the backend is reachable
    Health,
    /// Run one scraping session and wait for it to finish
    Scrape,
    /// List recent scraping sessions
    Sessions {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show one scraping session
    Session { id: String },
    /// List tweets with optional filters
    Tweets(FilterArgs),
    /// Search tweets with optional filters
    Search(FilterArgs),
    /// Show one or more tweets by id
    Tweet {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show aggregate analytics
    Analytics,
    /// Show or change scraper settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Control the background scheduler
    Scheduler {
        #[command(subcommand)]
        action: SchedulerAction,
    },
    /// Write a default config file
    InitConfig,
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    Show,
    /// Change the given settings, keeping everything else as it is
    Set(SettingsArgs),
}

#[derive(Debug, Subcommand)]
pub enum SchedulerAction {
    Start,
    Stop,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SentimentArg {
    Positive,
    Negative,
    Neutral,
}

impl From<SentimentArg> for SentimentLabel {
    fn from(arg: SentimentArg) -> Self {
        match arg {
            SentimentArg::Positive => Self::Positive,
            SentimentArg::Negative => Self::Negative,
            SentimentArg::Neutral => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct FilterArgs {
    /// Free-text query
    #[arg(short, long)]
    pub query: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, value_enum)]
    pub sentiment: Option<SentimentArg>,
    /// Only tweets with (true) or without (false) media
    #[arg(long)]
    pub media: Option<bool>,
    /// Only threads (true) or single tweets (false)
    #[arg(long)]
    pub thread: Option<bool>,
    #[arg(long)]
    pub min_quality: Option<f64>,
    #[arg(long)]
    pub min_engagement: Option<f64>,
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
}

impl From<FilterArgs> for TweetFilters {
    fn from(args: FilterArgs) -> Self {
        Self {
            query: args.query,
            author: args.author,
            category: args.category,
            sentiment: args
                .sentiment
                .map(|s| SentimentLabel::from(s).as_str().to_string()),
            has_media: args.media,
            is_thread: args.thread,
            min_quality_score: args.min_quality,
            min_engagement_score: args.min_engagement,
            limit: args.limit,
            offset: args.offset,
        }
    }
}

#[derive(Debug, Clone, Default, Args)]
pub struct SettingsArgs {
    /// Seconds between scheduled runs
    #[arg(long)]
    pub interval: Option<u64>,
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// Seconds between retries
    #[arg(long)]
    pub retry_delay: Option<u64>,
    #[arg(long)]
    pub batch_size: Option<u32>,
    #[arg(long)]
    pub enabled: Option<bool>,
}

impl SettingsArgs {
    /// Overlays the given flags on `current`. `None` when no flag was set.
    pub fn apply(&self, current: ScraperSettings) -> Option<ScraperSettings> {
        if self.interval.is_none()
            && self.max_retries.is_none()
            && self.retry_delay.is_none()
            && self.batch_size.is_none()
            && self.enabled.is_none()
        {
            return None;
        }

        Some(ScraperSettings {
            schedule_interval: self.interval.unwrap_or(current.schedule_interval),
            max_retries: self.max_retries.unwrap_or(current.max_retries),
            retry_delay: self.retry_delay.unwrap_or(current.retry_delay),
            batch_size: self.batch_size.unwrap_or(current.batch_size),
            enabled: self.enabled.unwrap_or(current.enabled),
            ..current
        })
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).context("failed to encode response")?;
    writeln!(out)?;
    Ok(())
}

/// Runs one backend command and writes the response as pretty JSON.
pub async fn run_command<W: Write>(client: &ApiClient, command: Command, out: &mut W) -> Result<()> {
    match command {
        Command::Health => write_json(out, &client.health().await?),
        Command::Scrape => {
            info!("running scraping session");
            write_json(out, &client.run_scraper().await?)
        }
        Command::Sessions { limit } => write_json(out, &client.list_sessions(limit).await?),
        Command::Session { id } => write_json(out, &client.get_session(&id).await?),
        Command::Tweets(args) => write_json(out, &client.list_tweets(&args.into()).await?),
        Command::Search(args) => write_json(out, &client.search_tweets(&args.into()).await?),
        Command::Tweet { ids } => {
            if let [id] = ids.as_slice() {
                return write_json(out, &client.get_tweet(id).await?);
            }
            let tweets: Vec<ProcessedTweet> = stream::iter(ids.iter().map(|id| client.get_tweet(id)))
                .buffered(TWEET_FETCH_CONCURRENCY)
                .try_collect()
                .await?;
            write_json(out, &tweets)
        }
        Command::Analytics => write_json(out, &client.analytics().await?),
        Command::Settings { action } => match action {
            SettingsAction::Show => write_json(out, &client.get_settings().await?),
            SettingsAction::Set(args) => {
                let current = client.get_settings().await?;
                let Some(updated) = args.apply(current) else {
                    bail!("nothing to change: pass at least one setting flag");
                };
                write_json(out, &client.update_settings(&updated).await?)
            }
        },
        Command::Scheduler { action } => match action {
            SchedulerAction::Start => write_json(out, &client.start_scheduler().await?),
            SchedulerAction::Stop => write_json(out, &client.stop_scheduler().await?),
            SchedulerAction::Status => write_json(out, &client.scheduler_status().await?),
        },
        Command::InitConfig => bail!("init-config does not talk to the backend"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&BackendConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_no_subcommand_opens_dashboard() {
        let cli = Cli::try_parse_from(["tweetdash", "--base-url", "http://pi:8001"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.base_url.as_deref(), Some("http://pi:8001"));
    }

    #[test]
    fn test_parse_tweets_filters() {
        let cli = Cli::try_parse_from([
            "tweetdash",
            "tweets",
            "--author",
            "alice",
            "--sentiment",
            "negative",
            "--media",
            "true",
            "--min-quality",
            "0.6",
            "--limit",
            "5",
        ])
        .unwrap();

        let Some(Command::Tweets(args)) = cli.command else {
            panic!("expected tweets command");
        };
        let filters = TweetFilters::from(args);
        assert_eq!(filters.author.as_deref(), Some("alice"));
        assert_eq!(filters.sentiment.as_deref(), Some("negative"));
        assert_eq!(filters.has_media, Some(true));
        assert_eq!(filters.is_thread, None);
        assert_eq!(filters.min_quality_score, Some(0.6));
        assert_eq!(filters.limit, 5);
        assert_eq!(filters.offset, 0);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tweetdash",
            "scheduler",
            "status",
            "--config",
            "/tmp/tweetdash.toml",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Scheduler {
                action: SchedulerAction::Status
            })
        ));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tweetdash.toml")));
    }

    #[test]
    fn test_rejects_unknown_sentiment_and_missing_ids() {
        assert!(Cli::try_parse_from(["tweetdash", "tweets", "--sentiment", "mixed"]).is_err());
        assert!(Cli::try_parse_from(["tweetdash", "tweet"]).is_err());
    }

    #[test]
    fn test_settings_apply() {
        let args = SettingsArgs {
            interval: Some(900),
            enabled: Some(false),
            ..SettingsArgs::default()
        };
        let updated = args.apply(ScraperSettings::default()).unwrap();
        assert_eq!(updated.schedule_interval, 900);
        assert!(!updated.enabled);
        assert_eq!(updated.batch_size, 50);

        assert!(SettingsArgs::default()
            .apply(ScraperSettings::default())
            .is_none());
    }

    #[tokio::test]
    async fn test_sessions_command_prints_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/scraper/sessions"))
            .and(query_param("limit", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "s1", "tweets_processed": 12, "status": "completed"}
            ])))
            .mount(&server)
            .await;

        let mut out = Vec::new();
        run_command(&client_for(&server), Command::Sessions { limit: 3 }, &mut out)
            .await
            .unwrap();

        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(printed[0]["id"], "s1");
        assert_eq!(printed[0]["tweets_processed"], 12);
    }

    #[tokio::test]
    async fn test_settings_set_merges_current() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "enabled": true,
                "schedule_interval": 3600,
                "max_retries": 3,
                "retry_delay": 30,
                "batch_size": 25,
                "use_fallback": false,
                "process_images": true,
                "process_videos": true,
                "process_threads": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/config"))
            .and(body_json(serde_json::json!({
                "enabled": true,
                "schedule_interval": 1800,
                "max_retries": 3,
                "retry_delay": 30,
                "batch_size": 25,
                "use_fallback": false,
                "process_images": true,
                "process_videos": true,
                "process_threads": true
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"schedule_interval": 1800})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let command = Command::Settings {
            action: SettingsAction::Set(SettingsArgs {
                interval: Some(1800),
                ..SettingsArgs::default()
            }),
        };
        let mut out = Vec::new();
        run_command(&client_for(&server), command, &mut out)
            .await
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("1800"));
    }

    #[tokio::test]
    async fn test_several_tweets_keep_order() {
        let server = MockServer::start().await;
        for id in ["a", "b", "c"] {
            Mock::given(method("GET"))
                .and(path(format!("/api/tweets/{}", id)))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": id})),
                )
                .mount(&server)
                .await;
        }

        let command = Command::Tweet {
            ids: vec!["c".to_string(), "a".to_string(), "b".to_string()],
        };
        let mut out = Vec::new();
        run_command(&client_for(&server), command, &mut out)
            .await
            .unwrap();

        let printed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let ids: Vec<&str> = printed
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_backend_error_fails_command() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tweets/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"detail": "Tweet not found"})),
            )
            .mount(&server)
            .await;

        let command = Command::Tweet {
            ids: vec!["missing".to_string()],
        };
        let mut out = Vec::new();
        let err = run_command(&client_for(&server), command, &mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
        assert!(out.is_empty());
    }
}
