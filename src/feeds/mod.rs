pub mod dashboard;
pub mod tweets;

use crate::api::{ApiClient, ApiError, ProcessedTweet, ScraperSettings, ScrapingSession};
use async_trait::async_trait;
use dashboard::{DashboardFetcher, DashboardSnapshot};
use tweets::TweetPageFetcher;

/// Result of a fetch, routed back to the widget that asked for it.
#[derive(Debug, Clone)]
pub struct FeedMessage {
    pub widget_id: String,
    pub generation: Generation,
    pub data: FeedData,
}

#[derive(Debug, Clone)]
pub enum FeedData {
    TweetPage {
        tweets: Vec<ProcessedTweet>,
        append: bool,
    },
    Dashboard(DashboardSnapshot),
    ScrapeFinished(ScrapingSession),
    SchedulerChanged {
        running: bool,
        message: String,
    },
    SettingsSaved(ScraperSettings),
    Health(String),
    Error {
        kind: RequestKind,
        message: String,
    },
}

/// What a widget wants fetched. Widgets return these; the app turns them
/// into tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub widget_id: String,
    pub generation: Generation,
    pub request: Request,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Tweets {
        filters: crate::api::TweetFilters,
        append: bool,
    },
    Dashboard {
        session_limit: u32,
    },
    Action(Action),
}

/// One-shot operator actions.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    RunScraper,
    StartScheduler,
    StopScheduler,
    UpdateSettings(ScraperSettings),
    Health,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Tweets,
    Dashboard,
    Scrape,
    Scheduler,
    Settings,
    Health,
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Tweets { .. } => RequestKind::Tweets,
            Self::Dashboard { .. } => RequestKind::Dashboard,
            Self::Action(Action::RunScraper) => RequestKind::Scrape,
            Self::Action(Action::StartScheduler | Action::StopScheduler) => RequestKind::Scheduler,
            Self::Action(Action::UpdateSettings(_)) => RequestKind::Settings,
            Self::Action(Action::Health) => RequestKind::Health,
        }
    }

    pub fn fetcher(&self, client: ApiClient) -> Box<dyn FeedFetcher> {
        match self {
            Self::Tweets { filters, append } => Box::new(TweetPageFetcher::new(
                client,
                filters.clone(),
                *append,
            )),
            Self::Dashboard { session_limit } => {
                Box::new(DashboardFetcher::new(client, *session_limit))
            }
            Self::Action(action) => Box::new(ActionFetcher {
                client,
                action: action.clone(),
            }),
        }
    }
}

/// Monotonic token stamped on every request. Only the response carrying the
/// latest token a widget issued is allowed to touch its state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    pub fn current(&self) -> Generation {
        self.current
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current == generation
    }
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self) -> Result<FeedData, ApiError>;
}

struct ActionFetcher {
    client: ApiClient,
    action: Action,
}

#[async_trait]
impl FeedFetcher for ActionFetcher {
    async fn fetch(&self) -> Result<FeedData, ApiError> {
        match &self.action {
            Action::RunScraper => Ok(FeedData::ScrapeFinished(
                self.client.run_scraper().await?,
            )),
            Action::StartScheduler => {
                let reply = self.client.start_scheduler().await?;
                Ok(FeedData::SchedulerChanged {
                    running: true,
                    message: reply.message,
                })
            }
            Action::StopScheduler => {
                let reply = self.client.stop_scheduler().await?;
                Ok(FeedData::SchedulerChanged {
                    running: false,
                    message: reply.message,
                })
            }
            Action::UpdateSettings(settings) => Ok(FeedData::SettingsSaved(
                self.client.update_settings(settings).await?,
            )),
            Action::Health => Ok(FeedData::Health(self.client.health().await?.message)),
        }
    }
}

/// Runs a request to completion and packages the outcome for the widget.
pub async fn run_request(client: ApiClient, request: FetchRequest) -> FeedMessage {
    let kind = request.request.kind();
    let fetcher = request.request.fetcher(client);
    let data = match fetcher.fetch().await {
        Ok(data) => data,
        Err(e) => FeedData::Error {
            kind,
            message: e.user_message(),
        },
    };

    FeedMessage {
        widget_id: request.widget_id,
        generation: request.generation,
        data,
    }
}
