use super::{Action, FeedData, FeedFetcher};
use crate::api::{
    Analytics, ApiClient, ApiError, ScraperSettings, SchedulerStatus, ScrapingSession,
};
use async_trait::async_trait;
use tracing::warn;

/// Everything the operations dashboard shows, fetched in one go.
///
/// Sections that failed to load are left empty and named in `unavailable`;
/// one broken endpoint never hides the others.
#[derive(Debug, Clone, Default)]
pub struct DashboardSnapshot {
    pub analytics: Option<Analytics>,
    pub scheduler: Option<SchedulerStatus>,
    pub sessions: Vec<ScrapingSession>,
    pub settings: Option<ScraperSettings>,
    pub unavailable: Vec<&'static str>,
}

impl DashboardSnapshot {
    /// Unknown status counts as not running.
    pub fn scheduler_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| s.running)
    }

    /// Stop a running scheduler, start anything else.
    pub fn toggle_action(&self) -> Action {
        if self.scheduler_running() {
            Action::StopScheduler
        } else {
            Action::StartScheduler
        }
    }
}

pub async fn fetch_snapshot(client: &ApiClient, session_limit: u32) -> DashboardSnapshot {
    let (analytics, scheduler, sessions, settings) = tokio::join!(
        client.analytics(),
        client.scheduler_status(),
        client.list_sessions(session_limit),
        client.get_settings(),
    );

    let mut unavailable = Vec::new();
    let analytics = settle("analytics", analytics, &mut unavailable);
    let scheduler = settle("scheduler", scheduler, &mut unavailable);
    let mut sessions = settle("sessions", sessions, &mut unavailable).unwrap_or_default();
    let settings = settle("settings", settings, &mut unavailable);

    sessions.truncate(session_limit as usize);

    DashboardSnapshot {
        analytics,
        scheduler,
        sessions,
        settings,
        unavailable,
    }
}

fn settle<T>(
    section: &'static str,
    result: Result<T, ApiError>,
    unavailable: &mut Vec<&'static str>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(section, error = %e, "dashboard section unavailable");
            unavailable.push(section);
            None
        }
    }
}

pub struct DashboardFetcher {
    client: ApiClient,
    session_limit: u32,
}

impl DashboardFetcher {
    pub fn new(client: ApiClient, session_limit: u32) -> Self {
        Self {
            client,
            session_limit,
        }
    }
}

#[async_trait]
impl FeedFetcher for DashboardFetcher {
    async fn fetch(&self) -> Result<FeedData, ApiError> {
        Ok(FeedData::Dashboard(
            fetch_snapshot(&self.client, self.session_limit).await,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_all_but_scheduler(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_tweets": 42,
                "avg_quality_score": 0.71,
                "avg_engagement_score": 0.4,
                "sentiment_distribution": {"positive": 30, "negative": 2, "neutral": 10},
                "top_categories": [{"category": "tech", "count": 20}]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scraper/sessions"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "s1", "tweets_processed": 5, "status": "completed"},
                {"id": "s2", "tweets_processed": 0, "status": "failed"},
                {"id": "s3", "tweets_processed": 1, "status": "running"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "schedule_interval": 1800, "max_retries": 4, "batch_size": 25
            })))
            .mount(server)
            .await;
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&BackendConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_scheduler_failure_does_not_hide_other_sections() {
        let server = MockServer::start().await;
        mount_all_but_scheduler(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/scheduler/status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let snapshot = fetch_snapshot(&client_for(&server), 2).await;

        assert_eq!(snapshot.analytics.as_ref().unwrap().total_tweets, 42);
        assert_eq!(snapshot.sessions.len(), 2);
        assert_eq!(snapshot.settings.as_ref().unwrap().schedule_interval, 1800);
        assert!(snapshot.scheduler.is_none());
        assert!(!snapshot.scheduler_running());
        assert_eq!(snapshot.unavailable, vec!["scheduler"]);
    }

    #[tokio::test]
    async fn test_all_sections_loaded() {
        let server = MockServer::start().await;
        mount_all_but_scheduler(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/scheduler/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"running": true})),
            )
            .mount(&server)
            .await;

        let snapshot = fetch_snapshot(&client_for(&server), 2).await;
        assert!(snapshot.unavailable.is_empty());
        assert!(snapshot.scheduler_running());
    }

    #[test]
    fn test_toggle_action() {
        let mut snapshot = DashboardSnapshot::default();
        assert_eq!(snapshot.toggle_action(), Action::StartScheduler);

        snapshot.scheduler = Some(SchedulerStatus {
            running: false,
            ..SchedulerStatus::default()
        });
        assert_eq!(snapshot.toggle_action(), Action::StartScheduler);

        snapshot.scheduler = Some(SchedulerStatus {
            running: true,
            ..SchedulerStatus::default()
        });
        assert_eq!(snapshot.toggle_action(), Action::StopScheduler);
    }
}
