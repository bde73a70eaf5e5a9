//! HTTP facade for the bookmark-scraper backend.
//!
//! [`ApiClient`] exposes one method per backend operation. It attaches
//! default headers and a fixed timeout, reports every request to its
//! [`RequestLogger`], and never retries: a failed call comes back to the
//! caller as an [`ApiError`].

mod error;
mod logger;
pub mod models;

pub use error::ApiError;
pub use logger::{RequestLogger, TracingLogger};
pub use models::{
    ActionMessage, Analytics, HealthStatus, ProcessedTweet, ScraperSettings, SchedulerStatus,
    ScrapingSession, TweetFilters,
};

use crate::config::BackendConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Path suffix the backend mounts its router under.
const API_PREFIX: &str = "/api";

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    logger: Arc<dyn RequestLogger>,
}

impl ApiClient {
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let root = config.base_url.trim().trim_end_matches('/');
        if !(root.starts_with("http://") || root.starts_with("https://")) {
            return Err(ApiError::InvalidConfig(format!(
                "backend URL must start with http:// or https://, got {:?}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("tweetdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("{}{}", root, API_PREFIX),
            logger: Arc::new(TracingLogger),
        })
    }

    /// Replaces the request logger for this client only.
    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get("/").await
    }

    /// Triggers one scraping session and waits for the backend to finish it.
    pub async fn run_scraper(&self) -> Result<ScrapingSession, ApiError> {
        self.execute(Method::POST, "/scraper/run", None).await
    }

    pub async fn list_sessions(&self, limit: u32) -> Result<Vec<ScrapingSession>, ApiError> {
        self.get(&format!("/scraper/sessions?limit={}", limit)).await
    }

    pub async fn get_session(&self, id: &str) -> Result<ScrapingSession, ApiError> {
        self.get(&format!("/scraper/session/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn list_tweets(
        &self,
        filters: &TweetFilters,
    ) -> Result<Vec<ProcessedTweet>, ApiError> {
        self.get(&format!("/tweets?{}", filters.to_query_string()))
            .await
    }

    pub async fn search_tweets(
        &self,
        filters: &TweetFilters,
    ) -> Result<Vec<ProcessedTweet>, ApiError> {
        self.post("/tweets/search", filters).await
    }

    pub async fn get_tweet(&self, id: &str) -> Result<ProcessedTweet, ApiError> {
        self.get(&format!("/tweets/{}", urlencoding::encode(id)))
            .await
    }

    pub async fn analytics(&self) -> Result<Analytics, ApiError> {
        self.get("/analytics").await
    }

    pub async fn get_settings(&self) -> Result<ScraperSettings, ApiError> {
        self.get("/config").await
    }

    pub async fn update_settings(
        &self,
        settings: &ScraperSettings,
    ) -> Result<ScraperSettings, ApiError> {
        self.post("/config", settings).await
    }

    pub async fn start_scheduler(&self) -> Result<ActionMessage, ApiError> {
        self.execute(Method::POST, "/scheduler/start", None).await
    }

    pub async fn stop_scheduler(&self) -> Result<ActionMessage, ApiError> {
        self.execute(Method::POST, "/scheduler/stop", None).await
    }

    pub async fn scheduler_status(&self) -> Result<SchedulerStatus, ApiError> {
        self.get("/scheduler/status").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(Method::GET, path, None).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        match serde_json::to_value(body) {
            Ok(body) => self.execute(Method::POST, path, Some(body)).await,
            Err(e) => {
                let err = ApiError::from(e);
                self.logger
                    .on_error(&Method::POST, &self.url(path), &err);
                Err(err)
            }
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        self.logger.on_request(&method, &url);

        let result = self.send(&method, &url, body).await;
        if let Err(err) = &result {
            self.logger.on_error(&method, &url, err);
        }
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let started = Instant::now();
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        self.logger
            .on_response(method, url, status, started.elapsed());

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        response.json::<T>().await.map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::logger::testing::RecordingLogger;
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param, query_param_is_missing};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ApiClient {
        ApiClient::new(&BackendConfig {
            base_url: format!("{}/", server.uri()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_gets_api_suffix() {
        let client = ApiClient::new(&BackendConfig {
            base_url: "http://localhost:8001/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8001/api");
    }

    #[test]
    fn test_rejects_url_without_scheme() {
        let err = ApiClient::new(&BackendConfig {
            base_url: "localhost:8001".to_string(),
            timeout_secs: 5,
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"message": "Twitter Scraper API is running"}),
            ))
            .mount(&server)
            .await;

        let health = test_client(&server).health().await.unwrap();
        assert_eq!(health.message, "Twitter Scraper API is running");
    }

    #[tokio::test]
    async fn test_list_tweets_sends_only_set_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tweets"))
            .and(query_param("author", "alice"))
            .and(query_param("has_media", "true"))
            .and(query_param("limit", "20"))
            .and(query_param("offset", "40"))
            .and(query_param_is_missing("query"))
            .and(query_param_is_missing("sentiment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "t1", "tweet_data": {"author": "alice", "text": "hi"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let filters = TweetFilters {
            query: Some(String::new()),
            author: Some("alice".to_string()),
            has_media: Some(true),
            offset: 40,
            ..TweetFilters::default()
        };
        let tweets = test_client(&server).list_tweets(&filters).await.unwrap();
        assert_eq!(tweets.len(), 1);
        assert_eq!(tweets[0].tweet_data.author, "alice");
    }

    #[tokio::test]
    async fn test_search_posts_filters_as_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/tweets/search"))
            .and(body_json(serde_json::json!({
                "query": "rust",
                "min_quality_score": 0.8,
                "limit": 5,
                "offset": 0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let filters = TweetFilters {
            query: Some("rust".to_string()),
            min_quality_score: Some(0.8),
            limit: 5,
            ..TweetFilters::default()
        };
        let tweets = test_client(&server).search_tweets(&filters).await.unwrap();
        assert!(tweets.is_empty());
    }

    #[tokio::test]
    async fn test_get_tweet_encodes_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tweets/a%20b"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "a b"})),
            )
            .mount(&server)
            .await;

        let tweet = test_client(&server).get_tweet("a b").await.unwrap();
        assert_eq!(tweet.id, "a b");
    }

    #[tokio::test]
    async fn test_sessions_and_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/scraper/sessions"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "s1", "tweets_processed": 12, "status": "completed",
                 "started_at": "2024-01-01T10:00:00"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scraper/session/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"id": "s1", "status": "failed", "errors": ["timeout"]}),
            ))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let sessions = client.list_sessions(5).await.unwrap();
        assert_eq!(sessions[0].tweets_processed, 12);
        let session = client.get_session("s1").await.unwrap();
        assert_eq!(session.errors, vec!["timeout"]);
    }

    #[tokio::test]
    async fn test_scheduler_actions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/scheduler/start"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "Scheduler started"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/scheduler/stop"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"message": "Scheduler stopped"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scheduler/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"running": true, "jobs": 1, "next_run": null}),
            ))
            .mount(&server)
            .await;

        let client = test_client(&server);
        assert_eq!(
            client.start_scheduler().await.unwrap().message,
            "Scheduler started"
        );
        assert_eq!(
            client.stop_scheduler().await.unwrap().message,
            "Scheduler stopped"
        );
        let status = client.scheduler_status().await.unwrap();
        assert!(status.running);
        assert!(status.next_run.is_none());
    }

    #[tokio::test]
    async fn test_update_settings_posts_body() {
        let server = MockServer::start().await;
        let settings = ScraperSettings {
            schedule_interval: 900,
            ..ScraperSettings::default()
        };
        Mock::given(method("POST"))
            .and(path("/api/config"))
            .and(body_json(serde_json::to_value(&settings).unwrap()))
            .respond_with(ResponseTemplate::new(200).set_body_json(&settings))
            .expect(1)
            .mount(&server)
            .await;

        let updated = test_client(&server)
            .update_settings(&settings)
            .await
            .unwrap();
        assert_eq!(updated.schedule_interval, 900);
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/scraper/run"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(serde_json::json!({"detail": "Scraping failed: boom"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server).run_scraper().await.unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
        assert_eq!(err.user_message(), "Scraping failed: boom (500)");
    }

    #[tokio::test]
    async fn test_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = test_client(&server).analytics().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_transport_error() {
        let client = ApiClient::new(&BackendConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
        })
        .unwrap();
        let err = client.analytics().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_logger_sees_requests_and_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/analytics"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let logger = Arc::new(RecordingLogger::default());
        let client = test_client(&server).with_logger(logger.clone());
        client.get_settings().await.unwrap();
        client.analytics().await.unwrap_err();

        let base = client.base_url().to_string();
        assert_eq!(
            logger.events(),
            vec![
                format!("request GET {}/config", base),
                format!("response GET {}/config 200", base),
                format!("request GET {}/analytics", base),
                format!("response GET {}/analytics 503", base),
                format!("error GET {}/analytics", base),
            ]
        );
    }
}
