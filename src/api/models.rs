use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A tweet as stored by the backend, with its AI annotations if the
/// analysis pipeline has reached it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedTweet {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub tweet_data: TweetData,
    /// `None` means "not yet analysed", not an error.
    #[serde(default)]
    pub ai_analysis: Option<AiAnalysis>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TweetData {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub media_features: MediaFeatures,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaFeatures {
    #[serde(default)]
    pub has_media: bool,
    #[serde(default)]
    pub is_thread: bool,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub youtube_video: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment: Sentiment,
    #[serde(default = "neutral_score")]
    pub quality_score: f64,
    #[serde(default = "neutral_score")]
    pub engagement_prediction: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub key_insights: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub intent: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entities: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub information_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_audience: String,
    #[serde(default)]
    pub actionable: bool,
    #[serde(default)]
    pub discussion_worthy: bool,
}

fn neutral_score() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(default)]
    pub label: String,
    #[serde(default = "neutral_score")]
    pub confidence: f64,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self {
            label: "neutral".to_string(),
            confidence: 0.5,
        }
    }
}

impl Sentiment {
    pub fn kind(&self) -> SentimentLabel {
        SentimentLabel::from_label(&self.label)
    }
}

/// Sentiment categories the pipeline emits. Unknown labels collapse into
/// `Neutral`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapingSession {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub tweets_processed: u64,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_used: String,
}

impl ScrapingSession {
    pub fn status_kind(&self) -> SessionStatus {
        SessionStatus::from_status(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Completed,
    Failed,
    /// Running, or any status the backend has not told us about yet.
    Running,
}

impl SessionStatus {
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Running,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analytics {
    #[serde(default)]
    pub total_tweets: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_quality_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_engagement_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sentiment_distribution: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_categories: Vec<CategoryCount>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub top_authors: Vec<AuthorStat>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub media_stats: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily_stats: Vec<DailyStat>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryCount {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorStat {
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub avg_quality: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyStat {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub avg_quality: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub jobs: u32,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub next_run: Option<DateTime<Utc>>,
}

/// Scraper configuration exposed by `GET/POST /config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperSettings {
    pub enabled: bool,
    /// Seconds between scheduled runs.
    pub schedule_interval: u64,
    pub max_retries: u32,
    pub retry_delay: u64,
    pub batch_size: u32,
    pub use_fallback: bool,
    pub process_images: bool,
    pub process_videos: bool,
    pub process_threads: bool,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            schedule_interval: 3600,
            max_retries: 3,
            retry_delay: 30,
            batch_size: 50,
            use_fallback: true,
            process_images: true,
            process_videos: true,
            process_threads: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionMessage {
    #[serde(default)]
    pub message: String,
}

/// Filters for listing and searching tweets.
///
/// Serialised as the JSON body of `POST /tweets/search`, and flattened into
/// query pairs for `GET /tweets`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TweetFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_media: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_thread: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_quality_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_engagement_score: Option<f64>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for TweetFilters {
    fn default() -> Self {
        Self {
            query: None,
            author: None,
            category: None,
            sentiment: None,
            has_media: None,
            is_thread: None,
            min_quality_score: None,
            min_engagement_score: None,
            limit: 20,
            offset: 0,
        }
    }
}

impl TweetFilters {
    pub fn with_page_size(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    /// Query pairs in a stable order. Unset filters and empty strings are
    /// left out so the backend never sees `author=`; every other value is
    /// sent as given.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        fn text(key: &'static str, value: &Option<String>) -> Option<(&'static str, String)> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (key, v.to_string()))
        }

        [
            text("query", &self.query),
            text("author", &self.author),
            text("category", &self.category),
            text("sentiment", &self.sentiment),
            self.has_media.map(|v| ("has_media", v.to_string())),
            self.is_thread.map(|v| ("is_thread", v.to_string())),
            self.min_quality_score
                .map(|v| ("min_quality_score", v.to_string())),
            self.min_engagement_score
                .map(|v| ("min_engagement_score", v.to_string())),
            Some(("limit", self.limit.to_string())),
            Some(("offset", self.offset.to_string())),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn to_query_string(&self) -> String {
        self.to_query_pairs()
            .into_iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(&value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Backend ids are strings, but older records and hand-written fixtures
/// use numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Id>::deserialize(deserializer)? {
        Some(Id::Text(s)) => s,
        Some(Id::Int(n)) => n.to_string(),
        Some(Id::Float(n)) => n.to_string(),
        None => String::new(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts RFC 3339 and the naive ISO timestamps the backend emits.
/// Anything unreadable becomes `None` instead of failing the whole record.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(parse_timestamp))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
