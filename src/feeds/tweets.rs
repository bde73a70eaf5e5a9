use super::{FeedData, FeedFetcher};
use crate::api::{ApiClient, ApiError, TweetFilters};
use async_trait::async_trait;
use tracing::debug;

/// Fetches one page of `GET /tweets` for the browser.
pub struct TweetPageFetcher {
    client: ApiClient,
    filters: TweetFilters,
    append: bool,
}

impl TweetPageFetcher {
    pub fn new(client: ApiClient, filters: TweetFilters, append: bool) -> Self {
        Self {
            client,
            filters,
            append,
        }
    }
}

#[async_trait]
impl FeedFetcher for TweetPageFetcher {
    async fn fetch(&self) -> Result<FeedData, ApiError> {
        let tweets = self.client.list_tweets(&self.filters).await?;
        debug!(
            count = tweets.len(),
            offset = self.filters.offset,
            append = self.append,
            "tweet page fetched"
        );
        Ok(FeedData::TweetPage {
            tweets,
            append: self.append,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_page_keeps_append_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tweets"))
            .and(query_param("offset", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "t21", "tweet_data": {"author": "carol"}},
                {"id": "t22", "tweet_data": {"author": "dave"}}
            ])))
            .mount(&server)
            .await;

        let client = ApiClient::new(&BackendConfig {
            base_url: server.uri(),
            timeout_secs: 5,
        })
        .unwrap();
        let filters = TweetFilters {
            offset: 20,
            ..TweetFilters::default()
        };
        let data = TweetPageFetcher::new(client, filters, true)
            .fetch()
            .await
            .unwrap();

        match data {
            FeedData::TweetPage { tweets, append } => {
                assert!(append);
                assert_eq!(tweets.len(), 2);
                assert_eq!(tweets[1].tweet_data.author, "dave");
            }
            other => panic!("unexpected data: {:?}", other),
        }
    }
}
