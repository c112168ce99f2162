use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{ProviderId, TyphoonProvider, http::get_text, parser_for};
use crate::{error::FetchError, model::Typhoon, parser::SourceParser};

/// A single-document source: one GET, one parse.
#[derive(Debug)]
pub struct FeedProvider {
    id: ProviderId,
    url: String,
    parser: Box<dyn SourceParser>,
    http: Client,
    timeout: Duration,
}

impl FeedProvider {
    pub fn new(id: ProviderId, url: String, http: Client, timeout: Duration) -> Self {
        Self {
            id,
            url,
            parser: parser_for(id),
            http,
            timeout,
        }
    }
}

#[async_trait]
impl TyphoonProvider for FeedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn try_fetch(&self) -> Result<Vec<Typhoon>, FetchError> {
        let body = get_text(&self.http, &self.url, self.timeout).await?;
        Ok(self.parser.parse(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_feed_yields_empty_list() {
        let provider = FeedProvider::new(
            ProviderId::NhcAtlantic,
            "http://127.0.0.1:9/index-at.xml".to_string(),
            Client::new(),
            Duration::from_millis(500),
        );

        assert!(provider.try_fetch().await.is_err());
        assert!(provider.fetch().await.is_empty());
    }
}
