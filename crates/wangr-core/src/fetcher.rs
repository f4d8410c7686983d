//! Source fetchers
//!
//! [`Fetcher`] is the seam between the refresh machinery and the network.
//! [`HttpFetcher`] is the production implementation; tests substitute scripted
//! fetchers with controllable latency and failures.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::DashboardConfig;
use crate::document::Document;
use crate::errors::FetchError;
use crate::sources::{Method, Source};

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches and parses one source, giving up after `timeout`.
    async fn fetch(&self, source: Source, timeout: Duration) -> Result<Document, FetchError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    config: Arc<DashboardConfig>,
}

impl HttpFetcher {
    pub fn new(config: Arc<DashboardConfig>) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Uses a preconfigured client, e.g. one carrying default headers.
    pub fn with_client(client: reqwest::Client, config: Arc<DashboardConfig>) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: Source, timeout: Duration) -> Result<Document, FetchError> {
        let spec = source.request(&self.config);

        let mut request = match spec.method {
            Method::Get => self.client.get(&spec.url),
            Method::Post => self.client.post(&spec.url),
        };
        if !spec.query.is_empty() {
            request = request.query(&spec.query);
        }
        if let Some(body) = &spec.body {
            request = request.json(body);
        }

        let response = request.timeout(timeout).send().await.map_err(|e| {
            log::error!("Request for {} to {} failed: {}", source, spec.url, e);
            FetchError::from(e)
        })?;

        let status = response.status().as_u16();
        if status >= 400 {
            log::error!("{} returned HTTP {}", source, status);
            return Err(FetchError::SourceUnreachable(format!(
                "{} returned HTTP {}",
                source, status
            )));
        }

        let raw: Value = response.json().await?;
        let document = source.parse(raw, &self.config)?;
        log::debug!("Fetched {}", source);
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use crate::sources::{Coin, Market};
    use mockito::Matcher;
    use serde_json::json;

    fn config_for(server: &mockito::Server) -> Arc<DashboardConfig> {
        Arc::new(DashboardConfig {
            endpoints: Endpoints::all_at(&server.url()),
            ..Default::default()
        })
    }

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_fetch_whales_extracts_active_list() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/whales/btc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"active_whales": [{"wallet": "0xabc", "side": "LONG"}], "total": 1}"#)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(config_for(&server));
        let doc = fetcher.fetch(Source::Whales(Coin::Btc), TIMEOUT).await.unwrap();

        mock.assert_async().await;
        assert_eq!(doc.rows().len(), 1);
        assert_eq!(doc.rows()[0]["wallet"], "0xabc");
    }

    #[tokio::test]
    async fn test_fetch_uses_supplied_client() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/frontpage/")
            .match_header("user-agent", "wangr-test")
            .with_status(200)
            .with_body(r#"{"ticker": []}"#)
            .create_async()
            .await;

        let client = reqwest::Client::builder().user_agent("wangr-test").build().unwrap();
        let fetcher = HttpFetcher::with_client(client, config_for(&server));
        let doc = fetcher.fetch(Source::Frontpage, TIMEOUT).await.unwrap();

        mock.assert_async().await;
        assert_eq!(doc.get("ticker"), Some(&serde_json::json!([])));
    }

    #[tokio::test]
    async fn test_fetch_woi_sends_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/woi/tracked-users")
            .match_query(Matcher::UrlEncoded("limit".into(), "400".into()))
            .with_status(200)
            .with_body(r#"{"users": [{"wallet": "0x1"}, {"wallet": "0x2"}]}"#)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(config_for(&server));
        let doc = fetcher.fetch(Source::WoiUsers, TIMEOUT).await.unwrap();

        mock.assert_async().await;
        assert_eq!(doc.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_mark_prices_posts_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/info")
            .match_body(Matcher::Json(json!({"type": "metaAndAssetCtxs"})))
            .with_status(200)
            .with_body(
                json!([
                    {"universe": [{"name": "BTC"}, {"name": "DOGE"}]},
                    [{"markPx": "64000.5"}, {"markPx": "0.1"}]
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(config_for(&server));
        let doc = fetcher.fetch(Source::MarkPrices, TIMEOUT).await.unwrap();

        mock.assert_async().await;
        assert_eq!(doc.get("BTC"), Some(&json!(64000.5)));
        assert!(doc.get("DOGE").is_none());
    }

    #[tokio::test]
    async fn test_http_error_is_unreachable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/arb/futures/health")
            .with_status(503)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(config_for(&server));
        let err = fetcher
            .fetch(Source::ArbitrageHealth(Market::Futures), TIMEOUT)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::SourceUnreachable(msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_invalid_json_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/frontpage/")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(config_for(&server));
        let err = fetcher.fetch(Source::Frontpage, TIMEOUT).await.unwrap_err();

        assert!(matches!(err, FetchError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/whales/eth")
            .with_status(200)
            .with_body(r#"{"active_whales": "none"}"#)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new(config_for(&server));
        let err = fetcher.fetch(Source::Whales(Coin::Eth), TIMEOUT).await.unwrap_err();

        assert!(matches!(err, FetchError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_unreachable() {
        let config = Arc::new(DashboardConfig {
            endpoints: Endpoints::all_at("http://127.0.0.1:1"),
            ..Default::default()
        });
        let fetcher = HttpFetcher::new(config);
        let err = fetcher.fetch(Source::Frontpage, TIMEOUT).await.unwrap_err();

        assert!(matches!(err, FetchError::SourceUnreachable(_)));
    }
}
