use crate::config::FeedSettings;
use crate::domain::model::{DateRange, RawFeedPayload};
use crate::domain::ports::FeedSource;
use crate::utils::error::{EtlError, Result};
use reqwest::Client;

/// Client for the NeoWs `feed` endpoint.
#[derive(Debug, Clone)]
pub struct NeoFeedClient {
    client: Client,
    url: Option<String>,
    api_key: Option<String>,
}

impl NeoFeedClient {
    pub fn new(settings: &FeedSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "feed.url".to_string(),
            })?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EtlError::MissingConfigError {
                field: "feed.api_key".to_string(),
            })?;
        Ok((url, api_key))
    }
}

impl FeedSource for NeoFeedClient {
    async fn fetch(&self, range: DateRange) -> Result<RawFeedPayload> {
        let (url, api_key) = self.credentials()?;

        tracing::info!("🌍 Requesting NEO feed for {}", range);
        tracing::debug!("Feed endpoint: {}", url);

        // The query string carries the API key, so errors drop the URL before surfacing.
        let response = self
            .client
            .get(url)
            .query(&[
                ("start_date", range.start_param().as_str()),
                ("end_date", range.end_param().as_str()),
                ("api_key", api_key),
            ])
            .send()
            .await
            .map_err(|e| e.without_url())?;

        tracing::debug!("Feed response status: {}", response.status());

        let body: serde_json::Value = response
            .error_for_status()
            .map_err(|e| e.without_url())?
            .json()
            .await
            .map_err(|e| e.without_url())?;

        let payload = RawFeedPayload::new(body);
        match payload.element_count() {
            Some(count) => tracing::info!("✅ Extraction successful, feed reports {} objects", count),
            None => tracing::info!("✅ Extraction successful"),
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use std::time::Duration;

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        )
    }

    fn settings(url: Option<String>, api_key: Option<&str>) -> FeedSettings {
        FeedSettings {
            url,
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_range_and_key() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/neo/rest/v1/feed")
                .query_param("start_date", "2024-01-01")
                .query_param("end_date", "2024-01-02")
                .query_param("api_key", "DEMO_KEY");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"element_count": 0, "near_earth_objects": {}}));
        });

        let client = NeoFeedClient::new(&settings(
            Some(server.url("/neo/rest/v1/feed")),
            Some("DEMO_KEY"),
        ))
        .unwrap();

        let payload = client.fetch(range()).await.unwrap();

        api_mock.assert();
        assert_eq!(payload.element_count(), Some(0));
    }

    #[tokio::test]
    async fn test_fetch_without_key_makes_no_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(serde_json::json!({}));
        });

        let client = NeoFeedClient::new(&settings(Some(server.url("/feed")), None)).unwrap();
        let err = client.fetch(range()).await.unwrap_err();

        assert!(matches!(err, EtlError::MissingConfigError { ref field } if field == "feed.api_key"));
        api_mock.assert_hits(0);

        let client = NeoFeedClient::new(&settings(None, Some("DEMO_KEY"))).unwrap();
        let err = client.fetch(range()).await.unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { ref field } if field == "feed.url"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_status_is_request_error() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/feed");
            then.status(400)
                .json_body(serde_json::json!({"error_message": "Date Format Exception"}));
        });

        let client = NeoFeedClient::new(&settings(Some(server.url("/feed")), Some("SECRET_KEY"))).unwrap();
        let err = client.fetch(range()).await.unwrap_err();

        api_mock.assert();
        match err {
            EtlError::RequestError(e) => {
                assert_eq!(e.status().map(|s| s.as_u16()), Some(400));
                assert!(!e.to_string().contains("SECRET_KEY"));
            }
            other => panic!("expected RequestError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_invalid_json_is_request_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/feed");
            then.status(200).body("<html>maintenance</html>");
        });

        let client = NeoFeedClient::new(&settings(Some(server.url("/feed")), Some("DEMO_KEY"))).unwrap();
        assert!(matches!(
            client.fetch(range()).await,
            Err(EtlError::RequestError(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_request_error() {
        // Nothing listens on port 1.
        let client = NeoFeedClient::new(&settings(
            Some("http://127.0.0.1:1/feed".to_string()),
            Some("SECRET_KEY"),
        ))
        .unwrap();

        match client.fetch(range()).await {
            Err(EtlError::RequestError(e)) => {
                assert!(e.status().is_none());
                assert!(e.url().is_none());
                assert!(!e.to_string().contains("SECRET_KEY"));
            }
            other => panic!("expected RequestError, got {:?}", other),
        }
    }
}
