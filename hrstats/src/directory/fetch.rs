//! Directory lookups over HTTP.

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::models::{DirectoryEnvelope, EntityRecord};
use super::DirectoryClient;
use crate::config::DirectoryConfig;
use crate::types::{EntityId, EntityKind, Outcome};

/// The concrete implementation of `DirectoryClient`, using `reqwest`.
#[derive(Debug, Clone)]
pub struct DirectoryReqwest {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl DirectoryReqwest {
    pub fn new(config: &DirectoryConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create directory HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn entity_url(&self, kind: EntityKind, id: &EntityId) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Directory base URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push(kind.plural())
            .push(id.as_str());
        Ok(url)
    }

    fn list_url(&self, kind: EntityKind, fields: &[&str]) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Directory base URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push(kind.plural())
            .push("");
        if !fields.is_empty() {
            url.query_pairs_mut().append_pair("fields", &fields.join(","));
        }
        Ok(url)
    }

    /// Fetch and decode an envelope. `Ok(None)` when the directory answers 404.
    async fn get_envelope(&self, url: Url) -> anyhow::Result<Option<Vec<EntityRecord>>> {
        debug!("Fetching directory records from URL: {}", url);

        let response = self.client.get(url.clone()).timeout(self.request_timeout).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("Directory returned 404 for {}", url);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Failed to make request to directory API");
            tracing::error!("Url was: {}", url);
            return Err(anyhow!("Directory API error: {} - {}", status, body));
        }

        let body_text = response.text().await?;
        tracing::trace!("Directory response body: {}", body_text);

        match serde_json::from_str::<DirectoryEnvelope<EntityRecord>>(&body_text) {
            Ok(envelope) => Ok(Some(envelope.data)),
            Err(e) => {
                tracing::error!("Failed to parse directory response as JSON. Error: {}", e);
                tracing::debug!("Response body was: {}", body_text);
                Err(anyhow!("error decoding directory response body: {}", e))
            }
        }
    }
}

#[async_trait]
impl DirectoryClient for DirectoryReqwest {
    #[instrument(skip_all, fields(kind = %kind, id = %id))]
    async fn fetch_entity(&self, kind: EntityKind, id: &EntityId) -> Outcome<EntityRecord> {
        let url = match self.entity_url(kind, id) {
            Ok(url) => url,
            Err(e) => return Outcome::Failed(e),
        };
        self.get_envelope(url)
            .await
            .map(|records| records.and_then(|records| records.into_iter().next()))
            .into()
    }

    #[instrument(skip_all, fields(kind = %kind))]
    async fn fetch_entity_list(&self, kind: EntityKind, fields: &[&str]) -> Outcome<Vec<EntityRecord>> {
        let url = match self.list_url(kind, fields) {
            Ok(url) => url,
            Err(e) => return Outcome::Failed(e),
        };
        let outcome: Outcome<Vec<EntityRecord>> = self.get_envelope(url).await.into();
        if let Outcome::Found(records) = &outcome {
            debug!("Directory listed {} {}", records.len(), kind.plural());
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DirectoryReqwest {
        let config = DirectoryConfig {
            base_url: format!("{}/api/v1.0/", server.uri()).parse().unwrap(),
            request_timeout: Duration::from_secs(2),
        };
        DirectoryReqwest::new(&config).unwrap()
    }

    #[test]
    fn test_urls_keep_base_path() {
        let config = DirectoryConfig {
            base_url: "https://directory.example.org/api/v1.0/".parse().unwrap(),
            request_timeout: Duration::from_secs(1),
        };
        let client = DirectoryReqwest::new(&config).unwrap();

        let url = client.entity_url(EntityKind::Space, &EntityId::new("7")).unwrap();
        assert_eq!(url.as_str(), "https://directory.example.org/api/v1.0/spaces/7");

        let url = client.list_url(EntityKind::Operation, &["id", "label"]).unwrap();
        assert_eq!(url.as_str(), "https://directory.example.org/api/v1.0/operations/?fields=id%2Clabel");
    }

    #[test]
    fn test_urls_without_trailing_slash_on_base() {
        let config = DirectoryConfig {
            base_url: "https://directory.example.org/api/v1.0".parse().unwrap(),
            request_timeout: Duration::from_secs(1),
        };
        let client = DirectoryReqwest::new(&config).unwrap();
        let url = client.entity_url(EntityKind::Bundle, &EntityId::new("3")).unwrap();
        assert_eq!(url.as_str(), "https://directory.example.org/api/v1.0/bundles/3");
    }

    #[tokio::test]
    async fn test_fetch_entity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/operations/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "id": "42",
                    "label": "Nepal Earthquake",
                    "country": {"pcode": "NP", "label": "Nepal"}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = client_for(&server)
            .fetch_entity(EntityKind::Operation, &EntityId::new("42"))
            .await
            .found()
            .expect("record should be found");

        assert_eq!(record.label.as_deref(), Some("Nepal Earthquake"));
        assert_eq!(record.country_code(), Some("NP"));
    }

    #[tokio::test]
    async fn test_fetch_entity_not_found_is_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/operations/99"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
            .mount(&server)
            .await;

        let outcome = client_for(&server).fetch_entity(EntityKind::Operation, &EntityId::new("99")).await;
        assert!(matches!(outcome, Outcome::Missing));
    }

    #[tokio::test]
    async fn test_fetch_entity_empty_data_is_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/spaces/5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })))
            .mount(&server)
            .await;

        let outcome = client_for(&server).fetch_entity(EntityKind::Space, &EntityId::new("5")).await;
        assert!(matches!(outcome, Outcome::Missing));
    }

    #[tokio::test]
    async fn test_fetch_entity_server_error_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let outcome = client_for(&server).fetch_entity(EntityKind::Operation, &EntityId::new("1")).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_fetch_entity_non_json_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let outcome = client_for(&server).fetch_entity(EntityKind::Operation, &EntityId::new("1")).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_fetch_entity_timeout_is_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": [] }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let config = DirectoryConfig {
            base_url: server.uri().parse().unwrap(),
            request_timeout: Duration::from_millis(100),
        };
        let client = DirectoryReqwest::new(&config).unwrap();

        let outcome = client.fetch_entity(EntityKind::Operation, &EntityId::new("1")).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_fetch_entity_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1.0/operations/"))
            .and(query_param("fields", "id,label"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "42", "label": "Nepal Earthquake"},
                    {"id": 7, "label": "Haiti"},
                    {"id": "3", "label": "Mali"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = client_for(&server)
            .fetch_entity_list(EntityKind::Operation, &["id", "label"])
            .await
            .found()
            .unwrap();

        let ids: Vec<_> = records.iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(ids, vec![EntityId::new("42"), EntityId::new("7"), EntityId::new("3")]);
        assert_eq!(records[1].label.as_deref(), Some("Haiti"));
    }

    #[tokio::test]
    async fn test_fetch_entity_list_unreachable_is_failed() {
        let config = DirectoryConfig {
            // Nothing listens on the discard port
            base_url: "http://127.0.0.1:9/api/".parse().unwrap(),
            request_timeout: Duration::from_secs(1),
        };
        let client = DirectoryReqwest::new(&config).unwrap();

        let outcome = client.fetch_entity_list(EntityKind::Space, &["id", "label"]).await;
        assert!(matches!(outcome, Outcome::Failed(_)));
    }
}
