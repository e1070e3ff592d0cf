use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

use super::{GatewayError, SnippetGateway};
use crate::config::GatewayConfig;
use crate::models::SnippetRecord;

/// REST adapter for the snippet store.
///
/// `GET {base}/snippets/by-link/{link}` returns the record (404 when absent),
/// `POST {base}/snippets/{id}/views` and `POST {base}/snippets/{id}/likes`
/// bump the counters.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| anyhow::anyhow!("invalid gateway url '{}': {}", config.base_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("gateway url '{}' cannot be a base", config.base_url);
        }
        // Url::join treats the last segment as a file unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("snipshare/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| GatewayError::Transport("gateway url cannot be a base".into()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn bump(&self, snippet_id: &str, counter: &str) -> Result<(), GatewayError> {
        let url = self.endpoint(&["snippets", snippet_id, counter])?;
        debug!(%url, "incrementing counter");

        let response = self.authorize(self.client.post(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(snippet_id, counter, %status, "counter increment rejected");
            return Err(GatewayError::Transport(format!(
                "{} increment returned {}",
                counter, status
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SnippetGateway for HttpGateway {
    async fn fetch_by_link(&self, link: &str) -> Result<Option<SnippetRecord>, GatewayError> {
        let url = self.endpoint(&["snippets", "by-link", link])?;
        debug!(%url, "fetching snippet");

        let response = self.authorize(self.client.get(url)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| GatewayError::Decode(e.to_string()))?;
                if body.is_null() {
                    return Ok(None);
                }
                Ok(Some(SnippetRecord(body)))
            }
            status => Err(GatewayError::Transport(format!(
                "lookup returned {}",
                status
            ))),
        }
    }

    async fn increment_views(&self, snippet_id: &str) -> Result<(), GatewayError> {
        self.bump(snippet_id, "views").await
    }

    async fn increment_likes(&self, snippet_id: &str) -> Result<(), GatewayError> {
        self.bump(snippet_id, "likes").await
    }
}
