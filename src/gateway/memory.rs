use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use super::{GatewayError, SnippetGateway};
use crate::models::{SharedSnippet, SnippetLanguage, SnippetRecord};

/// Counts of calls made against an [`InMemoryGateway`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayCalls {
    pub fetches: usize,
    pub view_increments: usize,
    pub like_increments: usize,
}

#[derive(Debug, Default)]
struct Inner {
    // Keyed by shareable link.
    records: HashMap<String, serde_json::Value>,
    latency: HashMap<String, Duration>,
    calls: GatewayCalls,
    fail_fetch: bool,
    fail_views: bool,
    fail_likes: bool,
}

/// In-process snippet store.
///
/// Holds records keyed by link, applies counter increments to the stored JSON
/// and can be told to fail or stall individual operations.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    inner: Mutex<Inner>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snippet under its own `shareable_link`.
    pub fn insert(&self, snippet: &SharedSnippet) {
        let record = SnippetRecord::from(snippet);
        self.insert_record(&snippet.shareable_link, record);
    }

    /// Store an arbitrary record, valid or not, under `link`.
    pub fn insert_record(&self, link: &str, record: SnippetRecord) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.records.insert(link.to_string(), record.0);
        }
    }

    /// Publish a fresh public snippet and return it.
    pub fn publish(
        &self,
        link: &str,
        title: &str,
        code: &str,
        language: SnippetLanguage,
    ) -> SharedSnippet {
        let now = Utc::now();
        let snippet = SharedSnippet {
            id: Uuid::new_v4().to_string(),
            shareable_link: link.to_string(),
            title: title.to_string(),
            description: None,
            code: code.to_string(),
            language,
            is_public: true,
            created_at: now,
            updated_at: now,
            views: 0,
            likes: 0,
            creator_username: None,
            creator_name: None,
            creator_photo_url: None,
            user_id: None,
        };
        self.insert(&snippet);
        snippet
    }

    /// Delay every lookup of `link` by `delay`.
    pub fn set_latency(&self, link: &str, delay: Duration) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.latency.insert(link.to_string(), delay);
        }
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_fetch = fail;
        }
    }

    pub fn set_fail_views(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_views = fail;
        }
    }

    pub fn set_fail_likes(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_likes = fail;
        }
    }

    pub fn calls(&self) -> GatewayCalls {
        self.inner.lock().map(|inner| inner.calls).unwrap_or_default()
    }

    /// Stored `(views, likes)` for the snippet published under `link`.
    pub fn counters(&self, link: &str) -> Option<(u64, u64)> {
        let inner = self.inner.lock().ok()?;
        let record = inner.records.get(link)?;
        let read = |field: &str| record.get(field).and_then(|v| v.as_u64()).unwrap_or(0);
        Some((read("views"), read("likes")))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, GatewayError> {
        self.inner
            .lock()
            .map_err(|e| GatewayError::Transport(format!("store lock poisoned: {}", e)))
    }

    fn bump(&self, snippet_id: &str, field: &str) -> Result<(), GatewayError> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .values_mut()
            .find(|record| record.get("id").and_then(|id| id.as_str()) == Some(snippet_id))
            .ok_or_else(|| GatewayError::Transport(format!("no snippet with id {}", snippet_id)))?;

        let current = record.get(field).and_then(|v| v.as_u64()).unwrap_or(0);
        record[field] = serde_json::Value::from(current + 1);
        Ok(())
    }
}

#[async_trait]
impl SnippetGateway for InMemoryGateway {
    async fn fetch_by_link(&self, link: &str) -> Result<Option<SnippetRecord>, GatewayError> {
        let delay = {
            let mut inner = self.lock()?;
            inner.calls.fetches += 1;
            if inner.fail_fetch {
                return Err(GatewayError::Transport("connection refused".to_string()));
            }
            inner.latency.get(link).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock()?;
        Ok(inner.records.get(link).cloned().map(SnippetRecord))
    }

    async fn increment_views(&self, snippet_id: &str) -> Result<(), GatewayError> {
        {
            let mut inner = self.lock()?;
            inner.calls.view_increments += 1;
            if inner.fail_views {
                return Err(GatewayError::Transport("deadline exceeded".to_string()));
            }
        }
        self.bump(snippet_id, "views")
    }

    async fn increment_likes(&self, snippet_id: &str) -> Result<(), GatewayError> {
        {
            let mut inner = self.lock()?;
            inner.calls.like_increments += 1;
            if inner.fail_likes {
                return Err(GatewayError::Transport("deadline exceeded".to_string()));
            }
        }
        self.bump(snippet_id, "likes")
    }
}
