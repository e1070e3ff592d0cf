//! Snippet store gateway
//!
//! The remote store owns snippet records; this crate only looks one up by its
//! shareable link and adds to its view and like counters.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::error::ShareError;
use crate::models::SnippetRecord;

pub use http::HttpGateway;
pub use memory::InMemoryGateway;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<GatewayError> for ShareError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Transport(msg) => ShareError::Transport(msg),
            GatewayError::Decode(msg) => ShareError::MalformedRecord(msg),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Remote snippet store. Counter writes are at-least-once.
#[async_trait]
pub trait SnippetGateway: Send + Sync {
    async fn fetch_by_link(&self, link: &str) -> Result<Option<SnippetRecord>, GatewayError>;

    async fn increment_views(&self, snippet_id: &str) -> Result<(), GatewayError>;

    async fn increment_likes(&self, snippet_id: &str) -> Result<(), GatewayError>;
}

pub type SnippetGatewayRef = Arc<dyn SnippetGateway>;
