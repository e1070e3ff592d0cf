//! snipshare - shared snippet viewer
//!
//! Opens code snippets published behind shareable links, enforces their
//! visibility, and records views and likes exactly once per client without an
//! account. The snippet store sits behind [`gateway::SnippetGateway`]; the
//! per-client like history sits behind [`models::LedgerStorage`].

pub mod app;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod logging;
pub mod models;

pub use app::{SharedSnippetApp, SnippetView, ViewStatus};
pub use error::{Result, ShareError};
