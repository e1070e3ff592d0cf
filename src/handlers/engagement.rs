use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, ShareError};
use crate::gateway::SnippetGatewayRef;
use crate::handlers::clipboard::ClipboardRef;
use crate::models::{EngagementLedger, SharedSnippet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// Like recorded; carries the new displayed count.
    Liked { likes: u64 },
    /// This client liked the snippet before. Nothing was sent.
    AlreadyLiked,
}

/// Transient "Copied!" acknowledgement.
#[derive(Debug, Clone)]
pub struct CopyFeedback {
    window: Duration,
    copied_at: Option<Instant>,
}

impl CopyFeedback {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            copied_at: None,
        }
    }

    fn mark(&mut self, now: Instant) {
        self.copied_at = Some(now);
    }

    pub fn is_active_at(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.saturating_duration_since(at) < self.window)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Instant::now())
    }

    pub fn clear(&mut self) {
        self.copied_at = None;
    }
}

/// Records views and likes for resolved snippets and handles copying.
pub struct EngagementController {
    gateway: SnippetGatewayRef,
    ledger: EngagementLedger,
    clipboard: ClipboardRef,
    copy_feedback: CopyFeedback,
    pending_views: Vec<JoinHandle<()>>,
}

impl EngagementController {
    pub fn new(
        gateway: SnippetGatewayRef,
        ledger: EngagementLedger,
        clipboard: ClipboardRef,
        copy_ack: Duration,
    ) -> Self {
        Self {
            gateway,
            ledger,
            clipboard,
            copy_feedback: CopyFeedback::new(copy_ack),
            pending_views: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &EngagementLedger {
        &self.ledger
    }

    /// Count a view of a freshly resolved snippet.
    ///
    /// The increment runs in the background; a failure is logged and dropped.
    /// Must be called from within a tokio runtime.
    pub fn on_resolved(&mut self, snippet: &SharedSnippet) {
        let gateway = self.gateway.clone();
        let snippet_id = snippet.id.clone();

        self.pending_views.retain(|handle| !handle.is_finished());
        self.pending_views.push(tokio::spawn(async move {
            match gateway.increment_views(&snippet_id).await {
                Ok(()) => debug!(%snippet_id, "view recorded"),
                Err(e) => warn!(%snippet_id, error = %e, "failed to record view"),
            }
        }));
    }

    /// Wait for background view increments to finish.
    pub async fn flush_views(&mut self) {
        let pending = std::mem::take(&mut self.pending_views);
        for result in futures::future::join_all(pending).await {
            if let Err(e) = result {
                warn!(error = %e, "view increment task aborted");
            }
        }
    }

    pub fn has_liked(&self, snippet_id: &str) -> Result<bool> {
        self.ledger.has(snippet_id)
    }

    /// Like `snippet` once per client.
    ///
    /// The displayed count is only bumped after both the store and the ledger
    /// accepted the like.
    pub async fn like(&mut self, snippet: &mut SharedSnippet) -> Result<LikeOutcome> {
        if self.ledger.has(&snippet.id)? {
            debug!(snippet_id = %snippet.id, "already liked, skipping");
            return Ok(LikeOutcome::AlreadyLiked);
        }

        self.gateway
            .increment_likes(&snippet.id)
            .await
            .map_err(|e| {
                warn!(snippet_id = %snippet.id, error = %e, "failed to like snippet");
                ShareError::from(e)
            })?;

        self.ledger.add(&snippet.id).inspect_err(|e| {
            warn!(snippet_id = %snippet.id, error = %e, "like sent but not saved locally");
        })?;

        snippet.likes += 1;
        info!(snippet_id = %snippet.id, likes = snippet.likes, "snippet liked");
        Ok(LikeOutcome::Liked {
            likes: snippet.likes,
        })
    }

    /// Copy code to the clipboard. Empty code is ignored.
    pub fn copy(&mut self, code: &str) -> Result<bool> {
        if code.is_empty() {
            return Ok(false);
        }

        match self.clipboard.write_text(code) {
            Ok(()) => {
                self.copy_feedback.mark(Instant::now());
                info!(bytes = code.len(), "code copied");
                Ok(true)
            }
            Err(e) => {
                warn!(error = %format!("{:#}", e), "failed to copy code");
                Err(ShareError::Clipboard(e.to_string()))
            }
        }
    }

    pub fn copy_feedback(&self) -> &CopyFeedback {
        &self.copy_feedback
    }

    pub fn reset_copy_feedback(&mut self) {
        self.copy_feedback.clear();
    }
}

impl std::fmt::Debug for EngagementController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngagementController")
            .field("ledger", &self.ledger)
            .field("copy_feedback", &self.copy_feedback)
            .field("pending_views", &self.pending_views.len())
            .finish()
    }
}

/// Editor route for `link`, filling the `{link}` placeholder.
pub fn editor_route(template: &str, link: &str) -> String {
    if template.contains("{link}") {
        template.replace("{link}", link)
    } else {
        format!("{}/{}", template.trim_end_matches('/'), link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::handlers::clipboard::MemoryClipboard;
    use crate::models::{MemoryLedgerStorage, SnippetLanguage};
    use std::sync::Arc;

    fn controller(
        gateway: Arc<InMemoryGateway>,
        storage: Arc<MemoryLedgerStorage>,
        clipboard: Arc<MemoryClipboard>,
    ) -> EngagementController {
        EngagementController::new(
            gateway,
            EngagementLedger::new(storage),
            clipboard,
            Duration::from_millis(2000),
        )
    }

    #[tokio::test]
    async fn second_like_sends_nothing() {
        let gateway = Arc::new(InMemoryGateway::new());
        let storage = Arc::new(MemoryLedgerStorage::new());
        let mut snippet = gateway.publish("abc123", "t", "x", SnippetLanguage::Rust);
        let mut engagement = controller(gateway.clone(), storage.clone(), Arc::default());

        assert_eq!(
            engagement.like(&mut snippet).await.unwrap(),
            LikeOutcome::Liked { likes: 1 }
        );
        assert_eq!(
            engagement.like(&mut snippet).await.unwrap(),
            LikeOutcome::AlreadyLiked
        );

        assert_eq!(gateway.calls().like_increments, 1);
        assert_eq!(storage.snapshot(), vec![snippet.id.clone()]);
        assert_eq!(snippet.likes, 1);
    }

    #[tokio::test]
    async fn failed_increment_leaves_ledger_untouched() {
        let gateway = Arc::new(InMemoryGateway::new());
        let storage = Arc::new(MemoryLedgerStorage::new());
        let mut snippet = gateway.publish("abc123", "t", "x", SnippetLanguage::Rust);
        let mut engagement = controller(gateway.clone(), storage.clone(), Arc::default());

        gateway.set_fail_likes(true);
        let err = engagement.like(&mut snippet).await.unwrap_err();
        assert!(matches!(err, ShareError::Transport(_)));
        assert!(storage.snapshot().is_empty());
        assert_eq!(snippet.likes, 0);

        gateway.set_fail_likes(false);
        assert!(matches!(
            engagement.like(&mut snippet).await,
            Ok(LikeOutcome::Liked { likes: 1 })
        ));
    }

    #[tokio::test]
    async fn unsaved_like_is_not_confirmed() {
        let gateway = Arc::new(InMemoryGateway::new());
        let storage = Arc::new(MemoryLedgerStorage::new());
        storage.set_fail_writes(true);
        let mut snippet = gateway.publish("abc123", "t", "x", SnippetLanguage::Rust);
        let mut engagement = controller(gateway.clone(), storage, Arc::default());

        let err = engagement.like(&mut snippet).await.unwrap_err();
        assert!(matches!(err, ShareError::Persistence(_)));
        assert_eq!(snippet.likes, 0);
    }

    #[tokio::test]
    async fn view_failures_are_swallowed() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.set_fail_views(true);
        let snippet = gateway.publish("abc123", "t", "x", SnippetLanguage::Rust);
        let mut engagement = controller(gateway.clone(), Arc::default(), Arc::default());

        engagement.on_resolved(&snippet);
        engagement.flush_views().await;

        assert_eq!(gateway.calls().view_increments, 1);
        assert_eq!(gateway.counters("abc123"), Some((0, 0)));
    }

    #[test]
    fn copy_opens_a_short_acknowledgement_window() {
        let clipboard = Arc::new(MemoryClipboard::new());
        let gateway = Arc::new(InMemoryGateway::new());
        let mut engagement = controller(gateway, Arc::default(), clipboard.clone());

        assert!(engagement.copy("let x = 1;").unwrap());
        assert_eq!(clipboard.contents().as_deref(), Some("let x = 1;"));

        let feedback = engagement.copy_feedback();
        assert!(feedback.is_active());
        assert!(!feedback.is_active_at(Instant::now() + Duration::from_secs(3)));
    }

    #[test]
    fn copy_failure_is_reported_without_feedback() {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set_fail(true);
        let mut engagement =
            controller(Arc::new(InMemoryGateway::new()), Arc::default(), clipboard);

        assert!(matches!(
            engagement.copy("code"),
            Err(ShareError::Clipboard(_))
        ));
        assert!(!engagement.copy_feedback().is_active());
        assert!(!engagement.copy("").unwrap());
    }

    #[test]
    fn editor_route_fills_the_placeholder() {
        assert_eq!(editor_route("/compiler/{link}", "abc"), "/compiler/abc");
        assert_eq!(
            editor_route("https://ide.example/open/", "abc"),
            "https://ide.example/open/abc"
        );
    }
}
