use flume::{Receiver, Sender};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::UiConfig;
use crate::error::{Result, ShareError};
use crate::gateway::{GatewayError, SnippetGatewayRef};
use crate::handlers::clipboard::ClipboardRef;
use crate::handlers::engagement::{self, EngagementController};
use crate::handlers::resolution::{
    LinkId, LookupTicket, ResolutionState, SnippetResolver, Transition,
};
use crate::models::{EngagementLedger, SharedSnippet, SnippetRecord};

/// Outcome of a background lookup, tagged with the ticket that started it.
#[derive(Debug)]
pub struct LookupMessage {
    pub ticket: LookupTicket,
    pub outcome: std::result::Result<Option<SnippetRecord>, GatewayError>,
}

/// What the presentation surface shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    Idle,
    Loading,
    Displaying,
    /// Missing or private; deliberately indistinguishable.
    Unavailable,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnippetView {
    pub status: ViewStatus,
    pub link: Option<String>,
    pub snippet: Option<SharedSnippet>,
    pub views: u64,
    pub likes: u64,
    pub already_liked: bool,
    pub copied: bool,
    pub message: Option<String>,
}

/// State container for one shared-snippet page.
///
/// Owns the resolution state machine and the engagement controller. Lookups
/// either run inline (`open`) or on a spawned task (`navigate`) whose result
/// comes back through the inbox and is applied by `process_messages`.
pub struct SharedSnippetApp {
    gateway: SnippetGatewayRef,
    resolver: SnippetResolver,
    engagement: EngagementController,
    editor_route: String,
    already_liked: bool,
    inbox: (Sender<LookupMessage>, Receiver<LookupMessage>),
}

impl std::fmt::Debug for SharedSnippetApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSnippetApp")
            .field("state", self.resolver.state())
            .field("engagement", &self.engagement)
            .field("already_liked", &self.already_liked)
            .finish()
    }
}

impl SharedSnippetApp {
    pub fn new(
        gateway: SnippetGatewayRef,
        ledger: EngagementLedger,
        clipboard: ClipboardRef,
        ui: &UiConfig,
    ) -> Self {
        let engagement = EngagementController::new(
            gateway.clone(),
            ledger,
            clipboard,
            Duration::from_millis(ui.copy_ack_millis),
        );

        Self {
            gateway,
            resolver: SnippetResolver::new(),
            engagement,
            editor_route: ui.editor_route.clone(),
            already_liked: false,
            inbox: flume::unbounded(),
        }
    }

    pub fn state(&self) -> &ResolutionState {
        self.resolver.state()
    }

    pub fn ledger(&self) -> &EngagementLedger {
        self.engagement.ledger()
    }

    /// Resolve `link` and wait for the result.
    pub async fn open(&mut self, link: &str) -> Result<SnippetView> {
        let link = LinkId::parse(link)?;
        match self.resolver.begin(link) {
            Some(ticket) => {
                let outcome = self.gateway.fetch_by_link(ticket.link().as_str()).await;
                self.apply(LookupMessage { ticket, outcome });
            }
            // Already being looked up in the background.
            None if matches!(self.resolver.state(), ResolutionState::Loading { .. }) => {
                self.wait_settled().await;
            }
            None => {}
        }
        self.settled_view()
    }

    /// Start resolving `link` in the background. Returns the ticket of the new
    /// lookup, or `None` if the link is already loading or settled.
    pub fn navigate(&mut self, link: &str) -> Result<Option<LookupTicket>> {
        let link = LinkId::parse(link)?;
        let Some(ticket) = self.resolver.begin(link) else {
            return Ok(None);
        };

        let gateway = self.gateway.clone();
        let sender = self.inbox.0.clone();
        let task_ticket = ticket.clone();
        tokio::spawn(async move {
            let outcome = gateway.fetch_by_link(task_ticket.link().as_str()).await;
            // The app may be gone by now; nothing left to update then.
            let _ = sender.send(LookupMessage {
                ticket: task_ticket,
                outcome,
            });
        });

        Ok(Some(ticket))
    }

    /// Apply every lookup result that has arrived, without waiting.
    pub fn process_messages(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.inbox.1.try_recv() {
            self.apply(message);
            applied += 1;
        }
        applied
    }

    /// Wait for the next lookup result and apply it.
    pub async fn next_message(&mut self) -> Transition {
        match self.inbox.1.recv_async().await {
            Ok(message) => self.apply(message),
            // The app holds a sender itself, so the channel never disconnects.
            Err(_) => Transition::Discarded,
        }
    }

    /// Wait until the current link has settled.
    pub async fn wait_settled(&mut self) -> SnippetView {
        while matches!(self.resolver.state(), ResolutionState::Loading { .. }) {
            self.next_message().await;
        }
        self.view()
    }

    fn apply(&mut self, message: LookupMessage) -> Transition {
        let transition = self.resolver.complete(&message.ticket, message.outcome);
        match &transition {
            Transition::Resolved(snippet) => {
                self.already_liked = self.engagement.has_liked(&snippet.id).unwrap_or_else(|e| {
                    warn!(error = %e, "could not read liked snippets");
                    false
                });
                self.engagement.reset_copy_feedback();
                self.engagement.on_resolved(snippet);
                if let Some(displayed) = self.resolver.resolved_mut() {
                    // The visit being counted right now.
                    displayed.views += 1;
                }
            }
            Transition::Settled(err) => {
                debug!(error = %err, "lookup settled without a snippet");
                self.already_liked = false;
            }
            Transition::Discarded => {}
        }
        transition
    }

    pub async fn like(&mut self) -> Result<SnippetView> {
        let Some(snippet) = self.resolver.resolved_mut() else {
            return Err(ShareError::NotResolved);
        };

        let outcome = self.engagement.like(snippet).await?;
        debug!(?outcome, "like handled");
        self.already_liked = true;
        Ok(self.view())
    }

    pub fn copy(&mut self) -> Result<SnippetView> {
        let code = self
            .resolver
            .resolved()
            .map(|snippet| snippet.code.clone())
            .ok_or(ShareError::NotResolved)?;

        self.engagement.copy(&code)?;
        Ok(self.view())
    }

    /// Route of the editor for the displayed snippet.
    pub fn editor_route(&self) -> Result<String> {
        let ResolutionState::Resolved { link, .. } = self.resolver.state() else {
            return Err(ShareError::NotResolved);
        };
        Ok(engagement::editor_route(&self.editor_route, link.as_str()))
    }

    /// Wait for pending view increments. Call before a short-lived process exits.
    pub async fn flush(&mut self) {
        self.engagement.flush_views().await;
    }

    pub fn view(&self) -> SnippetView {
        let state = self.resolver.state();
        let link = state.link().map(|link| link.to_string());
        let mut view = SnippetView {
            status: ViewStatus::Idle,
            link,
            snippet: None,
            views: 0,
            likes: 0,
            already_liked: false,
            copied: false,
            message: None,
        };

        match state {
            ResolutionState::Idle => {}
            ResolutionState::Loading { .. } => {
                view.status = ViewStatus::Loading;
                view.message = Some("Loading shared snippet...".to_string());
            }
            ResolutionState::Resolved { snippet, .. } => {
                view.status = ViewStatus::Displaying;
                view.views = snippet.views;
                view.likes = snippet.likes;
                view.already_liked = self.already_liked;
                view.copied = self.engagement.copy_feedback().is_active();
                view.snippet = Some((**snippet).clone());
            }
            ResolutionState::NotFound { .. } => {
                view.status = ViewStatus::Unavailable;
                view.message = Some(ShareError::NotFound.user_message());
            }
            ResolutionState::Forbidden { .. } => {
                view.status = ViewStatus::Unavailable;
                view.message = Some(ShareError::Forbidden.user_message());
            }
            ResolutionState::Failed { error, .. } => {
                view.status = ViewStatus::Failed;
                view.message = Some(error.user_message());
            }
        }
        view
    }

    /// The view if a snippet is displayed, the settling error otherwise.
    fn settled_view(&self) -> Result<SnippetView> {
        match self.resolver.state() {
            ResolutionState::NotFound { .. } => Err(ShareError::NotFound),
            ResolutionState::Forbidden { .. } => Err(ShareError::Forbidden),
            ResolutionState::Failed { error, .. } => Err(error.clone()),
            _ => Ok(self.view()),
        }
    }
}
