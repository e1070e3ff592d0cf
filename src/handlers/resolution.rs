use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::{debug, error};

use crate::error::ShareError;
use crate::gateway::GatewayError;
use crate::models::{SharedSnippet, SnippetRecord};

static SHARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/shared/([^/?#]+)/?(?:[?#].*)?$").expect("valid share url pattern"));

/// Opaque shareable-link token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkId(String);

impl LinkId {
    /// Accept a bare token or a full share URL (`https://host/shared/<token>`).
    pub fn parse(input: &str) -> Result<Self, ShareError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ShareError::InvalidLink(input.to_string()));
        }

        if let Some(captures) = SHARE_URL.captures(input) {
            return Ok(LinkId(captures[1].to_string()));
        }

        if input.contains("://") {
            return Err(ShareError::InvalidLink(input.to_string()));
        }

        Ok(LinkId(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle for one in-flight lookup. Only the ticket of the latest lookup is
/// accepted on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    generation: u64,
    link: LinkId,
}

impl LookupTicket {
    pub fn link(&self) -> &LinkId {
        &self.link
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionState {
    Idle,
    Loading { link: LinkId },
    Resolved { link: LinkId, snippet: Box<SharedSnippet> },
    NotFound { link: LinkId },
    Forbidden { link: LinkId },
    Failed { link: LinkId, error: ShareError },
}

impl ResolutionState {
    pub fn link(&self) -> Option<&LinkId> {
        match self {
            ResolutionState::Idle => None,
            ResolutionState::Loading { link }
            | ResolutionState::Resolved { link, .. }
            | ResolutionState::NotFound { link }
            | ResolutionState::Forbidden { link }
            | ResolutionState::Failed { link, .. } => Some(link),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ResolutionState::Idle => "idle",
            ResolutionState::Loading { .. } => "loading",
            ResolutionState::Resolved { .. } => "resolved",
            ResolutionState::NotFound { .. } => "not_found",
            ResolutionState::Forbidden { .. } => "forbidden",
            ResolutionState::Failed { .. } => "failed",
        }
    }

    /// Terminal for its link: asking for the same link again does nothing.
    fn settles(&self) -> bool {
        matches!(
            self,
            ResolutionState::Loading { .. }
                | ResolutionState::Resolved { .. }
                | ResolutionState::NotFound { .. }
                | ResolutionState::Forbidden { .. }
        )
    }
}

/// Result of feeding a lookup completion into the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The ticket was superseded; state untouched.
    Discarded,
    /// Entered `Resolved`. Carries the snippet so the caller can fire the view increment.
    Resolved(Box<SharedSnippet>),
    /// Entered `NotFound`, `Forbidden` or `Failed`.
    Settled(ShareError),
}

/// Link-to-snippet lifecycle: `Idle -> Loading -> Resolved | NotFound | Forbidden | Failed`.
#[derive(Debug)]
pub struct SnippetResolver {
    state: ResolutionState,
    generation: u64,
}

impl Default for SnippetResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SnippetResolver {
    pub fn new() -> Self {
        Self {
            state: ResolutionState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    /// Start resolving `link`. Returns `None` when `link` is already loading or
    /// settled, so no second lookup is issued.
    pub fn begin(&mut self, link: LinkId) -> Option<LookupTicket> {
        if self.state.link() == Some(&link) && self.state.settles() {
            debug!(%link, state = self.state.name(), "link unchanged, keeping state");
            return None;
        }

        self.generation += 1;
        self.state = ResolutionState::Loading { link: link.clone() };
        debug!(%link, generation = self.generation, "loading");

        Some(LookupTicket {
            generation: self.generation,
            link,
        })
    }

    /// Apply the outcome of the lookup identified by `ticket`.
    pub fn complete(
        &mut self,
        ticket: &LookupTicket,
        outcome: Result<Option<SnippetRecord>, GatewayError>,
    ) -> Transition {
        let loading = matches!(self.state, ResolutionState::Loading { .. });
        if ticket.generation != self.generation || !loading {
            debug!(
                link = %ticket.link,
                stale = ticket.generation,
                current = self.generation,
                "discarding superseded lookup"
            );
            return Transition::Discarded;
        }

        let link = ticket.link.clone();
        let (state, transition) = match outcome {
            Err(err) => {
                let err = ShareError::from(err);
                error!(%link, error = %err, "failed to load shared snippet");
                (
                    ResolutionState::Failed { link, error: err.clone() },
                    Transition::Settled(err),
                )
            }
            Ok(None) => (
                ResolutionState::NotFound { link },
                Transition::Settled(ShareError::NotFound),
            ),
            Ok(Some(record)) if !record.is_public() => (
                ResolutionState::Forbidden { link },
                Transition::Settled(ShareError::Forbidden),
            ),
            Ok(Some(record)) => match SharedSnippet::from_record(record) {
                Err(err) => {
                    error!(%link, error = %err, "rejecting snippet record");
                    (
                        ResolutionState::Failed { link, error: err.clone() },
                        Transition::Settled(err),
                    )
                }
                Ok(snippet) => {
                    let snippet = Box::new(snippet);
                    (
                        ResolutionState::Resolved {
                            link,
                            snippet: snippet.clone(),
                        },
                        Transition::Resolved(snippet),
                    )
                }
            },
        };

        debug!(link = %ticket.link, from = self.state.name(), to = state.name(), "transition");
        self.state = state;
        transition
    }

    /// Mutable access to the displayed snippet, for optimistic counter updates.
    pub fn resolved_mut(&mut self) -> Option<&mut SharedSnippet> {
        match &mut self.state {
            ResolutionState::Resolved { snippet, .. } => Some(&mut **snippet),
            _ => None,
        }
    }

    pub fn resolved(&self) -> Option<&SharedSnippet> {
        match &self.state {
            ResolutionState::Resolved { snippet, .. } => Some(&**snippet),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(link: &str, public: bool) -> SnippetRecord {
        SnippetRecord(json!({
            "id": format!("id-{}", link),
            "shareableLink": link,
            "title": "t",
            "code": "fn main() {}",
            "language": "rust",
            "isPublic": public,
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        }))
    }

    fn link(s: &str) -> LinkId {
        LinkId::parse(s).unwrap()
    }

    #[test]
    fn parses_bare_tokens_and_share_urls() {
        assert_eq!(link("abc123").as_str(), "abc123");
        assert_eq!(link("https://neo.example/shared/abc123").as_str(), "abc123");
        assert_eq!(link("https://neo.example/shared/abc123/?ref=x").as_str(), "abc123");
        assert!(LinkId::parse("   ").is_err());
        assert!(LinkId::parse("https://neo.example/compiler").is_err());
    }

    #[test]
    fn public_record_resolves() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("abc")).unwrap();
        assert_eq!(resolver.state().name(), "loading");

        let transition = resolver.complete(&ticket, Ok(Some(record("abc", true))));
        assert!(matches!(transition, Transition::Resolved(_)));
        assert_eq!(resolver.resolved().unwrap().id, "id-abc");
    }

    #[test]
    fn private_record_is_forbidden() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("secret")).unwrap();
        let transition = resolver.complete(&ticket, Ok(Some(record("secret", false))));

        assert_eq!(transition, Transition::Settled(ShareError::Forbidden));
        assert!(matches!(resolver.state(), ResolutionState::Forbidden { .. }));
        assert!(resolver.resolved().is_none());
    }

    #[test]
    fn absent_record_is_not_found() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("deleted-link")).unwrap();
        resolver.complete(&ticket, Ok(None));
        assert!(matches!(resolver.state(), ResolutionState::NotFound { .. }));
    }

    #[test]
    fn transport_failure_can_be_retried_with_the_same_link() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("abc")).unwrap();
        resolver.complete(&ticket, Err(GatewayError::Transport("offline".into())));
        assert!(matches!(
            resolver.state(),
            ResolutionState::Failed { error: ShareError::Transport(_), .. }
        ));

        let retry = resolver.begin(link("abc")).unwrap();
        assert!(retry.generation() > ticket.generation());
    }

    #[test]
    fn same_link_does_not_restart_a_settled_machine() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("abc")).unwrap();
        assert!(resolver.begin(link("abc")).is_none());
        resolver.complete(&ticket, Ok(Some(record("abc", true))));
        assert!(resolver.begin(link("abc")).is_none());
        assert!(resolver.begin(link("other")).is_some());
    }

    #[test]
    fn stale_completion_is_discarded() {
        let mut resolver = SnippetResolver::new();
        let first = resolver.begin(link("first")).unwrap();
        let second = resolver.begin(link("second")).unwrap();

        resolver.complete(&second, Ok(None));
        let late = resolver.complete(&first, Ok(Some(record("first", true))));

        assert_eq!(late, Transition::Discarded);
        assert!(matches!(
            resolver.state(),
            ResolutionState::NotFound { link } if link.as_str() == "second"
        ));
    }

    #[test]
    fn a_ticket_completes_at_most_once() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("abc")).unwrap();
        resolver.complete(&ticket, Ok(Some(record("abc", true))));
        let again = resolver.complete(&ticket, Ok(Some(record("abc", true))));
        assert_eq!(again, Transition::Discarded);
    }

    #[test]
    fn malformed_record_fails() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("abc")).unwrap();
        let raw = SnippetRecord(json!({"id": 7, "isPublic": true}));
        let transition = resolver.complete(&ticket, Ok(Some(raw)));
        assert!(matches!(
            transition,
            Transition::Settled(ShareError::MalformedRecord(_))
        ));
    }

    #[test]
    fn private_record_is_forbidden_even_when_malformed() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("secret")).unwrap();
        let raw = SnippetRecord(json!({"id": "", "isPublic": false, "title": 3}));
        let transition = resolver.complete(&ticket, Ok(Some(raw)));

        assert_eq!(transition, Transition::Settled(ShareError::Forbidden));
        assert!(matches!(resolver.state(), ResolutionState::Forbidden { .. }));
    }

    #[test]
    fn record_without_a_visibility_flag_is_forbidden() {
        let mut resolver = SnippetResolver::new();
        let ticket = resolver.begin(link("secret")).unwrap();
        let raw = SnippetRecord(json!({"id": "x", "isPublic": "yes"}));
        assert_eq!(
            resolver.complete(&ticket, Ok(Some(raw))),
            Transition::Settled(ShareError::Forbidden)
        );
    }
}
