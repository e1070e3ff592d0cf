use thiserror::Error;

/// Message shown for both missing and private snippets so that a visitor
/// cannot tell whether a private snippet exists behind a link.
pub const UNAVAILABLE_MESSAGE: &str =
    "This shared snippet might have been removed or is no longer available.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    #[error("no snippet is published under this link")]
    NotFound,

    #[error("snippet is private")]
    Forbidden,

    #[error("snippet store unreachable: {0}")]
    Transport(String),

    #[error("clipboard write failed: {0}")]
    Clipboard(String),

    #[error("failed to persist liked snippets: {0}")]
    Persistence(String),

    #[error("malformed snippet record: {0}")]
    MalformedRecord(String),

    #[error("no snippet is currently displayed")]
    NotResolved,

    #[error("invalid link: {0}")]
    InvalidLink(String),
}

impl ShareError {
    /// Text suitable for the presentation surface.
    pub fn user_message(&self) -> String {
        match self {
            ShareError::NotFound | ShareError::Forbidden => UNAVAILABLE_MESSAGE.to_string(),
            ShareError::Transport(msg) => format!("Failed to load the shared snippet: {}", msg),
            ShareError::MalformedRecord(_) => {
                "The shared snippet could not be read.".to_string()
            }
            ShareError::Persistence(_) => "Could not save your like. Please try again.".to_string(),
            ShareError::Clipboard(_) => "Failed to copy code.".to_string(),
            ShareError::NotResolved => "Nothing to act on yet.".to_string(),
            ShareError::InvalidLink(link) => format!("'{}' is not a shared snippet link", link),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ShareError::Transport(_) | ShareError::Persistence(_))
    }

    /// NotFound and Forbidden are both reported as "unavailable".
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ShareError::NotFound | ShareError::Forbidden)
    }
}

pub type Result<T> = std::result::Result<T, ShareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_and_missing_share_one_message() {
        assert_eq!(
            ShareError::NotFound.user_message(),
            ShareError::Forbidden.user_message()
        );
        assert!(ShareError::Forbidden.is_unavailable());
    }

    #[test]
    fn only_transport_and_persistence_are_retryable() {
        assert!(ShareError::Transport("timeout".into()).is_retryable());
        assert!(ShareError::Persistence("disk full".into()).is_retryable());
        assert!(!ShareError::NotFound.is_retryable());
        assert!(!ShareError::MalformedRecord("title".into()).is_retryable());
    }
}
