use tracing::debug;

use crate::error::{Result, ShareError};
use crate::models::storage::LedgerStorageRef;

/// Per-client record of snippets already liked.
///
/// Append-only. Every call goes back to storage, so two handles over the same
/// storage (e.g. two running front ends) see each other's likes.
#[derive(Clone)]
pub struct EngagementLedger {
    storage: LedgerStorageRef,
}

impl EngagementLedger {
    pub fn new(storage: LedgerStorageRef) -> Self {
        Self { storage }
    }

    pub fn has(&self, snippet_id: &str) -> Result<bool> {
        Ok(self.ids()?.iter().any(|id| id == snippet_id))
    }

    /// Add an ID, merging with whatever is currently stored.
    pub fn add(&self, snippet_id: &str) -> Result<()> {
        let mut ids = self.ids()?;
        if ids.iter().any(|id| id == snippet_id) {
            debug!(snippet_id, "already in ledger");
            return Ok(());
        }

        ids.push(snippet_id.to_string());
        self.storage
            .save(&ids)
            .map_err(|e| ShareError::Persistence(format!("{:#}", e)))?;
        debug!(snippet_id, total = ids.len(), "ledger updated");
        Ok(())
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        self.storage
            .load()
            .map_err(|e| ShareError::Persistence(format!("{:#}", e)))
    }
}

impl std::fmt::Debug for EngagementLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EngagementLedger {{ .. }}")
    }
}
