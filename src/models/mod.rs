pub mod ledger;
pub mod snippet;
pub mod storage;

pub use ledger::EngagementLedger;
pub use snippet::{SharedSnippet, SnippetLanguage, SnippetRecord};
pub use storage::{FileLedgerStorage, LedgerStorage, LedgerStorageRef, MemoryLedgerStorage};
