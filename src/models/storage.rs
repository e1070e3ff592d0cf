use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// File name of the liked-snippets ledger inside the data directory.
pub const LEDGER_FILE_NAME: &str = "liked_snippets.json";

/// Durable storage for the ordered list of liked snippet IDs.
///
/// Implementations store the whole list under a single key and are expected
/// to replace it atomically on `save`.
pub trait LedgerStorage: Send + Sync {
    fn load(&self) -> Result<Vec<String>>;
    fn save(&self, ids: &[String]) -> Result<()>;
}

pub type LedgerStorageRef = Arc<dyn LedgerStorage>;

/// Ledger kept as a JSON array on disk
#[derive(Debug, Clone)]
pub struct FileLedgerStorage {
    ledger_file: PathBuf,
}

impl FileLedgerStorage {
    /// Storage under the platform data directory (`<data_dir>/snipshare`).
    pub fn new() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .context("Failed to get data directory")?
            .join("snipshare");

        Self::at(data_dir.join(LEDGER_FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let ledger_file = path.into();
        if let Some(parent) = ledger_file.parent() {
            fs::create_dir_all(parent).context("Failed to create ledger directory")?;
        }
        Ok(Self { ledger_file })
    }

    pub fn path(&self) -> &Path {
        &self.ledger_file
    }
}

impl LedgerStorage for FileLedgerStorage {
    fn load(&self) -> Result<Vec<String>> {
        if !self.ledger_file.exists() {
            return Ok(Vec::new());
        }

        let content =
            fs::read_to_string(&self.ledger_file).context("Failed to read ledger file")?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).context("Failed to parse ledger JSON")
    }

    fn save(&self, ids: &[String]) -> Result<()> {
        let content = serde_json::to_string(ids).context("Failed to serialize ledger")?;

        // Each save gets its own temp file next to the target, renamed over it.
        let dir = match self.ledger_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp_file = NamedTempFile::new_in(dir).context("Failed to create temp ledger file")?;
        tmp_file
            .write_all(content.as_bytes())
            .context("Failed to write ledger file")?;
        tmp_file
            .persist(&self.ledger_file)
            .map_err(|e| e.error)
            .context("Failed to replace ledger file")?;
        Ok(())
    }
}

/// In-process ledger storage. Writes can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryLedgerStorage {
    ids: Mutex<Vec<String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryLedgerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: &[&str]) -> Self {
        Self {
            ids: Mutex::new(ids.iter().map(|id| id.to_string()).collect()),
            fail_writes: Mutex::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.ids.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

impl LedgerStorage for MemoryLedgerStorage {
    fn load(&self) -> Result<Vec<String>> {
        self.ids
            .lock()
            .map(|ids| ids.clone())
            .map_err(|e| anyhow!("ledger lock poisoned: {}", e))
    }

    fn save(&self, ids: &[String]) -> Result<()> {
        let fail = self
            .fail_writes
            .lock()
            .map_err(|e| anyhow!("ledger lock poisoned: {}", e))?;
        if *fail {
            return Err(anyhow!("storage quota exceeded"));
        }

        let mut stored = self
            .ids
            .lock()
            .map_err(|e| anyhow!("ledger lock poisoned: {}", e))?;
        *stored = ids.to_vec();
        Ok(())
    }
}
