//! JSON-file ledger with serialized read-modify-write.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use playcoach_models::{AnalysisRecord, StructuredAnalysis};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};

/// Filename to record mapping, ordered for stable output.
pub type LedgerMap = BTreeMap<String, AnalysisRecord>;

/// On-disk entry. Older ledgers stored the bare analysis without a status.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Record(AnalysisRecord),
    Legacy(StructuredAnalysis),
}

impl From<StoredEntry> for AnalysisRecord {
    fn from(entry: StoredEntry) -> Self {
        match entry {
            StoredEntry::Record(record) => record,
            StoredEntry::Legacy(analysis) => AnalysisRecord::completed(analysis),
        }
    }
}

/// Durable ledger of processed videos.
///
/// Every mutation re-reads the document, applies the change and rewrites it
/// through a temp file renamed over the target, all while holding the lock.
pub struct Ledger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl Ledger {
    /// Open the ledger at `path`, validating any existing document.
    pub async fn open(path: impl Into<PathBuf>) -> LedgerResult<Self> {
        let ledger = Self {
            path: path.into(),
            lock: Mutex::new(()),
        };
        let entries = ledger.load().await?;
        info!(path = %ledger.path.display(), entries = entries.len(), "Opened ledger");
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole mapping. A missing file is an empty ledger.
    pub async fn load(&self) -> LedgerResult<LedgerMap> {
        let _guard = self.lock.lock().await;
        self.read_unlocked().await
    }

    /// Replace the whole mapping.
    pub async fn save(&self, entries: &LedgerMap) -> LedgerResult<()> {
        let _guard = self.lock.lock().await;
        self.write_unlocked(entries).await
    }

    pub async fn get(&self, filename: &str) -> LedgerResult<Option<AnalysisRecord>> {
        Ok(self.load().await?.remove(filename))
    }

    /// All records, ordered by filename.
    pub async fn list(&self) -> LedgerResult<Vec<(String, AnalysisRecord)>> {
        Ok(self.load().await?.into_iter().collect())
    }

    /// Insert or replace the record for `filename`.
    ///
    /// A completed record is final: overwriting it returns
    /// [`LedgerError::Immutable`] and leaves the document untouched.
    pub async fn upsert(&self, filename: &str, record: AnalysisRecord) -> LedgerResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.read_unlocked().await?;

        if entries.get(filename).is_some_and(|r| r.is_completed()) {
            warn!(filename, status = %record.status, "Refusing to overwrite completed record");
            return Err(LedgerError::Immutable(filename.to_string()));
        }

        debug!(filename, status = %record.status, "Writing ledger record");
        entries.insert(filename.to_string(), record);
        self.write_unlocked(&entries).await
    }

    async fn read_unlocked(&self) -> LedgerResult<LedgerMap> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LedgerMap::new()),
            Err(e) => return Err(LedgerError::io(&self.path, e)),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(LedgerMap::new());
        }

        let stored: BTreeMap<String, StoredEntry> =
            serde_json::from_slice(&raw).map_err(|source| LedgerError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(stored.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    async fn write_unlocked(&self, entries: &LedgerMap) -> LedgerResult<()> {
        let json = serde_json::to_vec_pretty(entries)?;
        let tmp = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::io(parent, e))?;
        }

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| LedgerError::io(&tmp, e))?;

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(LedgerError::io(&self.path, e));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }
}
