//! Session store
//!
//! One JSON record per `(signer address, chain id)`. Records are written
//! after each successful open and offered back to the node on the next run,
//! which makes opening idempotent across restarts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::SessionHandle;

/// Persisted session, keyed by signer and chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub chain_id: u64,
    #[serde(flatten)]
    pub handle: SessionHandle,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, signer_address: &str, chain_id: u64) -> PathBuf {
        let signer = signer_address.trim_start_matches("0x").to_lowercase();
        self.dir.join(format!("{}-{}.json", signer, chain_id))
    }

    /// Loads the record for `(signer_address, chain_id)`, if one exists.
    pub async fn load(&self, signer_address: &str, chain_id: u64) -> Result<Option<SessionRecord>> {
        let path = self.record_path(signer_address, chain_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read session record {}", path.display()))
            }
        };

        let record: SessionRecord = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt session record {}", path.display()))?;
        if record.chain_id != chain_id {
            anyhow::bail!(
                "Session record {} is for chain {}, expected {}",
                path.display(),
                record.chain_id,
                chain_id
            );
        }
        Ok(Some(record))
    }

    /// Writes the record, replacing any previous one for the same signer and chain.
    pub async fn save(&self, record: &SessionRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create session store {}", self.dir.display()))?;

        let path = self.record_path(&record.handle.signer_address, record.chain_id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write session record {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move session record into {}", path.display()))?;
        Ok(())
    }
}
