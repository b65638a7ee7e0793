use std::path::{Path, PathBuf};

use rewardnet_ledger::{Ledger, Snapshot};
use rewardnet_model::LedgerParams;
use tokio::{fs, io::AsyncWriteExt};

/// The ledger state file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// Create from path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the ledger, starting from an empty one if the file does not exist.
    pub async fn load(&self, params: LedgerParams) -> eyre::Result<Ledger> {
        let snapshot = if fs::try_exists(&self.path).await? {
            let content = fs::read_to_string(&self.path).await?;
            Snapshot::from_json(&content)?
        } else {
            tracing::info!(path=%self.path.display(), "state file not found, starting empty");
            Snapshot::default()
        };
        Ok(Ledger::from_snapshot(snapshot, params)?)
    }

    /// Save the ledger.
    ///
    /// The snapshot is written to a temporary file first and then renamed
    /// over the state file.
    pub async fn save(&self, ledger: &Ledger) -> eyre::Result<()> {
        let content = ledger.snapshot()?.to_json()?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path=%self.path.display(), "state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rewardnet_model::Amount;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("rewardnet-cli-{}", std::process::id()))
            .join(name)
            .join("state.json")
    }

    #[tokio::test]
    async fn missing_file_is_an_empty_ledger() -> eyre::Result<()> {
        let state = StateFile::new(temp_path("missing"));
        let ledger = state.load(LedgerParams::default()).await?;
        assert!(ledger.store().accounts().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load() -> eyre::Result<()> {
        let state = StateFile::new(temp_path("save"));
        let ledger = state.load(LedgerParams::default()).await?;
        let alice = ledger.signup("alice", "alice@example.com", None)?;
        ledger.create_task(Amount::from_units(5)?, "https://example.com")?;
        state.save(&ledger).await?;

        let restored = state.load(LedgerParams::default()).await?;
        assert_eq!(restored.account(alice.id())?, alice);
        assert_eq!(restored.tasks()?.len(), 1);
        assert!(!fs::try_exists(state.path().with_extension("json.tmp")).await?);

        if let Some(dir) = state.path().parent() {
            fs::remove_dir_all(dir).await?;
        }
        Ok(())
    }
}
