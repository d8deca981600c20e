//! JSON-file persistence for [`NotifyState`].

use std::path::{Path, PathBuf};

use super::NotifyState;
use crate::error::Result;

/// Reads and writes the notification state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data dir>/pagewatch/state.json`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pagewatch")
            .join("state.json")
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the state, or `None` if no cycle has recorded one yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<NotifyState>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Saves the state, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, state: &NotifyState) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(dir).await?;
        }

        let contents = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&self.path, contents).await?;

        tracing::debug!(path = %self.path.display(), decision = %state.last_decision, "State saved");
        Ok(())
    }
}
