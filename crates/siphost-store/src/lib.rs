//! Credential and domain persistence for the registration form.
//!
//! Presentation surfaces read the store when showing the registration
//! form and write it back after a successful registration. The session
//! host core never touches it. Writes use an atomic `.tmp` + rename so
//! a crash never leaves a half-written settings file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use siphost_ipc::{Credentials, Domain};

/// Errors from loading or saving the settings file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the settings file failed.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the settings file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("malformed settings file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// On-disk settings payload: the last used registrar domain and
/// credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    pub domain: Option<Domain>,
    pub credentials: Option<Credentials>,
}

/// Path to the settings JSON, rooted at `home`.
///
/// `~/.siphost/settings.json`
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".siphost").join("settings.json")
}

/// A JSON-backed settings store at a fixed path.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored settings. A missing file yields empty settings.
    pub fn load(&self) -> Result<StoredSettings, StoreError> {
        if !self.path.exists() {
            return Ok(StoredSettings::default());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| StoreError::Read {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Persist the settings, replacing any previous content.
    pub fn save(&self, settings: &StoredSettings) -> Result<(), StoreError> {
        let write_err = |e| StoreError::Write {
            path: self.path.clone(),
            source: e,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
