//! Persisted client session.
//!
//! The browser build of SampleShare keeps the bearer token and the cached
//! role in local storage under `auth_token` / `auth_role`. This module is the
//! CLI analog: both keys live together in one JSON document under the data
//! directory. They are written together and cleared together, never
//! independently.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const SESSION_FILE: &str = "session.json";

/// On-disk session document. Field names are the storage keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    auth_token: Option<String>,
    #[serde(default)]
    auth_role: Option<String>,
}

/// Holds the opaque bearer credential and the role cached at login time.
///
/// Survives across invocations via the session file; cleared on logout or
/// when the server signals the credential invalid.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    token: Option<String>,
    role: Option<String>,
}

impl SessionStore {
    /// Load the session from `data_dir`, creating the directory if needed.
    ///
    /// A missing or unreadable session file yields an empty session rather
    /// than an error: a corrupt credential is treated as no credential.
    pub fn load(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        let path = data_dir.join(SESSION_FILE);

        let file = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<SessionFile>(&content) {
                Ok(file) => file,
                Err(e) => {
                    warn!(error = %e, "Session file is corrupt, starting unauthenticated");
                    SessionFile::default()
                }
            },
            Err(_) => SessionFile::default(),
        };

        Ok(Self {
            path,
            token: file.auth_token,
            role: file.auth_role,
        })
    }

    /// The held bearer credential, if any.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// The role string cached at login time, if any.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Store a new credential and cached role, persisting both.
    pub fn set(&mut self, token: String, role: Option<String>) -> Result<()> {
        self.token = Some(token);
        self.role = role;
        self.persist()
    }

    /// Drop the credential and cached role together and remove the file.
    pub fn clear(&mut self) -> Result<()> {
        self.token = None;
        self.role = None;
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file: {}", self.path.display()))?;
        }
        debug!("Session cleared");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let file = SessionFile {
            auth_token: self.token.clone(),
            auth_role: self.role.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;
        debug!("Session persisted to {}", self.path.display());
        Ok(())
    }
}
