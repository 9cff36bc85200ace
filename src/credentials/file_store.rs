//! credentials::file_store
//!
//! File-based credential storage.
//!
//! # Security
//!
//! - Entries are stored in `~/.settings-sync/credentials.toml`
//! - File permissions are set to 0600 on Unix (owner read/write only)
//! - All writes are atomic (write to temp file, then rename)
//! - Secrets are NEVER logged, printed, or included in error messages

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde::{Deserialize, Serialize};

use super::traits::{CredentialError, CredentialStore, Credentials};

/// On-disk shape of one credential entry.
#[derive(Debug, Serialize, Deserialize)]
struct StoredEntry {
    username: String,
    secret: String,
}

/// Credential store backed by a TOML file.
///
/// The default store when no OS keychain is available. Entries are keyed
/// by remote URL.
///
/// # Security Considerations
///
/// - On Unix, file permissions are set to 0600 (owner read/write only)
/// - Writes are atomic (write to temp file, then rename)
/// - Secrets are never included in error messages or logs
#[derive(Debug)]
pub struct FileCredentialStore {
    /// Path to the credentials file
    path: PathBuf,
}

impl FileCredentialStore {
    /// Create a file store at the default location,
    /// `~/.settings-sync/credentials.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, CredentialError> {
        let home = dirs::home_dir()
            .ok_or_else(|| CredentialError::ReadError("cannot determine home directory".into()))?;
        let path = home.join(".settings-sync").join("credentials.toml");
        Ok(Self { path })
    }

    /// Create a file store at a custom path. Primarily useful for testing.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The path to the credentials file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_entries(&self) -> Result<HashMap<String, StoredEntry>, CredentialError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| CredentialError::ReadError(format!("cannot read credentials file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| CredentialError::ReadError(format!("cannot parse credentials file: {}", e)))
    }

    /// Write entries with atomic rename and restrictive permissions.
    fn write_entries(&self, entries: &HashMap<String, StoredEntry>) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| CredentialError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(entries)
            .map_err(|e| CredentialError::WriteError(format!("cannot serialize credentials: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");

        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| {
                    CredentialError::WriteError(format!("cannot create temp file: {}", e))
                })?;

            // Restrict permissions BEFORE writing content (Unix only)
            #[cfg(unix)]
            {
                let permissions = fs::Permissions::from_mode(0o600);
                file.set_permissions(permissions).map_err(|e| {
                    CredentialError::WriteError(format!("cannot set permissions: {}", e))
                })?;
            }

            file.write_all(content.as_bytes())
                .map_err(|e| CredentialError::WriteError(format!("cannot write credentials: {}", e)))?;

            file.sync_all()
                .map_err(|e| CredentialError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| CredentialError::WriteError(format!("cannot rename temp file: {}", e)))?;

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn lookup(&self, remote_url: &str) -> Result<Option<Credentials>, CredentialError> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(remote_url)
            .map(|e| Credentials::new(e.username.clone(), e.secret.clone())))
    }

    fn save(&self, remote_url: &str, credentials: &Credentials) -> Result<(), CredentialError> {
        let mut entries = self.read_entries()?;
        entries.insert(
            remote_url.to_string(),
            StoredEntry {
                username: credentials.username().to_string(),
                secret: credentials.secret().to_string(),
            },
        );
        self.write_entries(&entries)
    }

    fn erase(&self, remote_url: &str) -> Result<(), CredentialError> {
        let mut entries = self.read_entries()?;
        entries.remove(remote_url);
        self.write_entries(&entries)
    }
}
