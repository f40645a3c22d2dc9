//! Local storage for provider logos
//!
//! Files are written under the configured directory with a generated
//! `<uuid>.<ext>` name; the value stored in `logo_location` is the public
//! path (`/uploads/<name>`) that the static file route serves.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::UploadConfig;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes uploaded logos to disk
#[derive(Debug, Clone)]
pub struct LogoStorage {
    directory: PathBuf,
    public_prefix: String,
    max_bytes: usize,
}

impl LogoStorage {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            public_prefix: config.public_prefix.trim_end_matches('/').to_string(),
            max_bytes: config.max_bytes,
        }
    }

    pub fn directory(&self) -> &PathBuf {
        &self.directory
    }

    /// URL prefix without a trailing slash
    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Persist `bytes` and return the public location
    pub async fn store(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String, StorageError> {
        if bytes.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }

        let file_name = match original_name.and_then(extension) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.directory.join(&file_name);
        write_or_discard(&path, bytes).await?;

        info!(file = %file_name, size = bytes.len(), "Stored provider logo");
        Ok(self.public_location(&file_name))
    }

    /// Public path with forward slashes regardless of platform
    pub fn public_location(&self, file_name: &str) -> String {
        format!("{}/{}", self.public_prefix, file_name).replace('\\', "/")
    }

    /// Remove a stored file by its public location; unknown locations are ignored
    pub async fn remove(&self, location: &str) {
        let Some(name) = location
            .strip_prefix(&self.public_prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
        else {
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.directory.join(name)).await {
            debug!(file = %name, error = %e, "Could not remove stored logo");
        }
    }
}

/// Write `bytes` to `path`, removing whatever was written when the write fails
async fn write_or_discard(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    if let Err(e) = tokio::fs::write(path, bytes).await {
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            debug!(path = %path.display(), error = %cleanup, "No partial upload to remove");
        }
        return Err(e.into());
    }
    Ok(())
}

/// Lower-cased extension when it is short and alphanumeric
fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
