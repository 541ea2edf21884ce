//! Uploaded resume files on local disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// Flat directory of uploaded files. Stored names are generated, never taken from
/// the client, so concurrent uploads cannot collide.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<uuid>-<unix millis><extension>`
    pub fn unique_name(extension: &str) -> String {
        format!(
            "{}-{}{}",
            Uuid::new_v4(),
            Utc::now().timestamp_millis(),
            extension
        )
    }

    /// Resolves a stored name inside the root. Anything other than a bare file
    /// name is rejected.
    pub fn path_for(&self, name: &str) -> Result<PathBuf, AppError> {
        let file_name = Path::new(name)
            .file_name()
            .filter(|f| *f == std::ffi::OsStr::new(name))
            .ok_or_else(|| AppError::Storage(format!("invalid stored file name '{name}'")))?;
        Ok(self.root.join(file_name))
    }

    pub async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| AppError::Storage(format!("create {}: {e}", self.root.display())))?;

        let path = self.path_for(name)?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {e}", path.display())))?;

        info!("Stored upload {name} ({} bytes)", bytes.len());
        Ok(path)
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, AppError> {
        let path = self.path_for(name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(AppError::not_found("File")),
            Err(e) => Err(AppError::Storage(format!("read {}: {e}", path.display()))),
        }
    }

    /// A file that is already gone counts as removed.
    pub async fn remove(&self, name: &str) -> Result<(), AppError> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Removed upload {name}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Upload {name} was already missing");
                Ok(())
            }
            Err(e) => Err(AppError::Storage(format!("remove {}: {e}", path.display()))),
        }
    }
}
