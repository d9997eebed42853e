//! Media storage on the local filesystem
//!
//! Uploaded files are written under a single media directory and
//! referenced from the database by their path relative to it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::error::AppError;

/// Media storage service
pub struct MediaStorage {
    /// Directory all files live in
    root: PathBuf,
    /// Largest accepted upload
    max_upload_bytes: usize,
}

impl MediaStorage {
    /// Create the storage, making sure the media directory exists
    ///
    /// # Errors
    /// Returns error if the directory cannot be created
    pub async fn new(config: &crate::config::StorageConfig) -> Result<Self, AppError> {
        tokio::fs::create_dir_all(&config.media_dir)
            .await
            .map_err(|e| {
                AppError::Storage(format!(
                    "failed to create media directory {}: {}",
                    config.media_dir.display(),
                    e
                ))
            })?;

        Ok(Self {
            root: config.media_dir.clone(),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Store an uploaded file
    ///
    /// The client-supplied name is reduced to its last path component.
    /// If that name is taken, a numeric suffix is appended:
    /// `cat.png`, `cat (1).png`, `cat (2).png`, ...
    ///
    /// # Returns
    /// Path of the stored file relative to the media directory
    ///
    /// # Errors
    /// `BadRequest` when the file is rejected, `Storage` on I/O failure
    pub async fn save(&self, file_name: Option<&str>, data: &[u8]) -> Result<String, AppError> {
        let file_name = file_name
            .and_then(sanitize_file_name)
            .ok_or_else(|| AppError::BadRequest("Uploaded file must have a file name".to_string()))?;

        if data.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        if data.len() > self.max_upload_bytes {
            return Err(AppError::BadRequest(format!(
                "File too large: exceeds {} bytes",
                self.max_upload_bytes
            )));
        }

        let (stem, extension) = split_file_name(&file_name);
        let mut counter = 0u32;

        loop {
            let candidate = numbered_file_name(stem, extension, counter);
            let path = self.root.join(&candidate);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(data)
                        .await
                        .map_err(|e| AppError::Storage(format!("media write failed: {}", e)))?;
                    file.flush()
                        .await
                        .map_err(|e| AppError::Storage(format!("media write failed: {}", e)))?;

                    tracing::info!(path = %candidate, bytes = data.len(), "Media stored");
                    return Ok(candidate);
                }
                Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                    counter += 1;
                }
                Err(error) => {
                    return Err(AppError::Storage(format!("media write failed: {}", error)));
                }
            }
        }
    }

    /// Delete a stored file
    ///
    /// Missing files are logged and ignored.
    pub async fn delete(&self, relative_path: &str) -> Result<(), AppError> {
        let Some(file_name) = sanitize_file_name(relative_path) else {
            tracing::warn!(path = %relative_path, "Refusing to delete media outside media directory");
            return Ok(());
        };

        match tokio::fs::remove_file(self.root.join(&file_name)).await {
            Ok(()) => {
                tracing::info!(path = %file_name, "Media file removed");
                Ok(())
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                tracing::warn!(path = %file_name, "Media file already gone");
                Ok(())
            }
            Err(error) => Err(AppError::Storage(format!("media delete failed: {}", error))),
        }
    }

    /// Absolute location of a stored file
    pub fn resolve(&self, relative_path: &str) -> PathBuf {
        self.root.join(relative_path)
    }
}

/// Last path component of a client-supplied name, if it is a usable file name
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw.trim()).file_name()?.to_str()?;
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

fn split_file_name(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => (stem, Some(extension)),
        _ => (name, None),
    }
}

fn numbered_file_name(stem: &str, extension: Option<&str>, counter: u32) -> String {
    match (counter, extension) {
        (0, Some(extension)) => format!("{}.{}", stem, extension),
        (0, None) => stem.to_string(),
        (n, Some(extension)) => format!("{} ({}).{}", stem, n, extension),
        (n, None) => format!("{} ({})", stem, n),
    }
}
