//! Storage backends for uploaded media bytes.
//!
//! Only the filesystem backend is implemented. Files are stored flat under
//! the upload directory using the upload id as file name and served by the
//! HTTP layer under [`defaults::MEDIA_PUBLIC_PATH`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use hedgedoc_core::{defaults, BackendType, Error, MediaBackend, MediaUpload, Result};

/// Filesystem media backend.
pub struct FilesystemBackend {
    upload_path: PathBuf,
    base_url: String,
}

impl FilesystemBackend {
    /// Create a backend writing to `upload_path` and building URLs from `base_url`.
    pub fn new(upload_path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            upload_path: upload_path.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn upload_path(&self) -> &Path {
        &self.upload_path
    }

    /// Public URL of a stored file.
    pub fn file_url(&self, file_name: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            defaults::MEDIA_PUBLIC_PATH,
            file_name
        )
    }

    fn full_path(&self, file_name: &str) -> Result<PathBuf> {
        if !MediaUpload::is_valid_id(file_name) {
            return Err(Error::MediaBackend(format!(
                "Refusing to touch unexpected file name '{}'",
                file_name
            )));
        }
        Ok(self.upload_path.join(file_name))
    }

    /// Round-trip a probe file so storage problems surface at startup.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let probe = self.upload_path.join(".health-check");

        fs::create_dir_all(&self.upload_path)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", self.upload_path, e))?;

        let data = b"media-health-check";
        fs::write(&probe, data)
            .await
            .map_err(|e| format!("write({:?}): {}", probe, e))?;

        let read_back = fs::read(&probe)
            .await
            .map_err(|e| format!("read({:?}): {}", probe, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&probe)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", probe, e))?;
        Ok(())
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> std::io::Result<()> {
        fs::create_dir_all(&self.upload_path).await?;

        let temp_path = path.with_extension("tmp");
        if let Err(e) = Self::write_and_rename(&temp_path, path, data).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(
                        subsystem = "media",
                        component = "filesystem",
                        path = %temp_path.display(),
                        error = %cleanup,
                        "Could not remove partial media file"
                    );
                }
            }
            return Err(e);
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await?;
        }
        Ok(())
    }

    async fn write_and_rename(temp_path: &Path, path: &Path, data: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(temp_path, path).await
    }
}

#[async_trait]
impl MediaBackend for FilesystemBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Filesystem
    }

    async fn save_file(&self, buffer: &[u8], file_name: &str) -> Result<(String, Option<String>)> {
        let path = self.full_path(file_name)?;
        debug!(
            subsystem = "media",
            component = "filesystem",
            op = "save",
            media_id = %file_name,
            size_bytes = buffer.len(),
            "Writing media file"
        );

        self.write_atomic(&path, buffer).await.map_err(|e| {
            warn!(
                subsystem = "media",
                component = "filesystem",
                path = %path.display(),
                error = %e,
                "Media write failed"
            );
            Error::MediaBackend(format!("Could not save '{}'", path.display()))
        })?;

        Ok((self.file_url(file_name), None))
    }

    async fn delete_file(&self, file_name: &str, _backend_data: Option<&str>) -> Result<()> {
        let path = self.full_path(file_name)?;
        fs::remove_file(&path).await.map_err(|e| {
            warn!(
                subsystem = "media",
                component = "filesystem",
                path = %path.display(),
                error = %e,
                "Media delete failed"
            );
            Error::MediaBackend(format!("Could not delete '{}'", path.display()))
        })?;
        debug!(
            subsystem = "media",
            component = "filesystem",
            op = "delete",
            media_id = %file_name,
            "Media file removed"
        );
        Ok(())
    }
}
