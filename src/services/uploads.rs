//! Upload storage service
//!
//! Writes uploaded medical images into a single configured directory.
//! Client filenames are never used as paths directly: they are reduced to
//! a safe storage name first (or replaced by a generated one).

use crate::config::{StorageNaming, UploadConfig};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Longest storage name we produce, in bytes
const MAX_FILE_NAME_LEN: usize = 255;

/// Extension used for generated names when the client name has none
const FALLBACK_EXTENSION: &str = "bin";

/// Errors that can occur while storing an upload
#[derive(Error, Debug)]
pub enum StorageError {
    /// The upload directory could not be created
    #[error("failed to create upload directory {}: {source}", .path.display())]
    CreateDir {
        /// Directory that was being created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file could not be written
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Target file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// A file that was written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Name of the file inside the upload directory
    pub file_name: String,
    /// Full path of the written file
    pub path: PathBuf,
    /// Number of bytes written
    pub size: usize,
}

/// Upload directory plus naming policy
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    naming: StorageNaming,
}

impl UploadStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>, naming: StorageNaming) -> Self {
        Self {
            root: root.into(),
            naming,
        }
    }

    /// Create a store from upload configuration
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(config.dir.clone(), config.naming)
    }

    /// The upload directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_root(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: self.root.clone(),
                source,
            })
    }

    /// Storage name for a client-supplied filename under this store's policy
    pub fn storage_name(&self, client_name: &str) -> String {
        match self.naming {
            StorageNaming::Sanitized => {
                sanitize_file_name(client_name).unwrap_or_else(|| generated_name(client_name))
            }
            StorageNaming::Generated => generated_name(client_name),
        }
    }

    /// Write `data` under the storage name derived from `client_name`
    ///
    /// An existing file with the same storage name is overwritten.
    pub async fn save(&self, client_name: &str, data: &[u8]) -> Result<StoredUpload, StorageError> {
        let file_name = self.storage_name(client_name);
        let path = self.root.join(&file_name);

        if file_name != client_name {
            debug!(
                client_name = %client_name,
                stored_name = %file_name,
                "Renamed upload for storage"
            );
        }

        let write_err = |source| StorageError::Write {
            path: path.clone(),
            source,
        };

        let mut file = fs::File::create(&path).await.map_err(write_err)?;
        file.write_all(data).await.map_err(write_err)?;
        file.sync_all().await.map_err(write_err)?;

        info!(
            "Saved uploaded image: {} ({} bytes)",
            path.display(),
            data.len()
        );

        Ok(StoredUpload {
            file_name,
            path,
            size: data.len(),
        })
    }
}

/// Reduce a client filename to a safe single path component
///
/// Keeps the last component (`/` and `\` both separate), replaces anything
/// outside `[A-Za-z0-9._-]` with `_` and strips leading dots. Returns `None`
/// when nothing usable is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let last = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut cleaned = cleaned.trim_start_matches('.').to_string();
    // ASCII only at this point, so any byte index is a char boundary.
    if cleaned.len() > MAX_FILE_NAME_LEN {
        match cleaned.rfind('.') {
            Some(dot) if cleaned.len() - dot < MAX_FILE_NAME_LEN => {
                let extension = cleaned.split_off(dot);
                cleaned.truncate(MAX_FILE_NAME_LEN - extension.len());
                cleaned.push_str(&extension);
            }
            _ => cleaned.truncate(MAX_FILE_NAME_LEN),
        }
    }

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// `<uuid>.<ext>`, keeping the sanitized extension of the client name
fn generated_name(client_name: &str) -> String {
    let extension = sanitize_file_name(client_name)
        .and_then(|name| {
            Path::new(&name)
                .extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| !ext.is_empty())
                .map(|ext| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    format!("{}.{}", uuid::Uuid::new_v4(), extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_plain_name() {
        assert_eq!(sanitize_file_name("scan.png").as_deref(), Some("scan.png"));
        assert_eq!(
            sanitize_file_name("CT_head-01.dcm").as_deref(),
            Some("CT_head-01.dcm")
        );
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(
            sanitize_file_name("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_file_name("C:\\Users\\me\\x-ray.jpg").as_deref(),
            Some("x-ray.jpg")
        );
        assert_eq!(sanitize_file_name("/abs/path/").as_deref(), None);
    }

    #[test]
    fn test_sanitize_replaces_unsafe_characters() {
        assert_eq!(
            sanitize_file_name("chest scan (1).png").as_deref(),
            Some("chest_scan__1_.png")
        );
        assert_eq!(sanitize_file_name("röntgen.png").as_deref(), Some("r_ntgen.png"));
    }

    #[test]
    fn test_sanitize_rejects_dot_names() {
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("."), None);
        assert_eq!(sanitize_file_name(""), None);
        assert_eq!(sanitize_file_name(".bashrc").as_deref(), Some("bashrc"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let long = format!("{}.png", "a".repeat(400));
        let cleaned = sanitize_file_name(&long).unwrap();
        assert_eq!(cleaned.len(), MAX_FILE_NAME_LEN);
        assert!(cleaned.ends_with(".png"), "{cleaned}");
        assert!(cleaned.starts_with("aaaa"));

        // An extension as long as the cap itself is cut like any other text.
        let long_ext = format!("scan.{}", "b".repeat(400));
        let cleaned = sanitize_file_name(&long_ext).unwrap();
        assert_eq!(cleaned.len(), MAX_FILE_NAME_LEN);
        assert!(cleaned.starts_with("scan."));
    }

    #[test]
    fn test_generated_names() {
        let store = UploadStore::new("unused", StorageNaming::Generated);
        let name = store.storage_name("Scan.PNG");
        assert!(name.ends_with(".png"), "{name}");
        assert_eq!(name.len(), 36 + ".png".len());
        assert_ne!(name, store.storage_name("Scan.PNG"));

        assert!(store.storage_name("noext").ends_with(".bin"));
    }

    #[test]
    fn test_sanitized_policy_falls_back_to_generated() {
        let store = UploadStore::new("unused", StorageNaming::Sanitized);
        assert_eq!(store.storage_name("scan.png"), "scan.png");
        assert!(store.storage_name("..").ends_with(".bin"));
    }

    #[tokio::test]
    async fn test_save_writes_bytes() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let store = UploadStore::new(temp_dir.path(), StorageNaming::Sanitized);
        let data = b"\x89PNG\r\n\x1a\nrest";

        let stored = store.save("scan.png", data).await.expect("save failed");

        assert_eq!(stored.file_name, "scan.png");
        assert_eq!(stored.path, temp_dir.path().join("scan.png"));
        assert_eq!(stored.size, data.len());
        assert_eq!(std::fs::read(&stored.path).unwrap(), data);
    }

    #[tokio::test]
    async fn test_save_overwrites_existing() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let store = UploadStore::new(temp_dir.path(), StorageNaming::Sanitized);

        store.save("scan.png", b"first version").await.unwrap();
        let stored = store.save("scan.png", b"second").await.unwrap();

        assert_eq!(std::fs::read(&stored.path).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_save_traversal_stays_in_root() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().join("uploads");
        let store = UploadStore::new(&root, StorageNaming::Sanitized);
        store.ensure_root().await.unwrap();

        let stored = store.save("../escape.txt", b"x").await.unwrap();

        assert_eq!(stored.path, root.join("escape.txt"));
        assert!(!temp_dir.path().join("escape.txt").exists());
    }

    #[tokio::test]
    async fn test_ensure_root_creates_nested_dirs() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let root = temp_dir.path().join("a").join("b");
        let store = UploadStore::new(&root, StorageNaming::Sanitized);

        store.ensure_root().await.expect("ensure_root failed");
        assert!(root.is_dir());
        // Idempotent
        store.ensure_root().await.expect("second ensure_root failed");
    }

    #[tokio::test]
    async fn test_save_into_missing_root_fails() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let store = UploadStore::new(temp_dir.path().join("missing"), StorageNaming::Sanitized);

        let result = store.save("scan.png", b"x").await;
        match result {
            Err(StorageError::Write { path, .. }) => {
                assert!(path.ends_with("missing/scan.png"));
            }
            other => panic!("Expected Write error, got: {:?}", other),
        }
    }
}
