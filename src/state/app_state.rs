// Application state
// Configuration and upload storage, shared read-only across requests

use crate::config::Config;
use crate::services::uploads::UploadStore;
use std::sync::Arc;

/// State handed to every handler
///
/// Cloning is cheap; nothing in here is mutated after startup, so no lock
/// is needed.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// Where uploaded images are written
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    /// Build state from configuration, deriving the upload store from it
    pub fn new(config: Config) -> Self {
        let uploads = UploadStore::from_config(&config.uploads);
        Self {
            config: Arc::new(config),
            uploads: Arc::new(uploads),
        }
    }

    /// Maximum accepted image size in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.config.uploads.max_bytes
    }
}
