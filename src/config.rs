//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default maximum size of an uploaded image (25 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Upload storage configuration
    pub uploads: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Upload storage configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory uploaded images are written into
    pub dir: PathBuf,
    /// Maximum accepted image size in bytes
    pub max_bytes: usize,
    /// How stored file names are derived from client file names
    pub naming: StorageNaming,
}

/// Policy for turning a client-supplied filename into a storage name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageNaming {
    /// Keep the client name after stripping directories and unsafe characters
    #[default]
    Sanitized,
    /// Ignore the client name and use a random UUID (keeping the extension)
    Generated,
}

impl FromStr for StorageNaming {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sanitized" | "sanitize" => Ok(StorageNaming::Sanitized),
            "generated" | "uuid" => Ok(StorageNaming::Generated),
            other => Err(format!("unknown upload naming policy: {}", other)),
        }
    }
}

impl fmt::Display for StorageNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageNaming::Sanitized => f.write_str("sanitized"),
            StorageNaming::Generated => f.write_str("generated"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            uploads: UploadConfig {
                dir: env::var_os("UPLOAD_DIR")
                    .filter(|d| !d.is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("uploads")),
                max_bytes: env::var("MAX_UPLOAD_BYTES")
                    .ok()
                    .and_then(|b| b.parse().ok())
                    .filter(|b| *b > 0)
                    .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
                naming: env::var("UPLOAD_NAMING")
                    .ok()
                    .and_then(|n| match n.parse() {
                        Ok(naming) => Some(naming),
                        Err(e) => {
                            tracing::warn!("Ignoring UPLOAD_NAMING: {}", e);
                            None
                        }
                    })
                    .unwrap_or_default(),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
