//! Server configuration module.
//!
//! One explicit [`ServerConfig`] struct replaces any notion of global
//! mutable state: the binary builds it once (file + CLI overrides) and hands
//! it to the store and server at construction time.
//!
//! ## Config File
//!
//! An optional `config.toml`, sparse — override just the values you want:
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! listen = "0.0.0.0:8000"   # Bind address (host:port)
//! data_dir = "data"         # Artifact root; uploads/ and gen/ live beneath it
//!
//! [preview]
//! max_edge = 1024           # Longest edge of generated previews, in pixels
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Service configuration loaded from `config.toml`.
///
/// All fields have defaults; user files need only specify overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address in `host:port` form.
    pub listen: String,
    /// Artifact root. Uploads land in `<data_dir>/uploads`, generated
    /// previews and derived images in `<data_dir>/gen`.
    pub data_dir: PathBuf,
    /// Preview generation settings.
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Longest edge of generated previews, in pixels.
    pub max_edge: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8000".to_string(),
            data_dir: PathBuf::from("data"),
            preview: PreviewConfig::default(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_edge: crate::imaging::DEFAULT_MAX_EDGE,
        }
    }
}

impl ServerConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen.parse::<SocketAddr>().map_err(|_| {
            ConfigError::Validation(format!(
                "listen must be a host:port address, got {:?}",
                self.listen
            ))
        })?;
        if self.preview.max_edge < 16 {
            return Err(ConfigError::Validation(format!(
                "preview.max_edge must be at least 16, got {}",
                self.preview.max_edge
            )));
        }
        Ok(())
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    pub fn gen_dir(&self) -> PathBuf {
        self.data_dir.join("gen")
    }
}
