//! Daemon configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/chunkserve/server.toml`
//! - Windows: `%APPDATA%/chunkserve/server.toml`

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory the served files live in. Every requestable file must
    /// be a direct child of this directory.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    /// WebSocket server port (0 = auto-assign).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Chunk size in bytes. Must match what clients expect; the protocol
    /// carries no negotiation, and changing it breaks resumption of
    /// transfers that started under the old size.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

fn default_storage_root() -> String {
    "./server-files".into()
}

fn default_port() -> u16 {
    8080
}

fn default_chunk_size() -> u64 {
    chunkserve_transfer::DEFAULT_CHUNK_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            port: default_port(),
            chunk_size: default_chunk_size(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        let path = config_path()?;

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Saves the current configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("chunkserve")
            .join("server.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("chunkserve").join("server.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/chunkserve/server.toml"))
    }
}
