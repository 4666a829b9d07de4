//! CLI configuration.
//!
//! Stored as TOML at `~/.config/chunkfs/config.toml` unless `--config`
//! points elsewhere. A default file is written on first use.

use std::path::{Path, PathBuf};

use chunkfs_stream::FsConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the local chunk store.
    #[serde(default = "default_store_root")]
    pub store_root: PathBuf,

    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Settings passed to the filesystem layer.
    #[serde(default)]
    pub fs: FsConfig,
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()))
}

fn default_store_root() -> PathBuf {
    home_dir().join(".local").join("share").join("chunkfs")
}

fn default_log_filter() -> String {
    "info".into()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: default_store_root(),
            log_filter: default_log_filter(),
            fs: FsConfig::default(),
        }
    }
}

impl Config {
    /// Loads `path` (or the default location), creating a default file if
    /// none exists.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map_or_else(config_path, Path::to_path_buf);

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            config.fs.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }
}

fn config_path() -> PathBuf {
    home_dir().join(".config").join("chunkfs").join("config.toml")
}
