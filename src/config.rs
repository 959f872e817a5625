use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default control socket path; overridable via config or `--socket`.
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/muxpick.sock";

/// Default port fzf listens on for live header/content updates.
pub const DEFAULT_PICKER_PORT: u16 = 6266;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picker_port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub path: String,
    /// How many levels of subdirectories to offer beneath this root.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub depth: u32,
}

fn is_zero(depth: &u32) -> bool {
    *depth == 0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directories: vec![
                DirectoryConfig {
                    path: "$HOME/.config".to_string(),
                    depth: 1,
                },
                DirectoryConfig {
                    path: "$HOME/Documents".to_string(),
                    depth: 1,
                },
                DirectoryConfig {
                    path: "$HOME/Desktop".to_string(),
                    depth: 0,
                },
            ],
            socket: None,
            picker_port: None,
        }
    }
}

impl Config {
    /// Load the config, creating a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Config::default();
            // Best effort: a read-only config dir still yields a usable default.
            if let Err(err) = config.save_to(path) {
                warn!(%err, "could not write default configuration");
            }
            return Ok(config);
        }
        Self::from_file(path)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn socket_path(&self) -> PathBuf {
        self.socket
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOCKET_PATH))
    }

    pub fn picker_port(&self) -> u16 {
        self.picker_port.unwrap_or(DEFAULT_PICKER_PORT)
    }

    pub fn add_directory(&mut self, path: &str, depth: u32) -> anyhow::Result<()> {
        if self.directories.iter().any(|d| d.path == path) {
            bail!("directory {} already exists in configuration", path);
        }
        self.directories.push(DirectoryConfig {
            path: path.to_string(),
            depth,
        });
        Ok(())
    }

    pub fn remove_directory(&mut self, path: &str) -> anyhow::Result<()> {
        let before = self.directories.len();
        self.directories.retain(|d| d.path != path);
        if self.directories.len() == before {
            bail!("directory {} not found in configuration", path);
        }
        Ok(())
    }
}

/// Config file location: `$XDG_CONFIG_HOME/muxpick.yaml`, falling back to
/// `~/.config/muxpick.yaml`.
pub fn config_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("muxpick.yaml")
}
