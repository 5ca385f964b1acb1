//! Standard paths used by vaultget

use std::path::PathBuf;

/// Name of the encrypted keyring file inside the data directory
pub const KEYRING_FILE: &str = "keyring.age";

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE: &str = "config.json";

/// Standard vaultget paths
pub struct Paths {
    /// Data directory (~/.local/share/vaultget)
    pub data: PathBuf,
    /// Config directory (~/.config/vaultget)
    pub config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("vaultget");

        let config = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultget");

        Self { data, config }
    }

    /// Paths rooted somewhere other than the user's home (tests, portable installs)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            data: root.join("data"),
            config: root.join("config"),
        }
    }

    /// Default location of the encrypted keyring
    pub fn keyring(&self) -> PathBuf {
        self.data.join(KEYRING_FILE)
    }

    /// Location of the configuration file
    pub fn config_file(&self) -> PathBuf {
        self.config.join(CONFIG_FILE)
    }
}
