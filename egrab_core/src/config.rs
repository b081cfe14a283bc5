use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::types::{AuthenticationInfo, DownloadError};

/// Default connect timeout for engine requests, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Settings captured by every download context at pipeline start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Directory holding engine executables.
    pub exe_bin_path: PathBuf,
    /// Where payloads are written and archives unpacked.
    pub temp_dir: PathBuf,
    /// Label shown before any engine has produced data.
    pub default_engine: String,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    /// Extra headers sent with every engine request.
    pub headers: HashMap<String, Vec<String>>,
    pub authentication: Option<AuthenticationInfo>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let temp_dir = std::env::temp_dir().join("egrab");
        Self {
            exe_bin_path: temp_dir.join("bin"),
            temp_dir,
            default_engine: String::new(),
            user_agent: format!("egrab/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            headers: HashMap::new(),
            authentication: None,
        }
    }
}

impl NetworkConfig {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            ..Self::default()
        }
    }

    /// Loads a config from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, DownloadError> {
        let raw = std::fs::read_to_string(path).map_err(DownloadError::Disk)?;
        serde_json::from_str(&raw)
            .map_err(|e| DownloadError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn with_exe_bin_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exe_bin_path = path.into();
        self
    }

    pub fn with_default_engine(mut self, name: impl Into<String>) -> Self {
        self.default_engine = name.into();
        self
    }

    pub fn add_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .entry(key.into())
            .or_insert_with(Vec::new)
            .push(value.into());
        self
    }

    pub fn with_authentication(mut self, auth: AuthenticationInfo) -> Self {
        self.authentication = Some(auth);
        self
    }
}
