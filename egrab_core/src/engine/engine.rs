use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::types::DownloadError;

/// Where an engine's artifact can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadSource {
    /// The artifact is served directly at `url`.
    Direct { url: String },
    /// A JSON release manifest lists the assets; the first asset whose name
    /// contains `asset` is downloaded.
    Release { manifest_url: String, asset: String },
}

/// A named remote source able to produce a download URL.
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// `None` when the engine has nothing to offer on this platform.
    fn download_source(&self) -> Option<DownloadSource>;

    /// Executable the artifact provides, if the engine shells out.
    fn exe_name(&self) -> Option<&str> {
        None
    }
}

/// Engine described entirely by data, as found in an engine catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticEngine {
    pub name: String,
    #[serde(default)]
    pub source: Option<DownloadSource>,
    #[serde(default)]
    pub exe_name: Option<String>,
}

impl StaticEngine {
    pub fn direct(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: Some(DownloadSource::Direct { url: url.into() }),
            exe_name: None,
        }
    }

    pub fn release(
        name: impl Into<String>,
        manifest_url: impl Into<String>,
        asset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: Some(DownloadSource::Release {
                manifest_url: manifest_url.into(),
                asset: asset.into(),
            }),
            exe_name: None,
        }
    }

    /// An engine with no download source.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            exe_name: None,
        }
    }

    pub fn with_exe_name(mut self, exe_name: impl Into<String>) -> Self {
        self.exe_name = Some(exe_name.into());
        self
    }
}

impl Engine for StaticEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn download_source(&self) -> Option<DownloadSource> {
        self.source.clone()
    }

    fn exe_name(&self) -> Option<&str> {
        self.exe_name.as_deref()
    }
}

/// Reads a JSON array of [`StaticEngine`]s, preserving catalog order.
pub fn load_catalog(path: &Path) -> Result<Vec<Arc<dyn Engine>>, DownloadError> {
    let raw = fs::read_to_string(path).map_err(DownloadError::Disk)?;
    parse_catalog(&raw).map_err(|e| DownloadError::Config(format!("{}: {}", path.display(), e)))
}

pub fn parse_catalog(raw: &str) -> Result<Vec<Arc<dyn Engine>>, serde_json::Error> {
    let engines: Vec<StaticEngine> = serde_json::from_str(raw)?;
    Ok(engines
        .into_iter()
        .map(|e| Arc::new(e) as Arc<dyn Engine>)
        .collect())
}
