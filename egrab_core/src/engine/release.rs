use serde::Deserialize;

/// GitHub-style release manifest. Only the fields the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseManifest {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

impl ReleaseManifest {
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    /// First asset whose name contains `pattern`.
    pub fn select_asset(&self, pattern: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.contains(pattern))
    }
}
