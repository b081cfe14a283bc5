use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("no candidate available")]
    NoCandidate,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server responded with {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("disk error: {0}")]
    Disk(std::io::Error),

    #[error("failed to extract archive: {0}")]
    Extraction(String),

    #[error("failed to resolve release: {0}")]
    Release(String),

    #[error("download cancelled")]
    Cancelled,

    #[error("task failed: {0}")]
    Task(String),
}

impl DownloadError {
    /// Whether the pipeline should abandon the current candidate and try the
    /// next one. Extraction failures and cancellation are always terminal.
    pub fn is_fallthrough(&self) -> bool {
        matches!(
            self,
            DownloadError::NoCandidate
                | DownloadError::Network(_)
                | DownloadError::HttpStatus { .. }
                | DownloadError::Disk(_)
                | DownloadError::Release(_)
        )
    }
}

/// Identity of a successful response, captured once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadMetadata {
    pub size: u64,
    pub url: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowVersionInfo {
    pub show: bool,
    pub set_after_downloading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationInfo {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderData {
    pub url: String,
    pub headers: HashMap<String, Vec<String>>,
    pub authentication: Option<AuthenticationInfo>,
}

/// Terminal outcome of one top-level download.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub success: bool,
    pub message: String,
    pub request_id: u64,
    pub engine_name: String,
    /// Written file, present once a candidate produced data.
    pub file_path: Option<PathBuf>,
    /// Executable the engine provides, resolved against `exe_bin_path`.
    pub exe_path: Option<PathBuf>,
    pub show_version_info: ShowVersionInfo,
}

/// Bytes written for the active candidate.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub request_id: u64,
    pub engine_name: String,
    pub bytes_delta: u64,
    pub total_bytes: Option<u64>,
}
