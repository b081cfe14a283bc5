use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::config::NetworkConfig;
use crate::engine::engine::Engine;
use crate::engine::engine_iterator::EngineIterator;
use crate::types::types::{DownloadError, DownloadMetadata, ShowVersionInfo};

/// Write buffer in front of the output file.
const WRITE_BUFFER_SIZE: usize = 256 * 1024;

/// Suffix for payloads that are not archives until the caller renames them.
const TMP_SUFFIX: &str = ".tmp";

/// Archive detection is by name only: a `.zip` suffix or a `.tar.` infix.
pub fn is_archive_name(file_name: &str) -> bool {
    file_name.ends_with(".zip") || file_name.contains(".tar.")
}

/// State of one attempt against one engine candidate.
///
/// Owned by the pipeline for the whole attempt. Falling through to the next
/// candidate builds a fresh context that keeps only the iterator and the
/// configuration.
pub struct DownloadContext {
    iter: EngineIterator,
    exe_bin_path: PathBuf,
    temp_dir: PathBuf,
    default_engine: String,
    metadata: Option<DownloadMetadata>,
    file_path: Option<PathBuf>,
    is_archive: bool,
    network_error: Option<String>,
    file: Option<BufWriter<File>>,
    written: bool,
    show_version_info: ShowVersionInfo,
    request_id: u64,
}

impl DownloadContext {
    pub fn new(
        iter: EngineIterator,
        config: &NetworkConfig,
        request_id: u64,
        show_version_info: ShowVersionInfo,
    ) -> Self {
        Self {
            iter,
            exe_bin_path: config.exe_bin_path.clone(),
            temp_dir: config.temp_dir.clone(),
            default_engine: config.default_engine.clone(),
            metadata: None,
            file_path: None,
            is_archive: false,
            network_error: None,
            file: None,
            written: false,
            show_version_info,
            request_id,
        }
    }

    /// Records the response identity and derives `file_path` / `is_archive`.
    pub fn add(&mut self, metadata: DownloadMetadata) {
        self.is_archive = is_archive_name(&metadata.file_name);
        let file_name = if self.is_archive {
            metadata.file_name.clone()
        } else {
            format!("{}{}", metadata.file_name, TMP_SUFFIX)
        };
        self.file_path = Some(self.temp_dir.join(file_name));
        self.metadata = Some(metadata);
    }

    /// Removes any stale file at `file_path` and opens a fresh one.
    /// `add` must have been called first.
    pub async fn open_file(&mut self) -> Result<(), DownloadError> {
        let path = self.file_path.clone().ok_or_else(|| {
            DownloadError::Disk(std::io::Error::new(
                ErrorKind::InvalidInput,
                "output file opened before response metadata was recorded",
            ))
        })?;

        remove_if_exists(&path).await?;
        self.written = false;
        let file = File::create(&path).await.map_err(DownloadError::Disk)?;
        self.file = Some(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file));
        Ok(())
    }

    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), DownloadError> {
        let file = self.file.as_mut().ok_or_else(|| {
            DownloadError::Disk(std::io::Error::new(
                ErrorKind::NotConnected,
                "output file is not open",
            ))
        })?;
        file.write_all(chunk).await.map_err(DownloadError::Disk)
    }

    /// Flushes and closes the output file.
    pub async fn close_file(&mut self) -> Result<(), DownloadError> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(DownloadError::Disk)?;
            file.into_inner().sync_all().await.map_err(DownloadError::Disk)?;
            self.written = true;
        }
        Ok(())
    }

    /// Drops the open handle and deletes whatever was written so far.
    pub async fn discard_file(&mut self) {
        self.file = None;
        self.written = false;
        if let Some(path) = &self.file_path {
            if let Err(e) = remove_if_exists(path).await {
                log::warn!("[DownloadContext] failed to remove {}: {}", path.display(), e);
            }
        }
    }

    /// Reports the current candidate done and moves to the next one.
    ///
    /// Returns the context unchanged in `Err` when no candidate is left.
    pub fn fallthrough(mut self) -> Result<DownloadContext, DownloadContext> {
        if !self.iter.has_next() {
            return Err(self);
        }
        self.iter.report_done();
        Ok(DownloadContext {
            iter: self.iter.next(),
            exe_bin_path: self.exe_bin_path,
            temp_dir: self.temp_dir,
            default_engine: self.default_engine,
            metadata: None,
            file_path: None,
            is_archive: false,
            network_error: None,
            file: None,
            written: false,
            show_version_info: self.show_version_info,
            request_id: self.request_id,
        })
    }

    /// Called once for the terminal candidate.
    pub fn report_done(&mut self) {
        self.iter.report_done();
    }

    pub fn engine(&self) -> &dyn Engine {
        self.iter.engine()
    }

    /// Engine label for display: the configured default when the engine has
    /// no name of its own, falling back to the iterator's default.
    pub fn engine_name(&mut self) -> String {
        let name = self.iter.engine().name();
        if !name.is_empty() {
            return name.to_string();
        }
        if !self.default_engine.is_empty() {
            return self.default_engine.clone();
        }
        self.iter.set_default_engine().to_string()
    }

    /// Where the engine's executable lands once the payload is in place.
    pub fn exe_path(&self) -> Option<PathBuf> {
        self.engine()
            .exe_name()
            .map(|exe| self.exe_bin_path.join(exe))
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub fn metadata(&self) -> Option<&DownloadMetadata> {
        self.metadata.as_ref()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// `file_path`, but only once the file has been written out and closed.
    pub fn written_file(&self) -> Option<&Path> {
        if self.written {
            self.file_path.as_deref()
        } else {
            None
        }
    }

    pub fn is_archive(&self) -> bool {
        self.is_archive
    }

    pub fn network_error(&self) -> Option<&str> {
        self.network_error.as_deref()
    }

    pub fn set_network_error(&mut self, message: impl Into<String>) {
        self.network_error = Some(message.into());
    }

    pub fn show_version_info(&self) -> ShowVersionInfo {
        self.show_version_info
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), DownloadError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DownloadError::Disk(e)),
    }
}
