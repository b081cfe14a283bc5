use std::fs::File;
use std::path::Path;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use tar::Archive;
use zip::ZipArchive;

use crate::engine::engine::Engine;
use crate::types::types::DownloadError;

/// Unpacks a downloaded archive into a destination directory.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    async fn extract(
        &self,
        engine: &dyn Engine,
        archive: &Path,
        destination: &Path,
    ) -> Result<(), DownloadError>;
}

/// Stock extractor for zip and gzip-compressed tar archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveUnpacker;

#[async_trait]
impl ArchiveExtractor for ArchiveUnpacker {
    async fn extract(
        &self,
        engine: &dyn Engine,
        archive: &Path,
        destination: &Path,
    ) -> Result<(), DownloadError> {
        log::info!(
            "[ArchiveUnpacker] {}: extracting {} into {}",
            engine.name(),
            archive.display(),
            destination.display()
        );
        let archive = archive.to_path_buf();
        let destination = destination.to_path_buf();

        // Decoding is CPU/IO bound — keep it off the async workers.
        tokio::task::spawn_blocking(move || unpack(&archive, &destination))
            .await
            .map_err(|e| DownloadError::Task(e.to_string()))?
    }
}

fn unpack(archive: &Path, destination: &Path) -> Result<(), DownloadError> {
    std::fs::create_dir_all(destination).map_err(DownloadError::Disk)?;

    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| DownloadError::Extraction(format!("invalid archive name: {}", archive.display())))?;

    if name.ends_with(".zip") {
        unpack_zip(archive, destination)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let file = File::open(archive).map_err(DownloadError::Disk)?;
        Archive::new(GzDecoder::new(file))
            .unpack(destination)
            .map_err(|e| DownloadError::Extraction(format!("{}: {}", name, e)))
    } else {
        Err(DownloadError::Extraction(format!("unsupported archive format: {}", name)))
    }
}

fn unpack_zip(archive: &Path, destination: &Path) -> Result<(), DownloadError> {
    let file = File::open(archive).map_err(DownloadError::Disk)?;
    let mut zip = ZipArchive::new(file)
        .map_err(|e| DownloadError::Extraction(format!("{}: {}", archive.display(), e)))?;
    zip.extract(destination)
        .map_err(|e| DownloadError::Extraction(format!("{}: {}", archive.display(), e)))
}
