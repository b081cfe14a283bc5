use std::fs::File;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use egrab_core::downloader::extractor::{ArchiveExtractor, ArchiveUnpacker};
use egrab_core::engine::engine::StaticEngine;
use egrab_core::types::types::DownloadError;

const TOOL_SCRIPT: &[u8] = b"#!/bin/sh\necho tool\n";

fn write_zip(path: &Path) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    zip.start_file("tool/bin/tool", options).unwrap();
    zip.write_all(TOOL_SCRIPT).unwrap();
    zip.start_file("tool/README", options).unwrap();
    zip.write_all(b"readme").unwrap();
    zip.finish().unwrap();
}

fn write_tar_gz(path: &Path) {
    let file = File::create(path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    let mut header = tar::Header::new_gnu();
    header.set_size(TOOL_SCRIPT.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder
        .append_data(&mut header, "tool/bin/tool", TOOL_SCRIPT)
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();
}

fn engine() -> StaticEngine {
    StaticEngine::direct("tool", "https://example.com/tool")
}

#[tokio::test]
async fn test_unpacks_zip() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("tool-1.2.zip");
    write_zip(&archive);

    ArchiveUnpacker
        .extract(&engine(), &archive, temp.path())
        .await
        .unwrap();

    let extracted = std::fs::read(temp.path().join("tool/bin/tool")).unwrap();
    assert_eq!(extracted, TOOL_SCRIPT);
    assert!(temp.path().join("tool/README").exists());
}

#[tokio::test]
async fn test_unpacks_tar_gz_into_new_directory() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("tool-1.2.tar.gz");
    write_tar_gz(&archive);
    let destination = temp.path().join("out");

    ArchiveUnpacker
        .extract(&engine(), &archive, &destination)
        .await
        .unwrap();

    let extracted = std::fs::read(destination.join("tool/bin/tool")).unwrap();
    assert_eq!(extracted, TOOL_SCRIPT);
}

#[tokio::test]
async fn test_corrupt_zip_is_an_extraction_error() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("broken.zip");
    std::fs::write(&archive, b"definitely not a zip").unwrap();

    let result = ArchiveUnpacker.extract(&engine(), &archive, temp.path()).await;

    assert!(matches!(result, Err(DownloadError::Extraction(_))));
}

#[tokio::test]
async fn test_unsupported_tar_family_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let archive = temp.path().join("tool.tar.xz");
    std::fs::write(&archive, b"xz").unwrap();

    let result = ArchiveUnpacker.extract(&engine(), &archive, temp.path()).await;

    match result {
        Err(DownloadError::Extraction(msg)) => assert!(msg.contains("unsupported")),
        other => panic!("expected extraction error, got {:?}", other),
    }
}
