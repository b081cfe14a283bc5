use egrab_core::config::NetworkConfig;
use egrab_core::downloader::request::{extract_filename, header_data, sanitize_file_name};
use egrab_core::engine::release::ReleaseManifest;
use egrab_core::types::types::AuthenticationInfo;

// ---------------------------------------------------------------
// extract_filename
// ---------------------------------------------------------------

#[test]
fn test_extract_filename_quoted() {
    let result = extract_filename("attachment; filename=\"tool-1.2.zip\"");
    assert_eq!(result, Some("tool-1.2.zip".to_string()));
}

#[test]
fn test_extract_filename_unquoted_with_trailing_params() {
    let result = extract_filename("attachment; filename=tool.tar.gz; size=1024");
    assert_eq!(result, Some("tool.tar.gz".to_string()));
}

#[test]
fn test_extract_filename_missing() {
    assert_eq!(extract_filename("inline"), None);
    assert_eq!(extract_filename("attachment; filename=\"\""), None);
}

#[test]
fn test_extract_filename_rfc5987_takes_priority() {
    let result = extract_filename(
        "attachment; filename=\"fallback.bin\"; filename*=UTF-8''My%20Tool.zip",
    );
    assert_eq!(result, Some("My Tool.zip".to_string()));
}

#[test]
fn test_extract_filename_rfc5987_multibyte() {
    let result = extract_filename("attachment; filename*=utf-8''%C3%9Cber.zip");
    assert_eq!(result, Some("Über.zip".to_string()));
}

#[test]
fn test_extract_filename_rfc5987_unknown_charset_uses_plain() {
    let result = extract_filename(
        "attachment; filename*=ISO-8859-1''caf%E9.zip; filename=\"cafe.zip\"",
    );
    assert_eq!(result, Some("cafe.zip".to_string()));
}

#[test]
fn test_extract_filename_keeps_invalid_escape() {
    let result = extract_filename("attachment; filename*=UTF-8''100%zz.bin");
    assert_eq!(result, Some("100%zz.bin".to_string()));
}

// ---------------------------------------------------------------
// sanitize_file_name
// ---------------------------------------------------------------

#[test]
fn test_sanitize_strips_directories() {
    assert_eq!(sanitize_file_name(Some("../../etc/passwd")), "passwd");
    assert_eq!(sanitize_file_name(Some("..\\..\\tool.exe")), "tool.exe");
    assert_eq!(sanitize_file_name(Some("dir/tool.zip")), "tool.zip");
}

#[test]
fn test_sanitize_falls_back_for_unusable_names() {
    assert_eq!(sanitize_file_name(None), "download.bin");
    assert_eq!(sanitize_file_name(Some("")), "download.bin");
    assert_eq!(sanitize_file_name(Some("..")), "download.bin");
}

// ---------------------------------------------------------------
// header_data
// ---------------------------------------------------------------

#[test]
fn test_header_data_carries_config_headers_and_auth() {
    let config = NetworkConfig::default()
        .add_header("X-Api", "1")
        .add_header("X-Api", "2")
        .with_authentication(AuthenticationInfo {
            username: "u".to_string(),
            password: "p".to_string(),
        });

    let data = header_data(&config, "https://example.com/tool.zip");

    assert_eq!(data.url, "https://example.com/tool.zip");
    assert_eq!(data.headers["X-Api"], vec!["1".to_string(), "2".to_string()]);
    assert_eq!(data.authentication.map(|a| a.username), Some("u".to_string()));
}

// ---------------------------------------------------------------
// ReleaseManifest
// ---------------------------------------------------------------

#[test]
fn test_release_manifest_selects_first_match() {
    let raw = br#"{
        "tag_name": "v2.0",
        "assets": [
            {"name": "tool-linux-arm64.tar.gz", "browser_download_url": "https://x/arm", "size": 1},
            {"name": "tool-linux-x64.tar.gz", "browser_download_url": "https://x/x64", "size": 2}
        ]
    }"#;

    let manifest = ReleaseManifest::from_slice(raw).unwrap();

    assert_eq!(manifest.tag_name.as_deref(), Some("v2.0"));
    let asset = manifest.select_asset("linux").unwrap();
    assert_eq!(asset.browser_download_url, "https://x/arm");
    assert_eq!(manifest.select_asset("x64").unwrap().size, 2);
    assert!(manifest.select_asset("windows").is_none());
}

#[test]
fn test_release_manifest_without_assets() {
    let manifest = ReleaseManifest::from_slice(br#"{"tag_name": "v1"}"#).unwrap();
    assert!(manifest.assets.is_empty());
    assert!(ReleaseManifest::from_slice(b"<html>").is_err());
}
