use std::path::Path;

use base64::Engine as _;
use reqwest::{Client, RequestBuilder, Response};

use crate::config::NetworkConfig;
use crate::engine::engine::DownloadSource;
use crate::engine::release::ReleaseManifest;
use crate::types::types::{DownloadError, DownloadMetadata, HeaderData};

/// Name used when neither the response nor the URL yields one.
const FALLBACK_FILE_NAME: &str = "download.bin";

/// Builds the header set for `url` from the configured extra headers.
pub fn header_data(config: &NetworkConfig, url: &str) -> HeaderData {
    HeaderData {
        url: url.to_string(),
        headers: config.headers.clone(),
        authentication: config.authentication.clone(),
    }
}

/// Applies custom headers and Basic auth to a request builder.
fn apply_headers(mut builder: RequestBuilder, header_data: &HeaderData) -> RequestBuilder {
    for (key, values) in &header_data.headers {
        for value in values {
            builder = builder.header(key, value);
        }
    }
    if let Some(auth) = &header_data.authentication {
        let credentials = format!("{}:{}", auth.username, auth.password);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        builder = builder.header("Authorization", format!("Basic {}", encoded));
    }
    builder
}

pub fn build_request(client: &Client, header_data: &HeaderData) -> RequestBuilder {
    apply_headers(client.get(&header_data.url), header_data)
}

/// Sends the request and turns non-success statuses into errors.
pub async fn send(client: &Client, header_data: &HeaderData) -> Result<Response, DownloadError> {
    let response = build_request(client, header_data).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::HttpStatus {
            status: status.as_u16(),
            url: response.url().to_string(),
        });
    }
    Ok(response)
}

/// Turns an engine's source into the URL the payload is fetched from.
///
/// A release manifest costs one extra GET; its failure is reported as
/// [`DownloadError::Release`].
pub async fn resolve_source(
    client: &Client,
    config: &NetworkConfig,
    source: &DownloadSource,
) -> Result<String, DownloadError> {
    match source {
        DownloadSource::Direct { url } => Ok(url.clone()),
        DownloadSource::Release { manifest_url, asset } => {
            let mut data = header_data(config, manifest_url);
            data.headers
                .entry("Accept".to_string())
                .or_insert_with(|| vec!["application/json".to_string()]);

            let response = send(client, &data)
                .await
                .map_err(|e| DownloadError::Release(e.to_string()))?;
            let body = response
                .bytes()
                .await
                .map_err(|e| DownloadError::Release(e.to_string()))?;
            let manifest = ReleaseManifest::from_slice(&body)
                .map_err(|e| DownloadError::Release(format!("{}: {}", manifest_url, e)))?;

            let picked = manifest.select_asset(asset).ok_or_else(|| {
                DownloadError::Release(format!("no asset matching \"{}\" in {}", asset, manifest_url))
            })?;
            log::info!(
                "[resolve_source] release {:?}: picked asset {} ({} bytes)",
                manifest.tag_name, picked.name, picked.size
            );
            Ok(picked.browser_download_url.clone())
        }
    }
}

/// Reads size, final URL and file name from a successful response.
///
/// The file name comes from `Content-Disposition` when present, otherwise
/// from the last segment of the final URL path.
pub fn response_metadata(response: &Response) -> DownloadMetadata {
    let url = response.url().to_string();
    let from_header = response
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .and_then(extract_filename);
    let from_url = response
        .url()
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(percent_decode);

    DownloadMetadata {
        size: response.content_length().unwrap_or(0),
        url,
        file_name: sanitize_file_name(from_header.or(from_url).as_deref()),
    }
}

/// Keeps only the final path component so a remote name cannot escape the
/// temp directory.
pub fn sanitize_file_name(name: Option<&str>) -> String {
    name.map(|n| n.replace('\\', "/"))
        .as_deref()
        .and_then(|n| Path::new(n).file_name())
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}

/// Extract the filename from a `Content-Disposition` header value.
///
/// The RFC 5987 `filename*=UTF-8''...` form wins over plain `filename=`.
pub fn extract_filename(disposition: &str) -> Option<String> {
    extract_filename_star(disposition).or_else(|| extract_filename_plain(disposition))
}

fn extract_filename_star(disposition: &str) -> Option<String> {
    let value = parameter(disposition, "filename*=")?;
    let encoded = value
        .strip_prefix("UTF-8''")
        .or_else(|| value.strip_prefix("utf-8''"))?;
    Some(percent_decode(encoded))
}

fn extract_filename_plain(disposition: &str) -> Option<String> {
    let raw = parameter(disposition, "filename=")?.trim_matches('"');
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Case-insensitive lookup of `key` in a `;`-separated header value.
fn parameter<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let idx = header.to_ascii_lowercase().find(key)?;
    let rest = &header[idx + key.len()..];
    let end = rest.find(';').unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Percent-decode a URL-encoded string (`My%20File.zip` → `My File.zip`).
/// Invalid escapes are kept literally; invalid UTF-8 is replaced.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
