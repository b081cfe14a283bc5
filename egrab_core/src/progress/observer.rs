use async_trait::async_trait;

use crate::types::types::{Completion, ProgressEvent};

/// Receives what a download pipeline reports while it runs.
///
/// Lifecycle per top-level download:
/// - `on_status` for each human-readable step (candidate start, fallthrough,
///   extraction, outcome).
/// - `on_progress` for every chunk written to disk.
/// - `on_finished` exactly once, with the terminal [`Completion`].
#[async_trait]
pub trait DownloadObserver: Send + Sync + 'static {
    async fn on_status(&self, _engine: &str, _message: &str, _request_id: u64) {}

    async fn on_progress(&self, _event: &ProgressEvent) {}

    async fn on_finished(&self, completion: &Completion);
}
