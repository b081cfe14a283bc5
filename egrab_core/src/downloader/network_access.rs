use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::config::NetworkConfig;
use crate::downloader::download_context::DownloadContext;
use crate::downloader::extractor::{ArchiveExtractor, ArchiveUnpacker};
use crate::downloader::request;
use crate::engine::engine_iterator::EngineIterator;
use crate::progress::observer::DownloadObserver;
use crate::types::types::{Completion, DownloadError, ProgressEvent, ShowVersionInfo};

/// Drives engine candidates through request → write → extract → finish.
///
/// Each call to [`download`](Self::download) is self-contained: its context,
/// iterator, output file and cancellation token belong to that call alone, so
/// several downloads may run concurrently on one `NetworkAccess`.
pub struct NetworkAccess {
    config: NetworkConfig,
    client: Client,
    extractor: Arc<dyn ArchiveExtractor>,
    observer: Option<Arc<dyn DownloadObserver>>,
    /// Parent of every per-call token. Replaced after each `cancel_all`.
    session: Mutex<CancellationToken>,
    next_request_id: AtomicU64,
}

impl NetworkAccess {
    pub fn new(config: NetworkConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            config,
            client,
            extractor: Arc::new(ArchiveUnpacker),
            observer: None,
            session: Mutex::new(CancellationToken::new()),
            next_request_id: AtomicU64::new(1),
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArchiveExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DownloadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// A token for one call to [`download_with_cancel`](Self::download_with_cancel).
    ///
    /// Cancelling it aborts that download only. [`cancel_all`](Self::cancel_all)
    /// cancels it as well.
    pub fn new_cancel_token(&self) -> CancellationToken {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }

    /// Aborts every download and `get` in flight on this instance. The
    /// partial files are removed and no further candidate is tried. Calls
    /// started afterwards run normally.
    pub fn cancel_all(&self) {
        let previous = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *session, CancellationToken::new())
        };
        log::warn!("[NetworkAccess] cancelling all in-flight requests");
        previous.cancel();
    }

    /// Plain GET for version and manifest lookups. Any failure yields `None`.
    pub async fn get(&self, url: &str) -> Option<Vec<u8>> {
        let cancel = self.new_cancel_token();
        let header_data = request::header_data(&self.config, url);
        let result = async {
            let response = request::send(&self.client, &header_data).await?;
            Ok::<_, DownloadError>(response.bytes().await?.to_vec())
        };
        match cancellable(&cancel, result).await {
            Ok(body) => Some(body),
            Err(e) => {
                log::warn!("[NetworkAccess::get] {}: {}", url, e);
                None
            }
        }
    }

    /// Downloads from the first candidate that answers, under a fresh
    /// request id.
    pub async fn download(&self, iter: EngineIterator, show: ShowVersionInfo) -> Completion {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        self.download_as(request_id, iter, show).await
    }

    /// Like [`download`](Self::download), aborted when `cancel` fires.
    ///
    /// Cancellation is terminal: the partial file is removed and the
    /// completion reports `"Download failed: download cancelled"`.
    pub async fn download_with_cancel(
        &self,
        iter: EngineIterator,
        show: ShowVersionInfo,
        cancel: CancellationToken,
    ) -> Completion {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        self.execute(request_id, iter, show, cancel).await
    }

    /// Like [`download`](Self::download) with a caller-chosen correlation id.
    ///
    /// The completion is delivered to the observer exactly once, however
    /// many candidates were tried, and is also returned.
    pub async fn download_as(
        &self,
        request_id: u64,
        iter: EngineIterator,
        show: ShowVersionInfo,
    ) -> Completion {
        let cancel = self.new_cancel_token();
        self.execute(request_id, iter, show, cancel).await
    }

    async fn execute(
        &self,
        request_id: u64,
        iter: EngineIterator,
        show: ShowVersionInfo,
        cancel: CancellationToken,
    ) -> Completion {
        let ctx = DownloadContext::new(iter, &self.config, request_id, show);
        let completion = self.run(ctx, &cancel).await;
        if let Some(observer) = &self.observer {
            observer.on_finished(&completion).await;
        }
        completion
    }

    async fn run(&self, mut ctx: DownloadContext, cancel: &CancellationToken) -> Completion {
        // Sourceless candidates never replace a real failure.
        let mut previous_error: Option<String> = None;
        loop {
            let engine = ctx.engine_name();
            let request_id = ctx.request_id();
            self.post(&engine, &format!("Downloading {}", engine), request_id)
                .await;

            let err = match self.fetch(&mut ctx, &engine, cancel).await {
                Ok(()) => return self.finish(ctx, engine).await,
                Err(e) => e,
            };
            log::warn!(
                "[NetworkAccess::run] request={} engine={}: attempt failed: {}",
                request_id, engine, err
            );
            ctx.set_network_error(err.to_string());

            if !err.is_fallthrough() {
                return self.failed(ctx, engine, err.to_string()).await;
            }
            match ctx.fallthrough() {
                Ok(next) => {
                    self.post(
                        &engine,
                        &format!("Download of {} failed: {}, trying next engine", engine, err),
                        request_id,
                    )
                    .await;
                    ctx = next;
                    if !matches!(err, DownloadError::NoCandidate) {
                        previous_error = Some(err.to_string());
                    }
                }
                Err(last) => {
                    let reason = match (&err, previous_error) {
                        (DownloadError::NoCandidate, Some(previous)) => previous,
                        _ => err.to_string(),
                    };
                    return self.failed(last, engine, reason).await;
                }
            }
        }
    }

    /// One attempt: resolve, request, write. Leaves a closed file behind on
    /// success.
    async fn fetch(
        &self,
        ctx: &mut DownloadContext,
        engine: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }
        let source = ctx
            .engine()
            .download_source()
            .ok_or(DownloadError::NoCandidate)?;

        let url = cancellable(
            cancel,
            request::resolve_source(&self.client, &self.config, &source),
        )
        .await?;
        let header_data = request::header_data(&self.config, &url);
        let response = cancellable(cancel, request::send(&self.client, &header_data)).await?;

        let metadata = request::response_metadata(&response);
        log::info!(
            "[NetworkAccess::fetch] request={} engine={}: {} ({} bytes) from {}",
            ctx.request_id(),
            engine,
            metadata.file_name,
            metadata.size,
            metadata.url
        );
        let total_bytes = (metadata.size > 0).then_some(metadata.size);
        ctx.add(metadata);

        tokio::fs::create_dir_all(ctx.temp_dir())
            .await
            .map_err(DownloadError::Disk)?;
        ctx.open_file().await?;

        let mut stream = response.bytes_stream();
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    ctx.discard_file().await;
                    return Err(DownloadError::Cancelled);
                }
                next = stream.next() => next,
            };
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            ctx.write(&chunk).await?;

            if let Some(observer) = &self.observer {
                let event = ProgressEvent {
                    request_id: ctx.request_id(),
                    engine_name: engine.to_string(),
                    bytes_delta: chunk.len() as u64,
                    total_bytes,
                };
                observer.on_progress(&event).await;
            }
        }

        ctx.close_file().await
    }

    /// Extracts archives, then reports success for the terminal candidate.
    /// An extraction failure is terminal: the payload itself was retrieved.
    async fn finish(&self, mut ctx: DownloadContext, engine: String) -> Completion {
        let request_id = ctx.request_id();
        let file_path = ctx.file_path().map(PathBuf::from);

        let message = if ctx.is_archive() {
            let Some(archive) = file_path.as_deref() else {
                let err = DownloadError::Extraction("no archive was written".to_string());
                return self.failed(ctx, engine, err.to_string()).await;
            };
            self.post(&engine, &format!("Extracting {}", engine), request_id)
                .await;
            let extracted = self
                .extractor
                .extract(ctx.engine(), archive, ctx.temp_dir())
                .await;
            if let Err(err) = extracted {
                log::error!(
                    "[NetworkAccess::finish] request={} engine={}: {}",
                    request_id, engine, err
                );
                return self.failed(ctx, engine, err.to_string()).await;
            }
            format!("Extraction of {} completed", engine)
        } else {
            format!("Download of {} completed", engine)
        };

        self.post(&engine, &message, request_id).await;
        ctx.report_done();

        Completion {
            success: true,
            message,
            request_id,
            engine_name: engine,
            file_path,
            exe_path: ctx.exe_path(),
            show_version_info: ctx.show_version_info(),
        }
    }

    /// Only a fully written file is reported; a cancelled or broken attempt
    /// leaves nothing usable behind.
    async fn failed(&self, mut ctx: DownloadContext, engine: String, reason: String) -> Completion {
        let message = format!("Download failed: {}", reason);
        self.post(&engine, &message, ctx.request_id()).await;
        ctx.report_done();

        Completion {
            success: false,
            message,
            request_id: ctx.request_id(),
            engine_name: engine,
            file_path: ctx.written_file().map(PathBuf::from),
            exe_path: None,
            show_version_info: ctx.show_version_info(),
        }
    }

    async fn post(&self, engine: &str, message: &str, request_id: u64) {
        log::info!("[NetworkAccess] request={} {}: {}", request_id, engine, message);
        if let Some(observer) = &self.observer {
            observer.on_status(engine, message, request_id).await;
        }
    }
}

async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, DownloadError>
where
    F: Future<Output = Result<T, DownloadError>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(DownloadError::Cancelled),
        result = fut => result,
    }
}
