use std::sync::Mutex;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

use egrab_core::progress::{format_bytes, DownloadObserver};
use egrab_core::types::types::{Completion, ProgressEvent};

/// Renders one indicatif bar per engine attempt.
pub struct TerminalObserver {
    /// (engine name, bar) for the attempt in flight
    bar: Mutex<Option<(String, ProgressBar)>>,
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn new_bar(engine: &str, total: Option<u64>) -> ProgressBar {
        let pb = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        let template = if total.is_some() {
            "{msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({binary_bytes_per_sec}) ETA {eta}"
        } else {
            "{msg} {spinner} {bytes} ({binary_bytes_per_sec})"
        };
        if let Ok(style) = ProgressStyle::with_template(template) {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.set_message(engine.to_string());
        pb
    }
}

#[async_trait]
impl DownloadObserver for TerminalObserver {
    async fn on_status(&self, engine: &str, message: &str, _request_id: u64) {
        let guard = self.bar.lock().unwrap();
        match guard.as_ref() {
            Some((_, pb)) => pb.println(format!("[{}] {}", engine, message)),
            None => eprintln!("[{}] {}", engine, message),
        }
    }

    async fn on_progress(&self, event: &ProgressEvent) {
        let mut guard = self.bar.lock().unwrap();
        let stale = !matches!(guard.as_ref(), Some((name, _)) if *name == event.engine_name);
        if stale {
            if let Some((_, old)) = guard.take() {
                old.abandon();
            }
            *guard = Some((
                event.engine_name.clone(),
                Self::new_bar(&event.engine_name, event.total_bytes),
            ));
        }
        if let Some((_, pb)) = guard.as_ref() {
            pb.inc(event.bytes_delta);
        }
    }

    async fn on_finished(&self, completion: &Completion) {
        let mut guard = self.bar.lock().unwrap();
        if let Some((_, pb)) = guard.take() {
            if completion.success {
                pb.finish_with_message(format!(
                    "{} ({})",
                    completion.engine_name,
                    format_bytes(pb.position())
                ));
            } else {
                pb.abandon_with_message(format!("Failed: {}", completion.message));
            }
        }
    }
}
