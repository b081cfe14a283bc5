//! Engine-driven artifact downloads.
//!
//! An [`EngineIterator`](engine::engine_iterator::EngineIterator) walks an ordered
//! list of engine candidates. [`NetworkAccess`](downloader::network_access::NetworkAccess)
//! requests the current candidate, writes the payload into the temp directory,
//! unpacks it when it is an archive and reports a single
//! [`Completion`](types::types::Completion). A failed request falls through to
//! the next candidate.

pub mod config;
pub mod downloader;
pub mod engine;
pub mod progress;
pub mod types;
