pub mod format;
pub mod observer;

pub use format::format_bytes;
pub use observer::DownloadObserver;
