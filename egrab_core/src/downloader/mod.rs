pub mod download_context;
pub mod extractor;
pub mod network_access;
pub mod request;
