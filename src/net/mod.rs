//! Network module - artifact download plumbing

mod download;

pub use download::Downloader;
