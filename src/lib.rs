mod client;
mod commands;
mod config;
mod downloader;
mod error;
mod params;

pub use client::{Bintray, Connect, DownloadSummary, HttpConnector};
pub use commands::{download_file, download_file_with, download_version, download_version_with};
pub use config::{Config, DEFAULT_API_URL, DEFAULT_DOWNLOAD_SERVER_URL};
pub use downloader::BintrayClient;
pub use error::DownloadError;
pub use params::{DownloadFileParams, DownloadVersionParams, PathDetails, TargetOptions, VersionDetails};

#[cfg(feature = "verification")]
pub use downloader::verify::{Checksum, CsType};
#[cfg(feature = "verification")]
pub use error::ChecksumError;

#[cfg(feature = "render_progress")]
pub use downloader::Progress;
