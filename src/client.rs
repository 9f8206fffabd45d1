use crate::{
    config::Config,
    downloader::BintrayClient,
    error::DownloadError,
    params::{DownloadFileParams, DownloadVersionParams},
};
use async_trait::async_trait;

/// Counts reported by a download operation, together with the error that
/// stopped it, if any.
///
/// The counts and the error are independent: a version download can finish
/// with failed files and no error, and a failed listing reports an error with
/// both counts at zero.
#[derive(Debug, Default)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub failed: usize,
    pub error: Option<DownloadError>,
}

impl DownloadSummary {
    pub fn new(downloaded: usize, failed: usize) -> Self {
        Self {
            downloaded,
            failed,
            error: None,
        }
    }
    pub fn with_error(mut self, error: DownloadError) -> Self {
        self.error = Some(error);
        self
    }
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.failed == 0
    }
    /// Splits the summary into its counts, or the error if one was reported.
    pub fn into_result(self) -> Result<(usize, usize), DownloadError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok((self.downloaded, self.failed)),
        }
    }
}

/// The download operations a connected client offers.
#[async_trait]
pub trait Bintray: Send + Sync {
    /// Download a single file.
    async fn download_file(&self, params: &DownloadFileParams) -> DownloadSummary;

    /// Download every file published under a package version.
    async fn download_version(&self, params: &DownloadVersionParams) -> DownloadSummary;
}

/// Builds a client bound to a configuration.
pub trait Connect {
    type Client: Bintray;

    fn connect(&self, config: &Config) -> Result<Self::Client, DownloadError>;
}

/// Connects real HTTP clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpConnector;

impl Connect for HttpConnector {
    type Client = BintrayClient;

    fn connect(&self, config: &Config) -> Result<BintrayClient, DownloadError> {
        BintrayClient::new(config)
    }
}
