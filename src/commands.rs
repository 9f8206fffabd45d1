//! One-shot entry points: connect a client for the given config, run a single
//! download operation and hand back whatever the client reported.

use crate::{
    client::{Bintray, Connect, DownloadSummary, HttpConnector},
    config::Config,
    params::{DownloadFileParams, DownloadVersionParams},
};

pub async fn download_file(config: &Config, params: &DownloadFileParams) -> DownloadSummary {
    download_file_with(&HttpConnector, config, params).await
}

pub async fn download_version(config: &Config, params: &DownloadVersionParams) -> DownloadSummary {
    download_version_with(&HttpConnector, config, params).await
}

/// Like [`download_file`], with a caller supplied [`Connect`].
///
/// A connection failure is returned with zero counts and no download is attempted.
pub async fn download_file_with<C: Connect>(connector: &C, config: &Config, params: &DownloadFileParams) -> DownloadSummary {
    match connector.connect(config) {
        Ok(client) => client.download_file(params).await,
        Err(error) => DownloadSummary::default().with_error(error),
    }
}

pub async fn download_version_with<C: Connect>(connector: &C, config: &Config, params: &DownloadVersionParams) -> DownloadSummary {
    match connector.connect(config) {
        Ok(client) => client.download_version(params).await,
        Err(error) => DownloadSummary::default().with_error(error),
    }
}
