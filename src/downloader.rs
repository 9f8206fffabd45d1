mod target;
mod threads;
#[cfg(feature = "verification")]
pub(crate) mod verify;

#[cfg(feature = "verification")]
use crate::{
    downloader::verify::{Checksum, CsType},
    error::ChecksumError,
};
use crate::{
    client::{Bintray, DownloadSummary},
    config::Config,
    error::DownloadError,
    params::{DownloadFileParams, DownloadVersionParams, TargetOptions, VersionDetails},
};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
#[cfg(feature = "render_progress")]
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use reqwest::{
    header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH},
    Url,
};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[cfg(feature = "render_progress")]
const DEFAULT_TOTAL_PROGRESS: &str = "{elapsed_precise} {bar:30.cyan} {human_pos:>} / {human_len} ({percent}%)";
#[cfg(feature = "render_progress")]
const DEFAULT_INDIVIDUAL_PROGRESS: &str = "{bar:30.blue/red} ({percent}%) {bytes:>12.green} / {total_bytes:<12.green} {bytes_per_sec:>13.blue} - ETA: {eta_precise}";
#[cfg(feature = "render_progress")]
const PROGRESS_LINE: &str = "━╾╴─";

const SHA1_HEADER: &str = "X-Checksum-Sha1";
const SHA256_HEADER: &str = "X-Checksum-Sha2";
const MD5_HEADER: &str = "X-Checksum-Md5";

pub(crate) struct Credentials {
    user: String,
    key: String,
}

impl Credentials {
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.basic_auth(&self.user, Some(&self.key))
    }
}

/// HTTP client for a single Bintray service, bound to one [`Config`].
pub struct BintrayClient {
    client: ClientWithMiddleware,
    api_url: Url,
    download_url: Url,
    credentials: Option<Credentials>,
    threads: usize,
    #[cfg(feature = "render_progress")]
    progress: Option<Progress>,
}

impl BintrayClient {
    pub fn new(config: &Config) -> Result<Self, DownloadError> {
        let api_url = base_url(&config.api_url)?;
        let download_url = base_url(&config.download_server_url)?;
        let credentials = config.credentials()?.map(|(user, key)| Credentials {
            user: user.to_string(),
            key: key.to_string(),
        });
        if config.threads() == 0 {
            return Err(DownloadError::Config("threads must be at least 1".into()));
        }
        let retries = ExponentialBackoff::builder().build_with_max_retries(config.retries());
        let client = reqwest::ClientBuilder::new()
            .connect_timeout(config.connect_timeout())
            .build()?;
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retries))
            .build();
        Ok(Self {
            client,
            api_url,
            download_url,
            credentials,
            threads: config.threads(),
            #[cfg(feature = "render_progress")]
            progress: config.progress.clone(),
        })
    }
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some(credentials) => credentials.apply(request),
            None => request,
        }
    }
    fn download_url_for(&self, remote_path: &str) -> Result<Url, DownloadError> {
        with_segments(&self.download_url, remote_path.split('/'))
    }
    async fn file_details(&self, url: &Url) -> Result<RemoteFileDetails, DownloadError> {
        let response = self.authorized(self.client.head(url.clone())).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(RemoteFileDetails::from_headers(response.headers()))
    }
    async fn list_version_files(&self, version: &VersionDetails, include_unpublished: bool) -> Result<Vec<VersionFile>, DownloadError> {
        let segments = [
            "packages",
            version.subject.as_str(),
            version.repo.as_str(),
            version.package.as_str(),
            "versions",
            version.version.as_str(),
            "files",
        ];
        let mut url = with_segments(&self.api_url, segments)?;
        if include_unpublished {
            url.query_pairs_mut().append_pair("include_unpublished", "1");
        }
        log::debug!("Listing files of {}", url);
        let response = self.authorized(self.client.get(url.clone())).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
    /// Fetches `subject/repo/path` to the location `options` picks for `path`,
    /// skipping the transfer when an identical file is already present.
    async fn fetch(
        &self,
        repo: (&str, &str),
        path: &str,
        options: &TargetOptions,
        listed: Option<&VersionFile>,
        #[cfg(feature = "render_progress")] bars: Option<&MultiProgress>,
    ) -> Result<(), DownloadError> {
        let local = target::local_path(path, &options.target_path, options.flat)?;
        let remote_path = format!("{}/{}/{path}", repo.0, repo.1);
        let url = self.download_url_for(&remote_path)?;
        let mut details = self.file_details(&url).await?;
        if let Some(listed) = listed {
            details.fill_from(listed);
        }
        #[cfg(feature = "verification")]
        let checksum = details.checksum()?;
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        #[cfg(feature = "verification")]
        if is_identical(&local, details.sha1.as_deref()).await {
            log::info!("File already exists locally: {}", local.display());
            return Ok(());
        }
        log::info!("Downloading {} to {}", remote_path, local.display());

        let parts = match details.size {
            Some(size) if details.accepts_ranges && options.split_count > 1 && size >= options.min_split_size => options.split_count,
            _ => 1,
        };
        let mut chunks = threads::Chunks::new(parts, details.size.unwrap_or(0));
        log::debug!("Fetching {} in {} part(s)", url, chunks.len());
        #[cfg(feature = "render_progress")]
        let bar = self.file_bar(bars, details.size);
        chunks
            .download(
                &self.client,
                &url,
                self.credentials.as_ref(),
                #[cfg(feature = "render_progress")]
                bar,
            )
            .await?;
        #[cfg(feature = "verification")]
        if let Some(checksum) = checksum {
            chunks.verify(checksum)?;
        }
        persist(chunks, &local).await
    }
    async fn fetch_listed(
        &self,
        version: &VersionDetails,
        file: &VersionFile,
        options: &TargetOptions,
        #[cfg(feature = "render_progress")] bars: Option<&MultiProgress>,
        #[cfg(feature = "render_progress")] main: Option<ProgressBar>,
    ) -> bool {
        let result = self
            .fetch(
                (version.subject.as_str(), version.repo.as_str()),
                &file.path,
                options,
                Some(file),
                #[cfg(feature = "render_progress")]
                bars,
            )
            .await;
        #[cfg(feature = "render_progress")]
        if let Some(main) = main {
            main.inc(1);
        }
        if let Err(error) = &result {
            log::warn!("Failed downloading {}/{}/{}: {error}", version.subject, version.repo, file.path);
        }
        result.is_ok()
    }
    #[cfg(feature = "render_progress")]
    fn file_bar(&self, bars: Option<&MultiProgress>, size: Option<u64>) -> Option<ProgressBar> {
        let style = self.progress.as_ref()?.individual.clone()?;
        let bar = ProgressBar::new(size.unwrap_or(0)).with_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(match bars {
            Some(multi) => multi.add(bar),
            None => bar,
        })
    }
    #[cfg(feature = "render_progress")]
    fn initialize_progress(&self, files: usize) -> Option<(MultiProgress, Option<ProgressBar>)> {
        let progress = self.progress.as_ref()?;
        if !progress.is_enabled() {
            return None;
        }
        let multi = MultiProgress::new();
        let main_bar = match (&progress.total, files) {
            (Some(style), 2..) => {
                let bar = ProgressBar::new(files as u64).with_style(style.clone());
                bar.enable_steady_tick(std::time::Duration::from_millis(100));
                Some(multi.add(bar))
            }
            _ => None,
        };
        Some((multi, main_bar))
    }
}

#[async_trait]
impl Bintray for BintrayClient {
    async fn download_file(&self, params: &DownloadFileParams) -> DownloadSummary {
        let options = params.options();
        let result = self
            .fetch(
                (params.path.subject.as_str(), params.path.repo.as_str()),
                &params.path.path,
                options,
                None,
                #[cfg(feature = "render_progress")]
                None,
            )
            .await;
        match result {
            Ok(()) => DownloadSummary::new(1, 0),
            Err(error) => {
                log::warn!("Failed downloading {}: {error}", params.path.remote_path());
                DownloadSummary::new(0, 1).with_error(error)
            }
        }
    }

    async fn download_version(&self, params: &DownloadVersionParams) -> DownloadSummary {
        let version = &params.version;
        let options = params.options();
        let files = match self.list_version_files(version, options.include_unpublished).await {
            Ok(files) => files,
            Err(error) => return DownloadSummary::default().with_error(error),
        };
        log::info!(
            "Downloading {} file(s) of {}/{}/{}/{}",
            files.len(),
            version.subject,
            version.repo,
            version.package,
            version.version
        );
        #[cfg(feature = "render_progress")]
        let progress = self.initialize_progress(files.len());
        #[cfg(feature = "render_progress")]
        let (multi, main) = match &progress {
            Some((multi, main)) => (Some(multi), main.clone()),
            None => (None, None),
        };

        let downloads = files
            .iter()
            .map(|file| {
                self.fetch_listed(
                    version,
                    file,
                    options,
                    #[cfg(feature = "render_progress")]
                    multi,
                    #[cfg(feature = "render_progress")]
                    main.clone(),
                )
            })
            .collect::<Vec<_>>();
        let outcomes = stream::iter(downloads)
            .buffer_unordered(self.threads)
            .collect::<Vec<bool>>()
            .await;

        #[cfg(feature = "render_progress")]
        if let Some(main) = main {
            main.finish();
        }
        let downloaded = outcomes.iter().filter(|ok| **ok).count();
        DownloadSummary::new(downloaded, outcomes.len() - downloaded)
    }
}

fn base_url(raw: &str) -> Result<Url, DownloadError> {
    let normalized = if raw.ends_with('/') { raw.to_string() } else { format!("{raw}/") };
    let url = Url::parse(&normalized).map_err(|e| DownloadError::Config(format!("invalid URL {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(DownloadError::Config(format!("unsupported URL scheme {scheme:?}"))),
    }
}

fn with_segments<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, DownloadError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DownloadError::URLParse)?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sibling of `local` that receives the data until it is complete.
fn partial_path(local: &Path) -> PathBuf {
    let name = local.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    local.with_file_name(format!(".{name}.part"))
}

/// Writes the chunks next to `local` and renames them into place, so an
/// existing file is only replaced by a complete one.
async fn persist(chunks: threads::Chunks, local: &Path) -> Result<(), DownloadError> {
    let partial = partial_path(local);
    let written = async {
        let output = tokio::fs::File::create(&partial).await?;
        chunks.save(output).await?;
        tokio::fs::rename(&partial, local).await?;
        Ok::<(), DownloadError>(())
    }
    .await;
    if written.is_err() {
        if let Err(error) = tokio::fs::remove_file(&partial).await {
            log::debug!("Could not remove {}: {error}", partial.display());
        }
    }
    written
}

#[cfg(feature = "verification")]
async fn is_identical(local: &Path, sha1: Option<&str>) -> bool {
    let Some(sha1) = sha1 else { return false };
    if !tokio::fs::try_exists(local).await.unwrap_or(false) {
        return false;
    }
    match Checksum::of_file(local, CsType::Sha1).await {
        Ok(digest) => digest.eq_ignore_ascii_case(sha1),
        Err(_) => false,
    }
}

/// What a `HEAD` of the download URL reveals about the file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct RemoteFileDetails {
    size: Option<u64>,
    sha1: Option<String>,
    sha256: Option<String>,
    md5: Option<String>,
    accepts_ranges: bool,
}

impl RemoteFileDetails {
    fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        Self {
            size: headers
                .get(CONTENT_LENGTH)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok()),
            sha1: text(SHA1_HEADER),
            sha256: text(SHA256_HEADER),
            md5: text(MD5_HEADER),
            accepts_ranges: headers
                .get(ACCEPT_RANGES)
                .and_then(|value| value.to_str().ok())
                .is_some_and(|value| value.eq_ignore_ascii_case("bytes")),
        }
    }
    fn fill_from(&mut self, listed: &VersionFile) {
        self.size = self.size.filter(|size| *size > 0).or(Some(listed.size));
        if self.sha1.is_none() {
            self.sha1 = listed.sha1.clone();
        }
        if self.sha256.is_none() {
            self.sha256 = listed.sha256.clone();
        }
    }
    /// The strongest announced digest. A digest that does not fit its header
    /// is rejected rather than skipped.
    #[cfg(feature = "verification")]
    fn checksum(&self) -> Result<Option<Checksum>, ChecksumError> {
        let announced = [
            (&self.sha256, CsType::Sha256),
            (&self.sha1, CsType::Sha1),
            (&self.md5, CsType::MD5),
        ];
        let Some((digest, expected)) = announced
            .into_iter()
            .find_map(|(digest, expected)| digest.as_deref().map(|digest| (digest, expected)))
        else {
            return Ok(None);
        };
        let checksum = Checksum::new(digest)?;
        if checksum.checksum_type() != expected {
            return Err(ChecksumError::UnrecognizedType);
        }
        Ok(Some(checksum))
    }
}

/// One entry of the version file listing.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VersionFile {
    path: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    sha1: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
}

#[cfg(feature = "render_progress")]
#[derive(Clone)]
pub struct Progress {
    total: Option<ProgressStyle>,
    individual: Option<ProgressStyle>,
}
#[cfg(feature = "render_progress")]
impl Default for Progress {
    fn default() -> Self {
        Self::new().with_default_total().with_default_individual()
    }
}
#[cfg(feature = "render_progress")]
impl Progress {
    pub fn new() -> Self {
        Self { total: None, individual: None }
    }
    pub fn with_default_total(mut self) -> Self {
        self.total = ProgressStyle::with_template(DEFAULT_TOTAL_PROGRESS).ok();
        self
    }
    pub fn with_default_individual(mut self) -> Self {
        self.individual = ProgressStyle::with_template(DEFAULT_INDIVIDUAL_PROGRESS)
            .ok()
            .map(|style| style.progress_chars(PROGRESS_LINE));
        self
    }
    pub fn with_total(mut self, style: ProgressStyle) -> Self {
        self.total = Some(style);
        self
    }
    pub fn with_individual(mut self, style: ProgressStyle) -> Self {
        self.individual = Some(style);
        self
    }
    fn is_enabled(&self) -> bool {
        self.total.is_some() || self.individual.is_some()
    }
}
