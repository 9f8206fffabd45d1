#[cfg(feature = "render_progress")]
use crate::downloader::Progress;
use crate::error::DownloadError;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.bintray.com/";
pub const DEFAULT_DOWNLOAD_SERVER_URL: &str = "https://dl.bintray.com/";
const DEFAULT_THREADS: usize = 3;
const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 6_000;

/// Describes how to reach a Bintray service.
///
/// Every field has a default, so a config can be deserialized from a partial
/// JSON document or assembled with the `with_*` methods.
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub(crate) api_url: String,
    pub(crate) download_server_url: String,
    pub(crate) user: Option<String>,
    pub(crate) key: Option<String>,
    pub(crate) threads: usize,
    pub(crate) retries: u32,
    pub(crate) connect_timeout_ms: u64,
    #[cfg(feature = "render_progress")]
    #[serde(skip)]
    pub(crate) progress: Option<Progress>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            download_server_url: DEFAULT_DOWNLOAD_SERVER_URL.to_string(),
            user: None,
            key: None,
            threads: DEFAULT_THREADS,
            retries: DEFAULT_RETRIES,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            #[cfg(feature = "render_progress")]
            progress: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_json(json: &str) -> Result<Self, DownloadError> {
        Ok(serde_json::from_str(json)?)
    }
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
    pub fn with_download_server_url(mut self, url: impl Into<String>) -> Self {
        self.download_server_url = url.into();
        self
    }
    pub fn with_credentials(mut self, user: impl Into<String>, key: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.key = Some(key.into());
        self
    }
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
    #[cfg(feature = "render_progress")]
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }
    pub fn threads(&self) -> usize {
        self.threads
    }
    pub fn retries(&self) -> u32 {
        self.retries
    }
    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }
    pub(crate) fn credentials(&self) -> Result<Option<(&str, &str)>, DownloadError> {
        match (&self.user, &self.key) {
            (Some(user), Some(key)) => Ok(Some((user, key))),
            (None, None) => Ok(None),
            _ => Err(DownloadError::Config("user and key must be provided together".into())),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("download_server_url", &self.download_server_url)
            .field("user", &self.user)
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .field("threads", &self.threads)
            .field("retries", &self.retries)
            .field("connect_timeout", &self.connect_timeout())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_bintray() {
        let config = Config::new();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.download_server_url, DEFAULT_DOWNLOAD_SERVER_URL);
        assert_eq!(config.threads(), 3);
        assert_eq!(config.retries(), 3);
        assert!(config.credentials().unwrap().is_none());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = Config::from_json(r#"{"user": "alice", "key": "secret", "threads": 8}"#).unwrap();
        assert_eq!(config.threads(), 8);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.credentials().unwrap(), Some(("alice", "secret")));
    }

    #[test]
    fn camel_case_urls() {
        let config = Config::from_json(r#"{"apiUrl": "http://localhost/api", "downloadServerUrl": "http://localhost/dl"}"#).unwrap();
        assert_eq!(config.api_url, "http://localhost/api");
        assert_eq!(config.download_server_url, "http://localhost/dl");
    }

    #[test]
    fn lone_user_is_rejected() {
        let mut config = Config::new();
        config.user = Some("alice".into());
        assert!(matches!(config.credentials(), Err(DownloadError::Config(_))));
    }

    #[test]
    fn debug_hides_key() {
        let config = Config::new().with_credentials("alice", "hunter2");
        let debug = format!("{config:?}");
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn sub_second_connect_timeout() {
        let config = Config::new().with_connect_timeout(Duration::from_millis(500));
        assert_eq!(config.connect_timeout(), Duration::from_millis(500));
        assert_eq!(Config::new().connect_timeout(), Duration::from_secs(6));
    }

    #[test]
    fn connect_timeout_from_json() {
        let config = Config::from_json(r#"{"connectTimeoutMs": 250}"#).unwrap();
        assert_eq!(config.connect_timeout(), Duration::from_millis(250));
        let config = Config::from_json(r#"{"connectTimeoutMs": 0}"#).unwrap();
        assert!(config.connect_timeout() > Duration::ZERO);
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(Config::from_json("{threads: }"), Err(DownloadError::Json(_))));
    }
}
