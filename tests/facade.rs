use async_trait::async_trait;
use bintray_fetch::{
    download_file_with, download_version_with, Bintray, Config, Connect, DownloadError, DownloadFileParams,
    DownloadSummary, DownloadVersionParams,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

#[derive(Default)]
struct Calls {
    connects: AtomicUsize,
    files: AtomicUsize,
    versions: AtomicUsize,
    clients_used: Mutex<Vec<usize>>,
}

type Reply = fn() -> DownloadSummary;

/// Hands out [`FakeClient`]s, or refuses to when `refuse` is set.
struct FakeConnector {
    calls: Arc<Calls>,
    refuse: bool,
    file_reply: Reply,
    version_reply: Reply,
}

impl FakeConnector {
    fn new(file_reply: Reply, version_reply: Reply) -> Self {
        Self {
            calls: Arc::default(),
            refuse: false,
            file_reply,
            version_reply,
        }
    }
    fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(unreachable_reply, unreachable_reply)
        }
    }
}

fn unreachable_reply() -> DownloadSummary {
    panic!("download attempted without a client")
}

impl Connect for FakeConnector {
    type Client = FakeClient;

    fn connect(&self, _config: &Config) -> Result<FakeClient, DownloadError> {
        let id = self.calls.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            return Err(DownloadError::Config("unreachable service".into()));
        }
        Ok(FakeClient {
            id,
            calls: self.calls.clone(),
            file_reply: self.file_reply,
            version_reply: self.version_reply,
        })
    }
}

struct FakeClient {
    id: usize,
    calls: Arc<Calls>,
    file_reply: Reply,
    version_reply: Reply,
}

#[async_trait]
impl Bintray for FakeClient {
    async fn download_file(&self, _params: &DownloadFileParams) -> DownloadSummary {
        self.calls.files.fetch_add(1, Ordering::SeqCst);
        self.calls.clients_used.lock().unwrap().push(self.id);
        (self.file_reply)()
    }

    async fn download_version(&self, _params: &DownloadVersionParams) -> DownloadSummary {
        self.calls.versions.fetch_add(1, Ordering::SeqCst);
        self.calls.clients_used.lock().unwrap().push(self.id);
        (self.version_reply)()
    }
}

fn file_params() -> DownloadFileParams {
    DownloadFileParams::parse("jfrog/generic/dir/file.bin").unwrap()
}

fn version_params() -> DownloadVersionParams {
    DownloadVersionParams::parse("jfrog/generic/cli/1.0.0").unwrap()
}

fn network_timeout() -> DownloadError {
    DownloadError::Status {
        url: "https://dl.bintray.com/jfrog/generic/cli".into(),
        status: 504,
    }
}

#[tokio::test]
async fn connect_failure_skips_download_file() {
    let connector = FakeConnector::refusing();
    let summary = download_file_with(&connector, &Config::new(), &file_params()).await;
    assert_eq!((summary.downloaded, summary.failed), (0, 0));
    assert!(matches!(summary.error, Some(DownloadError::Config(_))));
    assert_eq!(connector.calls.connects.load(Ordering::SeqCst), 1);
    assert_eq!(connector.calls.files.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connect_failure_skips_download_version() {
    let connector = FakeConnector::refusing();
    let summary = download_version_with(&connector, &Config::new(), &version_params()).await;
    assert_eq!((summary.downloaded, summary.failed), (0, 0));
    assert!(matches!(summary.error, Some(DownloadError::Config(_))));
    assert_eq!(connector.calls.versions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn single_file_result_passes_through() {
    let connector = FakeConnector::new(|| DownloadSummary::new(1, 0), unreachable_reply);
    let summary = download_file_with(&connector, &Config::new(), &file_params()).await;
    assert_eq!((summary.downloaded, summary.failed), (1, 0));
    assert!(summary.error.is_none());
    assert_eq!(connector.calls.files.load(Ordering::SeqCst), 1);
    assert_eq!(connector.calls.versions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn partial_version_failure_passes_through() {
    let connector = FakeConnector::new(unreachable_reply, || DownloadSummary::new(5, 2).with_error(network_timeout()));
    let summary = download_version_with(&connector, &Config::new(), &version_params()).await;
    assert_eq!((summary.downloaded, summary.failed), (5, 2));
    assert!(matches!(summary.error, Some(DownloadError::Status { status: 504, .. })));
}

#[tokio::test]
async fn partial_file_failure_passes_through() {
    let connector = FakeConnector::new(|| DownloadSummary::new(3, 1).with_error(DownloadError::InvalidChecksum), unreachable_reply);
    let summary = download_file_with(&connector, &Config::new(), &file_params()).await;
    assert_eq!((summary.downloaded, summary.failed), (3, 1));
    assert!(matches!(summary.error, Some(DownloadError::InvalidChecksum)));
}

#[tokio::test]
async fn failures_without_error_are_not_invented() {
    let connector = FakeConnector::new(unreachable_reply, || DownloadSummary::new(4, 2));
    let summary = download_version_with(&connector, &Config::new(), &version_params()).await;
    assert_eq!((summary.downloaded, summary.failed), (4, 2));
    assert!(summary.error.is_none());
}

#[tokio::test]
async fn error_with_zero_failures_is_kept() {
    let connector = FakeConnector::new(unreachable_reply, || DownloadSummary::new(0, 0).with_error(network_timeout()));
    let summary = download_version_with(&connector, &Config::new(), &version_params()).await;
    assert_eq!((summary.downloaded, summary.failed), (0, 0));
    assert!(summary.error.is_some());
}

#[tokio::test]
async fn every_call_connects_a_fresh_client() {
    let connector = FakeConnector::new(|| DownloadSummary::new(1, 0), || DownloadSummary::new(2, 0));
    let config = Config::new();
    download_file_with(&connector, &config, &file_params()).await;
    download_file_with(&connector, &config, &file_params()).await;
    download_version_with(&connector, &config, &version_params()).await;
    assert_eq!(connector.calls.connects.load(Ordering::SeqCst), 3);
    assert_eq!(*connector.calls.clients_used.lock().unwrap(), vec![0, 1, 2]);
}
