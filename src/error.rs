use thiserror::Error;

#[cfg(feature = "verification")]
#[derive(Debug, Error)]
pub enum ChecksumError {
    #[error("Could not recognize the length of inputted checksum")]
    UnrecognizedSize,
    #[error("Unrecognized checksum type")]
    UnrecognizedType,
    #[error("Input file does not match the given checksum")]
    VerificationFailure,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid Bintray path: {0}")]
    InvalidPath(String),
    #[error("Unable to parse URL")]
    URLParse,
    #[error("Unable to determine length of content")]
    ContentLength,
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("{0}")]
    RequestError(#[from] reqwest_middleware::Error),
    #[error("{0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Unable to parse version file list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    FileError(#[from] tokio::io::Error),
    #[error("Downloaded content does not match the remote checksum")]
    InvalidChecksum,
    #[cfg(feature = "verification")]
    #[error("{0}")]
    Checksum(#[from] ChecksumError),
}
