use crate::error::{ChecksumError, DownloadError};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_BUFFER: usize = 64 * 1024;

/// An expected digest together with the running hasher that checks it.
pub struct Checksum {
    hasher: Hasher,
    checksum_type: CsType,
    contents: String,
}

impl Checksum {
    pub fn new_inner(hash: impl Into<String>, checksum_type: CsType) -> Self {
        Self {
            hasher: checksum_type.into(),
            checksum_type,
            contents: hash.into().to_ascii_lowercase(),
        }
    }
    /// Infers the algorithm from the length of the hex digest.
    pub fn new(hash: impl Into<String>) -> Result<Self, ChecksumError> {
        let hash = hash.into();
        let checksum_type = CsType::from_hex_len(hash.len()).ok_or(ChecksumError::UnrecognizedSize)?;
        Ok(Self::new_inner(hash, checksum_type))
    }
    pub fn checksum_type(&self) -> CsType {
        self.checksum_type
    }
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }
    pub fn verify(self) -> Result<(), ChecksumError> {
        if self.hasher.finalize_hex() == self.contents {
            Ok(())
        } else {
            Err(ChecksumError::VerificationFailure)
        }
    }
    /// Hex digest of a file already on disk.
    pub async fn of_file(path: &Path, checksum_type: CsType) -> Result<String, DownloadError> {
        let mut file = tokio::fs::File::open(path).await?;
        let mut hasher = Hasher::from(checksum_type);
        let mut buf = vec![0; READ_BUFFER];
        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(hasher.finalize_hex())
    }
}

pub(crate) enum Hasher {
    Md5(Md5),
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
}

impl Hasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(hasher) => hasher.update(data),
            Self::Sha1(hasher) => hasher.update(data),
            Self::Sha224(hasher) => hasher.update(data),
            Self::Sha256(hasher) => hasher.update(data),
            Self::Sha384(hasher) => hasher.update(data),
            Self::Sha512(hasher) => hasher.update(data),
        }
    }
    fn finalize_hex(self) -> String {
        match self {
            Self::Md5(hasher) => format!("{:x}", hasher.finalize()),
            Self::Sha1(hasher) => format!("{:x}", hasher.finalize()),
            Self::Sha224(hasher) => format!("{:x}", hasher.finalize()),
            Self::Sha256(hasher) => format!("{:x}", hasher.finalize()),
            Self::Sha384(hasher) => format!("{:x}", hasher.finalize()),
            Self::Sha512(hasher) => format!("{:x}", hasher.finalize()),
        }
    }
}

impl From<CsType> for Hasher {
    fn from(value: CsType) -> Self {
        match value {
            CsType::MD5 => Self::Md5(Md5::new()),
            CsType::Sha1 => Self::Sha1(Sha1::new()),
            CsType::Sha224 => Self::Sha224(Sha224::new()),
            CsType::Sha256 => Self::Sha256(Sha256::new()),
            CsType::Sha384 => Self::Sha384(Sha384::new()),
            CsType::Sha512 => Self::Sha512(Sha512::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsType {
    MD5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl CsType {
    fn from_hex_len(len: usize) -> Option<Self> {
        Some(match len {
            32 => Self::MD5,
            40 => Self::Sha1,
            56 => Self::Sha224,
            64 => Self::Sha256,
            96 => Self::Sha384,
            128 => Self::Sha512,
            _ => return None,
        })
    }
}
