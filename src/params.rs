use crate::error::DownloadError;
use std::str::FromStr;

const DEFAULT_MIN_SPLIT_SIZE: u64 = 5 * 1024 * 1024;
const DEFAULT_SPLIT_COUNT: u8 = 3;

/// A file inside a repository, written as `subject/repo/path/to/file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathDetails {
    pub subject: String,
    pub repo: String,
    pub path: String,
}

impl PathDetails {
    pub fn new(subject: impl Into<String>, repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            repo: repo.into(),
            path: path.into(),
        }
    }
    pub(crate) fn remote_path(&self) -> String {
        format!("{}/{}/{}", self.subject, self.repo, self.path)
    }
}

impl FromStr for PathDetails {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DownloadError::InvalidPath(format!("expected subject/repo/path, got {s:?}"));
        let mut parts = s.trim_start_matches('/').splitn(3, '/');
        let subject = parts.next().filter(|p| is_segment(p)).ok_or_else(invalid)?;
        let repo = parts.next().filter(|p| is_segment(p)).ok_or_else(invalid)?;
        let path = parts.next().ok_or_else(invalid)?;
        if path.is_empty() || path.ends_with('/') || !path.split('/').all(is_segment) {
            return Err(invalid());
        }
        Ok(Self::new(subject, repo, path))
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".."
}

/// A package version, written as `subject/repo/package/version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDetails {
    pub subject: String,
    pub repo: String,
    pub package: String,
    pub version: String,
}

impl FromStr for VersionDetails {
    type Err = DownloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s.trim_matches('/').split('/').collect::<Vec<_>>();
        match parts.as_slice() {
            [subject, repo, package, version] if parts.iter().all(|p| is_segment(p)) => Ok(Self {
                subject: subject.to_string(),
                repo: repo.to_string(),
                package: package.to_string(),
                version: version.to_string(),
            }),
            _ => Err(DownloadError::InvalidPath(format!(
                "expected subject/repo/package/version, got {s:?}"
            ))),
        }
    }
}

/// Where and how a downloaded file is written locally, shared by both operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOptions {
    pub target_path: String,
    pub flat: bool,
    pub include_unpublished: bool,
    pub min_split_size: u64,
    pub split_count: u8,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            target_path: String::new(),
            flat: false,
            include_unpublished: false,
            min_split_size: DEFAULT_MIN_SPLIT_SIZE,
            split_count: DEFAULT_SPLIT_COUNT,
        }
    }
}

macro_rules! target_builders {
    ($ty:ty) => {
        impl $ty {
            pub fn with_target_path(mut self, target: impl Into<String>) -> Self {
                self.options.target_path = target.into();
                self
            }
            pub fn with_flat(mut self, flat: bool) -> Self {
                self.options.flat = flat;
                self
            }
            pub fn with_include_unpublished(mut self, include: bool) -> Self {
                self.options.include_unpublished = include;
                self
            }
            pub fn with_min_split_size(mut self, size: u64) -> Self {
                self.options.min_split_size = size;
                self
            }
            pub fn with_split_count(mut self, count: u8) -> Self {
                self.options.split_count = count;
                self
            }
            pub fn options(&self) -> &TargetOptions {
                &self.options
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFileParams {
    pub path: PathDetails,
    pub(crate) options: TargetOptions,
}

impl DownloadFileParams {
    pub fn new(path: PathDetails) -> Self {
        Self {
            path,
            options: TargetOptions::default(),
        }
    }
    pub fn parse(path: &str) -> Result<Self, DownloadError> {
        Ok(Self::new(path.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadVersionParams {
    pub version: VersionDetails,
    pub(crate) options: TargetOptions,
}

impl DownloadVersionParams {
    pub fn new(version: VersionDetails) -> Self {
        Self {
            version,
            options: TargetOptions::default(),
        }
    }
    pub fn parse(version: &str) -> Result<Self, DownloadError> {
        Ok(Self::new(version.parse()?))
    }
}

target_builders!(DownloadFileParams);
target_builders!(DownloadVersionParams);
