use crate::error::DownloadError;
use once_cell::sync::Lazy;
use std::path::{Component, Path, PathBuf};

static CURRENT_DIR: Lazy<PathBuf> = Lazy::new(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

/// Resolves where a remote `path` (relative to its repository) lands on disk.
///
/// A `target` ending in `/` names a directory, any other non-empty target is
/// the destination file itself. Unless `flat`, the remote directory layout is
/// recreated below the target directory. The remote path must stay relative
/// and may not climb out with `..`.
pub(crate) fn local_path(path: &str, target: &str, flat: bool) -> Result<PathBuf, DownloadError> {
    ensure_relative(path)?;
    let (remote_dir, filename) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };
    let nested = |base: &Path| match (flat, remote_dir) {
        (false, Some(dir)) => base.join(dir).join(filename),
        _ => base.join(filename),
    };
    Ok(if target.is_empty() {
        nested(&CURRENT_DIR)
    } else if target.ends_with('/') || target.ends_with(std::path::MAIN_SEPARATOR) {
        nested(&absolute(target))
    } else {
        absolute(target)
    })
}

/// Rejects paths that are absolute or contain `..`.
fn ensure_relative(path: &str) -> Result<(), DownloadError> {
    let escapes = Path::new(path)
        .components()
        .any(|component| matches!(component, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes || path.is_empty() || path.ends_with('/') {
        return Err(DownloadError::InvalidPath(format!("refusing to write outside the target: {path:?}")));
    }
    Ok(())
}

fn absolute(target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        CURRENT_DIR.join(target)
    }
}
