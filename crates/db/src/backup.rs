use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("`{0}` is not a file-backed sqlite URL")]
    NotAFile(String),
    #[error("backup database `{0}` does not exist")]
    MissingBackup(PathBuf),
    #[error("could not copy `{from}` to `{to}`: {source}")]
    Copy { from: PathBuf, to: PathBuf, source: std::io::Error },
    #[error("could not remove stale `{path}`: {source}")]
    StaleSideFile { path: PathBuf, source: std::io::Error },
}

/// Extracts the filesystem path from a `sqlite://` URL, dropping any query string.
pub fn sqlite_file_path(url: &str) -> Result<PathBuf, BackupError> {
    let path = url
        .trim()
        .strip_prefix("sqlite://")
        .map(|rest| rest.split('?').next().unwrap_or(rest))
        .filter(|path| !path.is_empty() && *path != ":memory:")
        .ok_or_else(|| BackupError::NotAFile(url.to_string()))?;
    Ok(PathBuf::from(path))
}

/// Overwrites `local` with a pristine copy of `backup`, discarding any rebookings made since.
///
/// Stale WAL side files of the working copy are removed so they cannot be replayed on top.
/// Callers must close every pool on `local` first.
pub async fn restore_from_backup(backup: &Path, local: &Path) -> Result<u64, BackupError> {
    if !tokio::fs::try_exists(backup).await.unwrap_or(false) {
        return Err(BackupError::MissingBackup(backup.to_path_buf()));
    }

    let bytes = tokio::fs::copy(backup, local).await.map_err(|source| BackupError::Copy {
        from: backup.to_path_buf(),
        to: local.to_path_buf(),
        source,
    })?;

    for suffix in ["-wal", "-shm"] {
        let mut side_file = local.as_os_str().to_owned();
        side_file.push(suffix);
        let side_file = PathBuf::from(side_file);
        match tokio::fs::remove_file(&side_file).await {
            Ok(()) => {}
            Err(error) if error.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(BackupError::StaleSideFile { path: side_file, source }),
        }
    }

    info!(
        event_name = "database.restored_from_backup",
        backup = %backup.display(),
        local = %local.display(),
        bytes,
        "working database restored from backup"
    );
    Ok(bytes)
}
