//! Materialization of hosting-provider archives on disk.

use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unreadable archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Extracts `archive_path` into `target_dir` on the blocking thread pool and
/// returns `target_dir`.
pub async fn extract(archive_path: PathBuf, target_dir: PathBuf) -> Result<PathBuf, ExtractError> {
    tokio::task::spawn_blocking(move || extract_blocking(&archive_path, &target_dir))
        .await
        .map_err(|join_error| ExtractError::IO(io::Error::other(join_error)))?
}

/// Extracts the archive into `target_dir`, stripping the single top-level
/// directory the provider wraps around the tree.
///
/// Only file entries are written; directory entries are skipped and parents
/// are created on demand. Every written file is synced before returning, so a
/// successful return means the tree is complete on stable storage.
pub fn extract_blocking(archive_path: &Path, target_dir: &Path) -> Result<PathBuf, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    std::fs::create_dir_all(target_dir)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(entry_path) = entry.enclosed_name() else {
            continue;
        };
        let stripped: PathBuf = entry_path.components().skip(1).collect();
        if stripped.as_os_str().is_empty() {
            continue;
        }

        let destination = target_dir.join(stripped);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&destination)?;
        io::copy(&mut entry, &mut output)?;
        output.sync_all()?;
    }

    Ok(target_dir.to_path_buf())
}
