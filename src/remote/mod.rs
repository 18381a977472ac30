mod gitlab;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::model::GitRemote;

pub use gitlab::{GitLabHost, DEFAULT_HTTP_TIMEOUT};

/// What this system needs from the hosting provider: resolving a branch to a
/// commit id, checking whether a branch exists, and downloading an archive of
/// a ref.
#[async_trait]
pub trait GitHost: Send + Sync {
    /// Resolves `branch` to the commit id it currently points to.
    async fn resolve_commit(
        &self,
        remote: &GitRemote,
        branch: &str,
        access_token: Option<&str>,
    ) -> Result<String, RemoteError>;

    /// Whether `branch` exists on the remote. A missing branch is reported as
    /// `Ok(false)`, never as `BranchNotFound`; this is the double-check used
    /// after a failed resolution.
    async fn branch_exists(
        &self,
        remote: &GitRemote,
        branch: &str,
        access_token: Option<&str>,
    ) -> Result<bool, RemoteError>;

    /// Downloads the archive of `branch` into `dest_dir`, creating the
    /// directory if needed, and returns the path of the written archive file.
    /// A partially written file is removed before an error is returned.
    async fn fetch_archive(
        &self,
        remote: &GitRemote,
        branch: &str,
        access_token: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, RemoteError>;
}

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("branch {branch} was not found on {host}")]
    BranchNotFound { host: String, branch: String },
    #[error("no archive for {branch} on {host}")]
    ArchiveNotFound { host: String, branch: String },
    #[error("{host} rejected the provided credentials")]
    AuthRejected { host: String },
    #[error("{host} returned status {status}")]
    Status { host: String, status: u16 },
    #[error("request to {host} timed out")]
    Timeout { host: String },
    #[error("network error talking to {host}: {source}")]
    Network { host: String, source: reqwest::Error },
    #[error("failed to construct the HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}
