use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, trace, warn};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use crate::model::GitRemote;

use super::{GitHost, RemoteError};

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Host backend speaking the GitLab REST API.
///
/// Branch lookups go through `/api/v4/projects/{id}/repository/branches`;
/// archives are downloaded from the per-project archive endpoint. The access
/// token, when present, is forwarded as the `private_token` query parameter.
pub struct GitLabHost {
    client: Client,
}

impl GitLabHost {
    pub fn new(timeout: Duration) -> Result<GitLabHost, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("repofetch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RemoteError::Client)?;

        Ok(GitLabHost { client })
    }

    fn get(&self, url: &str, access_token: Option<&str>) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match access_token {
            Some(token) => request.query(&[("private_token", token)]),
            None => request,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BranchDetails {
    commit: CommitDetails,
}

#[derive(Debug, Deserialize)]
struct CommitDetails {
    id: String,
}

#[derive(Debug, Deserialize)]
struct BranchSummary {
    name: String,
}

#[async_trait]
impl GitHost for GitLabHost {
    async fn resolve_commit(
        &self,
        remote: &GitRemote,
        branch: &str,
        access_token: Option<&str>,
    ) -> Result<String, RemoteError> {
        let url = format!(
            "{}/projects/{}/repository/branches/{}",
            remote.api_base_url(),
            remote.project_id(),
            branch
        );
        debug!("Resolving {branch} on {remote}");

        let response = self
            .get(&url, access_token)
            .send()
            .await
            .map_err(|error| request_error(&remote.host, error))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RemoteError::BranchNotFound {
                host: remote.host.clone(),
                branch: branch.to_owned(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::AuthRejected {
                host: remote.host.clone(),
            }),
            status if !status.is_success() => Err(RemoteError::Status {
                host: remote.host.clone(),
                status: status.as_u16(),
            }),
            _ => {
                let details: BranchDetails = response
                    .json()
                    .await
                    .map_err(|error| request_error(&remote.host, error))?;
                trace!("Branch {branch} of {remote} is at {}", details.commit.id);
                Ok(details.commit.id)
            }
        }
    }

    async fn branch_exists(
        &self,
        remote: &GitRemote,
        branch: &str,
        access_token: Option<&str>,
    ) -> Result<bool, RemoteError> {
        let url = format!(
            "{}/projects/{}/repository/branches",
            remote.api_base_url(),
            remote.project_id()
        );
        debug!("Listing branches of {remote}");

        let response = self
            .get(&url, access_token)
            .send()
            .await
            .map_err(|error| request_error(&remote.host, error))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::AuthRejected {
                host: remote.host.clone(),
            }),
            status if !status.is_success() => Err(RemoteError::Status {
                host: remote.host.clone(),
                status: status.as_u16(),
            }),
            _ => {
                let branches: Vec<BranchSummary> = response
                    .json()
                    .await
                    .map_err(|error| request_error(&remote.host, error))?;
                Ok(branches.iter().any(|summary| summary.name == branch))
            }
        }
    }

    async fn fetch_archive(
        &self,
        remote: &GitRemote,
        branch: &str,
        access_token: Option<&str>,
        dest_dir: &Path,
    ) -> Result<PathBuf, RemoteError> {
        tokio::fs::create_dir_all(dest_dir).await?;

        let url = remote.archive_url(branch);
        let archive_path = dest_dir.join(format!("{}.zip", remote.tree_dir_name()));
        debug!("Downloading {url} to {}", archive_path.display());

        let response = self
            .get(&url, access_token)
            .send()
            .await
            .map_err(|error| request_error(&remote.host, error))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RemoteError::ArchiveNotFound {
                host: remote.host.clone(),
                branch: branch.to_owned(),
            }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::AuthRejected {
                host: remote.host.clone(),
            }),
            status if !status.is_success() => Err(RemoteError::Status {
                host: remote.host.clone(),
                status: status.as_u16(),
            }),
            _ => match stream_to_disk(response, &archive_path, &remote.host).await {
                Ok(()) => Ok(archive_path),
                Err(error) => {
                    match tokio::fs::remove_file(&archive_path).await {
                        Ok(()) => {}
                        Err(remove_error) if remove_error.kind() == io::ErrorKind::NotFound => {}
                        Err(remove_error) => warn!(
                            "Failed to remove partial archive {}: {remove_error}",
                            archive_path.display()
                        ),
                    }
                    Err(error)
                }
            },
        }
    }
}

async fn stream_to_disk(
    mut response: Response,
    path: &Path,
    host: &str,
) -> Result<(), RemoteError> {
    let mut file = tokio::fs::File::create(path).await?;
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|error| request_error(host, error))?
    {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

fn request_error(host: &str, source: reqwest::Error) -> RemoteError {
    if source.is_timeout() {
        RemoteError::Timeout {
            host: host.to_owned(),
        }
    } else {
        RemoteError::Network {
            host: host.to_owned(),
            source,
        }
    }
}
