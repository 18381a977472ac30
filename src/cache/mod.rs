use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::{mapref::entry::Entry, DashMap};
use log::{debug, info, warn};
use thiserror::Error;
use tokio::sync::watch;

use crate::{
    archive::{self, ExtractError},
    model::{GitRemote, LoadedRepo, ParseError, RepoRequest},
    remote::{GitHost, RemoteError},
};

pub const DEFAULT_BRANCH: &str = "master";

/// Keyed by (url, branch); the access token deliberately does not affect
/// identity.
type RequestKey = (String, String);

type Outcome = Result<LoadedRepo, LoadError>;

/// Commit-keyed cache of extracted repository trees.
///
/// Each entry is a directory under the cache root named by the commit id a
/// branch resolved to; once promoted, an entry is never mutated. Concurrent
/// loads of the same (url, branch) pair are merged into a single underlying
/// fetch, and every caller observes that fetch's outcome.
#[derive(Clone)]
pub struct RepoCache {
    shared: Arc<Shared>,
}

struct Shared {
    root: PathBuf,
    host: Arc<dyn GitHost>,
    default_branch: String,
    in_flight: DashMap<RequestKey, watch::Receiver<Option<Outcome>>>,
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache location {location} is not a directory")]
    BadLocation { location: String },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Everything a load can fail with. Cloneable so one failure can be handed to
/// every caller waiting on the same key.
#[derive(Error, Debug, Clone)]
pub enum LoadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Remote(Arc<RemoteError>),
    #[error(transparent)]
    Extract(Arc<ExtractError>),
    #[error("IO error: {0}")]
    IO(Arc<io::Error>),
    #[error("load of {url}#{branch} was interrupted by runtime shutdown")]
    Interrupted { url: String, branch: String },
}

impl From<RemoteError> for LoadError {
    fn from(error: RemoteError) -> LoadError {
        LoadError::Remote(Arc::new(error))
    }
}

impl From<ExtractError> for LoadError {
    fn from(error: ExtractError) -> LoadError {
        LoadError::Extract(Arc::new(error))
    }
}

impl From<io::Error> for LoadError {
    fn from(error: io::Error) -> LoadError {
        LoadError::IO(Arc::new(error))
    }
}

impl RepoCache {
    pub fn new(
        root: PathBuf,
        host: Arc<dyn GitHost>,
        default_branch: impl Into<String>,
    ) -> Result<RepoCache, CacheError> {
        if root.exists() {
            if !root.is_dir() {
                return Err(CacheError::BadLocation {
                    location: root.to_str().unwrap_or("").to_string(),
                });
            }
        } else {
            std::fs::create_dir_all(&root)?;
        }

        // Canonical so every returned entry is absolute, however the root was
        // specified.
        let root = root.canonicalize()?;

        Ok(RepoCache {
            shared: Arc::new(Shared {
                root,
                host,
                default_branch: default_branch.into(),
                in_flight: DashMap::new(),
            }),
        })
    }

    pub fn location(&self) -> &Path {
        &self.shared.root
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        if self.shared.root.exists() {
            info!(
                "Clearing repofetch repository cache {}.",
                self.shared.root.display()
            );
            std::fs::remove_dir_all(&self.shared.root)?;
        }
        Ok(())
    }

    /// Loads the tree of the requested branch, fetching it from the host if
    /// the resolved commit is not cached yet.
    ///
    /// All callers that ask for the same (url, branch) while a load is in
    /// flight share the one underlying fetch and receive the same outcome.
    pub async fn load(&self, request: &RepoRequest) -> Result<LoadedRepo, LoadError> {
        let branch = request
            .branch
            .clone()
            .unwrap_or_else(|| self.shared.default_branch.clone());
        let key = (request.url.clone(), branch.clone());

        let mut receiver = match self.shared.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                debug!("Joining the in-flight load of {}#{}", key.0, key.1);
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = watch::channel(None);
                entry.insert(receiver.clone());

                // Detached, so the pipeline runs to completion even if every
                // caller stops waiting.
                let cache = self.clone();
                let request = request.clone();
                let task_key = key.clone();
                tokio::spawn(async move {
                    let outcome = cache.fetch_and_cache(&request, &task_key.1).await;
                    cache.shared.in_flight.remove(&task_key);
                    let _ = sender.send(Some(outcome));
                });

                receiver
            }
        };

        let received = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone(),
            Err(_) => None,
        };
        match received {
            Some(outcome) => outcome,
            None => Err(LoadError::Interrupted {
                url: key.0,
                branch: key.1,
            }),
        }
    }

    async fn fetch_and_cache(&self, request: &RepoRequest, branch: &str) -> Outcome {
        let remote = GitRemote::parse(&request.url)?;
        let token = request.access_token.as_deref();

        let (resolved_branch, commit) = self.resolve(&remote, branch, token).await?;

        let parent_dir = self.shared.root.join(&commit);
        let tree_path = parent_dir.join(remote.tree_dir_name());
        if parent_dir.exists() {
            debug!("Commit {commit} of {remote} is already cached");
            return Ok(LoadedRepo {
                parent_dir,
                path: tree_path,
            });
        }

        info!("Fetching {remote}@{resolved_branch} ({commit})");

        let staging = match tempfile::Builder::new()
            .prefix("temp-")
            .tempdir_in(&self.shared.root)
        {
            Ok(staging) => staging.keep(),
            Err(error) => return Err(error.into()),
        };

        let outcome = self
            .populate(&remote, &resolved_branch, token, &staging, &parent_dir)
            .await;

        // The staging directory is gone on the happy path (renamed into the
        // cache); anything still on disk is a partial or raced attempt.
        remove_dir_best_effort(&staging).await;

        outcome.map(|()| LoadedRepo {
            parent_dir,
            path: tree_path,
        })
    }

    async fn resolve(
        &self,
        remote: &GitRemote,
        branch: &str,
        token: Option<&str>,
    ) -> Result<(String, String), LoadError> {
        match self.shared.host.resolve_commit(remote, branch, token).await {
            Ok(commit) => Ok((branch.to_owned(), commit)),
            Err(error @ RemoteError::BranchNotFound { .. })
                if branch != self.shared.default_branch =>
            {
                // Only fall back when the host agrees the branch is absent. A
                // listing that still contains it means the lookup failure was
                // an inconsistency on the host side, and the original error
                // stands.
                if self.shared.host.branch_exists(remote, branch, token).await? {
                    return Err(error.into());
                }
                let fallback = self.shared.default_branch.clone();
                warn!("Branch {branch} does not exist on {remote}, falling back to {fallback}");
                let commit = self
                    .shared
                    .host
                    .resolve_commit(remote, &fallback, token)
                    .await?;
                Ok((fallback, commit))
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Downloads and extracts into `staging`, then promotes the tree to
    /// `parent_dir` with a rename. Loses gracefully if another process
    /// populated `parent_dir` in the meantime.
    async fn populate(
        &self,
        remote: &GitRemote,
        branch: &str,
        token: Option<&str>,
        staging: &Path,
        parent_dir: &Path,
    ) -> Result<(), LoadError> {
        let archive_path = self
            .shared
            .host
            .fetch_archive(remote, branch, token, staging)
            .await?;

        let tree_dir = staging.join(remote.tree_dir_name());
        archive::extract(archive_path.clone(), tree_dir).await?;

        // The archive itself is not part of the cache entry.
        tokio::fs::remove_file(&archive_path).await?;

        if tokio::fs::try_exists(parent_dir).await.unwrap_or(false) {
            debug!(
                "{} appeared while extracting, discarding this attempt",
                parent_dir.display()
            );
            return Ok(());
        }
        match tokio::fs::rename(staging, parent_dir).await {
            Ok(()) => Ok(()),
            // Lost the promotion race: the canonical path was created between
            // the existence check and the rename.
            Err(_) if parent_dir.exists() => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

async fn remove_dir_best_effort(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => warn!(
            "Failed to remove staging directory {}: {error}",
            path.display()
        ),
    }
}
