use std::{env, path::PathBuf, sync::Arc, time::Duration};

use crate::{
    cache::{RepoCache, DEFAULT_BRANCH},
    remote::{GitLabHost, DEFAULT_HTTP_TIMEOUT},
    Repofetch,
};

#[derive(Default)]
pub struct RepofetchBuilder {
    // All other paths are relative to `root`
    root: Option<PathBuf>,
    cache_directory_path: Option<PathBuf>,
    default_branch: Option<String>,
    http_timeout: Option<Duration>,
}

impl RepofetchBuilder {
    /// Project root directory.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Location of the repofetch cache directory.
    ///
    /// Defaults to `.repofetch-cache` under the root.
    pub fn cache_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_directory_path = Some(path.into());
        self
    }

    /// Branch used when a request names none, and the fallback when the
    /// requested branch does not exist on the host.
    ///
    /// Defaults to `master`.
    pub fn default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }

    /// Upper bound on each HTTP request to the host.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    pub fn try_build(self) -> anyhow::Result<Repofetch> {
        let Self {
            root,
            cache_directory_path,
            default_branch,
            http_timeout,
        } = self;

        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };

        let cache_directory = root.join(cache_directory_path.unwrap_or_else(default_cache_directory));

        let host = GitLabHost::new(http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT))?;

        let cache = RepoCache::new(
            cache_directory,
            Arc::new(host),
            default_branch.unwrap_or_else(|| DEFAULT_BRANCH.to_owned()),
        )?;

        Ok(Repofetch { cache })
    }
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from(".repofetch-cache")
}
