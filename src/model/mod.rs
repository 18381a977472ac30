use std::{fmt::Display, path::PathBuf};

use regex_lite::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("git url not supported: {0}")]
    UnsupportedRemote(String),
}

/// One requested unit of work: which repository, which branch, which
/// credential. Two requests are the same for caching and deduplication
/// purposes iff `url` and `branch` are equal; the token is not part of the
/// identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRequest {
    pub url: String,
    pub branch: Option<String>,
    pub access_token: Option<String>,
}

impl RepoRequest {
    pub fn new(url: impl Into<String>) -> RepoRequest {
        RepoRequest {
            url: url.into(),
            branch: None,
            access_token: None,
        }
    }
}

/// A git remote split into the pieces the host API needs.
///
/// Exactly two remote forms are recognized: `https://host/path.git` and
/// `git@host:path.git`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRemote {
    pub host: String,
    pub project_path: String,
}

impl GitRemote {
    pub fn parse(url: &str) -> Result<GitRemote, ParseError> {
        let https = Regex::new(r"^https?://(?P<host>[^/]+)/(?P<path>.+)\.git$").unwrap();
        let ssh = Regex::new(r"^git@(?P<host>[^:]+):(?P<path>.+)\.git$").unwrap();

        let captures = https
            .captures(url)
            .or_else(|| ssh.captures(url))
            .ok_or_else(|| ParseError::UnsupportedRemote(url.to_owned()))?;

        Ok(GitRemote {
            host: captures["host"].to_owned(),
            project_path: captures["path"].to_owned(),
        })
    }

    pub fn api_base_url(&self) -> String {
        format!("https://{}/api/v4", self.host)
    }

    /// The project path in the form the API expects in path segments.
    pub fn project_id(&self) -> String {
        self.project_path.replace('/', "%2F")
    }

    /// Download URL for an archive of `branch`. Derived from the remote alone,
    /// no network involved.
    pub fn archive_url(&self, branch: &str) -> String {
        format!(
            "https://{}/{}/repository/archive.zip?ref={}",
            self.host, self.project_path, branch
        )
    }

    /// Name of the directory holding the extracted tree inside a cache entry.
    pub fn tree_dir_name(&self) -> String {
        format!("{}_{}", self.host, self.project_path.replace('/', "_"))
    }
}

impl Display for GitRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.host, self.project_path)
    }
}

/// Where a loaded repository ended up: the commit-keyed cache entry and the
/// extracted tree inside it. Both paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedRepo {
    pub parent_dir: PathBuf,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn parse_https_remote() {
        let remote = GitRemote::parse("https://git.example.com/group/project.git").unwrap();
        assert_eq!(
            remote,
            GitRemote {
                host: "git.example.com".to_owned(),
                project_path: "group/project".to_owned(),
            }
        );
    }

    #[test]
    fn parse_http_remote() {
        let remote = GitRemote::parse("http://git.example.com/group/project.git").unwrap();
        assert_eq!(remote.host, "git.example.com");
    }

    #[test]
    fn parse_ssh_remote() {
        let remote = GitRemote::parse("git@git.example.com:group/sub/project.git").unwrap();
        assert_eq!(
            remote,
            GitRemote {
                host: "git.example.com".to_owned(),
                project_path: "group/sub/project".to_owned(),
            }
        );
    }

    #[test]
    fn reject_other_remote_forms() {
        for url in [
            "ssh://git@git.example.com/group/project.git",
            "https://git.example.com/group/project",
            "git.example.com:group/project.git",
            "",
        ] {
            assert_eq!(
                GitRemote::parse(url),
                Err(ParseError::UnsupportedRemote(url.to_owned())),
                "{url} should not parse"
            );
        }
    }

    #[test]
    fn derived_urls() {
        let remote = GitRemote::parse("https://git.example.com/group/project.git").unwrap();
        assert_eq!(remote.api_base_url(), "https://git.example.com/api/v4");
        assert_eq!(remote.project_id(), "group%2Fproject");
        assert_eq!(
            remote.archive_url("main"),
            "https://git.example.com/group/project/repository/archive.zip?ref=main"
        );
        assert_eq!(remote.tree_dir_name(), "git.example.com_group_project");
    }
}
