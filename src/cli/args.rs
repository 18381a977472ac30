use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fetch and cache remote Git repository trees.
#[derive(Debug, Parser)]
#[clap(version)]
pub struct CliArgs {
    #[clap(subcommand)]
    pub cmd: Command,
    /// Location of the cache directory
    #[clap(short, long)]
    pub cache_directory: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    ///Fetches the tree of a repository branch into the local cache
    Load {
        /// Repository remote, https://host/path.git or git@host:path.git
        url: String,
        /// Branch to fetch; defaults to the configured default branch
        #[clap(short, long)]
        branch: Option<String>,
        /// Access token forwarded to the host API
        #[clap(short, long, env = "REPOFETCH_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    ///Removes every cached repository tree
    ClearCache,
}
