use crate::{
    cache::RepoCache,
    cli::command_handlers::{do_clear_cache, do_load},
    model::{LoadedRepo, RepoRequest},
};

mod builder;

pub use builder::RepofetchBuilder;

pub struct Repofetch {
    cache: RepoCache,
}

impl Repofetch {
    pub fn builder() -> RepofetchBuilder {
        RepofetchBuilder::default()
    }

    /// Fetches the requested branch into the local cache and returns where
    /// the extracted tree lives.
    pub async fn load(&self, request: &RepoRequest) -> anyhow::Result<LoadedRepo> {
        do_load(&self.cache, request).await
    }

    pub fn clear_cache(&self) -> anyhow::Result<()> {
        do_clear_cache(&self.cache)
    }
}
