use log::info;

use crate::{
    cache::RepoCache,
    model::{LoadedRepo, RepoRequest},
};

/// Handler to load command
pub async fn do_load(cache: &RepoCache, request: &RepoRequest) -> anyhow::Result<LoadedRepo> {
    let loaded = cache.load(request).await?;

    info!("Loaded {} into {}", request.url, loaded.path.display());

    Ok(loaded)
}

/// Handler to clear-cache command
pub fn do_clear_cache(cache: &RepoCache) -> anyhow::Result<()> {
    cache.clear()
}
