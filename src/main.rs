use clap::Parser;
use repofetch::{
    cli::args::{CliArgs, Command},
    config::RepofetchConfig,
    model::RepoRequest,
    Repofetch,
};

async fn run() -> anyhow::Result<()> {
    let cli_args = CliArgs::parse();
    let config = RepofetchConfig::load()?;

    let mut builder = Repofetch::builder();
    if let Some(cache_directory) = cli_args.cache_directory.or(config.cache_dir) {
        builder = builder.cache_directory(cache_directory);
    }
    if let Some(branch) = config.default_branch {
        builder = builder.default_branch(branch);
    }
    let repofetch = builder.try_build()?;

    match cli_args.cmd {
        Command::Load { url, branch, token } => {
            let loaded = repofetch
                .load(&RepoRequest {
                    url,
                    branch,
                    access_token: token,
                })
                .await?;
            println!("{}", loaded.path.display());
            Ok(())
        }
        Command::ClearCache => repofetch.clear_cache(),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
