use anyhow::Result;
use clap::Parser;
use multiarch::{
    api,
    cli::{Cli, Commands},
    error::describe,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {}", describe(&e));
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Login {
            registry,
            username,
            password,
        } => api::authenticate(&registry, &username, &password),
        Commands::Mutate {
            base,
            tag,
            platform,
            entrypoint,
            append,
        } => {
            let append = append
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            api::mutate_image(&platform, &entrypoint, &append, &base, &tag).await
        }
        Commands::ManifestList { target, sources } => {
            api::create_manifest_list(&target, &sources).await
        }
        Commands::Version => {
            println!("multiarch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
