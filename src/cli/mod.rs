use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants;

#[derive(Parser)]
#[command(name = "multiarch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store registry credentials for later commands
    Login {
        /// Registry host (e.g., ghcr.io, localhost:5000)
        registry: String,

        /// Registry username
        #[arg(short, long)]
        username: String,

        /// Registry password or token
        #[arg(short, long, env = "MULTIARCH_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Replace the entrypoint of an image and/or append a layer to it
    Mutate {
        /// Base image reference
        base: String,

        /// Tag to publish the mutated image as
        #[arg(short, long)]
        tag: String,

        /// Platform to pick when the base is a manifest list (e.g., linux/arm64)
        #[arg(long, default_value = constants::platform::DEFAULT)]
        platform: String,

        /// New entrypoint as a comma-separated list
        #[arg(long, default_value = "")]
        entrypoint: String,

        /// Tar archive (optionally gzipped) to append as a layer
        #[arg(long)]
        append: Option<PathBuf>,
    },

    /// Create a manifest list from single-platform images
    ManifestList {
        /// Tag to publish the manifest list as
        target: String,

        /// Source images, comma-separated
        /// (e.g., ghcr.io/me/app:amd64,ghcr.io/me/app:arm64)
        sources: String,
    },

    /// Show version information
    Version,
}
