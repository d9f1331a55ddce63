// SPDX-License-Identifier: AGPL-3.0-or-later
//! snapfs CLI
//!
//! Browse the snapshots of a backup repository as a read-only filesystem,
//! from the terminal or over HTTP.

mod commands;
mod range;
mod serve;

use clap::{Parser, Subcommand};
use snapfs_cache::parse_size;
use snapfs_core::{Context, SnapResult};
use snapfs_providers::LocalRepository;
use snapfs_vfs::{VfsConfig, VirtualFilesystem};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snapfs")]
#[command(author, version, long_about = None)]
#[command(about = "Browse backup snapshots as a read-only filesystem")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository directory
    #[arg(short, long, global = true, default_value = ".")]
    repo: PathBuf,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Chunk cache budget, e.g. "128MiB"
    #[arg(long, global = true, value_parser = parse_size)]
    cache_size: Option<u64>,

    /// Only show snapshots from this host (repeatable)
    #[arg(long = "host", global = true)]
    hosts: Vec<String>,

    /// Only show snapshots with this tag (repeatable)
    #[arg(long = "tag", global = true)]
    tags: Vec<String>,

    /// Only show snapshots including this path (repeatable)
    #[arg(long = "path", id = "snapshot_paths", global = true)]
    paths: Vec<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the repository over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:0")]
        listen: SocketAddr,
    },

    /// List snapshots
    Snapshots,

    /// List directory contents
    #[command(alias = "dir")]
    Ls {
        /// Path to list ("." is the snapshot list)
        #[arg(default_value = ".")]
        path: String,

        /// Long format with details
        #[arg(short, long)]
        long: bool,

        /// Human-readable sizes
        #[arg(short = 'H', long)]
        human: bool,
    },

    /// Display file contents
    Cat {
        /// File to display
        path: String,
    },

    /// Show file or directory information
    Stat {
        /// Path to inspect
        path: String,
    },
}

impl Cli {
    /// Config file values, overridden by flags
    fn vfs_config(&self) -> SnapResult<VfsConfig> {
        let mut config = match &self.config {
            Some(path) => VfsConfig::load(path)?,
            None => VfsConfig::default(),
        };

        if let Some(size) = self.cache_size {
            config.cache.max_size = size;
        }
        if !self.hosts.is_empty() {
            config.filter.hosts = self.hosts.clone();
        }
        if !self.tags.is_empty() {
            config.filter.tags = self.tags.clone();
        }
        if !self.paths.is_empty() {
            config.filter.paths = self.paths.clone();
        }

        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> SnapResult<()> {
    let config = cli.vfs_config()?;
    let ctx = Context::background();

    let repo = Arc::new(LocalRepository::open(&cli.repo));
    let fs = VirtualFilesystem::new(repo, config, &ctx).await?;

    match cli.command {
        Commands::Serve { listen } => serve::serve(Arc::new(fs), listen).await,
        Commands::Snapshots => commands::snapshots(&fs),
        Commands::Ls { path, long, human } => commands::ls(&fs, &ctx, &path, long, human).await,
        Commands::Cat { path } => commands::cat(&fs, &ctx, &path).await,
        Commands::Stat { path } => commands::stat(&fs, &ctx, &path).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapfs.toml");
        let toml = "[cache]\nmax_size = 1024\n\n[filter]\ntags = [\"weekly\"]\n";
        std::fs::write(&path, toml).unwrap();

        let cli = Cli::try_parse_from([
            "snapfs",
            "--config",
            path.to_str().unwrap(),
            "--cache-size",
            "2MiB",
            "--host",
            "laptop",
            "ls",
            "2024-01-01T00:00:00Z/docs",
        ])
        .unwrap();

        let config = cli.vfs_config().unwrap();
        assert_eq!(config.cache.max_size, 2 * 1024 * 1024);
        assert_eq!(config.filter.hosts, ["laptop"]);
        assert_eq!(config.filter.tags, ["weekly"]);
        assert!(matches!(
            cli.command,
            Commands::Ls { ref path, .. } if path == "2024-01-01T00:00:00Z/docs"
        ));
    }

    #[test]
    fn test_path_filter_and_ls_path_are_distinct() {
        let cli = Cli::try_parse_from(["snapfs", "ls", "--path", "/home", "."]).unwrap();
        assert_eq!(cli.paths, ["/home"]);
        assert!(matches!(cli.command, Commands::Ls { ref path, .. } if path == "."));
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["snapfs", "serve"]).unwrap();
        match cli.command {
            Commands::Serve { listen } => assert_eq!(listen.to_string(), "127.0.0.1:0"),
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_bad_cache_size() {
        assert!(Cli::try_parse_from(["snapfs", "--cache-size", "lots", "snapshots"]).is_err());
    }
}
