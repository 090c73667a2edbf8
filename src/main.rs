use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mnemosyne::cli::{
    handle_backup, handle_config, handle_init_key, handle_init_store, handle_mount, handle_verify,
};
use mnemosyne::config::paths::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use mnemosyne::config::Config;

#[derive(Parser)]
#[command(
    name = "mnemosyne",
    version,
    about = "Encrypted generational backups to a remote share",
    long_about = "mnemosyne backs up local directories into a LUKS-encrypted btrfs \
                  volume stored as a single file on a remote share, keeping a fixed \
                  number of snapshot generations per directory."
)]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup cycle over every configured directory
    Backup,

    /// Mount the backup volume and keep it mounted until Ctrl-C
    Mount,

    /// Create and format a new encrypted store on the remote
    InitStore,

    /// Generate a new random keyfile at the configured path
    InitKey {
        /// Replace an existing keyfile
        #[arg(long)]
        force: bool,
    },

    /// Check that this host can run backups
    Verify,

    /// Show the resolved configuration
    Config,
}

fn init_logging(verbose: u8) {
    let default = if verbose > 0 { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Verify => handle_verify()?,
        Commands::Backup => handle_backup(&Config::load(&cli.config)?)?,
        Commands::Mount => handle_mount(&Config::load(&cli.config)?)?,
        Commands::InitStore => handle_init_store(&Config::load(&cli.config)?)?,
        Commands::InitKey { force } => handle_init_key(&Config::load(&cli.config)?, force)?,
        Commands::Config => handle_config(&cli.config, &Config::load(&cli.config)?),
    }

    Ok(())
}
