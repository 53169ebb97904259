//! Command-line argument parsing

use crate::config::DEFAULT_CONFIG_FILE;
use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "registry-sync")]
#[command(about = "Sync container images between registries using skopeo")]
#[command(version, author)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet output
    #[arg(
        long = "quiet",
        short = 'q',
        global = true,
        conflicts_with = "verbose",
        help = "Only print errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Copy every configured image to the destination registry
    Sync(SyncArgs),
    /// Print the version-release tag and digest of every configured image
    Dump(DumpArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SyncArgs {
    #[arg(
        long = "config",
        short = 'c',
        default_value = DEFAULT_CONFIG_FILE,
        help = "Configuration file"
    )]
    pub config: String,

    #[arg(
        long = "threads",
        short = 't',
        default_value = "8",
        help = "Number of concurrent sync workers"
    )]
    pub threads: usize,

    #[arg(
        long = "no-modify",
        short = 'N',
        visible_alias = "dry-run",
        help = "Do not modify destination registry"
    )]
    pub no_modify: bool,

    #[arg(
        long = "timeout",
        default_value = "0",
        help = "Timeout per skopeo invocation in seconds (0 = none)"
    )]
    pub timeout: u64,

    #[arg(
        long = "retry",
        default_value = "0",
        help = "Number of retry attempts for failed copies"
    )]
    pub retry: u32,
}

#[derive(ClapArgs, Debug)]
pub struct DumpArgs {
    #[arg(
        long = "config",
        short = 'c',
        default_value = DEFAULT_CONFIG_FILE,
        help = "Configuration file"
    )]
    pub config: String,

    #[arg(
        long = "threads",
        short = 't',
        default_value = "5",
        help = "Number of concurrent inspect workers"
    )]
    pub threads: usize,

    #[arg(long = "tag", short = 'T', help = "Dump image info with specified tag")]
    pub tag: Option<String>,

    #[arg(
        long = "timeout",
        default_value = "0",
        help = "Timeout per skopeo invocation in seconds (0 = none)"
    )]
    pub timeout: u64,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        let threads = match &self.command {
            Command::Sync(args) => args.threads,
            Command::Dump(args) => args.threads,
        };
        if threads == 0 {
            return Err("Threads must be greater than 0".to_string());
        }

        if let Command::Dump(DumpArgs { tag: Some(tag), .. }) = &self.command {
            if tag.trim().is_empty() || tag.contains(['/', ':', '@']) {
                return Err(format!("Invalid tag: {:?}", tag));
            }
        }

        Ok(())
    }

    pub fn config_path(&self) -> &str {
        match &self.command {
            Command::Sync(args) => &args.config,
            Command::Dump(args) => &args.config,
        }
    }
}
