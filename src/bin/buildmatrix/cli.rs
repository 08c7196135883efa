//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// Buildmatrix - build one artifact per toolchain/platform/flag combination
#[derive(Parser)]
#[command(name = "buildmatrix")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to Matrix.toml (defaults to searching upwards from the current directory)
    #[arg(long, global = true, env = "BUILDMATRIX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ignore ~/.buildmatrix/config.toml
    #[arg(long, global = true)]
    pub no_global_config: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub no_global_config: bool,
}

impl Cli {
    pub fn global(&self) -> GlobalArgs {
        GlobalArgs {
            verbose: self.verbose,
            config: self.config.clone(),
            no_global_config: self.no_global_config,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build every feasible combination of the matrix
    Build(BuildArgs),

    /// List the feasible combinations and their output paths
    List(ListArgs),

    /// Toolchain management
    Toolchain(ToolchainArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Do not compress artifacts even if the compressor is available
    #[arg(long)]
    pub no_compress: bool,

    /// Build every combination and report all failures at the end
    #[arg(long)]
    pub keep_going: bool,

    /// Output directory for artifacts
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Directory holding one executable per toolchain version
    #[arg(long)]
    pub toolchain_dir: Option<PathBuf>,

    /// Install missing toolchains before building
    #[arg(long)]
    pub install_missing: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print configurations as JSON
    #[arg(long)]
    pub json: bool,

    /// Directory holding one executable per toolchain version
    #[arg(long)]
    pub toolchain_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct ToolchainArgs {
    #[command(subcommand)]
    pub command: ToolchainCommands,
}

#[derive(Subcommand)]
pub enum ToolchainCommands {
    /// Show each configured toolchain and the version it reports
    Show,

    /// Install toolchains that are missing or report the wrong version
    Install,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
