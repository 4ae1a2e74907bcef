use clap::{Parser, Subcommand, ValueEnum};
use harmony_adapters::ExecKind;
use std::path::PathBuf;

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum ExecutionMode {
    /// Use config.exec.dry_run setting (default)
    Auto,
    /// Force dry-run: no child process is spawned
    DryRun,
    /// Force real execution regardless of config
    Execute,
}

impl ExecutionMode {
    pub fn dry_run(&self, configured: bool) -> bool {
        match self {
            ExecutionMode::Auto => configured,
            ExecutionMode::DryRun => true,
            ExecutionMode::Execute => false,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum KindArg {
    Python,
    Shell,
}

impl From<KindArg> for ExecKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Python => ExecKind::Python,
            KindArg::Shell => ExecKind::Shell,
        }
    }
}

#[derive(Parser)]
#[command(name = "harmony")]
#[command(about = "Harmony - terminal agent harness", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Execution mode: auto (use config), dry-run (force safe), execute (force real)
    #[arg(long, default_value = "auto", value_enum, global = true)]
    pub execution_mode: ExecutionMode,

    /// Path to config file (default: ./harmony.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Working root for tools (overrides config.runtime.workspace)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new config file
    Init {
        /// Path for new config file
        #[arg(default_value = "harmony.toml")]
        path: PathBuf,
    },
    /// Interactive chat with the model
    Chat,
    /// Run one piece of code through the exec tool
    Exec {
        #[arg(long, value_enum, default_value = "shell")]
        kind: KindArg,
        /// Wall-clock limit in seconds (default from config)
        #[arg(long)]
        timeout: Option<u64>,
        /// Print the model view instead of the display view
        #[arg(long)]
        model_view: bool,
        /// Python source or shell command line
        code: String,
    },
    /// Apply a patch document from a file, or stdin with `-`
    Patch {
        file: PathBuf,
        /// Print the model view instead of the display view
        #[arg(long)]
        model_view: bool,
    },
}
