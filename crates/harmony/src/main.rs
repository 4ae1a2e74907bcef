mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI args
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries reports
    harmony_runtime::init_logging(cli.log_json);

    // Handle init command early (doesn't need config)
    if let Commands::Init { path } = &cli.command {
        commands::init::run_init(path)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = config::load_config(cli.config.as_deref())?;
    let workspace = config.workspace(cli.workspace.as_deref());
    let execution_mode = cli.execution_mode.clone();

    let ok = match cli.command {
        Commands::Init { .. } => unreachable!("handled above"),
        Commands::Chat => {
            commands::chat::execute(execution_mode, &config, &workspace).await?;
            true
        }
        Commands::Exec {
            kind,
            timeout,
            model_view,
            code,
        } => {
            commands::exec::execute(
                kind,
                code,
                timeout,
                model_view,
                execution_mode,
                &config,
                &workspace,
            )
            .await?
        }
        Commands::Patch { file, model_view } => {
            commands::patch::execute(file, model_view, execution_mode, &config, &workspace).await?
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
