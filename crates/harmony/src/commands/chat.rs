use crate::cli::ExecutionMode;
use crate::config::Config;
use anyhow::{Context, Result};
use harmony_runtime::{
    Agent, AgentConfig, LLMProvider, OpenAIClient, ToolCall, ToolReport, TurnOutcome,
};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Interactive REPL: one agent turn per input line.
pub async fn execute(execution_mode: ExecutionMode, config: &Config, workspace: &Path) -> Result<()> {
    let provider = build_provider(config)?;
    let executor = super::build_executor(config, workspace, &execution_mode)?;

    let agent_config = AgentConfig {
        max_iterations: config.runtime.max_iterations,
        temperature: config.llm.temperature,
        max_tokens: config.llm.max_tokens,
        model: config.llm.model.clone(),
        ..AgentConfig::default()
    };
    let mut agent = Agent::new(agent_config, provider, executor);
    info!(session_id = %agent.session.id, "Starting chat session");

    println!("Harmony - type 'exit' to quit, Ctrl-C interrupts a response");
    println!("Workspace: {}", workspace.display());
    println!("Session: {}", agent.session.id);
    println!("---");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut observer = |call: &ToolCall, report: &ToolReport| {
        println!("\n[{}]\n{}", call.name, report.display_text.trim_end());
    };

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        // Ctrl-C while the turn runs cancels the pending model request only.
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });
        let outcome = agent.process_message(input, &cancel, &mut observer).await;
        watcher.abort();

        match outcome {
            Ok(TurnOutcome::Completed(response)) => println!("\nAssistant: {}\n", response),
            Ok(TurnOutcome::Interrupted) => {
                println!("\n{}\n", harmony_runtime::agent::INTERRUPTED_NOTE)
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                eprintln!("\nError: {:#}\n", e);
            }
        }
    }

    info!(messages = agent.session.message_count(), "Chat session ended");
    Ok(())
}

/// Build the OpenAI-compatible client (API key from config or env)
pub fn build_provider(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let mut client = OpenAIClient::new(&config.llm.api_url)?.with_model(&config.llm.model);
    match config.llm.resolved_api_key() {
        Some(key) => client = client.with_api_key(&key),
        None => warn!("No API key configured (HARMONY_API_KEY / OPENAI_API_KEY); sending unauthenticated requests"),
    }
    Ok(Arc::new(client))
}
