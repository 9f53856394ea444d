//! AI Debate - two local LLMs argue a topic in the terminal
//!
//! Streams alternating turns from two Ollama models, each one prompted
//! with the topic and the full transcript so far.

mod config;
mod llm;
mod prompt;
mod runtime;
mod state_machine;
mod tui;

use clap::Parser;
use config::Cli;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // The terminal belongs to the TUI, so logs go to a file
    let log_path = cli.log_path();
    init_logging(&log_path)?;

    let client = cli.client();
    tracing::info!(
        base_url = %client.base_url(),
        model1 = %cli.model1,
        model2 = %cli.model2,
        log = %log_path.display(),
        "Starting ai-debate"
    );

    if let Err(e) = config::validate_models(&client, client.base_url(), &cli.models()).await {
        tracing::error!(error = %e, "Startup validation failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let (handle, task) = runtime::spawn(client, cli.debate_context());
    let mut app = tui::TuiApp::new(handle);
    let result = app.run().await;

    // Dropping the last handle ends the runtime
    drop(app);
    let session = task.await?;
    tracing::info!(
        phase = session.phase.as_str(),
        turns = session.transcript.closed().len(),
        "Debate finished"
    );

    result?;
    Ok(())
}

fn init_logging(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ai_debate=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();
    Ok(())
}
