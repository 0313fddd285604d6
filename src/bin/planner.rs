//! crew-planner binary.
//!
//! Loads a crew definition from YAML, resolves provider credentials from the
//! environment and runs the crew. The final output goes to stderr, the full
//! outcome (result or classified failure) to stdout as JSON.
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY`, `OPENAI_API_BASE`, `GROQ_API_KEY`, `ANTHROPIC_API_KEY`,
//!   `LMSTUDIO_API_BASE` — provider credentials, read when an agent uses them
//! - `RUST_LOG` — tracing filter (default: "info,crew_planner=debug")
//!
//! # Usage
//!
//! ```bash
//! crew-planner crew.yaml [key=value ...]
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crew_planner::crews::{RunOutcome, RunRequest};
use crew_planner::llms::{EnvConfig, ProviderRegistry};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crew_planner=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: crew-planner <crew.yaml> [key=value ...]");
        return ExitCode::from(2);
    };

    let mut request = match RunRequest::from_yaml_file(&path) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(2);
        }
    };
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => request = request.with_input(key, value),
            None => tracing::warn!("Ignoring argument '{}': expected key=value", arg),
        }
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::warn!("Interrupted, cancelling the run");
        on_interrupt.cancel();
    }) {
        tracing::warn!("Could not install the Ctrl-C handler: {}", e);
    }

    let registry = ProviderRegistry::with_defaults(Arc::new(EnvConfig));
    tracing::info!("Running crew from {}", path);
    let outcome = crew_planner::run(request, &registry, cancel).await;

    match &outcome {
        RunOutcome::Completed(output) => eprintln!("\n{}\n", output.final_output()),
        RunOutcome::Failed(failure) => tracing::error!("Run failed: {}", failure),
    }
    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("Could not serialize the outcome: {}", e),
    }

    if outcome.is_completed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
