//! Command-line front end for classflow.

mod commands;
mod config;
mod error;

use clap::{Parser, Subcommand};
use classflow_core::FlowId;
use classflow_graph::ProposedEdge;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::CliConfig;
use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(name = "classflow", version, about = "Build and run classroom automation flows")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check a saved graph document for problems.
    Check {
        /// Graph JSON file (`{"nodes": [...], "edges": [...]}`).
        file: PathBuf,
    },
    /// List the built-in templates.
    Templates,
    /// Replace a flow's graph with a template.
    ApplyTemplate {
        flow: FlowId,
        template: String,
        /// Replace the flow even if it already has nodes.
        #[arg(long)]
        yes: bool,
    },
    /// Connect two nodes of a flow.
    Connect {
        flow: FlowId,
        source: String,
        target: String,
        #[arg(long, default_value = "output")]
        source_handle: String,
        #[arg(long, default_value = "input")]
        target_handle: String,
    },
    /// Run a flow.
    Run {
        flow: FlowId,
        /// Follow execution events until the run ends.
        #[arg(long)]
        watch: bool,
    },
    /// Show past executions of a flow.
    History { flow: FlowId },
    /// Sign in with email and password.
    Login {
        email: String,
        #[arg(long, env = "CLASSFLOW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored sign-in.
    Logout,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(error = %error, "command failed");
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> classflow_core::Result<(), CliError> {
    let config = CliConfig::from_env().map_err(|e| CliError::Config {
        details: e.to_string(),
    })?;

    match command {
        Command::Check { file } => commands::check(&file),
        Command::Templates => {
            commands::templates();
            Ok(())
        }
        Command::ApplyTemplate {
            flow,
            template,
            yes,
        } => commands::apply_template(&config, &flow, &template, yes).await,
        Command::Connect {
            flow,
            source,
            target,
            source_handle,
            target_handle,
        } => {
            let proposed = ProposedEdge::new(source, target).with_handles(source_handle, target_handle);
            commands::connect(&config, &flow, proposed).await
        }
        Command::Run { flow, watch } => commands::run(&config, &flow, watch).await,
        Command::History { flow } => commands::history(&config, &flow).await,
        Command::Login { email, password } => commands::login(&config, &email, &password).await,
        Command::Logout => commands::logout(&config),
    }
}

/// Logs go to stderr so command output stays clean.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,classflow=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
