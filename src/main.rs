use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use deep_research_engine::{
    browser::BrowserBridgeClient,
    config::{Config, LogFormat},
    llm::HttpCompletionClient,
    research::render_report,
    server::{AppState, RpcServer},
};

#[derive(Parser)]
#[command(name = "deep-research-engine", version, about = "Autonomous deep-research engine")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve JSON-RPC requests over stdio (the default)
    Serve,
    /// Run a single research request and print the markdown report
    Run {
        /// The research question
        prompt: String,
        /// Caller identifier, used in logs only
        #[arg(long)]
        agent_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Deep research engine starting..."
    );

    // Initialize the completion client
    let llm = match HttpCompletionClient::new(&config.llm, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.llm.base_url, model = %config.llm.model, "Completion client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize completion client");
            return Err(e.into());
        }
    };

    // Initialize the browser bridge client
    let browser = match BrowserBridgeClient::new(&config.browser, &config.request) {
        Ok(c) => {
            info!(base_url = %config.browser.base_url, "Browser bridge client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize browser bridge client");
            return Err(e.into());
        }
    };

    let state = Arc::new(AppState::new(config, llm, browser));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = RpcServer::new(state);
            info!("Server ready, waiting for requests on stdin...");

            if let Err(e) = server.run().await {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
            info!("Server shutdown complete");
        }
        Command::Run { prompt, agent_id } => {
            let result = state.engine.research(&prompt, agent_id.as_deref()).await?;
            println!("{}", render_report(&result));
        }
    }

    Ok(())
}

/// Initialize tracing/logging to stderr so stdout stays protocol-clean
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
