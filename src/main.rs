//! Askdesk - terminal client for a document Q&A service
//!
//! Main entry point: initializes tracing, parses the CLI, loads
//! configuration, and dispatches to the command handlers.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use askdesk::cli::{Cli, Commands};
use askdesk::commands;
use askdesk::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    let config = Config::load(&cli.config, cli.server.as_deref())?;

    match cli.command {
        Commands::Login { email } => {
            commands::login::run_login(config, email).await?;
        }
        Commands::Logout => {
            commands::login::run_logout(&config)?;
        }
        Commands::Chat { session } => {
            tracing::info!("Starting interactive chat mode");
            commands::chat::run_chat(config, session).await?;
        }
        Commands::Sessions { command } => {
            commands::sessions::handle_sessions(config, command).await?;
        }
        Commands::Settings { command } => {
            commands::settings::handle_settings(command)?;
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects debug-level
/// output for askdesk itself and warnings stay on for everything else.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "askdesk=debug,warn"
    } else {
        "askdesk=info,warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
