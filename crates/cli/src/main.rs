//! Switchboard CLI: the main entry point.
//!
//! Commands:
//! - `serve`: start the WebSocket gateway
//! - `chat`: talk to the workflow from the terminal
//! - `nodes`: show the workflow graph
//! - `config`: show, initialize or locate the configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "switchboard",
    about = "Switchboard: a streaming, tool-calling conversation workflow",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket gateway
    Serve {
        /// Override the bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the workflow from the terminal
    Chat {
        /// Session user id
        #[arg(short, long, default_value = "cli")]
        user: String,
    },

    /// List the workflow nodes
    Nodes,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (API key redacted)
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { host, port } => commands::serve::run(host, port).await?,
        Commands::Chat { user } => commands::chat::run(&user).await?,
        Commands::Nodes => commands::nodes::run()?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Init { force } => commands::config_cmd::init(force)?,
            ConfigAction::Path => commands::config_cmd::path(),
        },
    }

    Ok(())
}
