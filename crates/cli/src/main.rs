//! Waypoint CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP gateway
//! - `chat`    Interactive or single-message chat against the orchestrator
//! - `status`  Show configuration status
//! - `agents`  List the agent roster

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "waypoint",
    about = "Waypoint: multi-agent airline customer service",
    version
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
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the agents
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Use the scripted offline model instead of the configured provider
        #[arg(long)]
        offline: bool,
    },

    /// Show configuration status
    Status {
        /// Print the default configuration as TOML
        #[arg(long)]
        print_config: bool,
    },

    /// List the agent roster
    Agents,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat { message, offline } => commands::chat::run(message, offline).await?,
        Commands::Status { print_config } => commands::status::run(print_config)?,
        Commands::Agents => commands::agents::run()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chat_flags() {
        let cli = Cli::try_parse_from(["waypoint", "chat", "--offline", "-m", "hi"]).unwrap();
        match cli.command {
            Commands::Chat { message, offline } => {
                assert_eq!(message.as_deref(), Some("hi"));
                assert!(offline);
            }
            _ => panic!("expected chat"),
        }
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::try_parse_from(["waypoint", "serve", "--port", "9000", "-v", "--log-json"])
            .unwrap();
        assert!(cli.verbose);
        assert!(cli.log_json);
        assert!(matches!(cli.command, Commands::Serve { port: Some(9000) }));
    }

    #[test]
    fn status_print_config_flag() {
        let cli = Cli::try_parse_from(["waypoint", "status", "--print-config"]).unwrap();
        assert!(matches!(cli.command, Commands::Status { print_config: true }));
    }
}
