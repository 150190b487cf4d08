//! Line chat - Entry Point
//!
//! Parses the command line and starts either the server (acceptor plus
//! registry) or the terminal client.

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use line_chat::cli::{Cli, Command};
use line_chat::config::ServerConfig;
use line_chat::{console, ChatServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=line_chat=trace
    // Logs go to stderr so chat output on stdout stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("line_chat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Server(args) => {
            let server = ChatServer::bind(ServerConfig::from(args)).await?;
            info!("Chat server started on {}", server.local_addr()?);

            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for ctrl-c: {}", e);
                }
            };
            server.run_until(shutdown).await?;
        }
        Command::Client(args) => {
            let username = match args.username.clone() {
                Some(username) => username,
                None => tokio::task::spawn_blocking(console::prompt_username).await??,
            };
            console::run_client(args.into_config(username)).await?;
        }
    }

    Ok(())
}
