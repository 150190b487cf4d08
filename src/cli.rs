//! Command line interface: server and client modes

use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

use crate::config::{ClientConfig, ServerConfig, DEFAULT_ADDR, DEFAULT_OUTBOX_CAPACITY};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the chat server
    Server(ServerArgs),
    /// Connect to a chat server from this terminal
    Client(ClientArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    /// Address to listen on. Use port 0 for an ephemeral port.
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub listen: SocketAddr,

    /// Tell remaining users when someone leaves
    #[arg(long)]
    pub announce_departures: bool,

    /// Lines buffered per connection before broadcasts wait on it
    #[arg(long, default_value_t = DEFAULT_OUTBOX_CAPACITY)]
    pub outbox_capacity: usize,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        ServerConfig {
            addr: args.listen,
            announce_departures: args.announce_departures,
            outbox_capacity: args.outbox_capacity,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Address of the server to connect to
    #[arg(long, default_value = DEFAULT_ADDR)]
    pub server: SocketAddr,

    /// Username to join with; prompted for when omitted
    #[arg(long)]
    pub username: Option<String>,
}

impl ClientArgs {
    pub fn into_config(self, username: String) -> ClientConfig {
        ClientConfig::new(self.server, username)
    }
}
