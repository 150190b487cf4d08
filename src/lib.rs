//! Line-oriented TCP group chat
//!
//! A central server accepts TCP connections, takes the first line of each
//! as the username, and rebroadcasts every later line to all connected
//! clients (the sender included).
//!
//! # Architecture
//! - `ChatServer` accepts sockets and spawns one `Session` task per connection
//! - `Registry` is an actor: membership changes and broadcasts are commands
//!   on one channel, so they never interleave
//! - Each session's write half is owned by its own write task, fed by a
//!   bounded outbox the registry pushes into
//! - `ClientDriver` runs a listen loop and a send loop over one connection
//!
//! # Example
//! ```ignore
//! use line_chat::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind(ServerConfig::default()).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod member;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use client::{ClientDriver, ClientEvent};
pub use config::{ClientConfig, ServerConfig};
pub use connection::{Connection, LineReader, LineWriter};
pub use error::{ChatError, SendError};
pub use member::Member;
pub use registry::{Registry, RegistryActor, RegistryCommand};
pub use server::ChatServer;
pub use session::{Session, SessionState};
pub use types::{SessionId, Username};
