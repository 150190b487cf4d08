use std::net::SocketAddr;
use std::time::Duration;

use line_chat::{ChatServer, Connection, Registry, ServerConfig};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const STEP: Duration = Duration::from_secs(2);

struct TestServer {
    addr: SocketAddr,
    registry: Registry,
    shutdown: Option<oneshot::Sender<()>>,
    acceptor: JoinHandle<()>,
}

impl TestServer {
    async fn start(config: ServerConfig) -> Self {
        let server = ChatServer::bind(config).await.expect("bind");
        let addr = server.local_addr().expect("local addr");
        let registry = server.registry();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let acceptor = tokio::spawn(async move {
            let _ = server
                .run_until(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            registry,
            shutdown: Some(shutdown_tx),
            acceptor,
        }
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.acceptor.await;
    }

    /// Poll the registry until it reaches `expected` members
    async fn wait_for_len(&self, expected: usize) {
        timeout(STEP, async {
            loop {
                if self.registry.len().await.expect("registry") == expected {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry never reached {} members", expected));
    }
}

fn local_config() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap())
}

async fn join(server: &TestServer, username: &str) -> Connection {
    let mut conn = Connection::connect(server.addr).await.expect("connect");
    conn.write_line(username).await.expect("handshake");
    conn
}

async fn next_line(conn: &mut Connection) -> Option<String> {
    timeout(STEP, conn.read_line())
        .await
        .expect("timed out waiting for a line")
        .expect("read failed")
}

#[tokio::test]
async fn alice_and_bob_chat() {
    let server = TestServer::start(local_config()).await;

    let mut alice = join(&server, "alice").await;
    server.wait_for_len(1).await;

    let mut bob = join(&server, "bob").await;
    assert_eq!(
        next_line(&mut alice).await.as_deref(),
        Some("bob has joined the chat")
    );
    server.wait_for_len(2).await;

    alice.write_line("alice: hello").await.unwrap();
    assert_eq!(next_line(&mut alice).await.as_deref(), Some("alice: hello"));
    assert_eq!(next_line(&mut bob).await.as_deref(), Some("alice: hello"));

    bob.close().await.unwrap();
    drop(bob);
    server.wait_for_len(1).await;

    let delivered = server.registry.broadcast("after bob").await.unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(next_line(&mut alice).await.as_deref(), Some("after bob"));

    server.stop().await;
}

#[tokio::test]
async fn joiner_does_not_see_own_join_notice() {
    let server = TestServer::start(local_config()).await;

    let mut carol = join(&server, "carol").await;
    server.wait_for_len(1).await;

    carol.write_line("carol: first").await.unwrap();
    assert_eq!(next_line(&mut carol).await.as_deref(), Some("carol: first"));

    server.stop().await;
}

#[tokio::test]
async fn blank_username_is_rejected_once() {
    let server = TestServer::start(local_config()).await;

    let mut watcher = join(&server, "watcher").await;
    server.wait_for_len(1).await;

    let mut anon = join(&server, "  ").await;
    assert_eq!(
        next_line(&mut anon).await.as_deref(),
        Some(line_chat::message::EMPTY_USERNAME_REJECTION)
    );
    assert!(next_line(&mut anon).await.is_none());

    assert_eq!(server.registry.len().await.unwrap(), 1);

    // Nothing was announced for the rejected connection
    watcher.write_line("watcher: ping").await.unwrap();
    assert_eq!(next_line(&mut watcher).await.as_deref(), Some("watcher: ping"));

    server.stop().await;
}

#[tokio::test]
async fn registry_tracks_concurrent_joins_and_leaves() {
    let server = TestServer::start(local_config()).await;

    let mut clients = Vec::new();
    for i in 0..8 {
        clients.push(join(&server, &format!("user{}", i)).await);
    }
    server.wait_for_len(8).await;

    for mut conn in clients.drain(..3) {
        conn.close().await.unwrap();
    }
    server.wait_for_len(5).await;

    server.stop().await;
}

#[tokio::test]
async fn duplicate_usernames_coexist() {
    let server = TestServer::start(local_config()).await;

    let mut first = join(&server, "sam").await;
    server.wait_for_len(1).await;
    let mut second = join(&server, "sam").await;
    server.wait_for_len(2).await;

    assert_eq!(
        next_line(&mut first).await.as_deref(),
        Some("sam has joined the chat")
    );

    second.write_line("sam: hi").await.unwrap();
    assert_eq!(next_line(&mut first).await.as_deref(), Some("sam: hi"));
    assert_eq!(next_line(&mut second).await.as_deref(), Some("sam: hi"));

    server.stop().await;
}

#[tokio::test]
async fn departures_announced_when_enabled() {
    let config = ServerConfig {
        announce_departures: true,
        ..local_config()
    };
    let server = TestServer::start(config).await;

    let mut alice = join(&server, "alice").await;
    server.wait_for_len(1).await;
    let mut bob = join(&server, "bob").await;
    assert_eq!(
        next_line(&mut alice).await.as_deref(),
        Some("bob has joined the chat")
    );

    bob.close().await.unwrap();
    assert_eq!(
        next_line(&mut alice).await.as_deref(),
        Some("bob has left the chat")
    );

    server.stop().await;
}

#[tokio::test]
async fn sessions_survive_acceptor_shutdown() {
    let server = TestServer::start(local_config()).await;

    let mut alice = join(&server, "alice").await;
    server.wait_for_len(1).await;

    let registry = server.registry.clone();
    let addr = server.addr;
    server.stop().await;

    alice.write_line("alice: still here").await.unwrap();
    assert_eq!(
        next_line(&mut alice).await.as_deref(),
        Some("alice: still here")
    );
    assert_eq!(registry.len().await.unwrap(), 1);

    assert!(Connection::connect(addr).await.is_err());
}
