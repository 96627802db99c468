//! End-to-end tests against a real TCP backbone.
//!
//! Each test binds its own server on an ephemeral port and talks to it
//! with raw NUL-framed sockets, the way a real client would.

use std::net::SocketAddr;
use std::time::Duration;

use gamespine::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\0").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    /// Next frame, or `None` once the server closed the connection.
    async fn recv(&mut self) -> Option<String> {
        let mut buf = Vec::new();
        let n = tokio::time::timeout(
            RECV_TIMEOUT,
            self.reader.read_until(0, &mut buf),
        )
        .await
        .expect("timed out waiting for a frame")
        .unwrap();
        if n == 0 {
            return None;
        }
        assert_eq!(buf.pop(), Some(0));
        Some(String::from_utf8(buf).unwrap())
    }

    async fn expect(&mut self, line: &str) {
        assert_eq!(self.recv().await.as_deref(), Some(line));
    }

    async fn login(&mut self, name: &str) {
        self.send("INIT").await;
        self.expect("SYSTEM_LOGIN_ASKED").await;
        self.send(&format!("{name}:{name}")).await;
        self.expect("SYSTEM_LOGIN_ACCEPTED").await;
    }
}

async fn start_server() -> SocketAddr {
    let server = BackboneServer::builder()
        .bind("127.0.0.1:0")
        .build(MirrorValidator)
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

/// A logged-in provider hosting two-seat chess games.
async fn chess_provider(addr: SocketAddr) -> TestClient {
    let mut provider = TestClient::connect(addr).await;
    provider.login("host").await;
    provider.send("SYSTEM_REGISTER PROVIDER chess 2 2 0").await;
    provider
}

#[tokio::test]
async fn test_login_handshake() {
    let addr = start_server().await;

    let mut client = TestClient::connect(addr).await;
    client.login("alice").await;
}

#[tokio::test]
async fn test_login_refused_closes_connection() {
    let addr = start_server().await;

    let mut client = TestClient::connect(addr).await;
    client.send("INIT").await;
    client.expect("SYSTEM_LOGIN_ASKED").await;
    client.send("alice:wrong").await;

    client.expect("SYSTEM_LOGIN_REFUSED").await;
    assert_eq!(client.recv().await, None);
}

#[tokio::test]
async fn test_close_token_ends_connection() {
    let addr = start_server().await;

    let mut client = TestClient::connect(addr).await;
    client.login("alice").await;
    client.send("SYSTEM_CLOSE_CONNECTION").await;

    assert_eq!(client.recv().await, None);
}

#[tokio::test]
async fn test_request_game_without_provider_refused() {
    let addr = start_server().await;

    let mut consumer = TestClient::connect(addr).await;
    consumer.login("alice").await;
    consumer.send("SYSTEM_REQUEST_GAME chess").await;

    consumer
        .expect("GAME_MESSAGE chess GAME_REFUSED No server found")
        .await;
}

#[tokio::test]
async fn test_request_game_creates_a_game() {
    let addr = start_server().await;
    let mut provider = chess_provider(addr).await;

    let mut consumer = TestClient::connect(addr).await;
    consumer.login("alice").await;
    consumer.send("SYSTEM_REQUEST_GAME chess").await;

    consumer
        .expect("GAME_MESSAGE chess_0 GAME_ACCEPTED chess")
        .await;
    provider
        .expect("GAME_MESSAGE chess_0 GAME_CREATED chess")
        .await;
    provider
        .expect("GAME_MESSAGE chess_0 PLAYER_JOIN alice")
        .await;
}

#[tokio::test]
async fn test_game_traffic_is_relayed_verbatim() {
    let addr = start_server().await;
    let mut provider = chess_provider(addr).await;

    let mut consumer = TestClient::connect(addr).await;
    consumer.login("alice").await;
    consumer.send("SYSTEM_REQUEST_GAME chess").await;
    consumer
        .expect("GAME_MESSAGE chess_0 GAME_ACCEPTED chess")
        .await;
    provider
        .expect("GAME_MESSAGE chess_0 GAME_CREATED chess")
        .await;
    provider
        .expect("GAME_MESSAGE chess_0 PLAYER_JOIN alice")
        .await;

    consumer.send("GAME_MESSAGE chess_0 move e2e4").await;
    provider.expect("GAME_MESSAGE chess_0 move e2e4").await;

    provider.send("GAME_MESSAGE chess_0 move e7e5").await;
    consumer.expect("GAME_MESSAGE chess_0 move e7e5").await;
}

#[tokio::test]
async fn test_game_list_reports_joinable_games() {
    let addr = start_server().await;
    let _provider = chess_provider(addr).await;

    let mut alice = TestClient::connect(addr).await;
    alice.login("alice").await;
    alice.send("SYSTEM_REQUEST_GAME chess").await;
    alice
        .expect("GAME_MESSAGE chess_0 GAME_ACCEPTED chess")
        .await;

    let mut bob = TestClient::connect(addr).await;
    bob.login("bob").await;
    bob.send("SYSTEM_REQUEST_GAME_LIST chess").await;

    bob.expect("SYSTEM_REQUEST_GAME_LIST_RESULT chess_0").await;
}

#[tokio::test]
async fn test_join_full_game_refused() {
    let addr = start_server().await;
    let _provider = chess_provider(addr).await;

    let mut alice = TestClient::connect(addr).await;
    alice.login("alice").await;
    alice.send("SYSTEM_REQUEST_GAME chess").await;
    alice
        .expect("GAME_MESSAGE chess_0 GAME_ACCEPTED chess")
        .await;

    let mut bob = TestClient::connect(addr).await;
    bob.login("bob").await;
    bob.send("SYSTEM_JOIN_GAME chess_0").await;
    bob.expect("GAME_MESSAGE chess_0 GAME_ACCEPTED chess").await;

    let mut carol = TestClient::connect(addr).await;
    carol.login("carol").await;
    carol.send("SYSTEM_JOIN_GAME chess_0").await;
    carol
        .expect("GAME_MESSAGE chess_0 GAME_JOIN_REFUSED The game is full")
        .await;
}

#[tokio::test]
async fn test_provider_disconnect_broadcasts_close() {
    let addr = start_server().await;
    let mut provider = chess_provider(addr).await;

    let mut consumer = TestClient::connect(addr).await;
    consumer.login("alice").await;
    consumer.send("SYSTEM_REQUEST_GAME chess").await;
    consumer
        .expect("GAME_MESSAGE chess_0 GAME_ACCEPTED chess")
        .await;
    provider
        .expect("GAME_MESSAGE chess_0 GAME_CREATED chess")
        .await;

    drop(provider);

    consumer
        .expect(
            "GAME_MESSAGE CLOSE chess_0 \
             Client close its connection and end the game",
        )
        .await;
}
