// Shared bootstrapping for integration tests.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crash_arena::game::sprites::SpriteSet;
use crash_arena::game::{RoundRegistry, RoundSettings};
use crash_arena::matchmaking::LobbyService;
use crash_arena::net::session::accept_loop;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<RoundRegistry>,
    pub lobby: LobbyService,
}

// Start a telnet listener on an ephemeral port with rounds that start right away.
pub async fn spawn_server() -> TestServer {
    let settings = RoundSettings {
        max_wait: Duration::ZERO,
        time_limit: Duration::from_secs(30),
        ..RoundSettings::default()
    };
    let registry = Arc::new(RoundRegistry::new());
    let sprites = Arc::new(SpriteSet::builtin());
    let (lobby, _task) = LobbyService::spawn(settings, Arc::clone(&registry), Arc::clone(&sprites));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("get local addr");
    tokio::spawn(accept_loop(listener, lobby.clone(), sprites));

    TestServer {
        addr,
        registry,
        lobby,
    }
}

// Read from `stream` until `needle` shows up, returning everything seen so far.
pub async fn read_until(stream: &mut TcpStream, needle: &str, within: Duration) -> String {
    let mut seen = Vec::new();
    let mut buf = vec![0u8; 16 * 1024];
    tokio::time::timeout(within, async {
        loop {
            let n = stream.read(&mut buf).await.expect("read");
            assert!(n > 0, "server closed before {needle:?}");
            seen.extend_from_slice(&buf[..n]);
            if String::from_utf8_lossy(&seen).contains(needle) {
                break;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {needle:?} within {within:?}"));
    String::from_utf8_lossy(&seen).into_owned()
}
