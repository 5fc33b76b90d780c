//! Telnet sessions - accept loop, name prompt and lobby hand-off

use bytes::Bytes;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::game::sprites::SpriteSet;
use crate::matchmaking::{validate_name, JoinError, JoinReceipt, LobbyService, PendingPlayer};
use crate::util::rate_limit::{create_limiter, CONNECT_RATE_LIMIT};

use super::connection::{Connection, ConnectionClosed};
use super::telnet::printable_text;

/// Longest line accepted at the name prompt, negotiation bytes included
const NAME_LINE_LIMIT: u64 = 256;

const BUSY_MESSAGE: &[u8] = b"Server is busy, please try again in a moment\r\n";

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Client left before entering a name")]
    NoName,

    #[error(transparent)]
    Closed(#[from] ConnectionClosed),

    #[error("Join rejected: {0}")]
    Rejected(#[from] JoinError),
}

/// Accept telnet clients until the listener fails
pub async fn accept_loop(
    listener: TcpListener,
    lobby: LobbyService,
    sprites: Arc<SpriteSet>,
) -> io::Result<()> {
    let limiter = create_limiter(CONNECT_RATE_LIMIT);

    loop {
        let (mut stream, peer) = listener.accept().await?;

        if limiter.check().is_err() {
            warn!(peer = %peer, "Connection refused by rate limit");
            tokio::spawn(async move {
                let _ = stream.write_all(BUSY_MESSAGE).await;
                let _ = stream.shutdown().await;
            });
            continue;
        }

        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let (lobby, sprites) = (lobby.clone(), Arc::clone(&sprites));
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, lobby, sprites).await {
                debug!(peer = %peer, error = %e, "Session ended before play");
            }
        });
    }
}

/// Greet a client, read its name and seat it in the lobby.
///
/// On success the connection belongs to the round the player joined.
pub async fn handle_connection<S>(
    stream: S,
    peer: SocketAddr,
    lobby: LobbyService,
    sprites: Arc<SpriteSet>,
) -> Result<JoinReceipt, SessionError>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    info!(peer = %peer, "New telnet connection");

    let (reader, writer) = tokio::io::split(stream);
    let connection = Connection::spawn(writer, peer.to_string());
    let mut reader = BufReader::new(reader);

    connection.send_notice(Bytes::from(format!("{}Enter your name: ", sprites.splash())))?;

    let name = match read_name(&mut reader).await? {
        Some(line) => line,
        None => {
            connection.close_with(Bytes::new()).await;
            return Err(SessionError::NoName);
        }
    };

    let name = match validate_name(&name) {
        Ok(name) => name,
        Err(e) => {
            connection.close_with(Bytes::from(format!("{e}\r\n"))).await;
            return Err(e.into());
        }
    };

    let pending = PendingPlayer {
        name: name.clone(),
        connection: connection.clone(),
        input: Box::new(reader),
    };

    match lobby.join(pending).await {
        Ok(receipt) => {
            info!(
                peer = %peer,
                player = %name,
                round_id = %receipt.round_id,
                seat = receipt.seat,
                "Player seated"
            );
            let welcome = format!("Welcome {name}! Waiting for the round to start...\r\n");
            // The round may already be drawing frames over this notice.
            let _ = connection.send_notice(Bytes::from(welcome));
            Ok(receipt)
        }
        Err(e) => {
            connection.close_with(Bytes::from(format!("{e}\r\n"))).await;
            Err(e.into())
        }
    }
}

/// One line of printable text; `None` when the client hung up first
async fn read_name<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let read = (&mut *reader)
        .take(NAME_LINE_LIMIT)
        .read_until(b'\n', &mut line)
        .await?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(printable_text(&line)))
}
