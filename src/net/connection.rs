//! Outbound side of a terminal connection

use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tracing::debug;

use crate::game::constants::term;

/// Keystroke stream of a human player
pub type InputStream = Box<dyn AsyncRead + Send + Unpin>;

/// Queue depth per connection; frames beyond it are dropped for slow clients
const OUTBOUND_CAPACITY: usize = 8;
/// Upper bound on flushing the goodbye message
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
enum Outbound {
    /// Bytes as they are, e.g. telnet negotiation
    Raw(Bytes),
    /// Drawn from the home position
    Frame(Bytes),
    /// Drawn on a cleared screen
    Notice(Bytes),
    Close,
}

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("Connection closed")]
pub struct ConnectionClosed;

/// Cheap handle to a connection's writer task
#[derive(Debug, Clone)]
pub struct Connection {
    peer: Arc<str>,
    outbound: mpsc::Sender<Outbound>,
    lost: Arc<AtomicBool>,
}

impl Connection {
    /// Spawn the writer task owning `writer`
    pub fn spawn<W>(writer: W, peer: impl Into<Arc<str>>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (outbound, rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let connection = Self {
            peer: peer.into(),
            outbound,
            lost: Arc::new(AtomicBool::new(false)),
        };
        tokio::spawn(write_loop(
            BufWriter::new(writer),
            rx,
            Arc::clone(&connection.lost),
            Arc::clone(&connection.peer),
        ));
        connection
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// True once the writer has failed or the connection was closed
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Flag the peer as gone, e.g. after its input hit end of stream
    pub fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    fn push(&self, message: Outbound) -> Result<(), ConnectionClosed> {
        if self.is_lost() {
            return Err(ConnectionClosed);
        }
        match self.outbound.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                debug!(peer = %self.peer, message = ?discriminant(&dropped), "Outbound queue full");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.lost.store(true, Ordering::Release);
                Err(ConnectionClosed)
            }
        }
    }

    pub fn send_raw(&self, bytes: Bytes) -> Result<(), ConnectionClosed> {
        self.push(Outbound::Raw(bytes))
    }

    pub fn send_frame(&self, frame: Bytes) -> Result<(), ConnectionClosed> {
        self.push(Outbound::Frame(frame))
    }

    pub fn send_notice(&self, text: Bytes) -> Result<(), ConnectionClosed> {
        self.push(Outbound::Notice(text))
    }

    /// Show `text` on a cleared screen and hang up
    pub async fn close_with(&self, text: Bytes) {
        let goodbye = async {
            self.outbound.send(Outbound::Notice(text)).await?;
            self.outbound.send(Outbound::Close).await
        };
        if !matches!(tokio::time::timeout(CLOSE_TIMEOUT, goodbye).await, Ok(Ok(()))) {
            debug!(peer = %self.peer, "Connection gone before goodbye");
        }
    }
}

fn discriminant(message: &Outbound) -> &'static str {
    match message {
        Outbound::Raw(_) => "raw",
        Outbound::Frame(_) => "frame",
        Outbound::Notice(_) => "notice",
        Outbound::Close => "close",
    }
}

async fn write_loop<W>(
    mut writer: BufWriter<W>,
    mut rx: mpsc::Receiver<Outbound>,
    lost: Arc<AtomicBool>,
    peer: Arc<str>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let result = match message {
            Outbound::Raw(bytes) => writer.write_all(&bytes).await,
            Outbound::Frame(bytes) => write_parts(&mut writer, &[term::HOME, &bytes]).await,
            Outbound::Notice(bytes) => {
                write_parts(&mut writer, &[term::CLEAR, term::HOME, &bytes]).await
            }
            Outbound::Close => break,
        };
        if let Err(err) = result {
            debug!(peer = %peer, error = %err, "Write failed");
            lost.store(true, Ordering::Release);
            return;
        }
    }

    lost.store(true, Ordering::Release);
    let _ = writer.shutdown().await;
    debug!(peer = %peer, "Connection closed");
}

async fn write_parts<W>(writer: &mut BufWriter<W>, parts: &[&[u8]]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for part in parts {
        writer.write_all(part).await?;
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn frames_start_at_home_and_notices_clear() {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let connection = Connection::spawn(server, "peer");
        connection.send_frame(Bytes::from_static(b"grid")).expect("open");
        connection.close_with(Bytes::from_static(b"bye")).await;

        let mut received = Vec::new();
        let mut client = client;
        client.read_to_end(&mut received).await.expect("read");
        assert_eq!(received, b"\x1b[Hgrid\x1b[2J\x1b[Hbye".to_vec());
        assert!(connection.is_lost());
    }

    #[tokio::test]
    async fn dropped_reader_marks_connection_lost() {
        let (client, server) = tokio::io::duplex(16);
        drop(client);
        let connection = Connection::spawn(server, "peer");
        let _ = connection.send_frame(Bytes::from_static(b"hello"));
        for _ in 0..50 {
            if connection.is_lost() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(connection.is_lost());
        assert!(connection.send_frame(Bytes::from_static(b"again")).is_err());
    }
}
