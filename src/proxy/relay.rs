//! Bidirectional relay
//!
//! Two reader tasks, one per stream, push chunks into a bounded queue. A single
//! dispatcher drains the queue and writes each chunk to the opposite stream,
//! flushing after every write. The first read error, end of stream or write
//! error on either side ends the relay; both streams are closed before
//! [`relay`] returns.

use bytes::{Bytes, BytesMut};
use log::debug;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::config::defaults;

/// Relay tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Maximum bytes per read
    pub chunk_size: usize,
    /// Chunks queued towards the dispatcher before readers block
    pub queue_depth: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::BUFFER_SIZE,
            queue_depth: defaults::QUEUE_DEPTH,
        }
    }
}

/// One end of a tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => write!(f, "client"),
            Side::Server => write!(f, "server"),
        }
    }
}

/// Why a relay stopped
#[derive(Debug)]
pub enum Termination {
    /// The side reached end of stream
    ReadClosed(Side),
    /// Reading from the side failed
    ReadFailed(Side, io::Error),
    /// Writing or flushing to the side failed
    WriteFailed(Side, io::Error),
    /// Both readers went away without reporting, e.g. a reader task panicked
    ReaderLost,
}

impl Termination {
    /// Side the terminating event happened on, if known
    pub fn side(&self) -> Option<Side> {
        match self {
            Termination::ReadClosed(side)
            | Termination::ReadFailed(side, _)
            | Termination::WriteFailed(side, _) => Some(*side),
            Termination::ReaderLost => None,
        }
    }

    /// Whether the relay stopped on an error rather than an orderly close
    pub fn is_failure(&self) -> bool {
        !matches!(self, Termination::ReadClosed(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::ReadClosed(side) => write!(f, "{} closed the connection", side),
            Termination::ReadFailed(side, e) => write!(f, "Error reading from {}: {}", side, e),
            Termination::WriteFailed(side, e) => write!(f, "Error writing to {}: {}", side, e),
            Termination::ReaderLost => write!(f, "relay readers exited unexpectedly"),
        }
    }
}

/// Outcome of a finished relay
#[derive(Debug)]
pub struct RelayReport {
    pub client_to_server: u64,
    pub server_to_client: u64,
    pub termination: Termination,
}

enum ReadEvent {
    Chunk(Side, Bytes),
    Closed(Side),
    Failed(Side, io::Error),
}

/// Relay bytes between `client` and `server` until either side stops
///
/// Chunks are forwarded in the order they were read on each side; nothing is
/// ordered across directions. On termination the queue is dropped, both
/// reader tasks are aborted and awaited, and both write halves are dropped,
/// so neither stream outlives this call.
pub async fn relay<C, S>(client: C, server: S, config: RelayConfig) -> RelayReport
where
    C: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (client_reader, mut client_writer) = tokio::io::split(client);
    let (server_reader, mut server_writer) = tokio::io::split(server);

    let (tx, mut rx) = mpsc::channel(config.queue_depth.max(1));
    let client_task = tokio::spawn(read_chunks(Side::Client, client_reader, tx.clone(), config.chunk_size));
    let server_task = tokio::spawn(read_chunks(Side::Server, server_reader, tx, config.chunk_size));

    let mut client_to_server = 0u64;
    let mut server_to_client = 0u64;

    let termination = loop {
        let Some(event) = rx.recv().await else {
            break Termination::ReaderLost;
        };

        match event {
            ReadEvent::Chunk(Side::Client, chunk) => {
                if let Err(e) = write_chunk(&mut server_writer, &chunk).await {
                    break Termination::WriteFailed(Side::Server, e);
                }
                client_to_server += chunk.len() as u64;
                debug!("client->server: {} bytes", chunk.len());
            }
            ReadEvent::Chunk(Side::Server, chunk) => {
                if let Err(e) = write_chunk(&mut client_writer, &chunk).await {
                    break Termination::WriteFailed(Side::Client, e);
                }
                server_to_client += chunk.len() as u64;
                debug!("server->client: {} bytes", chunk.len());
            }
            ReadEvent::Closed(side) => break Termination::ReadClosed(side),
            ReadEvent::Failed(side, e) => break Termination::ReadFailed(side, e),
        }
    };

    // A reader may be parked on a read or on a full queue; stop both before closing
    drop(rx);
    client_task.abort();
    server_task.abort();
    let _ = client_task.await;
    let _ = server_task.await;

    drop(client_writer);
    drop(server_writer);

    RelayReport {
        client_to_server,
        server_to_client,
        termination,
    }
}

async fn read_chunks<R>(side: Side, mut reader: R, tx: mpsc::Sender<ReadEvent>, chunk_size: usize)
where
    R: AsyncRead + Unpin,
{
    loop {
        let mut buf = BytesMut::with_capacity(chunk_size);
        let event = match reader.read_buf(&mut buf).await {
            Ok(0) => ReadEvent::Closed(side),
            Ok(_) => ReadEvent::Chunk(side, buf.freeze()),
            Err(e) => ReadEvent::Failed(side, e),
        };

        let last = !matches!(event, ReadEvent::Chunk(..));
        if tx.send(event).await.is_err() || last {
            return;
        }
    }
}

async fn write_chunk<W>(writer: &mut W, chunk: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(chunk).await?;
    writer.flush().await
}
