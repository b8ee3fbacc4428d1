// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Byte channels a session runs over.
//!
//! In production each channel is a named FIFO. Both ends are opened
//! non-blocking, so a session that is cancelled while its client has not
//! shown up leaves nothing behind on the blocking pool.
//!
//! The request end opens at once, which releases the client's blocking
//! open of its writer. The response end is retried until the client opens
//! its reader; the client does that only after its writer is open, so once
//! both ends are open an end-of-file on the request end means the client
//! really left.

use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::unix::pipe;

use crate::registry::PendingConnection;

/// Pause between attempts to open a response channel nobody reads yet.
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(10);

pub type ChannelReader = Box<dyn AsyncRead + Send + Unpin>;
pub type ChannelWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens the request (read) and response (write) ends for a session.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    async fn open(&self, pending: &PendingConnection) -> io::Result<(ChannelReader, ChannelWriter)>;
}

/// Named-pipe transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct FifoTransport;

#[async_trait]
impl SessionTransport for FifoTransport {
    async fn open(&self, pending: &PendingConnection) -> io::Result<(ChannelReader, ChannelWriter)> {
        let reader = pipe::OpenOptions::new().open_receiver(&pending.request_channel)?;
        let writer = open_sender(Path::new(&pending.response_channel)).await?;
        Ok((Box::new(reader), Box::new(writer)))
    }
}

/// Opens the write end of `path` once a reader exists. Dropping the future
/// abandons the wait.
async fn open_sender(path: &Path) -> io::Result<pipe::Sender> {
    loop {
        match pipe::OpenOptions::new().open_sender(path) {
            Ok(sender) => return Ok(sender),
            Err(e) if e.raw_os_error() == Some(Errno::ENXIO as i32) => {
                tokio::time::sleep(OPEN_RETRY_INTERVAL).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Creates a FIFO at `path`, reusing one that already exists.
pub fn ensure_fifo(path: &Path) -> io::Result<()> {
    match mkfifo(path, Mode::from_bits_truncate(0o660)) {
        Ok(()) | Err(Errno::EEXIST) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// Opens the well-known server channel.
///
/// The channel is opened for writing as well so that at least one writer
/// always exists and reads never see end-of-file between clients.
pub async fn open_server_channel(path: &Path) -> io::Result<pipe::Receiver> {
    let file = OpenOptions::new().read(true).write(true).open(path).await?;
    pipe::Receiver::from_file(file.into_std().await)
}

pub fn remove_fifo(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
