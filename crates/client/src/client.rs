// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! One client session over named pipes.
//!
//! Setup creates the two private channels, announces them on the server
//! channel, then opens them in the order the worker does: request first,
//! response second. The session id arrives as the first reply.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use ems_kernel::report::{write_event_ids, write_grid};
use ems_kernel::types::{EventId, Seat, SessionId};
use ems_kernel::wire::{
    ConnectReply, ConnectRequest, ListReply, OpCode, Request, ShowReply, Status, STATUS_LEN,
};
use ems_kernel::GridSnapshot;
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;

use crate::error::{ClientError, ClientResult};

pub struct EmsClient {
    session: SessionId,
    requests: pipe::Sender,
    responses: pipe::Receiver,
    request_path: PathBuf,
    response_path: PathBuf,
}

impl EmsClient {
    /// Opens a session with the server listening on `server`. Blocks until
    /// a worker is free to take it.
    pub async fn connect(server: &Path, request_path: &Path, response_path: &Path) -> ClientResult<Self> {
        let connect = Request::Connect(ConnectRequest {
            request_channel: channel_name(request_path)?,
            response_channel: channel_name(response_path)?,
        })
        .encode()?;

        make_fifo(request_path)?;
        if let Err(e) = make_fifo(response_path) {
            unlink(request_path);
            return Err(e.into());
        }

        match Self::handshake(server, request_path, response_path, &connect).await {
            Ok((session, requests, responses)) => {
                tracing::info!("Connection established with session id {}", session);
                Ok(Self {
                    session,
                    requests,
                    responses,
                    request_path: request_path.to_path_buf(),
                    response_path: response_path.to_path_buf(),
                })
            }
            Err(e) => {
                unlink(request_path);
                unlink(response_path);
                Err(e)
            }
        }
    }

    async fn handshake(
        server: &Path,
        request_path: &Path,
        response_path: &Path,
        connect: &[u8],
    ) -> ClientResult<(SessionId, pipe::Sender, pipe::Receiver)> {
        {
            let mut server = OpenOptions::new().write(true).open(server).await?;
            server.write_all(connect).await?;
            server.flush().await?;
        }

        let requests = OpenOptions::new().write(true).open(request_path).await?;
        let responses = OpenOptions::new().read(true).open(response_path).await?;
        let requests = pipe::Sender::from_file(requests.into_std().await)?;
        let mut responses = pipe::Receiver::from_file(responses.into_std().await)?;

        let mut buf = [0u8; ConnectReply::LEN];
        responses.read_exact(&mut buf).await?;
        let session = ConnectReply::decode(&buf)?.session;
        Ok((session, requests, responses))
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Ends the session and removes the private channels.
    pub async fn quit(mut self) -> ClientResult<()> {
        let result = self.send(Request::Quit { session: self.session }).await;
        drop(self.requests);
        drop(self.responses);
        unlink(&self.request_path);
        unlink(&self.response_path);
        result
    }

    /// Flushes `out` and ends the session whatever `result` holds, then
    /// reports the first failure among the three.
    pub async fn finish<W: Write>(self, result: ClientResult<()>, out: &mut W) -> ClientResult<()> {
        let flushed = out.flush().map_err(ClientError::from);
        let quit = self.quit().await;
        result.and(flushed).and(quit)
    }

    pub async fn create(&mut self, event: EventId, rows: usize, cols: usize) -> ClientResult<()> {
        let session = self.session;
        self.send(Request::Create { session, event, rows, cols }).await?;
        self.expect_ok(OpCode::Create).await
    }

    pub async fn reserve(&mut self, event: EventId, seats: &[Seat]) -> ClientResult<()> {
        let session = self.session;
        let seats = seats.to_vec();
        self.send(Request::Reserve { session, event, seats }).await?;
        self.expect_ok(OpCode::Reserve).await
    }

    pub async fn show(&mut self, event: EventId) -> ClientResult<GridSnapshot> {
        let session = self.session;
        self.send(Request::Show { session, event }).await?;

        let mut buf = self.read_status().await?;
        if Status::decode(&buf)? == Status::Ok {
            self.read_more(&mut buf, ShowReply::DIMS_LEN).await?;
            let seats_len = ShowReply::seats_len(&buf[STATUS_LEN..])?;
            self.read_more(&mut buf, seats_len).await?;
        }
        match ShowReply::decode(&buf)? {
            ShowReply::Grid(grid) => Ok(grid),
            ShowReply::Failed => Err(ClientError::Rejected(OpCode::Show)),
        }
    }

    /// Ids of every event, in creation order. Empty when the server has
    /// none.
    pub async fn list(&mut self) -> ClientResult<Vec<EventId>> {
        let session = self.session;
        self.send(Request::List { session }).await?;

        let mut buf = self.read_status().await?;
        if Status::decode(&buf)? == Status::Ok {
            self.read_more(&mut buf, ListReply::COUNT_LEN).await?;
            let ids_len = ListReply::ids_len(&buf[STATUS_LEN..])?;
            self.read_more(&mut buf, ids_len).await?;
        }
        match ListReply::decode(&buf)? {
            ListReply::Events(ids) => Ok(ids),
            ListReply::Empty => Ok(Vec::new()),
            ListReply::Failed => Err(ClientError::Rejected(OpCode::List)),
        }
    }

    /// Writes the event's grid to `out`, one row per line.
    pub async fn show_to<W: Write>(&mut self, event: EventId, out: &mut W) -> ClientResult<()> {
        let grid = self.show(event).await?;
        write_grid(out, &grid)?;
        Ok(())
    }

    pub async fn list_to<W: Write>(&mut self, out: &mut W) -> ClientResult<()> {
        let ids = self.list().await?;
        write_event_ids(out, &ids)?;
        Ok(())
    }

    async fn send(&mut self, request: Request) -> ClientResult<()> {
        tracing::debug!(session = %self.session, "Sending {} request", request.op().name());
        self.requests.write_all(&request.encode()?).await?;
        self.requests.flush().await?;
        Ok(())
    }

    async fn read_status(&mut self) -> ClientResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(STATUS_LEN);
        self.read_more(&mut buf, STATUS_LEN).await?;
        Ok(buf)
    }

    async fn read_more(&mut self, buf: &mut Vec<u8>, len: usize) -> ClientResult<()> {
        let start = buf.len();
        buf.resize(start + len, 0);
        self.responses.read_exact(&mut buf[start..]).await?;
        Ok(())
    }

    async fn expect_ok(&mut self, op: OpCode) -> ClientResult<()> {
        let buf = self.read_status().await?;
        match Status::decode(&buf)? {
            Status::Ok => Ok(()),
            _ => Err(ClientError::Rejected(op)),
        }
    }
}

fn channel_name(path: &Path) -> ClientResult<String> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| ClientError::InvalidChannelPath(path.to_path_buf()))
}

/// Replaces whatever is at `path` with a fresh FIFO.
fn make_fifo(path: &Path) -> io::Result<()> {
    unlink(path);
    mkfifo(path, Mode::from_bits_truncate(0o640)).map_err(io::Error::from)
}

fn unlink(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

