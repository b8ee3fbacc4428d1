// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
#![allow(dead_code)]

//! In-memory harness: the server channel and every session channel are
//! `tokio::io::duplex` pipes, keyed by channel name the way FIFOs are keyed
//! by path.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ems_kernel::types::{EventId, Seat, SessionId};
use ems_kernel::wire::{
    ConnectReply, ConnectRequest, ListReply, Request, ShowReply, Status, STATUS_LEN,
};
use ems_kernel::EventStore;
use ems_node::config::ServerConfig;
use ems_node::diagnostics::DumpTrigger;
use ems_node::errors::NodeResult;
use ems_node::registry::{PendingConnection, SessionRegistry};
use ems_node::server::Server;
use ems_node::transport::{ChannelReader, ChannelWriter, SessionTransport};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Clone, Default)]
pub struct MemoryTransport {
    channels: Arc<Mutex<HashMap<String, DuplexStream>>>,
}

impl MemoryTransport {
    /// Creates channel `name` and returns the client's end.
    pub fn channel(&self, name: &str) -> DuplexStream {
        let (client, server) = duplex(PIPE_CAPACITY);
        self.channels.lock().unwrap().insert(name.to_string(), server);
        client
    }

    fn take(&self, name: &str) -> io::Result<DuplexStream> {
        self.channels
            .lock()
            .unwrap()
            .remove(name)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))
    }
}

#[async_trait]
impl SessionTransport for MemoryTransport {
    async fn open(&self, pending: &PendingConnection) -> io::Result<(ChannelReader, ChannelWriter)> {
        let reader = self.take(&pending.request_channel)?;
        let writer = self.take(&pending.response_channel)?;
        Ok((Box::new(reader), Box::new(writer)))
    }
}

/// Dump sink the test can read back while the server holds a writer.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct TestServer {
    connect_tx: DuplexStream,
    transport: MemoryTransport,
    pub store: Arc<EventStore>,
    pub registry: Arc<SessionRegistry>,
    pub dump: DumpTrigger,
    pub dump_output: SharedBuffer,
    shutdown: CancellationToken,
    handle: JoinHandle<NodeResult<()>>,
}

impl TestServer {
    pub fn start(max_sessions: usize) -> Self {
        let config = ServerConfig { max_sessions, ..Default::default() };
        Self::with_config(config)
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let transport = MemoryTransport::default();
        let dump_output = SharedBuffer::default();
        let server = Server::new(config, transport.clone())
            .unwrap()
            .with_dump_sink(Box::new(dump_output.clone()));
        let store = Arc::clone(server.store());
        let registry = Arc::clone(server.registry());
        let dump = server.dump_trigger();

        let (connect_tx, connect_rx) = duplex(PIPE_CAPACITY);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(connect_rx, shutdown.clone()));
        Self { connect_tx, transport, store, registry, dump, dump_output, shutdown, handle }
    }

    /// Writes raw bytes to the well-known channel.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.connect_tx.write_all(bytes).await.unwrap();
    }

    /// Sends a connect request without waiting for a worker.
    pub async fn request_session(&mut self, name: &str) -> PendingClient {
        let request_channel = format!("{name}_req");
        let response_channel = format!("{name}_resp");
        let req = self.transport.channel(&request_channel);
        let resp = self.transport.channel(&response_channel);

        let connect = Request::Connect(ConnectRequest { request_channel, response_channel });
        self.send_raw(&connect.encode().unwrap()).await;
        PendingClient { req, resp }
    }

    pub async fn connect(&mut self, name: &str) -> TestClient {
        self.request_session(name).await.accepted().await
    }

    pub async fn stop(self) -> NodeResult<()> {
        self.shutdown.cancel();
        self.handle.await.unwrap()
    }

    /// Closes the well-known channel and waits for the server to notice.
    pub async fn close(self) -> NodeResult<()> {
        drop(self.connect_tx);
        self.handle.await.unwrap()
    }
}

pub struct PendingClient {
    req: DuplexStream,
    resp: DuplexStream,
}

impl PendingClient {
    pub async fn accepted(mut self) -> TestClient {
        let mut buf = [0u8; ConnectReply::LEN];
        self.resp.read_exact(&mut buf).await.unwrap();
        let session = ConnectReply::decode(&buf).unwrap().session;
        TestClient { session, req: self.req, resp: self.resp }
    }
}

pub struct TestClient {
    pub session: SessionId,
    req: DuplexStream,
    resp: DuplexStream,
}

impl TestClient {
    pub async fn send(&mut self, request: Request) {
        self.req.write_all(&request.encode().unwrap()).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.req.write_all(bytes).await.unwrap();
    }

    async fn read_more(&mut self, buf: &mut Vec<u8>, len: usize) {
        let start = buf.len();
        buf.resize(start + len, 0);
        self.resp.read_exact(&mut buf[start..]).await.unwrap();
    }

    pub async fn status(&mut self) -> Status {
        let mut buf = Vec::new();
        self.read_more(&mut buf, STATUS_LEN).await;
        Status::decode(&buf).unwrap()
    }

    pub async fn create(&mut self, event: u32, rows: usize, cols: usize) -> Status {
        let session = self.session;
        self.send(Request::Create { session, event: EventId(event), rows, cols }).await;
        self.status().await
    }

    pub async fn reserve(&mut self, event: u32, seats: &[(usize, usize)]) -> Status {
        let session = self.session;
        let seats = seats.iter().copied().map(Seat::from).collect();
        self.send(Request::Reserve { session, event: EventId(event), seats }).await;
        self.status().await
    }

    pub async fn show(&mut self, event: u32) -> ShowReply {
        let session = self.session;
        self.send(Request::Show { session, event: EventId(event) }).await;

        let mut buf = Vec::new();
        self.read_more(&mut buf, STATUS_LEN).await;
        if Status::decode(&buf).unwrap() == Status::Ok {
            self.read_more(&mut buf, ShowReply::DIMS_LEN).await;
            let seats_len = ShowReply::seats_len(&buf[STATUS_LEN..]).unwrap();
            self.read_more(&mut buf, seats_len).await;
        }
        ShowReply::decode(&buf).unwrap()
    }

    pub async fn list(&mut self) -> ListReply {
        let session = self.session;
        self.send(Request::List { session }).await;

        let mut buf = Vec::new();
        self.read_more(&mut buf, STATUS_LEN).await;
        if Status::decode(&buf).unwrap() == Status::Ok {
            self.read_more(&mut buf, ListReply::COUNT_LEN).await;
            let ids_len = ListReply::ids_len(&buf[STATUS_LEN..]).unwrap();
            self.read_more(&mut buf, ids_len).await;
        }
        ListReply::decode(&buf).unwrap()
    }

    /// Sends quit and returns once the server has closed the response
    /// channel.
    pub async fn quit(mut self) {
        let session = self.session;
        self.send(Request::Quit { session }).await;
        self.assert_closed().await;
    }

    /// Asserts the server closed the response channel without replying.
    pub async fn assert_closed(&mut self) {
        let mut byte = [0u8; 1];
        assert_eq!(self.resp.read(&mut byte).await.unwrap(), 0);
    }
}
