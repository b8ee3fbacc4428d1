// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::sync::Arc;

use ems_kernel::EventStore;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::acceptor::{Acceptor, DumpSink};
use crate::config::ServerConfig;
use crate::diagnostics::DumpTrigger;
use crate::errors::NodeResult;
use crate::registry::SessionRegistry;
use crate::transport::SessionTransport;
use crate::worker::WorkerPool;

/// Owns the event store and session registry for the process lifetime and
/// wires the acceptor to the worker pool.
pub struct Server<T> {
    config: ServerConfig,
    store: Arc<EventStore>,
    registry: Arc<SessionRegistry>,
    transport: Arc<T>,
    dump: DumpTrigger,
    dump_sink: Option<DumpSink>,
}

impl<T: SessionTransport> Server<T> {
    pub fn new(config: ServerConfig, transport: T) -> NodeResult<Self> {
        config.validate()?;
        let store = EventStore::with_limits(config.access_delay, config.max_grid_cells);
        Ok(Self {
            registry: Arc::new(SessionRegistry::new(config.max_sessions)),
            store: Arc::new(store),
            transport: Arc::new(transport),
            dump: DumpTrigger::new(),
            dump_sink: None,
            config,
        })
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn dump_trigger(&self) -> DumpTrigger {
        self.dump.clone()
    }

    /// Writes diagnostic dumps to `sink`; stdout by default.
    pub fn with_dump_sink(mut self, sink: DumpSink) -> Self {
        self.dump_sink = Some(sink);
        self
    }

    /// Serves until `shutdown` fires or the server channel closes, then
    /// stops the workers and tears the store down.
    pub async fn run<R>(self, server_channel: R, shutdown: CancellationToken) -> NodeResult<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let workers = WorkerPool::spawn(
            self.config.max_sessions,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.transport),
            self.config.max_reservation_seats,
            shutdown.clone(),
        );

        tracing::info!("Server is now running on {:?}", self.config.server_pipe);
        let mut acceptor = Acceptor::new(
            server_channel,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            self.dump.clone(),
        );
        if let Some(sink) = self.dump_sink {
            acceptor = acceptor.with_dump_sink(sink);
        }
        let result = acceptor.run(shutdown.clone()).await;

        shutdown.cancel();
        workers.join().await;
        if let Err(e) = self.store.terminate() {
            tracing::error!("Failed to terminate event store: {}", e);
        }
        tracing::info!("Server stopped");
        result
    }
}
