// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fixed pool of session workers.
//!
//! Each worker owns one session id for its whole life. It claims a pending
//! connection, answers the client's requests strictly in order until the
//! client quits or a channel fails, then goes back to claiming.

use std::sync::Arc;

use ems_kernel::error::StoreResult;
use ems_kernel::types::SessionId;
use ems_kernel::wire::{ConnectReply, ListReply, OpCode, Request, ShowReply, Status};
use ems_kernel::EventStore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::errors::{NodeError, NodeResult};
use crate::frame::{read_request, write_reply};
use crate::registry::{PendingConnection, SessionRegistry};
use crate::transport::SessionTransport;

/// How a session ended without a channel failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
}

pub struct Worker<T> {
    session: SessionId,
    registry: Arc<SessionRegistry>,
    store: Arc<EventStore>,
    transport: Arc<T>,
    max_seats: usize,
}

impl<T: SessionTransport> Worker<T> {
    pub fn new(
        session: SessionId,
        registry: Arc<SessionRegistry>,
        store: Arc<EventStore>,
        transport: Arc<T>,
        max_seats: usize,
    ) -> Self {
        Self { session, registry, store, transport, max_seats }
    }

    /// Serves sessions until `shutdown` fires. A session in progress is
    /// abandoned on shutdown.
    pub async fn run(self, shutdown: CancellationToken) {
        loop {
            tracing::debug!(session = %self.session, "Worker idle");
            let pending = tokio::select! {
                _ = shutdown.cancelled() => break,
                pending = self.registry.claim() => pending,
            };

            let outcome = tokio::select! {
                _ = shutdown.cancelled() => break,
                outcome = self.serve(pending) => outcome,
            };

            metrics::counter!("ems_sessions_total", 1);
            match outcome {
                Ok(SessionEnd::Quit) => {
                    tracing::info!(session = %self.session, "Client disconnected");
                }
                Err(e) if e.is_disconnect() => {
                    tracing::warn!(session = %self.session, "Client went away: {}", e);
                }
                Err(e) => {
                    tracing::error!(session = %self.session, "Session terminated: {}", e);
                }
            }
        }
        tracing::debug!(session = %self.session, "Worker stopped");
    }

    /// Runs one session to completion. Both channel ends are closed when
    /// this returns, whatever the outcome.
    pub async fn serve(&self, pending: PendingConnection) -> NodeResult<SessionEnd> {
        let (mut reader, mut writer) = self.transport.open(&pending).await?;

        let reply = ConnectReply { session: self.session };
        write_reply(&mut writer, &reply.encode()).await?;
        tracing::info!(session = %self.session, "Client connected via {}", pending.request_channel);

        loop {
            let request = read_request(&mut reader, self.max_seats).await?;
            if let Some(claimed) = request.session() {
                if claimed != self.session {
                    tracing::warn!(
                        session = %self.session,
                        "Request carries session id {}",
                        claimed
                    );
                }
            }

            match request {
                Request::Quit { .. } => return Ok(SessionEnd::Quit),
                Request::Connect(_) => return Err(NodeError::UnexpectedRequest(OpCode::Connect)),
                request => {
                    let reply = self.dispatch(request).await;
                    write_reply(&mut writer, &reply).await?;
                }
            }
        }
    }

    /// Runs the store operation on the blocking pool; store calls may sleep
    /// and wait on locks.
    async fn dispatch(&self, request: Request) -> Vec<u8> {
        let store = Arc::clone(&self.store);
        let session = self.session;
        let op = request.op();
        match tokio::task::spawn_blocking(move || execute(&store, session, request)).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session = %session, "{} handler failed: {}", op.name(), e);
                Status::Failed.encode().to_vec()
            }
        }
    }
}

/// Applies one request to the store and encodes the reply.
pub fn execute(store: &EventStore, session: SessionId, request: Request) -> Vec<u8> {
    let op = request.op();
    metrics::counter!("ems_requests_total", 1, "op" => op.name());

    match request {
        Request::Create { event, rows, cols, .. } => {
            let result = store.create(event, rows, cols);
            log_outcome(session, op, &result);
            Status::of(&result).encode().to_vec()
        }
        Request::Reserve { event, seats, .. } => {
            let result = store.reserve(event, &seats);
            log_outcome(session, op, &result);
            if result.is_ok() {
                metrics::counter!("ems_reservations_total", 1);
            }
            Status::of(&result).encode().to_vec()
        }
        Request::Show { event, .. } => {
            let result = store.show(event);
            log_outcome(session, op, &result);
            ShowReply::from(result).encode()
        }
        Request::List { .. } => {
            let result = store.list();
            log_outcome(session, op, &result);
            ListReply::from(result).encode()
        }
        // Session control; answered by the session loop, never here.
        Request::Quit { .. } | Request::Connect(_) => Status::Failed.encode().to_vec(),
    }
}

fn log_outcome<V>(session: SessionId, op: OpCode, result: &StoreResult<V>) {
    match result {
        Ok(_) => tracing::debug!(session = %session, "{} ok", op.name()),
        Err(e) => {
            metrics::counter!("ems_request_failures_total", 1, "op" => op.name());
            if e.is_resource_failure() {
                tracing::error!(session = %session, "{} failed: {}", op.name(), e);
            } else {
                tracing::warn!(session = %session, "{} rejected: {}", op.name(), e);
            }
        }
    }
}

/// Handles of the running workers.
pub struct WorkerPool {
    workers: JoinSet<()>,
}

impl WorkerPool {
    /// Starts `size` workers with session ids `1..=size`.
    pub fn spawn<T: SessionTransport>(
        size: usize,
        registry: Arc<SessionRegistry>,
        store: Arc<EventStore>,
        transport: Arc<T>,
        max_seats: usize,
        shutdown: CancellationToken,
    ) -> Self {
        let mut workers = JoinSet::new();
        for id in 1..=size as u32 {
            let worker = Worker::new(
                SessionId(id),
                Arc::clone(&registry),
                Arc::clone(&store),
                Arc::clone(&transport),
                max_seats,
            );
            workers.spawn(worker.run(shutdown.clone()));
        }
        tracing::info!("Started {} workers", size);
        Self { workers }
    }

    /// Waits for every worker to stop. Callers cancel the shutdown token
    /// first.
    pub async fn join(mut self) {
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Worker task failed: {}", e);
            }
        }
    }
}
