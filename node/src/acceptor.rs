// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Reads connect requests off the well-known channel.

use std::io::Write;
use std::sync::Arc;

use ems_kernel::wire::OpCode;
use ems_kernel::EventStore;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;

use crate::diagnostics::{dump_store, DumpTrigger};
use crate::errors::{NodeError, NodeResult};
use crate::frame::read_connect;
use crate::registry::SessionRegistry;

pub struct Acceptor<R> {
    channel: R,
    registry: Arc<SessionRegistry>,
    /// Only read for diagnostic dumps.
    store: Arc<EventStore>,
    dump: DumpTrigger,
    dump_sink: DumpSink,
}

/// Destination of diagnostic dumps.
pub type DumpSink = Box<dyn Write + Send>;

enum Step {
    Byte(u8),
    Dump,
    Stop,
}

impl<R: AsyncRead + Unpin> Acceptor<R> {
    pub fn new(
        channel: R,
        registry: Arc<SessionRegistry>,
        store: Arc<EventStore>,
        dump: DumpTrigger,
    ) -> Self {
        Self {
            channel,
            registry,
            store,
            dump,
            dump_sink: Box::new(std::io::stdout()),
        }
    }

    /// Sends dumps to `sink` instead of stdout.
    pub fn with_dump_sink(mut self, sink: DumpSink) -> Self {
        self.dump_sink = sink;
        self
    }

    /// Runs until `shutdown` fires or the channel reaches end-of-file.
    ///
    /// Any leading byte other than the connect op is dropped and reading
    /// resumes with the next byte. A malformed connect message is logged
    /// and skipped the same way.
    pub async fn run(mut self, shutdown: CancellationToken) -> NodeResult<()> {
        loop {
            if self.dump.take() {
                dump_store(&self.store, &mut self.dump_sink);
            }

            let step = tokio::select! {
                biased;
                _ = shutdown.cancelled() => Step::Stop,
                _ = self.dump.requested() => Step::Dump,
                byte = self.channel.read_u8() => match byte {
                    Ok(byte) => Step::Byte(byte),
                    Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                        tracing::info!("Server channel closed");
                        Step::Stop
                    }
                    Err(e) => return Err(e.into()),
                },
            };

            let byte = match step {
                Step::Stop => return Ok(()),
                Step::Dump => continue,
                Step::Byte(byte) => byte,
            };

            if byte != OpCode::Connect as u8 {
                tracing::trace!("Discarding byte {:#04x} on server channel", byte);
                metrics::counter!("ems_discarded_bytes_total", 1);
                continue;
            }

            let pending = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                pending = read_connect(&mut self.channel) => pending,
            };

            match pending {
                Ok(pending) => {
                    tracing::debug!(
                        "Connect request: req={} resp={}",
                        pending.request_channel,
                        pending.response_channel
                    );
                    if let Err(e) = self.registry.publish(pending) {
                        tracing::error!("Dropping connect request: {}", e);
                    }
                }
                Err(e) if e.is_disconnect() => {
                    tracing::info!("Server channel closed mid-request");
                    return Ok(());
                }
                Err(NodeError::Io(e)) => return Err(NodeError::Io(e)),
                Err(e) => tracing::warn!("Malformed connect request skipped: {}", e),
            }
        }
    }
}
