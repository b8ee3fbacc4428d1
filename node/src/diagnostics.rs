// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Operator-triggered dump of the event store.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ems_kernel::report::write_report;
use ems_kernel::EventStore;
use tokio::sync::Notify;

/// Polled request for a store dump. Setting it only raises a flag; the
/// acceptor services it between reads.
#[derive(Debug, Clone, Default)]
pub struct DumpTrigger {
    inner: Arc<TriggerState>,
}

#[derive(Debug, Default)]
struct TriggerState {
    requested: AtomicBool,
    wake: Notify,
}

impl DumpTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
    }

    /// Clears the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.inner.requested.swap(false, Ordering::SeqCst)
    }

    /// Resolves after the next `request`.
    pub async fn requested(&self) {
        self.inner.wake.notified().await;
    }
}

/// Writes every event and its grid to `out`.
pub fn dump_store<W: Write>(store: &EventStore, out: &mut W) {
    let events = match store.snapshot_all() {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("Diagnostic dump failed: {}", e);
            return;
        }
    };
    if let Err(e) = write_report(out, &events).and_then(|_| out.flush()) {
        tracing::error!("Failed to write diagnostic dump: {}", e);
    }
}

/// Installs a SIGUSR1 handler that raises `trigger`.
#[cfg(unix)]
pub fn forward_sigusr1(trigger: DumpTrigger) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut stream = signal(SignalKind::user_defined1())?;
    Ok(tokio::spawn(async move {
        while stream.recv().await.is_some() {
            tracing::info!("SIGUSR1 received, dump scheduled");
            trigger.request();
        }
    }))
}
