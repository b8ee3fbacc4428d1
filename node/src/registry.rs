// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hand-off of pending connections from the acceptor to idle workers.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ems_kernel::wire::ConnectRequest;
use tokio::sync::Notify;

use crate::errors::{NodeError, NodeResult};

/// Channel names of a client that has not been given a worker yet.
pub type PendingConnection = ConnectRequest;

/// Bounded FIFO of pending connections.
///
/// `publish` never waits. `claim` suspends until an entry is available;
/// each entry is handed to exactly one claimer, with no affinity between
/// entries and workers.
#[derive(Debug)]
pub struct SessionRegistry {
    pending: Mutex<VecDeque<PendingConnection>>,
    available: Notify,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Notify::new(),
            capacity,
        }
    }

    // Each critical section is one push or pop, so a poisoned queue is
    // still consistent.
    fn queue(&self) -> MutexGuard<'_, VecDeque<PendingConnection>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    /// Queues `pending` and wakes one idle worker.
    pub fn publish(&self, pending: PendingConnection) -> NodeResult<()> {
        {
            let mut queue = self.queue();
            if queue.len() >= self.capacity {
                return Err(NodeError::RegistryFull(queue.len()));
            }
            queue.push_back(pending);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Takes the oldest pending connection, waiting for one if necessary.
    pub async fn claim(&self) -> PendingConnection {
        loop {
            if let Some(pending) = self.try_claim() {
                return pending;
            }
            self.available.notified().await;
        }
    }

    pub fn try_claim(&self) -> Option<PendingConnection> {
        let (pending, more) = {
            let mut queue = self.queue();
            let pending = queue.pop_front();
            (pending, !queue.is_empty())
        };
        // Publishes that raced ahead of any waiter leave at most one stored
        // permit; pass the wake-up along while entries remain.
        if pending.is_some() && more {
            self.available.notify_one();
        }
        pending
    }
}
