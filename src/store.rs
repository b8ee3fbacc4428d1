// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! In-memory event store with a two-tier lock discipline.
//!
//! The catalog of events sits behind one readers-writer lock (the
//! structural lock). Each event carries its own mutex guarding its seat
//! grid. A thread never holds both: lookups clone the `Arc<Event>` out of
//! the catalog and drop the structural guard before the event mutex is
//! taken.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::config::DEFAULT_MAX_GRID_CELLS;
use crate::error::{StoreError, StoreResult};
use crate::grid::{GridSnapshot, SeatGrid};
use crate::types::{EventId, ReservationId, Seat};

/// One reservable event. Identity and dimensions never change after
/// creation; the grid is mutated only under `grid`'s lock.
#[derive(Debug)]
pub struct Event {
    id: EventId,
    grid: Mutex<SeatGrid>,
}

impl Event {
    fn lock(&self) -> StoreResult<MutexGuard<'_, SeatGrid>> {
        self.grid
            .lock()
            .map_err(|_| StoreError::LockPoisoned("event"))
    }
}

#[derive(Debug, Default)]
struct Catalog {
    index: FxHashMap<EventId, Arc<Event>>,
    /// Insertion order, for listing.
    order: Vec<Arc<Event>>,
}

#[derive(Debug)]
pub struct EventStore {
    /// `None` once the store has been terminated.
    catalog: RwLock<Option<Catalog>>,
    access_delay: Duration,
    max_cells: usize,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl EventStore {
    /// Creates an empty store. `access_delay` is slept on every catalog
    /// lookup to simulate a costly backing resource.
    pub fn new(access_delay: Duration) -> Self {
        Self::with_limits(access_delay, DEFAULT_MAX_GRID_CELLS)
    }

    pub fn with_limits(access_delay: Duration, max_cells: usize) -> Self {
        Self {
            catalog: RwLock::new(Some(Catalog::default())),
            access_delay,
            max_cells,
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Option<Catalog>>> {
        self.catalog
            .read()
            .map_err(|_| StoreError::LockPoisoned("catalog"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Option<Catalog>>> {
        self.catalog
            .write()
            .map_err(|_| StoreError::LockPoisoned("catalog"))
    }

    fn find(&self, catalog: &Catalog, id: EventId) -> Option<Arc<Event>> {
        if !self.access_delay.is_zero() {
            std::thread::sleep(self.access_delay);
        }
        catalog.index.get(&id).cloned()
    }

    /// Adds a new event with a zeroed grid.
    ///
    /// The duplicate check and the insert happen under one exclusive hold
    /// of the structural lock.
    pub fn create(&self, id: EventId, rows: usize, cols: usize) -> StoreResult<()> {
        let mut guard = self.write()?;
        let catalog = guard.as_mut().ok_or(StoreError::Uninitialized)?;

        if self.find(catalog, id).is_some() {
            return Err(StoreError::DuplicateEvent(id));
        }

        let grid = SeatGrid::new(rows, cols, self.max_cells)?;
        catalog
            .order
            .try_reserve(1)
            .map_err(|_| StoreError::Allocation { cells: rows * cols })?;

        let event = Arc::new(Event {
            id,
            grid: Mutex::new(grid),
        });
        catalog.index.insert(id, Arc::clone(&event));
        catalog.order.push(event);
        Ok(())
    }

    /// Finds an event under the shared structural lock. The lock is
    /// released when this returns.
    pub fn lookup(&self, id: EventId) -> StoreResult<Arc<Event>> {
        let guard = self.read()?;
        let catalog = guard.as_ref().ok_or(StoreError::Uninitialized)?;
        self.find(catalog, id).ok_or(StoreError::EventNotFound(id))
    }

    /// Reserves `seats` of event `id` atomically.
    pub fn reserve(&self, id: EventId, seats: &[Seat]) -> StoreResult<ReservationId> {
        let event = self.lookup(id)?;
        let mut grid = event.lock()?;
        grid.reserve(seats)
    }

    /// Copies the dimensions and seats of event `id`.
    pub fn show(&self, id: EventId) -> StoreResult<GridSnapshot> {
        let event = self.lookup(id)?;
        let grid = event.lock()?;
        Ok(grid.snapshot())
    }

    /// Event ids in creation order. Only the catalog is read, so no event
    /// lock is taken.
    pub fn list(&self) -> StoreResult<Vec<EventId>> {
        let guard = self.read()?;
        let catalog = guard.as_ref().ok_or(StoreError::Uninitialized)?;
        Ok(catalog.order.iter().map(|event| event.id).collect())
    }

    pub fn len(&self) -> StoreResult<usize> {
        let guard = self.read()?;
        let catalog = guard.as_ref().ok_or(StoreError::Uninitialized)?;
        Ok(catalog.order.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of every event for diagnostics. Event handles are copied
    /// out under the structural lock, then each grid is locked on its own.
    pub fn snapshot_all(&self) -> StoreResult<Vec<(EventId, GridSnapshot)>> {
        let events: Vec<Arc<Event>> = {
            let guard = self.read()?;
            let catalog = guard.as_ref().ok_or(StoreError::Uninitialized)?;
            catalog.order.clone()
        };

        events
            .iter()
            .map(|event| Ok((event.id, event.lock()?.snapshot())))
            .collect()
    }

    /// Drops every event. Later operations fail with
    /// [`StoreError::Uninitialized`].
    pub fn terminate(&self) -> StoreResult<()> {
        let mut guard = self.write()?;
        match guard.take() {
            Some(_) => Ok(()),
            None => Err(StoreError::AlreadyTerminated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_show_is_zeroed() {
        let store = EventStore::default();
        store.create(EventId(7), 3, 5).unwrap();

        let snap = store.show(EventId(7)).unwrap();
        assert_eq!((snap.rows, snap.cols), (3, 5));
        assert_eq!(snap.seats, vec![0; 15]);
    }

    #[test]
    fn test_lookup_releases_structural_lock() {
        let store = EventStore::default();
        store.create(EventId(1), 1, 1).unwrap();

        let event = store.lookup(EventId(1)).unwrap();
        let _grid = event.lock().unwrap();
        // A writer can still get in while an event lock is held.
        store.create(EventId(2), 1, 1).unwrap();
        assert_eq!(store.list().unwrap(), vec![EventId(1), EventId(2)]);
    }

    #[test]
    fn test_terminate() {
        let store = EventStore::default();
        store.create(EventId(1), 2, 2).unwrap();
        store.terminate().unwrap();

        assert_eq!(store.list(), Err(StoreError::Uninitialized));
        assert_eq!(store.show(EventId(1)), Err(StoreError::Uninitialized));
        assert_eq!(
            store.create(EventId(2), 1, 1),
            Err(StoreError::Uninitialized)
        );
        assert_eq!(store.terminate(), Err(StoreError::AlreadyTerminated));
    }

    #[test]
    fn test_grid_limit_is_enforced() {
        let store = EventStore::with_limits(Duration::ZERO, 16);
        assert!(matches!(
            store.create(EventId(1), 5, 5),
            Err(StoreError::GridTooLarge { .. })
        ));
        assert!(store.is_empty().unwrap());
    }
}
