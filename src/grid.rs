// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Seat grid and the all-or-nothing reservation algorithm.
//!
//! A grid is only ever touched while its event's mutation lock is held, so
//! nothing in here synchronizes.

use crate::error::{StoreError, StoreResult};
use crate::types::{ReservationId, Seat};

/// Row-major seat grid. A cell holds `0` when free, otherwise the id of the
/// reservation that claimed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatGrid {
    rows: usize,
    cols: usize,
    seats: Vec<u32>,
    last_reservation: ReservationId,
}

/// Consistent copy of a grid taken under the event lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    pub rows: usize,
    pub cols: usize,
    pub seats: Vec<u32>,
}

impl SeatGrid {
    /// Allocates a zeroed grid. Allocation failure is reported instead of
    /// aborting the process.
    pub fn new(rows: usize, cols: usize, max_cells: usize) -> StoreResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(StoreError::InvalidDimensions { rows, cols });
        }
        let cells = rows
            .checked_mul(cols)
            .filter(|cells| *cells <= max_cells)
            .ok_or(StoreError::GridTooLarge { rows, cols, limit: max_cells })?;

        let mut seats = Vec::new();
        seats
            .try_reserve_exact(cells)
            .map_err(|_| StoreError::Allocation { cells })?;
        seats.resize(cells, 0);

        Ok(Self {
            rows,
            cols,
            seats,
            last_reservation: ReservationId::default(),
        })
    }

    pub fn last_reservation(&self) -> ReservationId {
        self.last_reservation
    }

    pub fn contains(&self, seat: Seat) -> bool {
        (1..=self.rows).contains(&seat.row) && (1..=self.cols).contains(&seat.col)
    }

    /// Reserves every seat in `seats` under one new reservation id.
    ///
    /// Bounds are checked for the whole request before any seat is looked
    /// at, then every seat is checked for availability, and only then is
    /// anything written. On error the grid is unchanged and the counter is
    /// not advanced. A seat listed twice in the same request is stamped once.
    pub fn reserve(&mut self, seats: &[Seat]) -> StoreResult<ReservationId> {
        if let Some(seat) = seats.iter().find(|seat| !self.contains(**seat)) {
            return Err(StoreError::SeatOutOfBounds(*seat));
        }
        if let Some(seat) = seats
            .iter()
            .find(|seat| self.seats[seat.index(self.cols)] != 0)
        {
            return Err(StoreError::SeatTaken(*seat));
        }

        let reservation = self
            .last_reservation
            .next()
            .ok_or(StoreError::ReservationsExhausted)?;
        for seat in seats {
            self.seats[seat.index(self.cols)] = reservation.0;
        }
        self.last_reservation = reservation;
        Ok(reservation)
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            rows: self.rows,
            cols: self.cols,
            seats: self.seats.clone(),
        }
    }
}

impl GridSnapshot {
    /// Iterates the grid one row at a time.
    pub fn rows_iter(&self) -> impl Iterator<Item = &[u32]> {
        self.seats.chunks(self.cols.max(1))
    }
}
