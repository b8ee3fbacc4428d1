// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use thiserror::Error;

use crate::types::{EventId, Seat};

/// Failures of an event store operation. Every variant is reported to the
/// client as status 1; the variants exist for server-side logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Event store is not initialized")]
    Uninitialized,

    #[error("Event store has already been terminated")]
    AlreadyTerminated,

    #[error("Event {0} already exists")]
    DuplicateEvent(EventId),

    #[error("Event {0} not found")]
    EventNotFound(EventId),

    #[error("Invalid dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Grid of {rows}x{cols} exceeds the cell limit of {limit}")]
    GridTooLarge { rows: usize, cols: usize, limit: usize },

    #[error("Failed to allocate {cells} seats")]
    Allocation { cells: usize },

    #[error("Reservation ids exhausted for this event")]
    ReservationsExhausted,

    #[error("Seat ({}, {}) out of bounds", .0.row, .0.col)]
    SeatOutOfBounds(Seat),

    #[error("Seat ({}, {}) already reserved", .0.row, .0.col)]
    SeatTaken(Seat),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl StoreError {
    /// Resource failures are logged distinctly from validation failures.
    pub fn is_resource_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Allocation { .. }
                | StoreError::ReservationsExhausted
                | StoreError::LockPoisoned(_)
        )
    }
}

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Invalid op code: {0:#04x}")]
    InvalidOpCode(u8),

    #[error("Invalid status code: {0}")]
    InvalidStatus(i32),

    #[error("Invalid payload length: expected {expected}, found {found}")]
    InvalidPayloadLength { expected: usize, found: usize },

    #[error("Seat count {count} exceeds limit {limit}")]
    TooManySeats { count: usize, limit: usize },

    #[error("Grid of {rows}x{cols} cannot be represented")]
    GridOverflow { rows: usize, cols: usize },

    #[error("Channel name is {0} bytes, longer than the wire field")]
    NameTooLong(usize),

    #[error("Channel name is not valid UTF-8")]
    NameEncoding,

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type WireResult<T> = core::result::Result<T, WireError>;
