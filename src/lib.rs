// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.

//! ems-kernel: event store, seat reservation and wire codec for the event
//! management service.

pub mod config;
pub mod error;
pub mod types;
pub mod grid;
pub mod store;
pub mod report;
pub mod wire;

pub use error::{StoreError, WireError};
pub use grid::{GridSnapshot, SeatGrid};
pub use store::EventStore;
