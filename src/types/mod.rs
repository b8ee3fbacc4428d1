// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod id;
pub mod seat;

pub use id::{EventId, ReservationId, SessionId};
pub use seat::Seat;
