// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Fixed width of a channel name on the wire, NUL padded.
pub const PIPE_NAME_LEN: usize = 40;

/// Default number of worker slots, and so of concurrent sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 8;

/// Upper bound on seats in one reserve request accepted off the wire.
pub const DEFAULT_MAX_RESERVATION_SEATS: usize = 1 << 16;

/// Upper bound on `rows * cols` for a single event.
pub const DEFAULT_MAX_GRID_CELLS: usize = 1 << 24;
