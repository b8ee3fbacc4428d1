// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Seat coordinates.

/// A 1-based `(row, col)` position inside an event's grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Seat {
    pub row: usize,
    pub col: usize,
}

impl Seat {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Row-major offset into a grid with `cols` columns.
    /// Caller must have checked the seat is in bounds.
    pub(crate) fn index(&self, cols: usize) -> usize {
        (self.row - 1) * cols + (self.col - 1)
    }
}

impl From<(usize, usize)> for Seat {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}
