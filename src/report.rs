// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Plain-text rendering for operator diagnostics and client output.

use std::io::{self, Write};

use crate::grid::GridSnapshot;
use crate::types::EventId;

/// One line per row, seats separated by single spaces.
pub fn write_grid<W: Write>(out: &mut W, grid: &GridSnapshot) -> io::Result<()> {
    for row in grid.rows_iter() {
        let mut first = true;
        for seat in row {
            if !first {
                out.write_all(b" ")?;
            }
            write!(out, "{seat}")?;
            first = false;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// `Event: <id>` per line, or `No events`.
pub fn write_event_ids<W: Write>(out: &mut W, ids: &[EventId]) -> io::Result<()> {
    if ids.is_empty() {
        return out.write_all(b"No events\n");
    }
    for id in ids {
        writeln!(out, "Event: {id}")?;
    }
    Ok(())
}

/// Full store dump: each event header followed by its grid.
pub fn write_report<W: Write>(out: &mut W, events: &[(EventId, GridSnapshot)]) -> io::Result<()> {
    if events.is_empty() {
        return out.write_all(b"No events\n");
    }
    for (id, grid) in events {
        writeln!(out, "Event: {id}")?;
        write_grid(out, grid)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_rendering() {
        let grid = GridSnapshot { rows: 2, cols: 2, seats: vec![1, 1, 2, 0] };
        let mut out = Vec::new();
        write_grid(&mut out, &grid).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1 1\n2 0\n");
    }

    #[test]
    fn test_report() {
        let mut out = Vec::new();
        write_report(&mut out, &[]).unwrap();
        assert_eq!(out, b"No events\n");

        let mut out = Vec::new();
        let grid = GridSnapshot { rows: 1, cols: 3, seats: vec![0, 4, 0] };
        write_report(&mut out, &[(EventId(12), grid)]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Event: 12\n0 4 0\n");
    }
}
