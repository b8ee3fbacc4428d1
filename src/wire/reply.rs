// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Server to client messages.
//!
//! Replies are read off a stream in stages: a fixed-size status, then for
//! `show`/`list` a fixed-size header, then a body whose length the header
//! determines. The `*_len` helpers compute each stage's size so callers can
//! `read_exact` it before handing the whole buffer to `decode`.

use crate::error::{StoreResult, WireError, WireResult};
use crate::grid::GridSnapshot;
use crate::types::{EventId, SessionId};
use crate::wire::{decode_word, Decoder, Encoder, Status, ID_LEN, STATUS_LEN, WORD_LEN};

/// Sent once, right after the worker opens the session's channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectReply {
    pub session: SessionId,
}

impl ConnectReply {
    pub const LEN: usize = ID_LEN;

    pub fn encode(&self) -> Vec<u8> {
        Encoder::with_capacity(Self::LEN).u32(self.session.0).finish()
    }

    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        let mut dec = Decoder::new(buf);
        let session = SessionId(dec.u32()?);
        dec.finish()?;
        Ok(Self { session })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowReply {
    Grid(GridSnapshot),
    Failed,
}

impl From<StoreResult<GridSnapshot>> for ShowReply {
    fn from(result: StoreResult<GridSnapshot>) -> Self {
        match result {
            Ok(grid) => ShowReply::Grid(grid),
            Err(_) => ShowReply::Failed,
        }
    }
}

impl ShowReply {
    /// Dimension words following an `Ok` status.
    pub const DIMS_LEN: usize = 2 * WORD_LEN;

    pub fn status(&self) -> Status {
        match self {
            ShowReply::Grid(_) => Status::Ok,
            ShowReply::Failed => Status::Failed,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            ShowReply::Failed => Status::Failed.encode().to_vec(),
            ShowReply::Grid(grid) => {
                let len = STATUS_LEN + Self::DIMS_LEN + grid.seats.len() * ID_LEN;
                let mut enc = Encoder::with_capacity(len);
                enc.status(Status::Ok).word(grid.rows).word(grid.cols);
                for seat in &grid.seats {
                    enc.u32(*seat);
                }
                enc.finish()
            }
        }
    }

    /// Length of the seat block announced by the dimension words.
    pub fn seats_len(dims: &[u8]) -> WireResult<usize> {
        if dims.len() != Self::DIMS_LEN {
            return Err(WireError::InvalidPayloadLength {
                expected: Self::DIMS_LEN,
                found: dims.len(),
            });
        }
        let rows = decode_word(&dims[..WORD_LEN])?;
        let cols = decode_word(&dims[WORD_LEN..])?;
        rows.checked_mul(cols)
            .and_then(|cells| cells.checked_mul(ID_LEN))
            .ok_or(WireError::GridOverflow { rows, cols })
    }

    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        let mut dec = Decoder::new(buf);
        let status = Status::try_from(dec.i32()?)?;
        if status != Status::Ok {
            dec.finish()?;
            return Ok(ShowReply::Failed);
        }

        let rows = dec.word()?;
        let cols = dec.word()?;
        let cells = rows
            .checked_mul(cols)
            .ok_or(WireError::GridOverflow { rows, cols })?;
        if cells.checked_mul(ID_LEN) != Some(dec.remaining()) {
            return Err(WireError::InvalidPayloadLength {
                expected: cells.saturating_mul(ID_LEN),
                found: dec.remaining(),
            });
        }
        let seats = (0..cells).map(|_| dec.u32()).collect::<WireResult<Vec<_>>>()?;
        dec.finish()?;
        Ok(ShowReply::Grid(GridSnapshot { rows, cols, seats }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListReply {
    Events(Vec<EventId>),
    /// The store holds no events. Distinct from `Failed` so the client can
    /// say so.
    Empty,
    Failed,
}

impl From<StoreResult<Vec<EventId>>> for ListReply {
    fn from(result: StoreResult<Vec<EventId>>) -> Self {
        match result {
            Ok(ids) if ids.is_empty() => ListReply::Empty,
            Ok(ids) => ListReply::Events(ids),
            Err(_) => ListReply::Failed,
        }
    }
}

impl ListReply {
    /// Count word following an `Ok` status.
    pub const COUNT_LEN: usize = WORD_LEN;

    pub fn status(&self) -> Status {
        match self {
            ListReply::Events(_) => Status::Ok,
            ListReply::Empty => Status::Empty,
            ListReply::Failed => Status::Failed,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            ListReply::Events(ids) => {
                let len = STATUS_LEN + Self::COUNT_LEN + ids.len() * ID_LEN;
                let mut enc = Encoder::with_capacity(len);
                enc.status(Status::Ok).word(ids.len());
                for id in ids {
                    enc.u32(id.0);
                }
                enc.finish()
            }
            other => other.status().encode().to_vec(),
        }
    }

    /// Length of the id block announced by the count word.
    pub fn ids_len(count: &[u8]) -> WireResult<usize> {
        let count = decode_word(count)?;
        count.checked_mul(ID_LEN).ok_or(WireError::InvalidPayloadLength {
            expected: usize::MAX,
            found: count,
        })
    }

    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        let mut dec = Decoder::new(buf);
        let reply = match Status::try_from(dec.i32()?)? {
            Status::Failed => ListReply::Failed,
            Status::Empty => ListReply::Empty,
            Status::Ok => {
                let count = dec.word()?;
                if count.checked_mul(ID_LEN) != Some(dec.remaining()) {
                    return Err(WireError::InvalidPayloadLength {
                        expected: count.saturating_mul(ID_LEN),
                        found: dec.remaining(),
                    });
                }
                let ids = (0..count)
                    .map(|_| dec.u32().map(EventId))
                    .collect::<WireResult<Vec<_>>>()?;
                ListReply::Events(ids)
            }
        };
        dec.finish()?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_failed_show_has_no_dimensions() {
        let reply = ShowReply::from(StoreResult::<GridSnapshot>::Err(StoreError::EventNotFound(EventId(4))));
        assert_eq!(reply.encode(), Status::Failed.encode().to_vec());
    }

    #[test]
    fn test_show_staged_lengths() {
        let reply = ShowReply::Grid(GridSnapshot { rows: 2, cols: 3, seats: vec![0, 1, 1, 0, 2, 0] });
        let buf = reply.encode();
        let dims = &buf[STATUS_LEN..STATUS_LEN + ShowReply::DIMS_LEN];
        let seats_len = ShowReply::seats_len(dims).unwrap();
        assert_eq!(seats_len, 6 * ID_LEN);
        assert_eq!(buf.len(), STATUS_LEN + ShowReply::DIMS_LEN + seats_len);
        assert_eq!(ShowReply::decode(&buf).unwrap(), reply);
    }

    #[test]
    fn test_list_empty_vs_failed() {
        assert_eq!(ListReply::from(StoreResult::<Vec<EventId>>::Ok(vec![])), ListReply::Empty);
        assert_eq!(
            ListReply::from(StoreResult::<Vec<EventId>>::Err(StoreError::Uninitialized)),
            ListReply::Failed
        );
        assert_eq!(ListReply::Empty.encode(), 2i32.to_ne_bytes().to_vec());
        assert_eq!(ListReply::Failed.encode(), 1i32.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_list_layout() {
        let buf = ListReply::Events(vec![EventId(5), EventId(1)]).encode();
        assert_eq!(buf.len(), STATUS_LEN + WORD_LEN + 2 * ID_LEN);
        assert_eq!(ListReply::ids_len(&buf[STATUS_LEN..STATUS_LEN + WORD_LEN]).unwrap(), 8);
        assert_eq!(&buf[STATUS_LEN + WORD_LEN..STATUS_LEN + WORD_LEN + 4], &5u32.to_ne_bytes());
    }
}
