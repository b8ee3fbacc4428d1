// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Client to server messages.

use crate::error::{WireError, WireResult};
use crate::types::{EventId, Seat, SessionId};
use crate::wire::{Decoder, Encoder, OpCode, ID_LEN, OP_LEN, WORD_LEN};

/// Channel names a not-yet-assigned client sends on the server channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub request_channel: String,
    pub response_channel: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Connect(ConnectRequest),
    Quit {
        session: SessionId,
    },
    Create {
        session: SessionId,
        event: EventId,
        rows: usize,
        cols: usize,
    },
    Reserve {
        session: SessionId,
        event: EventId,
        seats: Vec<Seat>,
    },
    Show {
        session: SessionId,
        event: EventId,
    },
    List {
        session: SessionId,
    },
}

impl Request {
    pub fn op(&self) -> OpCode {
        match self {
            Request::Connect(_) => OpCode::Connect,
            Request::Quit { .. } => OpCode::Quit,
            Request::Create { .. } => OpCode::Create,
            Request::Reserve { .. } => OpCode::Reserve,
            Request::Show { .. } => OpCode::Show,
            Request::List { .. } => OpCode::List,
        }
    }

    /// Session the client claims to speak for. Connect predates a session.
    pub fn session(&self) -> Option<SessionId> {
        match self {
            Request::Connect(_) => None,
            Request::Quit { session }
            | Request::Create { session, .. }
            | Request::Reserve { session, .. }
            | Request::Show { session, .. }
            | Request::List { session } => Some(*session),
        }
    }

    /// Encodes the full message, op byte included.
    pub fn encode(&self) -> WireResult<Vec<u8>> {
        let op = self.op();
        let trailer = match self {
            Request::Reserve { seats, .. } => 2 * seats.len() * WORD_LEN,
            _ => 0,
        };
        let mut enc = Encoder::with_capacity(OP_LEN + op.header_len() + trailer);
        enc.u8(op as u8);

        match self {
            Request::Connect(connect) => {
                enc.name(&connect.request_channel)?
                    .name(&connect.response_channel)?;
            }
            Request::Quit { session } | Request::List { session } => {
                enc.u32(session.0);
            }
            Request::Create { session, event, rows, cols } => {
                enc.u32(session.0).u32(event.0).word(*rows).word(*cols);
            }
            Request::Reserve { session, event, seats } => {
                enc.u32(session.0).u32(event.0).word(seats.len());
                for seat in seats {
                    enc.word(seat.row);
                }
                for seat in seats {
                    enc.word(seat.col);
                }
            }
            Request::Show { session, event } => {
                enc.u32(session.0).u32(event.0);
            }
        }
        Ok(enc.finish())
    }

    /// Length of the variable part that follows the fixed header of `op`.
    ///
    /// `header` is the `op.header_len()` bytes read after the op byte. Only
    /// reserve has a trailer: one word per row and one per column.
    pub fn trailer_len(op: OpCode, header: &[u8], max_seats: usize) -> WireResult<usize> {
        if op != OpCode::Reserve {
            return Ok(0);
        }
        if header.len() != op.header_len() {
            return Err(WireError::InvalidPayloadLength {
                expected: op.header_len(),
                found: header.len(),
            });
        }
        let count = crate::wire::decode_word(&header[2 * ID_LEN..])?;
        if count > max_seats {
            return Err(WireError::TooManySeats { count, limit: max_seats });
        }
        Ok(2 * count * WORD_LEN)
    }

    /// Decodes a full message, op byte included. The buffer must hold
    /// exactly one message.
    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        let mut dec = Decoder::new(buf);
        let op = OpCode::try_from(dec.u8()?)?;

        let request = match op {
            OpCode::Connect => Request::Connect(ConnectRequest {
                request_channel: dec.name()?,
                response_channel: dec.name()?,
            }),
            OpCode::Quit => Request::Quit { session: SessionId(dec.u32()?) },
            OpCode::Create => Request::Create {
                session: SessionId(dec.u32()?),
                event: EventId(dec.u32()?),
                rows: dec.word()?,
                cols: dec.word()?,
            },
            OpCode::Reserve => {
                let session = SessionId(dec.u32()?);
                let event = EventId(dec.u32()?);
                let count = dec.word()?;

                // Check the claimed count against the bytes actually present
                // before allocating for it.
                let expected = count
                    .checked_mul(2 * WORD_LEN)
                    .ok_or(WireError::InvalidPayloadLength {
                        expected: usize::MAX,
                        found: dec.remaining(),
                    })?;
                if expected != dec.remaining() {
                    return Err(WireError::InvalidPayloadLength {
                        expected,
                        found: dec.remaining(),
                    });
                }

                let rows = (0..count).map(|_| dec.word()).collect::<WireResult<Vec<_>>>()?;
                let cols = (0..count).map(|_| dec.word()).collect::<WireResult<Vec<_>>>()?;
                let seats = rows.into_iter().zip(cols).map(Seat::from).collect();
                Request::Reserve { session, event, seats }
            }
            OpCode::Show => Request::Show {
                session: SessionId(dec.u32()?),
                event: EventId(dec.u32()?),
            },
            OpCode::List => Request::List { session: SessionId(dec.u32()?) },
        };

        dec.finish()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PIPE_NAME_LEN;

    #[test]
    fn test_create_layout() {
        let buf = Request::Create {
            session: SessionId(3),
            event: EventId(9),
            rows: 2,
            cols: 5,
        }
        .encode()
        .unwrap();

        assert_eq!(buf.len(), OP_LEN + OpCode::Create.header_len());
        assert_eq!(buf[0], b'3');
        assert_eq!(&buf[1..5], &3u32.to_ne_bytes());
        assert_eq!(&buf[5..9], &9u32.to_ne_bytes());
        assert_eq!(&buf[9..9 + WORD_LEN], &2usize.to_ne_bytes());
    }

    #[test]
    fn test_reserve_rows_precede_cols() {
        let req = Request::Reserve {
            session: SessionId(1),
            event: EventId(1),
            seats: vec![Seat::new(1, 4), Seat::new(2, 5)],
        };
        let buf = req.encode().unwrap();
        let header = &buf[OP_LEN..OP_LEN + OpCode::Reserve.header_len()];
        assert_eq!(Request::trailer_len(OpCode::Reserve, header, 16).unwrap(), 4 * WORD_LEN);

        let trailer = &buf[OP_LEN + OpCode::Reserve.header_len()..];
        let words: Vec<usize> = trailer
            .chunks(WORD_LEN)
            .map(|w| crate::wire::decode_word(w).unwrap())
            .collect();
        assert_eq!(words, vec![1, 2, 4, 5]);
        assert_eq!(Request::decode(&buf).unwrap(), req);
    }

    #[test]
    fn test_seat_limit() {
        let req = Request::Reserve {
            session: SessionId(1),
            event: EventId(1),
            seats: vec![Seat::new(1, 1); 3],
        };
        let buf = req.encode().unwrap();
        let header = &buf[OP_LEN..OP_LEN + OpCode::Reserve.header_len()];
        assert!(matches!(
            Request::trailer_len(OpCode::Reserve, header, 2),
            Err(WireError::TooManySeats { count: 3, limit: 2 })
        ));
    }

    #[test]
    fn test_reserve_with_lying_count_is_rejected() {
        let mut buf = Request::Reserve {
            session: SessionId(1),
            event: EventId(1),
            seats: vec![Seat::new(1, 1)],
        }
        .encode()
        .unwrap();
        buf.truncate(buf.len() - WORD_LEN);
        assert!(matches!(
            Request::decode(&buf),
            Err(WireError::InvalidPayloadLength { .. })
        ));
    }

    #[test]
    fn test_connect_is_81_bytes() {
        let buf = Request::Connect(ConnectRequest {
            request_channel: "/tmp/req".into(),
            response_channel: "/tmp/resp".into(),
        })
        .encode()
        .unwrap();
        assert_eq!(buf.len(), 1 + 2 * PIPE_NAME_LEN);
        assert_eq!(Request::trailer_len(OpCode::Connect, &buf[1..], 0).unwrap(), 0);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut buf = Request::List { session: SessionId(2) }.encode().unwrap();
        buf.push(0);
        assert!(matches!(
            Request::decode(&buf),
            Err(WireError::InvalidPayloadLength { .. })
        ));
    }
}
