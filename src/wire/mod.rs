// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Fixed-layout binary messages exchanged over session channels.
//!
//! Every field has an explicit width: op codes are one byte, ids and
//! status codes four, counts and dimensions one machine word. Integers use
//! the host's native byte order, so client and server must share a
//! platform family.

use std::io::{Cursor, Read};

use byteorder::{ByteOrder, NativeEndian, ReadBytesExt};

use crate::config::PIPE_NAME_LEN;
use crate::error::{StoreResult, WireError, WireResult};

pub mod reply;
pub mod request;

pub use reply::{ConnectReply, ListReply, ShowReply};
pub use request::{ConnectRequest, Request};

pub const OP_LEN: usize = 1;
pub const ID_LEN: usize = 4;
pub const STATUS_LEN: usize = 4;
pub const WORD_LEN: usize = core::mem::size_of::<usize>();

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Connect = b'1',
    Quit = b'2',
    Create = b'3',
    Reserve = b'4',
    Show = b'5',
    List = b'6',
}

impl OpCode {
    /// Bytes following the op byte, excluding the variable seat lists of a
    /// reserve request.
    pub const fn header_len(self) -> usize {
        match self {
            OpCode::Connect => 2 * PIPE_NAME_LEN,
            OpCode::Quit | OpCode::List => ID_LEN,
            OpCode::Create => 2 * ID_LEN + 2 * WORD_LEN,
            OpCode::Reserve => 2 * ID_LEN + WORD_LEN,
            OpCode::Show => 2 * ID_LEN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Connect => "connect",
            OpCode::Quit => "quit",
            OpCode::Create => "create",
            OpCode::Reserve => "reserve",
            OpCode::Show => "show",
            OpCode::List => "list",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = WireError;

    fn try_from(byte: u8) -> WireResult<Self> {
        match byte {
            b'1' => Ok(OpCode::Connect),
            b'2' => Ok(OpCode::Quit),
            b'3' => Ok(OpCode::Create),
            b'4' => Ok(OpCode::Reserve),
            b'5' => Ok(OpCode::Show),
            b'6' => Ok(OpCode::List),
            other => Err(WireError::InvalidOpCode(other)),
        }
    }
}

/// Reply status. `Empty` is only ever produced by `list`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    Failed = 1,
    Empty = 2,
}

impl Status {
    pub fn of<T>(result: &StoreResult<T>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(_) => Status::Failed,
        }
    }

    pub fn encode(self) -> [u8; STATUS_LEN] {
        let mut buf = [0u8; STATUS_LEN];
        NativeEndian::write_i32(&mut buf, self as i32);
        buf
    }

    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        let mut decoder = Decoder::new(buf);
        let status = Status::try_from(decoder.i32()?)?;
        decoder.finish()?;
        Ok(status)
    }
}

impl TryFrom<i32> for Status {
    type Error = WireError;

    fn try_from(code: i32) -> WireResult<Self> {
        match code {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Failed),
            2 => Ok(Status::Empty),
            other => Err(WireError::InvalidStatus(other)),
        }
    }
}

/// Appends fixed-width fields to a message buffer.
pub(crate) struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub(crate) fn u8(&mut self, val: u8) -> &mut Self {
        self.buf.push(val);
        self
    }

    pub(crate) fn u32(&mut self, val: u32) -> &mut Self {
        let mut field = [0u8; ID_LEN];
        NativeEndian::write_u32(&mut field, val);
        self.buf.extend_from_slice(&field);
        self
    }

    pub(crate) fn status(&mut self, status: Status) -> &mut Self {
        self.buf.extend_from_slice(&status.encode());
        self
    }

    pub(crate) fn word(&mut self, val: usize) -> &mut Self {
        let mut field = [0u8; 8];
        NativeEndian::write_uint(&mut field[..WORD_LEN], val as u64, WORD_LEN);
        self.buf.extend_from_slice(&field[..WORD_LEN]);
        self
    }

    /// NUL-padded channel name.
    pub(crate) fn name(&mut self, name: &str) -> WireResult<&mut Self> {
        let bytes = name.as_bytes();
        if bytes.len() > PIPE_NAME_LEN {
            return Err(WireError::NameTooLong(bytes.len()));
        }
        let mut field = [0u8; PIPE_NAME_LEN];
        field[..bytes.len()].copy_from_slice(bytes);
        self.buf.extend_from_slice(&field);
        Ok(self)
    }

    pub(crate) fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// Reads fixed-width fields off a complete message buffer.
pub(crate) struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { cursor: Cursor::new(buf) }
    }

    pub(crate) fn u8(&mut self) -> WireResult<u8> {
        Ok(self.cursor.read_u8()?)
    }

    pub(crate) fn u32(&mut self) -> WireResult<u32> {
        Ok(self.cursor.read_u32::<NativeEndian>()?)
    }

    pub(crate) fn i32(&mut self) -> WireResult<i32> {
        Ok(self.cursor.read_i32::<NativeEndian>()?)
    }

    pub(crate) fn word(&mut self) -> WireResult<usize> {
        // A word-sized field always fits back into usize.
        Ok(self.cursor.read_uint::<NativeEndian>(WORD_LEN)? as usize)
    }

    pub(crate) fn name(&mut self) -> WireResult<String> {
        let mut field = [0u8; PIPE_NAME_LEN];
        self.cursor.read_exact(&mut field)?;
        let end = field.iter().position(|b| *b == 0).unwrap_or(PIPE_NAME_LEN);
        String::from_utf8(field[..end].to_vec()).map_err(|_| WireError::NameEncoding)
    }

    pub(crate) fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    /// Fails unless the whole buffer was consumed.
    pub(crate) fn finish(self) -> WireResult<()> {
        let len = self.cursor.get_ref().len();
        let pos = self.cursor.position() as usize;
        if pos != len {
            return Err(WireError::InvalidPayloadLength { expected: pos, found: len });
        }
        Ok(())
    }
}

/// Decodes a single native-endian word, as found in the fixed part of a
/// reply.
pub fn decode_word(buf: &[u8]) -> WireResult<usize> {
    let mut decoder = Decoder::new(buf);
    let word = decoder.word()?;
    decoder.finish()?;
    Ok(word)
}
