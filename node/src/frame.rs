// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Pulls whole requests off a byte stream.
//!
//! A request is read in three steps: the op byte, the op's fixed header,
//! then the variable trailer the header announces. The assembled buffer is
//! handed to the kernel codec.

use ems_kernel::wire::{ConnectRequest, OpCode, Request, OP_LEN};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::{NodeError, NodeResult};

/// Reads the rest of a message whose op byte has already been consumed.
pub async fn read_body<R>(reader: &mut R, op: OpCode, max_seats: usize) -> NodeResult<Request>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let header_end = OP_LEN + op.header_len();
    let mut buf = vec![0u8; header_end];
    buf[0] = op as u8;
    reader.read_exact(&mut buf[OP_LEN..]).await?;

    let trailer = Request::trailer_len(op, &buf[OP_LEN..], max_seats)?;
    if trailer > 0 {
        buf.resize(header_end + trailer, 0);
        reader.read_exact(&mut buf[header_end..]).await?;
    }
    Ok(Request::decode(&buf)?)
}

/// Reads one request from a session's request channel. An unknown op byte
/// is an error: sessions do not resynchronize.
pub async fn read_request<R>(reader: &mut R, max_seats: usize) -> NodeResult<Request>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let op = OpCode::try_from(reader.read_u8().await?)?;
    read_body(reader, op, max_seats).await
}

/// Reads the channel names of a connect request whose op byte has been
/// consumed.
pub async fn read_connect<R>(reader: &mut R) -> NodeResult<ConnectRequest>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match read_body(reader, OpCode::Connect, 0).await? {
        Request::Connect(connect) => Ok(connect),
        other => Err(NodeError::UnexpectedRequest(other.op())),
    }
}

/// Writes one complete reply and flushes it to the channel.
pub async fn write_reply<W>(writer: &mut W, reply: &[u8]) -> NodeResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(reply).await?;
    writer.flush().await?;
    Ok(())
}
