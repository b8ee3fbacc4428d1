// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io;

use ems_kernel::wire::OpCode;
use ems_kernel::WireError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Unexpected {} request on a session channel", .0.name())]
    UnexpectedRequest(OpCode),

    #[error("Session registry is full ({0} pending)")]
    RegistryFull(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl NodeError {
    /// The peer went away between requests rather than mid-message.
    pub fn is_disconnect(&self) -> bool {
        let kind = match self {
            NodeError::Io(e) => e.kind(),
            NodeError::Wire(WireError::IoError(e)) => e.kind(),
            _ => return false,
        };
        matches!(
            kind,
            io::ErrorKind::UnexpectedEof | io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
        )
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
