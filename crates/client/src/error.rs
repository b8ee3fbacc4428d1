// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::io;
use std::path::PathBuf;

use ems_kernel::wire::OpCode;
use ems_kernel::WireError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Server rejected {} request", .0.name())]
    Rejected(OpCode),

    #[error("Channel path {0:?} is not valid UTF-8")]
    InvalidChannelPath(PathBuf),

    #[error("Job script line {line}: {reason}")]
    Job { line: usize, reason: String },
}

impl ClientError {
    /// The server answered with a failure status; the session is still
    /// usable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
