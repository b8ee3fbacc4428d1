// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Client side of the event management service.

pub mod error;
pub mod client;
pub mod jobs;

pub use client::EmsClient;
pub use error::{ClientError, ClientResult};
