// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod config;
pub mod errors;
pub mod telemetry;
pub mod transport;
pub mod frame;
pub mod registry;
pub mod acceptor;
pub mod worker;
pub mod diagnostics;
pub mod server;
