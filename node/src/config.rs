// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::path::PathBuf;
use std::time::Duration;

use ems_kernel::config::{
    DEFAULT_MAX_GRID_CELLS, DEFAULT_MAX_RESERVATION_SEATS, DEFAULT_MAX_SESSIONS,
};

use crate::errors::{NodeError, NodeResult};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Well-known channel clients send connect requests to.
    pub server_pipe: PathBuf,
    /// Worker count; also the registry capacity and the highest session id.
    pub max_sessions: usize,
    /// Simulated latency of every event lookup.
    pub access_delay: Duration,
    pub max_reservation_seats: usize,
    pub max_grid_cells: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_pipe: PathBuf::from("/tmp/ems_server"),
            max_sessions: DEFAULT_MAX_SESSIONS,
            access_delay: Duration::ZERO,
            max_reservation_seats: DEFAULT_MAX_RESERVATION_SEATS,
            max_grid_cells: DEFAULT_MAX_GRID_CELLS,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> NodeResult<()> {
        if self.max_sessions == 0 {
            return Err(NodeError::Config("at least one worker is required".into()));
        }
        if u32::try_from(self.max_sessions).is_err() {
            return Err(NodeError::Config(format!(
                "{} workers cannot be numbered with 32-bit session ids",
                self.max_sessions
            )));
        }
        if self.max_grid_cells == 0 {
            return Err(NodeError::Config("max_grid_cells must be positive".into()));
        }
        Ok(())
    }
}
