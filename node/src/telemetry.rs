// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize telemetry (logs + metric descriptions)
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ems_node=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // No exporter is installed; a recorder can be attached by the embedding process.
    metrics::describe_counter!("ems_sessions_total", "Sessions served to completion or failure");
    metrics::describe_counter!("ems_requests_total", "Requests handled, by op");
    metrics::describe_counter!("ems_request_failures_total", "Requests answered with a failure status, by op");
    metrics::describe_counter!("ems_reservations_total", "Successful reservation calls");
    metrics::describe_counter!("ems_discarded_bytes_total", "Bytes skipped on the server channel while resynchronizing");
}
