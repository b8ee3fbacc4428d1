// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ems_client::jobs::{parse_script, parse_seats, run_job, run_jobs, Job};
use ems_client::EmsClient;
use ems_kernel::types::EventId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ems")]
#[command(about = "Event management client: reserve seats through an ems-node server", long_about = None)]
struct Cli {
    /// Server pipe to connect through.
    #[arg(long, short, default_value = "/tmp/ems_server")]
    server: PathBuf,

    /// Private request pipe (defaults to a per-process path under /tmp).
    #[arg(long)]
    req: Option<PathBuf>,

    /// Private response pipe (defaults to a per-process path under /tmp).
    #[arg(long)]
    resp: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an event with an empty rows x cols grid
    Create { event: u32, rows: usize, cols: usize },
    /// Reserve seats of an event, all or nothing
    Reserve {
        event: u32,
        /// Seats as `[(r,c) (r,c) ...]`
        seats: String,
    },
    /// Print an event's seat grid
    Show { event: u32 },
    /// List event ids
    List,
    /// Run a job script over one session
    Run {
        jobs_file: PathBuf,

        /// Write SHOW and LIST output here instead of stdout.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
}

enum Plan {
    Single(Job),
    Script { jobs: Vec<Job>, out: Option<PathBuf> },
}

impl Commands {
    /// Parsed before connecting so bad input never occupies a worker.
    fn plan(self) -> anyhow::Result<Plan> {
        let job = match self {
            Commands::Create { event, rows, cols } => Job::Create { event: EventId(event), rows, cols },
            Commands::Reserve { event, seats } => Job::Reserve {
                event: EventId(event),
                seats: parse_seats(&seats).map_err(anyhow::Error::msg)?,
            },
            Commands::Show { event } => Job::Show { event: EventId(event) },
            Commands::List => Job::List,
            Commands::Run { jobs_file, out } => {
                let script = std::fs::read_to_string(&jobs_file)
                    .with_context(|| format!("failed to read {jobs_file:?}"))?;
                return Ok(Plan::Script { jobs: parse_script(&script)?, out });
            }
        };
        Ok(Plan::Single(job))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ems_client=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let pid = std::process::id();
    let req = cli.req.unwrap_or_else(|| PathBuf::from(format!("/tmp/ems_req_{pid}")));
    let resp = cli.resp.unwrap_or_else(|| PathBuf::from(format!("/tmp/ems_resp_{pid}")));
    let plan = cli.command.plan()?;

    let mut client = EmsClient::connect(&cli.server, &req, &resp)
        .await
        .with_context(|| format!("failed to connect through {:?}", cli.server))?;

    let mut stdout = io::stdout();
    let result = match plan {
        Plan::Single(job) => run_job(&mut client, &job, &mut stdout).await,
        Plan::Script { jobs, out: Some(path) } => match File::create(&path) {
            Ok(file) => run_jobs(&mut client, &jobs, &mut BufWriter::new(file)).await,
            Err(e) => Err(e.into()),
        },
        Plan::Script { jobs, out: None } => run_jobs(&mut client, &jobs, &mut stdout).await,
    };
    client.finish(result, &mut stdout).await.context("request failed")
}
