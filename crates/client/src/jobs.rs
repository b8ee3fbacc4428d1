// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Job scripts: one command per line, run in order over one session.
//!
//! ```text
//! # comment
//! CREATE 1 10 20
//! RESERVE 1 [(1,1) (1,2) (1,3)]
//! SHOW 1
//! LIST
//! WAIT 500
//! ```

use std::io::Write;
use std::str::FromStr;
use std::time::Duration;

use ems_kernel::types::{EventId, Seat};

use crate::client::EmsClient;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Create { event: EventId, rows: usize, cols: usize },
    Reserve { event: EventId, seats: Vec<Seat> },
    Show { event: EventId },
    List,
    Wait(Duration),
}

/// Parses a whole script. Blank lines and `#` comments are skipped; the
/// first malformed line aborts parsing.
pub fn parse_script(script: &str) -> ClientResult<Vec<Job>> {
    let mut jobs = Vec::new();
    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let job = parse_line(line).map_err(|reason| ClientError::Job { line: index + 1, reason })?;
        jobs.push(job);
    }
    Ok(jobs)
}

fn parse_line(line: &str) -> Result<Job, String> {
    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let mut args = rest.split_whitespace();

    let job = match command {
        "CREATE" => Job::Create {
            event: EventId(number(args.next(), "event id")?),
            rows: number(args.next(), "row count")?,
            cols: number(args.next(), "column count")?,
        },
        "RESERVE" => {
            let (event, seats) = rest.split_once(char::is_whitespace).ok_or("missing seat list")?;
            return Ok(Job::Reserve {
                event: EventId(number(Some(event), "event id")?),
                seats: parse_seats(seats)?,
            });
        }
        "SHOW" => Job::Show { event: EventId(number(args.next(), "event id")?) },
        "LIST" => Job::List,
        "WAIT" => Job::Wait(Duration::from_millis(number(args.next(), "delay")?)),
        other => return Err(format!("unknown command {other:?}")),
    };

    match args.next() {
        Some(extra) => Err(format!("unexpected argument {extra:?}")),
        None => Ok(job),
    }
}

fn number<T: FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
    let arg = arg.ok_or_else(|| format!("missing {what}"))?;
    arg.parse().map_err(|_| format!("invalid {what} {arg:?}"))
}

/// Parses `[(r,c) (r,c) ...]`.
pub fn parse_seats(text: &str) -> Result<Vec<Seat>, String> {
    let inner = text
        .trim()
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or("seat list must be enclosed in [ ]")?;

    let mut seats = Vec::new();
    let mut rest = inner.trim_start();
    while !rest.is_empty() {
        let body = rest.strip_prefix('(').ok_or("expected '(' before seat")?;
        let end = body.find(')').ok_or("unterminated seat")?;
        let (row, col) = body[..end].split_once(',').ok_or("seat must be (row,col)")?;
        seats.push(Seat::new(number(Some(row.trim()), "row")?, number(Some(col.trim()), "column")?));
        rest = body[end + 1..].trim_start();
    }
    Ok(seats)
}

/// Runs one job, writing `SHOW` and `LIST` output to `out`.
pub async fn run_job<W: Write>(client: &mut EmsClient, job: &Job, out: &mut W) -> ClientResult<()> {
    match job {
        Job::Create { event, rows, cols } => client.create(*event, *rows, *cols).await,
        Job::Reserve { event, seats } => client.reserve(*event, seats).await,
        Job::Show { event } => client.show_to(*event, out).await,
        Job::List => client.list_to(out).await,
        Job::Wait(delay) => {
            tokio::time::sleep(*delay).await;
            Ok(())
        }
    }
}

/// Runs `jobs` in order over `client`.
///
/// A request the server rejects is reported and the script carries on.
/// Channel failures end the run.
pub async fn run_jobs<W: Write>(client: &mut EmsClient, jobs: &[Job], out: &mut W) -> ClientResult<()> {
    for job in jobs {
        match run_job(client, job, out).await {
            Err(e) if e.is_rejection() => tracing::warn!("{:?} failed: {}", job, e),
            other => other?,
        }
    }
    out.flush()?;
    Ok(())
}
