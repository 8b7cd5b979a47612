//! Worker Process Protocol
//!
//! A process-pool worker is this crate's binary started with
//! [`WORKER_FLAG`]. It reads a single [`WorkerRequest`] JSON line from
//! stdin, runs the task, writes the [`TaskOutcome`] as one JSON line to
//! stdout and exits.

use std::env;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use log::info;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::WorkerPoolError;

use super::outcome::TaskOutcome;
use super::runner::TaskRunner;
use super::task::TaskSpec;

/// Command line flag that switches the binary into worker mode.
pub const WORKER_FLAG: &str = "--worker";

/// Environment variable overriding the worker binary path.
pub const WORKER_BINARY_ENV: &str = "MATHSIM_WORKER_BIN";

/// Binary spawned by process pools unless configured otherwise.
pub static WORKER_BINARY: Lazy<PathBuf> = Lazy::new(|| {
    env::var_os(WORKER_BINARY_ENV)
        .map(PathBuf::from)
        .or_else(|| env::current_exe().ok())
        .unwrap_or_else(|| PathBuf::from("mathsim"))
});

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkerRequest {
    pub task: TaskSpec,
}

/// Serves one request from `input`, writing the outcome to `output`.
pub fn serve<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    runner: &TaskRunner,
) -> Result<TaskOutcome, WorkerPoolError> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(WorkerPoolError::Protocol(
            "no task request received".to_string(),
        ));
    }

    let request: WorkerRequest = serde_json::from_str(line.trim())?;
    info!(
        "Worker {} running task '{}'",
        std::process::id(),
        request.task.id
    );

    let outcome = runner.run(&request.task);

    serde_json::to_writer(&mut output, &outcome)?;
    output.write_all(b"\n")?;
    output.flush()?;

    Ok(outcome)
}
