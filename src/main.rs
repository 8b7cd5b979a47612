//! MathSim CLI Entry Point
//!
//! Runs batch files, and doubles as the worker process for process pools.
//!
//! # Usage
//!
//! ```bash
//! # Run a batch
//! mathsim batch.yaml
//!
//! # Override pool settings from the file
//! mathsim batch.yaml --pool processes --parallel 8 --timeout 60
//!
//! # Serve one task over stdin/stdout (spawned by process pools)
//! mathsim --worker
//! ```

use std::env;
use std::io;
use std::process::ExitCode;
use std::time::Duration;

use colored::Colorize;
use log::{error, info};

use mathsim::config::{load_batch, BatchConfig, PoolFlavor};
use mathsim::execution::{serve, TaskOutcome, TaskRunner, TaskSpec, WORKER_FLAG};
use mathsim::{APP_NAME, VERSION};

/// Default batch file used when none is specified.
const DEFAULT_BATCH: &str = "batch.yaml";

/// Longest result prefix printed per task.
const MAX_PRINTED_VALUES: usize = 12;

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    batch_path: String,
    pool: Option<PoolFlavor>,
    parallelism: Option<usize>,
    timeout_secs: Option<u64>,
    verbose: bool,
    worker: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_path: DEFAULT_BATCH.to_string(),
            pool: None,
            parallelism: None,
            timeout_secs: None,
            verbose: false,
            worker: false,
        }
    }
}

impl Config {
    /// Applies command-line overrides on top of the batch file.
    fn apply_to(&self, batch: &mut BatchConfig) {
        if let Some(pool) = self.pool {
            batch.pool = pool;
        }
        if let Some(parallelism) = self.parallelism {
            batch.parallelism = Some(parallelism);
        }
        if let Some(timeout_secs) = self.timeout_secs {
            batch.timeout_secs = Some(timeout_secs);
        }
    }
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Resource-Guarded Concurrent Task Runner");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: mathsim [OPTIONS] <BATCH_FILE>");
    println!("       mathsim {}", WORKER_FLAG);
    println!();
    println!("Arguments:");
    println!("  <BATCH_FILE>        Path to batch YAML file (default: {})", DEFAULT_BATCH);
    println!();
    println!("Options:");
    println!("  --pool KIND         Worker pool: threads or processes");
    println!("  --parallel N        Maximum concurrent tasks");
    println!("  --timeout SECS      Batch timeout in seconds");
    println!("  --verbose           Enable debug logging");
    println!("  {:<19} Serve one task over stdin/stdout", WORKER_FLAG);
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  mathsim batch.yaml");
    println!("  mathsim batch.yaml --pool processes --parallel 8");
}

fn option_value<'a>(args: &'a [String], i: usize, option: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", option))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
    let mut positional_index = 0;
    let mut i = 1; // Skip program name

    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                config.verbose = true;
            }
            flag if flag == WORKER_FLAG => {
                config.worker = true;
            }
            "--pool" => {
                i += 1;
                config.pool = Some(match option_value(args, i, "--pool")? {
                    "threads" => PoolFlavor::Threads,
                    "processes" => PoolFlavor::Processes,
                    other => return Err(format!("Unknown pool kind: {}", other)),
                });
            }
            "--parallel" => {
                i += 1;
                let value = option_value(args, i, "--parallel")?;
                config.parallelism = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid parallel value: {}", value))?,
                );
            }
            "--timeout" => {
                i += 1;
                let value = option_value(args, i, "--timeout")?;
                config.timeout_secs = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid timeout value: {}", value))?,
                );
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                match positional_index {
                    0 => config.batch_path = arg.clone(),
                    _ => return Err(format!("Unexpected argument: {}", arg)),
                }
                positional_index += 1;
            }
        }
        i += 1;
    }

    Ok(config)
}

/// Formats a result, eliding the middle of long ones.
fn format_values(values: &[u64]) -> String {
    if values.len() <= MAX_PRINTED_VALUES {
        return format!("{:?}", values);
    }

    let head = &values[..MAX_PRINTED_VALUES / 2];
    let tail = &values[values.len() - 2..];
    format!(
        "{:?} ... {:?} ({} values)",
        head,
        tail,
        values.len()
    )
}

/// Prints one line per task, in batch file order.
fn print_outcome(task: &TaskSpec, outcome: &TaskOutcome) {
    let label = format!("{}({})", task.kind, task.input);

    match outcome {
        TaskOutcome::Success {
            result,
            steps,
            truncated,
            log,
        } => {
            let status = if *truncated {
                "TRUNCATED".yellow()
            } else {
                "OK".green()
            };
            println!(
                "  {:<10} {:<8} {:<20} {} in {} steps",
                status.bold(),
                task.id,
                label,
                format_values(result),
                steps
            );
            if !log.is_empty() {
                let usage = format!(
                    "peak memory {:.1}%, peak CPU {:.1}%, {} samples",
                    log.peak_memory_percent(),
                    log.peak_cpu_percent(),
                    log.len()
                );
                println!("  {:<10} {}", "", usage.dimmed());
            }
        }
        TaskOutcome::Failure { kind, message, .. } => {
            println!(
                "  {:<10} {:<8} {:<20} {} ({:?})",
                "FAILED".red().bold(),
                task.id,
                label,
                message,
                kind
            );
        }
    }
}

/// Serves one task request from stdin.
fn run_worker() -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(stdin.lock(), stdout.lock(), &TaskRunner::new())?;
    Ok(())
}

/// Loads the batch, runs it, and reports outcomes.
fn run_batch(config: &Config) -> Result<bool, Box<dyn std::error::Error>> {
    print_banner();

    let mut batch = load_batch(&config.batch_path).map_err(|e| {
        error!("Failed to load batch: {}", e);
        e
    })?;
    config.apply_to(&mut batch);

    info!(
        "Running {} tasks on {:?} pool (parallelism {}, timeout {})",
        batch.tasks.len(),
        batch.pool,
        batch.parallelism(),
        batch
            .timeout()
            .map(|t: Duration| format!("{:?}", t))
            .unwrap_or_else(|| "none".to_string())
    );

    let tasks = batch.tasks();
    let orchestrator = batch.orchestrator();
    let report = orchestrator.run_batch(tasks.clone(), |id, outcome| {
        let status = if outcome.is_success() { "done" } else { "failed" };
        info!("Task '{}' {}", id, status);
    })?;

    println!();
    println!("{}", "Results:".bold());
    for task in &tasks {
        if let Some(outcome) = report.outcomes.get(&task.id) {
            print_outcome(task, outcome);
        }
    }

    println!("{}", report.timeline.gantt_chart());

    let failed = report.outcomes.failures().count();
    println!(
        "{} succeeded, {} failed, total time {:.2?}",
        (report.outcomes.len() - failed).to_string().green(),
        failed.to_string().red(),
        report.timeline.elapsed()
    );

    Ok(failed == 0)
}

/// Main application entry point.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);

    if config.worker {
        run_worker()?;
        return Ok(true);
    }

    run_batch(&config)
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
