//! TaskQueue - bounded-concurrency task runner
//!
//! CLI entry point for running work lists through the scheduler.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::info;

use taskqueue::cli::{Cli, Command, OutputFormat, get_log_path};
use taskqueue::config::Config;
use taskqueue::domain::Priority;
use taskqueue::scheduler::{BatchJob, SchedulerStatus, TaskOptions, TaskScheduler, percent_complete};
use taskqueue::shell::{ShellError, run_shell};
use taskqueue::worklist::read_work_items;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Write to log file, keep stdout for progress output
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

/// Overrides for `tq run` taken from the command line
struct RunArgs {
    limit: Option<usize>,
    retries: Option<u32>,
    priority: Option<Priority>,
    attempts: Option<u32>,
    delay_ms: Option<u64>,
    format: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "TaskQueue loaded config: max-concurrent={}, default-retries={}",
        config.scheduler.max_concurrent, config.scheduler.default_retries
    );

    // Dispatch command
    match cli.command {
        Some(Command::Run {
            file,
            limit,
            retries,
            priority,
            attempts,
            delay_ms,
            format,
        }) => {
            let args = RunArgs {
                limit,
                retries,
                priority,
                attempts,
                delay_ms,
                format,
            };
            cmd_run(config, &file, args).await
        }
        Some(Command::Config) => cmd_config(&config),
        Some(Command::Logs { follow, lines }) => cmd_logs(follow, lines),
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Run a work list through the scheduler
async fn cmd_run(mut config: Config, file: &Path, args: RunArgs) -> Result<()> {
    if let Some(limit) = args.limit {
        config.scheduler.max_concurrent = limit;
    }
    if let Some(retries) = args.retries {
        config.scheduler.default_retries = retries;
    }
    if let Some(priority) = args.priority {
        config.scheduler.default_priority = priority;
    }
    if let Some(attempts) = args.attempts {
        config.retry.max_attempts = attempts;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.retry.delay_ms = delay_ms;
    }
    config.validate()?;

    let items = read_work_items(file)?;
    if items.is_empty() {
        println!("No work items to process.");
        return Ok(());
    }

    let scheduler: TaskScheduler<String, ShellError> = TaskScheduler::new(config.scheduler.clone())?;

    let jobs: Vec<BatchJob<String, ShellError>> = items
        .iter()
        .map(|item| {
            let command = Arc::new(item.text.clone());
            let retry = config.retry.clone();
            let mut options = TaskOptions::new().id(format!("line-{}", item.line));
            if let Some(priority) = item.priority {
                options = options.priority(priority);
            }
            BatchJob::new(move || {
                let command = Arc::clone(&command);
                let retry = retry.clone();
                async move { retry.run(|| run_shell(&command)).await }
            })
            .with_options(options)
        })
        .collect();

    let total = jobs.len();
    info!(file = %file.display(), total, "Starting work list");
    if args.format == OutputFormat::Text {
        println!(
            "Processing {} item(s), up to {} at a time...",
            total, config.scheduler.max_concurrent
        );
    }

    let format = args.format.clone();
    let results = scheduler
        .run_batch(jobs, |percent, status| {
            if format == OutputFormat::Text {
                print_progress(percent, &status);
            }
        })
        .await?;

    let status = scheduler.status().await;
    let stats = scheduler.stats().await;
    let failed = results.iter().filter(|r| r.is_none()).count();

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<_> = items
                .iter()
                .zip(results.iter())
                .map(|(item, result)| {
                    serde_json::json!({
                        "line": item.line,
                        "command": item.text,
                        "ok": result.is_some(),
                        "output": result,
                    })
                })
                .collect();
            let json = serde_json::json!({
                "total": total,
                "percent": percent_complete(status.completed_tasks, total),
                "status": status,
                "stats": stats,
                "items": entries,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            let completed = format!("{} completed", status.completed_tasks);
            let failed_text = format!("{} failed", failed);
            println!(
                "Done: {}, {} ({} attempts, {} retries)",
                completed.green(),
                if failed > 0 { failed_text.red() } else { failed_text.normal() },
                stats.total_attempts,
                stats.total_retries
            );
        }
    }

    if failed > 0 {
        return Err(eyre!("{} of {} item(s) failed", failed, total));
    }
    Ok(())
}

fn print_progress(percent: f64, status: &SchedulerStatus) {
    println!(
        "progress: {:.1}% | completed: {} | failed: {} | queued: {} | running: {}",
        percent, status.completed_tasks, status.failed_tasks, status.queue_length, status.running_tasks
    );
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    print!("{}", yaml);
    Ok(())
}

/// Show logs
fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        // Use tail -f for following
        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;

        child.wait()?;
    } else {
        // Read last N lines
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
