//! SeatSniper - course seat acquisition scheduler
//!
//! CLI entry point for managing targets and running the scheduler.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info, warn};

use seatsniper::cli::{Cli, Command, OutputFormat, RunArgs, generate_after_help};
use seatsniper::config::Config;
use seatsniper::events::create_event_bus;
use seatsniper::interrupt::{InterruptController, sleep_or_cancel};
use seatsniper::report::{print_statuses, print_summary, print_targets, spawn_reporter};
use seatsniper::targets::{load_target_file, merge, sanitize};
use seatsniper::{HttpAcquisitionClient, Scheduler, TargetStatus, TargetStore};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("seatsniper")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("seatsniper.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(storage = %config.storage.dir.display(), "SeatSniper loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Add { file, append } => cmd_add(&config, &file, append),
        Command::Targets { format } => cmd_targets(&config, format),
        Command::Status { format } => cmd_status(&config, format),
        Command::Clear => cmd_clear(&config),
        Command::Run(args) => cmd_run(&config, &args).await,
    }
}

fn open_store(config: &Config) -> Result<TargetStore> {
    TargetStore::open(&config.storage.dir)
        .context(format!("Failed to open storage at {}", config.storage.dir.display()))
}

fn cmd_add(config: &Config, file: &std::path::Path, append: bool) -> Result<()> {
    debug!(file = %file.display(), append, "cmd_add: called");
    let store = open_store(config)?;

    let (incoming, dropped) = sanitize(load_target_file(file)?);
    if dropped > 0 {
        println!("{} Skipped {} target(s) without a course or section id", "⚠️".yellow(), dropped);
    }
    if incoming.is_empty() {
        return Err(eyre!("No valid targets in {}", file.display()));
    }

    let added = incoming.len();
    let targets = if append {
        merge(store.load_targets(), incoming)
    } else {
        incoming
    };
    store.save_targets(&targets)?;

    println!(
        "{} Saved {} target(s) ({} from {})",
        "✅".green(),
        targets.len(),
        added,
        file.display()
    );
    Ok(())
}

fn cmd_targets(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_targets: called");
    let store = open_store(config)?;
    print_targets(&store.load_targets(), &format)
}

fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(?format, "cmd_status: called");
    let store = open_store(config)?;
    print_statuses(&store.load_targets(), &store.get_statuses(), &format)
}

fn cmd_clear(config: &Config) -> Result<()> {
    debug!("cmd_clear: called");
    let store = open_store(config)?;
    store.clear_statuses()?;
    store.clear_targets()?;
    println!("{} Cleared targets and statuses", "✅".green());
    Ok(())
}

async fn cmd_run(config: &Config, args: &RunArgs) -> Result<()> {
    debug!(?args, "cmd_run: called");
    let store = open_store(config)?;

    let targets = store.load_targets();
    if targets.is_empty() {
        return Err(eyre!("No targets saved. Use `sn add <FILE>` first."));
    }

    // Fatal preconditions are reported before anything starts
    let client = HttpAcquisitionClient::from_config(&config.client).context("Cannot reach the selection system")?;

    let scheduler_config = args.apply(config.scheduler.clone());

    let acquired: Vec<String> = if args.resume {
        let statuses = store.get_statuses();
        targets
            .iter()
            .filter(|t| {
                statuses
                    .get(&t.resource_id)
                    .is_some_and(|r| r.status == TargetStatus::Success)
            })
            .map(|t| t.resource_id.clone())
            .collect()
    } else {
        Vec::new()
    };

    let interrupt = InterruptController::new();
    let listener = interrupt.listen_for_signals();
    let bus = create_event_bus();

    let mut scheduler = Scheduler::new(scheduler_config, Arc::new(client), interrupt.token())
        .with_store(store)
        .with_events(bus.clone())
        .with_acquired(acquired.clone());

    let effective = scheduler.config();
    println!("{}", "========== SeatSniper ==========".bold());
    println!("Targets:      {}", targets.len());
    if !acquired.is_empty() {
        println!("Already held: {}", acquired.len());
    }
    println!(
        "Interval:     {}-{}s",
        effective.interval_min, effective.interval_max
    );
    if effective.max_attempts == 0 {
        println!("Max attempts: unlimited");
    } else {
        println!("Max attempts: {} per course", effective.max_attempts);
    }
    println!(
        "Order:        {}",
        if effective.randomize { "random" } else { "in list order" }
    );
    if let Some(limit) = effective.max_duration() {
        println!("Time limit:   {}s", limit.as_secs());
    }
    println!("\nPress Ctrl+C to stop at any time");

    countdown(args.countdown, &interrupt).await;

    let reporter = spawn_reporter(&bus);
    let stats = scheduler.run(targets).await;
    if let Err(e) = reporter.await {
        warn!(error = %e, "Reporter task failed");
    }

    // Ends the signal listener
    interrupt.interrupt();
    if let Err(e) = listener.await {
        warn!(error = %e, "Signal listener task failed");
    }

    println!();
    print_summary(&stats, &args.format)
}

/// Count down before the first attempt; returns early when interrupted
async fn countdown(seconds: u64, interrupt: &InterruptController) {
    let token = interrupt.token();
    for remaining in (1..=seconds).rev() {
        print!("\rStarting in {}... ", remaining);
        if let Err(e) = std::io::stdout().flush() {
            debug!(error = %e, "countdown: stdout flush failed");
        }
        if !sleep_or_cancel(Duration::from_secs(1), &token).await {
            println!("\rInterrupted before start   ");
            return;
        }
    }
    if seconds > 0 {
        println!("\rStarting now!            ");
    }
}
