//! Terminal output: per-attempt status lines and run summaries

use chrono::Local;
use colored::Colorize;
use eyre::Result;
use targetstore::{StatusMap, TargetResource, TargetStatus};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cli::OutputFormat;
use crate::events::{EventBus, RunEvent};
use crate::scheduler::{CompletionReason, RunStatistics};

/// Timestamped status line
fn status_line(icon: &str, message: &str) -> String {
    format!("[{}] {} {}", Local::now().format("%Y-%m-%d %H:%M:%S"), icon, message)
}

/// Status line for an event, or `None` for events that print nothing
pub fn render_event(event: &RunEvent) -> Option<String> {
    match event {
        RunEvent::RunStarted {
            total_targets, pending, ..
        } => Some(status_line(
            "ℹ️",
            &format!("Run started: {} targets, {} pending", total_targets, pending),
        )),
        RunEvent::RoundStarted { round, pending, .. } => Some(status_line(
            "ℹ️",
            &format!("Round {} ({} pending)", round, pending).dimmed().to_string(),
        )),
        RunEvent::AttemptStarted {
            resource_id,
            name,
            attempt,
            ..
        } => Some(status_line(
            "🔄",
            &format!("Attempt #{} for {} ({})", attempt, name, resource_id),
        )),
        RunEvent::AttemptFinished {
            resource_id,
            name,
            outcome,
            ..
        } => {
            let line = if outcome.is_acquired() {
                status_line(
                    "✅",
                    &format!("Acquired {} ({})", name, resource_id).green().bold().to_string(),
                )
            } else {
                status_line(
                    "❌",
                    &format!("{} ({}): {}", name, resource_id, outcome).red().to_string(),
                )
            };
            Some(line)
        }
        RunEvent::ResourceExhausted {
            resource_id,
            name,
            attempts,
            ..
        } => Some(status_line(
            "⚠️",
            &format!("Giving up on {} ({}) after {} attempts", name, resource_id, attempts)
                .yellow()
                .to_string(),
        )),
        RunEvent::Waiting {
            resource_id: None,
            delay_ms,
            ..
        } => Some(status_line(
            "ℹ️",
            &format!(
                "Round finished, next round in {:.1}s",
                *delay_ms as f64 / 1000.0
            ),
        )),
        RunEvent::Waiting { .. } => None,
        RunEvent::RunFinished { stats, .. } => {
            let icon = if stats.successful > 0 { "✅" } else { "ℹ️" };
            Some(status_line(
                icon,
                &format!(
                    "Run finished ({}): {}/{} acquired, {} attempts",
                    stats.reason.map(|r| r.to_string()).unwrap_or_default(),
                    stats.successful,
                    stats.total_targets,
                    stats.attempts
                ),
            ))
        }
    }
}

/// Print a status line for every event until the run finishes
pub fn spawn_reporter(bus: &EventBus) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(line) = render_event(&event) {
                        println!("{}", line);
                    }
                    if matches!(event, RunEvent::RunFinished { .. }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Reporter lagged behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("spawn_reporter: done");
    })
}

/// Human readable run summary
pub fn render_summary(stats: &RunStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "Run Summary".bold()));
    out.push_str("-----------\n");
    out.push_str(&format!("Run:        {}\n", stats.run_id));
    let reason = match stats.reason {
        Some(CompletionReason::Completed) => "completed".green().to_string(),
        Some(reason) => reason.to_string().yellow().to_string(),
        None => "unfinished".to_string(),
    };
    out.push_str(&format!("Result:     {}\n", reason));
    out.push_str(&format!("Attempts:   {}\n", stats.attempts));
    out.push_str(&format!("Acquired:   {}/{}\n", stats.successful, stats.total_targets));
    out.push_str(&format!("Duration:   {:.1}s\n", stats.duration_secs));

    if !stats.successful_courses.is_empty() {
        out.push_str("\nAcquired courses:\n");
        for (id, name) in &stats.successful_courses {
            out.push_str(&format!("  - {} ({})\n", name, id));
        }
    }
    if !stats.exhausted.is_empty() {
        out.push_str("\nGave up on:\n");
        for id in &stats.exhausted {
            out.push_str(&format!("  - {} ({} attempts)\n", id, stats.attempts_for(id)));
        }
    }
    out
}

pub fn print_summary(stats: &RunStatistics, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(stats)?),
        OutputFormat::Text => print!("{}", render_summary(stats)),
    }
    Ok(())
}

pub fn print_targets(targets: &[TargetResource], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(targets)?),
        OutputFormat::Text => {
            if targets.is_empty() {
                println!("No targets saved. Use `sn add <FILE>` first.");
                return Ok(());
            }
            println!("{:<16} {:<32} {:<24} {}", "COURSE", "NAME", "SECTION", "SECTION NAME");
            for t in targets {
                println!(
                    "{:<16} {:<32} {:<24} {}",
                    t.resource_id,
                    t.name,
                    t.section_id,
                    t.section_name.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

/// Render the status map, with target names where known
pub fn render_statuses(targets: &[TargetResource], statuses: &StatusMap) -> String {
    if statuses.is_empty() {
        return "No status recorded yet.\n".to_string();
    }
    let mut out = String::new();
    for (id, record) in statuses {
        let name = targets
            .iter()
            .find(|t| &t.resource_id == id)
            .map(|t| t.display_name())
            .unwrap_or(id.as_str());
        let status = match record.status {
            TargetStatus::Success => record.status.to_string().green(),
            TargetStatus::Failed => record.status.to_string().red(),
            TargetStatus::Waiting => record.status.to_string().normal(),
        };
        out.push_str(&format!(
            "{} {} ({}): {} - {}\n",
            record.updated_at.format(targetstore::TIMESTAMP_FORMAT),
            name,
            id,
            status,
            record.message
        ));
    }
    out
}

pub fn print_statuses(targets: &[TargetResource], statuses: &StatusMap, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(statuses)?),
        OutputFormat::Text => print!("{}", render_statuses(targets, statuses)),
    }
    Ok(())
}
