//! deadline-sync CLI
//!
//! Scans a mailbox export for deadlines and mirrors them into a calendar
//! file, with commands to inspect extraction and the processed-email
//! tracker.

#![allow(clippy::print_stdout)]

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use application::{
    DeadlineExtractor, DeadlineSyncService, Extraction, ProcessedEmailTracker, ScanResult,
    ScanSummary,
    ports::{ClockPort, FixedClock, ProcessedEmailStore, SystemClock},
};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use domain::{Deadline, EmailMessage, ProcessedEmailRecord, UserId};
use infrastructure::{
    AppConfig, JsonCalendarAdapter, JsonMailboxAdapter, LoggingConfig, SqliteProcessedEmailStore,
    create_pool, init_tracing,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// deadline-sync CLI
#[derive(Parser)]
#[command(name = "deadline-sync")]
#[command(author, version, about = "Extract email deadlines into a calendar", long_about = None)]
struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file (default: ./config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a mailbox and create calendar events for new deadlines
    ///
    /// Example: deadline-sync scan --user me@example.com --mailbox inbox.json --calendar calendar.json
    Scan {
        /// Mailbox owner
        #[arg(short, long, env = "DEADLINE_SYNC_USER")]
        user: UserId,

        /// JSON mailbox export
        #[arg(short, long)]
        mailbox: PathBuf,

        /// JSON calendar file (created if missing)
        #[arg(long)]
        calendar: PathBuf,

        /// Maximum messages to scan (default from config)
        #[arg(long)]
        max_emails: Option<usize>,

        /// Look-back window in days (default from config)
        #[arg(long)]
        days_back: Option<u32>,

        /// Only scan messages containing this text
        #[arg(short, long, default_value = "")]
        query: String,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        now: Option<NaiveDate>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show how one email's text is turned into a deadline
    Extract {
        /// Email subject
        #[arg(short, long)]
        subject: String,

        /// Email body
        #[arg(short, long, default_value = "")]
        body: String,

        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long)]
        now: Option<NaiveDate>,

        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// List processed-email records of a user
    Records {
        /// Mailbox owner
        #[arg(short, long, env = "DEADLINE_SYNC_USER")]
        user: UserId,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Forget every processed email of a user so the next scan starts over
    Reset {
        /// Mailbox owner
        #[arg(short, long, env = "DEADLINE_SYNC_USER")]
        user: UserId,
    },
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

fn clock_for(now: Option<NaiveDate>) -> Arc<dyn ClockPort> {
    match now {
        Some(date) => Arc::new(FixedClock::at_date(date)),
        None => Arc::new(SystemClock),
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ProcessedEmailStore>> {
    let pool = create_pool(&config.database)
        .with_context(|| format!("opening database {}", config.database.path))?;
    Ok(Arc::new(
        SqliteProcessedEmailStore::new(Arc::new(pool))
            .with_pending_lease(config.database.pending_lease()),
    ))
}

fn open_tracker(config: &AppConfig) -> anyhow::Result<ProcessedEmailTracker> {
    Ok(ProcessedEmailTracker::new(open_store(config)?))
}

fn format_summary(summary: &ScanSummary) -> String {
    let mut out = format!(
        "Scanned {}: {} new, {} without deadline, {} expired, {} already processed, {} already on calendar",
        summary.scanned,
        summary.emitted,
        summary.no_deadline,
        summary.expired,
        summary.duplicate_id,
        summary.duplicate_title,
    );
    if summary.create_failed > 0 {
        out.push_str(&format!("\n  {} calendar create(s) failed", summary.create_failed));
    }
    if summary.rollback_failed > 0 {
        out.push_str(&format!(
            "\n  {} claim(s) could not be released, retried after the pending lease",
            summary.rollback_failed
        ));
    }
    if summary.malformed > 0 {
        out.push_str(&format!("\n  {} malformed email(s) skipped", summary.malformed));
    }
    if summary.tracker_errors > 0 {
        out.push_str(&format!("\n  {} tracker error(s)", summary.tracker_errors));
    }
    if summary.title_check_skipped {
        out.push_str("\n  calendar lookup failed, duplicate titles not checked");
    }
    out
}

fn format_deadline(deadline: &Deadline) -> String {
    let urgency = deadline.urgency();
    format!(
        "{} {} [{}] {} {} ({} days, {} confidence)",
        urgency.emoji(),
        deadline.date,
        deadline.deadline_type,
        deadline.effective_time().format("%H:%M"),
        deadline.title,
        deadline.urgency_days,
        deadline.confidence,
    )
}

fn format_record(record: &ProcessedEmailRecord) -> String {
    let outcome = record.outcome.as_ref().map_or_else(String::new, |o| {
        format!("  {} on {}", o.event_ref, o.deadline_date)
    });
    format!(
        "{:<24} {:<8} {}{}",
        record.email_id,
        record.state,
        record.updated_at.format("%Y-%m-%d %H:%M"),
        outcome
    )
}

fn print_scan_result(result: &ScanResult) {
    println!("📬 {}", format_summary(&result.summary));
    for deadline in &result.deadlines {
        println!("  {}", format_deadline(deadline));
    }
    for failure in &result.failures {
        let hint = if failure.retryable { " (will retry)" } else { "" };
        println!("  ❌ {}: {}{hint}", failure.email_id, failure.reason);
    }
    if result.aborted {
        println!("⚠️  Scan stopped early");
    }
}

fn print_extraction(extraction: &Extraction) {
    println!("🔎 Candidates:");
    for candidate in &extraction.candidates {
        println!(
            "  [{}@{}] {:?}",
            candidate.source.as_str(),
            candidate.offset,
            candidate.raw_text
        );
    }

    println!("📅 Resolved:");
    for resolved in &extraction.resolved {
        let mut notes = Vec::new();
        if resolved.year_inferred {
            notes.push("year inferred".to_string());
        }
        if let Some(flag) = resolved.flag {
            notes.push(format!("{flag:?}"));
        }
        if let Some(reason) = resolved.rejected_reason {
            notes.push(format!("rejected: {reason:?}"));
        }
        println!(
            "  {} ({}, {} confidence) {}",
            resolved.date,
            resolved.source.as_str(),
            resolved.confidence,
            notes.join(", ")
        );
    }

    match &extraction.deadline {
        Some(deadline) => {
            println!("✅ Deadline: {}", format_deadline(deadline));
            println!("   Calendar title: {}", deadline.calendar_title());
        },
        None => println!("➖ No deadline"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    // -v flags override the configured filter
    let logging = match log_filter_from_verbosity(cli.verbose) {
        Some(filter) => LoggingConfig {
            filter: filter.to_string(),
            ..config.logging.clone()
        },
        None => config.logging.clone(),
    };
    init_tracing(&logging)?;

    match cli.command {
        Commands::Scan {
            user,
            mailbox,
            calendar,
            max_emails,
            days_back,
            query,
            now,
            json,
        } => {
            let clock = clock_for(now);
            let store = open_store(&config)?;
            let service = DeadlineSyncService::new(
                Arc::new(JsonMailboxAdapter::new(mailbox, Arc::clone(&clock))),
                Arc::new(JsonCalendarAdapter::new(calendar, Arc::clone(&clock))),
                store,
                clock,
            )
            .with_policy(config.policy.clone())
            .with_settings(config.scan.to_settings());

            let mut request = service.settings().request_for(user).with_query(query);
            if let Some(max_emails) = max_emails {
                request = request.with_max_emails(max_emails);
            }
            if let Some(days_back) = days_back {
                request = request.with_days_back(days_back);
            }

            let cancel = CancellationToken::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping scan");
                    on_signal.cancel();
                }
            });

            let result = service.scan_with_cancellation(&request, &cancel).await?;
            info!(emitted = result.summary.emitted, "Scan complete");

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_scan_result(&result);
            }
        },

        Commands::Extract {
            subject,
            body,
            now,
            json,
        } => {
            let email = EmailMessage::new("cli", subject).with_body(body);
            let email_id = email.validate()?;
            let today = clock_for(now).today();
            let extraction =
                DeadlineExtractor::new(config.policy.clone()).analyze(&email, &email_id, today);

            if json {
                println!("{}", serde_json::to_string_pretty(&extraction)?);
            } else {
                print_extraction(&extraction);
            }
        },

        Commands::Records { user, json } => {
            let records = open_tracker(&config)?.records_for_user(&user).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No processed emails for {user}");
            } else {
                for record in &records {
                    println!("{}", format_record(record));
                }
            }
        },

        Commands::Reset { user } => {
            let removed = open_tracker(&config)?.reset_user(&user).await?;
            println!("🗑️  Removed {removed} record(s) for {user}");
        },
    }

    Ok(())
}
