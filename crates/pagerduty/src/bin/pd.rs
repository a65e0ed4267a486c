//! CLI for day-to-day incident handling
//!
//! Run `pd --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use pagerduty::annotate::AnnotationOutcome;
use pagerduty::{
    AnnotationReport, Annotator, Config, FixedNote, Incident, IncidentStatus, NoteProvider,
    PagerDutyClient, PagerDutyError, TeamSelection, TerminalNotes, TimeWindow, TransitionReport,
    Transitioner, UserContext,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "pd")]
#[command(about = "Acknowledge, resolve and annotate your PagerDuty incidents")]
#[command(version)]
struct Cli {
    /// Output format: json, text
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Team rule: first, last, only or id:<TEAM_ID>
    #[arg(short, long, env = "PD_TEAM")]
    team: Option<TeamSelection>,

    /// Day the query window is centered on (defaults to today)
    #[arg(short, long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Acknowledge every triggered incident assigned to you
    Ack {
        /// List what would be acknowledged without changing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve every incident you have acknowledged
    ResolveAll {
        /// List what would be resolved without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Add notes to resolved incidents you triggered
    AddNotes {
        /// Use this text for every note instead of prompting
        #[arg(short, long)]
        note: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Ctrl-C at a dialoguer prompt surfaces as an error from `run`, since
    // the signal handler installed below swallows the SIGINT.
    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) if is_interrupted(&e) => interrupted(),
            Err(e) => {
                eprintln!("{} {e:#}", "Error:".red().bold());
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => interrupted(),
    }
}

fn interrupted() -> ExitCode {
    eprintln!("\nUser interrupt caught...\nSee pd --help");
    ExitCode::from(EXIT_INTERRUPTED)
}

fn is_interrupted(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<PagerDutyError>(), Some(PagerDutyError::Interrupted)))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(team) = cli.team {
        config.team_selection = team;
    }

    let window = match cli.date {
        Some(day) => TimeWindow::around(day, config.window_offset, config.window_hour)?,
        None => TimeWindow::today(config.window_offset, config.window_hour)?,
    };

    let client = PagerDutyClient::new(&config)?;
    let ctx = UserContext::resolve(&client, &config.team_selection)
        .await
        .context("Failed to resolve the current PagerDuty user")?;

    match cli.command {
        Commands::Ack { dry_run } => {
            let report = Transitioner::new(&client, &ctx, &window, config.pagination)
                .dry_run(dry_run)
                .acknowledge_all(|incident, status| print_transition(cli.format, incident, status, dry_run))
                .await?;
            print_report(cli.format, &report)?;
        }
        Commands::ResolveAll { dry_run, yes } => {
            if !dry_run && !yes && !confirm_resolve()? {
                println!("Nothing resolved");
                return Ok(());
            }
            let report = Transitioner::new(&client, &ctx, &window, config.pagination)
                .dry_run(dry_run)
                .resolve_all(|incident, status| print_transition(cli.format, incident, status, dry_run))
                .await?;
            print_report(cli.format, &report)?;
        }
        Commands::AddNotes { note } => {
            let mut provider: Box<dyn NoteProvider> = match note {
                Some(text) => Box::new(FixedNote(text)),
                None => Box::new(TerminalNotes),
            };

            if cli.format == OutputFormat::Text {
                println!("Looking for incidents that need notes added:");
            }
            let report = Annotator::new(&client, &ctx, &window, config.pagination)
                .annotate_resolved(provider.as_mut(), |incident, outcome| {
                    if cli.format == OutputFormat::Text && outcome == AnnotationOutcome::Annotated {
                        println!(
                            "{} Added note to {}",
                            "✓".green().bold(),
                            incident.display_name()
                        );
                    }
                })
                .await?;

            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => println!("{}", annotation_summary(&report)),
            }
        }
    }

    Ok(())
}

fn confirm_resolve() -> Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Want me to resolve any pending ack'd incidents?")
        .default(false)
        .interact()
        .map_err(PagerDutyError::from_prompt)?;
    Ok(confirmed)
}

fn print_transition(format: OutputFormat, incident: &Incident, status: IncidentStatus, dry_run: bool) {
    if format != OutputFormat::Text {
        return;
    }
    let verb = if dry_run {
        format!("Would mark {status}").yellow()
    } else {
        status.verb().green()
    };
    println!(
        "{verb} {} (Incident id:{})",
        incident.display_name(),
        incident.incident_number
    );
}

fn print_report(format: OutputFormat, report: &TransitionReport) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for line in transition_summary(report) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn transition_summary(report: &TransitionReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.is_empty() {
        lines.push("No incidents found".to_string());
    }
    for skipped in &report.skipped {
        lines.push(format!(
            "{} Skipped {} (Incident id:{}): status changed",
            "⚠".yellow().bold(),
            skipped.title,
            skipped.incident_number
        ));
    }
    lines
}

fn annotation_summary(report: &AnnotationReport) -> String {
    if report.examined == 0 {
        "No incidents found".to_string()
    } else if report.annotated.is_empty() {
        "All your incidents may have notes!".to_string()
    } else {
        format!(
            "Added {} note(s); {} already noted, {} skipped",
            report.annotated.len(),
            report.already_noted,
            report.declined
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagerduty::IncidentSummary;

    fn transition_report(fetched: usize, skipped: Vec<IncidentSummary>) -> TransitionReport {
        TransitionReport {
            target: IncidentStatus::Acknowledged,
            fetched,
            transitioned: Vec::new(),
            skipped,
            dry_run: false,
        }
    }

    #[test]
    fn test_empty_transition_prints_no_incidents() {
        let report = transition_report(0, Vec::new());
        assert!(report.is_empty());
        assert_eq!(transition_summary(&report), ["No incidents found"]);
    }

    #[test]
    fn test_transition_summary_lists_skipped() {
        let skipped = IncidentSummary {
            id: "P2".into(),
            incident_number: 2,
            title: "Disk full".into(),
        };
        let lines = transition_summary(&transition_report(2, vec![skipped]));

        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Skipped Disk full (Incident id:2)"));
    }

    #[test]
    fn test_annotation_summary() {
        assert_eq!(
            annotation_summary(&AnnotationReport::default()),
            "No incidents found"
        );

        let noted = AnnotationReport {
            examined: 2,
            already_noted: 2,
            ..AnnotationReport::default()
        };
        assert_eq!(annotation_summary(&noted), "All your incidents may have notes!");
    }

    #[test]
    fn test_interrupt_survives_context() {
        let error = anyhow::Error::new(PagerDutyError::Interrupted).context("Failed to read note");
        assert!(is_interrupted(&error));

        let other = anyhow::Error::new(PagerDutyError::NoteInput("closed".into()));
        assert!(!is_interrupted(&other));
    }
}
